//! platewatchd - license plate watch daemon
//!
//! This daemon:
//! 1. Connects to the configured frame source (IP camera, webcam, video
//!    file, or a `stub://` synthetic endpoint)
//! 2. Runs plate extraction and OCR on captured frames
//! 3. Normalizes plate text and throttles repeat sightings per plate
//! 4. Checks accepted plates against the local registry file
//! 5. Appends one detection log line and saves one plate crop per
//!    accepted detection

use anyhow::Result;
use std::sync::mpsc;

use platewatch::{
    extract, native_backends, ocr, DedupThrottle, EventRecorder, Pipeline, PlateRegistry,
    PlatewatchConfig,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = PlatewatchConfig::load()?;

    log::info!("platewatchd {} starting", env!("CARGO_PKG_VERSION"));
    let native = native_backends();
    if native.is_empty() {
        log::info!("native capture backends: none (stub:// endpoints only)");
    } else {
        log::info!("native capture backends: {}", native.join(", "));
    }
    log::info!(
        "source: kind={} endpoint={} target_fps={} {}x{}",
        cfg.source.kind.as_str(),
        cfg.source.endpoint,
        cfg.source.target_fps,
        cfg.source.width,
        cfg.source.height
    );
    log::info!(
        "cooldown={}s registry={} log={} ({}) images={} ({})",
        cfg.cooldown.as_secs(),
        cfg.registry_path.display(),
        cfg.log_path.display(),
        cfg.log_mode.as_str(),
        cfg.image_dir.display(),
        cfg.image_ext.as_str()
    );

    let mut extractor = extract::build(&cfg.extractor, cfg.source.width, cfg.source.height)?;
    extractor.warm_up()?;
    let mut recognizer = ocr::build(&cfg.ocr)?;
    recognizer.warm_up()?;
    log::info!("extractor={} ocr={}", extractor.name(), recognizer.name());

    let registry = PlateRegistry::open(&cfg.registry_path);
    let recorder = EventRecorder::open(&cfg.log_path, cfg.log_mode, &cfg.image_dir, cfg.image_ext)?;
    let throttle = DedupThrottle::new(cfg.cooldown);
    let mut pipeline = Pipeline::new(extractor, recognizer, throttle, registry, recorder);

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!("platewatchd running (Ctrl-C to stop)");
    let stats = pipeline.run(cfg.source.clone(), stop_rx)?;

    log::info!(
        "platewatchd stopped: processed={} recorded={} throttled={} dropped={}",
        stats.frames_processed,
        stats.events_recorded,
        stats.throttle_rejections,
        stats.frames_dropped
    );
    log::info!(
        "failures: acquire={} extract={} ocr={} record={}",
        stats.acquisition_failures,
        stats.extraction_failures,
        stats.recognition_failures,
        stats.persistence_failures
    );

    Ok(())
}
