//! The frame-to-record control loop.
//!
//! A capture thread pulls frames from the configured source at the target
//! rate and feeds a bounded queue; when the queue is full the newest frame
//! is dropped and counted, never buffered without limit. A single consumer
//! drains the queue and walks each frame through extraction, recognition,
//! normalization, the cooldown throttle, the registry lookup, and finally
//! the recorder.
//!
//! Per-frame failures at any stage are recoverable: they are counted,
//! logged, and the loop moves on to the next frame. Only startup failures
//! (bad config, source that never connects) abort the run.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::config::SourceSettings;
use crate::extract::PlateExtractor;
use crate::frame::Frame;
use crate::normalize::normalize;
use crate::ocr::TextRecognizer;
use crate::record::{DetectionEvent, EventRecorder};
use crate::registry::PlateRegistry;
use crate::source::FrameSource;
use crate::throttle::DedupThrottle;

/// Frames buffered between the capture thread and the consumer. A lagging
/// consumer costs dropped frames, never unbounded memory.
pub const FRAME_QUEUE_DEPTH: usize = 8;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);
const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Counters for everything the pipeline did during a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_processed: u64,
    pub frames_dropped: u64,
    pub acquisition_failures: u64,
    pub extraction_failures: u64,
    pub extraction_misses: u64,
    pub recognition_failures: u64,
    pub normalization_empty: u64,
    pub throttle_rejections: u64,
    pub persistence_failures: u64,
    pub events_recorded: u64,
}

#[derive(Default)]
struct CaptureShared {
    stop: AtomicBool,
    captured: AtomicU64,
    drops: AtomicU64,
    failures: AtomicU64,
    healthy: AtomicBool,
}

pub struct Pipeline {
    extractor: Box<dyn PlateExtractor>,
    recognizer: Box<dyn TextRecognizer>,
    throttle: DedupThrottle,
    registry: PlateRegistry,
    recorder: EventRecorder,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(
        extractor: Box<dyn PlateExtractor>,
        recognizer: Box<dyn TextRecognizer>,
        throttle: DedupThrottle,
        registry: PlateRegistry,
        recorder: EventRecorder,
    ) -> Self {
        Self {
            extractor,
            recognizer,
            throttle,
            registry,
            recorder,
            stats: PipelineStats::default(),
        }
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Walk one frame through every stage. Each early return is a counted,
    /// non-fatal outcome; only an accepted detection reaches the recorder.
    pub fn process_frame(&mut self, frame: &Frame) {
        self.stats.frames_processed += 1;

        let plate_image = match self.extractor.extract(frame) {
            Ok(Some(image)) => image,
            Ok(None) => {
                self.stats.extraction_misses += 1;
                log::debug!("no plate found in frame");
                return;
            }
            Err(err) => {
                self.stats.extraction_failures += 1;
                log::warn!("plate extraction failed: {}", err);
                return;
            }
        };

        let raw_text = match self.recognizer.recognize(&plate_image) {
            Ok(text) => text,
            Err(err) => {
                self.stats.recognition_failures += 1;
                log::warn!("plate recognition failed: {}", err);
                return;
            }
        };

        let plate = normalize(&raw_text);
        if plate.is_empty() {
            self.stats.normalization_empty += 1;
            log::debug!("discarding unreadable plate text {:?}", raw_text);
            return;
        }

        if !self.throttle.accept(&plate, Instant::now()) {
            self.stats.throttle_rejections += 1;
            log::debug!("plate {} suppressed by cooldown", plate);
            return;
        }

        let registered = self.registry.is_registered(&plate);
        let event = DetectionEvent::new(plate, registered);
        match self.recorder.record(&event, &plate_image) {
            Ok(image_path) => {
                self.stats.events_recorded += 1;
                log::info!(
                    "plate {} ({}) recorded, image at {}",
                    event.plate,
                    event.status_label(),
                    image_path.display()
                );
            }
            Err(err) => {
                // The cooldown acceptance stands even when persistence
                // fails; a flapping disk must not turn into a log flood.
                self.stats.persistence_failures += 1;
                log::error!("failed to record detection for {}: {:#}", event.plate, err);
            }
        }
    }

    /// Capture from `settings` until `stop` fires, processing every frame
    /// that makes it through the queue. The source is opened on the capture
    /// thread; a connect failure is reported here before any frame flows.
    pub fn run(&mut self, settings: SourceSettings, stop: Receiver<()>) -> Result<PipelineStats> {
        let shared = Arc::new(CaptureShared::default());
        let (frame_tx, frame_rx) = mpsc::sync_channel(FRAME_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = mpsc::channel();

        let capture_shared = shared.clone();
        let capture = std::thread::Builder::new()
            .name("frame-capture".to_string())
            .spawn(move || {
                let mut source = match connect_source(&settings) {
                    Ok(source) => {
                        let _ = ready_tx.send(Ok(()));
                        source
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                capture_loop(&mut source, frame_tx, capture_shared, settings.target_fps);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = capture.join();
                return Err(err);
            }
            Err(_) => {
                let _ = capture.join();
                return Err(anyhow!("capture thread exited before connecting"));
            }
        }

        let mut last_health_log = Instant::now();
        let mut last_sweep = Instant::now();
        loop {
            match stop.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            match frame_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(frame) => self.process_frame(&frame),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                log::info!(
                    "{}",
                    health_line(
                        &self.stats,
                        shared.healthy.load(Ordering::SeqCst),
                        shared.captured.load(Ordering::SeqCst),
                        shared.drops.load(Ordering::SeqCst),
                        shared.failures.load(Ordering::SeqCst),
                        self.throttle.len(),
                    )
                );
                last_health_log = Instant::now();
            }

            if last_sweep.elapsed() >= SWEEP_INTERVAL {
                let evicted = self.throttle.sweep(Instant::now());
                if evicted > 0 {
                    log::debug!("cooldown sweep evicted {} stale plates", evicted);
                }
                last_sweep = Instant::now();
            }
        }

        shared.stop.store(true, Ordering::SeqCst);
        drop(frame_rx);
        if capture.join().is_err() {
            log::warn!("capture thread panicked during shutdown");
        }

        self.stats.frames_dropped += shared.drops.load(Ordering::SeqCst);
        self.stats.acquisition_failures += shared.failures.load(Ordering::SeqCst);
        Ok(self.stats.clone())
    }
}

fn connect_source(settings: &SourceSettings) -> Result<FrameSource> {
    let mut source = FrameSource::from_settings(settings)?;
    source.connect()?;
    Ok(source)
}

fn capture_loop(
    source: &mut FrameSource,
    frames: SyncSender<Frame>,
    shared: Arc<CaptureShared>,
    target_fps: u32,
) {
    let interval = Duration::from_millis(1000 / u64::from(target_fps.max(1)));
    while !shared.stop.load(Ordering::SeqCst) {
        let iteration_started = Instant::now();
        match source.next_frame() {
            Ok(frame) => {
                shared.captured.fetch_add(1, Ordering::SeqCst);
                match frames.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        shared.drops.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            Err(err) => {
                shared.failures.fetch_add(1, Ordering::SeqCst);
                log::warn!("frame acquisition failed: {}", err);
            }
        }
        shared.healthy.store(source.is_healthy(), Ordering::SeqCst);

        let elapsed = iteration_started.elapsed();
        if elapsed < interval {
            std::thread::sleep(interval - elapsed);
        }
    }
    let stats = source.stats();
    log::info!(
        "capture stopped after {} frames from {}",
        stats.frames_captured,
        stats.endpoint
    );
}

/// One key=value line with everything the periodic health cadence reports:
/// capture-side counters, every skip reason, persistence failures, and the
/// number of plates the throttle is tracking.
fn health_line(
    stats: &PipelineStats,
    source_healthy: bool,
    captured: u64,
    dropped: u64,
    acquisition_failures: u64,
    throttle_entries: usize,
) -> String {
    format!(
        "source health={} captured={} dropped={} acq_fail={} processed={} no_plate={} \
         extract_fail={} ocr_fail={} empty_text={} throttled={} recorded={} record_fail={} \
         plates_tracked={}",
        source_healthy,
        captured,
        dropped,
        acquisition_failures,
        stats.frames_processed,
        stats.extraction_misses,
        stats.extraction_failures,
        stats.recognition_failures,
        stats.normalization_empty,
        stats.throttle_rejections,
        stats.events_recorded,
        stats.persistence_failures,
        throttle_entries,
    )
}
