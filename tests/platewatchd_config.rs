use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use platewatch::config::PlatewatchConfig;
use platewatch::{ImageExt, SourceKind, WriteMode};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "PLATEWATCH_CONFIG",
        "PLATEWATCH_SOURCE_KIND",
        "PLATEWATCH_SOURCE_ENDPOINT",
        "PLATEWATCH_COOLDOWN_SECS",
        "PLATEWATCH_REGISTRY_PATH",
        "PLATEWATCH_LOG_PATH",
        "PLATEWATCH_LOG_MODE",
        "PLATEWATCH_IMAGE_DIR",
        "PLATEWATCH_IMAGE_EXT",
        "PLATEWATCH_EXTRACTOR_BACKEND",
        "PLATEWATCH_OCR_BACKEND",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_defaults_when_unconfigured() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = PlatewatchConfig::load().expect("load config");

    assert_eq!(cfg.source.kind, SourceKind::Camera);
    assert_eq!(cfg.source.endpoint, "stub://front_gate");
    assert_eq!(cfg.source.target_fps, 10);
    assert_eq!(cfg.source.width, 640);
    assert_eq!(cfg.source.height, 480);
    assert_eq!(cfg.extractor.backend, "stub");
    assert_eq!(cfg.ocr.backend, "stub");
    assert_eq!(cfg.ocr.lang, "eng");
    assert_eq!(cfg.cooldown.as_secs(), 60);
    assert_eq!(cfg.registry_path, PathBuf::from("registered_plates.txt"));
    assert_eq!(cfg.log_path, PathBuf::from("detections.log"));
    assert_eq!(cfg.log_mode, WriteMode::Append);
    assert_eq!(cfg.image_dir, PathBuf::from("plates"));
    assert_eq!(cfg.image_ext, ImageExt::Jpg);

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": {
            "kind": "webcam",
            "endpoint": "/dev/video2",
            "target_fps": 15,
            "width": 1280,
            "height": 720
        },
        "extractor": {
            "backend": "stub"
        },
        "ocr": {
            "backend": "stub",
            "lang": "deu"
        },
        "cooldown_secs": 120,
        "registry_path": "/etc/platewatch/allowed.txt",
        "log": {
            "path": "/var/log/platewatch/detections.log",
            "mode": "append"
        },
        "images": {
            "dir": "/var/lib/platewatch/plates",
            "ext": "png"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("PLATEWATCH_CONFIG", file.path());
    std::env::set_var("PLATEWATCH_SOURCE_ENDPOINT", "stub://garage");
    std::env::set_var("PLATEWATCH_COOLDOWN_SECS", "30");
    std::env::set_var("PLATEWATCH_LOG_MODE", "prepend");

    let cfg = PlatewatchConfig::load().expect("load config");

    assert_eq!(cfg.source.kind, SourceKind::Webcam);
    assert_eq!(cfg.source.endpoint, "stub://garage");
    assert_eq!(cfg.source.target_fps, 15);
    assert_eq!(cfg.source.width, 1280);
    assert_eq!(cfg.source.height, 720);
    assert_eq!(cfg.ocr.lang, "deu");
    assert_eq!(cfg.cooldown.as_secs(), 30);
    assert_eq!(cfg.registry_path, PathBuf::from("/etc/platewatch/allowed.txt"));
    assert_eq!(cfg.log_path, PathBuf::from("/var/log/platewatch/detections.log"));
    assert_eq!(cfg.log_mode, WriteMode::Prepend);
    assert_eq!(cfg.image_dir, PathBuf::from("/var/lib/platewatch/plates"));
    assert_eq!(cfg.image_ext, ImageExt::Png);

    clear_env();
}

#[test]
fn rejects_non_numeric_cooldown_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PLATEWATCH_COOLDOWN_SECS", "soon");
    let err = PlatewatchConfig::load().expect_err("cooldown must not parse");
    assert!(err
        .to_string()
        .contains("PLATEWATCH_COOLDOWN_SECS must be an integer"));

    clear_env();
}

#[test]
fn rejects_unknown_extractor_backend() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PLATEWATCH_EXTRACTOR_BACKEND", "yolo");
    let err = PlatewatchConfig::load().expect_err("backend must be rejected");
    assert!(err.to_string().contains("unknown extractor backend"));

    clear_env();
}

#[test]
fn rejects_zero_cooldown_from_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{ "cooldown_secs": 0 }"#).expect("write config");
    std::env::set_var("PLATEWATCH_CONFIG", file.path());

    let err = PlatewatchConfig::load().expect_err("zero cooldown must be rejected");
    assert!(err.to_string().contains("cooldown"));

    clear_env();
}
