use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::record::{ImageExt, WriteMode};
use crate::source::SourceKind;

const DEFAULT_SOURCE_KIND: &str = "camera";
const DEFAULT_SOURCE_ENDPOINT: &str = "stub://front_gate";
const DEFAULT_SOURCE_FPS: u32 = 10;
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_EXTRACTOR_BACKEND: &str = "stub";
const DEFAULT_OCR_BACKEND: &str = "stub";
const DEFAULT_OCR_LANG: &str = "eng";
const DEFAULT_COOLDOWN_SECS: u64 = 60;
const DEFAULT_REGISTRY_PATH: &str = "registered_plates.txt";
const DEFAULT_LOG_PATH: &str = "detections.log";
const DEFAULT_LOG_MODE: &str = "append";
const DEFAULT_IMAGE_DIR: &str = "plates";
const DEFAULT_IMAGE_EXT: &str = "jpg";

#[derive(Debug, Deserialize, Default)]
struct PlatewatchConfigFile {
    source: Option<SourceConfigFile>,
    extractor: Option<ExtractorConfigFile>,
    ocr: Option<OcrConfigFile>,
    cooldown_secs: Option<u64>,
    registry_path: Option<String>,
    log: Option<LogConfigFile>,
    images: Option<ImageConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    kind: Option<String>,
    endpoint: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ExtractorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct OcrConfigFile {
    backend: Option<String>,
    lang: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct LogConfigFile {
    path: Option<String>,
    mode: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ImageConfigFile {
    dir: Option<String>,
    ext: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlatewatchConfig {
    pub source: SourceSettings,
    pub extractor: ExtractorSettings,
    pub ocr: OcrSettings,
    pub cooldown: Duration,
    pub registry_path: PathBuf,
    pub log_path: PathBuf,
    pub log_mode: WriteMode,
    pub image_dir: PathBuf,
    pub image_ext: ImageExt,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub kind: SourceKind,
    pub endpoint: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct OcrSettings {
    pub backend: String,
    pub lang: String,
}

impl PlatewatchConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PLATEWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PlatewatchConfigFile) -> Result<Self> {
        let source = SourceSettings {
            kind: SourceKind::parse(
                file.source
                    .as_ref()
                    .and_then(|source| source.kind.as_deref())
                    .unwrap_or(DEFAULT_SOURCE_KIND),
            )?,
            endpoint: file
                .source
                .as_ref()
                .and_then(|source| source.endpoint.clone())
                .unwrap_or_else(|| DEFAULT_SOURCE_ENDPOINT.to_string()),
            target_fps: file
                .source
                .as_ref()
                .and_then(|source| source.target_fps)
                .unwrap_or(DEFAULT_SOURCE_FPS),
            width: file
                .source
                .as_ref()
                .and_then(|source| source.width)
                .unwrap_or(DEFAULT_SOURCE_WIDTH),
            height: file
                .source
                .as_ref()
                .and_then(|source| source.height)
                .unwrap_or(DEFAULT_SOURCE_HEIGHT),
        };
        let extractor = ExtractorSettings {
            backend: file
                .extractor
                .as_ref()
                .and_then(|extractor| extractor.backend.clone())
                .unwrap_or_else(|| DEFAULT_EXTRACTOR_BACKEND.to_string()),
            model_path: file
                .extractor
                .and_then(|extractor| extractor.model_path),
        };
        let ocr = OcrSettings {
            backend: file
                .ocr
                .as_ref()
                .and_then(|ocr| ocr.backend.clone())
                .unwrap_or_else(|| DEFAULT_OCR_BACKEND.to_string()),
            lang: file
                .ocr
                .and_then(|ocr| ocr.lang)
                .unwrap_or_else(|| DEFAULT_OCR_LANG.to_string()),
        };
        let cooldown = Duration::from_secs(file.cooldown_secs.unwrap_or(DEFAULT_COOLDOWN_SECS));
        let registry_path = PathBuf::from(
            file.registry_path
                .unwrap_or_else(|| DEFAULT_REGISTRY_PATH.to_string()),
        );
        let log_mode = WriteMode::parse(
            file.log
                .as_ref()
                .and_then(|log| log.mode.as_deref())
                .unwrap_or(DEFAULT_LOG_MODE),
        )?;
        let log_path = PathBuf::from(
            file.log
                .and_then(|log| log.path)
                .unwrap_or_else(|| DEFAULT_LOG_PATH.to_string()),
        );
        let image_ext = ImageExt::parse(
            file.images
                .as_ref()
                .and_then(|images| images.ext.as_deref())
                .unwrap_or(DEFAULT_IMAGE_EXT),
        )?;
        let image_dir = PathBuf::from(
            file.images
                .and_then(|images| images.dir)
                .unwrap_or_else(|| DEFAULT_IMAGE_DIR.to_string()),
        );
        Ok(Self {
            source,
            extractor,
            ocr,
            cooldown,
            registry_path,
            log_path,
            log_mode,
            image_dir,
            image_ext,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(kind) = std::env::var("PLATEWATCH_SOURCE_KIND") {
            if !kind.trim().is_empty() {
                self.source.kind = SourceKind::parse(kind.trim())?;
            }
        }
        if let Ok(endpoint) = std::env::var("PLATEWATCH_SOURCE_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.source.endpoint = endpoint;
            }
        }
        if let Ok(cooldown) = std::env::var("PLATEWATCH_COOLDOWN_SECS") {
            let seconds: u64 = cooldown.parse().map_err(|_| {
                anyhow!("PLATEWATCH_COOLDOWN_SECS must be an integer number of seconds")
            })?;
            self.cooldown = Duration::from_secs(seconds);
        }
        if let Ok(path) = std::env::var("PLATEWATCH_REGISTRY_PATH") {
            if !path.trim().is_empty() {
                self.registry_path = PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var("PLATEWATCH_LOG_PATH") {
            if !path.trim().is_empty() {
                self.log_path = PathBuf::from(path);
            }
        }
        if let Ok(mode) = std::env::var("PLATEWATCH_LOG_MODE") {
            if !mode.trim().is_empty() {
                self.log_mode = WriteMode::parse(mode.trim())?;
            }
        }
        if let Ok(dir) = std::env::var("PLATEWATCH_IMAGE_DIR") {
            if !dir.trim().is_empty() {
                self.image_dir = PathBuf::from(dir);
            }
        }
        if let Ok(ext) = std::env::var("PLATEWATCH_IMAGE_EXT") {
            if !ext.trim().is_empty() {
                self.image_ext = ImageExt::parse(ext.trim())?;
            }
        }
        if let Ok(backend) = std::env::var("PLATEWATCH_EXTRACTOR_BACKEND") {
            if !backend.trim().is_empty() {
                self.extractor.backend = backend.trim().to_string();
            }
        }
        if let Ok(backend) = std::env::var("PLATEWATCH_OCR_BACKEND") {
            if !backend.trim().is_empty() {
                self.ocr.backend = backend.trim().to_string();
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.cooldown.as_secs() == 0 {
            return Err(anyhow!("cooldown must be at least one second"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source target_fps must be at least 1"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source dimensions must be non-zero"));
        }
        if self.source.endpoint.trim().is_empty() {
            return Err(anyhow!("source endpoint must not be empty"));
        }
        if self.registry_path.as_os_str().is_empty() {
            return Err(anyhow!("registry_path must not be empty"));
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(anyhow!("log path must not be empty"));
        }
        if self.image_dir.as_os_str().is_empty() {
            return Err(anyhow!("image dir must not be empty"));
        }
        match self.extractor.backend.as_str() {
            "stub" => {}
            "tract" => {
                if self.extractor.model_path.is_none() {
                    return Err(anyhow!("extractor backend 'tract' requires model_path"));
                }
            }
            other => {
                return Err(anyhow!(
                    "unknown extractor backend '{}' (expected stub or tract)",
                    other
                ))
            }
        }
        match self.ocr.backend.as_str() {
            "stub" | "tesseract" => {}
            other => {
                return Err(anyhow!(
                    "unknown ocr backend '{}' (expected stub or tesseract)",
                    other
                ))
            }
        }
        if self.ocr.lang.trim().is_empty() {
            return Err(anyhow!("ocr lang must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<PlatewatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
