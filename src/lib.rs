//! platewatch
//!
//! Watches a video source for vehicle license plates and keeps a durable,
//! deduplicated record of every sighting.
//!
//! # Pipeline
//!
//! Frames flow through five stages:
//!
//! 1. **Acquire**: a capture source (IP camera, local webcam, video file,
//!    or the built-in synthetic renderer) hands the pipeline RGB frames.
//! 2. **Extract**: a plate extractor locates the plate region and crops it.
//! 3. **Recognize**: OCR turns the crop into raw text.
//! 4. **Decide**: the text is normalized to bare alphanumerics, the
//!    per-plate cooldown suppresses repeat sightings, and the registry
//!    classifies the plate as registered or not.
//! 5. **Record**: accepted detections append one log line and save the
//!    plate crop to disk.
//!
//! Failures in the middle stages are per-frame and recoverable; the loop
//! logs them and keeps watching. Only startup problems abort.
//!
//! # Module Structure
//!
//! - `source`: frame acquisition backends and the `stub://` synthetic mode
//! - `extract` / `ocr`: pluggable plate extraction and text recognition
//! - `normalize` / `throttle` / `registry`: the accept/reject decision
//! - `record`: the detection log and the plate image store
//! - `pipeline`: the capture thread and control loop wiring it together
//! - `config`: file/env layered configuration for the daemon

pub mod config;
pub mod extract;
pub mod frame;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod source;
pub mod throttle;

pub use config::{ExtractorSettings, OcrSettings, PlatewatchConfig, SourceSettings};
#[cfg(feature = "extract-tract")]
pub use extract::TractExtractor;
pub use extract::{PlateExtractor, StubExtractor};
pub use frame::{Frame, PlateImage, PlateRegion};
pub use normalize::normalize;
#[cfg(feature = "ocr-tesseract")]
pub use ocr::TesseractRecognizer;
pub use ocr::{StubRecognizer, TextRecognizer};
pub use pipeline::{Pipeline, PipelineStats, FRAME_QUEUE_DEPTH};
pub use record::{DetectionEvent, EventLog, EventRecorder, ImageExt, ImageStore, WriteMode};
pub use registry::PlateRegistry;
pub use source::{
    native_backends, CameraConfig, CameraSource, FileConfig, FileSource, FrameSource, SourceKind,
    SourceStats, SyntheticCapture, WebcamConfig, WebcamSource,
};
pub use throttle::{DedupThrottle, DEFAULT_COOLDOWN, SWEEP_COOLDOWN_MULTIPLE};
