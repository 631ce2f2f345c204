//! Processing pipeline for letterboard therapy session recordings.
//!
//! A recording moves through four stages: local normalization (mono,
//! 16 kHz, low-bitrate audio via ffmpeg, with oversized files split into
//! fixed-duration segments), upload to object storage, transcription in
//! bounded concurrent batches, and LLM analysis constrained to a strict
//! four-field schema. The [`session::SessionProcessor`] sequences the
//! stages, maps their progress onto one 0-100 scale, and publishes
//! state/events for any number of UI observers.

pub mod analysis;
pub mod config;
pub mod media;
pub mod session;
pub mod storage;
pub mod stt;

pub use analysis::{AnalysisClient, AnalysisError, SessionAnalysis};
pub use config::{ConfigError, Settings};
pub use media::{FfmpegProcessor, MediaFile, MediaProcessor, NormalizationError, Segment};
pub use session::{
    PipelineEvent, ProcessingError, ProcessingProgress, ProcessingResult, ProcessingStage,
    RunState, SessionProcessor,
};
pub use storage::{StorageClient, UploadError};
pub use stt::{
    TranscriptionBackend, TranscriptionClient, TranscriptionError, TranscriptionResult, WordTiming,
};
