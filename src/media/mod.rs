// Media Module - normalization and splitting of uploaded recordings

mod engine;
mod processor;

pub use engine::{MediaEngine, Workspace};
pub use processor::{FfmpegProcessor, SEGMENT_DURATION_SECS, SPLIT_THRESHOLD_BYTES};

use async_trait::async_trait;
use thiserror::Error;

/// Callback for stage-internal progress: percent within the stage plus a
/// human-readable message. The coordinator maps it onto the run-wide scale.
pub type ProgressFn<'a> = &'a (dyn Fn(u8, &str) + Send + Sync);

/// An opaque media payload moving through the pipeline.
///
/// Built once, then handed from stage to stage by value; stages never
/// mutate a file they received, they produce a new one.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension without the dot, lowercased.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.file_name.rsplit_once('.')?;
        if ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// File name with the extension replaced by `suffix`.
    pub fn with_suffix(&self, suffix: &str) -> String {
        match self.file_name.rsplit_once('.') {
            Some((stem, _)) => format!("{}{}", stem, suffix),
            None => format!("{}{}", self.file_name, suffix),
        }
    }
}

/// A bounded-duration slice of normalized audio.
///
/// The ordinal index establishes playback order; concatenating segments in
/// index order reconstructs the full normalized stream.
#[derive(Debug, Clone)]
pub struct Segment {
    pub index: usize,
    pub media: MediaFile,
}

#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("media engine unavailable: {0}")]
    EngineInit(String),

    #[error("transform command exited with status {status}: {stderr}")]
    CommandFailed { status: i32, stderr: String },

    #[error("transform produced no output for {file_name} ({input_bytes} input bytes)")]
    EmptyOutput { file_name: String, input_bytes: usize },

    #[error("workspace error: {0}")]
    Io(#[from] std::io::Error),
}

/// Seam between the coordinator and the media engine.
///
/// The production implementation shells out to ffmpeg; tests substitute an
/// in-memory fake so the pipeline can run without the binary.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Re-encode arbitrary input media into mono 16 kHz low-bitrate audio,
    /// stripping any video stream. Pure local transform, no network.
    async fn normalize(
        &self,
        input: MediaFile,
        on_progress: ProgressFn<'_>,
    ) -> Result<MediaFile, NormalizationError>;

    /// True iff the file is large enough to require segmented transcription.
    fn needs_splitting(&self, file: &MediaFile) -> bool;

    /// Cut the normalized stream into fixed-duration codec-copy segments in
    /// ordinal order. The last segment may be shorter.
    async fn split(&self, file: MediaFile) -> Result<Vec<Segment>, NormalizationError>;
}
