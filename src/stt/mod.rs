// STT Module - transcription client and batch orchestration

mod batch;
mod client;
mod types;

pub use batch::{consolidate, transcribe_all, BatchProgressFn, BATCH_SIZE};
pub use client::TranscriptionClient;
pub use types::{TranscriptionError, TranscriptionResult, WordTiming};

use crate::media::MediaFile;
use async_trait::async_trait;

/// Seam over the transcription vendor.
///
/// Stateless request/response; safe to call concurrently for independent
/// media, which the batch orchestrator relies on.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribe a media payload uploaded inline with the request.
    async fn transcribe_media(
        &self,
        media: &MediaFile,
    ) -> Result<TranscriptionResult, TranscriptionError>;

    /// Transcribe an object already uploaded to storage, by key.
    async fn transcribe_stored(
        &self,
        key: &str,
    ) -> Result<TranscriptionResult, TranscriptionError>;
}
