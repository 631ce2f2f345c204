// Processing coordinator - sequences the pipeline stages for one run and
// owns the shared run state observed by the UI.

mod progress;
mod state;

pub use progress::{ProcessingProgress, ProcessingStage};
pub use state::{PipelineEvent, ProcessingResult, RunState};

use crate::analysis::{AnalysisClient, AnalysisError};
use crate::config::Settings;
use crate::media::{FfmpegProcessor, MediaFile, MediaProcessor, NormalizationError};
use crate::storage::{StorageClient, UploadError};
use crate::stt::{self, TranscriptionBackend, TranscriptionClient, TranscriptionError};
use chrono::Utc;
use progress::{
    ProgressFloor, ANALYZING_SPAN, COMPLETE_PROGRESS, PROCESSING_AUDIO_SPAN, TRANSCRIBING_SPAN,
    UPLOADING_SPAN,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const EVENT_BUFFER: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("no input file supplied")]
    MissingInput,

    #[error("a processing run is already in flight")]
    RunInProgress,

    #[error("processing cancelled")]
    Cancelled,

    #[error("audio processing failed: {0}")]
    Normalization(#[from] NormalizationError),

    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
}

/// Drives one recording through normalize -> upload -> transcribe ->
/// analyze, mapping each stage's internal progress onto a single 0-100
/// scale and publishing state to any number of observers.
///
/// Not reentrant: one run at a time. Intermediate artifacts (normalized
/// audio, segments, per-segment results) live only inside the run and are
/// dropped when it completes or fails.
pub struct SessionProcessor {
    media: Arc<dyn MediaProcessor>,
    transcriber: Arc<dyn TranscriptionBackend>,
    storage: StorageClient,
    analyzer: AnalysisClient,
    state_tx: watch::Sender<RunState>,
    events_tx: broadcast::Sender<PipelineEvent>,
    floor: ProgressFloor,
    in_flight: AtomicBool,
    cancel_token: Mutex<Option<CancellationToken>>,
}

impl SessionProcessor {
    pub fn new(
        media: Arc<dyn MediaProcessor>,
        transcriber: Arc<dyn TranscriptionBackend>,
        storage: StorageClient,
        analyzer: AnalysisClient,
    ) -> Self {
        let (state_tx, _) = watch::channel(RunState::default());
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER);

        Self {
            media,
            transcriber,
            storage,
            analyzer,
            state_tx,
            events_tx,
            floor: ProgressFloor::default(),
            in_flight: AtomicBool::new(false),
            cancel_token: Mutex::new(None),
        }
    }

    /// Wire the production components from settings: ffmpeg-backed media
    /// processing and HTTP clients for the three collaborators.
    pub fn from_settings(settings: &Settings) -> Self {
        let analyzer = match &settings.analysis_base_url {
            Some(url) => {
                AnalysisClient::with_base_url(settings.analysis_api_key.clone(), url.clone())
            }
            None => AnalysisClient::new(settings.analysis_api_key.clone()),
        };

        Self::new(
            Arc::new(FfmpegProcessor::from_env()),
            Arc::new(TranscriptionClient::new(
                settings.server_base_url.clone(),
                settings.transcription_api_key.clone(),
            )),
            StorageClient::new(settings.server_base_url.clone()),
            analyzer,
        )
    }

    /// Run the full pipeline for one file.
    ///
    /// Returns the result and also publishes it through the shared state,
    /// so callers may either await this or observe the channels.
    pub async fn start(&self, file: MediaFile) -> Result<ProcessingResult, ProcessingError> {
        if file.is_empty() {
            return Err(ProcessingError::MissingInput);
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(ProcessingError::RunInProgress);
        }

        let token = CancellationToken::new();
        if let Ok(mut guard) = self.cancel_token.lock() {
            *guard = Some(token.clone());
        }

        self.floor.reset();
        let run_id = Uuid::new_v4().to_string();
        tracing::info!("Run {} started: {}", run_id, file.file_name);

        // Prior result/error must be gone before the first progress emission.
        self.state_tx.send_replace(RunState {
            run_id: Some(run_id.clone()),
            started_at: Some(Utc::now().to_rfc3339()),
            progress: None,
            result: None,
            error: None,
            is_processing: true,
        });

        let outcome = self.run_pipeline(file, &token).await;

        self.in_flight.store(false, Ordering::SeqCst);
        if let Ok(mut guard) = self.cancel_token.lock() {
            *guard = None;
        }

        match outcome {
            Ok(result) => {
                self.emit(ProcessingStage::Complete, COMPLETE_PROGRESS, "Done", None, None);
                self.state_tx.send_modify(|s| {
                    s.result = Some(result.clone());
                    s.is_processing = false;
                });
                let _ = self
                    .events_tx
                    .send(PipelineEvent::RunCompleted(result.clone()));
                tracing::info!("Run {} complete: {} chars", run_id, result.transcript.len());
                Ok(result)
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!("Run {} failed: {}", run_id, message);
                self.state_tx.send_modify(|s| {
                    s.error = Some(message.clone());
                    s.is_processing = false;
                });
                let _ = self.events_tx.send(PipelineEvent::RunFailed(message));
                Err(err)
            }
        }
    }

    async fn run_pipeline(
        &self,
        file: MediaFile,
        token: &CancellationToken,
    ) -> Result<ProcessingResult, ProcessingError> {
        self.emit(
            ProcessingStage::ProcessingAudio,
            PROCESSING_AUDIO_SPAN.start,
            "Preparing audio",
            None,
            None,
        );
        let on_normalize = |pct: u8, message: &str| {
            let scaled = PROCESSING_AUDIO_SPAN.at(f64::from(pct) / 100.0);
            self.emit(ProcessingStage::ProcessingAudio, scaled, message, None, None);
        };
        let normalized = self
            .cancellable(token, self.media.normalize(file, &on_normalize))
            .await??;

        self.emit(
            ProcessingStage::Uploading,
            UPLOADING_SPAN.start,
            "Uploading file",
            None,
            None,
        );
        let key = self
            .cancellable(token, self.storage.upload(&normalized))
            .await??;
        self.emit(
            ProcessingStage::Uploading,
            UPLOADING_SPAN.end,
            "Upload complete",
            None,
            None,
        );

        self.emit(
            ProcessingStage::Transcribing,
            TRANSCRIBING_SPAN.start,
            "Transcribing audio",
            None,
            None,
        );
        let transcription = if self.media.needs_splitting(&normalized) {
            let segments = self.cancellable(token, self.media.split(normalized)).await??;
            let on_batch = |done: usize, total: usize| {
                let scaled = TRANSCRIBING_SPAN.at(done as f64 / total as f64);
                self.emit(
                    ProcessingStage::Transcribing,
                    scaled,
                    &format!("Transcribed {} of {} segments", done, total),
                    Some(done),
                    Some(total),
                );
            };
            self.cancellable(
                token,
                stt::transcribe_all(self.transcriber.as_ref(), &segments, &on_batch),
            )
            .await??
        } else {
            self.cancellable(token, self.transcriber.transcribe_stored(&key))
                .await??
        };
        self.emit(
            ProcessingStage::Transcribing,
            TRANSCRIBING_SPAN.end,
            "Transcript ready",
            None,
            None,
        );

        // Analysis only ever sees the full consolidated transcript.
        self.emit(
            ProcessingStage::Analyzing,
            ANALYZING_SPAN.start,
            "Analyzing content",
            None,
            None,
        );
        let analysis = self
            .cancellable(token, self.analyzer.analyze(&transcription.text))
            .await??;
        self.emit(
            ProcessingStage::Analyzing,
            ANALYZING_SPAN.end,
            "Analysis complete",
            None,
            None,
        );

        Ok(ProcessingResult {
            transcript: transcription.text,
            analysis,
        })
    }

    /// Race stage work against the run's cancellation token.
    async fn cancellable<T>(
        &self,
        token: &CancellationToken,
        work: impl Future<Output = T>,
    ) -> Result<T, ProcessingError> {
        tokio::select! {
            _ = token.cancelled() => Err(ProcessingError::Cancelled),
            value = work => Ok(value),
        }
    }

    fn emit(
        &self,
        stage: ProcessingStage,
        value: u8,
        message: &str,
        chunks_processed: Option<usize>,
        total_chunks: Option<usize>,
    ) {
        let update = ProcessingProgress {
            stage,
            progress: self.floor.clamp(value),
            message: message.to_string(),
            chunks_processed,
            total_chunks,
        };

        self.state_tx
            .send_modify(|s| s.progress = Some(update.clone()));
        let _ = self.events_tx.send(PipelineEvent::ProgressUpdated(update));
    }

    /// Abort the in-flight run, if any. The run lands in the terminal
    /// error state with a cancellation message; temp artifacts are
    /// released by scope.
    pub fn cancel(&self) {
        if let Ok(guard) = self.cancel_token.lock() {
            if let Some(token) = guard.as_ref() {
                tracing::info!("Cancellation requested");
                token.cancel();
            }
        }
    }

    /// Return to idle, discarding the previous run's result and error.
    /// Idempotent; intended for the `complete` and `error` states.
    pub fn reset(&self) {
        self.floor.reset();
        self.state_tx.send_replace(RunState::default());
        tracing::info!("Run state reset");
    }

    /// Watch the run state; the receiver sees every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    /// Stream of pipeline events for observers that prefer messages over
    /// polling the snapshot.
    pub fn events(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events_tx.subscribe()
    }

    /// Current snapshot of the run state.
    pub fn state(&self) -> RunState {
        self.state_tx.borrow().clone()
    }

    pub fn is_processing(&self) -> bool {
        self.state_tx.borrow().is_processing
    }
}
