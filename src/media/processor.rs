// ffmpeg-backed implementation of the media processor seam

use super::engine::{MediaEngine, Workspace};
use super::{MediaFile, MediaProcessor, NormalizationError, ProgressFn, Segment};
use async_trait::async_trait;

/// Files above this size are transcribed segment-by-segment.
pub const SPLIT_THRESHOLD_BYTES: usize = 30 * 1024 * 1024;

/// Target duration of one codec-copy segment.
pub const SEGMENT_DURATION_SECS: u32 = 1200;

const OUTPUT_NAME: &str = "output.m4a";
const NORMALIZED_SUFFIX: &str = "-processed.m4a";
const NORMALIZED_MIME: &str = "audio/mp4";

pub struct FfmpegProcessor {
    engine: MediaEngine,
    segment_duration_secs: u32,
}

impl FfmpegProcessor {
    pub fn new(engine: MediaEngine) -> Self {
        Self {
            engine,
            segment_duration_secs: SEGMENT_DURATION_SECS,
        }
    }

    pub fn from_env() -> Self {
        Self::new(MediaEngine::from_env())
    }

    /// Override the segment duration, mostly for tests.
    pub fn with_segment_duration(mut self, secs: u32) -> Self {
        self.segment_duration_secs = secs;
        self
    }

    fn segment_name(index: usize) -> String {
        format!("part_{:03}.m4a", index)
    }
}

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    async fn normalize(
        &self,
        input: MediaFile,
        on_progress: ProgressFn<'_>,
    ) -> Result<MediaFile, NormalizationError> {
        let input_bytes = input.len();

        on_progress(10, "Initializing audio processor");
        self.engine.ensure_ready().await?;

        let workspace = Workspace::create()?;
        let input_name = format!(
            "input.{}",
            input.extension().unwrap_or_else(|| "mp4".to_string())
        );
        workspace.write(&input_name, &input.bytes).await?;

        on_progress(30, "Processing audio");

        // Strip video, downmix to mono, resample to 16 kHz, AAC at 48k.
        // Speech-adequate quality, sized for upload rather than archival.
        self.engine
            .run(
                &[
                    "-i",
                    &input_name,
                    "-vn",
                    "-ac",
                    "1",
                    "-ar",
                    "16000",
                    "-c:a",
                    "aac",
                    "-b:a",
                    "48k",
                    "-y",
                    OUTPUT_NAME,
                ],
                workspace.path(),
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    "Normalization failed for {} ({} bytes): {}",
                    input.file_name,
                    input_bytes,
                    e
                );
                e
            })?;

        on_progress(80, "Finalizing");

        let bytes = workspace.read(OUTPUT_NAME).await?;
        if bytes.is_empty() {
            return Err(NormalizationError::EmptyOutput {
                file_name: input.file_name,
                input_bytes,
            });
        }

        tracing::info!(
            "Normalized {}: {} -> {} bytes",
            input.file_name,
            input_bytes,
            bytes.len()
        );

        on_progress(100, "Audio processing complete");

        let file_name = input.with_suffix(NORMALIZED_SUFFIX);
        Ok(MediaFile::new(file_name, NORMALIZED_MIME, bytes))
    }

    fn needs_splitting(&self, file: &MediaFile) -> bool {
        file.len() > SPLIT_THRESHOLD_BYTES
    }

    async fn split(&self, file: MediaFile) -> Result<Vec<Segment>, NormalizationError> {
        self.engine.ensure_ready().await?;

        let workspace = Workspace::create()?;
        let input_name = format!(
            "input.{}",
            file.extension().unwrap_or_else(|| "m4a".to_string())
        );
        workspace.write(&input_name, &file.bytes).await?;

        let duration = self.segment_duration_secs.to_string();
        self.engine
            .run(
                &[
                    "-i",
                    &input_name,
                    "-f",
                    "segment",
                    "-segment_time",
                    &duration,
                    "-c",
                    "copy",
                    "part_%03d.m4a",
                ],
                workspace.path(),
            )
            .await?;

        // Segment count is not known ahead of the cut; discover it from the
        // workspace listing in ordinal order.
        let mut segments = Vec::new();
        let mut index = 0;
        loop {
            let name = Self::segment_name(index);
            if !workspace.exists(&name).await {
                break;
            }
            let bytes = workspace.read(&name).await?;
            segments.push(Segment {
                index,
                media: MediaFile::new(name, NORMALIZED_MIME, bytes),
            });
            index += 1;
        }

        if segments.is_empty() {
            let input_bytes = file.len();
            return Err(NormalizationError::EmptyOutput {
                file_name: file.file_name,
                input_bytes,
            });
        }

        tracing::info!(
            "Split {} ({} bytes) into {} segments",
            file.file_name,
            file.len(),
            segments.len()
        );

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_of_size(size: usize) -> MediaFile {
        MediaFile::new("session.m4a", "audio/mp4", vec![0u8; size])
    }

    #[test]
    fn splitting_threshold_is_strict() {
        let processor = FfmpegProcessor::from_env();

        assert!(!processor.needs_splitting(&file_of_size(SPLIT_THRESHOLD_BYTES - 1)));
        assert!(!processor.needs_splitting(&file_of_size(SPLIT_THRESHOLD_BYTES)));
        assert!(processor.needs_splitting(&file_of_size(SPLIT_THRESHOLD_BYTES + 1)));
    }

    #[test]
    fn normalized_name_replaces_extension() {
        let file = MediaFile::new("visit-03.mov", "video/quicktime", vec![1, 2, 3]);
        assert_eq!(file.with_suffix(NORMALIZED_SUFFIX), "visit-03-processed.m4a");
        assert_eq!(file.extension().as_deref(), Some("mov"));
    }

    #[test]
    fn segment_names_are_zero_padded() {
        assert_eq!(FfmpegProcessor::segment_name(0), "part_000.m4a");
        assert_eq!(FfmpegProcessor::segment_name(12), "part_012.m4a");
    }

    /// One second of silent 16 kHz mono PCM in a RIFF container.
    fn silent_wav_probe() -> Vec<u8> {
        let sample_rate: u32 = 16_000;
        let channels: u16 = 1;
        let sample_count: usize = 16_000;
        let mut wav = Vec::with_capacity(44 + sample_count * 2);

        wav.extend_from_slice(b"RIFF");
        let file_size = (36 + sample_count * 2) as u32;
        wav.extend_from_slice(&file_size.to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&channels.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        let byte_rate = sample_rate * channels as u32 * 2;
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&(channels * 2).to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());

        wav.extend_from_slice(b"data");
        let data_size = (sample_count * 2) as u32;
        wav.extend_from_slice(&data_size.to_le_bytes());
        wav.extend(std::iter::repeat(0u8).take(sample_count * 2));

        wav
    }

    // Needs an ffmpeg binary on PATH; run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn normalize_produces_aac_output_for_real_audio() {
        let processor = FfmpegProcessor::from_env();
        let input = MediaFile::new("probe.wav", "audio/wav", silent_wav_probe());

        let output = processor.normalize(input, &|_, _| {}).await.unwrap();

        assert_eq!(output.file_name, "probe-processed.m4a");
        assert_eq!(output.mime_type, "audio/mp4");
        assert!(!output.is_empty());
    }
}
