// Batch orchestration - bounded-concurrency segment transcription

use super::{TranscriptionBackend, TranscriptionError, TranscriptionResult};
use crate::media::Segment;
use futures::future::try_join_all;

/// Segments transcribed concurrently per group.
pub const BATCH_SIZE: usize = 4;

/// Callback invoked after each completed group: (segments done, total).
pub type BatchProgressFn<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Drive every segment through the backend in fixed-size concurrent groups
/// and merge the results into one transcript.
///
/// Results are stored by the segment's ordinal index, never by completion
/// order, so consolidation is correct regardless of which request finishes
/// first. A single failure aborts the whole run; groups after the failing
/// one are never started.
pub async fn transcribe_all(
    backend: &dyn TranscriptionBackend,
    segments: &[Segment],
    on_progress: BatchProgressFn<'_>,
) -> Result<TranscriptionResult, TranscriptionError> {
    let total = segments.len();
    let mut ordered: Vec<Option<TranscriptionResult>> = (0..total).map(|_| None).collect();
    let mut done = 0usize;

    tracing::info!("Transcribing {} segments in groups of {}", total, BATCH_SIZE);

    for group in segments.chunks(BATCH_SIZE) {
        let requests = group.iter().map(|segment| async move {
            let result = backend.transcribe_media(&segment.media).await?;
            Ok::<_, TranscriptionError>((segment.index, result))
        });

        // Barrier: the whole group resolves before the next group starts;
        // the first error aborts everything still in flight.
        let results = try_join_all(requests).await?;

        for (index, result) in results {
            // Split assigns indexes 0..n in order, so each lands in its slot.
            ordered[index] = Some(result);
        }

        done += group.len();
        tracing::info!("Transcribed {}/{} segments", done, total);
        on_progress(done, total);
    }

    let results: Vec<TranscriptionResult> = ordered.into_iter().flatten().collect();
    Ok(consolidate(&results))
}

/// Deterministic merge of ordered per-segment results: ordinal-order
/// space-joined text, concatenated word lists, arithmetic-mean confidence.
pub fn consolidate(results: &[TranscriptionResult]) -> TranscriptionResult {
    let text = results
        .iter()
        .map(|r| r.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let words = results
        .iter()
        .flat_map(|r| r.words.iter().cloned())
        .collect();

    let confidence = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64
    };

    TranscriptionResult {
        text,
        words,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaFile;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    fn make_segments(count: usize) -> Vec<Segment> {
        (0..count)
            .map(|index| Segment {
                index,
                media: MediaFile::new(format!("part_{:03}.m4a", index), "audio/mp4", vec![0u8; 8]),
            })
            .collect()
    }

    fn segment_index(media: &MediaFile) -> usize {
        media.file_name[5..8].parse().unwrap()
    }

    /// Backend whose responses finish in an order unrelated to ordinals.
    struct ScrambledBackend {
        called: Mutex<Vec<usize>>,
        fail_at: Option<usize>,
    }

    impl ScrambledBackend {
        fn new(fail_at: Option<usize>) -> Self {
            Self {
                called: Mutex::new(Vec::new()),
                fail_at,
            }
        }
    }

    #[async_trait]
    impl TranscriptionBackend for ScrambledBackend {
        async fn transcribe_media(
            &self,
            media: &MediaFile,
        ) -> Result<TranscriptionResult, TranscriptionError> {
            let index = segment_index(media);
            self.called.lock().unwrap().push(index);

            // Lower ordinals sleep longer, so completion order inside a
            // group is the reverse of ordinal order.
            tokio::time::sleep(Duration::from_millis(40u64.saturating_sub(index as u64 * 10)))
                .await;

            if self.fail_at == Some(index) {
                return Err(TranscriptionError::Vendor(format!(
                    "segment {} rejected",
                    index
                )));
            }

            Ok(TranscriptionResult {
                text: format!("segment-{}", index),
                words: Vec::new(),
                confidence: 0.5 + index as f64 / 10.0,
            })
        }

        async fn transcribe_stored(
            &self,
            _key: &str,
        ) -> Result<TranscriptionResult, TranscriptionError> {
            unreachable!("batch never transcribes by key")
        }
    }

    #[tokio::test]
    async fn consolidation_is_invariant_to_completion_order() {
        let backend = ScrambledBackend::new(None);
        let segments = make_segments(4);

        let result = transcribe_all(&backend, &segments, &|_, _| {})
            .await
            .unwrap();

        assert_eq!(result.text, "segment-0 segment-1 segment-2 segment-3");
    }

    #[tokio::test]
    async fn progress_reports_after_each_group() {
        let backend = ScrambledBackend::new(None);
        let segments = make_segments(6);
        let seen: Mutex<Vec<(usize, usize)>> = Mutex::new(Vec::new());

        transcribe_all(&backend, &segments, &|done, total| {
            seen.lock().unwrap().push((done, total));
        })
        .await
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(4, 6), (6, 6)]);
    }

    #[tokio::test]
    async fn one_failure_aborts_before_later_groups_start() {
        let backend = ScrambledBackend::new(Some(1));
        let segments = make_segments(8);

        let result = transcribe_all(&backend, &segments, &|_, _| {}).await;

        assert!(matches!(result, Err(TranscriptionError::Vendor(_))));
        let called = backend.called.lock().unwrap();
        assert!(
            called.iter().all(|&index| index < BATCH_SIZE),
            "second group must never start, saw {:?}",
            *called
        );
    }

    #[test]
    fn consolidate_averages_confidence_and_joins_text() {
        let results = vec![
            TranscriptionResult {
                text: "one".into(),
                words: Vec::new(),
                confidence: 0.8,
            },
            TranscriptionResult {
                text: "two".into(),
                words: Vec::new(),
                confidence: 0.6,
            },
        ];

        let merged = consolidate(&results);
        assert_eq!(merged.text, "one two");
        assert!((merged.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn consolidate_skips_empty_segment_text() {
        let results = vec![
            TranscriptionResult {
                text: "start".into(),
                words: Vec::new(),
                confidence: 1.0,
            },
            TranscriptionResult {
                text: String::new(),
                words: Vec::new(),
                confidence: 0.0,
            },
            TranscriptionResult {
                text: "end".into(),
                words: Vec::new(),
                confidence: 1.0,
            },
        ];

        assert_eq!(consolidate(&results).text, "start end");
    }
}
