// Run progress: stages, payload, and the 0-100 partition

use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};

/// Pipeline stage as shown to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    ProcessingAudio,
    Uploading,
    Transcribing,
    Analyzing,
    Complete,
}

/// One progress emission. Transient: superseded by the next emission, no
/// history kept.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingProgress {
    pub stage: ProcessingStage,
    /// 0-100, non-decreasing within one run.
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_processed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
}

/// Disjoint slice of the 0-100 scale owned by one stage.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StageSpan {
    pub start: u8,
    pub end: u8,
}

impl StageSpan {
    /// Map a fraction of stage-internal completion onto the run scale.
    pub fn at(&self, fraction: f64) -> u8 {
        let fraction = fraction.clamp(0.0, 1.0);
        let width = f64::from(self.end - self.start);
        self.start + (fraction * width).round() as u8
    }
}

pub(crate) const PROCESSING_AUDIO_SPAN: StageSpan = StageSpan { start: 0, end: 25 };
pub(crate) const UPLOADING_SPAN: StageSpan = StageSpan { start: 25, end: 30 };
pub(crate) const TRANSCRIBING_SPAN: StageSpan = StageSpan { start: 30, end: 70 };
pub(crate) const ANALYZING_SPAN: StageSpan = StageSpan { start: 70, end: 95 };
pub(crate) const COMPLETE_PROGRESS: u8 = 100;

/// Monotonic clamp: a run's reported progress never regresses, whatever
/// the stages emit.
#[derive(Debug, Default)]
pub(crate) struct ProgressFloor {
    floor: AtomicU8,
}

impl ProgressFloor {
    pub fn reset(&self) {
        self.floor.store(0, Ordering::SeqCst);
    }

    pub fn clamp(&self, value: u8) -> u8 {
        self.floor.fetch_max(value, Ordering::SeqCst).max(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_partition_the_scale_without_overlap() {
        assert_eq!(PROCESSING_AUDIO_SPAN.end, UPLOADING_SPAN.start);
        assert_eq!(UPLOADING_SPAN.end, TRANSCRIBING_SPAN.start);
        assert_eq!(TRANSCRIBING_SPAN.end, ANALYZING_SPAN.start);
        assert!(ANALYZING_SPAN.end < COMPLETE_PROGRESS);
    }

    #[test]
    fn span_maps_fractions_into_its_range() {
        assert_eq!(TRANSCRIBING_SPAN.at(0.0), 30);
        assert_eq!(TRANSCRIBING_SPAN.at(0.5), 50);
        assert_eq!(TRANSCRIBING_SPAN.at(1.0), 70);
        assert_eq!(TRANSCRIBING_SPAN.at(2.5), 70);
    }

    #[test]
    fn floor_never_regresses() {
        let floor = ProgressFloor::default();
        assert_eq!(floor.clamp(10), 10);
        assert_eq!(floor.clamp(40), 40);
        assert_eq!(floor.clamp(25), 40);
        floor.reset();
        assert_eq!(floor.clamp(5), 5);
    }
}
