// Shared run state and pipeline events

use super::progress::ProcessingProgress;
use crate::analysis::SessionAnalysis;
use serde::Serialize;

/// Terminal artifact of one successful run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub transcript: String,
    pub analysis: SessionAnalysis,
}

/// Snapshot of the one active (or most recent) run.
///
/// Exactly one writer mutates this (the active run, through the watch
/// channel); any number of observers read it. Consumers distinguish
/// "no results yet" (`result` and `error` both `None`) from "error" from
/// "in progress".
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub run_id: Option<String>,
    /// RFC 3339 start timestamp of the current run.
    pub started_at: Option<String>,
    pub progress: Option<ProcessingProgress>,
    pub result: Option<ProcessingResult>,
    pub error: Option<String>,
    pub is_processing: bool,
}

/// Explicit message-passing surface for observers that want a stream
/// instead of polling the state snapshot.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    ProgressUpdated(ProcessingProgress),
    RunCompleted(ProcessingResult),
    RunFailed(String),
}
