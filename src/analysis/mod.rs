// Analysis Module - LLM-backed structured session analysis

mod client;
mod types;

pub use client::AnalysisClient;
pub use types::{AnalysisError, SessionAnalysis};
