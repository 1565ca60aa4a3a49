//! Request analysis: orchestration, risk scoring and statistics.

pub mod analyzer;
pub mod risk;
pub mod stats;
pub mod types;

pub use analyzer::{Analyzer, AnalyzerSettings};
pub use types::{AnalysisRequest, AnalysisResult, BatchOutcome};
