use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::risk::RiskSummary;
use crate::detection::Detection;
use crate::error_handling::types::AnalysisError;
use crate::events::types::{Classification, SecurityEvent};
use crate::storage::types::DailyStatistics;

use super::stats::MemoryStats;

/// HTTP request description submitted by a sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Accepted for compatibility, never inspected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    pub sandbox_id: String,
}

impl AnalysisRequest {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        for (field, value) in [
            ("method", &self.method),
            ("url", &self.url),
            ("sandbox_id", &self.sandbox_id),
        ] {
            if value.trim().is_empty() {
                return Err(AnalysisError::InvalidInput(format!(
                    "`{}` must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub request_id: i64,
    pub method: String,
    pub url: String,
    pub params_count: usize,
    pub sandbox_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub request_info: RequestInfo,
    pub detections: Vec<Detection>,
    pub summary: RiskSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub success: bool,
    pub index: usize,
    pub error: String,
}

impl FailedItem {
    pub fn new(index: usize, error: &AnalysisError) -> Self {
        Self {
            success: false,
            index,
            error: error.to_string(),
        }
    }
}

/// One entry of a batch result, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItem {
    Analyzed(AnalysisResult),
    Failed(FailedItem),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub total_requests: usize,
    pub total_detections: usize,
    pub failed: usize,
    pub results: Vec<BatchItem>,
}

/// Outcome of accepting a security event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventReceipt {
    pub event: SecurityEvent,
    pub classification: Classification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectorCounts {
    pub sql_injection: u64,
    pub xss: u64,
    pub path_traversal: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub total_requests: u64,
    pub total_attacks: u64,
    pub attack_ratio: String,
    pub detectors: DetectorCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventStats {
    pub total_events: u64,
    pub detected_attacks: u64,
    pub events_attack_ratio: String,
}

/// Statistics view combining the durable counters of today and the in-memory mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub memory_stats: MemoryStats,
    pub database_stats: DailyStatistics,
    pub summary: StatsSummary,
    pub events_stats: EventStats,
}

/// `part` as a percentage of `total`, one decimal, `"0%"` when `total` is zero.
pub fn ratio(part: u64, total: u64) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / total as f64)
}
