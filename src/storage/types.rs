use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::detection::{AttackType, Detection, Location, RiskLevel, Subtype};

/// Request description about to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRequest {
    pub method: String,
    pub url: String,
    pub params: Map<String, Value>,
    pub sandbox_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-day counters. Also used as the increment applied by one analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatCounters {
    pub total_requests: u64,
    pub detected_attacks: u64,
    pub sql_injections: u64,
    pub xss_attacks: u64,
    pub path_traversals: u64,
}

impl StatCounters {
    /// Increment contributed by one analyzed request.
    pub fn for_request(detections: &[Detection]) -> Self {
        let count = |attack_type: AttackType| {
            detections
                .iter()
                .filter(|d| d.attack_type == attack_type)
                .count() as u64
        };
        Self {
            total_requests: 1,
            detected_attacks: u64::from(!detections.is_empty()),
            sql_injections: count(AttackType::SqlInjection),
            xss_attacks: count(AttackType::Xss),
            path_traversals: count(AttackType::PathTraversal),
        }
    }

    pub fn add(&mut self, other: &StatCounters) {
        self.total_requests += other.total_requests;
        self.detected_attacks += other.detected_attacks;
        self.sql_injections += other.sql_injections;
        self.xss_attacks += other.xss_attacks;
        self.path_traversals += other.path_traversals;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStatistics {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counters: StatCounters,
}

impl DailyStatistics {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            counters: StatCounters::default(),
        }
    }
}

/// One row of the detections/requests join, newest request first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentDetection {
    pub method: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub sandbox_id: String,
    #[serde(rename = "type")]
    pub attack_type: AttackType,
    pub subtype: Subtype,
    pub risk_level: RiskLevel,
    pub location: Location,
}
