//! Risk scoring policy.

use serde::{Deserialize, Serialize};

use crate::detection::{AttackType, Detection, RiskLevel};

pub const SAFE_RECOMMENDATION: &str = "request is safe";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub total_detections: usize,
    pub risk_level: RiskLevel,
    pub recommendation: String,
}

fn remediation(attack_type: AttackType) -> &'static str {
    match attack_type {
        AttackType::SqlInjection => "use parameterized queries",
        AttackType::Xss => "escape output",
        AttackType::PathTraversal => "validate path inputs",
    }
}

/// Reduce a detection list to its highest risk level and a remediation summary.
pub fn score(detections: &[Detection]) -> RiskSummary {
    let risk_level = detections
        .iter()
        .map(|d| d.risk_level)
        .max()
        .unwrap_or_default();

    let mut seen: Vec<AttackType> = Vec::new();
    for detection in detections {
        if !seen.contains(&detection.attack_type) {
            seen.push(detection.attack_type);
        }
    }
    let recommendation = if seen.is_empty() {
        SAFE_RECOMMENDATION.to_string()
    } else {
        seen.into_iter()
            .map(remediation)
            .collect::<Vec<_>>()
            .join("; ")
    };

    RiskSummary {
        total_detections: detections.len(),
        risk_level,
        recommendation,
    }
}
