//! SQL injection signatures.

use super::signature::{SignatureGroup, SignatureSet};
use super::types::{AttackType, Confidence, RiskLevel, Subtype};
use crate::error_handling::types::DetectionError;

const UNION_BASED: &[&str] = &[
    r"UNION\s+SELECT",
    r"UNION\s+ALL\s+SELECT",
    r"UNION\s+SELECT.*FROM",
    r"UNION\s+SELECT.*WHERE",
];

const STACKED_QUERIES: &[&str] = &[
    r";\s*DROP\s+TABLE",
    r";\s*INSERT\s+INTO",
    r";\s*UPDATE\s+.*SET",
    r";\s*DELETE\s+FROM",
];

// Quote-then-operator input such as `' OR 1=1` is left to BOOLEAN_BASED.
const ERROR_BASED: &[&str] = &[
    r"EXTRACTVALUE\s*\(",
    r"UPDATEXML\s*\(",
    r"CONVERT\s*\(\s*INT",
    r"'.*;.*--",
    r"'.*/\*.*\*/",
];

const BOOLEAN_BASED: &[&str] = &[
    r"OR\s+1=1",
    r"AND\s+1=1",
    r"OR\s+'1'='1",
    r"AND\s+'1'='1",
];

pub fn signatures() -> Result<SignatureSet, DetectionError> {
    Ok(SignatureSet::new(
        AttackType::SqlInjection,
        Confidence::High,
        vec![
            SignatureGroup::patterns(Subtype::UnionBased, RiskLevel::High, UNION_BASED)?,
            SignatureGroup::patterns(Subtype::StackedQueries, RiskLevel::Critical, STACKED_QUERIES)?,
            SignatureGroup::patterns(Subtype::ErrorBased, RiskLevel::Medium, ERROR_BASED)?,
            SignatureGroup::patterns(Subtype::BooleanBased, RiskLevel::Low, BOOLEAN_BASED)?,
        ],
    ))
}
