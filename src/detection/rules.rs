//! Rule profiles: named selections of signature sets.
//!
//! `Full` is the complete signature catalogue used for request analysis. `Lightweight` is the
//! keyword catalogue applied to externally submitted security events. Both run on the same
//! `SignatureSet` engine.

use serde::{Deserialize, Serialize};

use super::signature::{SignatureGroup, SignatureSet};
use super::types::{AttackType, Confidence, RiskLevel, Subtype};
use super::{path_traversal, sql_injection, xss};
use crate::error_handling::types::DetectionError;

const SQL_KEYWORDS: &[&str] = &["select", "union", "drop", "insert", "1=1"];
const XSS_KEYWORDS: &[&str] = &["<script>", "javascript:", "onload="];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleProfile {
    Full,
    #[default]
    Lightweight,
}

/// Build the ordered signature sets of a profile. Order is the evaluation order.
pub fn load(profile: RuleProfile) -> Result<Vec<SignatureSet>, DetectionError> {
    match profile {
        RuleProfile::Full => Ok(vec![
            sql_injection::signatures()?,
            xss::signatures()?,
            path_traversal::signatures()?,
        ]),
        RuleProfile::Lightweight => Ok(vec![
            SignatureSet::new(
                AttackType::SqlInjection,
                Confidence::Low,
                vec![SignatureGroup::keywords(
                    Subtype::Keyword,
                    RiskLevel::High,
                    SQL_KEYWORDS,
                )?],
            ),
            SignatureSet::new(
                AttackType::Xss,
                Confidence::Low,
                vec![SignatureGroup::keywords(
                    Subtype::Keyword,
                    RiskLevel::High,
                    XSS_KEYWORDS,
                )?],
            ),
        ]),
    }
}
