//! Signature matching engine shared by every rule set.
//!
//! A `SignatureSet` holds an ordered list of `SignatureGroup`s. Each group is a subtype with a
//! fixed risk level and an ordered list of case-insensitive patterns. Within a group the first
//! matching pattern wins; every group is evaluated, so several subtypes can fire on one input.

use regex::{Regex, RegexBuilder};

use super::types::{AttackType, Confidence, DetectionFragment, RiskLevel, Subtype};
use crate::error_handling::types::DetectionError;

/// Maximum number of characters kept from the matched text.
pub const INPUT_SAMPLE_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct Signature {
    source: String,
    regex: Regex,
}

impl Signature {
    /// Compile a case-insensitive regular expression signature.
    pub fn pattern(source: &str) -> Result<Self, DetectionError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| DetectionError::InvalidSignature(format!("{}: {}", source, e)))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Compile a literal keyword, matched case-insensitively anywhere in the text.
    pub fn keyword(literal: &str) -> Result<Self, DetectionError> {
        let mut signature = Self::pattern(&regex::escape(literal))?;
        signature.source = literal.to_string();
        Ok(signature)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

#[derive(Debug, Clone)]
pub struct SignatureGroup {
    pub subtype: Subtype,
    pub risk_level: RiskLevel,
    pub signatures: Vec<Signature>,
}

impl SignatureGroup {
    pub fn patterns(
        subtype: Subtype,
        risk_level: RiskLevel,
        sources: &[&str],
    ) -> Result<Self, DetectionError> {
        let signatures = sources
            .iter()
            .map(|s| Signature::pattern(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            subtype,
            risk_level,
            signatures,
        })
    }

    pub fn keywords(
        subtype: Subtype,
        risk_level: RiskLevel,
        literals: &[&str],
    ) -> Result<Self, DetectionError> {
        let signatures = literals
            .iter()
            .map(|s| Signature::keyword(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            subtype,
            risk_level,
            signatures,
        })
    }

    /// First signature of the group matching `text`.
    pub fn first_match(&self, text: &str) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.is_match(text))
    }
}

/// All signature groups of one attack category.
#[derive(Debug, Clone)]
pub struct SignatureSet {
    attack_type: AttackType,
    confidence: Confidence,
    groups: Vec<SignatureGroup>,
}

impl SignatureSet {
    pub fn new(attack_type: AttackType, confidence: Confidence, groups: Vec<SignatureGroup>) -> Self {
        Self {
            attack_type,
            confidence,
            groups,
        }
    }

    pub fn attack_type(&self) -> AttackType {
        self.attack_type
    }

    pub fn detect(&self, text: &str) -> Vec<DetectionFragment> {
        self.groups
            .iter()
            .filter_map(|group| {
                group.first_match(text).map(|signature| DetectionFragment {
                    attack_type: self.attack_type,
                    subtype: group.subtype,
                    pattern: signature.source().to_string(),
                    input_sample: input_sample(text),
                    risk_level: group.risk_level,
                    confidence: self.confidence,
                })
            })
            .collect()
    }
}

fn input_sample(text: &str) -> String {
    text.chars().take(INPUT_SAMPLE_LEN).collect()
}
