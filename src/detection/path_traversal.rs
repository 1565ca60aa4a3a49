//! Path traversal signatures. A single flat group, so one input yields at most one hit.

use super::signature::{SignatureGroup, SignatureSet};
use super::types::{AttackType, Confidence, RiskLevel, Subtype};
use crate::error_handling::types::DetectionError;

const TRAVERSAL: &[&str] = &[
    r"\.\./",
    r"\.\.\\",
    r"\.\.%2f",
    r"\.\.%5c",
    r"\.\.%00",
    r"etc/passwd",
    r"windows/win\.ini",
];

pub fn signatures() -> Result<SignatureSet, DetectionError> {
    Ok(SignatureSet::new(
        AttackType::PathTraversal,
        Confidence::Medium,
        vec![SignatureGroup::patterns(
            Subtype::Direct,
            RiskLevel::High,
            TRAVERSAL,
        )?],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_dot_slash() {
        let fragments = signatures().unwrap().detect("../../etc/passwd");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].attack_type, AttackType::PathTraversal);
        assert_eq!(fragments[0].subtype, Subtype::Direct);
        assert_eq!(fragments[0].pattern, r"\.\./");
        assert_eq!(fragments[0].risk_level, RiskLevel::High);
        assert_eq!(fragments[0].confidence, Confidence::Medium);
    }

    #[test]
    fn test_encoded_and_windows_variants() {
        let set = signatures().unwrap();
        assert_eq!(set.detect("..%2F..%2Fsecret").len(), 1);
        assert_eq!(set.detect("..\\windows\\win.ini").len(), 1);
        assert_eq!(set.detect("C:/Windows/win.ini")[0].pattern, r"windows/win\.ini");
    }

    #[test]
    fn test_plain_file_name() {
        assert!(signatures().unwrap().detect("normal_file.txt").is_empty());
    }
}
