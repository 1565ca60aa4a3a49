//! Cross-site scripting signatures.

use super::signature::{SignatureGroup, SignatureSet};
use super::types::{AttackType, Confidence, RiskLevel, Subtype};
use crate::error_handling::types::DetectionError;

const SCRIPT_TAGS: &[&str] = &[r"<script.*?>.*?</script>", r"<script.*?>", r"</script>"];

const EVENT_HANDLERS: &[&str] = &[
    r"onload\s*=",
    r"onerror\s*=",
    r"onclick\s*=",
    r"onmouseover\s*=",
    r"onfocus\s*=",
];

const JAVASCRIPT_PROTOCOL: &[&str] = &[r"javascript:", r"jscript:", r"vbscript:", r"data:"];

const SVG_INJECTION: &[&str] = &[r"<svg.*?>", r"<img.*?onerror=.*?>", r"<body.*?onload=.*?>"];

pub fn signatures() -> Result<SignatureSet, DetectionError> {
    Ok(SignatureSet::new(
        AttackType::Xss,
        Confidence::High,
        vec![
            SignatureGroup::patterns(Subtype::ScriptTags, RiskLevel::High, SCRIPT_TAGS)?,
            SignatureGroup::patterns(Subtype::EventHandlers, RiskLevel::Medium, EVENT_HANDLERS)?,
            SignatureGroup::patterns(
                Subtype::JavascriptProtocol,
                RiskLevel::Medium,
                JAVASCRIPT_PROTOCOL,
            )?,
            SignatureGroup::patterns(Subtype::SvgInjection, RiskLevel::High, SVG_INJECTION)?,
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_tag() {
        let fragments = signatures().unwrap().detect("<script>alert('XSS')</script>");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].attack_type, AttackType::Xss);
        assert_eq!(fragments[0].subtype, Subtype::ScriptTags);
        assert_eq!(fragments[0].pattern, r"<script.*?>.*?</script>");
        assert_eq!(fragments[0].risk_level, RiskLevel::High);
    }

    #[test]
    fn test_img_onerror_hits_handler_and_svg_groups() {
        let fragments = signatures().unwrap().detect("<img src=x onerror=alert(1)>");
        let subtypes: Vec<Subtype> = fragments.iter().map(|f| f.subtype).collect();
        assert_eq!(subtypes, vec![Subtype::EventHandlers, Subtype::SvgInjection]);
    }

    #[test]
    fn test_protocol_case_insensitive() {
        let fragments = signatures().unwrap().detect("JaVaScRiPt:alert('XSS')");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].subtype, Subtype::JavascriptProtocol);
        assert_eq!(fragments[0].risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_plain_text() {
        assert!(signatures().unwrap().detect("normal text").is_empty());
    }
}
