use log::debug;

use super::types::{Classification, SecurityEvent};
use crate::detection::rules::{self, RuleProfile};
use crate::detection::SignatureSet;
use crate::error_handling::types::DetectionError;

/// Classifies security events by their payload. The first rule set with a hit decides the
/// attack type; events without a payload are benign.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    rule_sets: Vec<SignatureSet>,
}

impl EventClassifier {
    pub fn new(profile: RuleProfile) -> Result<Self, DetectionError> {
        Ok(Self {
            rule_sets: rules::load(profile)?,
        })
    }

    pub fn classify(&self, event: &SecurityEvent) -> Classification {
        let Some(payload) = event.payload.as_deref() else {
            return Classification::benign();
        };

        match self
            .rule_sets
            .iter()
            .find(|set| !set.detect(payload).is_empty())
        {
            Some(set) => {
                debug!(
                    "Event {} matched {} rules",
                    event.event_id,
                    set.attack_type()
                );
                Classification::attack(set.attack_type())
            }
            None => Classification::benign(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::AttackType;
    use crate::events::types::SecurityEventInput;
    use chrono::Utc;

    fn event(payload: Option<&str>) -> SecurityEvent {
        SecurityEvent::accept(
            "evt-test".to_string(),
            SecurityEventInput {
                timestamp: 1_700_000_000.0,
                event_type: "http_request".to_string(),
                source_ip: "203.0.113.7".to_string(),
                destination_ip: "10.0.0.5".to_string(),
                description: "inbound request".to_string(),
                payload: payload.map(str::to_string),
                user_agent: None,
                method: "POST".to_string(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_sql_keyword_classifies_as_sql_injection() {
        let classifier = EventClassifier::new(RuleProfile::Lightweight).unwrap();
        let result = classifier.classify(&event(Some("id=1 UNION SELECT password")));
        assert_eq!(result, Classification::attack(AttackType::SqlInjection));
    }

    #[test]
    fn test_first_rule_set_wins() {
        let classifier = EventClassifier::new(RuleProfile::Lightweight).unwrap();
        let result = classifier.classify(&event(Some("<script>select 1</script>")));
        assert_eq!(result.attack_type, Some(AttackType::SqlInjection));
    }

    #[test]
    fn test_xss_keyword() {
        let classifier = EventClassifier::new(RuleProfile::Lightweight).unwrap();
        let result = classifier.classify(&event(Some("<a href=\"javascript:alert(1)\">")));
        assert_eq!(result, Classification::attack(AttackType::Xss));
    }

    #[test]
    fn test_benign_and_missing_payload() {
        let classifier = EventClassifier::new(RuleProfile::Lightweight).unwrap();
        assert_eq!(classifier.classify(&event(Some("hello world"))), Classification::benign());
        assert_eq!(classifier.classify(&event(None)), Classification::benign());
    }

    #[test]
    fn test_full_profile_detects_path_traversal() {
        let classifier = EventClassifier::new(RuleProfile::Full).unwrap();
        let result = classifier.classify(&event(Some("../../etc/passwd")));
        assert_eq!(result, Classification::attack(AttackType::PathTraversal));
    }
}
