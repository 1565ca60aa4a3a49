use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detection::AttackType;

fn default_method() -> String {
    "GET".to_string()
}

/// Security event as submitted by an external sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEventInput {
    /// Sensor-side UNIX timestamp, in seconds
    pub timestamp: f64,
    pub event_type: String,
    pub source_ip: String,
    pub destination_ip: String,
    pub description: String,
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
}

/// Security event once accepted and stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub event_id: String,
    pub timestamp: f64,
    pub event_type: String,
    pub source_ip: String,
    pub destination_ip: String,
    pub description: String,
    pub payload: Option<String>,
    pub user_agent: Option<String>,
    pub method: String,
    pub received_at: DateTime<Utc>,
}

impl SecurityEvent {
    pub fn accept(event_id: String, input: SecurityEventInput, received_at: DateTime<Utc>) -> Self {
        Self {
            event_id,
            timestamp: input.timestamp,
            event_type: input.event_type,
            source_ip: input.source_ip,
            destination_ip: input.destination_ip,
            description: input.description,
            payload: input.payload,
            user_agent: input.user_agent,
            method: input.method,
            received_at,
        }
    }
}

/// Attack derived from a security event whose payload matched a rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackEvent {
    pub event_id: String,
    pub source_event_id: String,
    pub timestamp: f64,
    pub attack_type: AttackType,
    pub source_ip: String,
    pub destination_ip: String,
    pub description: String,
    pub payload: Option<String>,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub is_attack: bool,
    pub attack_type: Option<AttackType>,
}

impl Classification {
    pub fn benign() -> Self {
        Self {
            is_attack: false,
            attack_type: None,
        }
    }

    pub fn attack(attack_type: AttackType) -> Self {
        Self {
            is_attack: true,
            attack_type: Some(attack_type),
        }
    }
}
