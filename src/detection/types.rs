use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Attack category a signature set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttackType {
    SqlInjection,
    Xss,
    PathTraversal,
}

impl AttackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackType::SqlInjection => "SQL_INJECTION",
            AttackType::Xss => "XSS",
            AttackType::PathTraversal => "PATH_TRAVERSAL",
        }
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttackType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SQL_INJECTION" => Ok(AttackType::SqlInjection),
            "XSS" => Ok(AttackType::Xss),
            "PATH_TRAVERSAL" => Ok(AttackType::PathTraversal),
            other => Err(format!("unknown attack type `{}`", other)),
        }
    }
}

/// Named sub-category inside an attack type. All signatures of one subtype share a risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Subtype {
    UnionBased,
    StackedQueries,
    ErrorBased,
    BooleanBased,
    ScriptTags,
    EventHandlers,
    JavascriptProtocol,
    SvgInjection,
    /// Generic marker for categories without subtype distinction
    Direct,
    /// Literal keyword hit from a lightweight rule set
    Keyword,
}

impl Subtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subtype::UnionBased => "UNION_BASED",
            Subtype::StackedQueries => "STACKED_QUERIES",
            Subtype::ErrorBased => "ERROR_BASED",
            Subtype::BooleanBased => "BOOLEAN_BASED",
            Subtype::ScriptTags => "SCRIPT_TAGS",
            Subtype::EventHandlers => "EVENT_HANDLERS",
            Subtype::JavascriptProtocol => "JAVASCRIPT_PROTOCOL",
            Subtype::SvgInjection => "SVG_INJECTION",
            Subtype::Direct => "DIRECT",
            Subtype::Keyword => "KEYWORD",
        }
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subtype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNION_BASED" => Ok(Subtype::UnionBased),
            "STACKED_QUERIES" => Ok(Subtype::StackedQueries),
            "ERROR_BASED" => Ok(Subtype::ErrorBased),
            "BOOLEAN_BASED" => Ok(Subtype::BooleanBased),
            "SCRIPT_TAGS" => Ok(Subtype::ScriptTags),
            "EVENT_HANDLERS" => Ok(Subtype::EventHandlers),
            "JAVASCRIPT_PROTOCOL" => Ok(Subtype::JavascriptProtocol),
            "SVG_INJECTION" => Ok(Subtype::SvgInjection),
            "DIRECT" => Ok(Subtype::Direct),
            "KEYWORD" => Ok(Subtype::Keyword),
            other => Err(format!("unknown subtype `{}`", other)),
        }
    }
}

/// Ordinal severity. Variant order drives `Ord`: LOW < MEDIUM < HIGH < CRITICAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn ordinal(&self) -> u8 {
        match self {
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
            RiskLevel::Critical => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            "CRITICAL" => Ok(RiskLevel::Critical),
            other => Err(format!("unknown risk level `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        }
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Confidence::Low),
            "MEDIUM" => Ok(Confidence::Medium),
            "HIGH" => Ok(Confidence::High),
            other => Err(format!("unknown confidence `{}`", other)),
        }
    }
}

/// Where in a request a detection fired. Serialized as `URL` or `PARAM_<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Location {
    Url,
    Param(String),
}

const PARAM_PREFIX: &str = "PARAM_";

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Url => f.write_str("URL"),
            Location::Param(name) => write!(f, "{}{}", PARAM_PREFIX, name),
        }
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "URL" {
            return Ok(Location::Url);
        }
        match s.strip_prefix(PARAM_PREFIX) {
            Some(name) => Ok(Location::Param(name.to_string())),
            None => Err(format!("unknown location `{}`", s)),
        }
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.to_string()
    }
}

impl TryFrom<String> for Location {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Signature hit on one piece of text, before it is tied to a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionFragment {
    pub attack_type: AttackType,
    pub subtype: Subtype,
    pub pattern: String,
    pub input_sample: String,
    pub risk_level: RiskLevel,
    pub confidence: Confidence,
}

impl DetectionFragment {
    pub fn at(self, location: Location) -> Detection {
        Detection {
            attack_type: self.attack_type,
            subtype: self.subtype,
            location,
            pattern: self.pattern,
            input_sample: self.input_sample,
            risk_level: self.risk_level,
            confidence: self.confidence,
        }
    }
}

/// A located signature hit, as returned to callers and persisted in `detections`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "type")]
    pub attack_type: AttackType,
    pub subtype: Subtype,
    pub location: Location,
    pub pattern: String,
    pub input_sample: String,
    pub risk_level: RiskLevel,
    pub confidence: Confidence,
}
