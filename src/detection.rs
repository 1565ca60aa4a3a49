//! Signature detection
//!
//! Pure, stateless classifiers over strings. Each attack category is a `SignatureSet`; the
//! sets are grouped into rule profiles in `rules`.
//!
//! Components:
//! - `types`: attack types, subtypes, risk levels, locations and detection records.
//! - `signature`: the matching engine (first match wins per subtype).
//! - `sql_injection`, `xss`, `path_traversal`: the full signature catalogue.
//! - `rules`: `RuleProfile` and profile loading.

pub mod path_traversal;
pub mod rules;
pub mod signature;
pub mod sql_injection;
pub mod types;
pub mod xss;

pub use rules::RuleProfile;
pub use signature::SignatureSet;
pub use types::{AttackType, Confidence, Detection, DetectionFragment, Location, RiskLevel, Subtype};
