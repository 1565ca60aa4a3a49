//! Security event intake types and payload classification.

pub mod classifier;
pub mod types;

pub use classifier::EventClassifier;
