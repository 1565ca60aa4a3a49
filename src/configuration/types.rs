use serde::{Deserialize, Serialize};

/// Bounds applied to the `limit` query parameter of the listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLimits {
    pub default: u64,
    pub max: u64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default: 10,
            max: 1000,
        }
    }
}

impl QueryLimits {
    /// Requested limit, or the default, clamped to `[1, max]`.
    pub fn resolve(&self, requested: Option<u64>) -> u64 {
        requested.unwrap_or(self.default).clamp(1, self.max.max(1))
    }
}
