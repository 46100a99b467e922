//! Circuit configuration.

use serde::{Deserialize, Serialize};

/// Tunables of a circuit.
///
/// ```rust,ignore
/// let config = CircuitConfig::from_json(r#"{ "max_flush_passes": 64 }"#)?;
/// let circuit: Circuit = Circuit::with_config(config);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Upper bound on consecutive flush passes that leave dirty props behind.
    ///
    /// `None` (the default) keeps scheduling passes until the pending set is
    /// empty, which never ends for compute functions that never settle. With a
    /// limit, the flush that would exceed it reports `FlushLimitExceeded`
    /// instead of running.
    pub max_flush_passes: Option<usize>,
}

impl CircuitConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Set the pass limit.
    pub fn with_max_flush_passes(mut self, passes: usize) -> Self {
        self.max_flush_passes = Some(passes);
        self
    }
}
