use serde::Serialize;

/// A broken invariant, as recorded by the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub invariant: String,
    pub details: String,
}

impl Violation {
    pub fn new(invariant: impl Into<String>, details: impl Into<String>) -> Self {
        Violation {
            invariant: invariant.into(),
            details: details.into(),
        }
    }
}

/// Errors that can occur while running the harness.
///
/// Timeouts, fill drift and stale scratch reads are not errors; they are
/// reported as data on the corresponding outcome types.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HarnessError {
    /// Pool was asked for zero execution units.
    #[error("Worker pool needs at least one unit, got {0}")]
    InvalidPool(usize),

    /// Work was submitted after the pool stopped accepting it.
    #[error("Worker pool is shut down")]
    PoolClosed,

    /// An execution unit could not be started.
    #[error("Failed to spawn worker unit {unit}")]
    Spawn {
        unit: usize,
        #[source]
        source: std::io::Error,
    },

    /// A guaranteed invariant did not hold after a completed run.
    #[error("Invariant '{}' violated: {}", .0.invariant, .0.details)]
    InvariantViolated(Violation),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}

impl HarnessError {
    /// Returns true if this error reports a broken invariant rather than a setup failure.
    pub fn is_invariant(&self) -> bool {
        matches!(self, HarnessError::InvariantViolated(_))
    }

    /// The violation carried by this error, if any.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            HarnessError::InvariantViolated(v) => Some(v),
            _ => None,
        }
    }
}

impl From<hazard_config::ConfigError> for HarnessError {
    fn from(e: hazard_config::ConfigError) -> Self {
        HarnessError::Config(e.to_string())
    }
}
