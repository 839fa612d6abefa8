use crate::plan::Dialect;
use std::time::Duration;

/// Default number of statements retained per correlation scope.
const DEFAULT_MAX_HISTORY: usize = 128;

/// Default execution count at which a repeated template counts as N+1.
const DEFAULT_N_PLUS_ONE_THRESHOLD: usize = 2;

/// Configuration for the capture and correlation engine.
///
/// With the defaults, plan retrieval is disabled and no caller frame will
/// match, so diagnostics carry the unknown-method sentinel. Set a base path
/// and a dialect to get useful output.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Base path identifying application code during caller resolution.
    pub base_path: String,
    /// Dialect used for plan retrieval.
    pub dialect: Dialect,
    /// Maximum finalized statements retained per scope.
    pub max_history: usize,
    /// Timeout for the plan round trip. `None` means no timeout (default).
    pub plan_timeout: Option<Duration>,
    /// Executions of one template within a scope at which the N+1 warning
    /// fires.
    pub n_plus_one_threshold: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            dialect: Dialect::Disabled,
            max_history: DEFAULT_MAX_HISTORY,
            plan_timeout: None,
            n_plus_one_threshold: DEFAULT_N_PLUS_ONE_THRESHOLD,
        }
    }
}

impl WatchConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base path used for caller-context resolution.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Select the plan-retrieval dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Select the dialect from a driver identifier, falling back to
    /// [`Dialect::Disabled`] (with a warning) when none matches.
    pub fn with_driver(mut self, driver: &str) -> Self {
        self.dialect = match Dialect::from_driver(driver) {
            Ok(dialect) => dialect,
            Err(e) => {
                tracing::warn!(
                    target: "planwatch",
                    error = %e,
                    "no plan provider for configured database; plan retrieval disabled"
                );
                Dialect::Disabled
            }
        };
        self
    }

    /// Cap the number of statements retained per scope.
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Bound the plan-provider round trip.
    ///
    /// Expiry is treated like any other provider failure: empty plan,
    /// warning logged, pipeline continues.
    pub fn with_plan_timeout(mut self, timeout: Duration) -> Self {
        self.plan_timeout = Some(timeout);
        self
    }

    /// Set the repeat count at which a template triggers the N+1 warning.
    ///
    /// Values below 2 are treated as 2: a template has to repeat at all
    /// before it can be an N+1 pattern.
    pub fn with_n_plus_one_threshold(mut self, threshold: usize) -> Self {
        self.n_plus_one_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = WatchConfig::new();
        assert_eq!(config.dialect, Dialect::Disabled);
        assert_eq!(config.max_history, DEFAULT_MAX_HISTORY);
        assert!(config.plan_timeout.is_none());
        assert!(config.base_path.is_empty());
        assert_eq!(config.n_plus_one_threshold, DEFAULT_N_PLUS_ONE_THRESHOLD);
    }

    #[test]
    fn unknown_driver_falls_back_to_disabled() {
        let config = WatchConfig::new().with_driver("org.h2.Driver");
        assert_eq!(config.dialect, Dialect::Disabled);
    }

    #[test]
    fn known_driver_selects_dialect() {
        let config = WatchConfig::new().with_driver("jdbc:mysql://localhost/app");
        assert_eq!(config.dialect, Dialect::MySql);
    }
}
