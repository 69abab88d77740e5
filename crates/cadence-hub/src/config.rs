//! Engine configuration
//!
//! Exhaustion costs, the combat round and consumer settings, loaded from
//! RON. Every field has a default, so a config file only names what it
//! changes:
//!
//! ```ron
//! (
//!     costs: (combat_ms: 1500),
//!     idle_wait_ms: 100,
//! )
//! ```

use crate::error::{Error, Result};
use cadence_core::operation::{OperationCosts, OperationFactory};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Longest allowed idle wait and combat round
const MAX_PERIOD_MS: u64 = 60_000;

/// Configuration for the engine and its consumer
///
/// # Example
///
/// ```
/// use cadence_hub::EngineConfig;
///
/// let config = EngineConfig::from_ron_str("(combat_round_ms: 0)").unwrap();
/// // A zero round would let auto attacks spin; it is clamped to 1ms.
/// assert_eq!(config.combat_round_ms, 1);
/// assert_eq!(config.idle_wait_ms, 250);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Exhaustion cost per category
    pub costs: OperationCosts,
    /// Period of credit regeneration, in milliseconds
    pub combat_round_ms: u64,
    /// Longest the consumer sleeps between queue checks, in milliseconds
    pub idle_wait_ms: u64,
    /// How many times a walk-then-act operation may be retried
    pub max_path_retries: u32,
    /// Name of the consumer thread
    pub consumer_thread_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            costs: OperationCosts::default(),
            combat_round_ms: 2000,
            idle_wait_ms: 250,
            max_path_retries: 1,
            consumer_thread_name: "cadence-consumer".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a RON document; out-of-range values are clamped
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: EngineConfig = ron::from_str(text)?;
        config.clamped()
    }

    /// Read and parse a RON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&text)?;
        info!(
            path = %path.display(),
            combat_round_ms = config.combat_round_ms,
            idle_wait_ms = config.idle_wait_ms,
            "config_loaded"
        );
        Ok(config)
    }

    /// Clamp periods into `[1, 60_000]` ms and the combat and walk costs to
    /// at least 1ms
    ///
    /// Self-rescheduling operations come back after a combat round or a
    /// cooldown; with either at zero the consumer would never leave the
    /// current instant.
    pub fn clamped(mut self) -> Result<Self> {
        if self.consumer_thread_name.trim().is_empty() {
            return Err(Error::Config(
                "consumer_thread_name must not be empty".to_string(),
            ));
        }
        if self.consumer_thread_name.contains('\0') {
            return Err(Error::Config(
                "consumer_thread_name must not contain NUL".to_string(),
            ));
        }
        self.combat_round_ms = self.combat_round_ms.clamp(1, MAX_PERIOD_MS);
        self.idle_wait_ms = self.idle_wait_ms.clamp(1, MAX_PERIOD_MS);
        self.costs.combat_ms = self.costs.combat_ms.max(1);
        self.costs.walk_ms = self.costs.walk_ms.max(1);
        Ok(self)
    }

    pub fn combat_round(&self) -> Duration {
        Duration::from_millis(self.combat_round_ms)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    /// The operation factory these settings describe
    pub fn factory(&self) -> OperationFactory {
        OperationFactory::new(self.costs, self.combat_round(), self.max_path_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::ExhaustionType;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.costs.combat_ms, 2000);
        assert_eq!(config.costs.walk_ms, 400);
        assert_eq!(config.costs.action_ms, 250);
        assert_eq!(config.costs.speech_ms, 1000);
        assert_eq!(config.combat_round(), Duration::from_millis(2000));
        assert_eq!(config.max_path_retries, 1);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = EngineConfig::from_ron_str("(costs: (combat_ms: 1500), idle_wait_ms: 100)")
            .unwrap();
        assert_eq!(config.costs.combat_ms, 1500);
        assert_eq!(config.costs.walk_ms, 400);
        assert_eq!(config.idle_wait_ms, 100);
        assert_eq!(config.consumer_thread_name, "cadence-consumer");
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let config = EngineConfig::from_ron_str(
            "(combat_round_ms: 0, idle_wait_ms: 999999, costs: (combat_ms: 0, walk_ms: 0, action_ms: 0))",
        )
        .unwrap();
        assert_eq!(config.combat_round_ms, 1);
        assert_eq!(config.idle_wait_ms, 60_000);
        assert_eq!(config.costs.combat_ms, 1);
        assert_eq!(config.costs.walk_ms, 1);
        // Actions never reschedule themselves, so zero is allowed.
        assert_eq!(config.costs.action_ms, 0);
    }

    #[test]
    fn test_empty_thread_name_is_rejected() {
        let result = EngineConfig::from_ron_str("(consumer_thread_name: \"  \")");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_document() {
        let result = EngineConfig::from_ron_str("(combat_round_ms: \"soon\")");
        assert!(matches!(result, Err(Error::Ron(_))));
    }

    #[test]
    fn test_factory_uses_costs() {
        let config = EngineConfig::from_ron_str("(costs: (walk_ms: 600))").unwrap();
        let factory = config.factory();
        assert_eq!(
            factory.costs().cost(ExhaustionType::Walk),
            Duration::from_millis(600)
        );
        assert_eq!(factory.combat_round(), config.combat_round());
    }

    #[test]
    fn test_load_missing_file() {
        let result = EngineConfig::load("/nonexistent/cadence.ron");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
