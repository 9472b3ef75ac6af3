//! Engine configuration.
//!
//! [`EngineConfig`] gathers the read-only inputs shared by every
//! calculation: the wage-cap table, the overlap strategy, the regime
//! cutoff and the window length.  It is built once at startup and only
//! ever read afterwards.

use crate::average::WINDOW_DAYS;
use crate::caps::WageCapTable;
use crate::conservation::default_regime_cutoff;
use crate::error::ConfigError;
use crate::overlap::OverlapStrategy;
use chrono::NaiveDate;
use std::path::Path;

/// Path to a JSON wage-cap table replacing the built-in one.
pub const WAGE_CAPS_VAR: &str = "PENSION_WAGE_CAPS";
/// `lowest_wage` or `sum_capped`.
pub const OVERLAP_STRATEGY_VAR: &str = "PENSION_OVERLAP_STRATEGY";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub wage_caps: WageCapTable,
    pub overlap_strategy: OverlapStrategy,
    /// First registrations before this date fall under the 1973 law.
    pub regime_cutoff: NaiveDate,
    /// Day budget of the wage average.
    pub window_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wage_caps: WageCapTable::historical(),
            overlap_strategy: OverlapStrategy::default(),
            regime_cutoff: default_regime_cutoff(),
            window_days: WINDOW_DAYS,
        }
    }
}

impl EngineConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    /// Unset or empty variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(WAGE_CAPS_VAR) {
            config.wage_caps = WageCapTable::load_from_file(Path::new(path.trim()))?;
            tracing::info!(path = %path, "loaded wage cap table");
        }
        if let Some(value) = get(OVERLAP_STRATEGY_VAR) {
            config.overlap_strategy = value.parse().map_err(|_| ConfigError::InvalidValue {
                name: OVERLAP_STRATEGY_VAR.to_string(),
                value: value.clone(),
            })?;
        }
        Ok(config)
    }
}
