//! Engine configuration with documented defaults.
//!
//! Every field has a default, so a partial JSON document is enough:
//!
//! ```
//! use civsim_core::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "batch_size": 256, "seed": 7 }"#).unwrap();
//! assert_eq!(config.batch_size, 256);
//! assert_eq!(config.capacity, 1_048_576);
//! ```

use serde::{Deserialize, Serialize};

use civsim_logic::demographics::{ReallocationPolicy, DEFAULT_MINUTES_PER_YEAR};
use civsim_logic::needs::NeedsTuning;
use civsim_logic::social::DecayRule;
use civsim_logic::transitions::Thresholds;

use crate::error::{EngineError, Result};

/// Configuration for the citizen engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === STORE ===
    /// Maximum live citizens.
    pub capacity: usize,

    // === SCHEDULING ===
    /// Citizens processed per tick.
    ///
    /// A citizen's state is at most `ceil(population / batch_size)` ticks
    /// stale.
    pub batch_size: usize,

    /// Minimum batch size before the window is split across rayon workers.
    ///
    /// Below this, thread hand-off costs more than it saves.
    pub parallel_threshold: usize,

    // === TIME ===
    /// Simulated minutes per real second passed to `update`.
    pub time_scale: f64,

    /// Simulation minute the clock starts at (0 = Monday 00:00).
    pub start_minute: f64,

    /// Simulated minutes in one year of age.
    pub minutes_per_year: f64,

    /// Minutes between demographics passes (30 days by default).
    pub demographics_interval_minutes: f64,

    // === SOCIAL ===
    /// Concurrent interactions the pool can hold.
    pub interaction_pool_capacity: usize,

    /// Relationship decay rule.
    pub relationship_decay: DecayRule,

    // === BEHAVIOR ===
    pub thresholds: Thresholds,
    pub needs: NeedsTuning,

    // === DEMOGRAPHICS ===
    pub reallocation_policy: ReallocationPolicy,

    // === DETERMINISM ===
    /// Root seed for every per-citizen random stream.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: 1 << 20,
            batch_size: 1024,
            parallel_threshold: 512,
            // one simulated minute per real second
            time_scale: 1.0,
            start_minute: 0.0,
            minutes_per_year: DEFAULT_MINUTES_PER_YEAR,
            demographics_interval_minutes: 30.0 * 1440.0,
            interaction_pool_capacity: 1024,
            relationship_decay: DecayRule::default(),
            thresholds: Thresholds::default(),
            needs: NeedsTuning::default(),
            reallocation_policy: ReallocationPolicy::EmployedFirst,
            seed: 0x5EED_C1F1_2E45,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document, filling missing fields with defaults, then
    /// validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(EngineError::Configuration(msg));

        if self.capacity == 0 || self.capacity > u32::MAX as usize {
            return fail(format!("capacity ({}) must be in 1..=u32::MAX", self.capacity));
        }
        if self.batch_size == 0 {
            return fail("batch_size must be positive".into());
        }
        if self.interaction_pool_capacity == 0 || self.interaction_pool_capacity > u32::MAX as usize {
            return fail(format!(
                "interaction_pool_capacity ({}) must be in 1..=u32::MAX",
                self.interaction_pool_capacity
            ));
        }
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return fail(format!("time_scale ({}) must be finite and >= 0", self.time_scale));
        }
        if !self.start_minute.is_finite() || self.start_minute < 0.0 {
            return fail(format!("start_minute ({}) must be finite and >= 0", self.start_minute));
        }
        if !self.minutes_per_year.is_finite() || self.minutes_per_year <= 0.0 {
            return fail(format!(
                "minutes_per_year ({}) must be positive",
                self.minutes_per_year
            ));
        }
        if !self.demographics_interval_minutes.is_finite() || self.demographics_interval_minutes <= 0.0 {
            return fail(format!(
                "demographics_interval_minutes ({}) must be positive",
                self.demographics_interval_minutes
            ));
        }
        let decay = &self.relationship_decay;
        if !decay.threshold_minutes.is_finite() || decay.threshold_minutes < 0.0 {
            return fail("relationship_decay.threshold_minutes must be >= 0".into());
        }
        if !decay.step.is_finite() || decay.step < 0.0 {
            return fail("relationship_decay.step must be >= 0".into());
        }
        if !self.thresholds.is_valid() {
            return fail(format!(
                "thresholds must lie in 0..=100 with critical ({}) < recovery ({}) and seek ({}) < sated ({})",
                self.thresholds.critical,
                self.thresholds.recovery,
                self.thresholds.social_seek,
                self.thresholds.social_sated
            ));
        }
        if !self.needs.is_valid() {
            return fail("needs decay rates must be finite and >= 0".into());
        }
        Ok(())
    }
}
