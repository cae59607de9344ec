//! Slow-moving citizen vitals: health, energy, happiness, stress.
//!
//! Vitals are not needs. They are never critical on their own and never
//! drive a state change directly; they summarize how well a citizen's needs
//! have been met over the last few hours. All values are 0–100.

use serde::{Deserialize, Serialize};

use crate::needs::{NeedKind, NeedLevels};
use crate::personality::Personality;
use crate::time::hours;

/// Fraction of the gap toward target happiness closed per hour.
const HAPPINESS_APPROACH_PER_HOUR: f32 = 0.1;

/// Weight of average need satisfaction in target happiness; the rest comes
/// from the economic baseline.
const HAPPINESS_NEEDS_WEIGHT: f32 = 0.6;

/// Need level under which a need counts as "low" for stress.
const LOW_NEED_LEVEL: f32 = 30.0;

/// Stress gained per hour for each low need (before neuroticism).
const STRESS_PER_LOW_NEED: f32 = 2.0;

/// Stress shed per hour when no need is low.
const STRESS_RELIEF_PER_HOUR: f32 = 1.0;

/// Health lost per hour while starving or dehydrated.
const DEPRIVATION_DAMAGE_PER_HOUR: f32 = 3.0;

/// Health recovered per hour when hunger, thirst and sleep are all fine.
const NATURAL_RECOVERY_PER_HOUR: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: f32,
    pub energy: f32,
    pub happiness: f32,
    pub stress: f32,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            health: 85.0,
            energy: 80.0,
            happiness: 60.0,
            stress: 20.0,
        }
    }
}

impl Vitals {
    pub fn clamp_all(&mut self) {
        self.health = self.health.clamp(0.0, 100.0);
        self.energy = self.energy.clamp(0.0, 100.0);
        self.happiness = self.happiness.clamp(0.0, 100.0);
        self.stress = self.stress.clamp(0.0, 100.0);
    }

    pub fn is_finite(&self) -> bool {
        self.health.is_finite()
            && self.energy.is_finite()
            && self.happiness.is_finite()
            && self.stress.is_finite()
    }

    pub fn in_range(&self) -> bool {
        [self.health, self.energy, self.happiness, self.stress]
            .iter()
            .all(|v| (0.0..=100.0).contains(v))
    }
}

/// Move vitals toward what the current needs imply.
///
/// - `baseline_happiness`: economy-wide happiness signal, 0–100
/// - `critical_threshold`: level under which hunger/thirst start hurting health
pub fn drift_vitals(
    vitals: &mut Vitals,
    needs: &NeedLevels,
    personality: &Personality,
    baseline_happiness: f32,
    critical_threshold: f32,
    elapsed_minutes: f64,
) {
    if !elapsed_minutes.is_finite() || elapsed_minutes <= 0.0 {
        return;
    }
    let h = hours(elapsed_minutes);

    // Stress
    let low = needs
        .levels
        .iter()
        .filter(|v| **v < LOW_NEED_LEVEL)
        .count() as f32;
    if low > 0.0 {
        vitals.stress += low * STRESS_PER_LOW_NEED * personality.stress_multiplier() * h;
    } else {
        vitals.stress -= STRESS_RELIEF_PER_HOUR * h;
    }

    // Health
    let starving = needs.get(NeedKind::Hunger) < critical_threshold
        || needs.get(NeedKind::Thirst) < critical_threshold;
    if starving {
        vitals.health -= DEPRIVATION_DAMAGE_PER_HOUR * h;
    } else if needs.get(NeedKind::Health) < LOW_NEED_LEVEL {
        vitals.health -= DEPRIVATION_DAMAGE_PER_HOUR / 3.0 * h;
    } else if needs.get(NeedKind::Sleep) >= LOW_NEED_LEVEL {
        vitals.health += NATURAL_RECOVERY_PER_HOUR * h;
    }

    // Happiness approaches a target
    let baseline = if baseline_happiness.is_finite() {
        baseline_happiness.clamp(0.0, 100.0)
    } else {
        50.0
    };
    let target = HAPPINESS_NEEDS_WEIGHT * needs.average()
        + (1.0 - HAPPINESS_NEEDS_WEIGHT) * baseline
        - vitals.stress * 0.2;
    let step = (HAPPINESS_APPROACH_PER_HOUR * h).min(1.0);
    vitals.happiness += (target - vitals.happiness) * step;

    vitals.clamp_all();
}
