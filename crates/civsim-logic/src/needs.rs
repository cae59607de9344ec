//! Ten-dimension needs model.
//!
//! Every need is a level in `[0, 100]` where 100 is fully satisfied. Levels
//! fall over time at per-hour rates and are restored by the active state and
//! activity. A need under the critical threshold overrides the schedule (see
//! [`crate::transitions`]).

use serde::{Deserialize, Serialize};

use crate::personality::Personality;
use crate::state::BehaviorState;
use crate::time::hours;

pub const NEED_COUNT: usize = 10;
pub const NEED_MIN: f32 = 0.0;
pub const NEED_MAX: f32 = 100.0;

/// Default level below which a need is critical.
pub const DEFAULT_CRITICAL_THRESHOLD: f32 = 15.0;
/// Default level a critical need must climb back to before an emergency ends.
pub const DEFAULT_RECOVERY_THRESHOLD: f32 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum NeedKind {
    Hunger = 0,
    Thirst = 1,
    Sleep = 2,
    Entertainment = 3,
    Social = 4,
    Hygiene = 5,
    Education = 6,
    Health = 7,
    Shopping = 8,
    Work = 9,
}

impl NeedKind {
    pub const ALL: [NeedKind; NEED_COUNT] = [
        NeedKind::Hunger,
        NeedKind::Thirst,
        NeedKind::Sleep,
        NeedKind::Entertainment,
        NeedKind::Social,
        NeedKind::Hygiene,
        NeedKind::Education,
        NeedKind::Health,
        NeedKind::Shopping,
        NeedKind::Work,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Level a freshly created citizen starts with.
    pub fn seed_level(self) -> f32 {
        match self {
            NeedKind::Hunger => 60.0,
            NeedKind::Thirst => 70.0,
            NeedKind::Sleep => 80.0,
            NeedKind::Entertainment => 40.0,
            NeedKind::Social => 50.0,
            NeedKind::Hygiene => 75.0,
            NeedKind::Education => 60.0,
            NeedKind::Health => 85.0,
            NeedKind::Shopping => 30.0,
            NeedKind::Work => 55.0,
        }
    }
}

/// Needs checked for critical override, in priority order. The first one
/// under threshold wins.
pub const CRITICAL_CHECK_ORDER: [NeedKind; 4] = [
    NeedKind::Hunger,
    NeedKind::Thirst,
    NeedKind::Sleep,
    NeedKind::Health,
];

/// A signed adjustment per need, indexed by [`NeedKind`].
pub type NeedEffect = [f32; NEED_COUNT];

/// Empty effect.
pub const NO_EFFECT: NeedEffect = [0.0; NEED_COUNT];

/// Build a [`NeedEffect`] from a sparse list.
pub const fn effect(pairs: &[(NeedKind, f32)]) -> NeedEffect {
    let mut out = NO_EFFECT;
    let mut i = 0;
    while i < pairs.len() {
        out[pairs[i].0 as usize] = pairs[i].1;
        i += 1;
    }
    out
}

/// Current level of every need.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeedLevels {
    pub levels: [f32; NEED_COUNT],
}

impl Default for NeedLevels {
    fn default() -> Self {
        Self {
            levels: NeedKind::ALL.map(NeedKind::seed_level),
        }
    }
}

impl NeedLevels {
    pub fn get(&self, kind: NeedKind) -> f32 {
        self.levels[kind.index()]
    }

    /// Set a level, clamped into range.
    pub fn set(&mut self, kind: NeedKind, value: f32) {
        self.levels[kind.index()] = value.clamp(NEED_MIN, NEED_MAX);
    }

    pub fn adjust(&mut self, kind: NeedKind, delta: f32) {
        self.set(kind, self.get(kind) + delta);
    }

    pub fn is_finite(&self) -> bool {
        self.levels.iter().all(|v| v.is_finite())
    }

    pub fn in_range(&self) -> bool {
        self.levels
            .iter()
            .all(|v| (NEED_MIN..=NEED_MAX).contains(v))
    }

    pub fn average(&self) -> f32 {
        self.levels.iter().sum::<f32>() / NEED_COUNT as f32
    }

    /// The least satisfied need. Ties go to the lower index.
    pub fn lowest(&self) -> (NeedKind, f32) {
        let mut best = (NeedKind::Hunger, self.levels[0]);
        for kind in NeedKind::ALL.iter().skip(1) {
            let v = self.get(*kind);
            if v < best.1 {
                best = (*kind, v);
            }
        }
        best
    }
}

/// Per-hour decay rates. Loaded from engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedsTuning {
    /// Awake decay per simulated hour, indexed by [`NeedKind`].
    pub decay_per_hour: [f32; NEED_COUNT],
    /// Decay multiplier for hunger and thirst while asleep.
    pub sleeping_metabolism: f32,
    /// Decay multiplier for every other need while asleep (sleep itself is frozen).
    pub sleeping_other: f32,
}

impl Default for NeedsTuning {
    fn default() -> Self {
        Self {
            decay_per_hour: [
                5.0,  // hunger
                4.5,  // thirst
                4.5,  // sleep
                2.0,  // entertainment
                1.5,  // social (scaled by extroversion)
                2.5,  // hygiene
                0.3,  // education
                0.2,  // health
                1.0,  // shopping
                0.8,  // work
            ],
            sleeping_metabolism: 0.4,
            sleeping_other: 0.5,
        }
    }
}

impl NeedsTuning {
    pub fn is_valid(&self) -> bool {
        self.decay_per_hour.iter().all(|r| r.is_finite() && *r >= 0.0)
            && self.sleeping_metabolism.is_finite()
            && self.sleeping_metabolism >= 0.0
            && self.sleeping_other.is_finite()
            && self.sleeping_other >= 0.0
    }
}

/// Lower every need by its rate over `elapsed_minutes`.
///
/// Sleep does not decay while the citizen is [`BehaviorState::Sleeping`].
/// Zero or non-finite elapsed time leaves the levels unchanged.
pub fn decay_needs(
    needs: &mut NeedLevels,
    state: BehaviorState,
    personality: &Personality,
    elapsed_minutes: f64,
    tuning: &NeedsTuning,
) {
    if !elapsed_minutes.is_finite() || elapsed_minutes <= 0.0 {
        return;
    }
    let h = hours(elapsed_minutes);
    let asleep = state == BehaviorState::Sleeping;

    for kind in NeedKind::ALL {
        let mut rate = tuning.decay_per_hour[kind.index()];
        if kind == NeedKind::Social {
            rate *= personality.social_decay_multiplier();
        }
        if asleep {
            rate *= match kind {
                NeedKind::Sleep => 0.0,
                NeedKind::Hunger | NeedKind::Thirst => tuning.sleeping_metabolism,
                _ => tuning.sleeping_other,
            };
        }
        needs.adjust(kind, -rate * h);
    }
}

/// Add `effect * scale` to every need, clamped into range.
pub fn apply_activity_effect(needs: &mut NeedLevels, effect: &NeedEffect, scale: f32) {
    if !scale.is_finite() || scale == 0.0 {
        return;
    }
    for kind in NeedKind::ALL {
        let delta = effect[kind.index()];
        if delta != 0.0 {
            needs.adjust(kind, delta * scale);
        }
    }
}

/// First need in [`CRITICAL_CHECK_ORDER`] strictly below `threshold`.
pub fn critical_need(needs: &NeedLevels, threshold: f32) -> Option<NeedKind> {
    CRITICAL_CHECK_ORDER
        .iter()
        .copied()
        .find(|kind| needs.get(*kind) < threshold)
}
