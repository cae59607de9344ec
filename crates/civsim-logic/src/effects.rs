//! Per-state and per-activity effects applied during an update.
//!
//! States carry situational effects (commuting is stressful, an emergency
//! restores the need that caused it). Activities carry the need restoration,
//! applied pro rata over their planned duration.

use serde::{Deserialize, Serialize};

use crate::activities::{effect_fraction, ActivityId};
use crate::needs::{apply_activity_effect, NeedKind, NeedLevels};
use crate::personality::Personality;
use crate::state::BehaviorState;
use crate::time::hours;
use crate::vitals::Vitals;

/// Points per hour an emergency restores to its triggering need.
pub const EMERGENCY_RECOVERY_PER_HOUR: f32 = 60.0;

/// Stress change per hour, before neuroticism scaling of gains.
fn stress_per_hour(state: BehaviorState) -> f32 {
    match state {
        BehaviorState::Sleeping => -3.0,
        BehaviorState::MorningRoutine => 0.5,
        BehaviorState::CommutingToWork | BehaviorState::CommutingHome => 3.0,
        BehaviorState::Working => 1.5,
        BehaviorState::LunchBreak => -2.0,
        BehaviorState::EveningActivities => -2.0,
        BehaviorState::Socializing => -3.0,
        BehaviorState::NightRoutine => -2.5,
        BehaviorState::WeekendActivities => -3.0,
        BehaviorState::Emergency => 4.0,
    }
}

/// Apply the current state's situational effects for `elapsed_minutes`.
pub fn apply_state_effects(
    state: BehaviorState,
    emergency_reason: Option<NeedKind>,
    needs: &mut NeedLevels,
    vitals: &mut Vitals,
    personality: &Personality,
    elapsed_minutes: f64,
) {
    if !elapsed_minutes.is_finite() || elapsed_minutes <= 0.0 {
        return;
    }
    let h = hours(elapsed_minutes);

    let stress = stress_per_hour(state);
    vitals.stress += if stress > 0.0 {
        stress * personality.stress_multiplier() * h
    } else {
        stress * h
    };

    if state == BehaviorState::Emergency {
        let reason = emergency_reason.unwrap_or(NeedKind::Health);
        needs.adjust(reason, EMERGENCY_RECOVERY_PER_HOUR * h);
    }
    vitals.clamp_all();
}

/// Timing of the activity in progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityProgress {
    pub activity: ActivityId,
    pub started_at: f64,
    pub duration_minutes: f32,
}

impl ActivityProgress {
    pub fn finished(&self, now: f64) -> bool {
        now - self.started_at >= self.duration_minutes as f64
    }
}

/// Apply the share of the activity's effect earned between `last_update`
/// and `now`, plus its energy change over the same stretch.
///
/// Returns whether the activity has run its planned duration.
pub fn apply_activity_progress(
    progress: &ActivityProgress,
    last_update: f64,
    now: f64,
    needs: &mut NeedLevels,
    vitals: &mut Vitals,
) -> bool {
    let t = progress.activity.template();
    let from = last_update - progress.started_at;
    let to = now - progress.started_at;
    let fraction = effect_fraction(from, to, progress.duration_minutes);
    apply_activity_effect(needs, &t.need_effects, fraction);

    let elapsed = now - last_update;
    if elapsed.is_finite() && elapsed > 0.0 {
        vitals.energy += t.energy_per_hour * hours(elapsed);
        vitals.clamp_all();
    }
    progress.finished(now)
}

/// Where a state sends the citizen on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    Work,
    Home,
}

/// Destination to route to when entering `state`, if any.
pub fn entry_destination(state: BehaviorState) -> Option<Destination> {
    match state {
        BehaviorState::CommutingToWork => Some(Destination::Work),
        BehaviorState::CommutingHome => Some(Destination::Home),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emergency_restores_reason() {
        let mut needs = NeedLevels::default();
        needs.set(NeedKind::Thirst, 10.0);
        let mut vitals = Vitals::default();
        apply_state_effects(
            BehaviorState::Emergency,
            Some(NeedKind::Thirst),
            &mut needs,
            &mut vitals,
            &Personality::default(),
            30.0,
        );
        assert!((needs.get(NeedKind::Thirst) - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_commuting_is_stressful() {
        let mut needs = NeedLevels::default();
        let mut vitals = Vitals::default();
        let before = vitals.stress;
        apply_state_effects(
            BehaviorState::CommutingToWork,
            None,
            &mut needs,
            &mut vitals,
            &Personality::default(),
            60.0,
        );
        assert!(vitals.stress > before);
    }

    #[test]
    fn test_activity_effect_is_spread_over_duration() {
        let mut needs = NeedLevels::default();
        needs.set(NeedKind::Hunger, 20.0);
        let mut vitals = Vitals::default();
        let lunch = ActivityProgress {
            activity: ActivityId::Lunch,
            started_at: 720.0,
            duration_minutes: 60.0,
        };
        // half the lunch: half of +45
        let done = apply_activity_progress(&lunch, 720.0, 750.0, &mut needs, &mut vitals);
        assert!(!done);
        assert!((needs.get(NeedKind::Hunger) - 42.5).abs() < 1e-3);
        // the rest, plus time past the end that earns nothing
        let done = apply_activity_progress(&lunch, 750.0, 900.0, &mut needs, &mut vitals);
        assert!(done);
        assert!((needs.get(NeedKind::Hunger) - 65.0).abs() < 1e-3);
    }

    #[test]
    fn test_commute_states_route() {
        assert_eq!(entry_destination(BehaviorState::CommutingToWork), Some(Destination::Work));
        assert_eq!(entry_destination(BehaviorState::CommutingHome), Some(Destination::Home));
        assert_eq!(entry_destination(BehaviorState::Working), None);
    }
}
