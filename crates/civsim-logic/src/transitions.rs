//! Transition rules for the behavior state machine.
//!
//! [`decide_transition`] is evaluated once per citizen update, after needs
//! have decayed. Precedence, highest first:
//!
//! 1. A critical hunger, thirst or health need forces `Emergency`, whatever
//!    the current state. This is the one override of the interruptible flag.
//! 2. An active emergency stays put until its triggering need has recovered
//!    (or it hits its maximum duration).
//! 3. A critical sleep need forces `Sleeping` unless the current state is
//!    uninterruptible and still inside its minimum duration.
//! 4. Otherwise the schedule target is followed if the table allows it, else
//!    the current state's natural successor, else nothing happens.
//!
//! Leaving a commute additionally requires the trip to be over.

use serde::{Deserialize, Serialize};

use crate::needs::{
    critical_need, NeedKind, NeedLevels, DEFAULT_CRITICAL_THRESHOLD, DEFAULT_RECOVERY_THRESHOLD,
};
use crate::personality::{Personality, Trait};
use crate::schedule::{scheduled_state, DailySchedule, ScheduleContext};
use crate::state::{is_legal, BehaviorState};
use crate::time::DayMinute;

/// Thresholds that gate need-driven behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Level under which hunger/thirst/sleep/health are critical.
    pub critical: f32,
    /// Level the emergency need must recover to.
    pub recovery: f32,
    /// Social level under which an average citizen seeks company.
    pub social_seek: f32,
    /// Social level at which a socializing citizen is content.
    pub social_sated: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            critical: DEFAULT_CRITICAL_THRESHOLD,
            recovery: DEFAULT_RECOVERY_THRESHOLD,
            social_seek: 40.0,
            social_sated: 85.0,
        }
    }
}

impl Thresholds {
    pub fn is_valid(&self) -> bool {
        let ok = |v: f32| v.is_finite() && (0.0..=100.0).contains(&v);
        ok(self.critical)
            && ok(self.recovery)
            && ok(self.social_seek)
            && ok(self.social_sated)
            && self.critical < self.recovery
            && self.social_seek < self.social_sated
    }

    /// Social level under which this personality looks for company.
    /// Extroverts start looking sooner.
    pub fn seek_level(&self, personality: &Personality) -> f32 {
        self.social_seek + personality.deviation(Trait::Extroversion) * 20.0
    }
}

/// Whether leisure time should be spent socializing.
///
/// Hysteresis: once socializing, a citizen keeps wanting company until the
/// social need is sated.
pub fn wants_company(
    current: BehaviorState,
    needs: &NeedLevels,
    personality: &Personality,
    thresholds: &Thresholds,
) -> bool {
    let social = needs.get(NeedKind::Social);
    if current == BehaviorState::Socializing {
        social < thresholds.social_sated
    } else {
        social < thresholds.seek_level(personality)
    }
}

/// Everything the rules look at for one citizen.
#[derive(Debug, Clone, Copy)]
pub struct TransitionInput<'a> {
    pub current: BehaviorState,
    pub minutes_in_state: f64,
    pub minute: DayMinute,
    pub free_day: bool,
    pub schedule: &'a DailySchedule,
    pub commute_minutes: u16,
    pub needs: &'a NeedLevels,
    pub personality: &'a Personality,
    /// Need that triggered the current emergency.
    pub emergency_reason: Option<NeedKind>,
    /// The commute in progress, if any, has reached its destination.
    pub arrived: bool,
    pub thresholds: &'a Thresholds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionReason {
    Critical(NeedKind),
    EmergencyResolved,
    Schedule,
    Successor,
    Arrived,
    MaxDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub to: BehaviorState,
    pub reason: TransitionReason,
}

impl Transition {
    fn new(to: BehaviorState, reason: TransitionReason) -> Self {
        Self { to, reason }
    }
}

/// The state the schedule wants right now for this input.
pub fn schedule_target(input: &TransitionInput<'_>) -> BehaviorState {
    scheduled_state(&ScheduleContext {
        minute: input.minute,
        free_day: input.free_day,
        schedule: input.schedule,
        commute_minutes: input.commute_minutes,
        wants_company: wants_company(
            input.current,
            input.needs,
            input.personality,
            input.thresholds,
        ),
    })
}

/// Decide whether the citizen changes state. `None` means stay.
pub fn decide_transition(input: &TransitionInput<'_>) -> Option<Transition> {
    let current = input.current;
    let spec = current.spec();
    let critical = critical_need(input.needs, input.thresholds.critical);

    // 1. Emergency override. Re-entrant: a different, higher-priority
    //    critical need restarts the emergency under the new reason.
    if let Some(kind) = critical.filter(|k| *k != NeedKind::Sleep) {
        if current != BehaviorState::Emergency || input.emergency_reason != Some(kind) {
            return Some(Transition::new(
                BehaviorState::Emergency,
                TransitionReason::Critical(kind),
            ));
        }
        return None;
    }

    // 2. Active emergency.
    if current == BehaviorState::Emergency {
        let reason = input.emergency_reason.unwrap_or(NeedKind::Health);
        let recovered = input.needs.get(reason) >= input.thresholds.recovery
            && input.minutes_in_state >= spec.min_duration as f64;
        let expired = input.minutes_in_state >= spec.max_duration as f64;
        if !(recovered || expired) {
            return None;
        }
        let to = if critical == Some(NeedKind::Sleep) {
            BehaviorState::Sleeping
        } else {
            schedule_target(input)
        };
        let reason = if recovered {
            TransitionReason::EmergencyResolved
        } else {
            TransitionReason::MaxDuration
        };
        return Some(Transition::new(to, reason));
    }

    // 3. Exhaustion.
    if critical == Some(NeedKind::Sleep) && current != BehaviorState::Sleeping {
        let preemptible =
            spec.interruptible || input.minutes_in_state >= spec.min_duration as f64;
        if preemptible {
            return Some(Transition::new(
                BehaviorState::Sleeping,
                TransitionReason::Critical(NeedKind::Sleep),
            ));
        }
    }

    // 4. Schedule.
    let expired = input.minutes_in_state >= spec.max_duration as f64;
    if current.is_commute() {
        if input.arrived && input.minutes_in_state >= spec.min_duration as f64 {
            let target = schedule_target(input);
            if target != current && is_legal(current, target) {
                return Some(Transition::new(target, TransitionReason::Arrived));
            }
            return current
                .successor(input.free_day)
                .filter(|next| is_legal(current, *next))
                .map(|next| Transition::new(next, TransitionReason::Arrived));
        }
        if !expired {
            return None;
        }
    } else if input.minutes_in_state < spec.min_duration as f64 {
        return None;
    }

    let target = schedule_target(input);
    if target == current {
        return None;
    }
    let reason = |r| if expired { TransitionReason::MaxDuration } else { r };
    if is_legal(current, target) {
        return Some(Transition::new(target, reason(TransitionReason::Schedule)));
    }
    current
        .successor(input.free_day)
        .filter(|next| *next != current && is_legal(current, *next))
        .map(|next| Transition::new(next, reason(TransitionReason::Successor)))
}
