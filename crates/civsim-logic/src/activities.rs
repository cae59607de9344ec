//! Activity catalog and personality-weighted activity choice.
//!
//! An activity is what a citizen does *inside* a behavior state: breakfast
//! during the morning routine, a gym session in the evening. Each template
//! lists the total need restoration it delivers over its planned duration;
//! the engine applies it pro rata as time passes.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::needs::{effect, NeedEffect, NeedKind, NeedLevels};
use crate::personality::{Personality, Trait};
use crate::schedule::Occupation;
use crate::state::BehaviorState;
use crate::time::{hm, in_window, DayMinute};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActivityId {
    #[default]
    Idle = 0,
    Sleep,
    Shower,
    Breakfast,
    Commute,
    Work,
    Study,
    Lunch,
    Dinner,
    WatchTv,
    Exercise,
    Reading,
    Hobby,
    Shopping,
    DineOut,
    VisitFriends,
    ParkWalk,
    WindDown,
    SeekCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityCategory {
    Rest,
    Personal,
    Travel,
    Work,
    Meal,
    Leisure,
    Social,
    Errand,
    Care,
}

/// Where an activity has to take place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Work,
}

/// Static description of one activity.
#[derive(Debug, Clone, Copy)]
pub struct ActivityTemplate {
    pub id: ActivityId,
    pub category: ActivityCategory,
    /// Planned duration bounds in minutes.
    pub min_duration: u16,
    pub max_duration: u16,
    /// Total need change over one planned duration.
    pub need_effects: NeedEffect,
    /// Energy change per hour while doing it.
    pub energy_per_hour: f32,
    /// Energy required to start.
    pub min_energy: f32,
    /// Time-of-day window it can start in, if restricted.
    pub window: Option<(DayMinute, DayMinute)>,
    /// Place the citizen must be at; `None` is anywhere.
    pub venue: Option<Venue>,
    /// Done with another citizen; makes the citizen available for pairing.
    pub involves_other: bool,
    /// Preference shift per trait deviation, indexed by [`Trait`].
    pub trait_bias: [f32; 5],
}

const NO_BIAS: [f32; 5] = [0.0; 5];

const fn bias(pairs: &[(Trait, f32)]) -> [f32; 5] {
    let mut out = NO_BIAS;
    let mut i = 0;
    while i < pairs.len() {
        out[pairs[i].0 as usize] = pairs[i].1;
        i += 1;
    }
    out
}

macro_rules! venue {
    (Any) => {
        None
    };
    ($v:ident) => {
        Some(Venue::$v)
    };
}

macro_rules! activity {
    ($id:ident, $cat:ident, $min:expr, $max:expr, $energy:expr, $min_energy:expr, $window:expr,
     $venue:ident, $with_other:expr,
     [$($need:ident: $amount:expr),*], [$($tr:ident: $b:expr),*]) => {
        ActivityTemplate {
            id: ActivityId::$id,
            category: ActivityCategory::$cat,
            min_duration: $min,
            max_duration: $max,
            need_effects: effect(&[$((NeedKind::$need, $amount)),*]),
            energy_per_hour: $energy,
            min_energy: $min_energy,
            window: $window,
            venue: venue!($venue),
            involves_other: $with_other,
            trait_bias: bias(&[$((Trait::$tr, $b)),*]),
        }
    };
}

/// Every activity, indexed by [`ActivityId`].
pub static CATALOG: [ActivityTemplate; 19] = [
    activity!(Idle, Rest, 15, 30, 0.0, 0.0, None, Any, false, [], []),
    activity!(Sleep, Rest, 360, 600, 10.0, 0.0, None, Home, false, [Sleep: 96.0], []),
    activity!(Shower, Personal, 10, 20, -1.0, 0.0, None, Home, false, [Hygiene: 40.0], [Conscientiousness: 0.2]),
    activity!(Breakfast, Meal, 15, 30, 2.0, 0.0, Some((hm(4, 0), hm(11, 0))), Home, false,
        [Hunger: 25.0, Thirst: 15.0], []),
    activity!(Commute, Travel, 10, 90, -4.0, 0.0, None, Any, false, [], []),
    activity!(Work, Work, 240, 600, -5.0, 0.0, None, Work, false,
        [Work: 35.0, Thirst: 8.0, Social: 6.0], [Conscientiousness: 0.3]),
    activity!(Study, Work, 240, 480, -5.0, 0.0, None, Work, false,
        [Education: 30.0, Social: 10.0, Thirst: 6.0], [Openness: 0.3]),
    activity!(Lunch, Meal, 30, 60, 3.0, 0.0, None, Any, false, [Hunger: 45.0, Thirst: 25.0, Social: 5.0], []),
    activity!(Dinner, Meal, 30, 75, 3.0, 0.0, Some((hm(16, 30), hm(22, 0))), Home, false,
        [Hunger: 45.0, Thirst: 20.0], []),
    activity!(WatchTv, Leisure, 45, 150, 0.5, 0.0, None, Home, false, [Entertainment: 25.0],
        [Extroversion: -0.3, Openness: -0.2]),
    activity!(Exercise, Leisure, 30, 90, -12.0, 45.0, None, Any, false,
        [Health: 10.0, Entertainment: 10.0, Hygiene: -15.0, Thirst: -10.0],
        [Conscientiousness: 0.4]),
    activity!(Reading, Leisure, 30, 120, 0.5, 0.0, None, Any, false,
        [Education: 12.0, Entertainment: 15.0], [Openness: 0.5, Extroversion: -0.2]),
    activity!(Hobby, Leisure, 45, 150, -1.0, 20.0, None, Any, false, [Entertainment: 30.0], [Openness: 0.4]),
    activity!(Shopping, Errand, 30, 90, -3.0, 25.0, Some((hm(8, 0), hm(21, 0))), Any, false,
        [Shopping: 50.0, Entertainment: 5.0], [Extroversion: 0.2]),
    activity!(DineOut, Social, 60, 120, 1.0, 20.0, Some((hm(11, 0), hm(23, 0))), Any, true,
        [Hunger: 50.0, Thirst: 25.0, Social: 20.0, Entertainment: 10.0],
        [Extroversion: 0.4]),
    activity!(VisitFriends, Social, 60, 180, -2.0, 15.0, None, Any, true,
        [Social: 35.0, Entertainment: 15.0], [Extroversion: 0.5, Agreeableness: 0.2]),
    activity!(ParkWalk, Leisure, 30, 90, -4.0, 25.0, Some((hm(7, 0), hm(20, 0))), Any, false,
        [Health: 6.0, Entertainment: 12.0], [Openness: 0.2, Neuroticism: -0.2]),
    activity!(WindDown, Personal, 15, 45, -0.5, 0.0, None, Home, false, [Hygiene: 20.0, Thirst: 5.0], []),
    activity!(SeekCare, Care, 30, 120, 2.0, 0.0, None, Any, false, [Health: 30.0], []),
];

impl ActivityId {
    pub fn template(self) -> &'static ActivityTemplate {
        &CATALOG[self as usize]
    }
}

/// Activities a citizen may pick while in `state`.
pub fn candidates_for(state: BehaviorState, occupation: Occupation) -> &'static [ActivityId] {
    use ActivityId::*;
    match state {
        BehaviorState::Sleeping => &[Sleep],
        BehaviorState::MorningRoutine => &[Shower, Breakfast],
        BehaviorState::CommutingToWork | BehaviorState::CommutingHome => &[Commute],
        BehaviorState::Working if occupation == Occupation::Student => &[Study],
        BehaviorState::Working => &[Work],
        BehaviorState::LunchBreak => &[Lunch],
        BehaviorState::EveningActivities => {
            &[Dinner, WatchTv, Exercise, Reading, Hobby, Shopping, DineOut]
        }
        BehaviorState::Socializing => &[VisitFriends, DineOut],
        BehaviorState::NightRoutine => &[WindDown],
        BehaviorState::WeekendActivities => {
            &[Shopping, ParkWalk, Hobby, Exercise, DineOut, WatchTv, Reading]
        }
        BehaviorState::Emergency => &[SeekCare],
    }
}

/// How much a citizen wants to do `t` right now. Higher is better.
///
/// Each positive effect counts in proportion to how depleted that need is;
/// personality adds a bias.
pub fn desirability(t: &ActivityTemplate, needs: &NeedLevels, personality: &Personality) -> f32 {
    let mut score = 0.0;
    for (i, gain) in t.need_effects.iter().enumerate() {
        if *gain > 0.0 {
            let deficit = (100.0 - needs.levels[i]) / 100.0;
            score += gain * deficit;
        }
    }
    for tr in Trait::ALL {
        score += t.trait_bias[tr as usize] * personality.deviation(tr) * 10.0;
    }
    score
}

/// An activity and its planned duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityChoice {
    pub id: ActivityId,
    pub duration_minutes: f32,
}

/// Pick the best available activity for `state`.
///
/// Candidates outside their time window, tied to a venue other than `at`
/// (the citizen's current place, `None` when elsewhere), or needing more
/// energy than the citizen has, are skipped; if none remain the first
/// candidate is used.
/// Ties go to catalog order. The duration is drawn uniformly from the
/// template bounds.
pub fn choose_activity(
    state: BehaviorState,
    occupation: Occupation,
    needs: &NeedLevels,
    personality: &Personality,
    energy: f32,
    minute: DayMinute,
    at: Option<Venue>,
    rng: &mut impl Rng,
) -> ActivityChoice {
    let candidates = candidates_for(state, occupation);
    let mut best: Option<(ActivityId, f32)> = None;
    for id in candidates {
        let t = id.template();
        if energy < t.min_energy {
            continue;
        }
        if t.venue.is_some_and(|v| at != Some(v)) {
            continue;
        }
        if let Some((start, end)) = t.window {
            if !in_window(minute, start, end) {
                continue;
            }
        }
        // small noise so identical citizens spread out
        let score = desirability(t, needs, personality) + rng.gen_range(0.0..2.0);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((*id, score));
        }
    }
    let id = best.map(|(id, _)| id).unwrap_or(candidates[0]);
    let t = id.template();
    let duration = if t.max_duration > t.min_duration {
        rng.gen_range(t.min_duration..=t.max_duration)
    } else {
        t.min_duration
    };
    ActivityChoice {
        id,
        duration_minutes: duration as f32,
    }
}

/// Fraction of an activity's planned effect earned between `from` and `to`
/// minutes after it started.
pub fn effect_fraction(from: f64, to: f64, duration_minutes: f32) -> f32 {
    if duration_minutes <= 0.0 || !from.is_finite() || !to.is_finite() || to <= from {
        return 0.0;
    }
    let d = duration_minutes as f64;
    let a = (from / d).clamp(0.0, 1.0);
    let b = (to / d).clamp(0.0, 1.0);
    (b - a) as f32
}
