//! Daily schedule templates and the clock-driven target state.
//!
//! A citizen's [`DailySchedule`] is seeded from a template chosen by age band
//! and occupation, jittered by personality. [`scheduled_state`] maps a minute
//! of the day onto the state the schedule wants the citizen in; the
//! transition rules in [`crate::transitions`] decide whether that target is
//! actually reachable.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::state::BehaviorState;
use crate::time::{hm, in_window, minutes_between, wrap_minute, DayMinute};

/// Minutes of wind-down before bedtime.
pub const NIGHT_ROUTINE_MINUTES: u16 = 45;
/// Length of the free-day morning routine.
pub const FREE_DAY_MORNING_MINUTES: u16 = 60;
/// Lunch break length, centred on the middle of the work day.
pub const LUNCH_MINUTES: u16 = 60;
/// Work days shorter than this get no lunch break.
pub const MIN_WORKDAY_FOR_LUNCH: u16 = 300;

/// Commute used when there is no work location to measure against.
pub const DEFAULT_COMMUTE_MINUTES: u16 = 30;
pub const MIN_COMMUTE_MINUTES: u16 = 10;
pub const MAX_COMMUTE_MINUTES: u16 = 90;
/// Travel minutes per map unit of straight-line distance.
pub const COMMUTE_MINUTES_PER_UNIT: f32 = 0.5;

/// Largest personal shift applied to a template time, at full flexibility.
const MAX_JITTER_MINUTES: f32 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeBand {
    Child,
    Adult,
    Senior,
}

pub const ADULT_AGE: u8 = 18;
pub const SENIOR_AGE: u8 = 65;

impl AgeBand {
    pub fn from_age(age: u8) -> Self {
        if age < ADULT_AGE {
            AgeBand::Child
        } else if age < SENIOR_AGE {
            AgeBand::Adult
        } else {
            AgeBand::Senior
        }
    }
}

pub const OCCUPATION_COUNT: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Occupation {
    Student = 0,
    Unemployed = 1,
    Office = 2,
    Industrial = 3,
    Retail = 4,
    Service = 5,
    Healthcare = 6,
    Education = 7,
    Retired = 8,
}

impl Occupation {
    pub const ALL: [Occupation; OCCUPATION_COUNT] = [
        Occupation::Student,
        Occupation::Unemployed,
        Occupation::Office,
        Occupation::Industrial,
        Occupation::Retail,
        Occupation::Service,
        Occupation::Healthcare,
        Occupation::Education,
        Occupation::Retired,
    ];

    /// Occupations that count as holding a job.
    pub const JOBS: [Occupation; 6] = [
        Occupation::Office,
        Occupation::Industrial,
        Occupation::Retail,
        Occupation::Service,
        Occupation::Healthcare,
        Occupation::Education,
    ];

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_employed(self) -> bool {
        Self::JOBS.contains(&self)
    }

    /// Whether the occupation has a daily commute (jobs and school).
    pub fn has_fixed_hours(self) -> bool {
        self.is_employed() || self == Occupation::Student
    }
}

/// Template times for one age band / occupation pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTemplate {
    pub wake: DayMinute,
    pub work_start: DayMinute,
    pub work_end: DayMinute,
    pub bedtime: DayMinute,
}

impl ScheduleTemplate {
    const fn new(wake: DayMinute, work_start: DayMinute, work_end: DayMinute, bedtime: DayMinute) -> Self {
        Self {
            wake,
            work_start,
            work_end,
            bedtime,
        }
    }

    const fn free(wake: DayMinute, bedtime: DayMinute) -> Self {
        Self::new(wake, 0, 0, bedtime)
    }
}

/// Pick the template for an age band and occupation.
pub fn template_for(band: AgeBand, occupation: Occupation) -> ScheduleTemplate {
    use Occupation::*;
    match (band, occupation) {
        (AgeBand::Child, Student) => ScheduleTemplate::new(hm(7, 0), hm(8, 0), hm(15, 0), hm(21, 0)),
        (AgeBand::Child, _) => ScheduleTemplate::free(hm(7, 30), hm(20, 30)),
        (_, Student) => ScheduleTemplate::new(hm(7, 30), hm(9, 0), hm(16, 0), hm(23, 30)),
        (_, Office) => ScheduleTemplate::new(hm(6, 45), hm(9, 0), hm(17, 0), hm(23, 0)),
        (_, Industrial) => ScheduleTemplate::new(hm(5, 30), hm(7, 0), hm(15, 30), hm(22, 0)),
        (_, Retail) => ScheduleTemplate::new(hm(7, 30), hm(10, 0), hm(18, 30), hm(23, 30)),
        (_, Service) => ScheduleTemplate::new(hm(8, 0), hm(11, 0), hm(20, 0), hm(23, 45)),
        (_, Healthcare) => ScheduleTemplate::new(hm(5, 30), hm(7, 0), hm(19, 0), hm(22, 30)),
        (_, Education) => ScheduleTemplate::new(hm(6, 30), hm(8, 0), hm(16, 0), hm(22, 30)),
        (AgeBand::Senior, Unemployed | Retired) => ScheduleTemplate::free(hm(6, 30), hm(21, 30)),
        (AgeBand::Adult, Unemployed | Retired) => ScheduleTemplate::free(hm(8, 0), hm(23, 0)),
    }
}

/// A citizen's personal daily plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailySchedule {
    pub wake: DayMinute,
    pub work_start: DayMinute,
    pub work_end: DayMinute,
    pub bedtime: DayMinute,
    /// Sleep-in on free days.
    pub free_day_wake: DayMinute,
    /// Stay-up on free days.
    pub free_day_bedtime: DayMinute,
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self::from_template(&template_for(AgeBand::Adult, Occupation::Office))
    }
}

impl DailySchedule {
    /// Adopt a template as-is.
    pub fn from_template(t: &ScheduleTemplate) -> Self {
        Self {
            wake: t.wake,
            work_start: t.work_start,
            work_end: t.work_end,
            bedtime: t.bedtime,
            free_day_wake: wrap_minute(t.wake as i32 + 90),
            free_day_bedtime: wrap_minute(t.bedtime as i32 + 60),
        }
    }

    /// Adopt a template with personal jitter. `flexibility` 0.0 follows the
    /// template exactly; 1.0 shifts wake/bed times by up to 45 minutes and
    /// work hours by a third of that.
    pub fn seeded(t: &ScheduleTemplate, flexibility: f32, rng: &mut impl Rng) -> Self {
        let mut s = Self::from_template(t);
        let span = (MAX_JITTER_MINUTES * flexibility.clamp(0.0, 1.0)).round() as i32;
        if span == 0 {
            return s;
        }
        let wake_shift = rng.gen_range(-span..=span);
        let bed_shift = rng.gen_range(-span..=span);
        s.wake = wrap_minute(s.wake as i32 + wake_shift);
        s.bedtime = wrap_minute(s.bedtime as i32 + bed_shift);
        s.free_day_wake = wrap_minute(s.free_day_wake as i32 + wake_shift);
        s.free_day_bedtime = wrap_minute(s.free_day_bedtime as i32 + bed_shift);
        if s.has_work() {
            let work_span = (span / 3).max(1);
            let work_shift = rng.gen_range(-work_span..=work_span);
            s.work_start = wrap_minute(s.work_start as i32 + work_shift);
            s.work_end = wrap_minute(s.work_end as i32 + work_shift);
        }
        s
    }

    pub fn has_work(&self) -> bool {
        self.work_start != self.work_end
    }

    pub fn work_length(&self) -> u16 {
        minutes_between(self.work_start, self.work_end)
    }

    /// Lunch window `[start, end)` centred on the work-day midpoint.
    pub fn lunch_window(&self) -> Option<(DayMinute, DayMinute)> {
        let len = self.work_length();
        if !self.has_work() || len < MIN_WORKDAY_FOR_LUNCH {
            return None;
        }
        let mid = self.work_start as i32 + len as i32 / 2;
        let half = LUNCH_MINUTES as i32 / 2;
        Some((wrap_minute(mid - half), wrap_minute(mid + half)))
    }

    /// Every stored minute lies on the dial.
    pub fn is_valid(&self) -> bool {
        [
            self.wake,
            self.work_start,
            self.work_end,
            self.bedtime,
            self.free_day_wake,
            self.free_day_bedtime,
        ]
        .iter()
        .all(|m| *m < 1440)
    }
}

/// Commute time for a straight-line distance, clamped to 10–90 minutes.
pub fn commute_minutes(distance: Option<f32>) -> u16 {
    match distance {
        Some(d) if d.is_finite() && d >= 0.0 => {
            let raw = MIN_COMMUTE_MINUTES as f32 + d * COMMUTE_MINUTES_PER_UNIT;
            raw.round()
                .clamp(MIN_COMMUTE_MINUTES as f32, MAX_COMMUTE_MINUTES as f32) as u16
        }
        _ => DEFAULT_COMMUTE_MINUTES,
    }
}

/// Inputs to [`scheduled_state`].
#[derive(Debug, Clone, Copy)]
pub struct ScheduleContext<'a> {
    pub minute: DayMinute,
    /// Weekend, or no fixed hours today.
    pub free_day: bool,
    pub schedule: &'a DailySchedule,
    pub commute_minutes: u16,
    /// Leisure time should be spent with others.
    pub wants_company: bool,
}

/// The state the schedule wants at `ctx.minute`.
pub fn scheduled_state(ctx: &ScheduleContext<'_>) -> BehaviorState {
    let s = ctx.schedule;
    let m = ctx.minute;
    let leisure = |free_day: bool| {
        if ctx.wants_company {
            BehaviorState::Socializing
        } else if free_day {
            BehaviorState::WeekendActivities
        } else {
            BehaviorState::EveningActivities
        }
    };

    if ctx.free_day || !s.has_work() {
        let wake = s.free_day_wake;
        let bed = s.free_day_bedtime;
        let morning_end = wrap_minute(wake as i32 + FREE_DAY_MORNING_MINUTES as i32);
        let night_start = wrap_minute(bed as i32 - NIGHT_ROUTINE_MINUTES as i32);
        return if in_window(m, bed, wake) {
            BehaviorState::Sleeping
        } else if in_window(m, wake, morning_end) {
            BehaviorState::MorningRoutine
        } else if in_window(m, night_start, bed) {
            BehaviorState::NightRoutine
        } else {
            leisure(true)
        };
    }

    let commute = ctx.commute_minutes as i32;
    let leave = wrap_minute(s.work_start as i32 - commute);
    let home = wrap_minute(s.work_end as i32 + commute);
    let night_start = wrap_minute(s.bedtime as i32 - NIGHT_ROUTINE_MINUTES as i32);

    if in_window(m, s.bedtime, s.wake) {
        return BehaviorState::Sleeping;
    }
    if in_window(m, s.work_start, s.work_end) {
        if let Some((lunch_start, lunch_end)) = s.lunch_window() {
            if in_window(m, lunch_start, lunch_end) {
                return BehaviorState::LunchBreak;
            }
        }
        return BehaviorState::Working;
    }
    if in_window(m, leave, s.work_start) {
        return BehaviorState::CommutingToWork;
    }
    if in_window(m, s.work_end, home) {
        return BehaviorState::CommutingHome;
    }
    if in_window(m, s.wake, leave) {
        return BehaviorState::MorningRoutine;
    }
    if in_window(m, night_start, s.bedtime) {
        return BehaviorState::NightRoutine;
    }
    leisure(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn office() -> DailySchedule {
        DailySchedule::from_template(&template_for(AgeBand::Adult, Occupation::Office))
    }

    fn at(schedule: &DailySchedule, minute: DayMinute, free_day: bool) -> BehaviorState {
        scheduled_state(&ScheduleContext {
            minute,
            free_day,
            schedule,
            commute_minutes: 30,
            wants_company: false,
        })
    }

    #[test]
    fn test_office_workday() {
        let s = office();
        assert_eq!(at(&s, hm(3, 0), false), BehaviorState::Sleeping);
        assert_eq!(at(&s, hm(7, 0), false), BehaviorState::MorningRoutine);
        assert_eq!(at(&s, hm(8, 40), false), BehaviorState::CommutingToWork);
        assert_eq!(at(&s, hm(10, 0), false), BehaviorState::Working);
        assert_eq!(at(&s, hm(13, 0), false), BehaviorState::LunchBreak);
        assert_eq!(at(&s, hm(15, 0), false), BehaviorState::Working);
        assert_eq!(at(&s, hm(17, 10), false), BehaviorState::CommutingHome);
        assert_eq!(at(&s, hm(19, 0), false), BehaviorState::EveningActivities);
        assert_eq!(at(&s, hm(22, 30), false), BehaviorState::NightRoutine);
        assert_eq!(at(&s, hm(23, 30), false), BehaviorState::Sleeping);
    }

    #[test]
    fn test_free_day_flow() {
        let s = office();
        // free-day wake is 08:15
        assert_eq!(at(&s, hm(8, 0), true), BehaviorState::Sleeping);
        assert_eq!(at(&s, hm(8, 30), true), BehaviorState::MorningRoutine);
        assert_eq!(at(&s, hm(12, 0), true), BehaviorState::WeekendActivities);
        assert_eq!(at(&s, hm(23, 30), true), BehaviorState::NightRoutine);
    }

    #[test]
    fn test_wants_company_turns_leisure_social() {
        let s = office();
        let state = scheduled_state(&ScheduleContext {
            minute: hm(19, 0),
            free_day: false,
            schedule: &s,
            commute_minutes: 30,
            wants_company: true,
        });
        assert_eq!(state, BehaviorState::Socializing);
    }

    #[test]
    fn test_retired_never_commutes() {
        let s = DailySchedule::from_template(&template_for(AgeBand::Senior, Occupation::Retired));
        assert!(!s.has_work());
        for minute in (0..1440).step_by(15) {
            let state = at(&s, minute, false);
            assert!(!state.is_commute());
            assert_ne!(state, BehaviorState::Working);
        }
    }

    #[test]
    fn test_bedtime_past_midnight_wraps() {
        let s = DailySchedule {
            wake: hm(9, 0),
            work_start: hm(12, 0),
            work_end: hm(20, 0),
            bedtime: hm(1, 0),
            free_day_wake: hm(10, 0),
            free_day_bedtime: hm(2, 0),
        };
        assert_eq!(at(&s, hm(0, 30), false), BehaviorState::NightRoutine);
        assert_eq!(at(&s, hm(23, 0), false), BehaviorState::EveningActivities);
        assert_eq!(at(&s, hm(4, 0), false), BehaviorState::Sleeping);
    }

    #[test]
    fn test_short_shift_has_no_lunch() {
        let s = DailySchedule {
            work_start: hm(9, 0),
            work_end: hm(13, 0),
            ..office()
        };
        assert_eq!(s.lunch_window(), None);
        assert_eq!(at(&s, hm(11, 0), false), BehaviorState::Working);
    }

    #[test]
    fn test_commute_is_clamped() {
        assert_eq!(commute_minutes(None), DEFAULT_COMMUTE_MINUTES);
        assert_eq!(commute_minutes(Some(0.0)), MIN_COMMUTE_MINUTES);
        assert_eq!(commute_minutes(Some(40.0)), 30);
        assert_eq!(commute_minutes(Some(10_000.0)), MAX_COMMUTE_MINUTES);
        assert_eq!(commute_minutes(Some(f32::NAN)), DEFAULT_COMMUTE_MINUTES);
    }

    #[test]
    fn test_jitter_is_bounded_and_deterministic() {
        let t = template_for(AgeBand::Adult, Occupation::Office);
        let a = DailySchedule::seeded(&t, 1.0, &mut ChaCha8Rng::seed_from_u64(3));
        let b = DailySchedule::seeded(&t, 1.0, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(a, b);
        assert!(a.is_valid());
        let drift = (a.wake as i32 - t.wake as i32).abs();
        assert!(drift <= 45);
        let rigid = DailySchedule::seeded(&t, 0.0, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(rigid, DailySchedule::from_template(&t));
    }

    #[test]
    fn test_band_occupation_templates() {
        assert!(template_for(AgeBand::Child, Occupation::Student).work_start != 0);
        let idle = template_for(AgeBand::Child, Occupation::Unemployed);
        assert_eq!(idle.work_start, idle.work_end);
        assert_eq!(AgeBand::from_age(17), AgeBand::Child);
        assert_eq!(AgeBand::from_age(18), AgeBand::Adult);
        assert_eq!(AgeBand::from_age(65), AgeBand::Senior);
    }
}
