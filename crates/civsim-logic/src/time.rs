//! Simulation time helpers: minute-of-day windows and day-of-week math.
//!
//! Simulation time is a single `f64` count of simulated minutes since the
//! start of the run (minute 0 is Monday 00:00). Schedules are expressed in
//! whole minutes from midnight, always in `[0, 1440)`.

/// Minutes in one simulated hour.
pub const MINUTES_PER_HOUR: f64 = 60.0;

/// Minutes in one simulated day.
pub const MINUTES_PER_DAY: u16 = 1440;

/// Days in one simulated week.
pub const DAYS_PER_WEEK: u64 = 7;

/// Minute within a day, `0..1440`.
pub type DayMinute = u16;

/// Build a [`DayMinute`] from hours and minutes (`hm(7, 30)` = 07:30).
pub const fn hm(hour: u16, minute: u16) -> DayMinute {
    (hour * 60 + minute) % MINUTES_PER_DAY
}

/// Wrap any signed minute offset into `[0, 1440)`.
pub fn wrap_minute(minute: i32) -> DayMinute {
    minute.rem_euclid(MINUTES_PER_DAY as i32) as DayMinute
}

/// Minute of day for an absolute simulation time.
pub fn minute_of_day(now: f64) -> DayMinute {
    if !now.is_finite() {
        return 0;
    }
    let m = now.rem_euclid(MINUTES_PER_DAY as f64) as u32;
    m.min(MINUTES_PER_DAY as u32 - 1) as DayMinute
}

/// Whole days elapsed since the start of the run.
pub fn day_index(now: f64) -> u64 {
    if !now.is_finite() || now <= 0.0 {
        return 0;
    }
    (now / MINUTES_PER_DAY as f64).floor() as u64
}

/// Day of week, 0 = Monday .. 6 = Sunday.
pub fn day_of_week(now: f64) -> u8 {
    (day_index(now) % DAYS_PER_WEEK) as u8
}

/// Saturday and Sunday.
pub fn is_weekend(day_of_week: u8) -> bool {
    day_of_week >= 5
}

/// Forward distance from `start` to `end` on the 24h dial.
///
/// Inputs off the dial are wrapped first.
pub fn minutes_between(start: DayMinute, end: DayMinute) -> u16 {
    wrap_minute(end as i32 - start as i32)
}

/// Whether `minute` lies in `[start, end)`, wrapping past midnight.
///
/// An empty window (`start == end`) contains nothing.
pub fn in_window(minute: DayMinute, start: DayMinute, end: DayMinute) -> bool {
    let len = minutes_between(start, end);
    len > 0 && minutes_between(start, minute) < len
}

/// Convert elapsed minutes to hours for per-hour rates.
pub fn hours(minutes: f64) -> f32 {
    (minutes / MINUTES_PER_HOUR) as f32
}
