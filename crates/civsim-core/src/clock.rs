//! Simulation clock owned by the engine.

use serde::{Deserialize, Serialize};

use civsim_logic::time::{day_index, day_of_week, is_weekend, minute_of_day, DayMinute};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    /// Simulated minutes since the start of the run.
    now: f64,
    /// Simulated minutes per real second.
    time_scale: f64,
    tick: u64,
}

impl SimClock {
    pub fn new(start_minute: f64, time_scale: f64) -> Self {
        Self {
            now: start_minute,
            time_scale,
            tick: 0,
        }
    }

    /// Advance by `delta_seconds` of real time; returns simulated minutes
    /// elapsed. Negative or non-finite deltas do not move the clock.
    pub fn advance(&mut self, delta_seconds: f64) -> f64 {
        let delta = delta_seconds * self.time_scale;
        self.tick += 1;
        if delta.is_finite() && delta > 0.0 {
            self.now += delta;
            delta
        } else {
            0.0
        }
    }

    /// Jump to an absolute simulation time. Never moves backwards.
    pub fn advance_to(&mut self, now: f64) -> f64 {
        self.tick += 1;
        if now.is_finite() && now > self.now {
            let delta = now - self.now;
            self.now = now;
            delta
        } else {
            0.0
        }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        if scale.is_finite() {
            self.time_scale = scale.max(0.0);
        }
    }

    pub fn minute_of_day(&self) -> DayMinute {
        minute_of_day(self.now)
    }

    pub fn day(&self) -> u64 {
        day_index(self.now)
    }

    pub fn day_of_week(&self) -> u8 {
        day_of_week(self.now)
    }

    pub fn is_weekend(&self) -> bool {
        is_weekend(self.day_of_week())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_scale() {
        let mut clock = SimClock::new(0.0, 60.0);
        // one real second at 60x is one simulated hour
        assert_eq!(clock.advance(1.0), 60.0);
        assert_eq!(clock.minute_of_day(), 60);
        assert_eq!(clock.tick(), 1);
    }

    #[test]
    fn test_clock_never_runs_backwards() {
        let mut clock = SimClock::new(100.0, 1.0);
        assert_eq!(clock.advance(-5.0), 0.0);
        assert_eq!(clock.advance_to(50.0), 0.0);
        assert_eq!(clock.now(), 100.0);
        assert_eq!(clock.advance_to(f64::NAN), 0.0);
        assert_eq!(clock.tick(), 3);
    }

    #[test]
    fn test_weekend_detection() {
        let mut clock = SimClock::new(0.0, 1.0);
        assert!(!clock.is_weekend());
        clock.advance_to(5.0 * 1440.0 + 600.0);
        assert_eq!(clock.day(), 5);
        assert!(clock.is_weekend());
    }
}
