//! Aging, age-band changes and labor-pool balancing.
//!
//! Age is derived from a birth time, so a citizen ages correctly however
//! sparsely it is updated. Crossing into a new age band re-seeds the daily
//! schedule and may change occupation. The periodic labor pass keeps the
//! employed/unemployed split consistent with the employable population and
//! with the jobs the economy reports.

use serde::{Deserialize, Serialize};

use crate::schedule::{AgeBand, Occupation};

/// A calendar year of simulated minutes.
pub const DEFAULT_MINUTES_PER_YEAR: f64 = 525_600.0;

/// Oldest age tracked. Older citizens stay at this age.
pub const MAX_AGE: u8 = 120;

/// Whole years between `birth_time` and `now`.
pub fn age_years(birth_time: f64, now: f64, minutes_per_year: f64) -> u8 {
    if minutes_per_year <= 0.0 || !(now - birth_time).is_finite() {
        return 0;
    }
    let years = ((now - birth_time) / minutes_per_year).floor();
    years.clamp(0.0, MAX_AGE as f64) as u8
}

/// Birth time that makes a citizen exactly `age` at `now`.
pub fn birth_time_for_age(age: u8, now: f64, minutes_per_year: f64) -> f64 {
    now - age.min(MAX_AGE) as f64 * minutes_per_year
}

/// Occupation after moving from one age band to the next.
pub fn occupation_after_band_change(from: AgeBand, to: AgeBand, occupation: Occupation) -> Occupation {
    match (from, to, occupation) {
        (AgeBand::Child, AgeBand::Adult, Occupation::Student) => Occupation::Unemployed,
        (AgeBand::Adult, AgeBand::Senior, o) if o.is_employed() || o == Occupation::Unemployed => {
            Occupation::Retired
        }
        (_, _, o) => o,
    }
}

/// How to trim the labor pool when it exceeds the employable population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReallocationPolicy {
    /// Take the excess out of the employed group first.
    #[default]
    EmployedFirst,
    /// Scale both groups down by the same factor.
    Proportional,
}

/// Employment counts for the working-age population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborPool {
    pub employed: u32,
    pub unemployed: u32,
}

impl LaborPool {
    pub fn total(&self) -> u32 {
        self.employed + self.unemployed
    }

    /// Unemployed share of the labor pool, 0.0–1.0.
    pub fn unemployment_rate(&self) -> f32 {
        if self.total() == 0 {
            0.0
        } else {
            self.unemployed as f32 / self.total() as f32
        }
    }
}

/// Clamp a labor pool so `employed + unemployed <= employable`.
pub fn clamp_labor_pool(pool: LaborPool, employable: u32, policy: ReallocationPolicy) -> LaborPool {
    if pool.total() <= employable {
        return pool;
    }
    match policy {
        ReallocationPolicy::EmployedFirst => {
            let excess = pool.total() - employable;
            let from_employed = excess.min(pool.employed);
            LaborPool {
                employed: pool.employed - from_employed,
                unemployed: pool.unemployed - (excess - from_employed),
            }
        }
        ReallocationPolicy::Proportional => {
            let scale = employable as f64 / pool.total() as f64;
            let employed = ((pool.employed as f64 * scale).floor() as u32).min(employable);
            let unemployed =
                ((pool.unemployed as f64 * scale).round() as u32).min(employable - employed);
            LaborPool {
                employed,
                unemployed,
            }
        }
    }
}

/// Individual moves needed to bring the pool in line with available jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentPlan {
    pub layoffs: u32,
    pub hires: u32,
}

pub fn plan_employment(pool: LaborPool, jobs_available: u32) -> EmploymentPlan {
    if pool.employed > jobs_available {
        EmploymentPlan {
            layoffs: pool.employed - jobs_available,
            hires: 0,
        }
    } else {
        EmploymentPlan {
            layoffs: 0,
            hires: (jobs_available - pool.employed).min(pool.unemployed),
        }
    }
}

/// Job taken by the `n`th hire of a pass. Spreads hires across sectors.
pub fn job_for_hire(n: u32) -> Occupation {
    Occupation::JOBS[n as usize % Occupation::JOBS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_from_birth_time() {
        let mpy = 1000.0;
        let birth = birth_time_for_age(30, 5000.0, mpy);
        assert_eq!(age_years(birth, 5000.0, mpy), 30);
        assert_eq!(age_years(birth, 5999.0, mpy), 30);
        assert_eq!(age_years(birth, 6000.0, mpy), 31);
        assert_eq!(age_years(0.0, 1e12, mpy), MAX_AGE);
    }

    #[test]
    fn test_band_change_occupations() {
        assert_eq!(
            occupation_after_band_change(AgeBand::Child, AgeBand::Adult, Occupation::Student),
            Occupation::Unemployed
        );
        assert_eq!(
            occupation_after_band_change(AgeBand::Adult, AgeBand::Senior, Occupation::Office),
            Occupation::Retired
        );
        assert_eq!(
            occupation_after_band_change(AgeBand::Adult, AgeBand::Senior, Occupation::Student),
            Occupation::Student
        );
    }

    #[test]
    fn test_clamp_employed_first() {
        let pool = LaborPool {
            employed: 80,
            unemployed: 40,
        };
        let out = clamp_labor_pool(pool, 100, ReallocationPolicy::EmployedFirst);
        assert_eq!(out, LaborPool { employed: 60, unemployed: 40 });

        let out = clamp_labor_pool(pool, 30, ReallocationPolicy::EmployedFirst);
        assert_eq!(out, LaborPool { employed: 0, unemployed: 30 });
    }

    #[test]
    fn test_clamp_proportional() {
        let pool = LaborPool {
            employed: 80,
            unemployed: 40,
        };
        let out = clamp_labor_pool(pool, 90, ReallocationPolicy::Proportional);
        assert_eq!(out, LaborPool { employed: 60, unemployed: 30 });
        assert!(out.total() <= 90);
    }

    #[test]
    fn test_clamp_never_exceeds_employable() {
        for employable in [0u32, 1, 7, 50, 99] {
            for policy in [ReallocationPolicy::EmployedFirst, ReallocationPolicy::Proportional] {
                let out = clamp_labor_pool(
                    LaborPool {
                        employed: 63,
                        unemployed: 37,
                    },
                    employable,
                    policy,
                );
                assert!(out.total() <= employable, "{policy:?} {employable}");
            }
        }
    }

    #[test]
    fn test_within_bounds_is_untouched() {
        let pool = LaborPool {
            employed: 5,
            unemployed: 5,
        };
        assert_eq!(clamp_labor_pool(pool, 10, ReallocationPolicy::Proportional), pool);
    }

    #[test]
    fn test_employment_follows_jobs() {
        let pool = LaborPool {
            employed: 50,
            unemployed: 10,
        };
        assert_eq!(plan_employment(pool, 40), EmploymentPlan { layoffs: 10, hires: 0 });
        assert_eq!(plan_employment(pool, 55), EmploymentPlan { layoffs: 0, hires: 5 });
        assert_eq!(plan_employment(pool, 500), EmploymentPlan { layoffs: 0, hires: 10 });
        assert!(job_for_hire(7).is_employed());
    }
}
