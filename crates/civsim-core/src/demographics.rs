//! Population statistics and the periodic labor pass.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use civsim_logic::demographics::{
    clamp_labor_pool, job_for_hire, plan_employment, LaborPool, ReallocationPolicy,
};
use civsim_logic::needs::NEED_COUNT;
use civsim_logic::schedule::{template_for, AgeBand, DailySchedule, Occupation, OCCUPATION_COUNT};
use civsim_logic::state::STATE_COUNT;

use crate::behavior::citizen_rng;
use crate::citizen::Citizen;

/// Relationship totals across the population, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipTotals {
    pub family: u64,
    pub friends: u64,
    pub colleagues: u64,
    pub neighbors: u64,
    pub acquaintances: u64,
}

/// Aggregate view of the population. Faulted citizens are counted in
/// `total` and `faulted` only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationStatistics {
    pub total: usize,
    pub faulted: usize,
    /// Indexed by `AgeBand as usize`.
    pub by_age_band: [usize; 3],
    /// Indexed by `Occupation::index`.
    pub by_occupation: [usize; OCCUPATION_COUNT],
    /// Indexed by `BehaviorState::index`.
    pub by_state: [usize; STATE_COUNT],
    pub average_happiness: f32,
    pub average_health: f32,
    pub average_stress: f32,
    pub average_energy: f32,
    pub average_needs: [f32; NEED_COUNT],
    pub labor: LaborPool,
    /// Working-age citizens.
    pub employable: u32,
    pub relationships: RelationshipTotals,
}

impl PopulationStatistics {
    pub fn age_band(&self, band: AgeBand) -> usize {
        self.by_age_band[band as usize]
    }

    pub fn occupation(&self, occupation: Occupation) -> usize {
        self.by_occupation[occupation.index()]
    }
}

#[derive(Debug, Clone, Default)]
struct Tally {
    stats: PopulationStatistics,
    happiness: f64,
    health: f64,
    stress: f64,
    energy: f64,
    needs: [f64; NEED_COUNT],
}

impl Tally {
    fn add(mut self, c: &Citizen) -> Self {
        let s = &mut self.stats;
        s.total += 1;
        if c.is_faulted() {
            s.faulted += 1;
            return self;
        }
        let band = c.age_band();
        s.by_age_band[band as usize] += 1;
        s.by_occupation[c.occupation.index()] += 1;
        s.by_state[c.state.index()] += 1;
        if band == AgeBand::Adult {
            s.employable += 1;
        }
        if c.occupation.is_employed() {
            s.labor.employed += 1;
        } else if c.occupation == Occupation::Unemployed {
            s.labor.unemployed += 1;
        }
        let r = c.relationships.counts();
        s.relationships.family += r.family as u64;
        s.relationships.friends += r.friends as u64;
        s.relationships.colleagues += r.colleagues as u64;
        s.relationships.neighbors += r.neighbors as u64;
        s.relationships.acquaintances += r.acquaintances as u64;

        self.happiness += c.vitals.happiness as f64;
        self.health += c.vitals.health as f64;
        self.stress += c.vitals.stress as f64;
        self.energy += c.vitals.energy as f64;
        for (sum, level) in self.needs.iter_mut().zip(c.needs.levels) {
            *sum += level as f64;
        }
        self
    }

    fn merge(mut self, other: Tally) -> Self {
        let (a, b) = (&mut self.stats, other.stats);
        a.total += b.total;
        a.faulted += b.faulted;
        for (x, y) in a.by_age_band.iter_mut().zip(b.by_age_band) {
            *x += y;
        }
        for (x, y) in a.by_occupation.iter_mut().zip(b.by_occupation) {
            *x += y;
        }
        for (x, y) in a.by_state.iter_mut().zip(b.by_state) {
            *x += y;
        }
        a.employable += b.employable;
        a.labor.employed += b.labor.employed;
        a.labor.unemployed += b.labor.unemployed;
        a.relationships.family += b.relationships.family;
        a.relationships.friends += b.relationships.friends;
        a.relationships.colleagues += b.relationships.colleagues;
        a.relationships.neighbors += b.relationships.neighbors;
        a.relationships.acquaintances += b.relationships.acquaintances;

        self.happiness += other.happiness;
        self.health += other.health;
        self.stress += other.stress;
        self.energy += other.energy;
        for (x, y) in self.needs.iter_mut().zip(other.needs) {
            *x += y;
        }
        self
    }

    fn finish(self) -> PopulationStatistics {
        let mut s = self.stats;
        let counted = s.total - s.faulted;
        if counted > 0 {
            let n = counted as f64;
            s.average_happiness = (self.happiness / n) as f32;
            s.average_health = (self.health / n) as f32;
            s.average_stress = (self.stress / n) as f32;
            s.average_energy = (self.energy / n) as f32;
            for (avg, sum) in s.average_needs.iter_mut().zip(self.needs) {
                *avg = (sum / n) as f32;
            }
        }
        s
    }
}

/// Reduce the population to statistics, in parallel for large populations.
pub fn collect_statistics(citizens: &[Citizen], parallel_threshold: usize) -> PopulationStatistics {
    let tally = if citizens.len() >= parallel_threshold {
        citizens
            .par_iter()
            .fold(Tally::default, Tally::add)
            .reduce(Tally::default, Tally::merge)
    } else {
        citizens.iter().fold(Tally::default(), Tally::add)
    };
    tally.finish()
}

/// What one labor pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicsReport {
    pub before: LaborPool,
    pub after: LaborPool,
    pub employable: u32,
    /// Children and seniors moved out of the labor pool.
    pub left_labor_force: u32,
    pub layoffs: u32,
    pub hires: u32,
}

fn labor_pool(citizens: &[Citizen]) -> (LaborPool, u32) {
    let mut pool = LaborPool::default();
    let mut employable = 0;
    for c in citizens.iter().filter(|c| !c.is_faulted()) {
        if c.age_band() == AgeBand::Adult {
            employable += 1;
        }
        if c.occupation.is_employed() {
            pool.employed += 1;
        } else if c.occupation == Occupation::Unemployed {
            pool.unemployed += 1;
        }
    }
    (pool, employable)
}

/// Occupation for someone outside working age leaving the labor pool.
fn outside_labor_force(band: AgeBand) -> Occupation {
    match band {
        AgeBand::Child => Occupation::Student,
        AgeBand::Adult => Occupation::Unemployed,
        AgeBand::Senior => Occupation::Retired,
    }
}

fn reassign(c: &mut Citizen, occupation: Occupation, seed: u64, tick: u64) {
    c.occupation = occupation;
    if !occupation.is_employed() {
        c.work = None;
        c.refresh_commute();
    }
    let mut rng = citizen_rng(seed ^ 0x1AB0, c.id, tick);
    c.schedule = DailySchedule::seeded(
        &template_for(c.age_band(), occupation),
        c.personality.routine_flexibility(),
        &mut rng,
    );
}

/// Rebalance the labor pool.
///
/// First the pool is clamped to the employable population under `policy`,
/// moving children and seniors out of it. Then the employed count is
/// brought in line with `jobs_available`, laying off or hiring working-age
/// adults. Citizens are picked in dense order (layoffs from the back).
pub fn run_demographics_pass(
    citizens: &mut [Citizen],
    jobs_available: u32,
    policy: ReallocationPolicy,
    seed: u64,
    tick: u64,
) -> DemographicsReport {
    let (pool, employable) = labor_pool(citizens);
    let target = clamp_labor_pool(pool, employable, policy);
    let mut report = DemographicsReport {
        before: pool,
        employable,
        ..DemographicsReport::default()
    };

    // Shrink the pool. Only non-adults can leave it.
    let mut excess = pool.total() - target.total();
    let employed_first = policy == ReallocationPolicy::EmployedFirst;
    let passes: &[fn(&Citizen) -> bool] = if employed_first {
        &[|c| c.occupation.is_employed(), |c| c.occupation == Occupation::Unemployed]
    } else {
        &[|c| c.occupation.is_employed() || c.occupation == Occupation::Unemployed]
    };
    for in_bucket in passes {
        for c in citizens.iter_mut() {
            if excess == 0 {
                break;
            }
            if c.is_faulted() || c.age_band() == AgeBand::Adult || !in_bucket(c) {
                continue;
            }
            let band = c.age_band();
            reassign(c, outside_labor_force(band), seed, tick);
            excess -= 1;
            report.left_labor_force += 1;
        }
    }

    // Move working-age adults until the employed count matches the clamped
    // pool adjusted to the jobs on offer.
    let plan = plan_employment(target, jobs_available);
    let desired = target.employed - plan.layoffs + plan.hires;
    let employed = labor_pool(citizens).0.employed;
    let layoffs = employed.saturating_sub(desired);
    let hires = desired.saturating_sub(employed);

    let adult = |c: &Citizen| !c.is_faulted() && c.age_band() == AgeBand::Adult;
    let mut remaining = layoffs;
    for c in citizens.iter_mut().rev() {
        if remaining == 0 {
            break;
        }
        if adult(c) && c.occupation.is_employed() {
            reassign(c, Occupation::Unemployed, seed, tick);
            remaining -= 1;
            report.layoffs += 1;
        }
    }
    let mut remaining = hires;
    for c in citizens.iter_mut() {
        if remaining == 0 {
            break;
        }
        if adult(c) && c.occupation == Occupation::Unemployed {
            reassign(c, job_for_hire(report.hires), seed, tick);
            remaining -= 1;
            report.hires += 1;
        }
    }

    report.after = labor_pool(citizens).0;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citizen::{CitizenId, Location, StatusFlags};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn people(spec: &[(u8, Occupation)]) -> Vec<Citizen> {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        spec.iter()
            .enumerate()
            .map(|(i, (age, occ))| {
                Citizen::new(
                    CitizenId::new(i as u32, 0),
                    Location::default(),
                    *age,
                    *occ,
                    0.0,
                    525_600.0,
                    &mut rng,
                )
            })
            .collect()
    }

    #[test]
    fn test_statistics_counts() {
        let mut citizens = people(&[
            (10, Occupation::Student),
            (30, Occupation::Office),
            (40, Occupation::Unemployed),
            (70, Occupation::Retired),
        ]);
        citizens[3].flags.insert(StatusFlags::FAULTED);

        let stats = collect_statistics(&citizens, usize::MAX);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.faulted, 1);
        assert_eq!(stats.age_band(AgeBand::Child), 1);
        assert_eq!(stats.age_band(AgeBand::Senior), 0);
        assert_eq!(stats.occupation(Occupation::Office), 1);
        assert_eq!(stats.employable, 2);
        assert_eq!(stats.labor, LaborPool { employed: 1, unemployed: 1 });
        assert_eq!(stats.by_state.iter().sum::<usize>(), 3);
        assert!((stats.average_health - 85.0).abs() < 1e-4);
    }

    #[test]
    fn test_parallel_and_serial_statistics_agree() {
        let spec: Vec<_> = (0..200)
            .map(|i| (5 + (i % 80) as u8, Occupation::ALL[i % OCCUPATION_COUNT]))
            .collect();
        let citizens = people(&spec);
        let serial = collect_statistics(&citizens, usize::MAX);
        let parallel = collect_statistics(&citizens, 1);
        assert_eq!(serial.total, parallel.total);
        assert_eq!(serial.by_occupation, parallel.by_occupation);
        assert_eq!(serial.labor, parallel.labor);
        assert!((serial.average_happiness - parallel.average_happiness).abs() < 1e-3);
    }

    #[test]
    fn test_empty_population_has_zero_averages() {
        let stats = collect_statistics(&[], 1);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_happiness, 0.0);
    }

    #[test]
    fn test_pool_never_exceeds_employable() {
        let mut citizens = people(&[
            (30, Occupation::Office),
            (35, Occupation::Office),
            (12, Occupation::Retail),
            (70, Occupation::Unemployed),
            (80, Occupation::Healthcare),
        ]);
        let report =
            run_demographics_pass(&mut citizens, u32::MAX, ReallocationPolicy::EmployedFirst, 1, 1);
        assert_eq!(report.employable, 2);
        assert_eq!(report.left_labor_force, 3);
        assert!(report.after.total() <= report.employable);
        assert_eq!(citizens[2].occupation, Occupation::Student);
        assert_eq!(citizens[3].occupation, Occupation::Retired);
        assert_eq!(citizens[4].occupation, Occupation::Retired);
    }

    #[test]
    fn test_layoffs_follow_jobs() {
        let mut citizens = people(&[
            (30, Occupation::Office),
            (31, Occupation::Retail),
            (32, Occupation::Service),
        ]);
        let report =
            run_demographics_pass(&mut citizens, 1, ReallocationPolicy::EmployedFirst, 1, 1);
        assert_eq!(report.layoffs, 2);
        assert_eq!(report.after, LaborPool { employed: 1, unemployed: 2 });
        // laid off from the back
        assert_eq!(citizens[0].occupation, Occupation::Office);
        assert_eq!(citizens[2].occupation, Occupation::Unemployed);
        assert!(!citizens[2].schedule.has_work());
    }

    #[test]
    fn test_open_jobs_are_filled() {
        let mut citizens = people(&[
            (30, Occupation::Unemployed),
            (31, Occupation::Unemployed),
            (32, Occupation::Office),
        ]);
        let report =
            run_demographics_pass(&mut citizens, 2, ReallocationPolicy::EmployedFirst, 1, 1);
        assert_eq!(report.hires, 1);
        assert_eq!(report.after, LaborPool { employed: 2, unemployed: 1 });
        assert!(citizens[0].occupation.is_employed());
        assert!(citizens[0].schedule.has_work());
    }
}
