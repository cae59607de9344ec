//! Incremental batch scheduler.
//!
//! Each tick runs [`step_citizen`] over one [`BatchWindow`] of the dense
//! citizen array. Large windows are split across rayon workers; every
//! citizen belongs to exactly one worker, so steps never share mutable
//! data. Results come back in window order, which keeps the engine's
//! follow-up pass deterministic whatever the thread count.

use std::time::Instant;

use rayon::prelude::*;

use civsim_logic::batch::{BatchCost, BatchWindow};

use crate::behavior::{step_citizen, StepContext, StepOutcome};
use crate::citizen::{Citizen, CitizenId, StatusFlags};
use crate::error::CitizenFault;
use crate::store::{CitizenStore, Removal};

enum Visit {
    Skipped,
    Done {
        id: CitizenId,
        outcome: StepOutcome,
        nanos: u32,
    },
    Faulted {
        id: CitizenId,
        fault: CitizenFault,
    },
}

fn visit(c: &mut Citizen, ctx: &StepContext<'_>) -> Visit {
    if c.is_faulted() {
        return Visit::Skipped;
    }
    let started = Instant::now();
    match step_citizen(c, ctx) {
        Ok(outcome) => {
            let nanos = started.elapsed().as_nanos().min(u32::MAX as u128) as u32;
            c.last_cost_nanos = nanos;
            Visit::Done {
                id: c.id,
                outcome,
                nanos,
            }
        }
        Err(fault) => {
            c.flags.insert(StatusFlags::FAULTED);
            Visit::Faulted { id: c.id, fault }
        }
    }
}

/// Summary of one tick's batch.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub window: Option<BatchWindow>,
    /// Citizens stepped successfully.
    pub processed: usize,
    pub skipped_faulted: usize,
    /// Citizens that faulted during this batch.
    pub faults: Vec<(CitizenId, CitizenFault)>,
    /// Outcomes the engine must act on, in window order.
    pub follow_ups: Vec<(CitizenId, StepOutcome)>,
    pub transitions: usize,
    pub band_changes: usize,
    pub relationships_released: usize,
    pub cost: BatchCost,
}

#[derive(Debug, Clone)]
pub struct BatchScheduler {
    cursor: usize,
    batch_size: usize,
    parallel_threshold: usize,
}

impl BatchScheduler {
    pub fn new(batch_size: usize, parallel_threshold: usize) -> Self {
        Self {
            cursor: 0,
            batch_size,
            parallel_threshold,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The window the next call to [`run`](Self::run) will process.
    pub fn next_window(&self, population: usize) -> BatchWindow {
        BatchWindow::plan(self.cursor, population, self.batch_size)
    }

    /// Step the next window of `citizens` and advance the cursor past it.
    pub fn run(&mut self, citizens: &mut [Citizen], ctx: &StepContext<'_>) -> BatchResult {
        let window = self.next_window(citizens.len());
        if window.is_empty() {
            return BatchResult::default();
        }

        let head_len = window.head().len();
        let tail_len = window.tail().len();
        let (front, back) = citizens.split_at_mut(window.start);
        let head = &mut back[..head_len];
        let tail = &mut front[..tail_len];

        let visits: Vec<Visit> = if window.len >= self.parallel_threshold {
            head.par_iter_mut()
                .chain(tail.par_iter_mut())
                .map(|c| visit(c, ctx))
                .collect()
        } else {
            head.iter_mut()
                .chain(tail.iter_mut())
                .map(|c| visit(c, ctx))
                .collect()
        };
        self.cursor = window.next_cursor();

        let mut result = BatchResult {
            window: Some(window),
            ..BatchResult::default()
        };
        for v in visits {
            match v {
                Visit::Skipped => result.skipped_faulted += 1,
                Visit::Faulted { id, fault } => {
                    log::warn!("citizen {id} faulted and was isolated: {fault}");
                    result.faults.push((id, fault));
                }
                Visit::Done { id, outcome, nanos } => {
                    result.processed += 1;
                    result.cost.record(nanos as u64);
                    result.transitions += outcome.transition.is_some() as usize;
                    result.band_changes += outcome.band_change.is_some() as usize;
                    result.relationships_released += outcome.relationships_released as usize;
                    if outcome.needs_follow_up() {
                        result.follow_ups.push((id, outcome));
                    }
                }
            }
        }
        result
    }

    /// Keep the sweep guarantee after a swap-removal.
    ///
    /// Swap-removal moves the last citizen into the hole. If that lands a
    /// citizen not yet visited this sweep behind the cursor, it is swapped
    /// back to just in front of it.
    pub fn on_removed(&mut self, store: &mut CitizenStore, removal: &Removal) {
        let Some(moved_from) = removal.moved_from else {
            return;
        };
        if removal.index < self.cursor && moved_from >= self.cursor {
            self.cursor -= 1;
            store.swap(removal.index, self.cursor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citizen::Location;
    use crate::collaborators::DirectRoutePathfinder;
    use crate::config::EngineConfig;
    use civsim_logic::schedule::Occupation;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn store(n: usize) -> (CitizenStore, Vec<CitizenId>) {
        let mut store = CitizenStore::with_capacity(64);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let ids = (0..n)
            .map(|_| {
                store
                    .insert(|id| {
                        Citizen::new(
                            id,
                            Location::default(),
                            30,
                            Occupation::Office,
                            0.0,
                            525_600.0,
                            &mut rng,
                        )
                    })
                    .unwrap()
            })
            .collect();
        (store, ids)
    }

    fn run_at(
        scheduler: &mut BatchScheduler,
        store: &mut CitizenStore,
        now: f64,
        tick: u64,
    ) -> BatchResult {
        let config = EngineConfig::default();
        let pf = DirectRoutePathfinder::new();
        let ctx = StepContext::new(now, tick, &config, &pf, 60.0);
        scheduler.run(store.as_mut_slice(), &ctx)
    }

    #[test]
    fn test_window_wraps_within_tick() {
        let (mut store, _) = store(10);
        let mut scheduler = BatchScheduler::new(4, usize::MAX);
        for (tick, now) in [(1, 10.0), (2, 20.0), (3, 30.0)] {
            let r = run_at(&mut scheduler, &mut store, now, tick);
            assert_eq!(r.processed, 4);
        }
        let updated: Vec<f64> = store.iter().map(|c| c.last_update).collect();
        assert_eq!(
            updated,
            vec![30.0, 30.0, 10.0, 10.0, 20.0, 20.0, 20.0, 20.0, 30.0, 30.0]
        );
        assert_eq!(scheduler.cursor(), 2);
    }

    #[test]
    fn test_parallel_run_matches_serial() {
        let (mut a, _) = store(40);
        let mut b = CitizenStore::with_capacity(64);
        for c in a.iter() {
            b.insert(|_| c.clone()).unwrap();
        }
        let mut serial = BatchScheduler::new(16, usize::MAX);
        let mut parallel = BatchScheduler::new(16, 1);
        for tick in 1..=6 {
            let now = tick as f64 * 97.0;
            run_at(&mut serial, &mut a, now, tick);
            run_at(&mut parallel, &mut b, now, tick);
        }
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.state, y.state);
            assert_eq!(x.needs, y.needs);
            assert_eq!(x.activity, y.activity);
        }
    }

    #[test]
    fn test_faulted_citizen_is_isolated() {
        let (mut store, ids) = store(3);
        store.get_mut(ids[1]).unwrap().needs.levels[0] = f32::NAN;
        let mut scheduler = BatchScheduler::new(3, usize::MAX);

        let r = run_at(&mut scheduler, &mut store, 5.0, 1);
        assert_eq!(r.processed, 2);
        assert_eq!(r.faults.len(), 1);
        assert!(store.get(ids[1]).unwrap().is_faulted());

        let r = run_at(&mut scheduler, &mut store, 10.0, 2);
        assert_eq!(r.processed, 2);
        assert_eq!(r.skipped_faulted, 1);
        assert!(r.faults.is_empty());
    }

    #[test]
    fn test_corrupt_schedule_faults_without_panic() {
        let (mut store, ids) = store(8);
        store.get_mut(ids[2]).unwrap().schedule.wake = 65_000;
        store.get_mut(ids[5]).unwrap().personality.traits[0] = 200;
        // sharded, so the faults happen on rayon workers
        let mut scheduler = BatchScheduler::new(8, 1);

        let r = run_at(&mut scheduler, &mut store, 10.0, 1);
        assert_eq!(r.processed, 6);
        assert_eq!(r.faults.len(), 2);
        assert!(store.get(ids[2]).unwrap().is_faulted());
        assert!(store.get(ids[5]).unwrap().is_faulted());
        assert_eq!(store.get(ids[0]).unwrap().last_update, 10.0);
    }

    #[test]
    fn test_removal_keeps_unvisited_ahead_of_cursor() {
        let (mut store, ids) = store(6);
        let mut scheduler = BatchScheduler::new(3, usize::MAX);
        run_at(&mut scheduler, &mut store, 10.0, 1);
        assert_eq!(scheduler.cursor(), 3);

        // removing a visited citizen pulls unvisited #5 into slot 0
        let removal = store.remove(ids[0]).unwrap();
        scheduler.on_removed(&mut store, &removal);
        assert_eq!(scheduler.cursor(), 2);
        assert_eq!(store.index_of(ids[5]).unwrap(), 2);

        run_at(&mut scheduler, &mut store, 20.0, 2);
        for id in &ids[3..] {
            assert_eq!(store.get(*id).unwrap().last_update, 20.0);
        }
        assert!(store.verify().is_ok());
    }

    #[test]
    fn test_empty_population_is_a_no_op() {
        let mut store = CitizenStore::with_capacity(4);
        let mut scheduler = BatchScheduler::new(4, 1);
        let r = run_at(&mut scheduler, &mut store, 1.0, 1);
        assert_eq!(r.processed, 0);
        assert!(r.window.is_none());
    }
}
