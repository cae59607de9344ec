//! Citizen engine - main entry point for running the simulation

use serde::{Deserialize, Serialize};

use civsim_logic::batch::BatchCost;
use civsim_logic::schedule::Occupation;
use civsim_logic::social::{InsertOutcome, RelationshipKind, RelationshipSlot};
use civsim_logic::state::BehaviorState;

use crate::behavior::{citizen_rng, StepContext};
use crate::citizen::{Citizen, CitizenId, CitizenSnapshot, EconomicSnapshot, Location, StatusFlags};
use crate::clock::SimClock;
use crate::collaborators::{DirectRoutePathfinder, EconomySignals, PathfindingService, StaticEconomy};
use crate::config::EngineConfig;
use crate::demographics::{collect_statistics, run_demographics_pass, DemographicsReport, PopulationStatistics};
use crate::error::{EngineError, Result};
use crate::scheduler::{BatchResult, BatchScheduler};
use crate::social::{pair_candidates, resolve_due, InteractionPool};
use crate::store::CitizenStore;

/// Salt for the random stream used when a citizen is created.
const CREATION_SALT: u64 = 0xC4EA_7E00;

/// Running counters, exposed for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub ticks: u64,
    pub processed: u64,
    /// Citizens isolated after failing validation.
    pub faults: u64,
    pub transitions: u64,
    pub band_changes: u64,
    pub path_requests: u64,
    pub path_releases: u64,
    pub interactions_started: u64,
    /// Interaction requests dropped because the pool was full.
    pub interactions_dropped: u64,
    pub interactions_resolved: u64,
    /// Interaction participants destroyed before resolution.
    pub stale_participants: u64,
    pub relationships_released: u64,
    pub relationships_rejected: u64,
    pub demographics_passes: u64,
    pub last_batch: BatchCost,
}

/// Main simulation engine
pub struct CitizenEngine {
    config: EngineConfig,
    clock: SimClock,
    store: CitizenStore,
    scheduler: BatchScheduler,
    interactions: InteractionPool,
    pathfinder: Box<dyn PathfindingService>,
    economy: Box<dyn EconomySignals>,
    diagnostics: Diagnostics,
    last_demographics: f64,
    last_report: Option<DemographicsReport>,
    halted: bool,
}

impl CitizenEngine {
    /// Engine with straight-line routing and a fixed economy.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_collaborators(
            config,
            Box::new(DirectRoutePathfinder::new()),
            Box::new(StaticEconomy::default()),
        )
    }

    pub fn with_collaborators(
        config: EngineConfig,
        pathfinder: Box<dyn PathfindingService>,
        economy: Box<dyn EconomySignals>,
    ) -> Result<Self> {
        config.validate()?;
        log::info!(
            "citizen engine: capacity {}, batch {}, parallel from {}, seed {:#x}",
            config.capacity,
            config.batch_size,
            config.parallel_threshold,
            config.seed
        );
        Ok(Self {
            clock: SimClock::new(config.start_minute, config.time_scale),
            store: CitizenStore::with_capacity(config.capacity),
            scheduler: BatchScheduler::new(config.batch_size, config.parallel_threshold),
            interactions: InteractionPool::with_capacity(config.interaction_pool_capacity),
            pathfinder,
            economy,
            diagnostics: Diagnostics::default(),
            last_demographics: config.start_minute,
            last_report: None,
            halted: false,
            config,
        })
    }

    // === POPULATION ===

    /// Create a citizen at `home`. It starts asleep and joins the update
    /// rotation from the next tick.
    pub fn create_citizen(&mut self, home: Location, age: u8, occupation: Occupation) -> Result<CitizenId> {
        if !home.is_finite() {
            return Err(EngineError::Configuration(format!(
                "home location ({}, {}) is not finite",
                home.x, home.y
            )));
        }
        let now = self.clock.now();
        let seed = self.config.seed;
        let minutes_per_year = self.config.minutes_per_year;
        self.store.insert(|id| {
            let mut rng = citizen_rng(seed ^ CREATION_SALT, id, 0);
            let mut c = Citizen::new(id, home, age, occupation, now, minutes_per_year, &mut rng);
            // rested: free to follow the schedule on the first update
            c.state_entered_at = now - BehaviorState::Sleeping.spec().min_duration as f64;
            c
        })
    }

    /// Remove a citizen. Its id is retired and any path it held is released.
    pub fn destroy_citizen(&mut self, id: CitizenId) -> Result<()> {
        let removal = self.store.remove(id)?;
        self.scheduler.on_removed(&mut self.store, &removal);
        if let Some(handle) = removal.citizen.path {
            self.pathfinder.release(handle);
            self.diagnostics.path_releases += 1;
        }
        Ok(())
    }

    /// Re-insert a citizen record, e.g. from a save. The record gets a new
    /// id; runtime handles (path, interaction) are dropped.
    pub fn restore_citizen(&mut self, snapshot: CitizenSnapshot) -> Result<CitizenId> {
        snapshot
            .validate()
            .map_err(|f| EngineError::Configuration(format!("invalid citizen record: {f}")))?;
        self.store.insert(|_| {
            let mut c = snapshot;
            c.path = None;
            c.interaction = None;
            c.flags.remove(StatusFlags::AWAITING_PATH);
            c.flags.remove(StatusFlags::IN_INTERACTION);
            c
        })
    }

    /// [`restore_citizen`](Self::restore_citizen) from JSON. Malformed
    /// records, including unknown state ids, are configuration errors.
    pub fn restore_citizen_json(&mut self, json: &str) -> Result<CitizenId> {
        let snapshot: CitizenSnapshot = serde_json::from_str(json)
            .map_err(|e| EngineError::Configuration(format!("invalid citizen record: {e}")))?;
        self.restore_citizen(snapshot)
    }

    pub fn get_citizen(&self, id: CitizenId) -> Result<CitizenSnapshot> {
        self.store.get(id).cloned()
    }

    pub fn citizen(&self, id: CitizenId) -> Result<&Citizen> {
        self.store.get(id)
    }

    /// Direct mutable access. Values are validated on the citizen's next
    /// update; bad ones fault the citizen.
    pub fn citizen_mut(&mut self, id: CitizenId) -> Result<&mut Citizen> {
        self.store.get_mut(id)
    }

    pub fn set_work_location(&mut self, id: CitizenId, work: Option<Location>) -> Result<()> {
        let c = self.store.get_mut(id)?;
        c.work = work;
        c.refresh_commute();
        Ok(())
    }

    pub fn set_economic_snapshot(&mut self, id: CitizenId, snapshot: EconomicSnapshot) -> Result<()> {
        self.store.get_mut(id)?.economics = snapshot;
        Ok(())
    }

    /// Give two citizens a relationship of `kind` and `strength` on both
    /// sides, replacing any existing one between them.
    pub fn link_citizens(
        &mut self,
        a: CitizenId,
        b: CitizenId,
        kind: RelationshipKind,
        strength: f32,
    ) -> Result<()> {
        if !strength.is_finite() {
            return Err(EngineError::Configuration(format!(
                "relationship strength {strength} is not finite"
            )));
        }
        let now = self.clock.now();
        let strength = strength.clamp(0.0, 100.0);
        let (ca, cb) = self.store.get_pair_mut(a, b)?;
        let slot = |other: CitizenId| RelationshipSlot {
            other: other.raw(),
            kind,
            strength,
            last_interaction: now,
        };

        ca.relationships.remove(b.raw());
        if ca.relationships.insert(slot(b)) == InsertOutcome::Rejected {
            return Err(EngineError::ResourceExhausted {
                pool: "relationships",
            });
        }
        cb.relationships.remove(a.raw());
        if cb.relationships.insert(slot(a)) == InsertOutcome::Rejected {
            ca.relationships.remove(b.raw());
            return Err(EngineError::ResourceExhausted {
                pool: "relationships",
            });
        }
        Ok(())
    }

    // === SIMULATION ===

    /// Advance the clock by `delta_seconds` of real time and process one
    /// batch. Returns the number of citizens stepped.
    pub fn update(&mut self, delta_seconds: f64) -> Result<usize> {
        if self.halted {
            return Err(EngineError::Halted);
        }
        self.clock.advance(delta_seconds);
        self.tick()
    }

    /// Set the clock to `now` (simulation minutes) and process one batch.
    pub fn advance_to(&mut self, now: f64) -> Result<usize> {
        if self.halted {
            return Err(EngineError::Halted);
        }
        self.clock.advance_to(now);
        self.tick()
    }

    fn tick(&mut self) -> Result<usize> {
        let window = self.scheduler.next_window(self.store.len());
        if let Err(e) = self
            .store
            .verify_range(window.head())
            .and_then(|_| self.store.verify_range(window.tail()))
        {
            return Err(self.halt(e));
        }

        let now = self.clock.now();
        let tick = self.clock.tick();
        let baseline = self.economy.happiness_baseline();
        let ctx = StepContext::new(now, tick, &self.config, &*self.pathfinder, baseline);
        let result = self.scheduler.run(self.store.as_mut_slice(), &ctx);

        self.follow_up(&result, now);
        self.record(&result);
        log::debug!(
            "tick {tick}: {} stepped, {} faulted, {} transitions, {:.0} ns avg",
            result.processed,
            result.faults.len(),
            result.transitions,
            result.cost.average_nanos()
        );

        if now - self.last_demographics >= self.config.demographics_interval_minutes {
            self.run_demographics(now, tick)?;
        }
        Ok(result.processed)
    }

    /// Work the batch could not do in parallel: paths and interactions.
    fn follow_up(&mut self, result: &BatchResult, now: f64) {
        let mut candidates = Vec::new();
        for (id, outcome) in &result.follow_ups {
            if let Some(handle) = outcome.path_release {
                self.pathfinder.release(handle);
                self.diagnostics.path_releases += 1;
            }
            if let Some(req) = outcome.path_request {
                let handle = self.pathfinder.request_path(req.from, req.to, req.class, req.priority);
                self.diagnostics.path_requests += 1;
                match self.store.get_mut(*id) {
                    Ok(c) => c.path = Some(handle),
                    Err(_) => self.pathfinder.release(handle),
                }
            }
            if outcome.social_candidate {
                candidates.push(*id);
            }
        }

        let resolved = resolve_due(&mut self.store, &mut self.interactions, now);
        self.diagnostics.interactions_resolved += resolved.resolved as u64;
        self.diagnostics.stale_participants += resolved.missing_participants as u64;
        self.diagnostics.relationships_rejected += resolved.relationships_rejected as u64;

        let paired = pair_candidates(&mut self.store, &mut self.interactions, &candidates, now);
        self.diagnostics.interactions_started += paired.started as u64;
        if paired.dropped > 0 {
            log::debug!("interaction pool full: dropped {} requests", paired.dropped);
            self.diagnostics.interactions_dropped += paired.dropped as u64;
        }
    }

    fn record(&mut self, result: &BatchResult) {
        let d = &mut self.diagnostics;
        d.ticks += 1;
        d.processed += result.processed as u64;
        d.faults += result.faults.len() as u64;
        d.transitions += result.transitions as u64;
        d.band_changes += result.band_changes as u64;
        d.relationships_released += result.relationships_released as u64;
        d.last_batch = result.cost;
    }

    fn run_demographics(&mut self, now: f64, tick: u64) -> Result<()> {
        self.last_demographics = now;
        if let Err(e) = self.store.verify() {
            return Err(self.halt(e));
        }
        let report = run_demographics_pass(
            self.store.as_mut_slice(),
            self.economy.jobs_available(),
            self.config.reallocation_policy,
            self.config.seed,
            tick,
        );
        log::info!(
            "demographics: employable {}, labor {}+{} -> {}+{} ({} left, {} laid off, {} hired)",
            report.employable,
            report.before.employed,
            report.before.unemployed,
            report.after.employed,
            report.after.unemployed,
            report.left_labor_force,
            report.layoffs,
            report.hires
        );
        self.diagnostics.demographics_passes += 1;
        self.last_report = Some(report);
        Ok(())
    }

    fn halt(&mut self, cause: EngineError) -> EngineError {
        self.halted = true;
        log::error!("citizen engine halted: {cause}");
        cause
    }

    // === QUERIES ===

    pub fn get_population_statistics(&self) -> PopulationStatistics {
        collect_statistics(self.store.as_slice(), self.config.parallel_threshold)
    }

    pub fn last_demographics_report(&self) -> Option<&DemographicsReport> {
        self.last_report.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.clock.set_time_scale(scale);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn active_interactions(&self) -> usize {
        self.interactions.active_count()
    }

    /// Ids of all live citizens, in dense order.
    pub fn citizen_ids(&self) -> impl Iterator<Item = CitizenId> + '_ {
        self.store.ids()
    }
}
