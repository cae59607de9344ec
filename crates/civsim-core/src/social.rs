//! Social interactions: the bounded interaction pool, pairing and
//! resolution.
//!
//! Interactions are started and resolved on the engine thread after each
//! batch, never from inside the parallel update. Starting one marks both
//! participants; resolving it applies social satisfaction and relationship
//! changes to whichever participants still exist.

use serde::{Deserialize, Serialize};

use civsim_logic::needs::NeedKind;
use civsim_logic::social::{
    bond_delta, choose_interaction, InteractionKind, RelationshipKind,
};
use civsim_logic::state::BehaviorState;

use crate::citizen::{CitizenId, Location, StatusFlags};
use crate::error::{EngineError, Result};
use crate::store::CitizenStore;

/// Generation-checked handle into the [`InteractionPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionHandle {
    index: u32,
    generation: u32,
}

/// One interaction between two citizens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocialInteraction {
    pub participants: [CitizenId; 2],
    pub kind: InteractionKind,
    pub started_at: f64,
    pub duration_minutes: f32,
    pub location: Location,
    /// Relationship strength change applied to both sides on resolution.
    pub bond: f32,
}

impl SocialInteraction {
    pub fn ends_at(&self) -> f64 {
        self.started_at + self.duration_minutes as f64
    }
}

#[derive(Debug, Clone)]
struct PoolEntry {
    generation: u32,
    interaction: Option<SocialInteraction>,
}

/// Fixed-capacity interaction storage.
#[derive(Debug, Clone)]
pub struct InteractionPool {
    entries: Vec<PoolEntry>,
    free: Vec<u32>,
    active: usize,
    capacity: usize,
}

impl InteractionPool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity.min(4096)),
            free: Vec::new(),
            active: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn allocate(&mut self, interaction: SocialInteraction) -> Result<InteractionHandle> {
        if self.active >= self.capacity {
            return Err(EngineError::ResourceExhausted {
                pool: "interactions",
            });
        }
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                self.entries.push(PoolEntry {
                    generation: 0,
                    interaction: None,
                });
                (self.entries.len() - 1) as u32
            }
        };
        let entry = &mut self.entries[index as usize];
        entry.interaction = Some(interaction);
        self.active += 1;
        Ok(InteractionHandle {
            index,
            generation: entry.generation,
        })
    }

    pub fn get(&self, handle: InteractionHandle) -> Option<&SocialInteraction> {
        self.entries
            .get(handle.index as usize)
            .filter(|e| e.generation == handle.generation)
            .and_then(|e| e.interaction.as_ref())
    }

    /// Take an interaction out of the pool. Stale handles return `None`.
    pub fn release(&mut self, handle: InteractionHandle) -> Option<SocialInteraction> {
        let entry = self.entries.get_mut(handle.index as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        let interaction = entry.interaction.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.active -= 1;
        Some(interaction)
    }

    /// Handles of interactions that have run their course by `now`.
    pub fn due(&self, now: f64) -> Vec<InteractionHandle> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| {
                let ix = e.interaction.as_ref()?;
                (ix.ends_at() <= now).then_some(InteractionHandle {
                    index: i as u32,
                    generation: e.generation,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairingReport {
    pub started: usize,
    pub dropped: usize,
}

/// Pair up this tick's candidates and start their interactions.
///
/// Each candidate first looks for someone it already knows among the
/// remaining candidates, then falls back to the next unpaired candidate in
/// order. When the pool is full, further requests are dropped for the tick.
pub(crate) fn pair_candidates(
    store: &mut CitizenStore,
    pool: &mut InteractionPool,
    candidates: &[CitizenId],
    now: f64,
) -> PairingReport {
    let mut report = PairingReport::default();
    let mut taken = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if taken[i] {
            continue;
        }
        let a = candidates[i];
        let Ok(citizen) = store.get(a) else {
            taken[i] = true;
            continue;
        };
        let known = citizen.relationships.iter().find_map(|r| {
            candidates
                .iter()
                .enumerate()
                .skip(i + 1)
                .find(|(j, id)| !taken[*j] && id.raw() == r.other)
                .map(|(j, _)| j)
        });
        let partner = known.or_else(|| (i + 1..candidates.len()).find(|j| !taken[*j]));
        let Some(j) = partner else {
            break;
        };
        taken[i] = true;
        taken[j] = true;

        match start_interaction(store, pool, a, candidates[j], now) {
            Ok(true) => report.started += 1,
            Ok(false) => {}
            Err(EngineError::ResourceExhausted { .. }) => report.dropped += 1,
            Err(_) => {}
        }
    }
    report
}

/// Returns `Ok(false)` when either side is already busy.
fn start_interaction(
    store: &mut CitizenStore,
    pool: &mut InteractionPool,
    a: CitizenId,
    b: CitizenId,
    now: f64,
) -> Result<bool> {
    let (ca, cb) = store.get_pair_mut(a, b)?;
    if ca.interaction.is_some() || cb.interaction.is_some() {
        return Ok(false);
    }
    let lunch = ca.state == BehaviorState::LunchBreak || cb.state == BehaviorState::LunchBreak;
    let kind = choose_interaction(ca.relationships.strength_with(b.raw()), lunch);
    let handle = pool.allocate(SocialInteraction {
        participants: [a, b],
        kind,
        started_at: now,
        duration_minutes: kind.duration_minutes(),
        location: ca.position,
        bond: bond_delta(kind, &ca.personality, &cb.personality),
    })?;
    for c in [ca, cb] {
        c.interaction = Some(handle);
        c.flags.insert(StatusFlags::IN_INTERACTION);
    }
    Ok(true)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub resolved: usize,
    /// Participants destroyed before their interaction finished.
    pub missing_participants: usize,
    pub relationships_rejected: usize,
}

/// Kind for a first meeting, from where the two live and work.
fn first_meeting_kind(
    a: (Location, Option<Location>),
    b: (Location, Option<Location>),
) -> RelationshipKind {
    match (a.1, b.1) {
        (Some(wa), Some(wb)) if wa == wb => RelationshipKind::Colleague,
        _ if a.0 == b.0 => RelationshipKind::Neighbor,
        _ => RelationshipKind::Acquaintance,
    }
}

/// Resolve every interaction that has finished by `now`.
pub(crate) fn resolve_due(
    store: &mut CitizenStore,
    pool: &mut InteractionPool,
    now: f64,
) -> ResolveReport {
    let mut report = ResolveReport::default();
    for handle in pool.due(now) {
        let Some(ix) = pool.release(handle) else {
            continue;
        };
        report.resolved += 1;

        let places = ix
            .participants
            .map(|id| store.get(id).ok().map(|c| (c.home, c.work)));
        let kind = match places {
            [Some(a), Some(b)] => first_meeting_kind(a, b),
            _ => RelationshipKind::Acquaintance,
        };

        let [a, b] = ix.participants;
        for (me, other) in [(a, b), (b, a)] {
            let Ok(c) = store.get_mut(me) else {
                report.missing_participants += 1;
                continue;
            };
            if c.interaction == Some(handle) {
                c.interaction = None;
                c.flags.remove(StatusFlags::IN_INTERACTION);
            }
            let satisfaction = ix.kind.satisfaction();
            c.needs.adjust(NeedKind::Social, satisfaction);
            c.vitals.happiness = (c.vitals.happiness + satisfaction / 4.0).clamp(0.0, 100.0);
            let outcome = c.relationships.record_interaction(other.raw(), now, ix.bond, kind);
            if outcome == civsim_logic::social::InsertOutcome::Rejected {
                report.relationships_rejected += 1;
            }
        }
    }
    report
}
