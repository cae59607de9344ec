//! The citizen record and its identifiers.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use civsim_logic::activities::{ActivityId, Venue};
use civsim_logic::demographics::birth_time_for_age;
use civsim_logic::needs::{NeedKind, NeedLevels};
use civsim_logic::personality::Personality;
use civsim_logic::schedule::{
    commute_minutes, template_for, AgeBand, DailySchedule, Occupation, MAX_COMMUTE_MINUTES,
    MIN_COMMUTE_MINUTES,
};
use civsim_logic::social::Relationships;
use civsim_logic::state::BehaviorState;
use civsim_logic::vitals::Vitals;

use crate::collaborators::PathHandle;
use crate::error::CitizenFault;
use crate::social::InteractionHandle;

/// Stable, generation-checked citizen handle.
///
/// The low 32 bits are the store slot, the high 32 bits the slot's
/// generation. A handle to a destroyed citizen never resolves again, even
/// after its slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CitizenId(u64);

impl CitizenId {
    pub fn new(slot: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | slot as u64)
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn slot(self) -> u32 {
        self.0 as u32
    }

    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Display for CitizenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.slot(), self.generation())
    }
}

/// Position on the city map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f32,
    pub y: f32,
}

impl Location {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Location) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    Other,
}

impl Gender {
    pub fn random(rng: &mut impl Rng) -> Self {
        match rng.gen_range(0..100) {
            0..=48 => Gender::Female,
            49..=97 => Gender::Male,
            _ => Gender::Other,
        }
    }
}

/// Money matters, written by the economy collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomicSnapshot {
    pub income: f32,
    pub savings: f32,
    pub expenses: f32,
}

/// Bit flags on a citizen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags(u8);

impl StatusFlags {
    /// Failed validation; skipped by updates and statistics.
    pub const FAULTED: u8 = 1 << 0;
    /// Taking part in an interaction.
    pub const IN_INTERACTION: u8 = 1 << 1;
    /// Waiting on a path request.
    pub const AWAITING_PATH: u8 = 1 << 2;
    /// At the work location.
    pub const AT_WORK: u8 = 1 << 3;

    pub fn contains(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn insert(&mut self, flag: u8) {
        self.0 |= flag;
    }

    pub fn remove(&mut self, flag: u8) {
        self.0 &= !flag;
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Size of one [`Citizen`]: seven cache lines, 200 bytes of which are the
/// inline relationship list.
pub const RECORD_BYTES: usize = 448;

/// One simulated citizen.
///
/// Cache-line aligned; the scheduler walks these contiguously. Field order
/// is fixed (`repr(C)`), so adding or reordering fields may change [`RECORD_BYTES`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[repr(C, align(64))]
pub struct Citizen {
    pub id: CitizenId,

    // behavior
    pub state: BehaviorState,
    pub state_entered_at: f64,
    pub emergency_reason: Option<NeedKind>,
    pub activity: ActivityId,
    pub activity_started_at: f64,
    pub activity_duration: f32,
    pub flags: StatusFlags,

    // who they are
    pub gender: Gender,
    pub occupation: Occupation,
    pub age: u8,
    pub birth_time: f64,
    pub personality: Personality,
    pub schedule: DailySchedule,

    // how they are
    pub needs: NeedLevels,
    pub vitals: Vitals,

    // where they are
    pub position: Location,
    pub home: Location,
    pub work: Option<Location>,
    pub destination: Option<Location>,
    pub path: Option<PathHandle>,
    pub commute_minutes: u16,

    // social and economic
    pub relationships: Relationships,
    pub interaction: Option<InteractionHandle>,
    pub economics: EconomicSnapshot,

    // bookkeeping
    pub last_update: f64,
    pub last_cost_nanos: u32,
}

/// Copy of a citizen handed out to callers.
pub type CitizenSnapshot = Citizen;

impl Citizen {
    /// A freshly created citizen at home, at `now`.
    pub(crate) fn new(
        id: CitizenId,
        home: Location,
        age: u8,
        occupation: Occupation,
        now: f64,
        minutes_per_year: f64,
        rng: &mut impl Rng,
    ) -> Self {
        let personality = Personality::random(rng);
        let band = AgeBand::from_age(age);
        let schedule = DailySchedule::seeded(
            &template_for(band, occupation),
            personality.routine_flexibility(),
            rng,
        );
        Self {
            id,
            state: BehaviorState::Sleeping,
            state_entered_at: now,
            emergency_reason: None,
            activity: ActivityId::Idle,
            activity_started_at: now,
            activity_duration: 0.0,
            flags: StatusFlags::default(),
            gender: Gender::random(rng),
            occupation,
            age,
            birth_time: birth_time_for_age(age, now, minutes_per_year)
                - rng.gen_range(0.0..minutes_per_year),
            personality,
            schedule,
            needs: NeedLevels::default(),
            vitals: Vitals::default(),
            position: home,
            home,
            work: None,
            destination: None,
            path: None,
            commute_minutes: commute_minutes(None),
            relationships: Relationships::default(),
            interaction: None,
            economics: EconomicSnapshot::default(),
            last_update: now,
            last_cost_nanos: 0,
        }
    }

    pub fn age_band(&self) -> AgeBand {
        AgeBand::from_age(self.age)
    }

    pub fn is_faulted(&self) -> bool {
        self.flags.contains(StatusFlags::FAULTED)
    }

    /// The place the citizen is at, if it is home or work.
    pub fn venue(&self) -> Option<Venue> {
        if self.position == self.home {
            Some(Venue::Home)
        } else if self.work == Some(self.position) {
            Some(Venue::Work)
        } else {
            None
        }
    }

    /// Minutes since the current state was entered.
    pub fn minutes_in_state(&self, now: f64) -> f64 {
        (now - self.state_entered_at).max(0.0)
    }

    /// Recompute the commute from the home and work locations.
    pub fn refresh_commute(&mut self) {
        self.commute_minutes = commute_minutes(self.work.map(|w| self.home.distance(&w)));
    }

    /// Check every field an update reads: finite numbers, values on their
    /// scales, schedule minutes on the dial.
    pub fn validate(&self) -> Result<(), CitizenFault> {
        let non_finite = |field| Err(CitizenFault::NonFinite { field });
        let out_of_range = |field| Err(CitizenFault::OutOfRange { field });
        if !self.needs.is_finite() {
            return non_finite("needs");
        }
        if !self.vitals.is_finite() {
            return non_finite("vitals");
        }
        if !self.last_update.is_finite() {
            return non_finite("last_update");
        }
        if !self.state_entered_at.is_finite() || !self.activity_started_at.is_finite() {
            return non_finite("state timing");
        }
        if !self.activity_duration.is_finite() {
            return non_finite("activity_duration");
        }
        if !self.birth_time.is_finite() {
            return non_finite("birth_time");
        }
        if !self.position.is_finite() || !self.home.is_finite() {
            return non_finite("location");
        }
        if !self.needs.in_range() {
            return out_of_range("needs");
        }
        if !self.vitals.in_range() {
            return out_of_range("vitals");
        }
        if !self.personality.in_range() {
            return out_of_range("personality");
        }
        if !self.schedule.is_valid() {
            return out_of_range("schedule");
        }
        if !(MIN_COMMUTE_MINUTES..=MAX_COMMUTE_MINUTES).contains(&self.commute_minutes) {
            return out_of_range("commute_minutes");
        }
        if !self.relationships.is_consistent() {
            return Err(CitizenFault::Relationships);
        }
        Ok(())
    }
}
