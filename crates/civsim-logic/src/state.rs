//! Behavior states and the static transition table.
//!
//! Every citizen is in exactly one of eleven states. The table below lists,
//! per state, the states it may legally move to, how long it must last at
//! minimum and may last at most, and whether a critical need may cut it
//! short.
//!
//! | State | Min | Max | Interruptible | Workday successor |
//! |-------|-----|-----|---------------|-------------------|
//! | `Sleeping` | 180 | 720 | no | `MorningRoutine` |
//! | `MorningRoutine` | 20 | 180 | yes | `CommutingToWork` |
//! | `CommutingToWork` | 5 | 150 | yes | `Working` |
//! | `Working` | 30 | 720 | yes | `CommutingHome` |
//! | `LunchBreak` | 20 | 90 | yes | `Working` |
//! | `CommutingHome` | 5 | 150 | yes | `EveningActivities` |
//! | `EveningActivities` | 15 | 600 | yes | `NightRoutine` |
//! | `Socializing` | 30 | 300 | yes | `NightRoutine` |
//! | `NightRoutine` | 15 | 120 | yes | `Sleeping` |
//! | `WeekendActivities` | 30 | 900 | yes | `NightRoutine` |
//! | `Emergency` | 15 | 240 | no | any |
//!
//! Every state may move to `Emergency` and `Sleeping`. Emergency may move
//! anywhere.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const STATE_COUNT: usize = 11;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum BehaviorState {
    #[default]
    Sleeping = 0,
    MorningRoutine = 1,
    CommutingToWork = 2,
    Working = 3,
    LunchBreak = 4,
    CommutingHome = 5,
    EveningActivities = 6,
    Socializing = 7,
    NightRoutine = 8,
    WeekendActivities = 9,
    Emergency = 10,
}

/// A state id outside `0..STATE_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownState(pub u8);

impl fmt::Display for UnknownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown behavior state id {}", self.0)
    }
}

impl std::error::Error for UnknownState {}

impl TryFrom<u8> for BehaviorState {
    type Error = UnknownState;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        BehaviorState::ALL
            .get(id as usize)
            .copied()
            .ok_or(UnknownState(id))
    }
}

impl From<BehaviorState> for u8 {
    fn from(state: BehaviorState) -> u8 {
        state as u8
    }
}

impl BehaviorState {
    pub const ALL: [BehaviorState; STATE_COUNT] = [
        BehaviorState::Sleeping,
        BehaviorState::MorningRoutine,
        BehaviorState::CommutingToWork,
        BehaviorState::Working,
        BehaviorState::LunchBreak,
        BehaviorState::CommutingHome,
        BehaviorState::EveningActivities,
        BehaviorState::Socializing,
        BehaviorState::NightRoutine,
        BehaviorState::WeekendActivities,
        BehaviorState::Emergency,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn index(self) -> usize {
        self as usize
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn spec(self) -> &'static StateSpec {
        &STATE_TABLE[self as usize]
    }

    pub fn is_commute(self) -> bool {
        matches!(
            self,
            BehaviorState::CommutingToWork | BehaviorState::CommutingHome
        )
    }

    /// States whose occupants may be paired into a social interaction.
    pub fn allows_interaction(self) -> bool {
        matches!(
            self,
            BehaviorState::Socializing
                | BehaviorState::LunchBreak
                | BehaviorState::EveningActivities
                | BehaviorState::WeekendActivities
        )
    }

    /// Default next state when the schedule target is not reachable.
    ///
    /// `free_day` selects the weekend flow out of `MorningRoutine`. Emergency
    /// has no natural successor.
    pub fn successor(self, free_day: bool) -> Option<BehaviorState> {
        use BehaviorState::*;
        match self {
            Sleeping => Some(MorningRoutine),
            MorningRoutine if free_day => Some(WeekendActivities),
            MorningRoutine => Some(CommutingToWork),
            CommutingToWork => Some(Working),
            Working => Some(CommutingHome),
            LunchBreak => Some(Working),
            CommutingHome => Some(EveningActivities),
            EveningActivities | Socializing | WeekendActivities => Some(NightRoutine),
            NightRoutine => Some(Sleeping),
            Emergency => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BehaviorState::Sleeping => "sleeping",
            BehaviorState::MorningRoutine => "morning_routine",
            BehaviorState::CommutingToWork => "commuting_to_work",
            BehaviorState::Working => "working",
            BehaviorState::LunchBreak => "lunch_break",
            BehaviorState::CommutingHome => "commuting_home",
            BehaviorState::EveningActivities => "evening_activities",
            BehaviorState::Socializing => "socializing",
            BehaviorState::NightRoutine => "night_routine",
            BehaviorState::WeekendActivities => "weekend_activities",
            BehaviorState::Emergency => "emergency",
        }
    }
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static per-state rules.
#[derive(Debug, Clone, Copy)]
pub struct StateSpec {
    pub state: BehaviorState,
    /// Bitmask of legal next states, indexed by state id.
    pub legal_next: u16,
    /// Minimum minutes before a scheduled transition may leave.
    pub min_duration: u16,
    /// Minutes after which the state is forced to move on.
    pub max_duration: u16,
    /// Relative importance, used for diagnostics ordering.
    pub priority: u8,
    /// Whether a critical need may cut this state short.
    pub interruptible: bool,
}

const fn mask(states: &[BehaviorState]) -> u16 {
    // Emergency and Sleeping are reachable from everywhere.
    let mut m = BehaviorState::Emergency.bit() | BehaviorState::Sleeping.bit();
    let mut i = 0;
    while i < states.len() {
        m |= states[i].bit();
        i += 1;
    }
    m
}

const ALL_STATES: u16 = (1 << STATE_COUNT) - 1;

static STATE_TABLE: [StateSpec; STATE_COUNT] = {
    use BehaviorState::*;
    [
        StateSpec {
            state: Sleeping,
            legal_next: mask(&[MorningRoutine]),
            min_duration: 180,
            max_duration: 720,
            priority: 60,
            interruptible: false,
        },
        StateSpec {
            state: MorningRoutine,
            legal_next: mask(&[CommutingToWork, WeekendActivities, NightRoutine]),
            min_duration: 20,
            max_duration: 180,
            priority: 20,
            interruptible: true,
        },
        StateSpec {
            state: CommutingToWork,
            legal_next: mask(&[Working, CommutingHome]),
            min_duration: 5,
            max_duration: 150,
            priority: 30,
            interruptible: true,
        },
        StateSpec {
            state: Working,
            legal_next: mask(&[LunchBreak, CommutingHome]),
            min_duration: 30,
            max_duration: 720,
            priority: 40,
            interruptible: true,
        },
        StateSpec {
            state: LunchBreak,
            legal_next: mask(&[Working, CommutingHome]),
            min_duration: 20,
            max_duration: 90,
            priority: 35,
            interruptible: true,
        },
        StateSpec {
            state: CommutingHome,
            legal_next: mask(&[EveningActivities, Socializing, NightRoutine]),
            min_duration: 5,
            max_duration: 150,
            priority: 30,
            interruptible: true,
        },
        StateSpec {
            state: EveningActivities,
            legal_next: mask(&[Socializing, NightRoutine]),
            min_duration: 15,
            max_duration: 600,
            priority: 15,
            interruptible: true,
        },
        StateSpec {
            state: Socializing,
            legal_next: mask(&[EveningActivities, WeekendActivities, NightRoutine]),
            min_duration: 30,
            max_duration: 300,
            priority: 15,
            interruptible: true,
        },
        StateSpec {
            state: NightRoutine,
            legal_next: mask(&[]),
            min_duration: 15,
            max_duration: 120,
            priority: 25,
            interruptible: true,
        },
        StateSpec {
            state: WeekendActivities,
            legal_next: mask(&[Socializing, NightRoutine]),
            min_duration: 30,
            max_duration: 900,
            priority: 10,
            interruptible: true,
        },
        StateSpec {
            state: Emergency,
            legal_next: ALL_STATES,
            min_duration: 15,
            max_duration: 240,
            priority: 100,
            interruptible: false,
        },
    ]
};

/// Whether the table allows `from -> to`. Staying put is always legal.
pub fn is_legal(from: BehaviorState, to: BehaviorState) -> bool {
    from == to || from.spec().legal_next & to.bit() != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_rows_match_their_state() {
        for s in BehaviorState::ALL {
            assert_eq!(s.spec().state, s);
            assert!(s.spec().min_duration < s.spec().max_duration);
        }
    }

    #[test]
    fn test_emergency_and_sleep_reachable_from_everywhere() {
        for s in BehaviorState::ALL {
            assert!(is_legal(s, BehaviorState::Emergency), "{s} -> emergency");
            assert!(is_legal(s, BehaviorState::Sleeping), "{s} -> sleeping");
        }
    }

    #[test]
    fn test_emergency_exits_anywhere() {
        for s in BehaviorState::ALL {
            assert!(is_legal(BehaviorState::Emergency, s));
        }
    }

    #[test]
    fn test_illegal_shortcuts() {
        assert!(!is_legal(BehaviorState::Sleeping, BehaviorState::Working));
        assert!(!is_legal(BehaviorState::Working, BehaviorState::Socializing));
        assert!(!is_legal(BehaviorState::NightRoutine, BehaviorState::MorningRoutine));
    }

    #[test]
    fn test_successors_are_legal() {
        for s in BehaviorState::ALL {
            for free_day in [false, true] {
                if let Some(next) = s.successor(free_day) {
                    assert!(is_legal(s, next), "{s} -> {next}");
                }
            }
        }
    }

    #[test]
    fn test_only_sleep_and_emergency_are_uninterruptible() {
        let locked: Vec<_> = BehaviorState::ALL
            .iter()
            .filter(|s| !s.spec().interruptible)
            .copied()
            .collect();
        assert_eq!(locked, vec![BehaviorState::Sleeping, BehaviorState::Emergency]);
    }

    #[test]
    fn test_state_ids_round_trip_and_reject_unknown() {
        for s in BehaviorState::ALL {
            assert_eq!(BehaviorState::try_from(s.id()), Ok(s));
        }
        assert_eq!(BehaviorState::try_from(11), Err(UnknownState(11)));
    }
}
