//! Bounded relationship lists, relationship decay, and interaction rules.
//!
//! Each citizen keeps at most [`MAX_RELATIONSHIPS`] relationships inline,
//! keyed by the other citizen's raw id. Strength runs 0–100. Relationships
//! weaken one step per update once they have gone a day without contact;
//! non-family ties that fade to zero are dropped, family ties are kept.

use serde::{Deserialize, Serialize};

use crate::personality::Personality;

/// Relationship slots per citizen.
pub const MAX_RELATIONSHIPS: usize = 8;

/// Strength at which an acquaintance becomes a friend.
pub const FRIEND_THRESHOLD: f32 = 60.0;

/// Strength a brand-new relationship starts at.
pub const INITIAL_STRENGTH: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// No tie. Never held in a slot; meeting a stranger makes an
    /// acquaintance.
    Stranger,
    Acquaintance,
    Neighbor,
    Colleague,
    Friend,
    Family,
}

impl RelationshipKind {
    /// Acquaintances grow into friends; other kinds are fixed.
    pub fn promoted(self, strength: f32) -> Self {
        match self {
            RelationshipKind::Acquaintance | RelationshipKind::Stranger
                if strength > FRIEND_THRESHOLD =>
            {
                RelationshipKind::Friend
            }
            RelationshipKind::Stranger => RelationshipKind::Acquaintance,
            k => k,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSlot {
    /// Raw id of the other citizen.
    pub other: u64,
    pub kind: RelationshipKind,
    pub strength: f32,
    /// Simulation minute of the last interaction.
    pub last_interaction: f64,
}

impl RelationshipSlot {
    const EMPTY: RelationshipSlot = RelationshipSlot {
        other: 0,
        kind: RelationshipKind::Acquaintance,
        strength: 0.0,
        last_interaction: 0.0,
    };
}

/// Counts per relationship kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipCounts {
    pub family: u8,
    pub friends: u8,
    pub colleagues: u8,
    pub neighbors: u8,
    pub acquaintances: u8,
}

/// Result of [`Relationships::insert`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    /// Already present; the stronger of the two strengths was kept.
    Updated,
    /// The weakest non-family slot was evicted to make room.
    Replaced { evicted: u64 },
    /// No slot was weak enough to give up.
    Rejected,
}

/// Decay rule applied on every citizen update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayRule {
    /// Minutes without contact before decay starts.
    pub threshold_minutes: f64,
    /// Strength lost per update once past the threshold.
    pub step: f32,
}

impl Default for DecayRule {
    fn default() -> Self {
        Self {
            threshold_minutes: 1440.0,
            step: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecayReport {
    pub decayed: u8,
    pub released: u8,
}

/// Fixed-capacity relationship list, stored inline in the citizen record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    slots: [RelationshipSlot; MAX_RELATIONSHIPS],
    len: u8,
}

impl Default for Relationships {
    fn default() -> Self {
        Self {
            slots: [RelationshipSlot::EMPTY; MAX_RELATIONSHIPS],
            len: 0,
        }
    }
}

impl Relationships {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == MAX_RELATIONSHIPS
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationshipSlot> {
        self.slots[..self.len()].iter()
    }

    fn position(&self, other: u64) -> Option<usize> {
        self.slots[..self.len()].iter().position(|s| s.other == other)
    }

    pub fn get(&self, other: u64) -> Option<&RelationshipSlot> {
        self.position(other).map(|i| &self.slots[i])
    }

    /// How this citizen knows `other`; [`RelationshipKind::Stranger`] when
    /// not at all.
    pub fn kind_of(&self, other: u64) -> RelationshipKind {
        self.get(other).map_or(RelationshipKind::Stranger, |s| s.kind)
    }

    pub fn strength_with(&self, other: u64) -> Option<f32> {
        self.get(other).map(|s| s.strength)
    }

    /// Add a relationship, or strengthen an existing one.
    ///
    /// When full, the weakest non-family slot is replaced only if it is
    /// weaker than the newcomer.
    pub fn insert(&mut self, slot: RelationshipSlot) -> InsertOutcome {
        let slot = RelationshipSlot {
            strength: slot.strength.clamp(0.0, 100.0),
            kind: match slot.kind {
                RelationshipKind::Stranger => RelationshipKind::Acquaintance,
                k => k,
            },
            ..slot
        };
        if let Some(i) = self.position(slot.other) {
            let existing = &mut self.slots[i];
            existing.strength = existing.strength.max(slot.strength);
            existing.last_interaction = existing.last_interaction.max(slot.last_interaction);
            if slot.kind == RelationshipKind::Family {
                existing.kind = RelationshipKind::Family;
            }
            return InsertOutcome::Updated;
        }
        if !self.is_full() {
            self.slots[self.len()] = slot;
            self.len += 1;
            return InsertOutcome::Inserted;
        }
        let weakest = self.slots[..self.len()]
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind != RelationshipKind::Family)
            .min_by(|a, b| a.1.strength.total_cmp(&b.1.strength))
            .map(|(i, s)| (i, s.strength, s.other));
        match weakest {
            Some((i, strength, evicted)) if strength < slot.strength => {
                self.slots[i] = slot;
                InsertOutcome::Replaced { evicted }
            }
            _ => InsertOutcome::Rejected,
        }
    }

    /// Remove the relationship with `other`. Order of the rest is not kept.
    pub fn remove(&mut self, other: u64) -> Option<RelationshipSlot> {
        let i = self.position(other)?;
        let last = self.len() - 1;
        self.slots.swap(i, last);
        self.len -= 1;
        let removed = self.slots[last];
        self.slots[last] = RelationshipSlot::EMPTY;
        Some(removed)
    }

    /// Record an interaction with `other` at `now`, adding `delta` strength.
    /// An unknown partner is inserted with `default_kind`.
    pub fn record_interaction(
        &mut self,
        other: u64,
        now: f64,
        delta: f32,
        default_kind: RelationshipKind,
    ) -> InsertOutcome {
        if let Some(i) = self.position(other) {
            let s = &mut self.slots[i];
            s.strength = (s.strength + delta).clamp(0.0, 100.0);
            s.last_interaction = now;
            s.kind = s.kind.promoted(s.strength);
            return InsertOutcome::Updated;
        }
        let strength = (INITIAL_STRENGTH + delta).clamp(0.0, 100.0);
        self.insert(RelationshipSlot {
            other,
            kind: default_kind.promoted(strength),
            strength,
            last_interaction: now,
        })
    }

    /// Weaken every relationship idle for longer than the threshold by one
    /// step. Non-family relationships that reach zero are released.
    pub fn decay(&mut self, now: f64, rule: &DecayRule) -> DecayReport {
        let mut report = DecayReport::default();
        let mut i = 0;
        while i < self.len() {
            let s = &mut self.slots[i];
            if now - s.last_interaction > rule.threshold_minutes && s.strength > 0.0 {
                s.strength = (s.strength - rule.step).max(0.0);
                report.decayed += 1;
            }
            if s.strength <= 0.0 && s.kind != RelationshipKind::Family {
                let other = s.other;
                self.remove(other);
                report.released += 1;
                continue;
            }
            i += 1;
        }
        report
    }

    pub fn counts(&self) -> RelationshipCounts {
        let mut c = RelationshipCounts::default();
        for s in self.iter() {
            match s.kind {
                RelationshipKind::Family => c.family += 1,
                RelationshipKind::Friend => c.friends += 1,
                RelationshipKind::Colleague => c.colleagues += 1,
                RelationshipKind::Neighbor => c.neighbors += 1,
                RelationshipKind::Acquaintance | RelationshipKind::Stranger => {
                    c.acquaintances += 1
                }
            }
        }
        c
    }

    /// Strengths are in range and the live prefix holds no duplicates.
    pub fn is_consistent(&self) -> bool {
        if self.len() > MAX_RELATIONSHIPS {
            return false;
        }
        let live = &self.slots[..self.len()];
        live.iter().enumerate().all(|(i, s)| {
            s.kind != RelationshipKind::Stranger
                && s.strength.is_finite()
                && (0.0..=100.0).contains(&s.strength)
                && s.last_interaction.is_finite()
                && live[..i].iter().all(|o| o.other != s.other)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    SmallTalk,
    SharedMeal,
    SharedActivity,
    DeepConversation,
}

impl InteractionKind {
    pub fn duration_minutes(self) -> f32 {
        match self {
            InteractionKind::SmallTalk => 15.0,
            InteractionKind::SharedMeal => 45.0,
            InteractionKind::SharedActivity => 60.0,
            InteractionKind::DeepConversation => 90.0,
        }
    }

    /// Social need restored to each participant.
    pub fn satisfaction(self) -> f32 {
        match self {
            InteractionKind::SmallTalk => 8.0,
            InteractionKind::SharedMeal => 15.0,
            InteractionKind::SharedActivity => 18.0,
            InteractionKind::DeepConversation => 25.0,
        }
    }

    /// Relationship strength gained at full compatibility.
    pub fn bond(self) -> f32 {
        match self {
            InteractionKind::SmallTalk => 2.0,
            InteractionKind::SharedMeal => 4.0,
            InteractionKind::SharedActivity => 5.0,
            InteractionKind::DeepConversation => 8.0,
        }
    }
}

/// Pick an interaction for two citizens. Closer ties talk longer.
pub fn choose_interaction(existing_strength: Option<f32>, lunch_time: bool) -> InteractionKind {
    match existing_strength {
        _ if lunch_time => InteractionKind::SharedMeal,
        Some(s) if s > FRIEND_THRESHOLD => InteractionKind::DeepConversation,
        Some(s) if s > 25.0 => InteractionKind::SharedActivity,
        _ => InteractionKind::SmallTalk,
    }
}

/// Strength change from one interaction, scaled by compatibility.
/// Poorly matched pairs can drift apart.
pub fn bond_delta(kind: InteractionKind, a: &Personality, b: &Personality) -> f32 {
    kind.bond() * a.compatibility(b)
}
