//! Big Five personality traits on a 0–100 scale.
//!
//! Traits are rolled once at creation inside `[TRAIT_MIN, TRAIT_MAX]` and
//! never change afterwards. They scale need decay, stress response, schedule
//! flexibility and activity preference.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lowest trait value a newly created citizen can roll.
pub const TRAIT_MIN: u8 = 20;
/// Highest trait value a newly created citizen can roll.
pub const TRAIT_MAX: u8 = 80;

/// Index into [`Personality::traits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Trait {
    Extroversion = 0,
    Conscientiousness = 1,
    Agreeableness = 2,
    Neuroticism = 3,
    Openness = 4,
}

impl Trait {
    pub const ALL: [Trait; 5] = [
        Trait::Extroversion,
        Trait::Conscientiousness,
        Trait::Agreeableness,
        Trait::Neuroticism,
        Trait::Openness,
    ];
}

/// Five trait values, each 0–100 (50 = average).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    pub traits: [u8; 5],
}

impl Default for Personality {
    fn default() -> Self {
        Self { traits: [50; 5] }
    }
}

impl Personality {
    /// Build from explicit values, clamped to 0–100.
    pub fn new(traits: [u8; 5]) -> Self {
        Self {
            traits: traits.map(|t| t.min(100)),
        }
    }

    /// Roll every trait uniformly in `[TRAIT_MIN, TRAIT_MAX]`.
    pub fn random(rng: &mut impl Rng) -> Self {
        let mut traits = [0u8; 5];
        for t in traits.iter_mut() {
            *t = rng.gen_range(TRAIT_MIN..=TRAIT_MAX);
        }
        Self { traits }
    }

    /// Every trait is on the 0–100 scale.
    pub fn in_range(&self) -> bool {
        self.traits.iter().all(|t| *t <= 100)
    }

    pub fn get(&self, t: Trait) -> u8 {
        self.traits[t as usize]
    }

    /// Trait as a 0.0–1.0 factor.
    pub fn factor(&self, t: Trait) -> f32 {
        self.get(t) as f32 / 100.0
    }

    /// Signed deviation from average, -1.0..=1.0.
    pub fn deviation(&self, t: Trait) -> f32 {
        (self.get(t) as f32 - 50.0) / 50.0
    }

    /// Multiplier on social need decay: extroverts get lonely faster.
    pub fn social_decay_multiplier(&self) -> f32 {
        0.5 + self.factor(Trait::Extroversion)
    }

    /// Multiplier on stress gain: neurotic citizens stress faster.
    pub fn stress_multiplier(&self) -> f32 {
        0.5 + self.factor(Trait::Neuroticism)
    }

    /// How loosely a citizen follows their schedule template, 0.0–1.0.
    pub fn routine_flexibility(&self) -> f32 {
        1.0 - self.factor(Trait::Conscientiousness)
    }

    /// Personality fit between two citizens, -1.0..=1.0.
    ///
    /// Agreeable pairs get along; similar openness and extroversion help.
    pub fn compatibility(&self, other: &Personality) -> f32 {
        let agreeable = (self.deviation(Trait::Agreeableness)
            + other.deviation(Trait::Agreeableness))
            / 2.0;
        let openness_gap =
            (self.factor(Trait::Openness) - other.factor(Trait::Openness)).abs();
        let extro_gap =
            (self.factor(Trait::Extroversion) - other.factor(Trait::Extroversion)).abs();
        (agreeable * 0.5 + (1.0 - openness_gap - extro_gap) * 0.5).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_traits_stay_in_creation_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..500 {
            let p = Personality::random(&mut rng);
            for t in p.traits {
                assert!((TRAIT_MIN..=TRAIT_MAX).contains(&t));
            }
        }
    }

    #[test]
    fn test_social_multiplier_follows_extroversion() {
        let shy = Personality::new([20, 50, 50, 50, 50]);
        let outgoing = Personality::new([80, 50, 50, 50, 50]);
        assert!(outgoing.social_decay_multiplier() > shy.social_decay_multiplier());
        assert!((shy.social_decay_multiplier() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_compatibility_prefers_agreeable_lookalikes() {
        let a = Personality::new([60, 50, 80, 40, 60]);
        let b = Personality::new([60, 50, 75, 40, 60]);
        let c = Personality::new([20, 50, 20, 40, 100]);
        assert!(a.compatibility(&b) > a.compatibility(&c));
        assert!(a.compatibility(&c) >= -1.0);
    }

    #[test]
    fn test_new_clamps_to_scale() {
        let p = Personality::new([200, 0, 100, 101, 50]);
        assert_eq!(p.traits, [100, 0, 100, 100, 50]);
    }
}
