use civsim_core::prelude::*;
use civsim_logic::batch::sweep_ticks;
use civsim_logic::needs::{decay_needs, NeedLevels, NeedsTuning, NEED_COUNT};
use civsim_logic::personality::Personality;
use civsim_logic::social::{DecayRule, RelationshipKind, RelationshipSlot, Relationships};
use proptest::prelude::*;

fn occupation() -> impl Strategy<Value = Occupation> {
    (0..Occupation::ALL.len()).prop_map(|i| Occupation::ALL[i])
}

fn engine(seed: u64, batch_size: usize) -> CitizenEngine {
    CitizenEngine::new(EngineConfig {
        capacity: 512,
        batch_size,
        seed,
        ..EngineConfig::default()
    })
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_needs_and_vitals_stay_in_range(
        seed in any::<u64>(),
        people in prop::collection::vec((0u8..100, occupation()), 1..24),
        steps in prop::collection::vec(1.0f64..600.0, 1..60),
    ) {
        let mut engine = engine(seed, 8);
        for (i, (age, occ)) in people.iter().enumerate() {
            engine.create_citizen(Location::new(i as f32, 0.0), *age, *occ).unwrap();
        }
        let mut now = 0.0;
        for step in steps {
            now += step;
            engine.advance_to(now).unwrap();
        }
        let ids: Vec<_> = engine.citizen_ids().collect();
        for id in ids {
            let c = engine.citizen(id).unwrap();
            prop_assert!(c.needs.in_range(), "{:?}", c.needs);
            prop_assert!((0.0..=100.0).contains(&c.vitals.stress));
            prop_assert!((0.0..=100.0).contains(&c.vitals.health));
            prop_assert!(BehaviorState::try_from(c.state.id()).is_ok());
            prop_assert!(c.relationships.len() <= 8);
            prop_assert!(c.schedule.is_valid());
        }
    }

    #[test]
    fn test_sweep_reaches_everyone(n in 1usize..60, batch in 1usize..20) {
        let mut engine = engine(1, batch);
        for _ in 0..n {
            engine.create_citizen(Location::default(), 30, Occupation::Office).unwrap();
        }
        for tick in 1..=sweep_ticks(n, batch) {
            engine.advance_to(tick as f64).unwrap();
        }
        let ids: Vec<_> = engine.citizen_ids().collect();
        for id in ids {
            prop_assert!(engine.citizen(id).unwrap().last_update > 0.0);
        }
    }

    #[test]
    fn test_zero_elapsed_decay_is_identity(levels in prop::array::uniform10(0.0f32..=100.0)) {
        let before = NeedLevels { levels };
        let mut needs = before;
        decay_needs(
            &mut needs,
            BehaviorState::Working,
            &Personality::default(),
            0.0,
            &NeedsTuning::default(),
        );
        prop_assert_eq!(needs, before);
        prop_assert_eq!(needs.levels.len(), NEED_COUNT);
    }

    #[test]
    fn test_relationship_strength_never_negative(
        start in 0.0f32..100.0,
        updates in 1usize..200,
        step in 0.1f32..10.0,
    ) {
        let mut rel = Relationships::default();
        rel.insert(RelationshipSlot {
            other: 1,
            kind: RelationshipKind::Family,
            strength: start,
            last_interaction: 0.0,
        });
        let rule = DecayRule { threshold_minutes: 10.0, step };
        for i in 0..updates {
            rel.decay(100.0 + i as f64, &rule);
        }
        let strength = rel.strength_with(1).unwrap();
        prop_assert!(strength >= 0.0);
        prop_assert!(strength <= start);
    }
}
