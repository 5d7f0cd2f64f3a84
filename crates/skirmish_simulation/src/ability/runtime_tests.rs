//! Tests for AbilityRuntime charge/cooldown arithmetic.

#[cfg(test)]
mod tests {
    use super::super::commands::CombatCommands;
    use super::super::definition::*;
    use super::super::runtime::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    struct Inert;

    impl AbilityBehavior for Inert {
        fn get_target(&self, _actor: &ActorView, _env: &AbilityEnv) -> Option<AbilityTarget> {
            None
        }

        fn use_ability(&self, _actor: &ActorView, _target: &AbilityTarget, _out: &mut CombatCommands) {}
    }

    fn definition(charges_max: u32, recovered: u32, cooldown_ms: f32) -> AbilityDefinition {
        AbilityDefinition::new("test", Inert)
            .with_charges(charges_max, recovered)
            .with_cooldown(cooldown_ms)
    }

    #[test]
    fn test_cooldown_only_runs_after_consumption() {
        let def = definition(3, 1, 2000.0);
        let mut runtime = AbilityRuntime::with_charges(1);

        // Таймер не запущен: 2000ms ничего не дают
        runtime.tick(&def, 2000.0);
        assert_eq!(runtime.charges, 1);

        assert!(runtime.consume_charge(&def));
        assert_eq!(runtime.charges, 0);
        runtime.tick(&def, 2000.0);
        assert_eq!(runtime.charges, 1);
    }

    #[test]
    fn test_empty_consume_is_rejected_without_mutation() {
        let def = definition(1, 1, 1000.0);
        let mut runtime = AbilityRuntime::full(&def);

        assert!(runtime.consume_charge(&def));
        let before = runtime;
        assert!(!runtime.consume_charge(&def));
        assert_eq!(runtime, before);
    }

    #[test]
    fn test_cooldown_rearms_until_full() {
        let def = definition(2, 1, 1000.0);
        let mut runtime = AbilityRuntime::full(&def);
        runtime.consume_charge(&def);
        runtime.consume_charge(&def);
        assert_eq!(runtime.charges, 0);

        runtime.tick(&def, 1000.0);
        assert_eq!(runtime.charges, 1);
        assert!(runtime.is_recharging());

        runtime.tick(&def, 1000.0);
        assert_eq!(runtime.charges, 2);
        assert!(!runtime.is_recharging());
    }

    #[test]
    fn test_overshoot_carries_into_next_cooldown() {
        let def = definition(3, 1, 1000.0);
        let mut runtime = AbilityRuntime::with_charges(1);
        runtime.consume_charge(&def);

        runtime.tick(&def, 1500.0);
        assert_eq!(runtime.charges, 1);
        assert_eq!(runtime.cooldown_remaining_ms, 500.0);

        runtime.tick(&def, 500.0);
        assert_eq!(runtime.charges, 2);
    }

    #[test]
    fn test_long_tick_is_capped_at_max() {
        let def = definition(3, 2, 1000.0);
        let mut runtime = AbilityRuntime::full(&def);
        for _ in 0..3 {
            runtime.consume_charge(&def);
        }

        runtime.tick(&def, 5000.0);
        assert_eq!(runtime.charges, 3);
        assert_eq!(runtime.cooldown_remaining_ms, 0.0);
    }

    #[test]
    fn test_zero_cooldown_refills_immediately() {
        let def = definition(1, 1, 0.0);
        let mut runtime = AbilityRuntime::full(&def);

        assert!(runtime.consume_charge(&def));
        assert_eq!(runtime.charges, 1);
        assert!(!runtime.is_recharging());
    }

    #[test]
    fn test_charges_stay_within_bounds_for_random_sequences() {
        let def = definition(4, 3, 700.0);
        let mut runtime = AbilityRuntime::full(&def);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..5000 {
            if rng.gen_bool(0.4) {
                runtime.consume_charge(&def);
            } else {
                runtime.tick(&def, rng.gen_range(0.0..2500.0));
            }
            assert!(runtime.charges <= def.charges_max);
            assert!(runtime.cooldown_remaining_ms >= 0.0);
        }
    }
}
