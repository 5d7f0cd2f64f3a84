//! Ability module: definitions, charges/cooldowns, phase scheduling.
//!
//! ECS ответственность:
//! - AbilityRuntime: заряды и кулдауны (per actor per ability)
//! - AbilityScheduler: одна активная способность, фазы, отмена
//! - AbilityController: политика выбора (priority / round-robin / weighted)
//! - Catalog: декларативные способности из RON
//!
//! Хуки способностей пишут в CombatCommands, мир меняет только
//! `apply_combat_commands`.

use bevy::prelude::*;

pub mod catalog;
pub mod commands;
pub mod definition;
pub mod policy;
pub mod runtime;
pub mod scheduler;
pub mod systems;

#[cfg(test)]
mod runtime_tests;

pub use catalog::{AbilityData, AbilityTable, DataDrivenBehavior, EffectSpec, Gate, HitFlags};
pub use commands::{CombatCommand, CombatCommands, PendingCombatCommands};
pub use definition::{
    AbilityBehavior, AbilityDefinition, AbilityEnv, AbilityId, AbilityTarget, ActorView, CancelReason,
};
pub use policy::{AbilityController, SelectionPolicy};
pub use runtime::AbilityRuntime;
pub use scheduler::{AbilityPhase, AbilityScheduler, AbilitySlot, ActiveAbility, PhaseChange, TriggerOutcome};
pub use systems::{
    advance_ability_phases, apply_combat_commands, process_cancel_requests, select_abilities,
    tick_ability_runtimes, AbilityTransition, CancelAbility, Transition,
};

use crate::CombatSet;

/// Ability Plugin
///
/// Порядок выполнения (CombatSet::Abilities):
/// 1. process_cancel_requests: stagger/defeat с прошлого тика
/// 2. tick_ability_runtimes: кулдауны и заряды
/// 3. select_abilities: контроллер выбирает и триггерит способность
/// 4. advance_ability_phases: Preparing → Active → Recovering → Idle
/// 5. apply_combat_commands: удары, снаряды, зоны, баффы, события
pub struct AbilityPlugin;

impl Plugin for AbilityPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingCombatCommands>()
            .add_event::<CancelAbility>()
            .add_event::<AbilityTransition>();

        app.add_systems(
            FixedUpdate,
            (
                process_cancel_requests,
                tick_ability_runtimes,
                select_abilities,
                advance_ability_phases,
                apply_combat_commands,
            )
                .chain()
                .in_set(CombatSet::Abilities),
        );
    }
}
