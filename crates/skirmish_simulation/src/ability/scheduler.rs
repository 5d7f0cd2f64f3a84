//! AbilityScheduler: Idle → Preparing → Active → Recovering → Idle.
//!
//! Policy-agnostic: решает только легальность (заряды, кулдаун, отмена).
//! Какую способность пробовать: забота `AbilityController` (policy.rs).

use bevy::prelude::*;
use std::sync::Arc;

use super::commands::CombatCommands;
use super::definition::{AbilityDefinition, AbilityEnv, AbilityTarget, ActorView, CancelReason};
use super::runtime::AbilityRuntime;

// ============================================================================
// Phases & active ability
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum AbilityPhase {
    Preparing,
    /// `use_ability` has fired and `update_ability` runs every tick.
    /// Only sustained abilities stay here; one-shot ones go straight to Recovering.
    Active,
    Recovering,
}

/// The one ability an actor is executing right now.
#[derive(Debug, Clone)]
pub struct ActiveAbility {
    pub slot: usize,
    pub definition: Arc<AbilityDefinition>,
    pub phase: AbilityPhase,
    /// Время с момента триггера
    pub elapsed_ms: f32,
    /// Время с момента use (перенос остатка с тика подготовки)
    pub since_use_ms: f32,
    pub target: AbilityTarget,
    pub used: bool,
}

/// Result of one `advance` step (для логов и тестов).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseChange {
    Used,
    Recovering,
    Finished,
}

/// Why a trigger request did (not) start an ability.
///
/// Не ошибки: вызывающий просто пробует снова на следующем тике.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    /// Same as Started, but a cancelable ability was interrupted first.
    Preempted,
    UnknownSlot,
    Disabled,
    NoCharges,
    /// Something is active and may not be interrupted by this ability.
    Busy,
    NoTarget,
}

impl TriggerOutcome {
    pub fn started(self) -> bool {
        matches!(self, TriggerOutcome::Started | TriggerOutcome::Preempted)
    }
}

#[derive(Debug, Clone)]
pub struct AbilitySlot {
    pub definition: Arc<AbilityDefinition>,
    pub runtime: AbilityRuntime,
}

// ============================================================================
// Scheduler component
// ============================================================================

/// Abilities an actor can use + its (at most one) ActiveAbility.
#[derive(Component, Debug, Clone, Default)]
pub struct AbilityScheduler {
    slots: Vec<AbilitySlot>,
    active: Option<ActiveAbility>,
}

impl AbilityScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a slot with full charges.
    pub fn with_ability(mut self, definition: Arc<AbilityDefinition>) -> Self {
        self.push(definition);
        self
    }

    pub fn push(&mut self, definition: Arc<AbilityDefinition>) -> usize {
        let runtime = AbilityRuntime::full(&definition);
        self.slots.push(AbilitySlot { definition, runtime });
        self.slots.len() - 1
    }

    pub fn slots(&self) -> &[AbilitySlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&AbilitySlot> {
        self.slots.get(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut AbilitySlot> {
        self.slots.get_mut(index)
    }

    pub fn active(&self) -> Option<&ActiveAbility> {
        self.active.as_ref()
    }

    pub fn phase(&self) -> Option<AbilityPhase> {
        self.active.as_ref().map(|active| active.phase)
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Can some slot interrupt whatever is running now?
    pub fn can_preempt(&self) -> bool {
        match &self.active {
            None => true,
            Some(active) if active.definition.cannot_be_canceled => false,
            Some(_) => self.slots.iter().any(|slot| slot.definition.cancels_other_abilities),
        }
    }

    /// Cooldown arithmetic for every slot.
    pub fn tick_runtimes(&mut self, dt_ms: f32) {
        for slot in &mut self.slots {
            slot.runtime.tick(&slot.definition, dt_ms);
        }
    }

    /// Idle → Preparing, if legal.
    ///
    /// Проверки идут в порядке, при котором отказ ничего не меняет:
    /// enabled → заряды → легальность перехода → цель. Только после этого
    /// отменяем текущую способность, тратим заряд и зовём `prepare_ability`.
    pub fn try_start(
        &mut self,
        slot_index: usize,
        actor: &ActorView,
        env: &AbilityEnv,
        out: &mut CombatCommands,
    ) -> TriggerOutcome {
        let Some(slot) = self.slots.get(slot_index) else {
            return TriggerOutcome::UnknownSlot;
        };
        let definition = slot.definition.clone();

        if !definition.is_enabled(actor, env) {
            return TriggerOutcome::Disabled;
        }

        if slot.runtime.charges == 0 {
            return TriggerOutcome::NoCharges;
        }

        let preempting = match &self.active {
            None => false,
            Some(active) if definition.cancels_other_abilities && !active.definition.cannot_be_canceled => true,
            Some(_) => return TriggerOutcome::Busy,
        };

        let Some(target) = definition.behavior.get_target(actor, env) else {
            return TriggerOutcome::NoTarget;
        };

        if preempting {
            self.cancel(CancelReason::Preempted, actor, out);
        }

        let Some(slot) = self.slots.get_mut(slot_index) else {
            return TriggerOutcome::UnknownSlot;
        };
        if !slot.runtime.consume_charge(&definition) {
            return TriggerOutcome::NoCharges;
        }

        definition.behavior.prepare_ability(actor, &target, out);

        self.active = Some(ActiveAbility {
            slot: slot_index,
            definition,
            phase: AbilityPhase::Preparing,
            elapsed_ms: 0.0,
            since_use_ms: 0.0,
            target,
            used: false,
        });

        if preempting {
            TriggerOutcome::Preempted
        } else {
            TriggerOutcome::Started
        }
    }

    /// Advance the active ability by `dt_ms`. At most one transition per call.
    pub fn advance(&mut self, dt_ms: f32, actor: &ActorView, out: &mut CombatCommands) -> Option<PhaseChange> {
        let dt_ms = dt_ms.max(0.0);
        let active = self.active.as_mut()?;
        let definition = active.definition.clone();

        match active.phase {
            AbilityPhase::Preparing => {
                active.elapsed_ms += dt_ms;
                if active.elapsed_ms < definition.prep_time_ms {
                    return None;
                }

                active.used = true;
                active.since_use_ms = active.elapsed_ms - definition.prep_time_ms.max(0.0);
                definition.behavior.use_ability(actor, &active.target, out);
                // Active длится только у sustained; одноразовая сразу восстанавливается
                active.phase = if definition.behavior.is_sustained() {
                    AbilityPhase::Active
                } else {
                    AbilityPhase::Recovering
                };
                Some(PhaseChange::Used)
            }
            AbilityPhase::Active => {
                active.elapsed_ms += dt_ms;
                active.since_use_ms += dt_ms;

                if definition.behavior.is_sustained() && active.since_use_ms < definition.recover_time_ms {
                    definition
                        .behavior
                        .update_ability(actor, &active.target, active.since_use_ms, out);
                    return None;
                }

                active.phase = AbilityPhase::Recovering;
                Some(PhaseChange::Recovering)
            }
            AbilityPhase::Recovering => {
                if active.since_use_ms < definition.recover_time_ms {
                    active.elapsed_ms += dt_ms;
                    active.since_use_ms += dt_ms;
                }
                if active.since_use_ms < definition.recover_time_ms {
                    return None;
                }

                self.active = None;
                Some(PhaseChange::Finished)
            }
        }
    }

    /// Force `* → Idle`. Dropped (returns `false`) for `cannot_be_canceled`
    /// abilities or when nothing is active. Charges are not refunded.
    pub fn cancel(&mut self, reason: CancelReason, actor: &ActorView, out: &mut CombatCommands) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        if active.definition.cannot_be_canceled {
            return false;
        }

        active.definition.behavior.on_cancel(actor, reason, out);
        self.active = None;
        true
    }
}
