//! Ability systems: cancellations → cooldowns → selection → phases → commands.

use bevy::prelude::*;

use super::commands::{CombatCommand, CombatCommands, PendingCombatCommands};
use super::definition::{AbilityEnv, AbilityId, ActorView, CancelReason};
use super::policy::AbilityController;
use super::scheduler::{AbilityPhase, AbilityScheduler, PhaseChange};
use crate::boss::BossState;
use crate::components::{ActorId, Combatant, Defeated, HitBody, Side, Vitals};
use crate::hazard::Hazard;
use crate::hit::HitRequest;
use crate::interfaces::{PlaySound, ScriptLine, SpawnEffect, StoryFlags, Terrain};
use crate::logger;
use crate::projectile::Projectile;
use crate::status::StatusTracker;
use crate::targeting::{sorted_candidates, TargetCandidate};
use crate::DeterministicRng;

/// Событие: запрос на прерывание активной способности (stagger, defeat).
#[derive(Event, Debug, Clone, Copy)]
pub struct CancelAbility {
    pub entity: Entity,
    pub reason: CancelReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    Used,
    Recovering,
    Finished,
    Canceled(CancelReason),
}

/// Событие: смена фазы способности (для анимаций/UI коллабораторов).
#[derive(Event, Debug, Clone)]
pub struct AbilityTransition {
    pub entity: Entity,
    pub actor: ActorId,
    pub ability: AbilityId,
    pub transition: Transition,
}

fn actor_view(
    entity: Entity,
    id: &ActorId,
    transform: &Transform,
    side: &Side,
    vitals: &Vitals,
    boss: Option<&BossState>,
) -> ActorView {
    ActorView {
        entity,
        id: *id,
        position: transform.translation.truncate(),
        side: *side,
        life: vitals.life,
        max_life: vitals.max_life,
        enraged: boss.is_some_and(|boss| boss.enraged),
    }
}

/// Система: apply queued cancellation requests.
///
/// Запросы от stagger/defeat прошлого тика применяются до любой проверки
/// состояния в этом тике. `cannot_be_canceled` → запрос отбрасывается.
pub fn process_cancel_requests(
    mut requests: EventReader<CancelAbility>,
    mut casters: Query<(&ActorId, &Transform, &Side, &Vitals, Option<&BossState>, &mut AbilityScheduler)>,
    mut pending: ResMut<PendingCombatCommands>,
    mut transitions: EventWriter<AbilityTransition>,
) {
    for request in requests.read() {
        let Ok((id, transform, side, vitals, boss, mut scheduler)) = casters.get_mut(request.entity) else {
            continue;
        };
        let Some(ability) = scheduler.active().map(|active| active.definition.id.clone()) else {
            continue;
        };

        let view = actor_view(request.entity, id, transform, side, vitals, boss);
        let mut out = CombatCommands::default();

        if scheduler.cancel(request.reason, &view, &mut out) {
            logger::log(&format!("⛔ {:?} '{}' canceled ({:?})", id, ability, request.reason));
            transitions.write(AbilityTransition {
                entity: request.entity,
                actor: *id,
                ability,
                transition: Transition::Canceled(request.reason),
            });
            pending.extend(request.entity, out);
        } else {
            logger::log(&format!(
                "{:?} '{}' cannot be canceled, {:?} request dropped",
                id, ability, request.reason
            ));
        }
    }
}

/// Система: charge/cooldown arithmetic for every ability slot.
pub fn tick_ability_runtimes(mut schedulers: Query<&mut AbilityScheduler>, time: Res<Time<Fixed>>) {
    let dt_ms = time.delta_secs() * 1000.0;

    for mut scheduler in schedulers.iter_mut() {
        scheduler.tick_runtimes(dt_ms);
    }
}

/// Система: controller step (TargetResolver + SelectionPolicy → try_start).
///
/// Акторы обходятся по ActorId, чтобы розыгрыши RNG шли в одном порядке.
pub fn select_abilities(
    mut casters: Query<
        (
            Entity,
            &ActorId,
            &Transform,
            &Side,
            &Vitals,
            Option<&BossState>,
            &mut AbilityScheduler,
            &mut AbilityController,
        ),
        Without<Defeated>,
    >,
    bodies: Query<(&ActorId, &Transform, &HitBody, &Vitals, Has<Defeated>), With<Combatant>>,
    terrain: Res<Terrain>,
    flags: Res<StoryFlags>,
    mut rng: ResMut<DeterministicRng>,
    mut pending: ResMut<PendingCombatCommands>,
    mut transitions: EventWriter<AbilityTransition>,
) {
    let candidates: Vec<TargetCandidate> =
        sorted_candidates(bodies.iter().map(|(id, transform, body, vitals, defeated)| TargetCandidate {
            id: *id,
            position: transform.translation.truncate(),
            class: body.class,
            alive: !defeated && !vitals.is_defeated(),
        }));
    let env = AbilityEnv {
        candidates: &candidates,
        terrain: terrain.query(),
        flags: &flags,
    };

    let mut rows: Vec<_> = casters.iter_mut().collect();
    rows.sort_by_key(|(_, id, ..)| **id);

    for (entity, id, transform, side, vitals, boss, scheduler, controller) in rows.iter_mut() {
        if scheduler.slots().is_empty() || !scheduler.can_preempt() {
            continue;
        }

        let view = actor_view(*entity, id, transform, side, vitals, *boss);
        let active_slot = scheduler.active().map(|active| active.slot);

        let mut order = controller.candidate_order(scheduler.slots().len(), &mut rng.rng);
        if let Some(active_slot) = active_slot {
            // Занят: пробуем только то, что может прервать текущую (и не саму себя)
            order.retain(|slot| {
                *slot != active_slot
                    && scheduler
                        .slot(*slot)
                        .is_some_and(|candidate| candidate.definition.cancels_other_abilities)
            });
        }

        let mut out = CombatCommands::default();
        for slot in order {
            let outcome = scheduler.try_start(slot, &view, &env, &mut out);
            if !outcome.started() {
                continue;
            }

            controller.on_started(slot);
            let ability = scheduler
                .active()
                .map(|active| active.definition.id.clone())
                .unwrap_or_else(|| AbilityId::new("?"));
            logger::log(&format!("⚔️ {:?} starts '{}' ({:?})", id, ability, outcome));
            transitions.write(AbilityTransition {
                entity: *entity,
                actor: **id,
                ability,
                transition: Transition::Started,
            });
            break;
        }
        pending.extend(*entity, out);
    }
}

/// Система: Preparing → Active → Recovering → Idle.
pub fn advance_ability_phases(
    mut casters: Query<(Entity, &ActorId, &Transform, &Side, &Vitals, Option<&BossState>, &mut AbilityScheduler)>,
    time: Res<Time<Fixed>>,
    mut pending: ResMut<PendingCombatCommands>,
    mut transitions: EventWriter<AbilityTransition>,
) {
    let dt_ms = time.delta_secs() * 1000.0;

    let mut rows: Vec<_> = casters.iter_mut().collect();
    rows.sort_by_key(|(_, id, ..)| **id);

    for (entity, id, transform, side, vitals, boss, scheduler) in rows.iter_mut() {
        let Some(ability) = scheduler.active().map(|active| active.definition.id.clone()) else {
            continue;
        };

        let view = actor_view(*entity, id, transform, side, vitals, *boss);
        let mut out = CombatCommands::default();
        let change = scheduler.advance(dt_ms, &view, &mut out);
        pending.extend(*entity, out);

        let Some(change) = change else {
            continue;
        };
        let emitted: &[Transition] = match change {
            PhaseChange::Used => {
                logger::log(&format!("💥 {:?} uses '{}'", id, ability));
                if scheduler.phase() == Some(AbilityPhase::Recovering) {
                    &[Transition::Used, Transition::Recovering]
                } else {
                    &[Transition::Used]
                }
            }
            PhaseChange::Recovering => &[Transition::Recovering],
            PhaseChange::Finished => &[Transition::Finished],
        };
        for transition in emitted {
            transitions.write(AbilityTransition {
                entity: *entity,
                actor: **id,
                ability: ability.clone(),
                transition: *transition,
            });
        }
    }
}

/// Система: turn hook output into world changes.
///
/// - Hit → HitRequest (разрешается в CombatSet::Hits этого же тика)
/// - Projectile / Hazard → spawn
/// - Ward → invulnerability + shield на кастера
/// - Effect / Sound / Line / SetFlag → коллабораторы
pub fn apply_combat_commands(
    mut commands: Commands,
    mut pending: ResMut<PendingCombatCommands>,
    mut statuses: Query<&mut StatusTracker>,
    mut flags: ResMut<StoryFlags>,
    mut hits: EventWriter<HitRequest>,
    mut effects: EventWriter<SpawnEffect>,
    mut sounds: EventWriter<PlaySound>,
    mut lines: EventWriter<ScriptLine>,
) {
    for (caster, command) in pending.drain() {
        match command {
            CombatCommand::Hit(description) => {
                hits.write(HitRequest { description });
            }
            CombatCommand::Projectile(launch) => {
                commands.spawn(Projectile::from_launch(launch));
            }
            CombatCommand::Hazard(spawn) => {
                commands.spawn(Hazard::from_spawn(spawn));
            }
            CombatCommand::Ward {
                invulnerability_frames,
                shield,
            } => {
                if let Ok(mut status) = statuses.get_mut(caster) {
                    status.grant_invulnerability(invulnerability_frames);
                    status.shield.restore(shield);
                }
            }
            CombatCommand::Effect(effect) => {
                effects.write(effect);
            }
            CombatCommand::Sound(sound) => {
                sounds.write(sound);
            }
            CombatCommand::Line(line) => {
                lines.write(line);
            }
            CombatCommand::SetFlag(key) => {
                flags.set_flag(key);
            }
        }
    }
}
