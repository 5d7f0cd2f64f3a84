//! Defeat & removal: mark for removal, sweep at end of tick.
//!
//! HitResolver только уменьшает жизнь. Здесь life ≤ 0 превращается в
//! `Defeated` (актор остаётся в мире, контроллер решает что дальше) или
//! в `PendingRemoval` для разрушенных объектов и тайлов.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::ability::{CancelAbility, CancelReason};
use crate::components::{ActorId, Combatant, Defeated, HitBody, PendingRemoval, TargetClass, Vitals};
use crate::hit::DamageDealt;
use crate::logger;
use crate::CombatSet;

/// Событие: участник боя побеждён (или объект разрушен) в этом тике.
#[derive(Event, Debug, Clone, Copy)]
pub struct ActorDefeated {
    pub entity: Entity,
    pub actor: ActorId,
    pub class: TargetClass,
    /// Источник последнего урона в этом тике (None = неизвестно).
    pub killer: Option<ActorId>,
}

/// Система: life ≤ 0 → Defeated + defeat cancellation (+ PendingRemoval for objects/tiles).
pub fn detect_defeats(
    mut commands: Commands,
    actors: Query<(Entity, &ActorId, &HitBody, &Vitals), (With<Combatant>, Without<Defeated>)>,
    mut damage_events: EventReader<DamageDealt>,
    mut cancels: EventWriter<CancelAbility>,
    mut defeated_events: EventWriter<ActorDefeated>,
) {
    // Последний источник урона по каждой цели за тик
    let mut last_source: HashMap<Entity, Option<ActorId>> = HashMap::new();
    for event in damage_events.read() {
        last_source.insert(event.target, event.source);
    }

    let mut rows: Vec<_> = actors.iter().filter(|(.., vitals)| vitals.is_defeated()).collect();
    rows.sort_by_key(|(_, id, ..)| **id);

    for (entity, id, body, _) in rows {
        let killer = last_source.get(&entity).copied().flatten();
        let mut entity_commands = commands.entity(entity);
        entity_commands.insert(Defeated);

        if body.class.is_actor() {
            cancels.write(CancelAbility {
                entity,
                reason: CancelReason::Defeated,
            });
            logger::log_info(&format!("💀 {:?} defeated (by {:?})", id, killer));
        } else {
            entity_commands.insert(PendingRemoval);
            logger::log(&format!("{:?} {:?} destroyed", body.class, id));
        }

        defeated_events.write(ActorDefeated {
            entity,
            actor: *id,
            class: body.class,
            killer,
        });
    }
}

/// Система: despawn everything marked this tick.
pub fn sweep_pending_removals(mut commands: Commands, marked: Query<Entity, With<PendingRemoval>>) {
    for entity in marked.iter() {
        commands.entity(entity).despawn();
    }
}

/// Lifecycle Plugin
///
/// Последний шаг тика (CombatSet::Lifecycle): detect_defeats → sweep_pending_removals.
pub struct LifecyclePlugin;

impl Plugin for LifecyclePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ActorDefeated>().add_systems(
            FixedUpdate,
            (detect_defeats, sweep_pending_removals)
                .chain()
                .in_set(CombatSet::Lifecycle),
        );
    }
}
