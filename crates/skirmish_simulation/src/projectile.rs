//! Projectiles: each tick sweeps a ray from the previous to the next position.
//!
//! - extends its own ignore set with `targets_hit` and blocked targets (пробивающий снаряд не бьёт дважды)
//! - reflected → velocity reversed, side flipped, target classes swapped
//! - picks up a propagated element (`set_element`)
//! - stops on `stopped`, solid terrain or lifetime expiry → PendingRemoval

use bevy::prelude::*;

use crate::components::{Combatant, PendingRemoval};
use crate::geometry::HitShape;
use crate::hit::{resolve_in_world, HitDescription, HitEvents, HitTargets};
use crate::interfaces::{EffectParams, SpawnEffect, Terrain};
use crate::logger;

/// Spawn request produced by an ability.
#[derive(Debug, Clone)]
pub struct ProjectileLaunch {
    pub origin: Vec2,
    pub velocity: Vec2,
    pub lifetime_ms: f32,
    /// Template; its shape is replaced by the sweep segment every tick.
    pub hit: HitDescription,
}

#[derive(Component, Debug, Clone)]
#[require(Transform)]
pub struct Projectile {
    pub velocity: Vec2,
    pub remaining_ms: f32,
    pub hit: HitDescription,
}

impl Projectile {
    pub fn from_launch(launch: ProjectileLaunch) -> (Self, Transform) {
        (
            Self {
                velocity: launch.velocity,
                remaining_ms: launch.lifetime_ms,
                hit: launch.hit,
            },
            Transform::from_translation(launch.origin.extend(0.0)),
        )
    }

    /// Отражение: летим обратно и бьём по другой стороне.
    pub fn reflect(&mut self) {
        self.velocity = -self.velocity;
        self.hit.side = self.hit.side.flipped();
        self.hit.classes = self.hit.classes.swapped_sides();
    }
}

/// Система: advance every projectile and sweep it through the HitResolver.
pub fn advance_projectiles(
    mut commands: Commands,
    mut projectiles: Query<(Entity, &mut Projectile, &mut Transform), (Without<Combatant>, Without<PendingRemoval>)>,
    mut targets: HitTargets,
    mut events: HitEvents,
    terrain: Res<Terrain>,
    time: Res<Time<Fixed>>,
) {
    let dt = time.delta_secs();
    let dt_ms = dt * 1000.0;

    for (entity, mut projectile, mut transform) in projectiles.iter_mut() {
        let from = transform.translation.truncate();
        let to = from + projectile.velocity * dt;

        projectile.remaining_ms -= dt_ms;
        projectile.hit.shape = HitShape::segment(from, to);

        let outcome = resolve_in_world(&projectile.hit, &mut targets, &mut events);

        // Заблокированный щит тоже больше не трогаем, иначе блок на каждом сегменте
        let touched: Vec<_> = outcome
            .impacts
            .iter()
            .filter(|impact| impact.blocked)
            .map(|impact| impact.id)
            .chain(outcome.targets_hit.iter().copied())
            .collect();
        projectile.hit.ignore.extend(touched);
        if let Some(element) = outcome.set_element {
            projectile.hit.element = Some(element);
        }

        if outcome.reflected {
            // Отражатель становится новым владельцем
            if let Some(reflector) = outcome.impacts.iter().find(|impact| impact.reflected) {
                projectile.hit.source = Some(reflector.id);
                projectile.hit.ignore.insert(reflector.id);
            }
            projectile.reflect();
            continue;
        }

        if outcome.stopped {
            commands.entity(entity).insert(PendingRemoval);
            continue;
        }

        transform.translation.x = to.x;
        transform.translation.y = to.y;

        if terrain.query().is_solid_at(to) {
            logger::log(&format!("💥 Projectile {:?} hit terrain at {:?}", entity, to));
            events.effects.write(SpawnEffect {
                kind: "impact".to_string(),
                position: to,
                params: EffectParams::default(),
            });
            commands.entity(entity).insert(PendingRemoval);
            continue;
        }

        if projectile.remaining_ms <= 0.0 {
            commands.entity(entity).insert(PendingRemoval);
        }
    }
}
