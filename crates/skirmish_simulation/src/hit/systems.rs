//! Hit systems: ECS glue around `resolve`.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use super::description::HitDescription;
use super::outcome::HitOutcome;
use super::resolver::{resolve, HitCandidate};
use crate::ability::{CancelAbility, CancelReason};
use crate::components::{ActorId, Combatant, Defeated, HitBody, Motion, Vitals};
use crate::config::SimulationConfig;
use crate::interfaces::{EffectParams, SpawnEffect};
use crate::logger;
use crate::status::{Element, StatusTracker};

/// Событие: мгновенный удар (ability use, скрипт) на разрешение в этом тике.
#[derive(Event, Debug, Clone)]
pub struct HitRequest {
    pub description: HitDescription,
}

/// Событие: итог одного `resolve` (для caller-side эффектов).
#[derive(Event, Debug, Clone)]
pub struct HitResolved {
    pub source: Option<ActorId>,
    pub outcome: HitOutcome,
}

/// Событие: урон нанесён конкретной цели.
#[derive(Event, Debug, Clone)]
pub struct DamageDealt {
    pub source: Option<ActorId>,
    pub target: Entity,
    pub target_id: ActorId,
    pub damage: f32,
    pub element: Option<Element>,
}

/// Every live combatant a hit can land on.
pub type HitTargets<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static ActorId,
        &'static Transform,
        &'static HitBody,
        &'static mut Vitals,
        &'static mut StatusTracker,
        &'static mut Motion,
    ),
    (With<Combatant>, Without<Defeated>),
>;

/// Event writers every hit source needs.
#[derive(SystemParam)]
pub struct HitEvents<'w> {
    pub resolved: EventWriter<'w, HitResolved>,
    pub damage: EventWriter<'w, DamageDealt>,
    pub cancels: EventWriter<'w, CancelAbility>,
    pub effects: EventWriter<'w, SpawnEffect>,
}

/// Resolve one hit against every live combatant and apply the side effects:
/// knockback velocity, stagger cancellation, damage/effect events.
pub fn resolve_in_world(description: &HitDescription, targets: &mut HitTargets, events: &mut HitEvents) -> HitOutcome {
    let mut rows: Vec<_> = targets.iter_mut().collect();
    rows.sort_by_key(|(_, id, ..)| **id);

    let outcome = {
        let mut candidates: Vec<HitCandidate> = rows
            .iter_mut()
            .map(|(_, id, transform, body, vitals, status, _)| HitCandidate {
                id: **id,
                position: transform.translation.truncate(),
                body: *body,
                vitals: &mut **vitals,
                status: &mut **status,
            })
            .collect();
        resolve(description, &mut candidates)
    };

    for impact in &outcome.impacts {
        let Ok(index) = rows.binary_search_by_key(&impact.id, |(_, id, ..)| **id) else {
            continue;
        };
        let (entity, _, _, _, vitals, _, motion) = &mut rows[index];

        if impact.knockback != Vec3::ZERO {
            motion.velocity += impact.knockback;
            if vitals.stagger_threshold > 0.0 && impact.knockback.length() >= vitals.stagger_threshold {
                events.cancels.write(CancelAbility {
                    entity: *entity,
                    reason: CancelReason::Staggered,
                });
            }
        }

        if impact.damage > 0.0 {
            events.damage.write(DamageDealt {
                source: description.source,
                target: *entity,
                target_id: impact.id,
                damage: impact.damage,
                element: impact.element,
            });
        }

        let kind = if impact.reflected {
            logger::log(&format!("🪞 Hit from {:?} reflected by {:?}", description.source, impact.id));
            "reflect"
        } else if impact.blocked {
            logger::log(&format!("🛡️ Hit from {:?} blocked by {:?}", description.source, impact.id));
            "block"
        } else {
            "hit_spark"
        };
        events.effects.write(SpawnEffect {
            kind: kind.to_string(),
            position: impact.position,
            params: EffectParams::default(),
        });
    }

    events.resolved.write(HitResolved {
        source: description.source,
        outcome: outcome.clone(),
    });

    outcome
}

/// Система: instant hits fired by abilities this tick.
pub fn resolve_hit_requests(mut requests: EventReader<HitRequest>, mut targets: HitTargets, mut events: HitEvents) {
    for request in requests.read() {
        resolve_in_world(&request.description, &mut targets, &mut events);
    }
}

/// Система: integrate knockback velocity (XY ground friction, Z gravity).
pub fn apply_knockback_motion(
    mut bodies: Query<(&mut Transform, &mut Motion), With<Combatant>>,
    time: Res<Time<Fixed>>,
    config: Res<SimulationConfig>,
) {
    let dt = time.delta_secs();

    for (mut transform, mut motion) in bodies.iter_mut() {
        if motion.velocity == Vec3::ZERO && transform.translation.z <= 0.0 {
            continue;
        }

        transform.translation += motion.velocity * dt;

        if transform.translation.z > 0.0 {
            motion.velocity.z -= config.gravity * dt;
            continue;
        }

        // На земле: гасим вертикаль и тормозим трением
        transform.translation.z = 0.0;
        motion.velocity.z = motion.velocity.z.max(0.0);

        let damping = (1.0 - config.knockback_friction * dt).max(0.0);
        motion.velocity.x *= damping;
        motion.velocity.y *= damping;
        if motion.velocity.truncate().length_squared() < 1e-4 {
            motion.velocity.x = 0.0;
            motion.velocity.y = 0.0;
        }
    }
}
