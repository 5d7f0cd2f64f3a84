//! Persistent hazards (огненная лужа, ядовитое облако).
//!
//! Resolved once per hazard per tick. Targets hit recently sit in the
//! ignore set until their re-hit interval runs out, so a standing hazard
//! does not hit the same target every tick.

use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::components::{ActorId, PendingRemoval};
use crate::geometry::HitShape;
use crate::hit::{resolve_in_world, HitDescription, HitEvents, HitTargets};

/// Spawn request produced by an ability.
#[derive(Debug, Clone)]
pub struct HazardSpawn {
    pub center: Vec2,
    pub radius: f32,
    pub duration_ms: f32,
    pub rehit_interval_ms: f32,
    pub hit: HitDescription,
}

#[derive(Component, Debug, Clone)]
pub struct Hazard {
    pub center: Vec2,
    pub radius: f32,
    pub remaining_ms: f32,
    pub rehit_interval_ms: f32,
    pub hit: HitDescription,
    /// Target → ms until it can be hit again.
    recent: BTreeMap<ActorId, f32>,
}

impl Hazard {
    pub fn from_spawn(spawn: HazardSpawn) -> Self {
        Self {
            center: spawn.center,
            radius: spawn.radius,
            remaining_ms: spawn.duration_ms,
            rehit_interval_ms: spawn.rehit_interval_ms,
            hit: spawn.hit,
            recent: BTreeMap::new(),
        }
    }

    /// Counts re-hit timers down and rebuilds the ignore set.
    pub fn prepare_sweep(&mut self, dt_ms: f32) {
        for remaining in self.recent.values_mut() {
            *remaining -= dt_ms;
        }
        self.recent.retain(|_, remaining| *remaining > 0.0);

        self.hit.shape = HitShape::circle(self.center, self.radius);
        self.hit.ignore = self.recent.keys().copied().collect();
    }

    pub fn record_hits(&mut self, targets: &[ActorId]) {
        for id in targets {
            self.recent.insert(*id, self.rehit_interval_ms);
        }
    }
}

/// Система: one resolution per hazard per tick, then expiry.
pub fn resolve_hazards(
    mut commands: Commands,
    mut hazards: Query<(Entity, &mut Hazard), Without<PendingRemoval>>,
    mut targets: HitTargets,
    mut events: HitEvents,
    time: Res<Time<Fixed>>,
) {
    let dt_ms = time.delta_secs() * 1000.0;

    for (entity, mut hazard) in hazards.iter_mut() {
        hazard.prepare_sweep(dt_ms);

        let outcome = resolve_in_world(&hazard.hit, &mut targets, &mut events);
        hazard.record_hits(&outcome.targets_hit);

        hazard.remaining_ms -= dt_ms;
        if hazard.remaining_ms <= 0.0 {
            commands.entity(entity).insert(PendingRemoval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Side;

    fn puddle() -> Hazard {
        let hit = HitDescription::builder()
            .circle(Vec2::ZERO, 2.0)
            .damage(3.0)
            .side(Side::Enemy)
            .piercing(true)
            .build()
            .unwrap();
        Hazard::from_spawn(HazardSpawn {
            center: Vec2::ZERO,
            radius: 2.0,
            duration_ms: 1000.0,
            rehit_interval_ms: 250.0,
            hit,
        })
    }

    #[test]
    fn test_rehit_interval_keeps_target_ignored() {
        let mut hazard = puddle();
        hazard.prepare_sweep(100.0);
        assert!(hazard.hit.ignore.is_empty());

        hazard.record_hits(&[ActorId(3)]);
        hazard.prepare_sweep(100.0);
        assert!(hazard.hit.ignore.contains(&ActorId(3)));
        hazard.prepare_sweep(100.0);
        assert!(hazard.hit.ignore.contains(&ActorId(3)));

        // 300ms > 250ms: снова можно бить
        hazard.prepare_sweep(100.0);
        assert!(!hazard.hit.ignore.contains(&ActorId(3)));
    }
}
