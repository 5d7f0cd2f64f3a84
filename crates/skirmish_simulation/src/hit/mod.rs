//! Hit module: HitDescription → HitResolver → HitOutcome.
//!
//! Общий конвейер для всех источников урона:
//! - instant hits from abilities (HitRequest)
//! - projectiles (sweep prev → next position)
//! - persistent hazards (once per hazard per tick)

use bevy::prelude::*;

pub mod description;
pub mod outcome;
pub mod resolver;
pub mod systems;

// Tests (separate files with _tests suffix)
#[cfg(test)]
mod resolver_tests;

pub use description::{HitDescription, HitDescriptionBuilder, HitDescriptionError, KnockbackRule};
pub use outcome::{HitOutcome, TargetImpact};
pub use resolver::{resolve, HitCandidate};
pub use systems::{
    apply_knockback_motion, resolve_hit_requests, resolve_in_world, DamageDealt, HitEvents, HitRequest,
    HitResolved, HitTargets,
};

use crate::CombatSet;

/// Hit Plugin
///
/// Порядок выполнения (CombatSet::Hits):
/// 1. resolve_hit_requests: удары способностей этого тика
/// 2. advance_projectiles: sweep снарядов
/// 3. resolve_hazards: зоны, один раз на зону за тик
///
/// Затем CombatSet::Motion: apply_knockback_motion.
pub struct HitPlugin;

impl Plugin for HitPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<HitRequest>()
            .add_event::<HitResolved>()
            .add_event::<DamageDealt>();

        app.add_systems(
            FixedUpdate,
            (
                resolve_hit_requests,
                crate::projectile::advance_projectiles,
                crate::hazard::resolve_hazards,
            )
                .chain()
                .in_set(CombatSet::Hits),
        )
        .add_systems(FixedUpdate, apply_knockback_motion.in_set(CombatSet::Motion));
    }
}
