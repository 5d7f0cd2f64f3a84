//! Status module: invulnerability windows, shields, resistances.
//!
//! StatusTracker читают и HitResolver (митигация урона, новые окна
//! неуязвимости), и AbilityScheduler (ward'ы, самобаффы).

use bevy::prelude::*;

pub mod resistance;
pub mod tracker;

// Tests (separate files with _tests suffix)
#[cfg(test)]
mod tracker_tests;

pub use resistance::{Element, ElementMask, Resistances};
pub use tracker::{ShieldState, StatusTracker};

use crate::components::Defeated;
use crate::CombatSet;

/// Status Plugin
///
/// Тикает счётчики раньше всех остальных систем боя. Окно, открытое
/// ударом в тике T, первый раз уменьшается только в начале T+2, так что
/// N кадров покрывают тики T+1..=T+N.
pub struct StatusPlugin;

impl Plugin for StatusPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(FixedUpdate, tick_status_trackers.in_set(CombatSet::Status));
    }
}

/// Система: decrement invulnerability frames, regenerate shields.
pub fn tick_status_trackers(
    mut trackers: Query<&mut StatusTracker, Without<Defeated>>,
    time: Res<Time<Fixed>>,
) {
    let delta_ms = time.delta_secs() * 1000.0;

    for mut status in trackers.iter_mut() {
        status.tick(delta_ms);
    }
}
