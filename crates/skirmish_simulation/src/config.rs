//! Simulation config (RON, defaults when absent).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::content::ContentError;

/// Глобальные параметры симуляции.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// FixedUpdate rate (Hz)
    pub tick_hz: f64,
    /// Seed для DeterministicRng
    pub seed: u64,
    /// Трение knockback'а на земле (доля скорости в секунду)
    pub knockback_friction: f32,
    /// Ускорение падения после подброса (м/с²)
    pub gravity: f32,
    /// Окно неуязвимости после удара, если шаблон актора не задал своё
    pub default_hit_invulnerability_frames: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_hz: 60.0,
            seed: 42,
            knockback_friction: 8.0,
            gravity: 30.0,
            default_hit_invulnerability_frames: 30,
        }
    }
}

impl SimulationConfig {
    pub fn from_ron(source: &str) -> Result<Self, ContentError> {
        let config: SimulationConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        if !(self.tick_hz.is_finite() && self.tick_hz > 0.0) {
            return Err(ContentError::InvalidConfig(format!("tick_hz must be > 0, got {}", self.tick_hz)));
        }
        if !(self.knockback_friction.is_finite() && self.knockback_friction >= 0.0) {
            return Err(ContentError::InvalidConfig(format!(
                "knockback_friction must be >= 0, got {}",
                self.knockback_friction
            )));
        }
        if !(self.gravity.is_finite() && self.gravity >= 0.0) {
            return Err(ContentError::InvalidConfig(format!("gravity must be >= 0, got {}", self.gravity)));
        }
        Ok(())
    }
}
