//! StatusTracker: transient per-actor modifiers read by HitResolver.
//!
//! - `invulnerable_frames`: blocks hits coming from the Enemy side
//! - `enemy_invulnerable_frames`: blocks hits coming from the Hero side
//! - shield: secondary pool, regenerates after `regen_delay_ms` without hits
//! - resistances: immunities + elemental multipliers

use bevy::prelude::*;

use super::resistance::Resistances;
use crate::components::Side;

/// Щит (shieldCharge) с регенерацией по таймеру.
///
/// Регенерация стартует, когда с последнего успешного удара прошло
/// `regen_delay_ms`. Delay 0: щит восстанавливается всегда.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShieldState {
    pub charge: f32,
    pub max: f32,
    /// Единиц щита в секунду
    pub regen_per_sec: f32,
    pub regen_delay_ms: f32,
}

impl ShieldState {
    pub fn new(max: f32, regen_per_sec: f32, regen_delay_ms: f32) -> Self {
        Self {
            charge: max,
            max,
            regen_per_sec,
            regen_delay_ms,
        }
    }

    pub fn is_up(&self) -> bool {
        self.charge > 0.0
    }

    /// Takes as much of `damage` as the shield holds; returns the absorbed part.
    pub fn absorb(&mut self, damage: f32) -> f32 {
        let absorbed = damage.max(0.0).min(self.charge);
        self.charge -= absorbed;
        absorbed
    }

    pub fn restore(&mut self, amount: f32) {
        self.charge = (self.charge + amount.max(0.0)).min(self.max);
    }
}

#[derive(Component, Debug, Clone, Default)]
pub struct StatusTracker {
    pub invulnerable_frames: u32,
    pub enemy_invulnerable_frames: u32,
    /// Frames granted after a connected damaging hit (0 = none).
    pub hit_invulnerability_frames: u32,
    pub shield: ShieldState,
    /// Монотонный таймер с последнего успешного (не заблокированного) удара.
    pub since_hit_ms: f32,
    pub resistances: Resistances,
    /// Счётчик (пере)запущен в этом тике: ближайший tick его не уменьшает.
    fresh_invulnerable: bool,
    fresh_enemy_invulnerable: bool,
}

impl StatusTracker {
    pub fn with_shield(mut self, shield: ShieldState) -> Self {
        self.shield = shield;
        self
    }

    pub fn with_resistances(mut self, resistances: Resistances) -> Self {
        self.resistances = resistances;
        self
    }

    pub fn with_hit_invulnerability(mut self, frames: u32) -> Self {
        self.hit_invulnerability_frames = frames;
        self
    }

    /// One simulation tick: counters down by one frame, shield regen by time.
    ///
    /// Окно в N кадров, открытое в тике T, защищает тики T+1..=T+N.
    pub fn tick(&mut self, delta_ms: f32) {
        if !std::mem::take(&mut self.fresh_invulnerable) {
            self.invulnerable_frames = self.invulnerable_frames.saturating_sub(1);
        }
        if !std::mem::take(&mut self.fresh_enemy_invulnerable) {
            self.enemy_invulnerable_frames = self.enemy_invulnerable_frames.saturating_sub(1);
        }

        let before = self.since_hit_ms;
        self.since_hit_ms += delta_ms.max(0.0);

        // Регенерируем только ту часть тика, что прошла после delay
        let regen_start = before.max(self.shield.regen_delay_ms);
        let regen_ms = (self.since_hit_ms - regen_start).max(0.0);
        if regen_ms > 0.0 && self.shield.regen_per_sec > 0.0 {
            self.shield.restore(self.shield.regen_per_sec * regen_ms / 1000.0);
        }
    }

    /// Is this actor currently immune to hits coming from `attacker`?
    pub fn is_invulnerable_to(&self, attacker: Side) -> bool {
        match attacker {
            Side::Hero => self.enemy_invulnerable_frames > 0,
            Side::Enemy => self.invulnerable_frames > 0,
            Side::Neutral => self.invulnerable_frames > 0 || self.enemy_invulnerable_frames > 0,
        }
    }

    /// Starts the counter matching the attacker role (never shortens a running one).
    pub fn start_invulnerability(&mut self, attacker: Side, frames: u32) {
        let (own, enemy) = match attacker {
            Side::Hero => (false, true),
            Side::Enemy => (true, false),
            Side::Neutral => (true, true),
        };
        if own && frames >= self.invulnerable_frames {
            self.invulnerable_frames = frames;
            self.fresh_invulnerable = true;
        }
        if enemy && frames >= self.enemy_invulnerable_frames {
            self.enemy_invulnerable_frames = frames;
            self.fresh_enemy_invulnerable = true;
        }
    }

    /// Self-granted window (dodge, ward): both roles.
    pub fn grant_invulnerability(&mut self, frames: u32) {
        self.start_invulnerability(Side::Neutral, frames);
    }

    /// Сбрасывает таймер регенерации щита.
    pub fn register_hit(&mut self) {
        self.since_hit_ms = 0.0;
    }
}
