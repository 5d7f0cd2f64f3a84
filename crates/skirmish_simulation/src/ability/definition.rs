//! AbilityDefinition + AbilityBehavior (callback slots attached to plain data).

use bevy::prelude::*;
use std::fmt;
use std::sync::Arc;

use super::commands::CombatCommands;
use crate::components::{ActorId, Side};
use crate::interfaces::{StoryFlags, TerrainQuery};
use crate::targeting::TargetCandidate;

/// Идентификатор способности из контента (`"slam"`, `"fire_bolt"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbilityId(pub String);

impl AbilityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only snapshot of the caster handed to behavior hooks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorView {
    pub entity: Entity,
    pub id: ActorId,
    pub position: Vec2,
    pub side: Side,
    pub life: f32,
    pub max_life: f32,
    pub enraged: bool,
}

impl ActorView {
    pub fn life_fraction(&self) -> f32 {
        if self.max_life <= 0.0 {
            return 0.0;
        }
        (self.life / self.max_life).clamp(0.0, 1.0)
    }
}

/// Simulation context for target selection (одна арена, один тик).
pub struct AbilityEnv<'a> {
    pub candidates: &'a [TargetCandidate],
    pub terrain: &'a dyn TerrainQuery,
    pub flags: &'a StoryFlags,
}

/// Resolved target, kept on the ActiveAbility until it ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbilityTarget {
    Actor { id: ActorId, position: Vec2 },
    Point(Vec2),
    /// Unit direction from the caster.
    Direction(Vec2),
    SelfCast,
}

impl AbilityTarget {
    /// World point the ability aims at.
    pub fn point(&self, caster: Vec2) -> Vec2 {
        match *self {
            AbilityTarget::Actor { position, .. } => position,
            AbilityTarget::Point(point) => point,
            AbilityTarget::Direction(direction) => caster + direction,
            AbilityTarget::SelfCast => caster,
        }
    }

    /// Unit aim direction (zero for self-casts or a target on top of the caster).
    pub fn direction_from(&self, caster: Vec2) -> Vec2 {
        match *self {
            AbilityTarget::Direction(direction) => direction.normalize_or_zero(),
            AbilityTarget::SelfCast => Vec2::ZERO,
            _ => (self.point(caster) - caster).normalize_or_zero(),
        }
    }
}

/// Почему прервали активную способность.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    Staggered,
    Defeated,
    /// Another ability with `cancels_other_abilities` took over.
    Preempted,
}

/// Behavior slots of an ability.
///
/// Hooks never touch the world: they read snapshots and write into
/// `CombatCommands`, which the simulation applies after the scheduler step.
pub trait AbilityBehavior: Send + Sync {
    /// Optional gating predicate (enrage-only, low-life, story flags).
    fn is_enabled(&self, _actor: &ActorView, _env: &AbilityEnv) -> bool {
        true
    }

    /// `None` = no valid action this tick; the scheduler stays Idle.
    fn get_target(&self, actor: &ActorView, env: &AbilityEnv) -> Option<AbilityTarget>;

    /// Called once on Idle → Preparing (telegraph, wind-up sound).
    fn prepare_ability(&self, _actor: &ActorView, _target: &AbilityTarget, _out: &mut CombatCommands) {}

    /// Called exactly once on Preparing → Active.
    fn use_ability(&self, actor: &ActorView, target: &AbilityTarget, out: &mut CombatCommands);

    /// Sustained abilities only: every tick between use and the end of recovery time.
    fn update_ability(
        &self,
        _actor: &ActorView,
        _target: &AbilityTarget,
        _since_use_ms: f32,
        _out: &mut CombatCommands,
    ) {
    }

    fn is_sustained(&self) -> bool {
        false
    }

    fn on_cancel(&self, _actor: &ActorView, _reason: CancelReason, _out: &mut CombatCommands) {}
}

/// Immutable ability data shared by every actor that uses it.
#[derive(Clone)]
pub struct AbilityDefinition {
    pub id: AbilityId,
    pub cooldown_ms: f32,
    pub charges_max: u32,
    pub charges_recovered_per_cooldown: u32,
    pub prep_time_ms: f32,
    pub recover_time_ms: f32,
    pub cancels_other_abilities: bool,
    pub cannot_be_canceled: bool,
    /// Дальность выбора цели (для логов/контроллера; сам поиск делает behavior).
    pub range: f32,
    pub behavior: Arc<dyn AbilityBehavior>,
}

impl fmt::Debug for AbilityDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilityDefinition")
            .field("id", &self.id)
            .field("cooldown_ms", &self.cooldown_ms)
            .field("charges_max", &self.charges_max)
            .field("charges_recovered_per_cooldown", &self.charges_recovered_per_cooldown)
            .field("prep_time_ms", &self.prep_time_ms)
            .field("recover_time_ms", &self.recover_time_ms)
            .field("cancels_other_abilities", &self.cancels_other_abilities)
            .field("cannot_be_canceled", &self.cannot_be_canceled)
            .field("sustained", &self.behavior.is_sustained())
            .finish()
    }
}

impl AbilityDefinition {
    /// One charge, no cooldown, instant prep/recover.
    pub fn new(id: impl Into<String>, behavior: impl AbilityBehavior + 'static) -> Self {
        Self {
            id: AbilityId::new(id),
            cooldown_ms: 0.0,
            charges_max: 1,
            charges_recovered_per_cooldown: 1,
            prep_time_ms: 0.0,
            recover_time_ms: 0.0,
            cancels_other_abilities: false,
            cannot_be_canceled: false,
            range: 0.0,
            behavior: Arc::new(behavior),
        }
    }

    pub fn with_cooldown(mut self, cooldown_ms: f32) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    pub fn with_charges(mut self, charges_max: u32, recovered_per_cooldown: u32) -> Self {
        self.charges_max = charges_max;
        self.charges_recovered_per_cooldown = recovered_per_cooldown;
        self
    }

    pub fn with_timing(mut self, prep_time_ms: f32, recover_time_ms: f32) -> Self {
        self.prep_time_ms = prep_time_ms;
        self.recover_time_ms = recover_time_ms;
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    pub fn cancels_others(mut self) -> Self {
        self.cancels_other_abilities = true;
        self
    }

    pub fn uncancelable(mut self) -> Self {
        self.cannot_be_canceled = true;
        self
    }

    pub fn is_enabled(&self, actor: &ActorView, env: &AbilityEnv) -> bool {
        self.behavior.is_enabled(actor, env)
    }
}
