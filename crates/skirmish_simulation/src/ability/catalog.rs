//! Declarative ability data (RON) + the behavior that interprets it.
//!
//! Content authors describe cooldowns/targeting/effects as data; the core
//! never branches on ability ids. `AbilityTable` holds the shared
//! `Arc<AbilityDefinition>`s built from it (and hand-written behaviors).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::commands::CombatCommands;
use super::definition::{AbilityBehavior, AbilityDefinition, AbilityEnv, AbilityId, AbilityTarget, ActorView};
use crate::components::{TargetClass, TargetClasses};
use crate::content::ContentError;
use crate::hazard::HazardSpawn;
use crate::hit::{HitDescription, HitDescriptionBuilder, KnockbackRule};
use crate::interfaces::EffectParams;
use crate::logger;
use crate::projectile::ProjectileLaunch;
use crate::status::Element;
use crate::targeting::TargetResolver;

impl Borrow<str> for AbilityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Data format
// ============================================================================

/// When an ability may be selected at all.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Gate {
    #[default]
    Always,
    /// Life fraction strictly below the threshold.
    LifeBelow(f32),
    /// Только в фазе ярости босса.
    Enraged,
    FlagSet(String),
    FlagUnset(String),
}

impl Gate {
    pub fn allows(&self, actor: &ActorView, env: &AbilityEnv) -> bool {
        match self {
            Gate::Always => true,
            Gate::LifeBelow(threshold) => actor.life_fraction() < *threshold,
            Gate::Enraged => actor.enraged,
            Gate::FlagSet(key) => env.flags.get_flag(key),
            Gate::FlagUnset(key) => !env.flags.get_flag(key),
        }
    }
}

/// Optional hit properties shared by every effect kind.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HitFlags {
    pub can_push: bool,
    pub can_damage_shields: bool,
    pub can_always_knockback: bool,
    pub ignores_invulnerability: bool,
    pub knockback_when_blocked: bool,
    pub invulnerability_frames: Option<u32>,
}

/// What the ability does on use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectSpec {
    /// Melee box in front of the caster.
    Strike {
        reach: f32,
        half_width: f32,
        damage: f32,
        #[serde(default)]
        element: Option<Element>,
        #[serde(default)]
        knockback: f32,
    },
    /// Circle around the caster.
    Nova {
        radius: f32,
        damage: f32,
        #[serde(default)]
        element: Option<Element>,
        #[serde(default)]
        knockback: f32,
        #[serde(default)]
        lift: f32,
    },
    /// Channelled piercing ray, re-fired every tick until recovery ends.
    Beam {
        length: f32,
        damage: f32,
        #[serde(default)]
        element: Option<Element>,
    },
    Projectile {
        speed: f32,
        lifetime_ms: f32,
        damage: f32,
        #[serde(default)]
        element: Option<Element>,
        #[serde(default)]
        piercing: bool,
        #[serde(default)]
        reflectable: bool,
        #[serde(default)]
        takes_element: bool,
        #[serde(default)]
        knockback: f32,
    },
    /// Persistent area at the target point.
    Hazard {
        radius: f32,
        duration_ms: f32,
        rehit_interval_ms: f32,
        damage: f32,
        #[serde(default)]
        element: Option<Element>,
    },
    /// Self-buff: invulnerability window and/or shield restore.
    Ward {
        invulnerability_frames: u32,
        #[serde(default)]
        shield: f32,
    },
}

fn default_one() -> u32 {
    1
}

/// One ability as written in a content pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityData {
    pub id: String,
    #[serde(default)]
    pub cooldown_ms: f32,
    #[serde(default = "default_one")]
    pub charges_max: u32,
    #[serde(default = "default_one")]
    pub charges_recovered_per_cooldown: u32,
    #[serde(default)]
    pub prep_time_ms: f32,
    #[serde(default)]
    pub recover_time_ms: f32,
    #[serde(default)]
    pub cancels_other_abilities: bool,
    #[serde(default)]
    pub cannot_be_canceled: bool,
    #[serde(default)]
    pub gate: Gate,
    /// Радиус поиска цели.
    pub range: f32,
    #[serde(default)]
    pub line_of_sight: bool,
    /// Target classes; defaults to the caster side's opponents.
    #[serde(default)]
    pub targets: Option<Vec<TargetClass>>,
    #[serde(default)]
    pub flags: HitFlags,
    /// Visual effect kind spawned on prepare (telegraph).
    #[serde(default)]
    pub telegraph: Option<String>,
    /// Sound played on use.
    #[serde(default)]
    pub sound: Option<String>,
    /// Dialogue line enqueued on prepare.
    #[serde(default)]
    pub announce: Option<String>,
    pub effect: EffectSpec,
}

impl AbilityData {
    /// Validated at content-load time; definitions never change afterwards.
    pub fn validate(&self) -> Result<(), ContentError> {
        let invalid = |reason: String| ContentError::InvalidAbility {
            id: self.id.clone(),
            reason,
        };
        let non_negative = |name: &str, value: f32| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(invalid(format!("{name} must be finite and >= 0, got {value}")))
            }
        };
        let positive = |name: &str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(invalid(format!("{name} must be finite and > 0, got {value}")))
            }
        };

        if self.id.trim().is_empty() {
            return Err(invalid("empty id".to_string()));
        }
        if self.charges_max == 0 {
            return Err(invalid("charges_max must be at least 1".to_string()));
        }
        if self.charges_recovered_per_cooldown == 0 {
            return Err(invalid("charges_recovered_per_cooldown must be at least 1".to_string()));
        }
        non_negative("cooldown_ms", self.cooldown_ms)?;
        non_negative("prep_time_ms", self.prep_time_ms)?;
        non_negative("recover_time_ms", self.recover_time_ms)?;
        non_negative("range", self.range)?;

        if let Gate::LifeBelow(threshold) = self.gate {
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(invalid(format!("LifeBelow threshold must be in (0, 1], got {threshold}")));
            }
        }

        match &self.effect {
            EffectSpec::Strike {
                reach,
                half_width,
                damage,
                knockback,
                ..
            } => {
                non_negative("reach", *reach)?;
                positive("half_width", *half_width)?;
                non_negative("damage", *damage)?;
                non_negative("knockback", *knockback)?;
            }
            EffectSpec::Nova {
                radius,
                damage,
                knockback,
                ..
            } => {
                positive("radius", *radius)?;
                non_negative("damage", *damage)?;
                non_negative("knockback", *knockback)?;
            }
            EffectSpec::Beam { length, damage, .. } => {
                positive("length", *length)?;
                non_negative("damage", *damage)?;
            }
            EffectSpec::Projectile {
                speed,
                lifetime_ms,
                damage,
                knockback,
                ..
            } => {
                positive("speed", *speed)?;
                positive("lifetime_ms", *lifetime_ms)?;
                non_negative("damage", *damage)?;
                non_negative("knockback", *knockback)?;
            }
            EffectSpec::Hazard {
                radius,
                duration_ms,
                rehit_interval_ms,
                damage,
                ..
            } => {
                positive("radius", *radius)?;
                positive("duration_ms", *duration_ms)?;
                non_negative("rehit_interval_ms", *rehit_interval_ms)?;
                non_negative("damage", *damage)?;
            }
            EffectSpec::Ward { shield, .. } => {
                non_negative("shield", *shield)?;
            }
        }

        Ok(())
    }

    pub fn to_definition(&self) -> AbilityDefinition {
        let mut definition = AbilityDefinition::new(self.id.clone(), DataDrivenBehavior::new(self.clone()))
            .with_cooldown(self.cooldown_ms)
            .with_charges(self.charges_max, self.charges_recovered_per_cooldown)
            .with_timing(self.prep_time_ms, self.recover_time_ms)
            .with_range(self.range);
        definition.cancels_other_abilities = self.cancels_other_abilities;
        definition.cannot_be_canceled = self.cannot_be_canceled;
        definition
    }
}

// ============================================================================
// Behavior
// ============================================================================

/// `AbilityBehavior` driven entirely by `AbilityData`.
#[derive(Debug, Clone)]
pub struct DataDrivenBehavior {
    data: AbilityData,
}

impl DataDrivenBehavior {
    pub fn new(data: AbilityData) -> Self {
        Self { data }
    }

    fn classes(&self, actor: &ActorView) -> TargetClasses {
        match &self.data.targets {
            Some(classes) => classes.iter().copied().collect(),
            None => actor.side.opponents(),
        }
    }

    /// Builder pre-filled with everything common to this ability's hits.
    fn hit_builder(&self, actor: &ActorView, damage: f32, element: Option<Element>) -> HitDescriptionBuilder {
        let flags = self.data.flags;
        let mut builder = HitDescription::builder()
            .damage(damage)
            .element(element)
            .side(actor.side)
            .source(actor.id)
            .classes(self.classes(actor))
            .can_push(flags.can_push)
            .can_damage_shields(flags.can_damage_shields)
            .can_always_knockback(flags.can_always_knockback)
            .ignores_invulnerability(flags.ignores_invulnerability)
            .knockback_when_blocked(flags.knockback_when_blocked);
        if let Some(frames) = flags.invulnerability_frames {
            builder = builder.invulnerability_frames(frames);
        }
        builder
    }

    fn emit_hit(&self, builder: HitDescriptionBuilder, out: &mut CombatCommands) -> Option<HitDescription> {
        match builder.build() {
            Ok(description) => {
                out.hit(description.clone());
                Some(description)
            }
            Err(error) => {
                logger::log_error(&format!("Ability '{}' produced an invalid hit: {}", self.data.id, error));
                None
            }
        }
    }

    fn fire_beam(&self, actor: &ActorView, target: &AbilityTarget, out: &mut CombatCommands) {
        let EffectSpec::Beam { length, damage, element } = self.data.effect else {
            return;
        };
        let direction = target.direction_from(actor.position);
        let builder = self
            .hit_builder(actor, damage, element)
            .ray(actor.position, direction * length)
            .piercing(true);
        self.emit_hit(builder, out);
    }
}

fn push_knockback(caster: Vec2, force: f32, lift: f32) -> (KnockbackRule, f32) {
    if force > 0.0 {
        (KnockbackRule::AwayFrom { point: caster, lift }, force)
    } else {
        (KnockbackRule::None, 1.0)
    }
}

impl AbilityBehavior for DataDrivenBehavior {
    fn is_enabled(&self, actor: &ActorView, env: &AbilityEnv) -> bool {
        self.data.gate.allows(actor, env)
    }

    fn get_target(&self, actor: &ActorView, env: &AbilityEnv) -> Option<AbilityTarget> {
        let actor_classes = self.classes(actor) & (TargetClasses::ENEMY | TargetClasses::ALLY);
        let target = TargetResolver::new(self.data.range)
            .with_classes(actor_classes)
            .with_line_of_sight(self.data.line_of_sight)
            .find_target(actor.position, Some(actor.id), env.candidates, env.terrain)?;

        Some(match self.data.effect {
            EffectSpec::Nova { .. } | EffectSpec::Ward { .. } => AbilityTarget::SelfCast,
            EffectSpec::Hazard { .. } => AbilityTarget::Point(target.position),
            _ => AbilityTarget::Actor {
                id: target.id,
                position: target.position,
            },
        })
    }

    fn prepare_ability(&self, actor: &ActorView, target: &AbilityTarget, out: &mut CombatCommands) {
        if let Some(kind) = &self.data.telegraph {
            out.effect(
                kind.clone(),
                target.point(actor.position),
                EffectParams {
                    scale: 1.0,
                    duration_ms: self.data.prep_time_ms,
                    direction: target.direction_from(actor.position),
                },
            );
        }
        if let Some(line) = &self.data.announce {
            out.say(line.clone());
        }
    }

    fn use_ability(&self, actor: &ActorView, target: &AbilityTarget, out: &mut CombatCommands) {
        if let Some(sound) = &self.data.sound {
            out.sound(sound.clone());
        }

        let caster = actor.position;
        let direction = target.direction_from(caster);

        match self.data.effect {
            EffectSpec::Strike {
                reach,
                half_width,
                damage,
                element,
                knockback,
            } => {
                let (rule, force) = push_knockback(caster, knockback, 0.0);
                let builder = self
                    .hit_builder(actor, damage, element)
                    .box_at(caster + direction * reach, Vec2::splat(half_width))
                    .knockback(rule)
                    .knockback_force(force);
                self.emit_hit(builder, out);
            }
            EffectSpec::Nova {
                radius,
                damage,
                element,
                knockback,
                lift,
            } => {
                let (rule, force) = push_knockback(caster, knockback, lift);
                let builder = self
                    .hit_builder(actor, damage, element)
                    .circle(caster, radius)
                    .knockback(rule)
                    .knockback_force(force)
                    .piercing(true);
                self.emit_hit(builder, out);
            }
            EffectSpec::Beam { .. } => self.fire_beam(actor, target, out),
            EffectSpec::Projectile {
                speed,
                lifetime_ms,
                damage,
                element,
                piercing,
                reflectable,
                takes_element,
                knockback,
            } => {
                let knockback_rule = if knockback > 0.0 {
                    KnockbackRule::Explicit((direction * knockback).extend(0.0))
                } else {
                    KnockbackRule::None
                };
                let built = self
                    .hit_builder(actor, damage, element)
                    .ray(caster, Vec2::ZERO)
                    .piercing(piercing)
                    .reflectable(reflectable)
                    .takes_element(takes_element)
                    .knockback(knockback_rule)
                    .build();
                match built {
                    Ok(hit) => out.launch(ProjectileLaunch {
                        origin: caster,
                        velocity: direction * speed,
                        lifetime_ms,
                        hit,
                    }),
                    Err(error) => {
                        logger::log_error(&format!("Ability '{}' projectile: {}", self.data.id, error));
                    }
                }
            }
            EffectSpec::Hazard {
                radius,
                duration_ms,
                rehit_interval_ms,
                damage,
                element,
            } => {
                let center = target.point(caster);
                let built = self
                    .hit_builder(actor, damage, element)
                    .circle(center, radius)
                    .piercing(true)
                    .build();
                match built {
                    Ok(hit) => out.hazard(HazardSpawn {
                        center,
                        radius,
                        duration_ms,
                        rehit_interval_ms,
                        hit,
                    }),
                    Err(error) => {
                        logger::log_error(&format!("Ability '{}' hazard: {}", self.data.id, error));
                    }
                }
            }
            EffectSpec::Ward {
                invulnerability_frames,
                shield,
            } => out.ward(invulnerability_frames, shield),
        }
    }

    fn update_ability(&self, actor: &ActorView, target: &AbilityTarget, _since_use_ms: f32, out: &mut CombatCommands) {
        self.fire_beam(actor, target, out);
    }

    fn is_sustained(&self) -> bool {
        matches!(self.data.effect, EffectSpec::Beam { .. })
    }
}

// ============================================================================
// Table
// ============================================================================

/// Registered ability definitions, shared by every actor that uses them.
#[derive(Resource, Debug, Default, Clone)]
pub struct AbilityTable {
    definitions: BTreeMap<AbilityId, Arc<AbilityDefinition>>,
}

impl AbilityTable {
    pub fn from_data(data: &[AbilityData]) -> Result<Self, ContentError> {
        let mut table = Self::default();
        for ability in data {
            ability.validate()?;
            table.register(ability.to_definition())?;
        }
        Ok(table)
    }

    /// Registers a (possibly hand-written) definition. Ids are unique.
    pub fn register(&mut self, definition: AbilityDefinition) -> Result<Arc<AbilityDefinition>, ContentError> {
        if self.definitions.contains_key(&definition.id) {
            return Err(ContentError::DuplicateAbility(definition.id.0.clone()));
        }
        let definition = Arc::new(definition);
        self.definitions.insert(definition.id.clone(), definition.clone());
        Ok(definition)
    }

    pub fn get(&self, id: &str) -> Option<Arc<AbilityDefinition>> {
        self.definitions.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &AbilityId> {
        self.definitions.keys()
    }
}
