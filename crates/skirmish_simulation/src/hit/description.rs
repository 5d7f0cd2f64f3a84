//! HitDescription: input contract of one attack instance.
//!
//! Строится builder'ом с валидацией: ровно одна геометрия (box/circle/ray),
//! конечный неотрицательный урон, неотрицательная сила отбрасывания.

use bevy::prelude::*;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::components::{ActorId, Side, TargetClasses};
use crate::geometry::HitShape;
use crate::status::Element;

/// How the knockback vector of a connected hit is computed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum KnockbackRule {
    #[default]
    None,
    /// Fixed `{vx, vy, vz}`.
    Explicit(Vec3),
    /// From the hit's center towards the target; `lift` goes into Z.
    AwayFromHit { lift: f32 },
    AwayFrom { point: Vec2, lift: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitDescription {
    pub shape: HitShape,
    pub damage: f32,
    pub element: Option<Element>,
    /// hitEnemies / hitAllies / hitObjects / hitTiles
    pub classes: TargetClasses,
    /// Attacker role (picks the invulnerability counter on the target).
    pub side: Side,
    /// Caster; never hit by its own attack.
    pub source: Option<ActorId>,
    pub can_push: bool,
    pub can_damage_shields: bool,
    pub knockback: KnockbackRule,
    pub knockback_force: f32,
    pub piercing: bool,
    /// Classes that stop a non-piercing hit (по умолчанию все).
    pub stop_on: TargetClasses,
    /// Уже обработанные цели этого sweep'а.
    pub ignore: BTreeSet<ActorId>,
    pub can_always_knockback: bool,
    pub ignores_invulnerability: bool,
    pub knockback_when_blocked: bool,
    pub reflectable: bool,
    pub takes_element: bool,
    /// Overrides the target's `hit_invulnerability_frames`.
    pub invulnerability_frames: Option<u32>,
}

impl HitDescription {
    pub fn builder() -> HitDescriptionBuilder {
        HitDescriptionBuilder::default()
    }

    /// Knockback for a target at `position`, before target-side rules.
    pub fn knockback_for(&self, position: Vec2) -> Vec3 {
        let away = |from: Vec2, lift: f32| {
            let mut direction = (position - from).normalize_or_zero();
            if direction == Vec2::ZERO {
                // Цель ровно в центре удара: толкаем вдоль луча, если он есть
                if let HitShape::Ray { delta, .. } = self.shape {
                    direction = delta.normalize_or_zero();
                }
            }
            direction.extend(lift)
        };

        let raw = match self.knockback {
            KnockbackRule::None => Vec3::ZERO,
            KnockbackRule::Explicit(vector) => vector,
            KnockbackRule::AwayFromHit { lift } => away(self.shape.center(), lift),
            KnockbackRule::AwayFrom { point, lift } => away(point, lift),
        };
        raw * self.knockback_force
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum HitDescriptionError {
    #[error("hit description has no geometry")]
    MissingShape,
    #[error("hit description sets more than one geometry")]
    MultipleShapes,
    #[error("damage must be finite and non-negative, got {0}")]
    InvalidDamage(f32),
    #[error("knockback force must be finite and non-negative, got {0}")]
    InvalidKnockbackForce(f32),
}

/// Builder for [`HitDescription`].
#[derive(Debug, Clone)]
pub struct HitDescriptionBuilder {
    shape: Option<HitShape>,
    shape_count: u8,
    description: HitDescription,
}

impl Default for HitDescriptionBuilder {
    fn default() -> Self {
        Self {
            shape: None,
            shape_count: 0,
            description: HitDescription {
                shape: HitShape::circle(Vec2::ZERO, 0.0),
                damage: 0.0,
                element: None,
                classes: TargetClasses::empty(),
                side: Side::Neutral,
                source: None,
                can_push: false,
                can_damage_shields: false,
                knockback: KnockbackRule::None,
                knockback_force: 1.0,
                piercing: false,
                stop_on: TargetClasses::all(),
                ignore: BTreeSet::new(),
                can_always_knockback: false,
                ignores_invulnerability: false,
                knockback_when_blocked: false,
                reflectable: false,
                takes_element: false,
                invulnerability_frames: None,
            },
        }
    }
}

impl HitDescriptionBuilder {
    pub fn shape(mut self, shape: HitShape) -> Self {
        self.shape = Some(shape);
        self.shape_count = self.shape_count.saturating_add(1);
        self
    }

    pub fn box_at(self, center: Vec2, half_extents: Vec2) -> Self {
        self.shape(HitShape::box_at(center, half_extents))
    }

    pub fn circle(self, center: Vec2, radius: f32) -> Self {
        self.shape(HitShape::circle(center, radius))
    }

    pub fn ray(self, origin: Vec2, delta: Vec2) -> Self {
        self.shape(HitShape::ray(origin, delta))
    }

    pub fn damage(mut self, damage: f32) -> Self {
        self.description.damage = damage;
        self
    }

    pub fn element(mut self, element: Option<Element>) -> Self {
        self.description.element = element;
        self
    }

    pub fn classes(mut self, classes: TargetClasses) -> Self {
        self.description.classes = classes;
        self
    }

    /// Attacker side; classes default to the side's opponents if none were set.
    pub fn side(mut self, side: Side) -> Self {
        self.description.side = side;
        self
    }

    pub fn source(mut self, source: ActorId) -> Self {
        self.description.source = Some(source);
        self
    }

    pub fn can_push(mut self, value: bool) -> Self {
        self.description.can_push = value;
        self
    }

    pub fn can_damage_shields(mut self, value: bool) -> Self {
        self.description.can_damage_shields = value;
        self
    }

    pub fn knockback(mut self, rule: KnockbackRule) -> Self {
        self.description.knockback = rule;
        self
    }

    pub fn knockback_force(mut self, force: f32) -> Self {
        self.description.knockback_force = force;
        self
    }

    pub fn piercing(mut self, value: bool) -> Self {
        self.description.piercing = value;
        self
    }

    pub fn stop_on(mut self, classes: TargetClasses) -> Self {
        self.description.stop_on = classes;
        self
    }

    pub fn ignore(mut self, ids: impl IntoIterator<Item = ActorId>) -> Self {
        self.description.ignore.extend(ids);
        self
    }

    pub fn can_always_knockback(mut self, value: bool) -> Self {
        self.description.can_always_knockback = value;
        self
    }

    pub fn ignores_invulnerability(mut self, value: bool) -> Self {
        self.description.ignores_invulnerability = value;
        self
    }

    pub fn knockback_when_blocked(mut self, value: bool) -> Self {
        self.description.knockback_when_blocked = value;
        self
    }

    pub fn reflectable(mut self, value: bool) -> Self {
        self.description.reflectable = value;
        self
    }

    pub fn takes_element(mut self, value: bool) -> Self {
        self.description.takes_element = value;
        self
    }

    pub fn invulnerability_frames(mut self, frames: u32) -> Self {
        self.description.invulnerability_frames = Some(frames);
        self
    }

    pub fn build(self) -> Result<HitDescription, HitDescriptionError> {
        let mut description = self.description;

        description.shape = match (self.shape, self.shape_count) {
            (None, _) => return Err(HitDescriptionError::MissingShape),
            (Some(_), count) if count > 1 => return Err(HitDescriptionError::MultipleShapes),
            (Some(shape), _) => shape,
        };

        if !description.damage.is_finite() || description.damage < 0.0 {
            return Err(HitDescriptionError::InvalidDamage(description.damage));
        }
        if !description.knockback_force.is_finite() || description.knockback_force < 0.0 {
            return Err(HitDescriptionError::InvalidKnockbackForce(description.knockback_force));
        }

        if description.classes.is_empty() {
            description.classes = description.side.opponents();
        }

        Ok(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_exactly_one_shape() {
        assert_eq!(
            HitDescription::builder().damage(5.0).build().unwrap_err(),
            HitDescriptionError::MissingShape
        );
        assert_eq!(
            HitDescription::builder()
                .circle(Vec2::ZERO, 1.0)
                .ray(Vec2::ZERO, Vec2::X)
                .build()
                .unwrap_err(),
            HitDescriptionError::MultipleShapes
        );
    }

    #[test]
    fn test_build_rejects_bad_numbers() {
        let negative = HitDescription::builder().circle(Vec2::ZERO, 1.0).damage(-1.0).build();
        assert!(matches!(negative, Err(HitDescriptionError::InvalidDamage(_))));

        let nan_force = HitDescription::builder()
            .circle(Vec2::ZERO, 1.0)
            .knockback_force(f32::NAN)
            .build();
        assert!(matches!(nan_force, Err(HitDescriptionError::InvalidKnockbackForce(_))));
    }

    #[test]
    fn test_classes_default_to_side_opponents() {
        let hit = HitDescription::builder()
            .circle(Vec2::ZERO, 1.0)
            .side(Side::Enemy)
            .build()
            .unwrap();
        assert_eq!(hit.classes, TargetClasses::ALLY);
    }

    #[test]
    fn test_knockback_away_from_hit() {
        let hit = HitDescription::builder()
            .circle(Vec2::ZERO, 3.0)
            .knockback(KnockbackRule::AwayFromHit { lift: 0.5 })
            .knockback_force(4.0)
            .build()
            .unwrap();

        let knockback = hit.knockback_for(Vec2::new(0.0, 2.0));
        assert!((knockback - Vec3::new(0.0, 4.0, 2.0)).length() < 1e-5);
    }
}
