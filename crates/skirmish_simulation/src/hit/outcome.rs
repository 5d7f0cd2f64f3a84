//! HitOutcome: aggregate result of one `resolve` call.

use bevy::prelude::*;

use crate::components::ActorId;
use crate::status::Element;

/// What happened to one target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetImpact {
    pub id: ActorId,
    pub position: Vec2,
    /// Shield + life damage actually removed.
    pub damage: f32,
    pub shield_absorbed: f32,
    pub blocked: bool,
    pub reflected: bool,
    pub immune: bool,
    pub destroyed: bool,
    pub knockback: Vec3,
    /// Element the damage was dealt with (после подхвата от источника по пути).
    pub element: Option<Element>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HitOutcome {
    /// At least one target connected.
    pub hit: bool,
    pub damage_dealt: f32,
    pub blocked: bool,
    pub destroyed: bool,
    /// A piercing hit went through something that would have stopped it.
    pub pierced: bool,
    pub reflected: bool,
    /// Caller projectiles must not continue.
    pub stopped: bool,
    /// Knockback of the first connected target.
    pub knockback_vector: Vec3,
    /// Element picked up from an element source (arrow through a brazier).
    pub set_element: Option<Element>,
    /// Connected targets, in resolution order (для расширения ignore set).
    pub targets_hit: Vec<ActorId>,
    pub impacts: Vec<TargetImpact>,
}

impl HitOutcome {
    pub fn impact(&self, id: ActorId) -> Option<&TargetImpact> {
        self.impacts.iter().find(|impact| impact.id == id)
    }

    pub fn was_hit(&self, id: ActorId) -> bool {
        self.targets_hit.contains(&id)
    }
}
