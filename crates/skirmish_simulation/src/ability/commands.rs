//! CombatCommands: output buffer of ability hooks.
//!
//! Хуки способностей не трогают мир напрямую. Они пишут команды сюда, а
//! `apply_combat_commands` превращает их в HitRequest'ы, снаряды, зоны,
//! баффы и события коллабораторов в том же тике.

use bevy::prelude::*;

use crate::hazard::HazardSpawn;
use crate::hit::HitDescription;
use crate::interfaces::{EffectParams, PlaySound, ScriptLine, SpawnEffect};
use crate::projectile::ProjectileLaunch;

#[derive(Debug, Clone)]
pub enum CombatCommand {
    /// Instant hit, resolved this tick.
    Hit(HitDescription),
    Projectile(ProjectileLaunch),
    Hazard(HazardSpawn),
    /// Self-buff: invulnerability window + shield restore on the caster.
    Ward { invulnerability_frames: u32, shield: f32 },
    Effect(SpawnEffect),
    Sound(PlaySound),
    Line(ScriptLine),
    SetFlag(String),
}

#[derive(Debug, Clone, Default)]
pub struct CombatCommands {
    commands: Vec<CombatCommand>,
}

impl CombatCommands {
    pub fn push(&mut self, command: CombatCommand) {
        self.commands.push(command);
    }

    pub fn hit(&mut self, description: HitDescription) {
        self.push(CombatCommand::Hit(description));
    }

    pub fn launch(&mut self, launch: ProjectileLaunch) {
        self.push(CombatCommand::Projectile(launch));
    }

    pub fn hazard(&mut self, spawn: HazardSpawn) {
        self.push(CombatCommand::Hazard(spawn));
    }

    pub fn ward(&mut self, invulnerability_frames: u32, shield: f32) {
        self.push(CombatCommand::Ward {
            invulnerability_frames,
            shield,
        });
    }

    pub fn effect(&mut self, kind: impl Into<String>, position: Vec2, params: EffectParams) {
        self.push(CombatCommand::Effect(SpawnEffect {
            kind: kind.into(),
            position,
            params,
        }));
    }

    pub fn sound(&mut self, id: impl Into<String>) {
        self.push(CombatCommand::Sound(PlaySound { id: id.into() }));
    }

    pub fn say(&mut self, text: impl Into<String>) {
        self.push(CombatCommand::Line(ScriptLine { text: text.into() }));
    }

    pub fn set_flag(&mut self, key: impl Into<String>) {
        self.push(CombatCommand::SetFlag(key.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CombatCommand> {
        self.commands.iter()
    }

    pub fn into_inner(self) -> Vec<CombatCommand> {
        self.commands
    }
}

/// Commands issued this tick, tagged with the caster entity (порядок = ActorId).
#[derive(Resource, Debug, Default)]
pub struct PendingCombatCommands {
    entries: Vec<(Entity, CombatCommand)>,
}

impl PendingCombatCommands {
    pub fn extend(&mut self, caster: Entity, commands: CombatCommands) {
        if commands.is_empty() {
            return;
        }
        self.entries
            .extend(commands.into_inner().into_iter().map(|command| (caster, command)));
    }

    pub fn drain(&mut self) -> Vec<(Entity, CombatCommand)> {
        std::mem::take(&mut self.entries)
    }
}
