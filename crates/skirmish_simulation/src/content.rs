//! Content packs (RON): config + ability data + actor templates.
//!
//! Всё, что загружается с диска, валидируется здесь. Симуляция получает
//! уже проверенные `AbilityTable` и компоненты.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ability::{AbilityController, AbilityData, AbilityScheduler, AbilityTable, SelectionPolicy};
use crate::boss::BossState;
use crate::components::{ActorId, CombatantSpawn, HitBody, Side, TargetClass, Vitals};
use crate::config::SimulationConfig;
use crate::geometry::BodyShape;
use crate::logger;
use crate::status::{Element, Resistances, ShieldState, StatusTracker};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("ability '{id}': {reason}")]
    InvalidAbility { id: String, reason: String },

    #[error("ability '{0}' registered twice")]
    DuplicateAbility(String),

    #[error("actor '{actor}' references unknown ability '{ability}'")]
    UnknownAbility { actor: String, ability: String },

    #[error("actor '{actor}': {reason}")]
    InvalidActor { actor: String, reason: String },
}

/// Hit body shape as written in content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BodyData {
    Point,
    Circle(f32),
    /// Half extents.
    Box(f32, f32),
}

impl Default for BodyData {
    fn default() -> Self {
        BodyData::Circle(0.5)
    }
}

impl BodyData {
    pub fn to_shape(self) -> BodyShape {
        match self {
            BodyData::Point => BodyShape::Point,
            BodyData::Circle(radius) => BodyShape::Circle { radius },
            BodyData::Box(x, y) => BodyShape::Box {
                half_extents: Vec2::new(x, y),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShieldData {
    pub max: f32,
    #[serde(default)]
    pub regen_per_sec: f32,
    #[serde(default)]
    pub regen_delay_ms: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossData {
    pub enrage_below: f32,
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default)]
    pub line: Option<String>,
}

/// One actor (or object/tile) placed into the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorTemplate {
    pub name: String,
    #[serde(default)]
    pub side: Side,
    /// Класс цели; по умолчанию выводится из стороны.
    #[serde(default)]
    pub class: Option<TargetClass>,
    pub position: (f32, f32),
    pub life: f32,
    #[serde(default)]
    pub immovable: bool,
    #[serde(default)]
    pub stagger_threshold: f32,
    #[serde(default)]
    pub body: BodyData,
    #[serde(default)]
    pub shield: Option<ShieldData>,
    /// `None` = физический урон.
    #[serde(default)]
    pub immunities: Vec<Option<Element>>,
    #[serde(default)]
    pub multipliers: Vec<(Option<Element>, f32)>,
    /// Defaults to `SimulationConfig::default_hit_invulnerability_frames`.
    #[serde(default)]
    pub hit_invulnerability_frames: Option<u32>,
    #[serde(default)]
    pub reflects: bool,
    #[serde(default)]
    pub element_source: Option<Element>,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub policy: SelectionPolicy,
    #[serde(default)]
    pub boss: Option<BossData>,
}

impl ActorTemplate {
    fn invalid(&self, reason: impl Into<String>) -> ContentError {
        ContentError::InvalidActor {
            actor: self.name.clone(),
            reason: reason.into(),
        }
    }

    pub fn validate(&self, table: &AbilityTable) -> Result<(), ContentError> {
        if !(self.life.is_finite() && self.life > 0.0) {
            return Err(self.invalid(format!("life must be > 0, got {}", self.life)));
        }
        if !(self.stagger_threshold.is_finite() && self.stagger_threshold >= 0.0) {
            return Err(self.invalid(format!("stagger_threshold must be >= 0, got {}", self.stagger_threshold)));
        }
        if let Some(shield) = self.shield {
            if !(shield.max >= 0.0 && shield.regen_per_sec >= 0.0 && shield.regen_delay_ms >= 0.0) {
                return Err(self.invalid("shield values must be >= 0"));
            }
        }
        if let Some((element, multiplier)) = self.multipliers.iter().find(|(_, multiplier)| *multiplier < 0.0) {
            return Err(self.invalid(format!("negative multiplier {multiplier} for {element:?}")));
        }
        if let Some(boss) = &self.boss {
            if !(boss.enrage_below > 0.0 && boss.enrage_below <= 1.0) {
                return Err(self.invalid(format!("enrage_below must be in (0, 1], got {}", boss.enrage_below)));
            }
        }
        if let SelectionPolicy::Weighted(weights) = &self.policy {
            if weights.len() != self.abilities.len() {
                return Err(self.invalid(format!(
                    "{} weights for {} abilities",
                    weights.len(),
                    self.abilities.len()
                )));
            }
        }
        for ability in &self.abilities {
            if table.get(ability).is_none() {
                return Err(ContentError::UnknownAbility {
                    actor: self.name.clone(),
                    ability: ability.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn to_spawn(&self, config: &SimulationConfig) -> CombatantSpawn {
        let class = self.class.unwrap_or(self.side.own_class());

        let mut body = HitBody::new(class, self.body.to_shape());
        if self.reflects {
            body = body.reflecting();
        }
        if let Some(element) = self.element_source {
            body = body.with_element_source(element);
        }

        let mut vitals = Vitals::new(self.life).with_stagger_threshold(self.stagger_threshold);
        if self.immovable {
            vitals = vitals.immovable();
        }

        let mut resistances = Resistances::default().immune_to(self.immunities.iter().copied());
        for (element, multiplier) in &self.multipliers {
            resistances = resistances.with_multiplier(*element, *multiplier);
        }
        let mut status = StatusTracker::default().with_resistances(resistances).with_hit_invulnerability(
            self.hit_invulnerability_frames
                .unwrap_or(config.default_hit_invulnerability_frames),
        );
        if let Some(shield) = self.shield {
            status = status.with_shield(ShieldState::new(shield.max, shield.regen_per_sec, shield.regen_delay_ms));
        }

        CombatantSpawn::new(self.side, Vec2::new(self.position.0, self.position.1))
            .with_body(body)
            .with_vitals(vitals)
            .with_status(status)
    }
}

/// Arena content: one RON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPack {
    #[serde(default)]
    pub config: SimulationConfig,
    #[serde(default)]
    pub abilities: Vec<AbilityData>,
    #[serde(default)]
    pub actors: Vec<ActorTemplate>,
}

impl ContentPack {
    /// Parse + validate (ability data, actor references, config).
    pub fn from_ron(source: &str) -> Result<Self, ContentError> {
        let pack: ContentPack = ron::from_str(source)?;
        pack.config.validate()?;
        let table = pack.ability_table()?;
        for actor in &pack.actors {
            actor.validate(&table)?;
        }
        Ok(pack)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let pack = Self::from_ron(&source)?;
        logger::log_info(&format!(
            "Loaded content {}: {} abilities, {} actors",
            path.display(),
            pack.abilities.len(),
            pack.actors.len()
        ));
        Ok(pack)
    }

    pub fn ability_table(&self) -> Result<AbilityTable, ContentError> {
        AbilityTable::from_data(&self.abilities)
    }

    /// Inserts config + ability table and spawns every template in order
    /// (ActorId follows template order).
    pub fn spawn_into(&self, world: &mut World) -> Result<Vec<(Entity, ActorId)>, ContentError> {
        let table = self.ability_table()?;
        for actor in &self.actors {
            actor.validate(&table)?;
        }

        world.insert_resource(Time::<Fixed>::from_hz(self.config.tick_hz));
        world.insert_resource(self.config.clone());

        let mut spawned = Vec::with_capacity(self.actors.len());
        for template in &self.actors {
            let (entity, id) = template.to_spawn(&self.config).spawn_in(world);
            let mut entity_mut = world.entity_mut(entity);
            entity_mut.insert(Name::new(template.name.clone()));

            if !template.abilities.is_empty() {
                let mut scheduler = AbilityScheduler::new();
                for ability in &template.abilities {
                    let definition = table.get(ability).ok_or_else(|| ContentError::UnknownAbility {
                        actor: template.name.clone(),
                        ability: ability.clone(),
                    })?;
                    scheduler.push(definition);
                }
                entity_mut.insert((scheduler, AbilityController::new(template.policy.clone())));
            }

            if let Some(boss) = &template.boss {
                let mut state = BossState::new(boss.enrage_below);
                state.flag = boss.flag.clone();
                state.enrage_line = boss.line.clone();
                entity_mut.insert(state);
            }

            logger::log(&format!("Spawned '{}' as {:?} ({:?})", template.name, id, template.side));
            spawned.push((entity, id));
        }

        world.insert_resource(table);
        Ok(spawned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TargetClasses;

    const PACK: &str = r#"(
        config: (seed: 9),
        abilities: [
            (
                id: "bite",
                range: 1.5,
                effect: Strike(reach: 1.0, half_width: 0.5, damage: 5.0),
            ),
        ],
        actors: [
            (name: "hero", side: Hero, position: (0.0, 0.0), life: 100.0, immunities: [None]),
            (name: "rat", side: Enemy, position: (1.0, 0.0), life: 10.0, abilities: ["bite"]),
            (
                name: "brazier",
                class: Some(Object),
                position: (4.0, 0.0),
                life: 5.0,
                immovable: true,
                body: Box(0.5, 0.5),
                element_source: Some(Fire),
            ),
        ],
    )"#;

    #[test]
    fn test_pack_parses_with_defaults() {
        let pack = ContentPack::from_ron(PACK).expect("valid pack");
        assert_eq!(pack.config.seed, 9);
        assert_eq!(pack.config.tick_hz, 60.0);
        assert_eq!(pack.actors.len(), 3);
        assert_eq!(pack.actors[1].policy, SelectionPolicy::Priority);
        assert_eq!(pack.actors[0].body, BodyData::Circle(0.5));
    }

    #[test]
    fn test_unknown_ability_reference() {
        let source = PACK.replace(r#"abilities: ["bite"]"#, r#"abilities: ["gnaw"]"#);
        assert!(matches!(
            ContentPack::from_ron(&source),
            Err(ContentError::UnknownAbility { actor, ability }) if actor == "rat" && ability == "gnaw"
        ));
    }

    #[test]
    fn test_invalid_actor_rejected() {
        let source = PACK.replace("life: 10.0", "life: 0.0");
        assert!(matches!(ContentPack::from_ron(&source), Err(ContentError::InvalidActor { .. })));
    }

    #[test]
    fn test_template_to_spawn() {
        let pack = ContentPack::from_ron(PACK).expect("valid pack");
        let config = SimulationConfig::default();

        let hero = pack.actors[0].to_spawn(&config);
        assert_eq!(hero.body.class, TargetClass::Ally);
        assert!(hero.status.resistances.is_immune(None));
        assert_eq!(hero.status.hit_invulnerability_frames, config.default_hit_invulnerability_frames);

        let brazier = pack.actors[2].to_spawn(&config);
        assert_eq!(brazier.body.class, TargetClass::Object);
        assert_eq!(brazier.body.element_source, Some(Element::Fire));
        assert!(!brazier.vitals.can_be_knocked_back);
        assert!(Side::Hero.opponents().includes(brazier.body.class));
        assert!(!TargetClasses::ALLY.includes(brazier.body.class));
    }

    #[test]
    fn test_spawn_into_world_in_template_order() {
        let pack = ContentPack::from_ron(PACK).expect("valid pack");
        let mut world = World::new();

        let spawned = pack.spawn_into(&mut world).expect("spawned");
        let ids: Vec<ActorId> = spawned.iter().map(|(_, id)| *id).collect();
        assert_eq!(ids, vec![ActorId(0), ActorId(1), ActorId(2)]);

        let rat = spawned[1].0;
        let scheduler = world.get::<AbilityScheduler>(rat).expect("rat has abilities");
        assert_eq!(scheduler.slots().len(), 1);
        assert!(world.get::<AbilityScheduler>(spawned[0].0).is_none());
        assert!(world.get_resource::<AbilityTable>().is_some_and(|table| table.len() == 1));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            ContentPack::load("does/not/exist.ron"),
            Err(ContentError::Io { .. })
        ));
    }
}
