//! Базовые компоненты акторов: ActorId, Side, Vitals, HitBody, Motion

use bevy::prelude::*;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::geometry::BodyShape;
use crate::status::{Element, StatusTracker};

/// Stable actor id, handed out in registration order.
///
/// Hit resolution and targeting iterate candidates sorted by this id, so two
/// runs with the same spawns resolve overlaps identically.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Reflect)]
#[reflect(Component)]
pub struct ActorId(pub u32);

/// Выдаёт ActorId по порядку регистрации.
#[derive(Resource, Debug, Default)]
pub struct ActorRegistry {
    next: u32,
}

impl ActorRegistry {
    pub fn register(&mut self) -> ActorId {
        let id = ActorId(self.next);
        self.next += 1;
        id
    }

    pub fn registered(&self) -> u32 {
        self.next
    }
}

/// Сторона конфликта (кто атакует).
///
/// Определяет, какой счётчик неуязвимости проверяется у цели.
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize,
)]
#[reflect(Component)]
pub enum Side {
    Hero,
    Enemy,
    #[default]
    Neutral,
}

impl Side {
    /// Классы целей, которые эта сторона бьёт по умолчанию.
    pub fn opponents(self) -> TargetClasses {
        match self {
            Side::Hero => TargetClasses::ENEMY | TargetClasses::OBJECT | TargetClasses::TILE,
            Side::Enemy => TargetClasses::ALLY,
            Side::Neutral => TargetClasses::ENEMY | TargetClasses::ALLY,
        }
    }

    /// Class this side's own actors register as.
    pub fn own_class(self) -> TargetClass {
        match self {
            Side::Hero => TargetClass::Ally,
            Side::Enemy | Side::Neutral => TargetClass::Enemy,
        }
    }

    /// Сторона после отражения снаряда.
    pub fn flipped(self) -> Side {
        match self {
            Side::Hero => Side::Enemy,
            Side::Enemy => Side::Hero,
            Side::Neutral => Side::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum TargetClass {
    Enemy,
    Ally,
    Object,
    Tile,
}

impl TargetClass {
    pub fn mask(self) -> TargetClasses {
        match self {
            TargetClass::Enemy => TargetClasses::ENEMY,
            TargetClass::Ally => TargetClasses::ALLY,
            TargetClass::Object => TargetClasses::OBJECT,
            TargetClass::Tile => TargetClasses::TILE,
        }
    }

    pub fn is_actor(self) -> bool {
        matches!(self, TargetClass::Enemy | TargetClass::Ally)
    }
}

bitflags! {
    /// Набор классов целей (hitEnemies / hitAllies / hitObjects / hitTiles).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TargetClasses: u8 {
        const ENEMY = 1 << 0;
        const ALLY = 1 << 1;
        const OBJECT = 1 << 2;
        const TILE = 1 << 3;
    }
}

impl TargetClasses {
    pub fn includes(self, class: TargetClass) -> bool {
        self.contains(class.mask())
    }

    /// Меняет местами ENEMY и ALLY (отражённый снаряд).
    pub fn swapped_sides(self) -> Self {
        let mut swapped = self & !(TargetClasses::ENEMY | TargetClasses::ALLY);
        if self.contains(TargetClasses::ENEMY) {
            swapped |= TargetClasses::ALLY;
        }
        if self.contains(TargetClasses::ALLY) {
            swapped |= TargetClasses::ENEMY;
        }
        swapped
    }
}

impl FromIterator<TargetClass> for TargetClasses {
    fn from_iter<I: IntoIterator<Item = TargetClass>>(iter: I) -> Self {
        iter.into_iter()
            .fold(TargetClasses::empty(), |mask, class| mask | class.mask())
    }
}

/// Жизнь актора (или прочность объекта)
///
/// Инвариант: 0 ≤ life ≤ max_life. `life <= 0`: поражение, его обрабатывает
/// lifecycle, а не HitResolver.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Vitals {
    pub life: f32,
    pub max_life: f32,
    pub can_be_knocked_back: bool,
    /// Knockback magnitude that interrupts the current ability (0 = never).
    pub stagger_threshold: f32,
}

impl Default for Vitals {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Vitals {
    pub fn new(max_life: f32) -> Self {
        Self {
            life: max_life,
            max_life,
            can_be_knocked_back: true,
            stagger_threshold: 0.0,
        }
    }

    pub fn immovable(mut self) -> Self {
        self.can_be_knocked_back = false;
        self
    }

    pub fn with_stagger_threshold(mut self, threshold: f32) -> Self {
        self.stagger_threshold = threshold;
        self
    }

    pub fn is_defeated(&self) -> bool {
        self.life <= 0.0
    }

    pub fn life_fraction(&self) -> f32 {
        if self.max_life <= 0.0 {
            return 0.0;
        }
        (self.life / self.max_life).clamp(0.0, 1.0)
    }

    /// Returns the amount actually removed.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        let applied = amount.max(0.0).min(self.life.max(0.0));
        self.life = (self.life - applied).max(0.0);
        applied
    }

    pub fn heal(&mut self, amount: f32) {
        self.life = (self.life + amount.max(0.0)).min(self.max_life);
    }
}

/// Хитбокс тела: класс цели + форма + особые свойства поверхности.
#[derive(Component, Debug, Clone)]
pub struct HitBody {
    pub class: TargetClass,
    pub shape: BodyShape,
    /// Отражает `reflectable` удары (зеркальный щит и т.п.)
    pub reflects: bool,
    /// Element handed to hits flagged `takes_element` (braziers, frost crystals).
    pub element_source: Option<Element>,
}

impl Default for HitBody {
    fn default() -> Self {
        Self::new(TargetClass::Enemy, BodyShape::default())
    }
}

impl HitBody {
    pub fn new(class: TargetClass, shape: BodyShape) -> Self {
        Self {
            class,
            shape,
            reflects: false,
            element_source: None,
        }
    }

    pub fn reflecting(mut self) -> Self {
        self.reflects = true;
        self
    }

    pub fn with_element_source(mut self, element: Element) -> Self {
        self.element_source = Some(element);
        self
    }
}

/// Knockback velocity (XY = ground, Z = altitude).
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Motion {
    pub velocity: Vec3,
}

/// Маркер: актор повержен (life <= 0). Не атакуется и не выбирается целью.
#[derive(Component, Debug, Default)]
pub struct Defeated;

/// Маркер: деспавн в конце текущего тика (sweep, а не удаление посреди итерации).
#[derive(Component, Debug, Default)]
pub struct PendingRemoval;

/// Участник боя. Required Components добавляют всё, что нужно HitResolver'у.
#[derive(Component, Debug, Default)]
#[require(Vitals, StatusTracker, HitBody, Motion, Side, Transform)]
pub struct Combatant;

/// Builder для спавна участника боя с корректным ActorId.
#[derive(Debug, Clone)]
pub struct CombatantSpawn {
    pub position: Vec2,
    pub side: Side,
    pub body: HitBody,
    pub vitals: Vitals,
    pub status: StatusTracker,
}

impl CombatantSpawn {
    pub fn new(side: Side, position: Vec2) -> Self {
        Self {
            position,
            side,
            body: HitBody::new(side.own_class(), BodyShape::default()),
            vitals: Vitals::default(),
            status: StatusTracker::default(),
        }
    }

    /// Неподвижный объект или тайл (ящик, жаровня, стена).
    pub fn object(class: TargetClass, position: Vec2, shape: BodyShape, durability: f32) -> Self {
        Self {
            position,
            side: Side::Neutral,
            body: HitBody::new(class, shape),
            vitals: Vitals::new(durability).immovable(),
            status: StatusTracker::default(),
        }
    }

    pub fn with_body(mut self, body: HitBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_vitals(mut self, vitals: Vitals) -> Self {
        self.vitals = vitals;
        self
    }

    pub fn with_status(mut self, status: StatusTracker) -> Self {
        self.status = status;
        self
    }

    fn components(self, id: ActorId) -> impl Bundle {
        (
            Combatant,
            id,
            self.side,
            self.body,
            self.vitals,
            self.status,
            Motion::default(),
            Transform::from_translation(self.position.extend(0.0)),
        )
    }

    pub fn spawn(self, commands: &mut Commands, registry: &mut ActorRegistry) -> (Entity, ActorId) {
        let id = registry.register();
        let entity = commands.spawn(self.components(id)).id();
        (entity, id)
    }

    /// Прямой спавн в World (тесты, headless runner).
    pub fn spawn_in(self, world: &mut World) -> (Entity, ActorId) {
        let id = world.get_resource_or_insert_with(ActorRegistry::default).register();
        let entity = world.spawn(self.components(id)).id();
        (entity, id)
    }
}
