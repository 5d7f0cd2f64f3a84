//! SKIRMISH Simulation Core
//!
//! Ядро боевой симуляции на Bevy 0.16 (headless, fixed timestep):
//! - TargetResolver: ближайшая подходящая цель
//! - AbilityRuntime / AbilityScheduler: заряды, кулдауны, фазы способностей
//! - HitResolver: HitDescription → HitOutcome (щиты, иммунитеты, knockback)
//! - StatusTracker: окна неуязвимости, щиты, сопротивления
//!
//! Рендер, звук, диалоги и физика мира: коллабораторы за узкими
//! интерфейсами (`interfaces`). Ядро их только вызывает.

use bevy::ecs::event::event_update_system;
use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod ability;
pub mod boss;
pub mod components;
pub mod config;
pub mod content;
pub mod geometry;
pub mod hazard;
pub mod hit;
pub mod interfaces;
pub mod lifecycle;
pub mod logger;
pub mod projectile;
pub mod status;
pub mod targeting;

// Re-export для удобства
pub use ability::{
    AbilityBehavior, AbilityController, AbilityDefinition, AbilityPhase, AbilityPlugin, AbilityRuntime,
    AbilityScheduler, AbilityTable, AbilityTarget, AbilityTransition, CancelAbility, CancelReason, CombatCommands,
    SelectionPolicy, Transition, TriggerOutcome,
};
pub use boss::{BossEnraged, BossPlugin, BossState};
pub use components::*;
pub use config::SimulationConfig;
pub use content::{ActorTemplate, ContentError, ContentPack};
pub use geometry::{Aabb, BodyShape, HitShape};
pub use hazard::{Hazard, HazardSpawn};
pub use hit::{
    DamageDealt, HitDescription, HitDescriptionError, HitOutcome, HitPlugin, HitRequest, HitResolved,
    KnockbackRule, TargetImpact,
};
pub use interfaces::{
    BlockGrid, EffectParams, InterfacesPlugin, OpenField, PlaySound, ScriptLine, SpawnEffect, StoryFlags, Terrain,
    TerrainQuery,
};
pub use lifecycle::{ActorDefeated, LifecyclePlugin};
pub use projectile::{Projectile, ProjectileLaunch};
pub use status::{Element, ElementMask, Resistances, ShieldState, StatusPlugin, StatusTracker};
pub use targeting::{Target, TargetCandidate, TargetResolver};

/// Порядок боевого тика (FixedUpdate, строго последовательно).
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatSet {
    /// Счётчики неуязвимости, регенерация щитов
    Status,
    /// Отмены → кулдауны → выбор → фазы → команды
    Abilities,
    /// Удары способностей, снаряды, зоны
    Hits,
    /// Интеграция knockback'а
    Motion,
    /// Пороги ярости
    Bosses,
    /// Defeat + sweep
    Lifecycle,
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz (перезаписывается конфигом контента)
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            .init_resource::<SimulationConfig>()
            .init_resource::<ActorRegistry>()
            .configure_sets(
                FixedUpdate,
                (
                    CombatSet::Status,
                    CombatSet::Abilities,
                    CombatSet::Hits,
                    CombatSet::Motion,
                    CombatSet::Bosses,
                    CombatSet::Lifecycle,
                )
                    .chain(),
            )
            .add_plugins((
                InterfacesPlugin,
                StatusPlugin,
                AbilityPlugin,
                HitPlugin,
                BossPlugin,
                LifecyclePlugin,
            ));

        // Детерминистичный RNG (seed по умолчанию, если хост не задал свой)
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(SimulationConfig::default().seed));
        }
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт headless Bevy App с полной боевой симуляцией
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    logger::init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .add_plugins(SimulationPlugin);

    app
}

/// Прогоняет ровно `ticks` фиксированных шагов (без зависимости от wall clock).
///
/// Перед каждым тиком меняются буферы событий (как `First` в `app.update()`),
/// поэтому после тика `iter_current_update_events` отдаёт события только
/// этого тика, а старше двух тиков события удаляются.
pub fn run_fixed_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        let world = app.world_mut();
        if let Err(error) = world.run_system_cached(event_update_system) {
            logger::log_error(&format!("Event update failed: {:?}", error));
        }
        let timestep = world.resource::<Time<Fixed>>().timestep();
        world.resource_mut::<Time<Fixed>>().advance_by(timestep);
        world.run_schedule(FixedUpdate);
    }
}

/// Snapshot мира для сравнения детерминизма
///
/// Сортируем по ActorId (а не Entity), чтобы снимок не зависел от
/// переиспользования entity индексов.
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(&ActorId, &T)>();
    let mut rows: Vec<_> = query.iter(world).collect();
    rows.sort_by_key(|(id, _)| **id);

    // Сериализуем в байты через Debug (простейший способ)
    for (id, component) in rows {
        snapshot.extend_from_slice(&id.0.to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
