//! Narrow interfaces to collaborators outside the combat core.
//!
//! - Terrain: `is_solid_at`, `line_of_sight` (resource wrapping a trait object)
//! - Visual/audio: `SpawnEffect`, `PlaySound` events (fire-and-forget)
//! - Persistence: `StoryFlags` resource (`set_flag` / `get_flag`)
//! - Dialogue: `ScriptLine` events (ядро только ставит в очередь)

use bevy::prelude::*;
use std::collections::HashSet;

/// Spatial/terrain query consumed by targeting and projectiles.
pub trait TerrainQuery: Send + Sync {
    fn is_solid_at(&self, point: Vec2) -> bool;
    fn line_of_sight(&self, from: Vec2, to: Vec2) -> bool;
}

/// Пустая арена: ничего не твёрдое, всё видно.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenField;

impl TerrainQuery for OpenField {
    fn is_solid_at(&self, _point: Vec2) -> bool {
        false
    }

    fn line_of_sight(&self, _from: Vec2, _to: Vec2) -> bool {
        true
    }
}

/// Uniform grid of solid/open cells. Outside the grid counts as open.
#[derive(Debug, Clone)]
pub struct BlockGrid {
    pub origin: Vec2,
    pub cell_size: f32,
    pub width: usize,
    pub height: usize,
    solid: Vec<bool>,
}

impl BlockGrid {
    pub fn new(origin: Vec2, cell_size: f32, width: usize, height: usize) -> Self {
        Self {
            origin,
            cell_size: cell_size.max(f32::EPSILON),
            width,
            height,
            solid: vec![false; width * height],
        }
    }

    pub fn set_solid(&mut self, x: usize, y: usize, solid: bool) {
        if x < self.width && y < self.height {
            self.solid[y * self.width + x] = solid;
        }
    }

    fn cell_at(&self, point: Vec2) -> Option<usize> {
        let local = (point - self.origin) / self.cell_size;
        if local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let (x, y) = (local.x as usize, local.y as usize);
        (x < self.width && y < self.height).then_some(y * self.width + x)
    }
}

impl TerrainQuery for BlockGrid {
    fn is_solid_at(&self, point: Vec2) -> bool {
        self.cell_at(point).is_some_and(|index| self.solid[index])
    }

    fn line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        // Сэмплируем отрезок с шагом в четверть клетки
        let step = self.cell_size * 0.25;
        let length = from.distance(to);
        let samples = (length / step).ceil() as usize;
        (0..=samples).all(|i| {
            let t = if samples == 0 { 0.0 } else { i as f32 / samples as f32 };
            !self.is_solid_at(from.lerp(to, t))
        })
    }
}

/// Terrain collaborator, swapped on zone transition.
#[derive(Resource)]
pub struct Terrain(pub Box<dyn TerrainQuery>);

impl Default for Terrain {
    fn default() -> Self {
        Self(Box::new(OpenField))
    }
}

impl Terrain {
    pub fn new(query: impl TerrainQuery + 'static) -> Self {
        Self(Box::new(query))
    }

    pub fn query(&self) -> &dyn TerrainQuery {
        self.0.as_ref()
    }
}

/// One-time story/enrage flags (read/write only, без транзакций).
#[derive(Resource, Debug, Default, Clone)]
pub struct StoryFlags {
    flags: HashSet<String>,
}

impl StoryFlags {
    pub fn set_flag(&mut self, key: impl Into<String>) {
        self.flags.insert(key.into());
    }

    pub fn get_flag(&self, key: &str) -> bool {
        self.flags.contains(key)
    }
}

/// Optional knobs for a visual effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParams {
    pub scale: f32,
    pub duration_ms: f32,
    pub direction: Vec2,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            duration_ms: 0.0,
            direction: Vec2::ZERO,
        }
    }
}

/// Событие: заспавнить визуальный эффект (телеграф, искры, взрыв).
#[derive(Event, Debug, Clone)]
pub struct SpawnEffect {
    pub kind: String,
    pub position: Vec2,
    pub params: EffectParams,
}

/// Событие: проиграть звук.
#[derive(Event, Debug, Clone)]
pub struct PlaySound {
    pub id: String,
}

/// Событие: строка в очередь диалогов.
#[derive(Event, Debug, Clone)]
pub struct ScriptLine {
    pub text: String,
}

/// Регистрирует ресурсы и события коллабораторов.
pub struct InterfacesPlugin;

impl Plugin for InterfacesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Terrain>()
            .init_resource::<StoryFlags>()
            .add_event::<SpawnEffect>()
            .add_event::<PlaySound>()
            .add_event::<ScriptLine>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_grid_solid_and_los() {
        let mut grid = BlockGrid::new(Vec2::ZERO, 1.0, 10, 10);
        grid.set_solid(5, 0, true);

        assert!(grid.is_solid_at(Vec2::new(5.5, 0.5)));
        assert!(!grid.is_solid_at(Vec2::new(4.5, 0.5)));
        // За пределами сетки: открыто
        assert!(!grid.is_solid_at(Vec2::new(-3.0, 0.5)));

        assert!(!grid.line_of_sight(Vec2::new(0.5, 0.5), Vec2::new(9.5, 0.5)));
        assert!(grid.line_of_sight(Vec2::new(0.5, 2.5), Vec2::new(9.5, 2.5)));
    }

    #[test]
    fn test_story_flags() {
        let mut flags = StoryFlags::default();
        assert!(!flags.get_flag("golem_enraged"));
        flags.set_flag("golem_enraged");
        assert!(flags.get_flag("golem_enraged"));
    }
}
