//! TargetResolver: nearest viable target for an actor.
//!
//! Чистые функции без side effects. Кандидаты приходят отсортированными по
//! ActorId (порядок регистрации), поэтому при равных дистанциях побеждает
//! первый найденный.

use bevy::prelude::*;

use crate::components::{ActorId, TargetClass, TargetClasses};
use crate::interfaces::TerrainQuery;

/// Snapshot of one potential target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetCandidate {
    pub id: ActorId,
    pub position: Vec2,
    pub class: TargetClass,
    pub alive: bool,
}

/// Resolved target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub id: ActorId,
    pub position: Vec2,
    pub distance: f32,
}

/// Range/visibility rules for one lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetResolver {
    pub max_radius: f32,
    pub classes: TargetClasses,
    pub require_line_of_sight: bool,
}

impl TargetResolver {
    pub fn new(max_radius: f32) -> Self {
        Self {
            max_radius,
            classes: TargetClasses::all(),
            require_line_of_sight: false,
        }
    }

    pub fn with_classes(mut self, classes: TargetClasses) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_line_of_sight(mut self, required: bool) -> Self {
        self.require_line_of_sight = required;
        self
    }

    /// Nearest alive candidate within `max_radius` (and in sight, if required).
    ///
    /// `seeker` is never returned as its own target.
    pub fn find_target(
        &self,
        origin: Vec2,
        seeker: Option<ActorId>,
        candidates: &[TargetCandidate],
        terrain: &dyn TerrainQuery,
    ) -> Option<Target> {
        if !(self.max_radius >= 0.0) {
            return None;
        }
        let radius_sq = self.max_radius * self.max_radius;
        let mut best: Option<(Target, f32)> = None;

        for candidate in candidates {
            if !candidate.alive || Some(candidate.id) == seeker || !self.classes.includes(candidate.class) {
                continue;
            }

            let distance_sq = origin.distance_squared(candidate.position);
            if distance_sq > radius_sq {
                continue;
            }

            // Строгое `<`: при равенстве остаётся первый найденный
            if best.as_ref().is_some_and(|(_, best_sq)| distance_sq >= *best_sq) {
                continue;
            }

            // LOS: самая дорогая проверка, делаем последней
            if self.require_line_of_sight && !terrain.line_of_sight(origin, candidate.position) {
                continue;
            }

            best = Some((
                Target {
                    id: candidate.id,
                    position: candidate.position,
                    distance: distance_sq.sqrt(),
                },
                distance_sq,
            ));
        }

        best.map(|(target, _)| target)
    }

    /// Unit direction to the nearest target (aim-dependent abilities).
    ///
    /// `None` when nothing qualifies or the target sits exactly on `origin`.
    pub fn find_target_direction(
        &self,
        origin: Vec2,
        seeker: Option<ActorId>,
        candidates: &[TargetCandidate],
        terrain: &dyn TerrainQuery,
    ) -> Option<Vec2> {
        self.find_target(origin, seeker, candidates, terrain)
            .and_then(|target| (target.position - origin).try_normalize())
    }
}

/// Собирает кандидатов в стабильном порядке (по ActorId).
pub fn sorted_candidates(iter: impl IntoIterator<Item = TargetCandidate>) -> Vec<TargetCandidate> {
    let mut candidates: Vec<_> = iter.into_iter().collect();
    candidates.sort_by_key(|candidate| candidate.id);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::{BlockGrid, OpenField};

    fn candidate(id: u32, x: f32, y: f32) -> TargetCandidate {
        TargetCandidate {
            id: ActorId(id),
            position: Vec2::new(x, y),
            class: TargetClass::Ally,
            alive: true,
        }
    }

    #[test]
    fn test_nearest_within_radius() {
        let candidates = vec![candidate(0, 8.0, 0.0), candidate(1, 3.0, 0.0), candidate(2, 20.0, 0.0)];
        let target = TargetResolver::new(10.0).find_target(Vec2::ZERO, None, &candidates, &OpenField);

        assert_eq!(target.map(|t| t.id), Some(ActorId(1)));
        assert!(TargetResolver::new(2.0)
            .find_target(Vec2::ZERO, None, &candidates, &OpenField)
            .is_none());
    }

    #[test]
    fn test_tie_goes_to_first_found() {
        let candidates = vec![candidate(4, 0.0, 5.0), candidate(7, 5.0, 0.0), candidate(9, -5.0, 0.0)];
        let target = TargetResolver::new(10.0).find_target(Vec2::ZERO, None, &candidates, &OpenField);
        assert_eq!(target.map(|t| t.id), Some(ActorId(4)));
    }

    #[test]
    fn test_skips_dead_self_and_wrong_class() {
        let mut dead = candidate(0, 1.0, 0.0);
        dead.alive = false;
        let mut object = candidate(1, 1.5, 0.0);
        object.class = TargetClass::Object;
        let me = candidate(2, 0.0, 0.0);
        let far = candidate(3, 4.0, 0.0);

        let candidates = vec![dead, object, me, far];
        let resolver = TargetResolver::new(10.0).with_classes(TargetClasses::ALLY);
        let target = resolver.find_target(Vec2::ZERO, Some(ActorId(2)), &candidates, &OpenField);

        assert_eq!(target.map(|t| t.id), Some(ActorId(3)));
    }

    #[test]
    fn test_line_of_sight_filters_hidden_targets() {
        let mut grid = BlockGrid::new(Vec2::new(-10.0, -10.0), 1.0, 20, 20);
        // Стена между (0,0) и (3,0)
        grid.set_solid(11, 10, true);

        let candidates = vec![candidate(0, 3.0, 0.5), candidate(1, 0.5, 6.0)];
        let origin = Vec2::new(0.5, 0.5);

        let blind = TargetResolver::new(10.0).find_target(origin, None, &candidates, &grid);
        assert_eq!(blind.map(|t| t.id), Some(ActorId(0)));

        let sighted = TargetResolver::new(10.0)
            .with_line_of_sight(true)
            .find_target(origin, None, &candidates, &grid);
        assert_eq!(sighted.map(|t| t.id), Some(ActorId(1)));
    }

    #[test]
    fn test_direction_is_unit_vector() {
        let candidates = vec![candidate(0, 3.0, 4.0)];
        let direction = TargetResolver::new(10.0)
            .find_target_direction(Vec2::ZERO, None, &candidates, &OpenField)
            .unwrap();

        assert!((direction.length() - 1.0).abs() < 1e-5);
        assert!((direction - Vec2::new(0.6, 0.8)).length() < 1e-5);
    }

    #[test]
    fn test_sorted_candidates_orders_by_id() {
        let sorted = sorted_candidates(vec![candidate(5, 0.0, 0.0), candidate(1, 0.0, 0.0)]);
        assert_eq!(sorted[0].id, ActorId(1));
    }
}
