//! Hit geometry on the ground plane.
//!
//! Everything here works in world XY (Z is altitude and only matters for
//! knockback). Hit shapes are approximations: axis-aligned boxes, circles and
//! ray segments. Degenerate shapes (zero extents, zero radius, zero-length ray)
//! never overlap anything.

use bevy::math::Vec2;

/// Axis-aligned box (center + half extents).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl Aabb {
    pub fn new(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self {
            center: (min + max) * 0.5,
            half_extents: (max - min) * 0.5,
        }
    }

    pub fn min(&self) -> Vec2 {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Vec2 {
        self.center + self.half_extents
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.half_extents.x > 0.0 && self.half_extents.y > 0.0)
            || !self.center.is_finite()
            || !self.half_extents.is_finite()
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        let min = self.min();
        let max = self.max();
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }

    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min(), self.max())
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        if self.is_degenerate() || other.is_degenerate() {
            return false;
        }
        let gap = (self.center - other.center).abs();
        let reach = self.half_extents + other.half_extents;
        gap.x < reach.x && gap.y < reach.y
    }
}

/// Shape of an attack instance (exactly one geometry per hit).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitShape {
    Box(Aabb),
    Circle { center: Vec2, radius: f32 },
    /// Segment from `origin` to `origin + delta`.
    Ray { origin: Vec2, delta: Vec2 },
}

impl HitShape {
    pub fn box_at(center: Vec2, half_extents: Vec2) -> Self {
        HitShape::Box(Aabb::new(center, half_extents))
    }

    pub fn circle(center: Vec2, radius: f32) -> Self {
        HitShape::Circle { center, radius }
    }

    pub fn ray(origin: Vec2, delta: Vec2) -> Self {
        HitShape::Ray { origin, delta }
    }

    pub fn segment(from: Vec2, to: Vec2) -> Self {
        HitShape::Ray {
            origin: from,
            delta: to - from,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        match *self {
            HitShape::Box(aabb) => aabb.is_degenerate(),
            HitShape::Circle { center, radius } => !(radius > 0.0) || !center.is_finite() || !radius.is_finite(),
            HitShape::Ray { origin, delta } => {
                !origin.is_finite() || !delta.is_finite() || delta.length_squared() <= f32::EPSILON
            }
        }
    }

    /// Reference point used for "knock away from hit".
    pub fn center(&self) -> Vec2 {
        match *self {
            HitShape::Box(aabb) => aabb.center,
            HitShape::Circle { center, .. } => center,
            HitShape::Ray { origin, delta } => origin + delta * 0.5,
        }
    }

    /// Where along the hit a point sits: ray parameter in [0, 1].
    /// Box and circle hits have no direction, every point is at 0.
    pub fn path_param(&self, point: Vec2) -> f32 {
        match *self {
            HitShape::Ray { origin, delta } if delta.length_squared() > f32::EPSILON => {
                ((point - origin).dot(delta) / delta.length_squared()).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    pub fn translated(&self, offset: Vec2) -> Self {
        match *self {
            HitShape::Box(aabb) => HitShape::Box(Aabb::new(aabb.center + offset, aabb.half_extents)),
            HitShape::Circle { center, radius } => HitShape::Circle {
                center: center + offset,
                radius,
            },
            HitShape::Ray { origin, delta } => HitShape::Ray {
                origin: origin + offset,
                delta,
            },
        }
    }

    /// Overlap test against a target body located at `position`.
    pub fn overlaps(&self, position: Vec2, body: &BodyShape) -> bool {
        if self.is_degenerate() || !position.is_finite() {
            return false;
        }

        match (*self, *body) {
            (HitShape::Box(aabb), BodyShape::Point) => aabb.contains_point(position),
            (HitShape::Box(aabb), BodyShape::Circle { radius }) => {
                if radius <= 0.0 {
                    return aabb.contains_point(position);
                }
                aabb.closest_point(position).distance_squared(position) <= radius * radius
            }
            (HitShape::Box(aabb), BodyShape::Box { half_extents }) => {
                aabb.intersects(&Aabb::new(position, half_extents))
            }
            (HitShape::Circle { center, radius }, BodyShape::Point) => {
                center.distance_squared(position) <= radius * radius
            }
            (HitShape::Circle { center, radius }, BodyShape::Circle { radius: body_radius }) => {
                let reach = radius + body_radius.max(0.0);
                center.distance_squared(position) <= reach * reach
            }
            (HitShape::Circle { center, radius }, BodyShape::Box { half_extents }) => {
                let body_box = Aabb::new(position, half_extents);
                if body_box.is_degenerate() {
                    return center.distance_squared(position) <= radius * radius;
                }
                body_box.closest_point(center).distance_squared(center) <= radius * radius
            }
            (HitShape::Ray { origin, delta }, BodyShape::Point) => {
                segment_distance_squared(origin, delta, position) <= f32::EPSILON
            }
            (HitShape::Ray { origin, delta }, BodyShape::Circle { radius }) => {
                let radius = radius.max(0.0);
                segment_distance_squared(origin, delta, position) <= radius * radius
            }
            (HitShape::Ray { origin, delta }, BodyShape::Box { half_extents }) => {
                let body_box = Aabb::new(position, half_extents);
                if body_box.is_degenerate() {
                    return false;
                }
                segment_intersects_aabb(origin, delta, &body_box)
            }
        }
    }
}

/// Shape of a hittable body, relative to its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Point,
    Circle { radius: f32 },
    Box { half_extents: Vec2 },
}

impl Default for BodyShape {
    fn default() -> Self {
        BodyShape::Circle { radius: 0.5 }
    }
}

/// Squared distance from `point` to the segment `origin..origin + delta`.
pub fn segment_distance_squared(origin: Vec2, delta: Vec2, point: Vec2) -> f32 {
    let len_sq = delta.length_squared();
    if len_sq <= f32::EPSILON {
        return origin.distance_squared(point);
    }
    let t = ((point - origin).dot(delta) / len_sq).clamp(0.0, 1.0);
    (origin + delta * t).distance_squared(point)
}

/// Slab test: does the segment touch the box?
pub fn segment_intersects_aabb(origin: Vec2, delta: Vec2, aabb: &Aabb) -> bool {
    let min = aabb.min();
    let max = aabb.max();
    let mut t_enter = 0.0_f32;
    let mut t_exit = 1.0_f32;

    for axis in 0..2 {
        let o = origin[axis];
        let d = delta[axis];
        if d.abs() <= f32::EPSILON {
            // Параллельно оси: либо внутри slab'а, либо мимо
            if o < min[axis] || o > max[axis] {
                return false;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (min[axis] - o) * inv;
        let mut t2 = (max[axis] - o) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_enter = t_enter.max(t1);
        t_exit = t_exit.min(t2);
        if t_enter > t_exit {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_intersection() {
        let a = Aabb::new(Vec2::ZERO, Vec2::splat(1.0));
        let b = Aabb::new(Vec2::new(1.5, 0.0), Vec2::splat(1.0));
        let c = Aabb::new(Vec2::new(3.0, 0.0), Vec2::splat(0.5));

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_point_in_circle() {
        let hit = HitShape::circle(Vec2::ZERO, 2.0);
        assert!(hit.overlaps(Vec2::new(1.0, 1.0), &BodyShape::Point));
        assert!(!hit.overlaps(Vec2::new(2.0, 1.0), &BodyShape::Point));
    }

    #[test]
    fn test_circle_vs_body_box() {
        let hit = HitShape::circle(Vec2::ZERO, 1.0);
        let body = BodyShape::Box {
            half_extents: Vec2::splat(0.5),
        };
        assert!(hit.overlaps(Vec2::new(1.4, 0.0), &body));
        assert!(!hit.overlaps(Vec2::new(1.6, 0.0), &body));
    }

    #[test]
    fn test_ray_vs_box_and_circle() {
        let hit = HitShape::segment(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0));
        let body_box = BodyShape::Box {
            half_extents: Vec2::splat(0.5),
        };
        assert!(hit.overlaps(Vec2::new(2.0, 0.4), &body_box));
        assert!(!hit.overlaps(Vec2::new(2.0, 0.6), &body_box));
        // За концом отрезка
        assert!(!hit.overlaps(Vec2::new(6.0, 0.0), &body_box));

        let body_circle = BodyShape::Circle { radius: 0.5 };
        assert!(hit.overlaps(Vec2::new(0.0, 0.3), &body_circle));
        assert!(!hit.overlaps(Vec2::new(0.0, 0.8), &body_circle));
    }

    #[test]
    fn test_degenerate_shapes_never_overlap() {
        let body = BodyShape::Circle { radius: 10.0 };
        assert!(!HitShape::circle(Vec2::ZERO, 0.0).overlaps(Vec2::ZERO, &body));
        assert!(!HitShape::ray(Vec2::ZERO, Vec2::ZERO).overlaps(Vec2::ZERO, &body));
        assert!(!HitShape::box_at(Vec2::ZERO, Vec2::new(1.0, 0.0)).overlaps(Vec2::ZERO, &body));
    }
}
