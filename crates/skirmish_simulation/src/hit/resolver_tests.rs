//! Tests for HitResolver.

#[cfg(test)]
mod tests {
    use super::super::description::*;
    use super::super::resolver::*;
    use crate::components::{ActorId, HitBody, Side, TargetClass, TargetClasses, Vitals};
    use crate::geometry::BodyShape;
    use crate::status::{Element, Resistances, ShieldState, StatusTracker};
    use bevy::prelude::*;

    struct Dummy {
        id: ActorId,
        position: Vec2,
        body: HitBody,
        vitals: Vitals,
        status: StatusTracker,
    }

    impl Dummy {
        fn new(id: u32, class: TargetClass, x: f32, y: f32) -> Self {
            Self {
                id: ActorId(id),
                position: Vec2::new(x, y),
                body: HitBody::new(class, BodyShape::Circle { radius: 0.5 }),
                vitals: Vitals::new(100.0),
                status: StatusTracker::default(),
            }
        }
    }

    fn candidates(dummies: &mut [Dummy]) -> Vec<HitCandidate<'_>> {
        dummies
            .iter_mut()
            .map(|dummy| HitCandidate {
                id: dummy.id,
                position: dummy.position,
                body: &dummy.body,
                vitals: &mut dummy.vitals,
                status: &mut dummy.status,
            })
            .collect()
    }

    fn nova(damage: f32) -> HitDescriptionBuilder {
        HitDescription::builder()
            .circle(Vec2::ZERO, 5.0)
            .damage(damage)
            .side(Side::Hero)
            .classes(TargetClasses::ENEMY)
    }

    #[test]
    fn test_zero_candidates_is_noop() {
        let outcome = resolve(&nova(10.0).build().unwrap(), &mut []);
        assert!(!outcome.hit);
        assert!(outcome.targets_hit.is_empty());
        assert_eq!(outcome.damage_dealt, 0.0);
    }

    #[test]
    fn test_shield_absorbs_before_life() {
        let mut dummies = vec![Dummy::new(0, TargetClass::Enemy, 1.0, 0.0)];
        dummies[0].status.shield = ShieldState::new(6.0, 0.0, 0.0);

        let hit = nova(10.0).can_damage_shields(true).build().unwrap();
        let outcome = resolve(&hit, &mut candidates(&mut dummies));

        assert!(outcome.hit);
        assert_eq!(dummies[0].status.shield.charge, 0.0);
        assert_eq!(dummies[0].vitals.life, 96.0);
        assert_eq!(outcome.damage_dealt, 10.0);

        // Щит пуст: следующий удар целиком в life
        let outcome = resolve(&hit, &mut candidates(&mut dummies));
        assert_eq!(outcome.damage_dealt, 10.0);
        assert_eq!(dummies[0].vitals.life, 86.0);
    }

    #[test]
    fn test_shield_blocks_hits_that_cannot_damage_it() {
        let mut dummies = vec![
            Dummy::new(0, TargetClass::Enemy, 1.0, 0.0),
            Dummy::new(1, TargetClass::Enemy, -1.0, 0.0),
        ];
        dummies[0].status.shield = ShieldState::new(6.0, 0.0, 0.0);

        let outcome = resolve(&nova(10.0).build().unwrap(), &mut candidates(&mut dummies));

        assert!(outcome.blocked);
        assert!(outcome.stopped);
        assert!(!outcome.hit);
        assert_eq!(dummies[0].vitals.life, 100.0);
        assert_eq!(dummies[0].status.shield.charge, 6.0);
        // Непробивающий удар остановлен щитом: второй не задет
        assert_eq!(dummies[1].vitals.life, 100.0);
    }

    #[test]
    fn test_non_piercing_hits_first_in_registration_order() {
        let mut dummies = vec![
            Dummy::new(7, TargetClass::Enemy, 0.5, 0.0),
            Dummy::new(3, TargetClass::Enemy, -0.5, 0.0),
        ];
        let hit = HitDescription::builder()
            .box_at(Vec2::ZERO, Vec2::splat(2.0))
            .damage(10.0)
            .side(Side::Hero)
            .build()
            .unwrap();

        let outcome = resolve(&hit, &mut candidates(&mut dummies));

        assert_eq!(outcome.targets_hit, vec![ActorId(3)]);
        assert!(outcome.stopped);
        assert_eq!(dummies[1].vitals.life, 90.0);
        assert_eq!(dummies[0].vitals.life, 100.0);
    }

    #[test]
    fn test_piercing_hits_each_target_once() {
        let mut dummies = vec![
            Dummy::new(0, TargetClass::Enemy, 1.0, 0.0),
            Dummy::new(1, TargetClass::Enemy, 2.0, 0.0),
            Dummy::new(0, TargetClass::Enemy, 1.0, 0.0),
        ];
        let hit = HitDescription::builder()
            .ray(Vec2::ZERO, Vec2::new(5.0, 0.0))
            .damage(5.0)
            .side(Side::Hero)
            .piercing(true)
            .build()
            .unwrap();

        let outcome = resolve(&hit, &mut candidates(&mut dummies));

        assert_eq!(outcome.targets_hit, vec![ActorId(0), ActorId(1)]);
        assert!(outcome.pierced);
        assert!(!outcome.stopped);
        assert_eq!(outcome.damage_dealt, 10.0);
    }

    #[test]
    fn test_immunity_zeroes_damage_but_connects() {
        let mut dummies = vec![Dummy::new(0, TargetClass::Enemy, 1.0, 0.0)];
        dummies[0].status.resistances = Resistances::default()
            .immune_to([Some(Element::Fire)])
            .with_multiplier(Some(Element::Fire), 3.0);

        let hit = nova(20.0)
            .element(Some(Element::Fire))
            .knockback(KnockbackRule::AwayFromHit { lift: 0.0 })
            .knockback_force(2.0)
            .build()
            .unwrap();
        let outcome = resolve(&hit, &mut candidates(&mut dummies));

        assert!(outcome.hit);
        assert_eq!(outcome.damage_dealt, 0.0);
        assert_eq!(dummies[0].vitals.life, 100.0);
        assert!(outcome.impact(ActorId(0)).is_some_and(|impact| impact.immune));
        assert!((outcome.knockback_vector - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_elemental_multiplier_scales_damage() {
        let mut dummies = vec![Dummy::new(0, TargetClass::Enemy, 1.0, 0.0)];
        dummies[0].status.resistances = Resistances::default().with_multiplier(Some(Element::Ice), 1.5);

        let outcome = resolve(
            &nova(10.0).element(Some(Element::Ice)).build().unwrap(),
            &mut candidates(&mut dummies),
        );
        assert_eq!(outcome.damage_dealt, 15.0);
        assert_eq!(dummies[0].vitals.life, 85.0);
    }

    #[test]
    fn test_physical_immunity() {
        let mut dummies = vec![Dummy::new(0, TargetClass::Enemy, 1.0, 0.0)];
        dummies[0].status.resistances = Resistances::default().immune_to([None]);

        let outcome = resolve(&nova(10.0).build().unwrap(), &mut candidates(&mut dummies));
        assert!(outcome.hit);
        assert_eq!(outcome.damage_dealt, 0.0);
    }

    #[test]
    fn test_invulnerable_target_is_skipped_by_matching_role() {
        let mut dummies = vec![Dummy::new(0, TargetClass::Enemy, 1.0, 0.0)];
        dummies[0].status.start_invulnerability(Side::Hero, 5);

        let outcome = resolve(&nova(10.0).build().unwrap(), &mut candidates(&mut dummies));
        assert!(!outcome.hit);
        assert_eq!(dummies[0].vitals.life, 100.0);

        // Другой счётчик удар со стороны Enemy не блокирует
        let enemy_hit = HitDescription::builder()
            .circle(Vec2::ZERO, 5.0)
            .damage(10.0)
            .side(Side::Enemy)
            .classes(TargetClasses::ENEMY)
            .build()
            .unwrap();
        let outcome = resolve(&enemy_hit, &mut candidates(&mut dummies));
        assert!(outcome.hit);
        assert_eq!(dummies[0].vitals.life, 90.0);
    }

    #[test]
    fn test_can_always_knockback_pushes_invulnerable_target_without_damage() {
        let mut dummies = vec![Dummy::new(0, TargetClass::Enemy, 0.0, 1.0)];
        dummies[0].status.start_invulnerability(Side::Hero, 5);

        let hit = nova(10.0)
            .knockback(KnockbackRule::Explicit(Vec3::new(0.0, 3.0, 1.0)))
            .can_always_knockback(true)
            .build()
            .unwrap();
        let outcome = resolve(&hit, &mut candidates(&mut dummies));

        assert!(outcome.hit);
        assert_eq!(outcome.damage_dealt, 0.0);
        assert_eq!(dummies[0].vitals.life, 100.0);
        assert_eq!(outcome.knockback_vector, Vec3::new(0.0, 3.0, 1.0));
    }

    #[test]
    fn test_damage_starts_invulnerability_window() {
        let mut dummies = vec![Dummy::new(0, TargetClass::Enemy, 1.0, 0.0)];
        dummies[0].status.hit_invulnerability_frames = 12;

        let hit = nova(10.0).build().unwrap();
        resolve(&hit, &mut candidates(&mut dummies));
        assert_eq!(dummies[0].status.enemy_invulnerable_frames, 12);

        // Второй удар в том же окне не проходит
        let outcome = resolve(&hit, &mut candidates(&mut dummies));
        assert!(!outcome.hit);
        assert_eq!(dummies[0].vitals.life, 90.0);
    }

    #[test]
    fn test_unmovable_targets_get_no_knockback() {
        let mut dummies = vec![
            Dummy::new(0, TargetClass::Enemy, 1.0, 0.0),
            Dummy::new(1, TargetClass::Object, -1.0, 0.0),
        ];
        dummies[0].vitals = Vitals::new(100.0).immovable();

        let hit = nova(1.0)
            .classes(TargetClasses::ENEMY | TargetClasses::OBJECT)
            .knockback(KnockbackRule::AwayFromHit { lift: 0.0 })
            .piercing(true)
            .build()
            .unwrap();
        let outcome = resolve(&hit, &mut candidates(&mut dummies));

        assert_eq!(outcome.targets_hit.len(), 2);
        assert!(outcome.impacts.iter().all(|impact| impact.knockback == Vec3::ZERO));
    }

    #[test]
    fn test_object_destroyed_and_stops_hit() {
        let mut dummies = vec![
            Dummy::new(0, TargetClass::Object, 1.0, 0.0),
            Dummy::new(1, TargetClass::Enemy, 2.0, 0.0),
        ];
        dummies[0].vitals = Vitals::new(5.0).immovable();

        let hit = HitDescription::builder()
            .ray(Vec2::ZERO, Vec2::new(4.0, 0.0))
            .damage(8.0)
            .side(Side::Hero)
            .build()
            .unwrap();
        let outcome = resolve(&hit, &mut candidates(&mut dummies));

        assert!(outcome.destroyed);
        assert!(outcome.stopped);
        assert_eq!(outcome.damage_dealt, 5.0);
        assert_eq!(dummies[1].vitals.life, 100.0);
    }

    #[test]
    fn test_stop_on_mask_lets_hit_continue_through_other_classes() {
        let mut dummies = vec![
            Dummy::new(0, TargetClass::Enemy, 1.0, 0.0),
            Dummy::new(1, TargetClass::Object, 2.0, 0.0),
            Dummy::new(2, TargetClass::Enemy, 3.0, 0.0),
        ];
        let hit = HitDescription::builder()
            .ray(Vec2::ZERO, Vec2::new(5.0, 0.0))
            .damage(1.0)
            .side(Side::Hero)
            .stop_on(TargetClasses::OBJECT | TargetClasses::TILE)
            .build()
            .unwrap();
        let outcome = resolve(&hit, &mut candidates(&mut dummies));

        assert_eq!(outcome.targets_hit, vec![ActorId(0), ActorId(1)]);
        assert!(outcome.stopped);
    }

    #[test]
    fn test_reflect_stops_without_damage() {
        let mut dummies = vec![Dummy::new(0, TargetClass::Enemy, 1.0, 0.0)];
        dummies[0].body = dummies[0].body.clone().reflecting();

        let hit = nova(10.0).reflectable(true).piercing(true).build().unwrap();
        let outcome = resolve(&hit, &mut candidates(&mut dummies));

        assert!(outcome.reflected);
        assert!(outcome.stopped);
        assert!(!outcome.hit);
        assert_eq!(dummies[0].vitals.life, 100.0);
    }

    #[test]
    fn test_element_source_ignites_hit() {
        let mut dummies = vec![
            Dummy::new(0, TargetClass::Object, 1.0, 0.0),
            Dummy::new(1, TargetClass::Enemy, 3.0, 0.0),
        ];
        dummies[0].body = dummies[0].body.clone().with_element_source(Element::Fire);
        dummies[1].status.resistances = Resistances::default().with_multiplier(Some(Element::Fire), 2.0);

        let hit = HitDescription::builder()
            .ray(Vec2::ZERO, Vec2::new(5.0, 0.0))
            .damage(10.0)
            .side(Side::Hero)
            .takes_element(true)
            .build()
            .unwrap();
        let outcome = resolve(&hit, &mut candidates(&mut dummies));

        assert_eq!(outcome.set_element, Some(Element::Fire));
        assert_eq!(outcome.targets_hit, vec![ActorId(1)]);
        assert_eq!(dummies[1].vitals.life, 80.0);
        assert_eq!(dummies[0].vitals.life, 100.0);
    }

    fn fire_ray() -> HitDescription {
        HitDescription::builder()
            .ray(Vec2::ZERO, Vec2::new(6.0, 0.0))
            .damage(10.0)
            .side(Side::Hero)
            .piercing(true)
            .takes_element(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_element_source_before_target_applies_regardless_of_id() {
        // Враг раньше по id, но жаровня раньше по пути
        let mut dummies = vec![
            Dummy::new(1, TargetClass::Enemy, 4.0, 0.0),
            Dummy::new(2, TargetClass::Object, 1.0, 0.0),
        ];
        dummies[0].status.resistances = Resistances::default().with_multiplier(Some(Element::Fire), 2.0);
        dummies[1].body = dummies[1].body.clone().with_element_source(Element::Fire);

        let outcome = resolve(&fire_ray(), &mut candidates(&mut dummies));

        assert_eq!(dummies[0].vitals.life, 80.0);
        assert_eq!(outcome.impact(ActorId(1)).and_then(|impact| impact.element), Some(Element::Fire));
        assert_eq!(outcome.set_element, Some(Element::Fire));
    }

    #[test]
    fn test_element_source_behind_target_does_not_apply() {
        let mut dummies = vec![
            Dummy::new(1, TargetClass::Enemy, 1.0, 0.0),
            Dummy::new(2, TargetClass::Object, 4.0, 0.0),
        ];
        dummies[0].status.resistances = Resistances::default().with_multiplier(Some(Element::Fire), 2.0);
        dummies[1].body = dummies[1].body.clone().with_element_source(Element::Fire);

        let outcome = resolve(&fire_ray(), &mut candidates(&mut dummies));

        // Физический урон по врагу, огонь подхвачен уже после него
        assert_eq!(dummies[0].vitals.life, 90.0);
        assert_eq!(outcome.impact(ActorId(1)).and_then(|impact| impact.element), None);
        assert_eq!(outcome.set_element, Some(Element::Fire));
    }

    #[test]
    fn test_stopped_hit_does_not_pick_up_element_past_stop() {
        let mut dummies = vec![
            Dummy::new(1, TargetClass::Enemy, 1.0, 0.0),
            Dummy::new(2, TargetClass::Object, 4.0, 0.0),
        ];
        dummies[1].body = dummies[1].body.clone().with_element_source(Element::Fire);

        let hit = HitDescription::builder()
            .ray(Vec2::ZERO, Vec2::new(6.0, 0.0))
            .damage(10.0)
            .side(Side::Hero)
            .takes_element(true)
            .build()
            .unwrap();
        let outcome = resolve(&hit, &mut candidates(&mut dummies));

        assert!(outcome.stopped);
        assert_eq!(outcome.set_element, None);
    }

    #[test]
    fn test_piercing_hit_through_shield_reports_block_and_pierce() {
        let mut dummies = vec![
            Dummy::new(0, TargetClass::Enemy, 1.0, 0.0),
            Dummy::new(1, TargetClass::Enemy, 2.0, 0.0),
        ];
        dummies[0].status.shield = ShieldState::new(10.0, 0.0, 0.0);

        // Классы остановки пусты: pierced может выставить только щит
        let hit = nova(10.0).piercing(true).stop_on(TargetClasses::empty()).build().unwrap();
        let outcome = resolve(&hit, &mut candidates(&mut dummies));

        assert!(outcome.blocked);
        assert!(outcome.pierced);
        assert!(!outcome.stopped);
        assert_eq!(outcome.targets_hit, vec![ActorId(1)]);
        assert!(outcome.impact(ActorId(0)).is_some_and(|impact| impact.blocked));
    }

    #[test]
    fn test_ignore_set_source_and_defeated_are_skipped() {
        let mut dummies = vec![
            Dummy::new(0, TargetClass::Enemy, 1.0, 0.0),
            Dummy::new(1, TargetClass::Enemy, 1.0, 1.0),
            Dummy::new(2, TargetClass::Enemy, -1.0, 0.0),
        ];
        dummies[2].vitals.life = 0.0;

        let hit = nova(10.0).source(ActorId(1)).ignore([ActorId(0)]).build().unwrap();
        let outcome = resolve(&hit, &mut candidates(&mut dummies));

        assert!(!outcome.hit);
    }

    #[test]
    fn test_successful_hit_resets_shield_regen_timer() {
        let mut dummies = vec![Dummy::new(0, TargetClass::Enemy, 1.0, 0.0)];
        dummies[0].status.since_hit_ms = 5000.0;

        resolve(&nova(1.0).build().unwrap(), &mut candidates(&mut dummies));
        assert_eq!(dummies[0].status.since_hit_ms, 0.0);
    }

    #[test]
    fn test_degenerate_shape_never_hits() {
        let mut dummies = vec![Dummy::new(0, TargetClass::Enemy, 0.0, 0.0)];
        let hit = HitDescription::builder()
            .circle(Vec2::ZERO, 0.0)
            .damage(10.0)
            .side(Side::Hero)
            .build()
            .unwrap();

        let outcome = resolve(&hit, &mut candidates(&mut dummies));
        assert!(!outcome.hit);
        assert_eq!(dummies[0].vitals.life, 100.0);
    }
}
