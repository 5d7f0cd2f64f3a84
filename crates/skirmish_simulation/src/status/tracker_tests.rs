//! Tests for StatusTracker.

#[cfg(test)]
mod tests {
    use super::super::tracker::*;
    use crate::components::Side;

    #[test]
    fn test_invulnerability_counts_down_per_tick() {
        let mut status = StatusTracker::default();
        status.start_invulnerability(Side::Enemy, 2);
        assert!(status.is_invulnerable_to(Side::Enemy));
        assert!(!status.is_invulnerable_to(Side::Hero));

        // Тик, в котором окно открыто, не считается
        status.tick(16.0);
        assert!(status.is_invulnerable_to(Side::Enemy));
        status.tick(16.0);
        assert!(status.is_invulnerable_to(Side::Enemy));
        status.tick(16.0);
        assert!(!status.is_invulnerable_to(Side::Enemy));
    }

    #[test]
    fn test_single_frame_window_protects_one_tick() {
        let mut status = StatusTracker::default();
        status.start_invulnerability(Side::Hero, 1);

        status.tick(16.0);
        assert!(status.is_invulnerable_to(Side::Hero));
        status.tick(16.0);
        assert!(!status.is_invulnerable_to(Side::Hero));
    }

    #[test]
    fn test_invulnerability_roles_are_asymmetric() {
        let mut status = StatusTracker::default();
        status.start_invulnerability(Side::Hero, 10);

        assert_eq!(status.enemy_invulnerable_frames, 10);
        assert_eq!(status.invulnerable_frames, 0);
        assert!(status.is_invulnerable_to(Side::Hero));
        assert!(!status.is_invulnerable_to(Side::Enemy));
        // Нейтральный удар проверяет оба счётчика
        assert!(status.is_invulnerable_to(Side::Neutral));
    }

    #[test]
    fn test_start_never_shortens_running_window() {
        let mut status = StatusTracker::default();
        status.start_invulnerability(Side::Enemy, 30);
        status.start_invulnerability(Side::Enemy, 5);
        assert_eq!(status.invulnerable_frames, 30);
    }

    #[test]
    fn test_shield_regen_waits_for_delay() {
        let mut status = StatusTracker::default().with_shield(ShieldState::new(50.0, 10.0, 1000.0));
        status.shield.absorb(50.0);
        status.register_hit();

        // 900ms: ещё в delay
        for _ in 0..9 {
            status.tick(100.0);
        }
        assert_eq!(status.shield.charge, 0.0);

        // +500ms: 400ms регенерации после delay → 4.0
        for _ in 0..5 {
            status.tick(100.0);
        }
        assert!((status.shield.charge - 4.0).abs() < 1e-4, "charge = {}", status.shield.charge);
    }

    #[test]
    fn test_hit_resets_regen_timer() {
        let mut status = StatusTracker::default().with_shield(ShieldState::new(10.0, 100.0, 500.0));
        status.shield.absorb(10.0);
        status.tick(400.0);
        status.register_hit();
        status.tick(400.0);
        assert_eq!(status.shield.charge, 0.0);

        status.tick(200.0);
        // 100ms после delay × 100/s = 10, но clamp к max
        assert_eq!(status.shield.charge, 10.0);
    }

    #[test]
    fn test_shield_absorb_and_restore_caps() {
        let mut shield = ShieldState::new(6.0, 0.0, 0.0);
        assert_eq!(shield.absorb(10.0), 6.0);
        assert!(!shield.is_up());
        shield.restore(100.0);
        assert_eq!(shield.charge, 6.0);
    }
}
