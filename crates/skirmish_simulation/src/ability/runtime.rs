//! AbilityRuntime: charges + cooldown arithmetic for one ability of one actor.

use super::definition::AbilityDefinition;

/// Per-actor bookkeeping for one ability definition.
///
/// Инвариант: `0 <= charges <= definition.charges_max`, `cooldown_remaining_ms >= 0`.
/// Кулдаун идёт только когда таймер запущен (после расхода заряда) и
/// перевзводится, пока заряды не заполнены.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityRuntime {
    pub charges: u32,
    pub cooldown_remaining_ms: f32,
}

impl AbilityRuntime {
    /// Полные заряды, таймер стоит.
    pub fn full(definition: &AbilityDefinition) -> Self {
        Self {
            charges: definition.charges_max,
            cooldown_remaining_ms: 0.0,
        }
    }

    pub fn with_charges(charges: u32) -> Self {
        Self {
            charges,
            cooldown_remaining_ms: 0.0,
        }
    }

    pub fn is_recharging(&self) -> bool {
        self.cooldown_remaining_ms > 0.0
    }

    /// Advance the cooldown timer by `dt_ms`.
    ///
    /// Overshoot carries into the next cooldown, so a long tick can grant
    /// several recoveries at once (still capped at `charges_max`).
    pub fn tick(&mut self, definition: &AbilityDefinition, dt_ms: f32) {
        if self.cooldown_remaining_ms <= 0.0 || !(dt_ms > 0.0) {
            return;
        }

        self.cooldown_remaining_ms -= dt_ms;

        while self.cooldown_remaining_ms <= 0.0 {
            self.charges = self
                .charges
                .saturating_add(definition.charges_recovered_per_cooldown)
                .min(definition.charges_max);

            if self.charges < definition.charges_max && definition.cooldown_ms > 0.0 {
                self.cooldown_remaining_ms += definition.cooldown_ms;
            } else {
                self.cooldown_remaining_ms = 0.0;
                break;
            }
        }
    }

    /// Spend one charge. `false` (and no mutation) when empty.
    pub fn consume_charge(&mut self, definition: &AbilityDefinition) -> bool {
        if self.charges == 0 {
            return false;
        }

        self.charges -= 1;

        if !self.is_recharging() {
            if definition.cooldown_ms > 0.0 {
                self.cooldown_remaining_ms = definition.cooldown_ms;
            } else {
                // Нулевой кулдаун: заряд возвращается сразу
                self.charges = self
                    .charges
                    .saturating_add(definition.charges_recovered_per_cooldown)
                    .min(definition.charges_max);
            }
        }

        true
    }
}
