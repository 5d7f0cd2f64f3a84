//! Selection policy: which ability slot the controller tries first.

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Actor-specific policy for choosing among enabled, charged abilities.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Slot order = priority order.
    #[default]
    Priority,
    /// Next slot after the last started one.
    RoundRobin,
    /// Random weighted order (weights by slot, missing = 1, 0 = never).
    Weighted(Vec<u32>),
}

/// Controller state that lives next to the AbilityScheduler.
#[derive(Component, Debug, Clone, Default)]
pub struct AbilityController {
    pub policy: SelectionPolicy,
    cursor: usize,
}

impl AbilityController {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy, cursor: 0 }
    }

    /// Order in which slots are tried this tick.
    pub fn candidate_order(&self, slot_count: usize, rng: &mut impl Rng) -> Vec<usize> {
        match &self.policy {
            SelectionPolicy::Priority => (0..slot_count).collect(),
            SelectionPolicy::RoundRobin => {
                let start = if slot_count == 0 { 0 } else { self.cursor % slot_count };
                (0..slot_count).map(|offset| (start + offset) % slot_count).collect()
            }
            SelectionPolicy::Weighted(weights) => weighted_order(weights, slot_count, rng),
        }
    }

    /// Запоминаем, что стартовало (для RoundRobin).
    pub fn on_started(&mut self, slot: usize) {
        self.cursor = slot + 1;
    }
}

/// Weighted sampling without replacement.
fn weighted_order(weights: &[u32], slot_count: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut pool: Vec<(usize, u32)> = (0..slot_count)
        .map(|slot| (slot, weights.get(slot).copied().unwrap_or(1)))
        .filter(|(_, weight)| *weight > 0)
        .collect();
    let mut order = Vec::with_capacity(pool.len());

    while !pool.is_empty() {
        let total: u32 = pool.iter().map(|(_, weight)| *weight).sum();
        let mut roll = rng.gen_range(0..total);
        let mut picked = pool.len() - 1;
        for (index, (_, weight)) in pool.iter().enumerate() {
            if roll < *weight {
                picked = index;
                break;
            }
            roll -= *weight;
        }
        order.push(pool.remove(picked).0);
    }

    order
}
