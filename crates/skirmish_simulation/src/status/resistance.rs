//! Elements, immunities and elemental multipliers.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Стихия удара. `None` на месте `Option<Element>` означает физический урон.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Element {
    Fire,
    Ice,
    Lightning,
    Poison,
    Arcane,
}

bitflags! {
    /// Compact immunity set over `Option<Element>` (PHYSICAL stands for `None`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ElementMask: u8 {
        const PHYSICAL = 1 << 0;
        const FIRE = 1 << 1;
        const ICE = 1 << 2;
        const LIGHTNING = 1 << 3;
        const POISON = 1 << 4;
        const ARCANE = 1 << 5;
    }
}

impl ElementMask {
    pub fn of(element: Option<Element>) -> Self {
        match element {
            None => ElementMask::PHYSICAL,
            Some(Element::Fire) => ElementMask::FIRE,
            Some(Element::Ice) => ElementMask::ICE,
            Some(Element::Lightning) => ElementMask::LIGHTNING,
            Some(Element::Poison) => ElementMask::POISON,
            Some(Element::Arcane) => ElementMask::ARCANE,
        }
    }

    pub fn contains_element(self, element: Option<Element>) -> bool {
        self.contains(Self::of(element))
    }
}

impl FromIterator<Option<Element>> for ElementMask {
    fn from_iter<I: IntoIterator<Item = Option<Element>>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ElementMask::empty(), |mask, element| mask | ElementMask::of(element))
    }
}

/// Таблица сопротивлений актора.
///
/// Иммунитет обнуляет урон независимо от множителя. Отсутствующий множитель = 1.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resistances {
    pub immunities: ElementMask,
    pub multipliers: HashMap<Option<Element>, f32>,
}

impl Resistances {
    pub fn immune_to<I: IntoIterator<Item = Option<Element>>>(mut self, elements: I) -> Self {
        self.immunities |= elements.into_iter().collect::<ElementMask>();
        self
    }

    pub fn with_multiplier(mut self, element: Option<Element>, multiplier: f32) -> Self {
        self.multipliers.insert(element, multiplier);
        self
    }

    pub fn is_immune(&self, element: Option<Element>) -> bool {
        self.immunities.contains_element(element)
    }

    pub fn multiplier(&self, element: Option<Element>) -> f32 {
        self.multipliers.get(&element).copied().unwrap_or(1.0)
    }
}
