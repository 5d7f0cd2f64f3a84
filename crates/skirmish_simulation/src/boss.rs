//! Boss enrage phase.
//!
//! Ярость поверх обычной модели способностей: порог по доле жизни
//! переводит босса в `enraged`, что открывает способности с `Gate::Enraged`.
//! Флаг истории пишется один раз, поэтому повторная встреча начинается
//! уже в ярости и без повторной реплики.

use bevy::prelude::*;

use crate::components::{ActorId, Defeated, Vitals};
use crate::interfaces::{EffectParams, ScriptLine, SpawnEffect, StoryFlags};
use crate::logger;
use crate::CombatSet;

/// Per-boss enrage settings + state.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct BossState {
    /// Enrage when life fraction drops strictly below this.
    pub enrage_below: f32,
    pub enraged: bool,
    /// Persistence key (setFlag/getFlag).
    pub flag: Option<String>,
    pub enrage_line: Option<String>,
    primed: bool,
}

/// Что произошло с боссом за наблюдение.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossTransition {
    /// Флаг уже был выставлен: стартуем в ярости без реплики.
    Resumed,
    Enraged,
}

impl BossState {
    pub fn new(enrage_below: f32) -> Self {
        Self {
            enrage_below,
            enraged: false,
            flag: None,
            enrage_line: None,
            primed: false,
        }
    }

    pub fn with_flag(mut self, key: impl Into<String>) -> Self {
        self.flag = Some(key.into());
        self
    }

    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.enrage_line = Some(line.into());
        self
    }

    /// One observation of the boss. At most one transition over the boss lifetime.
    pub fn observe(&mut self, life_fraction: f32, flags: &StoryFlags) -> Option<BossTransition> {
        if !self.primed {
            self.primed = true;
            let remembered = self.flag.as_deref().is_some_and(|key| flags.get_flag(key));
            if remembered && !self.enraged {
                self.enraged = true;
                return Some(BossTransition::Resumed);
            }
        }

        if !self.enraged && life_fraction < self.enrage_below {
            self.enraged = true;
            return Some(BossTransition::Enraged);
        }

        None
    }
}

/// Событие: босс перешёл в ярость в этом тике.
#[derive(Event, Debug, Clone, Copy)]
pub struct BossEnraged {
    pub entity: Entity,
    pub actor: ActorId,
}

/// Система: enrage thresholds.
pub fn update_boss_phases(
    mut bosses: Query<(Entity, &ActorId, &Transform, &Vitals, &mut BossState), Without<Defeated>>,
    mut flags: ResMut<StoryFlags>,
    mut lines: EventWriter<ScriptLine>,
    mut effects: EventWriter<SpawnEffect>,
    mut enraged: EventWriter<BossEnraged>,
) {
    let mut rows: Vec<_> = bosses.iter_mut().collect();
    rows.sort_by_key(|(_, id, ..)| **id);

    for (entity, id, transform, vitals, boss) in rows.iter_mut() {
        let Some(transition) = boss.observe(vitals.life_fraction(), &flags) else {
            continue;
        };

        match transition {
            BossTransition::Resumed => {
                logger::log(&format!("{:?} remembers the last encounter, starts enraged", id));
            }
            BossTransition::Enraged => {
                logger::log_info(&format!(
                    "😡 {:?} enraged at {:.0}% life",
                    id,
                    vitals.life_fraction() * 100.0
                ));

                if let Some(key) = &boss.flag {
                    flags.set_flag(key.clone());
                }
                if let Some(line) = &boss.enrage_line {
                    lines.write(ScriptLine { text: line.clone() });
                }
                effects.write(SpawnEffect {
                    kind: "enrage".to_string(),
                    position: transform.translation.truncate(),
                    params: EffectParams::default(),
                });
                enraged.write(BossEnraged {
                    entity: *entity,
                    actor: **id,
                });
            }
        }
    }
}

/// Boss Plugin (CombatSet::Bosses, после урона этого тика).
pub struct BossPlugin;

impl Plugin for BossPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<BossEnraged>()
            .add_systems(FixedUpdate, update_boss_phases.in_set(CombatSet::Bosses));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrage_below_threshold_once() {
        let flags = StoryFlags::default();
        let mut boss = BossState::new(0.5);

        assert_eq!(boss.observe(1.0, &flags), None);
        assert_eq!(boss.observe(0.5, &flags), None);
        assert_eq!(boss.observe(0.49, &flags), Some(BossTransition::Enraged));
        assert!(boss.enraged);
        assert_eq!(boss.observe(0.1, &flags), None);
        // Отхил ярость не снимает
        assert_eq!(boss.observe(1.0, &flags), None);
        assert!(boss.enraged);
    }

    #[test]
    fn test_remembered_flag_resumes_silently() {
        let mut flags = StoryFlags::default();
        flags.set_flag("warden_enraged");
        let mut boss = BossState::new(0.5).with_flag("warden_enraged").with_line("Again?!");

        assert_eq!(boss.observe(1.0, &flags), Some(BossTransition::Resumed));
        assert!(boss.enraged);
        assert_eq!(boss.observe(0.2, &flags), None);
    }

    #[test]
    fn test_unrelated_flag_does_not_resume() {
        let mut flags = StoryFlags::default();
        flags.set_flag("other");
        let mut boss = BossState::new(0.5).with_flag("warden_enraged");

        assert_eq!(boss.observe(1.0, &flags), None);
        assert!(!boss.enraged);
    }
}
