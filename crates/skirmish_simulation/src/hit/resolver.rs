//! HitResolver: shared geometric + damage pipeline.
//!
//! Один вызов `resolve` = одна HitDescription против набора кандидатов.
//! Кандидаты обрабатываются по ActorId (порядок регистрации), поэтому
//! отбрасывание/убийства детерминированы независимо от порядка запроса.

use bevy::prelude::*;
use std::collections::BTreeSet;

use super::description::HitDescription;
use super::outcome::{HitOutcome, TargetImpact};
use crate::components::{ActorId, HitBody, TargetClass, Vitals};
use crate::status::{Element, StatusTracker};

/// One target as the resolver sees it: read-only body, mutable life/status.
pub struct HitCandidate<'a> {
    pub id: ActorId,
    pub position: Vec2,
    pub body: &'a HitBody,
    pub vitals: &'a mut Vitals,
    pub status: &'a mut StatusTracker,
}

/// Resolve `description` against `candidates`.
///
/// Алгоритм для каждого кандидата (по ActorId):
/// 1. Фильтр: ignore set, дубликаты, сам атакующий, класс цели, уже повержен, overlap
/// 2. Источник стихии + `takes_element` → цель пропускается, а стихия
///    действует на цели дальше по пути удара (для ray; у box/circle на всех)
/// 3. Неуязвимость по роли атакующего (кроме `ignores_invulnerability`);
///    `can_always_knockback` оставляет только отбрасывание
/// 4. Отражение (`reflectable` + `reflects`) → отражено, стоп
/// 5. Щит без `can_damage_shields` → заблокировано, стоп
/// 6. Иммунитет → 0 урона, но удар засчитан
/// 7. Урон × множитель: сначала щит, остаток в life
/// 8. Отбрасывание, окно неуязвимости, сброс регена щита
/// 9. Непробивающий удар останавливается на первом классе из `stop_on`
///
/// Zero candidates is a no-op, never an error.
pub fn resolve(description: &HitDescription, candidates: &mut [HitCandidate]) -> HitOutcome {
    let mut outcome = HitOutcome::default();

    if description.shape.is_degenerate() {
        return outcome;
    }

    candidates.sort_by_key(|candidate| candidate.id);

    // Источники стихии вдоль удара: стихия действует только на цели дальше по пути
    let mut sources: Vec<(f32, Element)> = Vec::new();
    if description.takes_element {
        sources = candidates
            .iter()
            .filter(|candidate| in_reach(description, candidate))
            .filter_map(|candidate| {
                let element = candidate.body.element_source?;
                Some((description.shape.path_param(candidate.position), element))
            })
            .collect();
        sources.sort_by(|a, b| a.0.total_cmp(&b.0));
    }

    let mut seen: BTreeSet<ActorId> = BTreeSet::new();
    // Позиция на пути, где sweep остановился
    let mut stop_at: Option<f32> = None;

    for candidate in candidates.iter_mut() {
        if !seen.insert(candidate.id) || !in_reach(description, candidate) {
            continue;
        }

        // Жаровня и т.п.: удар подхватывает стихию и летит дальше
        if description.takes_element && candidate.body.element_source.is_some() {
            continue;
        }

        let class = candidate.body.class;
        let at = description.shape.path_param(candidate.position);
        let element = element_at(description, &sources, at);
        let knockback = effective_knockback(description, candidate);

        if !description.ignores_invulnerability && candidate.status.is_invulnerable_to(description.side) {
            if !description.can_always_knockback {
                continue;
            }
            // Неуязвим, но отбрасывается: без урона и без нового окна
            record_connection(&mut outcome, TargetImpact {
                id: candidate.id,
                position: candidate.position,
                damage: 0.0,
                shield_absorbed: 0.0,
                blocked: false,
                reflected: false,
                immune: false,
                destroyed: false,
                knockback,
                element,
            });
            if stops(description, class, &mut outcome) {
                stop_at = Some(at);
                break;
            }
            continue;
        }

        if description.reflectable && candidate.body.reflects {
            outcome.reflected = true;
            outcome.stopped = true;
            outcome.impacts.push(TargetImpact {
                id: candidate.id,
                position: candidate.position,
                damage: 0.0,
                shield_absorbed: 0.0,
                blocked: false,
                reflected: true,
                immune: false,
                destroyed: false,
                knockback: Vec3::ZERO,
                element,
            });
            stop_at = Some(at);
            break;
        }

        if candidate.status.shield.is_up() && !description.can_damage_shields {
            outcome.blocked = true;
            outcome.impacts.push(TargetImpact {
                id: candidate.id,
                position: candidate.position,
                damage: 0.0,
                shield_absorbed: 0.0,
                blocked: true,
                reflected: false,
                immune: false,
                destroyed: false,
                knockback: if description.knockback_when_blocked {
                    knockback
                } else {
                    Vec3::ZERO
                },
                element,
            });
            if !description.piercing {
                outcome.stopped = true;
                stop_at = Some(at);
                break;
            }
            outcome.pierced = true;
            continue;
        }

        let resistances = &candidate.status.resistances;
        let immune = resistances.is_immune(element);
        let effective = if immune {
            0.0
        } else {
            (description.damage * resistances.multiplier(element)).max(0.0)
        };

        let shield_absorbed = if description.can_damage_shields {
            candidate.status.shield.absorb(effective)
        } else {
            0.0
        };
        let life_damage = candidate.vitals.take_damage(effective - shield_absorbed);
        let damage = shield_absorbed + life_damage;

        if damage > 0.0 {
            let frames = description
                .invulnerability_frames
                .unwrap_or(candidate.status.hit_invulnerability_frames);
            if frames > 0 {
                candidate.status.start_invulnerability(description.side, frames);
            }
        }
        candidate.status.register_hit();

        let destroyed = !class.is_actor() && damage > 0.0 && candidate.vitals.is_defeated();

        record_connection(&mut outcome, TargetImpact {
            id: candidate.id,
            position: candidate.position,
            damage,
            shield_absorbed,
            blocked: false,
            reflected: false,
            immune,
            destroyed,
            knockback,
            element,
        });
        outcome.damage_dealt += damage;
        outcome.destroyed |= destroyed;

        if stops(description, class, &mut outcome) {
            stop_at = Some(at);
            break;
        }
    }

    // Дальше летит стихия последнего источника до точки остановки
    outcome.set_element = sources
        .iter()
        .rev()
        .find(|(t, _)| stop_at.is_none_or(|stop| *t <= stop))
        .map(|(_, element)| *element);

    outcome
}

/// Shared filters: ignore set, the attacker itself, target class, defeated, overlap.
fn in_reach(description: &HitDescription, candidate: &HitCandidate) -> bool {
    !description.ignore.contains(&candidate.id)
        && description.source != Some(candidate.id)
        && description.classes.includes(candidate.body.class)
        && !candidate.vitals.is_defeated()
        && description.shape.overlaps(candidate.position, &candidate.body.shape)
}

/// Element at path position `at`: the nearest source behind it, else the hit's own.
fn element_at(description: &HitDescription, sources: &[(f32, Element)], at: f32) -> Option<Element> {
    sources
        .iter()
        .rev()
        .find(|(t, _)| *t <= at)
        .map(|(_, element)| Some(*element))
        .unwrap_or(description.element)
}

/// Knockback after target-side rules (immovable targets, unpushable objects, tiles).
fn effective_knockback(description: &HitDescription, candidate: &HitCandidate) -> Vec3 {
    if !candidate.vitals.can_be_knocked_back {
        return Vec3::ZERO;
    }
    match candidate.body.class {
        TargetClass::Tile => Vec3::ZERO,
        TargetClass::Object if !description.can_push => Vec3::ZERO,
        _ => description.knockback_for(candidate.position),
    }
}

fn record_connection(outcome: &mut HitOutcome, impact: TargetImpact) {
    if !outcome.hit {
        outcome.knockback_vector = impact.knockback;
    }
    outcome.hit = true;
    outcome.targets_hit.push(impact.id);
    outcome.impacts.push(impact);
}

/// `true` когда sweep должен остановиться на этой цели.
fn stops(description: &HitDescription, class: TargetClass, outcome: &mut HitOutcome) -> bool {
    if !description.stop_on.includes(class) {
        return false;
    }
    if description.piercing {
        outcome.pierced = true;
        return false;
    }
    outcome.stopped = true;
    true
}
