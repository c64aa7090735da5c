//! Attack resolver: превращает определение атаки в набор попаданий
//!
//! # Architecture
//!
//! Resolver — чистая функция поверх `SpatialView` (границы внешнего
//! физического мира). Никакого состояния между вызовами; внутри одного
//! вызова — visited-set, чтобы цель, накрытая несколькими сегментами
//! одного взмаха, засчиталась один раз.
//!
//! # Resolution Flow
//!
//! ```text
//! AttackDefinition + origin + facing
//!   ↓ (shape → candidate handles через SpatialView)
//! exclude self → dedup → below-filter
//!   ↓ (bonus predicate по активным эффектам цели)
//! Vec<ResolvedHit { target, damage, knockback }>
//! ```

use bevy::prelude::*;
use std::collections::HashSet;

use super::definitions::{AttackDefinition, AttackShape, BonusCondition, DirectionPolicy};

/// Дальность луча в долях радиуса (как у ледяных осколков: radius × 2)
const RAY_LENGTH_FACTOR: f32 = 2.0;

/// Радиус «тела» актора для пересечения лучом
const ACTOR_HIT_RADIUS: f32 = 0.5;

/// Старт луча выносится за собственное тело атакующего, иначе ближайшим
/// на луче всегда оказывается он сам
const RAY_START_OFFSET: f32 = ACTOR_HIT_RADIUS + 0.01;

/// Срез пространственных запросов, который потребляет resolver
///
/// Реализуется внешним collision-слоем; для headless симуляции есть
/// `ActorPositions` — снапшот позиций с простой дистанционной проверкой.
pub trait SpatialView {
    /// Все handles в круге (граница включительно)
    fn query_circle(&self, center: Vec2, radius: f32) -> Vec<Entity>;
    /// Ближайший handle на луче, если есть
    fn query_ray(&self, origin: Vec2, direction: Vec2, length: f32) -> Option<Entity>;
    /// Позиция handle (для below-фильтра и направления knockback)
    fn position_of(&self, entity: Entity) -> Option<Vec2>;
}

/// Результат одного попадания
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHit {
    pub target: Entity,
    pub damage: u32,
    pub knockback: Vec2,
}

/// Снапшот позиций живых акторов на текущий tick
///
/// Дистанционные проверки вместо физических коллайдеров — в headless
/// режиме этого достаточно, граница (== radius) считается попаданием.
pub struct ActorPositions {
    entries: Vec<(Entity, Vec2)>,
}

impl ActorPositions {
    pub fn new(entries: Vec<(Entity, Vec2)>) -> Self {
        Self { entries }
    }
}

impl SpatialView for ActorPositions {
    fn query_circle(&self, center: Vec2, radius: f32) -> Vec<Entity> {
        self.entries
            .iter()
            .filter(|(_, pos)| pos.distance(center) <= radius)
            .map(|(entity, _)| *entity)
            .collect()
    }

    fn query_ray(&self, origin: Vec2, direction: Vec2, length: f32) -> Option<Entity> {
        let dir = direction.normalize_or_zero();
        if dir == Vec2::ZERO {
            return None;
        }

        // Ближайшее пересечение луча с «телом» актора (circle vs segment)
        let mut nearest: Option<(Entity, f32)> = None;

        for (entity, pos) in &self.entries {
            let to_actor = *pos - origin;
            let t = to_actor.dot(dir).clamp(0.0, length);
            let closest = origin + dir * t;

            if closest.distance(*pos) <= ACTOR_HIT_RADIUS {
                match nearest {
                    Some((_, best_t)) if t >= best_t => {}
                    _ => nearest = Some((*entity, t)),
                }
            }
        }

        nearest.map(|(entity, _)| entity)
    }

    fn position_of(&self, entity: Entity) -> Option<Vec2> {
        self.entries
            .iter()
            .find(|(e, _)| *e == entity)
            .map(|(_, pos)| *pos)
    }
}

/// Разворачивает атаку в список уникальных попаданий
///
/// - Нулевое направление → канонический forward (Vec2::X)
/// - Пустой результат запроса → пустой список (не ошибка)
/// - `condition_holds` — предикат бонусного урона, поставляется вызывающим
///   (у него есть доступ к активным эффектам целей)
pub fn resolve_attack(
    definition: &AttackDefinition,
    attacker: Entity,
    origin: Vec2,
    facing: Vec2,
    spatial: &dyn SpatialView,
    condition_holds: &dyn Fn(Entity, &BonusCondition) -> bool,
) -> Vec<ResolvedHit> {
    let direction = match definition.direction {
        DirectionPolicy::Facing => {
            let dir = facing.normalize_or_zero();
            if dir == Vec2::ZERO {
                Vec2::X
            } else {
                dir
            }
        }
        DirectionPolicy::Down => Vec2::NEG_Y,
    };

    let candidates = collect_candidates(definition, origin, direction, spatial);

    let mut visited: HashSet<Entity> = HashSet::new();
    let mut hits = Vec::new();

    for target in candidates {
        // Не бьём самого себя
        if target == attacker {
            continue;
        }
        // Один взмах — одно попадание по цели
        if !visited.insert(target) {
            continue;
        }

        let target_pos = spatial.position_of(target);

        // Down attack засчитывает только цели не выше атакующего
        if definition.below_only {
            match target_pos {
                Some(pos) if pos.y > origin.y => continue,
                _ => {}
            }
        }

        let bonus_applies = definition
            .bonus
            .as_ref()
            .map(|bonus| condition_holds(target, &bonus.when))
            .unwrap_or(false);
        let damage = definition.damage_against(bonus_applies);

        // Отбрасываем от атакующего; для цели в той же точке — вдоль взмаха
        let push_dir = target_pos
            .map(|pos| (pos - origin).normalize_or_zero())
            .filter(|dir| *dir != Vec2::ZERO)
            .unwrap_or(direction);

        hits.push(ResolvedHit {
            target,
            damage,
            knockback: push_dir * definition.knockback,
        });
    }

    hits
}

/// Кандидаты по форме атаки (с повторами — dedup выше)
fn collect_candidates(
    definition: &AttackDefinition,
    origin: Vec2,
    direction: Vec2,
    spatial: &dyn SpatialView,
) -> Vec<Entity> {
    match definition.shape {
        AttackShape::Circle => {
            let center = origin + direction * definition.radius * definition.forward_offset;
            spatial.query_circle(center, definition.radius)
        }

        AttackShape::Wave {
            segments,
            spacing,
            segment_scale,
        } => {
            let mut candidates = Vec::new();
            for i in 1..=segments {
                let center = origin + direction * (definition.radius * spacing * i as f32);
                candidates.extend(spatial.query_circle(center, definition.radius * segment_scale));
            }
            candidates
        }

        AttackShape::Fan { rays, spread_deg } => {
            let mut candidates = Vec::new();
            let half = (rays.saturating_sub(1)) as f32 / 2.0;
            for i in 0..rays {
                let angle = (i as f32 - half) * spread_deg.to_radians();
                let ray_dir = Vec2::from_angle(angle).rotate(direction);
                let start = origin + ray_dir * RAY_START_OFFSET;
                if let Some(target) =
                    spatial.query_ray(start, ray_dir, definition.radius * RAY_LENGTH_FACTOR)
                {
                    candidates.push(target);
                }
            }
            candidates
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::definitions::{AttackDefinition, DamageBonus};
    use crate::effects::EffectId;

    fn entity(index: u32) -> Entity {
        Entity::from_raw(index)
    }

    fn no_bonus(_: Entity, _: &BonusCondition) -> bool {
        false
    }

    #[test]
    fn test_circle_hit_and_self_exclusion() {
        let attacker = entity(0);
        let target = entity(1);
        let spatial = ActorPositions::new(vec![
            (attacker, Vec2::ZERO),
            (target, Vec2::new(0.5, 0.0)),
        ]);

        let def = AttackDefinition {
            base_damage: 10,
            radius: 1.0,
            ..AttackDefinition::base("main", "Main")
        };

        let hits = resolve_attack(&def, attacker, Vec2::ZERO, Vec2::X, &spatial, &no_bonus);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, target);
        assert_eq!(hits[0].damage, 10);
    }

    #[test]
    fn test_empty_query_is_not_an_error() {
        let attacker = entity(0);
        let spatial = ActorPositions::new(vec![(attacker, Vec2::ZERO)]);
        let def = AttackDefinition::base("main", "Main");

        let hits = resolve_attack(&def, attacker, Vec2::ZERO, Vec2::X, &spatial, &no_bonus);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_zero_direction_defaults_forward() {
        let attacker = entity(0);
        let target = entity(1);
        // Цель справа, в зоне только если направление = +X
        let spatial = ActorPositions::new(vec![
            (attacker, Vec2::ZERO),
            (target, Vec2::new(1.2, 0.0)),
        ]);

        let def = AttackDefinition {
            radius: 1.0,
            forward_offset: 0.7,
            ..AttackDefinition::base("main", "Main")
        };

        let hits = resolve_attack(&def, attacker, Vec2::ZERO, Vec2::ZERO, &spatial, &no_bonus);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_wave_segments_dedup_single_target() {
        let attacker = entity(0);
        let target = entity(1);
        // Цель накрыта всеми тремя сегментами волны
        let spatial = ActorPositions::new(vec![
            (attacker, Vec2::ZERO),
            (target, Vec2::new(1.5, 0.0)),
        ]);

        let def = AttackDefinition {
            base_damage: 7,
            radius: 1.0,
            shape: AttackShape::Wave {
                segments: 3,
                spacing: 0.75,
                segment_scale: 0.8,
            },
            ..AttackDefinition::base("wave", "Wave")
        };

        let hits = resolve_attack(&def, attacker, Vec2::ZERO, Vec2::X, &spatial, &no_bonus);

        // Ровно одно попадание, не три
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].damage, 7);
    }

    #[test]
    fn test_fan_ray_hits_nearest() {
        let attacker = entity(0);
        let near = entity(1);
        let far = entity(2);
        let spatial = ActorPositions::new(vec![
            (attacker, Vec2::ZERO),
            (near, Vec2::new(1.0, 0.0)),
            (far, Vec2::new(1.8, 0.0)),
        ]);

        let def = AttackDefinition {
            radius: 1.0, // дальность луча 2.0
            shape: AttackShape::Fan {
                rays: 1,
                spread_deg: 0.0,
            },
            ..AttackDefinition::base("shard", "Shard")
        };

        let hits = resolve_attack(&def, attacker, Vec2::ZERO, Vec2::X, &spatial, &no_bonus);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, near);
    }

    #[test]
    fn test_fan_three_rays_separate_targets() {
        let attacker = entity(0);
        let center = entity(1);
        let above = entity(2);
        // ±30° веер: цель по центру и цель на верхнем луче, разнесены так,
        // что чужой луч ни одну из них не задевает
        let upper_dir = Vec2::from_angle(30.0_f32.to_radians());
        let spatial = ActorPositions::new(vec![
            (attacker, Vec2::ZERO),
            (center, Vec2::new(1.5, 0.0)),
            (above, upper_dir * 1.5),
        ]);

        let def = AttackDefinition {
            radius: 1.0,
            shape: AttackShape::Fan {
                rays: 3,
                spread_deg: 30.0,
            },
            ..AttackDefinition::base("shards", "Shards")
        };

        let hits = resolve_attack(&def, attacker, Vec2::ZERO, Vec2::X, &spatial, &no_bonus);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_below_only_filter() {
        let attacker = entity(0);
        let below = entity(1);
        let above = entity(2);
        let spatial = ActorPositions::new(vec![
            (attacker, Vec2::ZERO),
            (below, Vec2::new(0.0, -0.8)),
            (above, Vec2::new(0.0, 0.8)),
        ]);

        let def = AttackDefinition {
            radius: 1.0,
            forward_offset: 0.5,
            direction: DirectionPolicy::Down,
            below_only: true,
            ..AttackDefinition::base("down", "Down")
        };

        let hits = resolve_attack(&def, attacker, Vec2::ZERO, Vec2::X, &spatial, &no_bonus);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, below);
    }

    #[test]
    fn test_bonus_predicate_doubles_damage() {
        let attacker = entity(0);
        let tagged = entity(1);
        let clean = entity(2);
        let spatial = ActorPositions::new(vec![
            (attacker, Vec2::ZERO),
            (tagged, Vec2::new(0.4, 0.0)),
            (clean, Vec2::new(-0.4, 0.0)),
        ]);

        let def = AttackDefinition {
            base_damage: 10,
            radius: 1.0,
            bonus: Some(DamageBonus {
                multiplier: 2.0,
                when: BonusCondition::HasEffect(EffectId::new("burning")),
            }),
            ..AttackDefinition::base("latte", "Latte")
        };

        let condition = |target: Entity, _: &BonusCondition| target == tagged;
        let hits = resolve_attack(&def, attacker, Vec2::ZERO, Vec2::X, &spatial, &condition);

        let damage_of = |e: Entity| hits.iter().find(|h| h.target == e).unwrap().damage;
        assert_eq!(damage_of(tagged), 20);
        assert_eq!(damage_of(clean), 10);
    }

    #[test]
    fn test_knockback_points_away_from_attacker() {
        let attacker = entity(0);
        let target = entity(1);
        let spatial = ActorPositions::new(vec![
            (attacker, Vec2::ZERO),
            (target, Vec2::new(0.5, 0.0)),
        ]);

        let def = AttackDefinition {
            radius: 1.0,
            knockback: 4.0,
            ..AttackDefinition::base("push", "Push")
        };

        let hits = resolve_attack(&def, attacker, Vec2::ZERO, Vec2::X, &spatial, &no_bonus);
        assert_eq!(hits[0].knockback, Vec2::new(4.0, 0.0));
    }
}
