//! Damage application: попадания и заявки → Health, knockback, смерть
//!
//! Два входа:
//! - AttackLanded — попадания от resolver'а (с knockback)
//! - DamageRequest — урон вне атак (poison tick, окружение)
//!
//! Щит (`ShieldCharges`) поглощает удар целиком; исчерпанный щит снимает
//! и компонент, и сам эффект.

use bevy::prelude::*;

use super::ability::AttackLanded;
use crate::components::{Health, ShieldCharges};
use crate::effects::{EffectId, RemoveEffectRequest};
use crate::movement::Locomotion;

/// Событие: урон нанесен
///
/// Генерируется после применения damage к Health.
/// Используется для UI, звуков, статистики.
#[derive(Event, Debug, Clone)]
pub struct DamageDealt {
    /// None = урон без автора (poison, окружение)
    pub attacker: Option<Entity>,
    pub target: Entity,
    pub damage: u32,
    pub target_died: bool,
}

/// Событие: entity умер (health == 0)
#[derive(Event, Debug, Clone)]
pub struct EntityDied {
    pub entity: Entity,
    pub killer: Option<Entity>,
}

/// Заявка на урон вне конвейера атак (DoT hook, ловушки)
#[derive(Event, Debug, Clone)]
pub struct DamageRequest {
    pub target: Entity,
    pub amount: u32,
    pub source: Option<Entity>,
}

/// Компонент-маркер: entity мертв (Health == 0)
///
/// Деспавн не автоматический — внешний слой решает, что делать с телом.
#[derive(Component, Debug)]
pub struct Dead;

/// Система: применение урона
///
/// 1. Щит поглощает удар целиком (заряд списывается)
/// 2. Health.take_damage, knockback → Locomotion.impulse
/// 3. DamageDealt всегда, EntityDied на переходе жив → мертв
pub fn apply_damage(
    mut landed_events: EventReader<AttackLanded>,
    mut request_events: EventReader<DamageRequest>,
    mut targets: Query<(
        &mut Health,
        Option<&mut Locomotion>,
        Option<&mut ShieldCharges>,
    )>,
    mut dealt_events: EventWriter<DamageDealt>,
    mut died_events: EventWriter<EntityDied>,
    mut remove_effects: EventWriter<RemoveEffectRequest>,
    mut commands: Commands,
) {
    let hits = landed_events
        .read()
        .map(|hit| (hit.target, hit.damage, Some(hit.attacker), hit.knockback))
        .chain(
            request_events
                .read()
                .map(|req| (req.target, req.amount, req.source, Vec2::ZERO)),
        );

    for (target, damage, attacker, knockback) in hits {
        let Ok((mut health, locomotion, shield)) = targets.get_mut(target) else {
            // Цель уже despawned — попадание сгорает
            continue;
        };

        if !health.is_alive() {
            continue;
        }

        // Knockback прикладываем даже при заблокированном уроне
        if knockback != Vec2::ZERO {
            if let Some(mut locomotion) = locomotion {
                locomotion.impulse += knockback;
            }
        }

        let mut final_damage = damage;

        if final_damage > 0 {
            if let Some(mut shield) = shield {
                if shield.try_block() {
                    final_damage = 0;
                    crate::log(&format!(
                        "🛡️ Hit absorbed by shield (target: {:?}, charges left: {})",
                        target, shield.remaining
                    ));

                    if shield.is_depleted() {
                        commands.entity(target).remove::<ShieldCharges>();
                        remove_effects.write(RemoveEffectRequest {
                            target,
                            effect: EffectId::new("shield"),
                        });
                    }
                }
            }
        }

        let was_alive = health.is_alive();
        health.take_damage(final_damage);
        let is_alive = health.is_alive();

        dealt_events.write(DamageDealt {
            attacker,
            target,
            damage: final_damage,
            target_died: was_alive && !is_alive,
        });

        if was_alive && !is_alive {
            died_events.write(EntityDied {
                entity: target,
                killer: attacker,
            });

            crate::log_info(&format!("💀 Entity {:?} killed by {:?}", target, attacker));
        }
    }
}

/// Система: отключение AI при смерти
///
/// Убирает decision-компоненты у мертвых entities, чтобы они перестали
/// двигаться и атаковать. Добавляет маркер Dead.
pub fn disable_ai_on_death(
    mut commands: Commands,
    mut death_events: EventReader<EntityDied>,
    mut locomotions: Query<&mut Locomotion>,
) {
    for event in death_events.read() {
        // Обнуляем движение сразу (не через Commands)
        if let Ok(mut locomotion) = locomotions.get_mut(event.entity) {
            locomotion.enabled = false;
            locomotion.target = None;
            locomotion.impulse = Vec2::ZERO;
        }

        // Decision-компоненты снимаем через Commands (задержка на 1 фрейм)
        if let Ok(mut entity_commands) = commands.get_entity(event.entity) {
            entity_commands.remove::<crate::ai::EnemyState>();
            entity_commands.remove::<crate::perception::PerceptionState>();
            entity_commands.insert(Dead);
        }
    }
}
