//! Enemy FSM: Normal ↔ Attack по событиям perception
//!
//! # Правила переходов
//!
//! - В band'е (melee или ranged) И есть активная способность нужного
//!   режима → Attack: движение выключается, способность стреляет по
//!   готовности gate'а
//! - Оба боевых band'а потеряны (или нечем атаковать) → Normal: движение
//!   включается, цель преследования — текущая цель perception
//! - Выбор атаки: melee band → melee-режим, иначе ranged band →
//!   ranged-режим. Нет подходящей активной способности → остаёмся Normal.

use bevy::prelude::*;

use crate::combat::{AbilityPhase, AbilitySet, AttackIntent, AttackMode, Dead};
use crate::movement::Locomotion;
use crate::perception::{PerceptionEvent, PerceptionState};

/// Состояние врага. Начальное и терминальное — Normal.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
#[reflect(Component)]
pub enum EnemyState {
    #[default]
    Normal,
    Attack,
}

/// Какой режим атаки сейчас уместен (и есть чем атаковать)
fn select_attack_mode(perception: &PerceptionState, abilities: &AbilitySet) -> Option<AttackMode> {
    if perception.in_melee && abilities.active_with_mode(AttackMode::Melee).is_some() {
        return Some(AttackMode::Melee);
    }
    if perception.in_ranged && abilities.active_with_mode(AttackMode::Ranged).is_some() {
        return Some(AttackMode::Ranged);
    }
    None
}

/// Система: переходы FSM от событий perception
///
/// Каждое событие пересчитывает уместный режим атаки целиком — порядок
/// enter/exit внутри одного опроса на итог не влияет.
pub fn enemy_decision(
    mut events: EventReader<PerceptionEvent>,
    mut enemies: Query<
        (
            &mut EnemyState,
            &mut Locomotion,
            &AbilitySet,
            &PerceptionState,
        ),
        Without<Dead>,
    >,
) {
    for event in events.read() {
        let observer = match event {
            PerceptionEvent::TargetDetected { observer, .. }
            | PerceptionEvent::TargetLost { observer }
            | PerceptionEvent::EnteredRanged { observer, .. }
            | PerceptionEvent::LeftRanged { observer }
            | PerceptionEvent::EnteredMelee { observer, .. }
            | PerceptionEvent::LeftMelee { observer } => *observer,
        };

        let Ok((mut state, mut locomotion, abilities, perception)) = enemies.get_mut(observer)
        else {
            continue;
        };

        match event {
            PerceptionEvent::TargetDetected { target, .. } => {
                // Начинаем преследование (состояние остаётся Normal)
                locomotion.target = Some(*target);
                if *state == EnemyState::Normal {
                    locomotion.enabled = true;
                }
            }

            PerceptionEvent::TargetLost { .. } => {
                locomotion.target = None;
                change_state(observer, &mut state, EnemyState::Normal, &mut locomotion);
            }

            PerceptionEvent::EnteredRanged { .. }
            | PerceptionEvent::EnteredMelee { .. }
            | PerceptionEvent::LeftRanged { .. }
            | PerceptionEvent::LeftMelee { .. } => {
                let next = if select_attack_mode(perception, abilities).is_some() {
                    EnemyState::Attack
                } else {
                    EnemyState::Normal
                };
                change_state(observer, &mut state, next, &mut locomotion);
            }
        }
    }
}

/// Смена состояния + побочные эффекты на locomotion (идемпотентно)
fn change_state(
    observer: Entity,
    state: &mut EnemyState,
    next: EnemyState,
    locomotion: &mut Locomotion,
) {
    if *state == next {
        return;
    }
    *state = next;

    match next {
        EnemyState::Normal => {
            // Возвращаемся к преследованию (цель уже в locomotion.target)
            locomotion.enabled = true;
            crate::log(&format!("🚶 Enemy {:?} → Normal", observer));
        }
        EnemyState::Attack => {
            locomotion.enabled = false;
            crate::log(&format!("⚔️ Enemy {:?} → Attack", observer));
        }
    }
}

/// Система: выполнение атак в состоянии Attack
///
/// Пока враг в Attack и band удерживается, способность перезапускается
/// каждый раз, когда её gate снова готов. Intent идёт в общий combat
/// конвейер — тот же путь, что у атак игрока.
pub fn enemy_attack_execution(
    enemies: Query<
        (
            Entity,
            &EnemyState,
            &PerceptionState,
            &AbilitySet,
            &Transform,
        ),
        Without<Dead>,
    >,
    targets: Query<&Transform>,
    mut intents: EventWriter<AttackIntent>,
) {
    for (entity, state, perception, abilities, transform) in enemies.iter() {
        if *state != EnemyState::Attack {
            continue;
        }
        let Some(target) = perception.target else {
            continue;
        };
        let Some(mode) = select_attack_mode(perception, abilities) else {
            continue;
        };
        let Some(slot) = abilities.active_with_mode(mode) else {
            continue;
        };
        // Cooldown ещё идёт — ждём (gate перепроверится в perform_attacks)
        if slot.phase != AbilityPhase::Ready {
            continue;
        }

        let direction = targets
            .get(target)
            .map(|target_transform| {
                (target_transform.translation - transform.translation)
                    .truncate()
                    .normalize_or_zero()
            })
            .unwrap_or(Vec2::ZERO);

        intents.write(AttackIntent {
            attacker: entity,
            attack: slot.attack.id.clone(),
            direction,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{AbilityInstance, AttackDefinition};
    use std::sync::Arc;

    fn ability(id: &str, mode: AttackMode, phase: AbilityPhase) -> AbilityInstance {
        let mut instance = AbilityInstance::new(Arc::new(AttackDefinition {
            mode,
            ..AttackDefinition::base(id, id)
        }));
        instance.phase = phase;
        instance
    }

    fn set_of(instances: Vec<AbilityInstance>) -> AbilitySet {
        let mut set = AbilitySet::default();
        for instance in instances {
            set.equip(instance.attack.clone());
            set.slot_mut(&instance.attack.id).unwrap().phase = instance.phase;
        }
        set
    }

    #[test]
    fn test_select_prefers_melee_band() {
        let abilities = set_of(vec![
            ability("bite", AttackMode::Melee, AbilityPhase::Ready),
            ability("sting", AttackMode::Ranged, AbilityPhase::Ready),
        ]);
        let perception = PerceptionState {
            in_ranged: true,
            in_melee: true,
            ..Default::default()
        };

        assert_eq!(
            select_attack_mode(&perception, &abilities),
            Some(AttackMode::Melee)
        );
    }

    #[test]
    fn test_select_falls_back_to_ranged() {
        // Melee-способности нет — в melee band выбираем ranged
        let abilities = set_of(vec![ability("sting", AttackMode::Ranged, AbilityPhase::Ready)]);
        let perception = PerceptionState {
            in_ranged: true,
            in_melee: true,
            ..Default::default()
        };

        assert_eq!(
            select_attack_mode(&perception, &abilities),
            Some(AttackMode::Ranged)
        );
    }

    #[test]
    fn test_select_none_without_active_abilities() {
        // Способность есть, но Inactive — атаковать нечем
        let abilities = set_of(vec![ability("bite", AttackMode::Melee, AbilityPhase::Inactive)]);
        let perception = PerceptionState {
            in_ranged: true,
            in_melee: true,
            ..Default::default()
        };

        assert_eq!(select_attack_mode(&perception, &abilities), None);
    }

    #[test]
    fn test_select_none_outside_bands() {
        let abilities = set_of(vec![ability("bite", AttackMode::Melee, AbilityPhase::Ready)]);
        let perception = PerceptionState {
            detected: true,
            ..Default::default()
        };

        assert_eq!(select_attack_mode(&perception, &abilities), None);
    }

    #[test]
    fn test_default_state_is_normal() {
        assert_eq!(EnemyState::default(), EnemyState::Normal);
    }
}
