//! Perception: дистанционные band'ы врага (detected / ranged / melee)
//!
//! Опрос идёт НЕ каждый кадр — у каждого врага свой countdown
//! (poll_interval), чтобы ограничить стоимость дистанционных проверок.
//! События уходят только на СМЕНЕ band'а, парами enter/exit.
//!
//! # Invariants
//!
//! - melee ⇒ ranged ⇒ detected: флаги вложены, порядок радиусов
//!   проверяется на загрузке (detection > ranged > melee)
//! - Потеря цели раскручивает вложенность изнутри наружу:
//!   LeftMelee → LeftRanged → TargetLost, никогда наоборот
//! - Дистанция ровно на границе считается «внутри» (== radius попадает)

use bevy::prelude::*;

use crate::combat::Dead;
use crate::components::{Actor, Health};
use crate::content::ContentError;

/// Радиусы обнаружения + интервал опроса
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct PerceptionConfig {
    /// Радиус обнаружения (метры)
    pub detection_radius: f32,
    /// Радиус дальней атаки
    pub ranged_radius: f32,
    /// Радиус ближней атаки
    pub melee_radius: f32,
    /// Интервал опроса (секунды)
    pub poll_interval: f32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            detection_radius: 8.0,
            ranged_radius: 5.0,
            melee_radius: 1.5,
            poll_interval: 0.2,
        }
    }
}

impl PerceptionConfig {
    /// Конфиг с проверкой порядка радиусов (ошибка — на загрузке, не в бою)
    pub fn try_new(
        detection_radius: f32,
        ranged_radius: f32,
        melee_radius: f32,
    ) -> Result<Self, ContentError> {
        let config = Self {
            detection_radius,
            ranged_radius,
            melee_radius,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        let ordered = self.detection_radius > self.ranged_radius
            && self.ranged_radius > self.melee_radius
            && self.melee_radius > 0.0;
        if !ordered {
            return Err(ContentError::BadPerceptionOrder {
                detection: self.detection_radius,
                ranged: self.ranged_radius,
                melee: self.melee_radius,
            });
        }
        if self.poll_interval <= 0.0 {
            return Err(ContentError::InvalidPollInterval {
                interval: self.poll_interval,
            });
        }
        Ok(())
    }
}

/// Текущее состояние восприятия одного врага
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct PerceptionState {
    /// Отслеживаемая цель (None = никого не видим)
    pub target: Option<Entity>,
    pub detected: bool,
    pub in_ranged: bool,
    pub in_melee: bool,
    /// Countdown до следующего опроса
    pub poll_timer: f32,
}

impl PerceptionState {
    fn clear(&mut self) {
        self.target = None;
        self.detected = false;
        self.in_ranged = false;
        self.in_melee = false;
    }
}

/// События смены band'ов (только на переходах, не каждый опрос)
#[derive(Event, Debug, Clone, PartialEq)]
pub enum PerceptionEvent {
    /// Цель появилась в detection-радиусе, назначена текущей
    TargetDetected { observer: Entity, target: Entity },
    /// Цель ушла из detection-радиуса (или умерла), band'ы сброшены
    TargetLost { observer: Entity },
    EnteredRanged { observer: Entity, target: Entity },
    LeftRanged { observer: Entity },
    EnteredMelee { observer: Entity, target: Entity },
    LeftMelee { observer: Entity },
}

/// Система: опрос дистанций и события переходов
pub fn poll_perception(
    mut observers: Query<
        (
            Entity,
            &Actor,
            &Transform,
            &PerceptionConfig,
            &mut PerceptionState,
        ),
        Without<Dead>,
    >,
    candidates: Query<(Entity, &Actor, &Transform, &Health)>,
    time: Res<Time<Fixed>>,
    mut events: EventWriter<PerceptionEvent>,
) {
    let delta = time.delta_secs();

    for (observer, actor, transform, config, mut state) in observers.iter_mut() {
        state.poll_timer -= delta;
        if state.poll_timer > 0.0 {
            continue;
        }
        state.poll_timer = config.poll_interval;

        let position = transform.translation.truncate();

        let Some(target) = state.target else {
            // Никого не ведём — ищем ближайшего живого врага в радиусе
            if let Some(found) = find_nearest_enemy(
                observer,
                actor.faction_id,
                position,
                &candidates,
                config.detection_radius,
            ) {
                state.target = Some(found);
                state.detected = true;
                crate::log(&format!(
                    "👁️ Perception: {:?} detected {:?}",
                    observer, found
                ));
                events.write(PerceptionEvent::TargetDetected {
                    observer,
                    target: found,
                });
            }
            continue;
        };

        // Цель умерла или деспавнилась — полная потеря
        let Ok((_, _, target_transform, target_health)) = candidates.get(target) else {
            lose_target(observer, &mut state, &mut events);
            continue;
        };
        if !target_health.is_alive() {
            lose_target(observer, &mut state, &mut events);
            continue;
        }

        let distance = position.distance(target_transform.translation.truncate());

        if distance > config.detection_radius {
            // Изнутри наружу: melee, ranged, и только потом lost
            lose_target(observer, &mut state, &mut events);
            continue;
        }

        let now_melee = distance <= config.melee_radius;
        let now_ranged = distance <= config.ranged_radius;

        // Выходы — внутренний band первым
        if state.in_melee && !now_melee {
            state.in_melee = false;
            events.write(PerceptionEvent::LeftMelee { observer });
        }
        if state.in_ranged && !now_ranged {
            state.in_ranged = false;
            events.write(PerceptionEvent::LeftRanged { observer });
        }

        // Входы — внешний band первым (вложенность не нарушается ни в какой
        // момент, даже если цель перепрыгнула сразу в melee)
        if !state.in_ranged && now_ranged {
            state.in_ranged = true;
            events.write(PerceptionEvent::EnteredRanged { observer, target });
        }
        if !state.in_melee && now_melee {
            state.in_melee = true;
            events.write(PerceptionEvent::EnteredMelee { observer, target });
        }
    }
}

/// Потеря цели: exit-события изнутри наружу, потом TargetLost
fn lose_target(
    observer: Entity,
    state: &mut PerceptionState,
    events: &mut EventWriter<PerceptionEvent>,
) {
    if state.in_melee {
        events.write(PerceptionEvent::LeftMelee { observer });
    }
    if state.in_ranged {
        events.write(PerceptionEvent::LeftRanged { observer });
    }
    if state.detected {
        events.write(PerceptionEvent::TargetLost { observer });
        crate::log(&format!("👻 Perception: {:?} lost target", observer));
    }
    state.clear();
}

/// Helper: ближайший живой враг (другая фракция) в радиусе
fn find_nearest_enemy(
    observer: Entity,
    observer_faction: u64,
    position: Vec2,
    candidates: &Query<(Entity, &Actor, &Transform, &Health)>,
    max_range: f32,
) -> Option<Entity> {
    let mut nearest: Option<(Entity, f32)> = None;

    for (candidate, actor, transform, health) in candidates.iter() {
        if candidate == observer {
            continue;
        }
        // Только враги (другая фракция)
        if actor.faction_id == observer_faction {
            continue;
        }
        if !health.is_alive() {
            continue;
        }

        let distance = position.distance(transform.translation.truncate());
        if distance <= max_range {
            match nearest {
                Some((_, best)) if distance >= best => {}
                _ => nearest = Some((candidate, distance)),
            }
        }
    }

    nearest.map(|(entity, _)| entity)
}

/// Perception Plugin — опрос в FixedUpdate
pub struct PerceptionPlugin;

impl Plugin for PerceptionPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PerceptionEvent>().add_systems(
            FixedUpdate,
            poll_perception.in_set(crate::SimulationSet::Perception),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_is_valid() {
        assert!(PerceptionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_order() {
        // ranged >= detection
        assert!(PerceptionConfig::try_new(5.0, 5.0, 1.5).is_err());
        // melee >= ranged
        assert!(PerceptionConfig::try_new(8.0, 2.0, 3.0).is_err());
        // нулевой melee
        assert!(PerceptionConfig::try_new(8.0, 5.0, 0.0).is_err());

        assert!(PerceptionConfig::try_new(8.0, 5.0, 1.5).is_ok());
    }

    #[test]
    fn test_boundary_distance_counts_as_inside() {
        let config = PerceptionConfig::default();
        let distance = config.melee_radius; // ровно на границе

        assert!(distance <= config.melee_radius);
        assert!(distance <= config.ranged_radius);
    }

    #[test]
    fn test_state_clear_resets_all_bands() {
        let mut state = PerceptionState {
            target: Some(Entity::PLACEHOLDER),
            detected: true,
            in_ranged: true,
            in_melee: true,
            poll_timer: 0.1,
        };

        state.clear();
        assert!(state.target.is_none());
        assert!(!state.detected && !state.in_ranged && !state.in_melee);
    }
}
