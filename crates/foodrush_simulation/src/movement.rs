//! Минимальное перемещение для headless симуляции
//!
//! Полноценный контроллер персонажа (гравитация, коллизии, прыжки) — зона
//! внешнего движка. Симуляции нужен только срез, который трогают AI и
//! эффекты: флаг включения, множитель скорости, stun, цель преследования
//! и knockback-импульс от попаданий.

use bevy::prelude::*;

/// Locomotion — состояние перемещения актора
///
/// AI включает/выключает его при смене Normal ↔ Attack, эффекты крутят
/// `speed_multiplier` / `stunned`, урон добавляет `impulse`.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Locomotion {
    /// Движение разрешено (FSM выключает на время атаки)
    pub enabled: bool,
    /// Базовая скорость (m/s)
    pub move_speed: f32,
    /// Множитель от эффектов (speed ×2, slow ×0.5, sticky ×0.3)
    pub speed_multiplier: f32,
    /// Stun: стоим на месте, пока эффект не снят
    pub stunned: bool,
    /// Цель преследования (враг идёт к ней, пока в Normal)
    pub target: Option<Entity>,
    /// Накопленный knockback-импульс (затухает каждый tick)
    pub impulse: Vec2,
    /// Последнее направление движения (facing для атак)
    pub facing: Vec2,
}

impl Default for Locomotion {
    fn default() -> Self {
        Self {
            enabled: true,
            move_speed: 3.0,
            speed_multiplier: 1.0,
            stunned: false,
            target: None,
            impulse: Vec2::ZERO,
            facing: Vec2::X,
        }
    }
}

impl Locomotion {
    /// Итоговая скорость с учётом эффектов
    pub fn effective_speed(&self) -> f32 {
        if self.stunned || !self.enabled {
            0.0
        } else {
            self.move_speed * self.speed_multiplier
        }
    }
}

/// Затухание импульса (1/s). Knockback гаснет примерно за четверть секунды.
const IMPULSE_DAMPING: f32 = 8.0;

/// Минимальная дистанция до цели — ближе не подходим
const MIN_CHASE_DISTANCE: f32 = 0.5;

/// Система: направление движения к цели
///
/// Пишет facing для акторов с целью. Чтение Transform цели и своего —
/// оба read-only, конфликтов нет.
pub fn steer_locomotion(
    mut movers: Query<(&Transform, &mut Locomotion)>,
    targets: Query<&Transform>,
) {
    for (transform, mut locomotion) in movers.iter_mut() {
        let Some(target) = locomotion.target else {
            continue;
        };

        let Ok(target_transform) = targets.get(target) else {
            // Цель despawned — сбрасываем
            locomotion.target = None;
            continue;
        };

        let to_target =
            target_transform.translation.truncate() - transform.translation.truncate();

        if to_target.length() > MIN_CHASE_DISTANCE {
            locomotion.facing = to_target.normalize_or_zero();
        }
    }
}

/// Система: интеграция позиции (движение + knockback)
///
/// Работает в FixedUpdate для детерминизма.
pub fn integrate_locomotion(
    mut query: Query<(&mut Transform, &mut Locomotion)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (mut transform, mut locomotion) in query.iter_mut() {
        let speed = locomotion.effective_speed();

        if speed > 0.0 && locomotion.target.is_some() {
            let step = locomotion.facing * speed * delta;
            transform.translation += step.extend(0.0);
        }

        // Knockback применяется даже к оглушённым
        if locomotion.impulse.length_squared() > 0.0001 {
            let impulse = locomotion.impulse;
            transform.translation += (impulse * delta).extend(0.0);
            locomotion.impulse *= (1.0 - IMPULSE_DAMPING * delta).max(0.0);
        } else if locomotion.impulse != Vec2::ZERO {
            locomotion.impulse = Vec2::ZERO;
        }
    }
}

/// Movement Plugin — steer + integrate в FixedUpdate
pub struct MovementPlugin;

impl Plugin for MovementPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (steer_locomotion, integrate_locomotion)
                .chain()
                .in_set(crate::SimulationSet::Movement),
        );
    }
}
