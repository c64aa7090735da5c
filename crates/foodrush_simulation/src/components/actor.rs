//! Базовые компоненты акторов: Actor, Health, защитные модификаторы

use bevy::prelude::*;

/// Актор (игрок или враг) — базовый компонент для живых существ
///
/// Автоматически добавляет Health, ActiveEffects, AbilitySet и Locomotion
/// через Required Components.
#[derive(Component, Debug, Clone, Default)]
#[require(
    Health,
    crate::effects::ActiveEffects,
    crate::combat::AbilitySet,
    crate::movement::Locomotion
)]
pub struct Actor {
    /// Stable ID фракции (игрок = 0, враги = 1+)
    pub faction_id: u64,
}

/// Здоровье актора
///
/// Инвариант: 0 ≤ current ≤ max
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100) // Default 100 HP
    }
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.current = self.current.saturating_sub(amount);
    }

    pub fn heal(&mut self, amount: u32) {
        self.current = (self.current + amount).min(self.max);
    }
}

/// Заряды щита (эффект `shield`)
///
/// Каждый заряд полностью поглощает один входящий удар.
/// Когда заряды кончились — компонент снимается и эффект удаляется.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct ShieldCharges {
    pub remaining: u32,
}

impl ShieldCharges {
    pub fn new(charges: u32) -> Self {
        Self { remaining: charges }
    }

    /// Пытается поглотить удар. true = урон полностью заблокирован.
    pub fn try_block(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
            true
        } else {
            false
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.remaining == 0
    }
}

/// Дополнительные прыжки (эффект `extra_jump`)
///
/// Симуляция сама прыжками не управляет — компонент читает внешний
/// movement-слой. Здесь только контракт: сколько прыжков добавлено.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct ExtraJumps {
    pub count: u32,
}
