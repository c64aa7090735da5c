//! CooldownGate — явный countdown вместо корутин
//!
//! Один gate на один экземпляр способности. Никаких фоновых таймеров:
//! gate двигается только явным tick'ом из FixedUpdate, поэтому два
//! конкурирующих таймера на одну (actor, ability) пару невозможны.

use bevy::prelude::*;

use super::definitions::AttackDefinition;

/// Gate между попыткой атаки и её выполнением
///
/// `try_start` атомарно проверяет готовность и запускает отсчёт.
/// `tick` монотонно уменьшает остаток до нуля, в ноль — ровно один раз.
#[derive(Debug, Clone, Default, Reflect)]
pub struct CooldownGate {
    /// Оставшееся время (секунды). 0 = готов.
    remaining: f32,
}

impl CooldownGate {
    pub fn is_ready(&self) -> bool {
        self.remaining <= 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Пытается запустить cooldown
    ///
    /// false = отсчёт уже идёт, состояние не меняется (TransientNoop,
    /// не ошибка). true = отсчёт запущен на definition.cooldown секунд.
    pub fn try_start(&mut self, definition: &AttackDefinition) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.remaining = definition.cooldown;
        true
    }

    /// Сдвигает отсчёт на delta секунд
    ///
    /// Возвращает true ровно в тот tick, когда gate перешёл в готовность
    /// (edge для Active-Cooling → Active-Idle). Повторные tick'и на нуле —
    /// false, без побочных эффектов.
    pub fn tick(&mut self, delta: f32) -> bool {
        if self.remaining <= 0.0 {
            return false;
        }
        self.remaining = (self.remaining - delta).max(0.0);
        self.remaining == 0.0
    }

    /// Сброс в готовность (деактивация способности)
    ///
    /// После повторной активации cooldown начинается заново, не продолжается.
    pub fn cancel(&mut self) {
        self.remaining = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::definitions::AttackDefinition;

    fn definition_with_cooldown(cooldown: f32) -> AttackDefinition {
        AttackDefinition {
            cooldown,
            ..AttackDefinition::base("gate_test", "Gate Test")
        }
    }

    #[test]
    fn test_try_start_blocks_while_running() {
        let def = definition_with_cooldown(1.0);
        let mut gate = CooldownGate::default();

        assert!(gate.is_ready());
        assert!(gate.try_start(&def));
        assert!(!gate.is_ready());

        // Второй запуск — no-op, остаток не трогаем
        assert!(!gate.try_start(&def));
        assert_eq!(gate.remaining(), 1.0);
    }

    #[test]
    fn test_tick_monotonic_to_zero() {
        let def = definition_with_cooldown(1.0);
        let mut gate = CooldownGate::default();
        gate.try_start(&def);

        assert!(!gate.tick(0.5));
        assert_eq!(gate.remaining(), 0.5);

        // Переход через ноль: clamp, не минус
        assert!(gate.tick(0.7));
        assert_eq!(gate.remaining(), 0.0);
        assert!(gate.is_ready());
    }

    #[test]
    fn test_ready_edge_fires_once() {
        let def = definition_with_cooldown(0.4);
        let mut gate = CooldownGate::default();
        gate.try_start(&def);

        assert!(!gate.tick(0.2));
        assert!(gate.tick(0.2)); // стал готов — edge
        assert!(!gate.tick(0.2)); // уже готов — edge не повторяется
        assert!(!gate.tick(0.2));
    }

    #[test]
    fn test_cancel_resets_fresh() {
        let def = definition_with_cooldown(2.0);
        let mut gate = CooldownGate::default();
        gate.try_start(&def);
        gate.tick(0.5);

        gate.cancel();
        assert!(gate.is_ready());

        // Новый запуск стартует с полного cooldown, не с остатка
        assert!(gate.try_start(&def));
        assert_eq!(gate.remaining(), 2.0);
    }
}
