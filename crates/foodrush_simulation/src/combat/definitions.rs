//! Attack definitions — immutable, data-driven конфигурация атак
//!
//! Architecture Decision:
//! - Одна запись `AttackDefinition` + закрытый набор форм (`AttackShape`)
//!   вместо класса-наследника на каждую атаку
//! - Разделяемый контент: `Arc<AttackDefinition>` на много акторов,
//!   runtime-состояние (cooldown) всегда своё у каждого владельца
//!
//! Rationale:
//! - Новая атака = новая запись данных, не новый тип
//! - Бонусный урон описывается предикатом по активным эффектам цели,
//!   никаких проверок по именам объектов

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::effects::EffectId;

/// Стабильный идентификатор атаки (ключ контент-библиотеки)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackId(pub String);

impl AttackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Форма области поражения
///
/// Закрытый набор стратегий; выбирается данными, не подклассом.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AttackShape {
    /// Один круг, смещённый вперёд на radius × forward_offset
    Circle,
    /// Волна: N кругов, шагающих вдоль направления
    /// (ratatouille: 3 сегмента, spacing 0.75, segment_scale 0.8)
    Wave {
        segments: u32,
        spacing: f32,
        segment_scale: f32,
    },
    /// Веер лучей вокруг направления, дальность radius × 2
    /// (iced latte: 3 луча по ±15°; одиночный луч = снаряд)
    Fan { rays: u32, spread_deg: f32 },
}

/// Откуда атака берёт направление
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionPolicy {
    /// Направление взгляда атакующего (по умолчанию)
    Facing,
    /// Всегда вниз (down attack)
    Down,
}

/// Режим атаки для выбора врагом (melee band → Melee, ranged band → Ranged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackMode {
    Melee,
    Ranged,
}

/// Условие бонусного урона — проверяется по активным эффектам цели
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BonusCondition {
    /// Цель несёт конкретный эффект (latte ×2 vs `burning`)
    HasEffect(EffectId),
    /// Цель несёт хоть один эффект (poison potato ×1.2)
    HasAnyEffect,
}

/// Бонусный урон по условию
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageBonus {
    pub multiplier: f32,
    pub when: BonusCondition,
}

/// AttackDefinition — immutable конфигурация одной атаки
///
/// Создаётся контент-слоем, никогда не мутирует в runtime.
/// Делится через Arc между всеми AbilitySet, которые её экипируют.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackDefinition {
    pub id: AttackId,
    pub name: String,

    /// Базовый урон (0 = утилитарная способность)
    pub base_damage: u32,
    /// Радиус области / база дальности лучей (метры)
    pub radius: f32,
    /// Cooldown между применениями (секунды)
    pub cooldown: f32,
    /// Смещение центра вперёд в долях радиуса (0 = вокруг себя)
    pub forward_offset: f32,
    /// Активное окно (секунды, parry). 0 = мгновенная атака.
    pub duration: f32,
    /// Сила отбрасывания (импульс вдоль направления удара)
    pub knockback: f32,

    pub shape: AttackShape,
    pub direction: DirectionPolicy,
    /// Засчитывать только цели не выше атакующего (down attack)
    pub below_only: bool,
    pub mode: AttackMode,

    /// Имя активационного триггера (input binding). None = только AI/прямой вызов.
    pub binding: Option<String>,
    /// Бонусный урон по предикату активных эффектов цели
    pub bonus: Option<DamageBonus>,

    /// Эффекты на себя при активации (снимаются при деактивации)
    pub apply_on_self: Vec<EffectId>,
    /// Эффекты на каждую поражённую цель
    pub apply_on_targets: Vec<EffectId>,
}

impl AttackDefinition {
    /// Заготовка с нейтральными значениями — контент переопределяет нужное
    pub fn base(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: AttackId::new(id),
            name: name.into(),
            base_damage: 1,
            radius: 1.0,
            cooldown: 1.0,
            forward_offset: 0.0,
            duration: 0.0,
            knockback: 0.0,
            shape: AttackShape::Circle,
            direction: DirectionPolicy::Facing,
            below_only: false,
            mode: AttackMode::Melee,
            binding: None,
            bonus: None,
            apply_on_self: Vec::new(),
            apply_on_targets: Vec::new(),
        }
    }

    /// Урон по конкретной цели
    ///
    /// `condition_holds` — результат бонусного предиката для этой цели;
    /// вычисляет вызывающий, у которого есть доступ к её активным эффектам.
    pub fn damage_against(&self, condition_holds: bool) -> u32 {
        let mut damage = self.base_damage as f32;
        if condition_holds {
            if let Some(bonus) = &self.bonus {
                damage *= bonus.multiplier;
            }
        }
        damage.round() as u32
    }
}

/// Библиотека атак — разделяемый read-only контент
#[derive(Resource, Debug, Default)]
pub struct AttackLibrary {
    attacks: HashMap<AttackId, Arc<AttackDefinition>>,
}

impl AttackLibrary {
    pub fn from_definitions(definitions: Vec<AttackDefinition>) -> Self {
        let attacks = definitions
            .into_iter()
            .map(|def| (def.id.clone(), Arc::new(def)))
            .collect();
        Self { attacks }
    }

    pub fn get(&self, id: &AttackId) -> Option<Arc<AttackDefinition>> {
        self.attacks.get(id).cloned()
    }

    pub fn contains(&self, id: &AttackId) -> bool {
        self.attacks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.attacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AttackDefinition>> {
        self.attacks.values()
    }
}
