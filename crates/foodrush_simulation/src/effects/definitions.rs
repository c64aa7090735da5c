//! Effect definitions — immutable описания статус-эффектов
//!
//! Идентичность эффекта (`EffectId`) — единственный ключ дедупликации и
//! refresh'а: на одном акторе не бывает двух активных эффектов с одним id.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Стабильный идентификатор вида эффекта
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectId(pub String);

impl EffectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// EffectDefinition — immutable конфигурация эффекта
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub id: EffectId,
    pub name: String,

    /// Длительность (секунды). 0 = снимается только вручную.
    pub duration: f32,
    /// Сила эффекта (множитель скорости, урон за tick, заряды щита...)
    /// — интерпретирует hook, не движок.
    pub magnitude: f32,
    /// Снимать автоматически по истечении duration
    pub auto_expire: bool,
    /// Интервал периодического hook'а (секунды). 0 = нет periodic tick.
    pub tick_interval: f32,

    /// ID визуального эффекта для внешнего слоя (None = без визуала)
    pub vfx: Option<String>,
}

impl EffectDefinition {
    /// Заготовка: без длительности (manual-only), magnitude 1, без tick'а
    pub fn base(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: EffectId::new(id),
            name: name.into(),
            duration: 0.0,
            magnitude: 1.0,
            auto_expire: true,
            tick_interval: 0.0,
            vfx: None,
        }
    }

    /// Эффект живёт по таймеру?
    pub fn expires(&self) -> bool {
        self.auto_expire && self.duration > 0.0
    }
}

/// Библиотека эффектов — разделяемый read-only контент
#[derive(Resource, Debug, Default)]
pub struct EffectLibrary {
    effects: HashMap<EffectId, Arc<EffectDefinition>>,
}

impl EffectLibrary {
    pub fn from_definitions(definitions: Vec<EffectDefinition>) -> Self {
        let effects = definitions
            .into_iter()
            .map(|def| (def.id.clone(), Arc::new(def)))
            .collect();
        Self { effects }
    }

    pub fn get(&self, id: &EffectId) -> Option<Arc<EffectDefinition>> {
        self.effects.get(id).cloned()
    }

    pub fn contains(&self, id: &EffectId) -> bool {
        self.effects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EffectDefinition>> {
        self.effects.values()
    }
}
