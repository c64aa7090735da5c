//! Effect engine: жизненный цикл активных эффектов
//!
//! # Architecture
//!
//! Движок владеет ТОЛЬКО жизненным циклом: apply / refresh / remove /
//! auto-expire / periodic tick. Вся игровая семантика (скорость, stun,
//! урон яда, визуал) — в hook-таблице, которую поставляет контент-слой.
//!
//! # Invariants
//!
//! - На (актор, EffectId) — максимум одна активная запись. Повторный apply
//!   обновляет таймер и повторно зовёт on_apply, второй записи не бывает.
//! - Remove отсутствующего эффекта — тихий no-op: ручное снятие может
//!   гоняться с естественным истечением, обе стороны безопасны.
//! - Таймеры — явные countdown'ы, двигаются только tick'ом FixedUpdate.

use bevy::prelude::*;
use std::collections::HashMap;

use super::definitions::{EffectId, EffectLibrary};

// ============================================================================
// Components
// ============================================================================

/// Одна активная запись эффекта на акторе
#[derive(Debug, Clone)]
pub struct ActiveEffect {
    pub effect: EffectId,
    /// Оставшееся время до истечения (не используется при duration == 0)
    pub remaining: f32,
    /// Countdown до следующего periodic hook'а (0 = без tick'ов)
    pub tick_timer: f32,
}

/// Набор активных эффектов актора
///
/// Владеет записями эксклюзивно: источник эффекта (чужая способность)
/// после деактивации на них не влияет.
#[derive(Component, Debug, Default)]
pub struct ActiveEffects {
    entries: Vec<ActiveEffect>,
}

impl ActiveEffects {
    pub fn has(&self, id: &EffectId) -> bool {
        self.entries.iter().any(|entry| &entry.effect == id)
    }

    pub fn get(&self, id: &EffectId) -> Option<&ActiveEffect> {
        self.entries.iter().find(|entry| &entry.effect == id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveEffect> {
        self.entries.iter()
    }
}

// ============================================================================
// Hook table (контракт контент-слоя)
// ============================================================================

/// Callback hook'а: (актор, magnitude, Commands)
///
/// Commands позволяет hook'у менять компоненты актора и слать события,
/// не давая ему прямой mutable доступ к чужому состоянию.
pub type HookFn = Box<dyn Fn(Entity, f32, &mut Commands) + Send + Sync>;

/// Hooks одного вида эффекта
#[derive(Default)]
pub struct EffectHook {
    pub on_apply: Option<HookFn>,
    pub on_remove: Option<HookFn>,
    /// Periodic hook (каждые tick_interval секунд, пока эффект активен)
    pub on_tick: Option<HookFn>,
}

impl EffectHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_apply(mut self, hook: impl Fn(Entity, f32, &mut Commands) + Send + Sync + 'static) -> Self {
        self.on_apply = Some(Box::new(hook));
        self
    }

    pub fn on_remove(mut self, hook: impl Fn(Entity, f32, &mut Commands) + Send + Sync + 'static) -> Self {
        self.on_remove = Some(Box::new(hook));
        self
    }

    pub fn on_tick(mut self, hook: impl Fn(Entity, f32, &mut Commands) + Send + Sync + 'static) -> Self {
        self.on_tick = Some(Box::new(hook));
        self
    }
}

/// Таблица hook'ов по идентичности эффекта
///
/// Заполняется контент-слоем при старте. Эффект без hook'ов — чистый тег
/// (grease, burning): виден предикатам урона, поведения не несёт.
#[derive(Resource, Default)]
pub struct EffectHooks {
    table: HashMap<EffectId, EffectHook>,
}

impl EffectHooks {
    pub fn register(&mut self, id: EffectId, hook: EffectHook) {
        self.table.insert(id, hook);
    }

    pub fn get(&self, id: &EffectId) -> Option<&EffectHook> {
        self.table.get(id)
    }

    fn fire_apply(&self, id: &EffectId, actor: Entity, magnitude: f32, commands: &mut Commands) {
        if let Some(hook) = self.table.get(id).and_then(|h| h.on_apply.as_ref()) {
            hook(actor, magnitude, commands);
        }
    }

    fn fire_remove(&self, id: &EffectId, actor: Entity, magnitude: f32, commands: &mut Commands) {
        if let Some(hook) = self.table.get(id).and_then(|h| h.on_remove.as_ref()) {
            hook(actor, magnitude, commands);
        }
    }

    fn fire_tick(&self, id: &EffectId, actor: Entity, magnitude: f32, commands: &mut Commands) {
        if let Some(hook) = self.table.get(id).and_then(|h| h.on_tick.as_ref()) {
            hook(actor, magnitude, commands);
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Заявка: наложить эффект на актора
#[derive(Event, Debug, Clone)]
pub struct ApplyEffectRequest {
    pub target: Entity,
    pub effect: EffectId,
}

/// Заявка: снять эффект с актора (no-op если не активен)
#[derive(Event, Debug, Clone)]
pub struct RemoveEffectRequest {
    pub target: Entity,
    pub effect: EffectId,
}

/// Эффект наложен (refreshed = уже был активен, таймер обновлён)
#[derive(Event, Debug, Clone)]
pub struct EffectApplied {
    pub target: Entity,
    pub effect: EffectId,
    pub refreshed: bool,
}

/// Эффект снят (expired = по таймеру, иначе вручную)
#[derive(Event, Debug, Clone)]
pub struct EffectRemoved {
    pub target: Entity,
    pub effect: EffectId,
    pub expired: bool,
}

// ============================================================================
// Systems
// ============================================================================

/// Система: обработка заявок apply/remove
///
/// Apply с уже активным id — refresh: remaining ← duration, on_apply
/// вызывается повторно (идемпотентный), записи не дублируются.
pub fn process_effect_requests(
    mut apply_events: EventReader<ApplyEffectRequest>,
    mut remove_events: EventReader<RemoveEffectRequest>,
    mut targets: Query<&mut ActiveEffects>,
    library: Res<EffectLibrary>,
    hooks: Res<EffectHooks>,
    mut applied_events: EventWriter<EffectApplied>,
    mut removed_events: EventWriter<EffectRemoved>,
    mut commands: Commands,
) {
    for request in apply_events.read() {
        let Some(definition) = library.get(&request.effect) else {
            // Валидация контента должна была это поймать на загрузке
            crate::log_warning(&format!(
                "ApplyEffectRequest: unknown effect '{}' — skipped",
                request.effect
            ));
            continue;
        };
        let Ok(mut effects) = targets.get_mut(request.target) else {
            // Цель умерла/деспавнилась между заявкой и обработкой
            continue;
        };

        let refreshed = if let Some(entry) = effects
            .entries
            .iter_mut()
            .find(|entry| entry.effect == request.effect)
        {
            // Refresh: last-apply-wins, второй записи не создаём
            entry.remaining = definition.duration;
            entry.tick_timer = definition.tick_interval;
            true
        } else {
            effects.entries.push(ActiveEffect {
                effect: request.effect.clone(),
                remaining: definition.duration,
                tick_timer: definition.tick_interval,
            });
            false
        };

        hooks.fire_apply(
            &request.effect,
            request.target,
            definition.magnitude,
            &mut commands,
        );

        crate::log(&format!(
            "✨ Effect applied: {} (target: {:?}, refreshed: {})",
            request.effect, request.target, refreshed
        ));

        applied_events.write(EffectApplied {
            target: request.target,
            effect: request.effect.clone(),
            refreshed,
        });
    }

    for request in remove_events.read() {
        let Ok(mut effects) = targets.get_mut(request.target) else {
            continue;
        };

        let was_present = effects.has(&request.effect);
        if !was_present {
            // Идемпотентность: снятие отсутствующего — тихий no-op
            continue;
        }

        effects.entries.retain(|entry| entry.effect != request.effect);

        let magnitude = library
            .get(&request.effect)
            .map(|def| def.magnitude)
            .unwrap_or(1.0);
        hooks.fire_remove(&request.effect, request.target, magnitude, &mut commands);

        crate::log(&format!(
            "🧹 Effect removed: {} (target: {:?})",
            request.effect, request.target
        ));

        removed_events.write(EffectRemoved {
            target: request.target,
            effect: request.effect.clone(),
            expired: false,
        });
    }
}

/// Система: таймеры эффектов (periodic hooks + auto-expire)
///
/// Periodic tick обрабатывается ДО expiry, чтобы финальный tick яда успел
/// сработать в том же кадре, в котором эффект истекает.
pub fn tick_effects(
    mut actors: Query<(Entity, &mut ActiveEffects)>,
    library: Res<EffectLibrary>,
    hooks: Res<EffectHooks>,
    time: Res<Time<Fixed>>,
    mut removed_events: EventWriter<EffectRemoved>,
    mut commands: Commands,
) {
    let delta = time.delta_secs();

    for (actor, mut effects) in actors.iter_mut() {
        let mut expired: Vec<(EffectId, f32)> = Vec::new();

        for entry in effects.entries.iter_mut() {
            let Some(definition) = library.get(&entry.effect) else {
                continue;
            };

            // Periodic hook (poison tick и подобные)
            if definition.tick_interval > 0.0 {
                entry.tick_timer -= delta;
                while entry.tick_timer <= 0.0 {
                    hooks.fire_tick(&entry.effect, actor, definition.magnitude, &mut commands);
                    entry.tick_timer += definition.tick_interval;
                }
            }

            // Auto-expire countdown
            if definition.expires() {
                entry.remaining -= delta;
                if entry.remaining <= 0.0 {
                    expired.push((entry.effect.clone(), definition.magnitude));
                }
            }
        }

        if expired.is_empty() {
            continue;
        }

        // Снимаем истёкшие: запись удаляется ровно один раз, потом hook
        for (effect, magnitude) in expired {
            effects.entries.retain(|entry| entry.effect != effect);
            hooks.fire_remove(&effect, actor, magnitude, &mut commands);

            crate::log(&format!(
                "⌛ Effect expired: {} (target: {:?})",
                effect, actor
            ));

            removed_events.write(EffectRemoved {
                target: actor,
                effect,
                expired: true,
            });
        }
    }
}
