//! Status-effect module
//!
//! ECS ответственность:
//! - Data: EffectDefinition (immutable, Arc-shared), EffectLibrary
//! - State: ActiveEffects (набор записей на акторе, одна на EffectId)
//! - Lifecycle: apply/refresh/remove/auto-expire/periodic tick
//!
//! Игровая семантика эффектов живёт в hook-таблице (EffectHooks),
//! поставляемой контент-слоем — движок game-specific кода не содержит.

use bevy::prelude::*;

pub mod definitions;
pub mod engine;


// Re-export основных типов
pub use definitions::{EffectDefinition, EffectId, EffectLibrary};
pub use engine::{
    ActiveEffect, ActiveEffects, ApplyEffectRequest, EffectApplied, EffectHook, EffectHooks,
    EffectRemoved, HookFn, RemoveEffectRequest,
};

/// Effects Plugin
///
/// Порядок выполнения:
/// 1. process_effect_requests — заявки apply/remove (refresh по id)
/// 2. tick_effects — periodic hooks, затем auto-expire
pub struct EffectsPlugin;

impl Plugin for EffectsPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ApplyEffectRequest>()
            .add_event::<RemoveEffectRequest>()
            .add_event::<EffectApplied>()
            .add_event::<EffectRemoved>();

        app.add_systems(
            FixedUpdate,
            (engine::process_effect_requests, engine::tick_effects)
                .chain()
                .in_set(crate::SimulationSet::Effects),
        );
    }
}
