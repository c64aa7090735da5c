//! Combat system module
//!
//! ECS ответственность:
//! - Data: AttackDefinition (immutable, Arc-shared), AttackLibrary
//! - State: AbilitySet (фазы + cooldown gates, свои у каждого актора)
//! - Rules: resolver (формы, dedup, бонусный предикат), damage application
//! - Events: AttackIntent → AttackLanded → DamageDealt/EntityDied
//!
//! Внешние коллабораторы: collision-слой (через SpatialView), input-слой
//! (через TriggerPulse), контент (библиотеки определений).

use bevy::prelude::*;

pub mod ability;
pub mod cooldown;
pub mod damage;
pub mod definitions;
pub mod resolver;

// Tests (separate files with _tests suffix)
#[cfg(test)]
mod ability_tests;

// Re-export основных типов
pub use ability::{
    AbilityInstance, AbilityPhase, AbilitySet, ActivateAbility, AttackIntent, AttackLanded,
    AttackPerformed, DeactivateAbility, TriggerBindings, TriggerPulse, TriggerToken,
};
pub use cooldown::CooldownGate;
pub use damage::{DamageDealt, DamageRequest, Dead, EntityDied};
pub use definitions::{
    AttackDefinition, AttackId, AttackLibrary, AttackMode, AttackShape, BonusCondition,
    DamageBonus, DirectionPolicy,
};
pub use resolver::{resolve_attack, ActorPositions, ResolvedHit, SpatialView};

/// Combat Plugin
///
/// Регистрирует combat системы в FixedUpdate.
///
/// Порядок выполнения:
/// 1. tick_ability_cooldowns — gates вниз до нуля, Cooling → Ready
/// 2. process_ability_lifecycle — activate/deactivate (триггеры, self-эффекты)
/// 3. dispatch_trigger_pulses — input pulses → AttackIntent
/// 4. perform_attacks — intents → resolver → AttackLanded + эффекты целей
/// 5. apply_damage — попадания/заявки → Health, щит, knockback
/// 6. disable_ai_on_death — мертвые перестают решать и двигаться
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        // Регистрация событий
        app.add_event::<ActivateAbility>()
            .add_event::<DeactivateAbility>()
            .add_event::<TriggerPulse>()
            .add_event::<AttackIntent>()
            .add_event::<AttackPerformed>()
            .add_event::<AttackLanded>()
            .add_event::<DamageDealt>()
            .add_event::<DamageRequest>()
            .add_event::<EntityDied>();

        // Регистрация систем в FixedUpdate
        app.add_systems(
            FixedUpdate,
            (
                ability::tick_ability_cooldowns,
                ability::process_ability_lifecycle,
                ability::dispatch_trigger_pulses,
                ability::perform_attacks,
                damage::apply_damage,
                damage::disable_ai_on_death,
            )
                .chain() // Последовательное выполнение
                .in_set(crate::SimulationSet::Combat),
        );
    }
}
