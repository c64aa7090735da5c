//! ECS Components для игровых entity
//!
//! Организация по доменам:
//! - actor: базовые характеристики (faction, health, shield, extra jumps)
//!
//! Runtime-состояние абилок и эффектов живёт в своих модулях
//! (combat::AbilitySet, effects::ActiveEffects).

pub mod actor;

// Re-exports для удобного импорта
pub use actor::*;
