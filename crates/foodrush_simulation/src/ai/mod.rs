//! Enemy decision-making module
//!
//! FSM из двух состояний (Normal ↔ Attack), управляется ТОЛЬКО событиями
//! perception — никаких ad hoc проверок дистанции в решениях.

use bevy::prelude::*;

pub mod decision;


// Re-export основных типов
pub use decision::{enemy_attack_execution, enemy_decision, EnemyState};

/// AI Plugin
///
/// Порядок выполнения:
/// 1. enemy_decision — PerceptionEvent → смена Normal/Attack, locomotion
/// 2. enemy_attack_execution — в Attack шлём AttackIntent, когда gate готов
pub struct AiPlugin;

impl Plugin for AiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (decision::enemy_decision, decision::enemy_attack_execution)
                .chain()
                .in_set(crate::SimulationSet::Decision),
        );
    }
}
