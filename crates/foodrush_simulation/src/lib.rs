//! FOODRUSH Simulation Core
//!
//! ECS-симуляция боя на Bevy 0.16 (headless, tick-driven).
//! Один fixed tick (60Hz) двигает все таймеры: cooldowns, эффекты, knockback.
//! Perception опрашивается реже (свой countdown per enemy).
//!
//! Архитектура:
//! - combat: атаки (data-driven определения, cooldown gate, resolver, урон)
//! - effects: статус-эффекты (apply/refresh/remove, auto-expire, DoT hooks)
//! - perception: дистанционные band'ы врагов (detected / ranged / melee)
//! - ai: enemy FSM (Normal ↔ Attack), управляется только perception событиями
//!
//! Рендер, звук, input-устройства — внешние коллабораторы, здесь только
//! контракты (TriggerBindings, hook-таблица эффектов, vfx id в данных).

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod ai;
pub mod combat;
pub mod components;
pub mod content;
pub mod effects;
pub mod movement;
pub mod perception;

// Re-export базовых типов для удобства
pub use ai::{AiPlugin, EnemyState};
pub use combat::{
    AbilityPhase, AbilitySet, ActivateAbility, AttackDefinition, AttackId, AttackIntent,
    AttackLanded, AttackLibrary, AttackMode, AttackPerformed, AttackShape, CombatPlugin,
    CooldownGate, DamageDealt, DamageRequest, Dead, DeactivateAbility, EntityDied, ResolvedHit,
    TriggerBindings, TriggerPulse,
};
pub use components::*;
pub use content::{ContentError, EnemyArchetype};
pub use effects::{
    ActiveEffects, ApplyEffectRequest, EffectDefinition, EffectHooks, EffectId,
    EffectLibrary, EffectsPlugin, RemoveEffectRequest,
};
pub use movement::Locomotion;
pub use perception::{PerceptionConfig, PerceptionEvent, PerceptionPlugin, PerceptionState};

/// Фазы одного simulation tick'а
///
/// Порядок фиксирован: события каждой фазы доходят до следующей в тот же
/// tick, и прогон с одинаковым сетапом воспроизводится бит-в-бит.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Опрос дистанций, band-события
    Perception,
    /// Enemy FSM: band-события → Normal/Attack + intents
    Decision,
    /// Cooldowns, выполнение атак, урон
    Combat,
    /// Статус-эффекты: заявки, expiry, DoT
    Effects,
    /// Интеграция движения и knockback
    Movement,
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick (легче считать интервалы)
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            // Детерминированный порядок фаз внутри tick'а
            .configure_sets(
                FixedUpdate,
                (
                    SimulationSet::Perception,
                    SimulationSet::Decision,
                    SimulationSet::Combat,
                    SimulationSet::Effects,
                    SimulationSet::Movement,
                )
                    .chain(),
            )
            // Детерминистичный RNG (seed по умолчанию)
            .insert_resource(DeterministicRng::new(42))
            // Стандартный контент (атаки, эффекты, hooks)
            .insert_resource(content::standard_attack_library())
            .insert_resource(content::standard_effect_library())
            .insert_resource(content::standard_effect_hooks())
            .insert_resource(combat::TriggerBindings::default())
            // Подсистемы
            .add_plugins((
                CombatPlugin,
                EffectsPlugin,
                PerceptionPlugin,
                AiPlugin,
                movement::MovementPlugin,
            ));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0)); // 60Hz FixedUpdate

    app
}

use once_cell::sync::Lazy;
use std::sync::Mutex;

// Потокобезопасный глобальный logger (static, без Arc)
static LOGGER: Lazy<Mutex<Option<Box<dyn LogPrinter>>>> = Lazy::new(|| Mutex::new(None));

pub static LOGGER_LEVEL: Lazy<Mutex<LogLevel>> = Lazy::new(|| Mutex::new(LogLevel::Debug));

pub fn set_logger(logger: Box<dyn LogPrinter>) {
    *LOGGER.lock().unwrap() = Some(logger);
}

pub fn set_log_level(level: LogLevel) {
    *LOGGER_LEVEL.lock().unwrap() = level;
}

pub fn set_logger_if_needed(logger: Box<dyn LogPrinter>) {
    if LOGGER.lock().unwrap().is_none() {
        set_logger(logger);
    }
}

pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl PartialOrd for LogLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogLevel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_int().cmp(&other.as_int())
    }
}

impl PartialEq for LogLevel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for LogLevel {}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn as_int(&self) -> i32 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
        }
    }
}

pub trait LogPrinter: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

pub fn log(message: &str) {
    log_with_level(LogLevel::Debug, message);
}

pub fn log_info(message: &str) {
    log_with_level(LogLevel::Info, message);
}

pub fn log_warning(message: &str) {
    log_with_level(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log_with_level(LogLevel::Error, message);
}

pub fn log_with_level(level: LogLevel, message: &str) {
    // Лочим mutex, достаём logger, вызываем log (timestamp добавляем здесь)
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        logger.log(level, &format!("[{}] {}", timestamp, message));
    }
}

struct ConsoleLogger;

impl LogPrinter for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str) {
        println!("[{}] {}", level.as_str(), message);
    }
}

pub fn init_logger() {
    set_logger_if_needed(Box::new(ConsoleLogger));
}
