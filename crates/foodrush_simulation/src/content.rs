//! Контент-слой: стандартные атаки, эффекты, hooks и архетипы врагов
//!
//! Каждая способность — запись данных в библиотеке, а не тип. Девять
//! «съедобных» способностей, три атаки игрока и атаки врагов отличаются
//! только числами, формой и списками эффектов.
//!
//! Ошибки контента (висячие id, кривые радиусы) — громко и на загрузке,
//! через `validate_*`; в бою таких проверок уже нет.

use bevy::prelude::*;
use thiserror::Error;

use crate::combat::{
    ActivateAbility, AttackDefinition, AttackId, AttackLibrary, AttackMode, AttackShape,
    BonusCondition, DamageBonus, DamageRequest, DirectionPolicy,
};
use crate::components::{Actor, ExtraJumps, Health, ShieldCharges};
use crate::effects::{EffectDefinition, EffectHook, EffectHooks, EffectId, EffectLibrary};
use crate::movement::Locomotion;
use crate::perception::{PerceptionConfig, PerceptionState};

/// Ошибки контента. Поднимаются на загрузке, не в бою.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("attack '{attack}' references unknown effect '{effect}'")]
    UnknownEffect { attack: String, effect: String },

    #[error("attack '{attack}' has non-positive radius {radius}")]
    InvalidRadius { attack: String, radius: f32 },

    #[error("attack '{attack}' has negative cooldown {cooldown}")]
    InvalidCooldown { attack: String, cooldown: f32 },

    #[error("archetype '{archetype}' references unknown attack '{attack}'")]
    UnknownAttack { archetype: String, attack: String },

    #[error(
        "perception radii must be ordered detection > ranged > melee > 0 \
         (got {detection}/{ranged}/{melee})"
    )]
    BadPerceptionOrder {
        detection: f32,
        ranged: f32,
        melee: f32,
    },

    #[error("perception poll interval must be positive (got {interval})")]
    InvalidPollInterval { interval: f32 },

    #[error("content parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

// ============================================================================
// Effects
// ============================================================================

/// Стандартный набор эффектов
pub fn standard_effects() -> Vec<EffectDefinition> {
    vec![
        // Чай: ускорение, живёт пока способность активна
        EffectDefinition {
            duration: 0.0,
            magnitude: 2.0,
            vfx: Some("speed_trail".into()),
            ..EffectDefinition::base("speed", "Speed")
        },
        // Айс-латте: замедление целей
        EffectDefinition {
            duration: 3.0,
            magnitude: 0.5,
            vfx: Some("frost_overlay".into()),
            ..EffectDefinition::base("slow", "Slow")
        },
        // Механический паук: оглушение
        EffectDefinition {
            duration: 1.0,
            vfx: Some("stun_stars".into()),
            ..EffectDefinition::base("stun", "Stun")
        },
        // Шершень: яд, 1 урона в секунду
        EffectDefinition {
            duration: 5.0,
            magnitude: 1.0,
            tick_interval: 1.0,
            vfx: Some("poison_bubbles".into()),
            ..EffectDefinition::base("poison", "Poison")
        },
        // Бургер: жирная метка (тег для бонуса рататуя)
        EffectDefinition {
            duration: 4.0,
            vfx: Some("grease_drip".into()),
            ..EffectDefinition::base("grease", "Grease")
        },
        // Пельмени: липкое замедление
        EffectDefinition {
            duration: 2.0,
            magnitude: 0.3,
            ..EffectDefinition::base("sticky", "Sticky")
        },
        // Драконий фрукт: щит, снимается вместе со способностью
        EffectDefinition {
            duration: 0.0,
            magnitude: 1.0,
            vfx: Some("shield_bubble".into()),
            ..EffectDefinition::base("shield", "Shield")
        },
        // Корейская морковка: +1 прыжок, пока способность активна
        EffectDefinition {
            duration: 0.0,
            magnitude: 1.0,
            ..EffectDefinition::base("extra_jump", "Extra Jump")
        },
        // Горение: тег окружения (латте бьёт таких ×2)
        EffectDefinition {
            duration: 3.0,
            vfx: Some("flames".into()),
            ..EffectDefinition::base("burning", "Burning")
        },
        // Парирование: короткий стан атакующих рядом
        EffectDefinition {
            duration: 1.5,
            ..EffectDefinition::base("stagger", "Stagger")
        },
    ]
}

pub fn standard_effect_library() -> EffectLibrary {
    EffectLibrary::from_definitions(standard_effects())
}

/// Hook-таблица стандартных эффектов
///
/// grease и burning — чистые теги: поведения нет, только видимость для
/// бонусных предикатов урона.
pub fn standard_effect_hooks() -> EffectHooks {
    let mut hooks = EffectHooks::default();

    // Множитель скорости: speed / slow / sticky — одна и та же механика,
    // различается только magnitude из определения
    for id in ["speed", "slow", "sticky"] {
        hooks.register(
            EffectId::new(id),
            EffectHook::new()
                .on_apply(|actor, magnitude, commands| {
                    commands
                        .entity(actor)
                        .entry::<Locomotion>()
                        .and_modify(move |mut locomotion| {
                            locomotion.speed_multiplier = magnitude;
                        });
                })
                .on_remove(|actor, _, commands| {
                    commands
                        .entity(actor)
                        .entry::<Locomotion>()
                        .and_modify(|mut locomotion| {
                            locomotion.speed_multiplier = 1.0;
                        });
                }),
        );
    }

    // Stun и stagger держат актора на месте
    for id in ["stun", "stagger"] {
        hooks.register(
            EffectId::new(id),
            EffectHook::new()
                .on_apply(|actor, _, commands| {
                    commands
                        .entity(actor)
                        .entry::<Locomotion>()
                        .and_modify(|mut locomotion| {
                            locomotion.stunned = true;
                        });
                })
                .on_remove(|actor, _, commands| {
                    commands
                        .entity(actor)
                        .entry::<Locomotion>()
                        .and_modify(|mut locomotion| {
                            locomotion.stunned = false;
                        });
                }),
        );
    }

    // Яд: periodic урон без автора
    hooks.register(
        EffectId::new("poison"),
        EffectHook::new().on_tick(|actor, magnitude, commands| {
            commands.send_event(DamageRequest {
                target: actor,
                amount: magnitude as u32,
                source: None,
            });
        }),
    );

    // Щит: заряды блокировки, расходуются damage-системой
    hooks.register(
        EffectId::new("shield"),
        EffectHook::new()
            .on_apply(|actor, magnitude, commands| {
                commands
                    .entity(actor)
                    .insert(ShieldCharges::new(magnitude as u32));
            })
            .on_remove(|actor, _, commands| {
                commands.entity(actor).remove::<ShieldCharges>();
            }),
    );

    // Дополнительные прыжки: контракт для внешнего movement-слоя
    hooks.register(
        EffectId::new("extra_jump"),
        EffectHook::new()
            .on_apply(|actor, magnitude, commands| {
                commands.entity(actor).insert(ExtraJumps {
                    count: magnitude as u32,
                });
            })
            .on_remove(|actor, _, commands| {
                commands.entity(actor).remove::<ExtraJumps>();
            }),
    );

    hooks
}

// ============================================================================
// Attacks
// ============================================================================

/// Стандартный набор атак: игрок, девять food-способностей, враги
pub fn standard_attacks() -> Vec<AttackDefinition> {
    vec![
        // --- Атаки игрока ---
        AttackDefinition {
            base_damage: 10,
            radius: 1.5,
            cooldown: 0.8,
            forward_offset: 0.7,
            knockback: 2.0,
            binding: Some("LeftMouse".into()),
            ..AttackDefinition::base("main", "Main Attack")
        },
        // Парирование: круг вокруг себя, урона нет, короткий стан
        AttackDefinition {
            base_damage: 0,
            radius: 1.2,
            cooldown: 1.0,
            duration: 0.3,
            binding: Some("RightMouse".into()),
            apply_on_targets: vec![EffectId::new("stagger")],
            ..AttackDefinition::base("parry", "Parry")
        },
        AttackDefinition {
            base_damage: 12,
            radius: 1.5,
            cooldown: 1.0,
            forward_offset: 0.7,
            knockback: 3.0,
            direction: DirectionPolicy::Down,
            below_only: true,
            binding: Some("DownAttack".into()),
            ..AttackDefinition::base("down", "Down Attack")
        },
        // --- Food-способности ---
        // Чай: удар вокруг себя + ускорение пока активен
        AttackDefinition {
            base_damage: 8,
            radius: 2.0,
            cooldown: 2.0,
            binding: Some("FoodAttack".into()),
            apply_on_self: vec![EffectId::new("speed")],
            ..AttackDefinition::base("tea", "Tea")
        },
        // Бургер: жирная метка на целях
        AttackDefinition {
            base_damage: 12,
            radius: 1.5,
            cooldown: 3.0,
            forward_offset: 0.7,
            knockback: 2.0,
            binding: Some("FoodAttack".into()),
            apply_on_targets: vec![EffectId::new("grease")],
            ..AttackDefinition::base("burger", "Burger")
        },
        // Айс-латте: три ледяных осколка веером, ×2 по горящим
        AttackDefinition {
            base_damage: 6,
            radius: 1.5,
            cooldown: 1.5,
            shape: AttackShape::Fan {
                rays: 3,
                spread_deg: 15.0,
            },
            binding: Some("FoodAttack".into()),
            bonus: Some(DamageBonus {
                multiplier: 2.0,
                when: BonusCondition::HasEffect(EffectId::new("burning")),
            }),
            apply_on_targets: vec![EffectId::new("slow")],
            ..AttackDefinition::base("iced_latte", "Iced Latte")
        },
        // Рататуй: лоза из трёх сегментов, ×2 по жирным
        AttackDefinition {
            base_damage: 7,
            radius: 1.0,
            cooldown: 2.5,
            shape: AttackShape::Wave {
                segments: 3,
                spacing: 0.75,
                segment_scale: 0.8,
            },
            binding: Some("FoodAttack".into()),
            bonus: Some(DamageBonus {
                multiplier: 2.0,
                when: BonusCondition::HasEffect(EffectId::new("grease")),
            }),
            ..AttackDefinition::base("ratatouille", "Ratatouille")
        },
        // Пельмени: липкая зона
        AttackDefinition {
            base_damage: 9,
            radius: 1.3,
            cooldown: 2.0,
            forward_offset: 0.7,
            binding: Some("FoodAttack".into()),
            apply_on_targets: vec![EffectId::new("sticky")],
            ..AttackDefinition::base("dumpling", "Dumpling")
        },
        // Корейская морковка: не атакует, даёт +1 прыжок
        AttackDefinition {
            base_damage: 0,
            radius: 1.0,
            cooldown: 0.5,
            binding: Some("FoodAttack".into()),
            apply_on_self: vec![EffectId::new("extra_jump")],
            ..AttackDefinition::base("korean_carrot", "Korean Carrot")
        },
        // Драконий фрукт: таран с шипами + щит
        AttackDefinition {
            base_damage: 12,
            radius: 1.4,
            cooldown: 2.0,
            forward_offset: 0.7,
            knockback: 4.0,
            binding: Some("FoodAttack".into()),
            apply_on_self: vec![EffectId::new("shield")],
            ..AttackDefinition::base("dragon_fruit", "Dragon Fruit")
        },
        // Взрывная карамель: большой радиус, сильный отброс
        AttackDefinition {
            base_damage: 15,
            radius: 2.5,
            cooldown: 4.0,
            forward_offset: 0.8,
            knockback: 5.0,
            binding: Some("FoodAttack".into()),
            ..AttackDefinition::base("explosive_caramel", "Explosive Caramel")
        },
        // Ядовитая картошка: волна, ×1.2 по целям под любым эффектом
        AttackDefinition {
            base_damage: 10,
            radius: 1.2,
            cooldown: 2.5,
            knockback: 3.0,
            shape: AttackShape::Wave {
                segments: 3,
                spacing: 0.75,
                segment_scale: 0.8,
            },
            binding: Some("FoodAttack".into()),
            bonus: Some(DamageBonus {
                multiplier: 1.2,
                when: BonusCondition::HasAnyEffect,
            }),
            ..AttackDefinition::base("poison_potato", "Poison Potato")
        },
        // --- Атаки врагов ---
        AttackDefinition {
            base_damage: 10,
            radius: 1.5,
            cooldown: 1.5,
            knockback: 2.0,
            mode: AttackMode::Melee,
            ..AttackDefinition::base("enemy_melee", "Enemy Melee")
        },
        // Паук: укус со станом
        AttackDefinition {
            base_damage: 8,
            radius: 1.5,
            cooldown: 2.0,
            mode: AttackMode::Melee,
            apply_on_targets: vec![EffectId::new("stun")],
            ..AttackDefinition::base("spider_bite", "Spider Bite")
        },
        // Шершень: жало-снаряд с ядом (луч до ranged-радиуса)
        AttackDefinition {
            base_damage: 5,
            radius: 2.5,
            cooldown: 2.0,
            mode: AttackMode::Ranged,
            shape: AttackShape::Fan {
                rays: 1,
                spread_deg: 0.0,
            },
            apply_on_targets: vec![EffectId::new("poison")],
            ..AttackDefinition::base("enemy_stinger", "Stinger")
        },
        // Цветок: плевок на дистанции
        AttackDefinition {
            base_damage: 6,
            radius: 2.5,
            cooldown: 2.5,
            mode: AttackMode::Ranged,
            shape: AttackShape::Fan {
                rays: 1,
                spread_deg: 0.0,
            },
            ..AttackDefinition::base("flower_spit", "Flower Spit")
        },
    ]
}

pub fn standard_attack_library() -> AttackLibrary {
    AttackLibrary::from_definitions(standard_attacks())
}

// ============================================================================
// Enemy archetypes
// ============================================================================

/// Архетип врага — строка данных, не подкласс
#[derive(Debug, Clone)]
pub struct EnemyArchetype {
    pub name: String,
    pub max_health: u32,
    pub move_speed: f32,
    pub perception: PerceptionConfig,
    pub melee_attack: Option<AttackId>,
    pub ranged_attack: Option<AttackId>,
}

/// Стандартные архетипы
pub fn standard_archetypes() -> Vec<EnemyArchetype> {
    vec![
        EnemyArchetype {
            name: "cyborg_zombie".into(),
            max_health: 120,
            move_speed: 2.0,
            perception: PerceptionConfig::default(),
            melee_attack: Some(AttackId::new("enemy_melee")),
            ranged_attack: None,
        },
        EnemyArchetype {
            name: "mechanical_spider".into(),
            max_health: 80,
            move_speed: 3.5,
            perception: PerceptionConfig::default(),
            melee_attack: Some(AttackId::new("spider_bite")),
            ranged_attack: None,
        },
        // Летун: держит дистанцию, плюётся ядом
        EnemyArchetype {
            name: "hornet".into(),
            max_health: 60,
            move_speed: 4.0,
            perception: PerceptionConfig {
                detection_radius: 10.0,
                ranged_radius: 6.0,
                melee_radius: 1.2,
                ..PerceptionConfig::default()
            },
            melee_attack: None,
            ranged_attack: Some(AttackId::new("enemy_stinger")),
        },
        // Растение: не двигается, только стреляет
        EnemyArchetype {
            name: "flowey".into(),
            max_health: 100,
            move_speed: 0.0,
            perception: PerceptionConfig {
                detection_radius: 9.0,
                ranged_radius: 6.0,
                melee_radius: 1.5,
                ..PerceptionConfig::default()
            },
            melee_attack: None,
            ranged_attack: Some(AttackId::new("flower_spit")),
        },
    ]
}

// ============================================================================
// Validation (громко и на загрузке)
// ============================================================================

/// Проверка атак: радиусы, cooldown'ы, ссылки на эффекты
pub fn validate_attacks(
    attacks: &[AttackDefinition],
    effects: &EffectLibrary,
) -> Result<(), ContentError> {
    for attack in attacks {
        if attack.radius <= 0.0 {
            return Err(ContentError::InvalidRadius {
                attack: attack.id.to_string(),
                radius: attack.radius,
            });
        }
        if attack.cooldown < 0.0 {
            return Err(ContentError::InvalidCooldown {
                attack: attack.id.to_string(),
                cooldown: attack.cooldown,
            });
        }
        for effect in attack.apply_on_self.iter().chain(&attack.apply_on_targets) {
            if !effects.contains(effect) {
                return Err(ContentError::UnknownEffect {
                    attack: attack.id.to_string(),
                    effect: effect.to_string(),
                });
            }
        }
        if let Some(bonus) = &attack.bonus {
            if let BonusCondition::HasEffect(effect) = &bonus.when {
                if !effects.contains(effect) {
                    return Err(ContentError::UnknownEffect {
                        attack: attack.id.to_string(),
                        effect: effect.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Проверка архетипа: радиусы perception + ссылки на атаки
pub fn validate_archetype(
    archetype: &EnemyArchetype,
    attacks: &AttackLibrary,
) -> Result<(), ContentError> {
    archetype.perception.validate()?;

    for attack in archetype
        .melee_attack
        .iter()
        .chain(archetype.ranged_attack.iter())
    {
        if !attacks.contains(attack) {
            return Err(ContentError::UnknownAttack {
                archetype: archetype.name.clone(),
                attack: attack.to_string(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// Content files (RON)
// ============================================================================

/// Парсинг атак из RON-текста (файл читает внешний слой)
pub fn load_attacks_from_str(source: &str) -> Result<Vec<AttackDefinition>, ContentError> {
    Ok(ron::from_str(source)?)
}

/// Парсинг эффектов из RON-текста
pub fn load_effects_from_str(source: &str) -> Result<Vec<EffectDefinition>, ContentError> {
    Ok(ron::from_str(source)?)
}

// ============================================================================
// Spawn helpers
// ============================================================================

/// Спавн игрока с набором способностей (активация — общим конвейером)
pub fn spawn_player(
    commands: &mut Commands,
    library: &AttackLibrary,
    position: Vec2,
    attacks: &[AttackId],
) -> Entity {
    let mut abilities = crate::combat::AbilitySet::default();
    for id in attacks {
        match library.get(id) {
            Some(definition) => abilities.equip(definition),
            None => crate::log_warning(&format!("spawn_player: unknown attack '{}'", id)),
        }
    }

    let player = commands
        .spawn((
            Actor { faction_id: 0 },
            Health::new(100),
            Transform::from_translation(position.extend(0.0)),
            abilities,
        ))
        .id();

    for id in attacks {
        commands.send_event(ActivateAbility {
            actor: player,
            attack: id.clone(),
        });
    }

    player
}

/// Спавн врага по архетипу
pub fn spawn_enemy(
    commands: &mut Commands,
    library: &AttackLibrary,
    archetype: &EnemyArchetype,
    position: Vec2,
) -> Entity {
    let attack_ids: Vec<AttackId> = archetype
        .melee_attack
        .iter()
        .chain(archetype.ranged_attack.iter())
        .cloned()
        .collect();

    let mut abilities = crate::combat::AbilitySet::default();
    for id in &attack_ids {
        match library.get(id) {
            Some(definition) => abilities.equip(definition),
            None => crate::log_warning(&format!(
                "spawn_enemy '{}': unknown attack '{}'",
                archetype.name, id
            )),
        }
    }

    let enemy = commands
        .spawn((
            Actor { faction_id: 1 },
            Health::new(archetype.max_health),
            Transform::from_translation(position.extend(0.0)),
            abilities,
            Locomotion {
                move_speed: archetype.move_speed,
                ..Locomotion::default()
            },
            crate::ai::EnemyState::default(),
            archetype.perception.clone(),
            PerceptionState::default(),
        ))
        .id();

    for id in &attack_ids {
        commands.send_event(ActivateAbility {
            actor: enemy,
            attack: id.clone(),
        });
    }

    enemy
}
