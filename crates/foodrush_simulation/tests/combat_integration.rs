//! Combat integration: полный конвейер на живом App
//!
//! Проверяем:
//! - Враг сам проходит detect → chase → melee → Attack и наносит урон
//! - Дальний враг стреляет и вешает яд (DoT тикает)
//! - Игрок убивает врага атаками, труп перестаёт решать
//! - Эффект чая живёт ровно пока способность активна
//! - Прогон детерминирован

use bevy::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use foodrush_simulation::content::standard_archetypes;
use foodrush_simulation::*;

fn create_app() -> App {
    let mut app = create_headless_app(42);
    app.add_plugins(SimulationPlugin);
    app
}

fn tick(app: &mut App, delta: f32) {
    app.world_mut()
        .resource_mut::<Time<Fixed>>()
        .advance_by(Duration::from_secs_f32(delta));
    app.world_mut().run_schedule(FixedUpdate);
}

fn run_seconds(app: &mut App, seconds: f32) {
    let ticks = (seconds * 60.0) as u32;
    for _ in 0..ticks {
        tick(app, 1.0 / 60.0);
    }
}

fn attack_from_library(app: &App, id: &str) -> Arc<AttackDefinition> {
    app.world()
        .resource::<AttackLibrary>()
        .get(&AttackId::new(id))
        .unwrap_or_else(|| panic!("attack '{}' missing from standard library", id))
}

/// Игрок без способностей — мишень
fn spawn_target_player(app: &mut App, position: Vec2) -> Entity {
    app.world_mut()
        .spawn((
            Actor { faction_id: 0 },
            Health::new(100),
            Transform::from_translation(position.extend(0.0)),
        ))
        .id()
}

/// Враг по архетипу из стандартного контента
fn spawn_archetype(app: &mut App, name: &str, position: Vec2) -> Entity {
    let archetype = standard_archetypes()
        .into_iter()
        .find(|a| a.name == name)
        .unwrap_or_else(|| panic!("archetype '{}' missing", name));

    let mut attacks = Vec::new();
    for id in archetype
        .melee_attack
        .iter()
        .chain(archetype.ranged_attack.iter())
    {
        attacks.push(attack_from_library(app, id.as_str()));
    }
    let ids: Vec<AttackId> = attacks.iter().map(|a| a.id.clone()).collect();

    let enemy = app
        .world_mut()
        .spawn((
            Actor { faction_id: 1 },
            Health::new(archetype.max_health),
            Transform::from_translation(position.extend(0.0)),
            AbilitySet::with_attacks(attacks),
            Locomotion {
                move_speed: archetype.move_speed,
                ..Locomotion::default()
            },
            EnemyState::default(),
            archetype.perception.clone(),
            PerceptionState::default(),
        ))
        .id();

    for id in ids {
        app.world_mut().send_event(ActivateAbility {
            actor: enemy,
            attack: id,
        });
    }
    tick(app, 0.0);

    enemy
}

fn health_of(app: &App, entity: Entity) -> u32 {
    app.world().get::<Health>(entity).unwrap().current
}

#[test]
fn test_zombie_closes_distance_and_hits() {
    let mut app = create_app();
    let player = spawn_target_player(&mut app, Vec2::ZERO);
    let zombie = spawn_archetype(&mut app, "cyborg_zombie", Vec2::new(6.0, 0.0));

    run_seconds(&mut app, 8.0);

    // Зомби дошёл и бьёт: у игрока меньше здоровья, зомби цел
    assert!(
        health_of(&app, player) < 100,
        "player untouched after 8s of zombie pursuit"
    );
    assert_eq!(health_of(&app, zombie), 120);

    // Преследование началось с события perception
    let locomotion = app.world().get::<Locomotion>(zombie).unwrap();
    assert_eq!(locomotion.target, Some(player));
}

#[test]
fn test_hornet_stings_and_poisons() {
    let mut app = create_app();
    let player = spawn_target_player(&mut app, Vec2::ZERO);
    // В ranged band (6), вне melee (1.2)
    let _hornet = spawn_archetype(&mut app, "hornet", Vec2::new(4.0, 0.0));

    run_seconds(&mut app, 2.5);

    // Жало попало и яд активен
    let effects = app.world().get::<ActiveEffects>(player).unwrap();
    assert!(
        effects.has(&EffectId::new("poison")),
        "stinger must apply poison"
    );

    // Урон жала + хотя бы один tick яда
    assert!(health_of(&app, player) < 95);
}

#[test]
fn test_player_kills_dummy_and_ai_shuts_down() {
    let mut app = create_app();

    let main = attack_from_library(&app, "main");
    let player = app
        .world_mut()
        .spawn((
            Actor { faction_id: 0 },
            Health::new(100),
            Transform::default(),
            AbilitySet::with_attacks(vec![main]),
        ))
        .id();
    app.world_mut().send_event(ActivateAbility {
        actor: player,
        attack: AttackId::new("main"),
    });
    tick(&mut app, 0.0);

    // Хлипкий инертный враг вплотную (30 HP = 3 удара по 10)
    let dummy = app
        .world_mut()
        .spawn((
            Actor { faction_id: 1 },
            Health::new(30),
            Transform::from_translation(Vec3::new(0.5, 0.0, 0.0)),
            EnemyState::default(),
            PerceptionState::default(),
        ))
        .id();

    for _ in 0..3 {
        app.world_mut().send_event(TriggerPulse {
            binding: "LeftMouse".into(),
            direction: Vec2::X,
        });
        run_seconds(&mut app, 1.0); // cooldown 0.8 успевает пройти
    }

    assert_eq!(health_of(&app, dummy), 0);
    // Труп помечен и перестал решать
    assert!(app.world().get::<Dead>(dummy).is_some());
    assert!(app.world().get::<EnemyState>(dummy).is_none());
    assert!(!app.world().get::<Locomotion>(dummy).unwrap().enabled);
}

#[test]
fn test_tea_buff_lives_while_ability_active() {
    let mut app = create_app();

    let tea = attack_from_library(&app, "tea");
    let player = app
        .world_mut()
        .spawn((
            Actor { faction_id: 0 },
            Health::new(100),
            Transform::default(),
            AbilitySet::with_attacks(vec![tea]),
        ))
        .id();

    app.world_mut().send_event(ActivateAbility {
        actor: player,
        attack: AttackId::new("tea"),
    });
    tick(&mut app, 0.0);
    tick(&mut app, 0.0); // hook применяется следующим кадром (Commands flush)

    let effects = app.world().get::<ActiveEffects>(player).unwrap();
    assert!(effects.has(&EffectId::new("speed")));
    assert_eq!(
        app.world().get::<Locomotion>(player).unwrap().speed_multiplier,
        2.0
    );

    // Эффект без длительности не истекает сам
    run_seconds(&mut app, 5.0);
    assert!(app
        .world()
        .get::<ActiveEffects>(player)
        .unwrap()
        .has(&EffectId::new("speed")));

    // Деактивация снимает эффект и возвращает скорость
    app.world_mut().send_event(DeactivateAbility {
        actor: player,
        attack: AttackId::new("tea"),
    });
    tick(&mut app, 0.0);
    tick(&mut app, 0.0);

    let effects = app.world().get::<ActiveEffects>(player).unwrap();
    assert!(!effects.has(&EffectId::new("speed")));
    assert_eq!(
        app.world().get::<Locomotion>(player).unwrap().speed_multiplier,
        1.0
    );
}

#[test]
fn test_simulation_is_deterministic() {
    let run = || {
        let mut app = create_app();
        let player = spawn_target_player(&mut app, Vec2::ZERO);
        let zombie = spawn_archetype(&mut app, "cyborg_zombie", Vec2::new(6.0, 0.0));
        let hornet = spawn_archetype(&mut app, "hornet", Vec2::new(-4.0, 0.0));

        run_seconds(&mut app, 6.0);

        (
            health_of(&app, player),
            health_of(&app, zombie),
            health_of(&app, hornet),
        )
    };

    let first = run();
    let second = run();
    assert_eq!(first, second, "same setup must replay identically");
}
