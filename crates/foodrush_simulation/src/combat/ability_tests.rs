//! Tests for ability systems (полный конвейер intent → урон).

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use std::time::Duration;

    use crate::combat::{
        AbilityPhase, AbilitySet, ActivateAbility, AttackDefinition, AttackId, AttackIntent,
        AttackPerformed, CombatPlugin, DeactivateAbility, TriggerBindings, TriggerPulse,
    };
    use crate::components::{Actor, Health};
    use crate::effects::{ApplyEffectRequest, RemoveEffectRequest};

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            .insert_resource(TriggerBindings::default())
            // Events эффектов (их системы здесь не нужны)
            .add_event::<ApplyEffectRequest>()
            .add_event::<RemoveEffectRequest>()
            .add_plugins(CombatPlugin);
        app
    }

    fn tick(app: &mut App, delta: f32) {
        app.world_mut()
            .resource_mut::<Time<Fixed>>()
            .advance_by(Duration::from_secs_f32(delta));
        app.world_mut().run_schedule(FixedUpdate);
    }

    fn main_attack() -> AttackDefinition {
        AttackDefinition {
            base_damage: 10,
            radius: 1.0,
            cooldown: 1.0,
            binding: Some("LeftMouse".into()),
            ..AttackDefinition::base("main", "Main Attack")
        }
    }

    /// Атакующий с активированной способностью + цель на дистанции 0.5
    fn spawn_duel(app: &mut App, attack: AttackDefinition) -> (Entity, Entity) {
        let abilities = AbilitySet::with_attacks(vec![std::sync::Arc::new(attack.clone())]);
        let attacker = app
            .world_mut()
            .spawn((Actor { faction_id: 0 }, Transform::default(), abilities))
            .id();
        let target = app
            .world_mut()
            .spawn((
                Actor { faction_id: 1 },
                Transform::from_translation(Vec3::new(0.5, 0.0, 0.0)),
            ))
            .id();

        app.world_mut().send_event(ActivateAbility {
            actor: attacker,
            attack: attack.id.clone(),
        });
        tick(app, 0.0);

        (attacker, target)
    }

    fn send_intent(app: &mut App, attacker: Entity) {
        app.world_mut().send_event(AttackIntent {
            attacker,
            attack: AttackId::new("main"),
            direction: Vec2::X,
        });
    }

    fn health_of(app: &App, entity: Entity) -> u32 {
        app.world().get::<Health>(entity).unwrap().current
    }

    #[test]
    fn test_attack_hits_once_then_cooldown_noop() {
        let mut app = test_app();
        let (attacker, target) = spawn_duel(&mut app, main_attack());

        send_intent(&mut app, attacker);
        tick(&mut app, 1.0 / 60.0);
        assert_eq!(health_of(&app, target), 90);

        // Повторный intent внутри cooldown — no-op, урона нет
        send_intent(&mut app, attacker);
        tick(&mut app, 1.0 / 60.0);
        assert_eq!(health_of(&app, target), 90);

        // Cooldown прошёл — снова бьём
        tick(&mut app, 1.0);
        send_intent(&mut app, attacker);
        tick(&mut app, 1.0 / 60.0);
        assert_eq!(health_of(&app, target), 80);
    }

    #[test]
    fn test_inactive_ability_ignores_intents() {
        let mut app = test_app();
        let attack = main_attack();
        let abilities = AbilitySet::with_attacks(vec![std::sync::Arc::new(attack)]);
        let attacker = app
            .world_mut()
            .spawn((Actor { faction_id: 0 }, Transform::default(), abilities))
            .id();
        let target = app
            .world_mut()
            .spawn((
                Actor { faction_id: 1 },
                Transform::from_translation(Vec3::new(0.5, 0.0, 0.0)),
            ))
            .id();

        // Активации не было — intent тихо сгорает
        send_intent(&mut app, attacker);
        tick(&mut app, 1.0 / 60.0);
        assert_eq!(health_of(&app, target), 100);
    }

    #[test]
    fn test_deactivate_mid_cooldown_then_fresh_restart() {
        let mut app = test_app();
        let (attacker, target) = spawn_duel(&mut app, main_attack());

        send_intent(&mut app, attacker);
        tick(&mut app, 1.0 / 60.0);
        assert_eq!(health_of(&app, target), 90);

        // Деактивация в середине cooldown
        app.world_mut().send_event(DeactivateAbility {
            actor: attacker,
            attack: AttackId::new("main"),
        });
        tick(&mut app, 1.0 / 60.0);

        // До реактивации атака — no-op
        send_intent(&mut app, attacker);
        tick(&mut app, 1.0 / 60.0);
        assert_eq!(health_of(&app, target), 90);

        // Реактивация: состояние свежее, бить можно сразу
        app.world_mut().send_event(ActivateAbility {
            actor: attacker,
            attack: AttackId::new("main"),
        });
        tick(&mut app, 1.0 / 60.0);

        send_intent(&mut app, attacker);
        tick(&mut app, 1.0 / 60.0);
        assert_eq!(health_of(&app, target), 80);
    }

    #[test]
    fn test_trigger_pulse_reaches_attack() {
        let mut app = test_app();
        let (_, target) = spawn_duel(&mut app, main_attack());

        // Полный путь: input pulse → подписка → intent → урон
        app.world_mut().send_event(TriggerPulse {
            binding: "LeftMouse".into(),
            direction: Vec2::X,
        });
        tick(&mut app, 1.0 / 60.0);

        assert_eq!(health_of(&app, target), 90);
    }

    #[test]
    fn test_deactivate_unsubscribes_trigger() {
        let mut app = test_app();
        let (attacker, target) = spawn_duel(&mut app, main_attack());

        app.world_mut().send_event(DeactivateAbility {
            actor: attacker,
            attack: AttackId::new("main"),
        });
        tick(&mut app, 1.0 / 60.0);

        assert!(app.world().resource::<TriggerBindings>().is_empty());

        // Pulse после отписки никуда не доходит
        app.world_mut().send_event(TriggerPulse {
            binding: "LeftMouse".into(),
            direction: Vec2::X,
        });
        tick(&mut app, 1.0 / 60.0);
        assert_eq!(health_of(&app, target), 100);
    }

    #[test]
    fn test_attack_performed_reports_hits() {
        let mut app = test_app();
        let (attacker, _) = spawn_duel(&mut app, main_attack());

        // Вторая цель в той же зоне
        app.world_mut().spawn((
            Actor { faction_id: 1 },
            Transform::from_translation(Vec3::new(-0.5, 0.0, 0.0)),
        ));

        send_intent(&mut app, attacker);
        tick(&mut app, 1.0 / 60.0);

        let events = app.world().resource::<Events<AttackPerformed>>();
        let mut cursor = events.get_cursor();
        let performed: Vec<_> = cursor.read(events).collect();
        assert_eq!(performed.len(), 1);
        assert_eq!(performed[0].hits, 2);
    }

    #[test]
    fn test_cooling_phase_returns_to_ready() {
        let mut app = test_app();
        let (attacker, _) = spawn_duel(&mut app, main_attack());

        send_intent(&mut app, attacker);
        tick(&mut app, 1.0 / 60.0);

        let phase = |app: &App| {
            app.world()
                .get::<AbilitySet>(attacker)
                .unwrap()
                .slot(&AttackId::new("main"))
                .unwrap()
                .phase
        };
        assert_eq!(phase(&app), AbilityPhase::Cooling);

        tick(&mut app, 1.0);
        assert_eq!(phase(&app), AbilityPhase::Ready);
    }
}
