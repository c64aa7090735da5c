//! Headless симуляция FOODRUSH
//!
//! Арена: игрок с чаем и основной атакой против трёх архетипов врагов.
//! Прогоняет 20 секунд боя фиксированными tick'ами и печатает итог.

use bevy::prelude::*;
use std::time::Duration;

use foodrush_simulation::content::{spawn_enemy, spawn_player, standard_archetypes};
use foodrush_simulation::{
    create_headless_app, AttackId, AttackLibrary, Health, SimulationPlugin, TriggerPulse,
};

const TICK: Duration = Duration::from_micros(16_667); // 60Hz
const SECONDS: u32 = 20;

fn main() {
    let seed = 42;
    println!("Starting FOODRUSH headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);
    app.add_plugins(SimulationPlugin);
    app.add_systems(Startup, setup_arena);

    // Первый update прогоняет Startup (спавн арены)
    app.update();

    // Дальше время двигаем сами — детерминированные 60Hz tick'и
    for tick in 0..(SECONDS * 60) {
        // Игрок жмёт атаку каждые полсекунды
        if tick % 30 == 0 {
            app.world_mut().send_event(TriggerPulse {
                binding: "LeftMouse".into(),
                direction: Vec2::X,
            });
        }

        app.world_mut()
            .resource_mut::<Time<Fixed>>()
            .advance_by(TICK);
        app.world_mut().run_schedule(FixedUpdate);

        if tick % 300 == 0 {
            let mut healths = app.world_mut().query::<&Health>();
            let alive = healths
                .iter(app.world())
                .filter(|health| health.is_alive())
                .count();
            println!("Tick {}: {} actors alive", tick, alive);
        }
    }

    println!("Simulation complete!");
}

/// Спавн арены: игрок в центре, враги вокруг
fn setup_arena(mut commands: Commands, library: Res<AttackLibrary>) {
    spawn_player(
        &mut commands,
        &library,
        Vec2::ZERO,
        &[AttackId::new("main"), AttackId::new("tea")],
    );

    let archetypes = standard_archetypes();
    let positions = [
        Vec2::new(6.0, 0.0),
        Vec2::new(-7.0, 0.0),
        Vec2::new(0.0, 9.0),
    ];
    for (archetype, position) in archetypes.iter().zip(positions) {
        spawn_enemy(&mut commands, &library, archetype, position);
    }
}
