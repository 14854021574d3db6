//! MINIREZ demo client
//!
//! Headless-драйвер симуляции: канированный сценарий вместо живого rig'а,
//! консоль вместо overlay-движка. Прогоняет полный путь панели
//! (show → debounce → смена руки → expand → tablet) и разговор
//! двух remote-аватаров с click-to-look.

mod console;
mod scenario;

use bevy::prelude::*;
use minirez_simulation::lookat::{GazeMachine, LookController};
use minirez_simulation::{
    create_headless_app, RezzerState, RezzerStateKind, SimulationPlugin,
};

const SESSION_TICKS: usize = 1000;

fn main() {
    let seed = 42;
    println!(
        "MINIREZ demo client (seed: {}, {} ticks @ 50Hz)",
        seed, SESSION_TICKS
    );

    let mut app = create_headless_app(seed);
    app.add_plugins((
        SimulationPlugin,
        scenario::ScenarioPlugin,
        console::ConsolePlugin,
    ));

    for _ in 0..SESSION_TICKS {
        app.update();
    }

    print_summary(&mut app);
}

fn print_summary(app: &mut App) {
    let panel = {
        let mut query = app.world_mut().query::<&RezzerState>();
        query
            .single(app.world())
            .map(|state| state.kind())
            .unwrap_or(RezzerStateKind::Disabled)
    };
    let machine = app.world().resource::<GazeMachine>();
    let controller = app.world().resource::<LookController>();

    println!("--- Session summary ---");
    println!("panel: {:?}", panel);
    println!(
        "gaze focus: {:?} ({:?}/{:?})",
        machine.focus, machine.talking_state, machine.focus_state
    );
    println!("look controller: {:?}", controller.state);
    println!("entities: {}", app.world().entities().len());
}
