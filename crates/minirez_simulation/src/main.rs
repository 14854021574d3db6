//! Headless-прогон симуляции MINIREZ
//!
//! Запускает Bevy App без рендера: надеваем HMD, поднимаем руку
//! в конус камеры и смотрим, как панель проходит Hidden → Showing → Visible.

use bevy::prelude::*;
use minirez_simulation::{
    create_headless_app, Hand, RezzerState, RezzerStateKind, RigInput, SimulationPlugin,
};

fn main() {
    let seed = 42;
    println!("Starting MINIREZ headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);
    app.add_plugins(SimulationPlugin);

    // HMD надет, камера на уровне глаз смотрит вдоль -Z
    {
        let mut input = app.world_mut().resource_mut::<RigInput>();
        input.hmd_active = true;
        input.camera.position = Vec3::new(0.0, 1.7, 0.0);
    }

    // Скрипт: рука поднимается на тике 100, опускается на 600
    for tick in 0..1000 {
        if tick == 100 {
            raise_hand(&mut app, Hand::Right);
        }
        if tick == 600 {
            let mut input = app.world_mut().resource_mut::<RigInput>();
            input.hand_mut(Hand::Right).pose_valid = false;
        }

        app.update();

        if tick % 100 == 0 {
            let entity_count = app.world().entities().len();
            println!(
                "Tick {}: {} entities, panel {:?}",
                tick,
                entity_count,
                panel_state(&mut app)
            );
        }
    }

    println!("Simulation complete!");
}

/// Рука в конусе камеры, ладонью от лица
fn raise_hand(app: &mut App, hand: Hand) {
    let mut input = app.world_mut().resource_mut::<RigInput>();
    let camera_position = input.camera.position;
    let hand_world = Vec3::new(0.0, 1.6, -0.8);
    let to_hand = (hand_world - camera_position).normalize();

    let sample = input.hand_mut(hand);
    sample.pose_valid = true;
    sample.translation = hand_world;
    sample.rotation = Quat::from_rotation_arc(Vec3::NEG_Z, to_hand);
}

fn panel_state(app: &mut App) -> RezzerStateKind {
    let mut query = app.world_mut().query::<&RezzerState>();
    query
        .single(app.world())
        .map(|state| state.kind())
        .unwrap_or(RezzerStateKind::Disabled)
}
