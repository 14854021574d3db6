//! Mini panel rezzer — панель на тыльной стороне руки
//!
//! Материализует мини-панель (model overlay + web-экран) на запястье,
//! когда пользователь смотрит на руку, прячет когда отворачивается,
//! и разворачивает в полный tablet при захвате второй рукой.
//!
//! Состояния:
//! ```text
//! Disabled → Hidden ⇄ Showing → Visible ⇄ Hiding → Hidden
//!                               Visible → Expanding → Open → Hidden
//! ```
//!
//! Все решения на FixedUpdate в SimSet::Rezzer, после SimSet::Intake
//! (условия показа читаются из уже обновлённого RigState).

use bevy::prelude::*;

use crate::SimSet;

pub mod components;
pub mod events;
pub mod systems;
pub mod ui_relay;

#[cfg(test)]
mod ui_relay_tests;

pub use components::{MiniPanel, RezzerConfig, RezzerState, RezzerStateKind};
pub use events::PanelTransition;

pub struct RezzerPlugin;

impl Plugin for RezzerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PanelTransition>();

        app.add_systems(Startup, spawn_panel);

        app.add_systems(
            FixedUpdate,
            (
                systems::rezzer_transitions,
                systems::rezzer_overlay_sync,
                ui_relay::panel_ui_relay,
            )
                .chain()
                .in_set(SimSet::Rezzer),
        );
    }
}

/// Панель одна на клиента (invariant: максимум одна рука-хост)
fn spawn_panel(mut commands: Commands) {
    commands.spawn((
        RezzerState::default(),
        MiniPanel::default(),
        RezzerConfig::default(),
    ));
    crate::log("REZZER: panel entity spawned");
}
