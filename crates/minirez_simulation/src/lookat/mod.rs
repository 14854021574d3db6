//! Automatic look-at — социальный взгляд аватара
//!
//! Следит за окружением (кто рядом, кто говорит, кто машет руками)
//! и решает, куда аватару смотреть: на рот говорящего, в глаза,
//! на руки, случайный взгляд в сторону. Поверх автоматики — ручные
//! override'ы: клик по аватару и «посмотри куда камера».
//!
//! Конвейер на FixedUpdate в SimSet::LookAt:
//! ```text
//! update_audience        — зона внимания, громкость, говорящие, жесты
//! update_sightlines      — line-of-sight probes (round-robin, 1/тик)
//! update_gaze_machine    — выбор фокуса и текущего action'а
//! update_look_controller — интерполяция головы, команды host'у
//! ```

use bevy::prelude::*;

use crate::SimSet;

pub mod action;
pub mod audience;
pub mod components;
pub mod controller;
pub mod focus;

#[cfg(test)]
mod controller_tests;

pub use action::{LookAction, TargetMode};
pub use components::{
    AudienceMember, FocusState, GazeMachine, LockFocusType, LookAtConfig, LookController,
    LookState, SceneFrame, SightlineTracker, TalkingState,
};

pub struct LookAtPlugin;

impl Plugin for LookAtPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LookAtConfig>()
            .init_resource::<SceneFrame>()
            .init_resource::<GazeMachine>()
            .init_resource::<LookController>()
            .init_resource::<SightlineTracker>();

        app.add_systems(
            FixedUpdate,
            (
                audience::update_audience,
                audience::update_sightlines,
                focus::update_gaze_machine,
                controller::update_look_controller,
            )
                .chain()
                .in_set(SimSet::LookAt),
        );
    }
}
