//! Host bridge — opaque-интерфейс движка
//!
//! Симуляция не знает, что за движок снаружи. Вся граница:
//! - RigInput (poll) + host::events (discrete) — вход
//! - host::commands — выход
//!
//! Embedding: записать RigInput/events → app.update() → дренировать команды.

use bevy::prelude::*;

pub mod commands;
pub mod events;

pub use commands::{
    AudioCommand, LookAtCommand, OverlayCommand, OverlayId, OverlayIdAllocator, OverlayKind,
    OverlayParent, OverlayPatch, OverlaySpec, PanelUiCommand, SightlineProbe, SoundCue,
    TabletCommand, ToggleCommand, UiButton,
};
pub use events::{
    AudioMutedEvent, AvatarClickedEvent, CameraLookEvent, GrabAction, HostGrabEvent, PanelUiEvent,
    PrivacyShieldEvent, SightlineReport,
};

use crate::components::{update_rig_state, RigInput, RigState};
use crate::SimSet;

/// Host bridge plugin
///
/// Регистрирует boundary events/resources и intake-систему нормализации
/// rig (гистерезис, clamp, конусный тест) до behaviour-машин.
pub struct HostPlugin;

impl Plugin for HostPlugin {
    fn build(&self, app: &mut App) {
        // Входные события от host
        app.add_event::<HostGrabEvent>()
            .add_event::<PanelUiEvent>()
            .add_event::<AudioMutedEvent>()
            .add_event::<PrivacyShieldEvent>()
            .add_event::<SightlineReport>()
            .add_event::<AvatarClickedEvent>()
            .add_event::<CameraLookEvent>();

        // Выходной поток команд
        app.add_event::<OverlayCommand>()
            .add_event::<AudioCommand>()
            .add_event::<TabletCommand>()
            .add_event::<PanelUiCommand>()
            .add_event::<ToggleCommand>()
            .add_event::<LookAtCommand>()
            .add_event::<SightlineProbe>();

        // Boundary-ресурсы
        app.init_resource::<RigInput>()
            .init_resource::<RigState>()
            .init_resource::<OverlayIdAllocator>();

        app.add_systems(FixedUpdate, update_rig_state.in_set(SimSet::Intake));
    }
}
