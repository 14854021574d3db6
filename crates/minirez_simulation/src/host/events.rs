//! Host events — события от host engine для симуляции
//!
//! Дискретные сигналы (grab bus, web-диалог, клики) идут events'ами;
//! непрерывные (controller poses, камера) — через RigInput poll.

use bevy::prelude::*;
use crate::host::commands::OverlayId;

/// Grab bus: манипуляция объектом
///
/// Host отправляет когда рука хватает/отпускает overlay.
/// joint — имя сустава хватающей руки ("LeftHand"/"RightHand").
#[derive(Event, Debug, Clone)]
pub struct HostGrabEvent {
    pub action: GrabAction,
    pub target: OverlayId,
    pub joint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabAction {
    Grab,
    Release,
}

/// Сообщения web-диалога панели (кнопки на экранчике)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelUiEvent {
    /// Диалог загрузился и готов принимать статусы кнопок
    Ready,
    /// Курсор/луч над кнопкой
    Hover,
    MuteClicked,
    BubbleClicked,
    ExpandClicked,
}

/// Host-side переключение mute (в т.ч. извне панели)
#[derive(Event, Debug, Clone, Copy)]
pub struct AudioMutedEvent {
    pub muted: bool,
}

/// Host-side переключение privacy shield (ignore radius)
#[derive(Event, Debug, Clone, Copy)]
pub struct PrivacyShieldEvent {
    pub enabled: bool,
}

/// Ответ на SightlineProbe
#[derive(Event, Debug, Clone, Copy)]
pub struct SightlineReport {
    pub probe: u32,
    pub blocked: bool,
}

/// Пользователь кликнул удалённого аватара (click-to-look)
#[derive(Event, Debug, Clone, Copy)]
pub struct AvatarClickedEvent {
    pub target: Entity,
}

/// Жест "посмотри туда, куда смотрит камера"
///
/// Только триггер: точку взгляда controller каждый тик пересчитывает
/// от текущей камеры в RigInput (камера может двигаться во время доворота).
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct CameraLookEvent;
