//! Host commands — поток команд симуляция → host engine
//!
//! # Architecture
//!
//! ECS решает, host исполняет. Embedding дренирует команды после каждого
//! тика и транслирует их в вызовы движка (overlays, audio, tablet,
//! head/eyes IK, raycasts). Обратной связи внутри тика нет: всё, что host
//! хочет сказать, приходит следующим тиком через host::events.
//!
//! OverlayId — логические id. Симуляция их выделяет из OverlayIdAllocator,
//! host держит у себя map логический id → реальный overlay движка.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Логический id overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub struct OverlayId(pub u64);

/// Счётчик логических id (0 не выдаётся)
#[derive(Resource, Debug, Default)]
pub struct OverlayIdAllocator {
    next: u64,
}

impl OverlayIdAllocator {
    pub fn allocate(&mut self) -> OverlayId {
        self.next += 1;
        OverlayId(self.next)
    }
}

/// Родитель overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OverlayParent {
    /// Без родителя (world space). Также отпускает руку —
    /// рука должна быть свободна, чтобы схватить полный tablet.
    None,
    /// Joint скелета локального аватара ("_CONTROLLER_LEFTHAND", ...)
    AvatarJoint { joint: String },
    /// Другой overlay (web-экран сидит на модели панели)
    Overlay(OverlayId),
}

/// Вид overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OverlayKind {
    /// 3D-модель
    Model { url: String },
    /// Web-поверхность (диалог панели)
    Web { url: String },
}

/// Полная спецификация overlay для Create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySpec {
    pub kind: OverlayKind,
    pub parent: OverlayParent,
    pub local_position: Vec3,
    pub local_rotation: Quat,
    pub dimensions: Vec3,
    pub alpha: f32,
    /// Только для Web: плотность пикселей
    pub dpi: Option<f32>,
    pub solid: bool,
    pub grabbable: bool,
    pub visible: bool,
}

/// Частичное обновление свойств (None = поле не трогать)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayPatch {
    pub parent: Option<OverlayParent>,
    pub local_position: Option<Vec3>,
    pub local_rotation: Option<Quat>,
    pub dimensions: Option<Vec3>,
    pub alpha: Option<f32>,
    pub dpi: Option<f32>,
    pub visible: Option<bool>,
}

/// Команды overlay-слою
#[derive(Event, Debug, Clone, PartialEq)]
pub enum OverlayCommand {
    Create { id: OverlayId, spec: OverlaySpec },
    Edit { id: OverlayId, patch: OverlayPatch },
    Delete { id: OverlayId },
}

/// Звуковые реплики панели
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    Hover,
    Click,
}

/// Команда audio-слою (local-only воспроизведение у ладони)
#[derive(Event, Debug, Clone, PartialEq)]
pub enum AudioCommand {
    Play {
        cue: SoundCue,
        volume: f32,
        position: Vec3,
    },
}

/// Передача управления полному tablet
///
/// # Flow
/// 1. Rezzer доводит Expanding до progress 1.0
/// 2. TabletCommand::Open с мировым transform панели
/// 3. Host открывает tablet на этом месте и выставляет RigInput.tablet_shown
#[derive(Event, Debug, Clone, PartialEq)]
pub enum TabletCommand {
    Open { position: Vec3, orientation: Quat },
}

/// Кнопки web-диалога панели
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiButton {
    Mute,
    Bubble,
}

/// Пуш состояния кнопки в web-диалог (иконку выбирает host)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum PanelUiCommand {
    SetButton { button: UiButton, on: bool },
}

/// Просьба host'у переключить настройку
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleCommand {
    Mute,
    PrivacyShield,
}

/// Управление head/eyes IK локального аватара
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum LookAtCommand {
    SetHeadTarget(Vec3),
    SetEyesTarget(Vec3),
    /// Вернуть управление дефолтному поведению движка
    Release,
}

/// Запрос line-of-sight проверки (ответ придёт SightlineReport'ом)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct SightlineProbe {
    pub probe: u32,
    pub origin: Vec3,
    pub target: Vec3,
}
