//! Avatar-компоненты: локальный аватар + удалённые аватары рядом
//!
//! Host engine спавнит/деспавнит remote-аватары по presence и каждый тик
//! обновляет AvatarPresence/AvatarJoints/AvatarVoice (world frame).
//! Симуляция эти данные только читает.

use bevy::prelude::*;

/// Marker: локальный аватар (ровно один на мир)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct LocalAvatar;

/// Marker: удалённый аватар в зоне видимости
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct RemoteAvatar;

/// Позиция/ориентация/скорость аватара (world frame, host-fed)
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct AvatarPresence {
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
}

impl Default for AvatarPresence {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
        }
    }
}

impl AvatarPresence {
    /// Forward в конвенции host engine (-Z)
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    /// Правая ось (для знака comfort-угла)
    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }
}

/// Ключевые суставы аватара (world frame, host-fed)
///
/// eyes_center = default eye position (между глаз) — origin для
/// sightline-проб и базовая точка "смотрим отсюда".
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct AvatarJoints {
    pub head: Vec3,
    pub neck: Vec3,
    pub eyes_center: Vec3,
    pub left_eye: Vec3,
    pub right_eye: Vec3,
    pub mouth: Vec3,
    pub left_palm: Vec3,
    pub right_palm: Vec3,
}

impl Default for AvatarJoints {
    fn default() -> Self {
        Self {
            head: Vec3::ZERO,
            neck: Vec3::ZERO,
            eyes_center: Vec3::ZERO,
            left_eye: Vec3::ZERO,
            right_eye: Vec3::ZERO,
            mouth: Vec3::ZERO,
            left_palm: Vec3::ZERO,
            right_palm: Vec3::ZERO,
        }
    }
}

/// Голос: сырой loudness из audio mixer (host-fed, без сглаживания)
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct AvatarVoice {
    pub loudness: f32,
}

/// Display name (для логов)
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct DisplayName(pub String);
