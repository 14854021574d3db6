//! Rezzer components (state machine, config, panel bookkeeping)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::Hand;
use crate::host::OverlayId;

/// Состояния панели (hand-attached UI)
///
/// Disabled → Hidden ⇄ Showing → Visible ⇄ Hiding → Hidden
/// плюс Visible → Expanding → Open.
///
/// Панель живёт максимум на одной руке; смена руки — только через
/// Hiding → Hidden → Showing.
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub enum RezzerState {
    /// Desktop mode — overlays не существуют
    Disabled,

    /// HMD активен, панель спрятана; поллим обе руки
    Hidden,

    /// Панель растёт на руке (linear tween)
    Showing {
        hand: Hand,
        /// 0.0..=1.0, доля показа
        progress: f32,
    },

    /// Панель в полном мини-размере на руке
    Visible {
        hand: Hand,
    },

    /// Панель сжимается (linear tween)
    Hiding {
        hand: Hand,
        /// 0.0..=1.0, доля скрытия
        progress: f32,
    },

    /// Панель схвачена и растёт к ширине полного tablet
    Expanding {
        /// Рука, на которой панель жила
        host_hand: Hand,
        /// Рука, которая схватила (якорь роста)
        grab_hand: Hand,
        progress: f32,
    },

    /// Полный tablet открыт — транзитное состояние, следующий tick → Hidden
    Open,
}

impl Default for RezzerState {
    fn default() -> Self {
        Self::Disabled
    }
}

impl RezzerState {
    pub fn kind(&self) -> RezzerStateKind {
        match self {
            RezzerState::Disabled => RezzerStateKind::Disabled,
            RezzerState::Hidden => RezzerStateKind::Hidden,
            RezzerState::Showing { .. } => RezzerStateKind::Showing,
            RezzerState::Visible { .. } => RezzerStateKind::Visible,
            RezzerState::Hiding { .. } => RezzerStateKind::Hiding,
            RezzerState::Expanding { .. } => RezzerStateKind::Expanding,
            RezzerState::Open => RezzerStateKind::Open,
        }
    }

    /// Рука-хост панели (если панель на руке)
    pub fn hand(&self) -> Option<Hand> {
        match self {
            RezzerState::Showing { hand, .. }
            | RezzerState::Visible { hand }
            | RezzerState::Hiding { hand, .. } => Some(*hand),
            RezzerState::Expanding { host_hand, .. } => Some(*host_hand),
            _ => None,
        }
    }
}

/// Вид состояния (для transition-событий и логов)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum RezzerStateKind {
    Disabled,
    Hidden,
    Showing,
    Visible,
    Hiding,
    Expanding,
    Open,
}

/// Параметры панели
#[derive(Component, Debug, Clone, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct RezzerConfig {
    /// Модель панели (пропорции полного tablet)
    pub model_url: String,
    /// Web-диалог экранчика
    pub screen_url: String,

    /// Габариты модели, метры
    pub panel_dimensions: Vec3,
    /// Локальная позиция на joint'е руки (над ладонью)
    pub attach_position: Vec3,
    /// Локальный разворот (экраном к глазам), обе руки одинаково
    pub attach_rotation: Quat,

    /// Габариты web-экрана, метры
    pub screen_dimensions: Vec2,
    /// Пиксельная плотность экрана при масштабе 1.0
    pub screen_dpi: f32,
    /// Зазор экрана над поверхностью модели, метры
    pub screen_offset: f32,
    /// Задержка alpha=1 после первого показа (web-контент рендерится)
    pub screen_warmup_delay: f32,

    /// Длительность show/hide tween, секунды
    pub show_hide_duration: f32,
    /// Длительность expand tween, секунды
    pub expand_duration: f32,
    /// Debounce повторного show/hide, секунды
    pub toggle_holdoff: f32,

    /// Целевая ширина полного tablet, метры
    pub expanded_width: f32,
    /// Якоря захвата (доли panel_dimensions), индекс — grab-рука
    pub expand_handles: [Vec3; 2],

    pub hover_volume: f32,
    pub click_volume: f32,
}

impl Default for RezzerConfig {
    fn default() -> Self {
        Self {
            model_url: "assets/models/miniTablet.fbx".into(),
            screen_url: "assets/html/miniTablet.html".into(),

            panel_dimensions: Vec3::new(0.0637, 0.0965, 0.0046),
            attach_position: Vec3::new(0.0, 0.07, 0.07),
            attach_rotation: Quat::from_rotation_y(std::f32::consts::PI),

            screen_dimensions: Vec2::new(0.0577, 0.0905),
            // 150px на ширину экрана
            screen_dpi: 150.0 / (0.0577 * 39.3701),
            screen_offset: 0.001,
            screen_warmup_delay: 0.5,

            show_hide_duration: 0.25,
            expand_duration: 0.25,
            toggle_holdoff: 1.0,

            expanded_width: 0.4,
            expand_handles: [
                Vec3::new(0.5, -0.4, 0.0),
                Vec3::new(-0.5, -0.4, 0.0),
            ],

            hover_volume: 0.5,
            click_volume: 0.8,
        }
    }
}

impl RezzerConfig {
    /// Локальная позиция экрана на модели (до масштабирования)
    pub fn screen_local_position(&self) -> Vec3 {
        Vec3::new(
            0.0,
            0.0,
            -(self.panel_dimensions.z / 2.0 + self.screen_offset),
        )
    }

    /// Якорь захвата для руки (доли → метры)
    pub fn expand_handle(&self, grab_hand: Hand) -> Vec3 {
        self.expand_handles[grab_hand.index()] * self.panel_dimensions
    }
}

/// Бухгалтерия панели: overlay ids, debounce, warmup, expand-снапшот
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct MiniPanel {
    pub model_overlay: Option<OverlayId>,
    pub screen_overlay: Option<OverlayId>,

    /// Debounce: осталось секунд до разрешения показа из Hidden
    pub show_holdoff: f32,
    /// Debounce: осталось секунд до разрешения condition-driven hide
    pub hide_holdoff: f32,

    /// Обратный отсчёт до alpha=1 экрана (None = не идёт)
    pub screen_warmup: Option<f32>,
    /// Экран уже прогрет (один раз на создание overlays)
    pub screen_warmed: bool,

    /// Снапшот точки захвата при входе в Expanding (локальный frame руки)
    pub expand_anchor: Vec3,
    pub expand_rotation: Quat,

    /// Последний синхронизированный масштаб (для re-size в Visible)
    pub synced_scale: f32,

    /// Последние известные статусы host'а для кнопок диалога
    pub muted: bool,
    pub shield_on: bool,
}

impl Default for MiniPanel {
    fn default() -> Self {
        Self {
            model_overlay: None,
            screen_overlay: None,
            show_holdoff: 0.0,
            hide_holdoff: 0.0,
            screen_warmup: None,
            screen_warmed: false,
            expand_anchor: Vec3::ZERO,
            expand_rotation: Quat::IDENTITY,
            synced_scale: 1.0,
            muted: false,
            shield_on: false,
        }
    }
}
