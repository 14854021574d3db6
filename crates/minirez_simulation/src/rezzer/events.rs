//! Rezzer events — информация о переходах для embedding'а и тестов

use bevy::prelude::*;

use crate::components::Hand;
use crate::rezzer::components::RezzerStateKind;

/// Переход state-машины панели (ровно один на смену вида состояния)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct PanelTransition {
    pub from: RezzerStateKind,
    pub to: RezzerStateKind,
    /// Рука-хост после перехода (если панель на руке)
    pub hand: Option<Hand>,
}
