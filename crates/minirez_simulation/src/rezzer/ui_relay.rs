//! Мост между web-диалогом панели и host-тумблерами
//!
//! Экран панели шлёт PanelUiEvent (ready/hover/клики), мы отвечаем
//! PanelUiCommand (подсветка кнопок), ToggleCommand (mute/shield)
//! и звуками на ладони руки-хоста.

use bevy::prelude::*;

use crate::components::{AvatarJoints, Hand, LocalAvatar};
use crate::host::{
    AudioCommand, AudioMutedEvent, PanelUiCommand, PanelUiEvent, PrivacyShieldEvent, SoundCue,
    ToggleCommand, UiButton,
};
use crate::rezzer::components::{MiniPanel, RezzerConfig, RezzerState};

/// Система: реакция на события диалога панели + зеркалирование host-статусов
pub fn panel_ui_relay(
    mut panels: Query<(&RezzerState, &mut MiniPanel, &RezzerConfig)>,
    local_avatar: Query<&AvatarJoints, With<LocalAvatar>>,
    mut ui_events: EventReader<PanelUiEvent>,
    mut muted_events: EventReader<AudioMutedEvent>,
    mut shield_events: EventReader<PrivacyShieldEvent>,
    mut ui_commands: EventWriter<PanelUiCommand>,
    mut toggles: EventWriter<ToggleCommand>,
    mut audio: EventWriter<AudioCommand>,
) {
    let Ok((state, mut panel, config)) = panels.single_mut() else {
        return;
    };

    // Host поменял mute/shield (не обязательно через нас) — зеркалим в диалог
    for event in muted_events.read() {
        panel.muted = event.muted;
        ui_commands.write(PanelUiCommand::SetButton {
            button: UiButton::Mute,
            on: event.muted,
        });
    }
    for event in shield_events.read() {
        panel.shield_on = event.enabled;
        ui_commands.write(PanelUiCommand::SetButton {
            button: UiButton::Bubble,
            on: event.enabled,
        });
    }

    // Звуки играем на ладони руки-хоста
    let sound_position = state.hand().and_then(|hand| {
        local_avatar.iter().next().map(|joints| match hand {
            Hand::Left => joints.left_palm,
            Hand::Right => joints.right_palm,
        })
    });

    for event in ui_events.read() {
        match event {
            PanelUiEvent::Ready => {
                // Диалог загрузился — выставляем актуальные тумблеры
                ui_commands.write(PanelUiCommand::SetButton {
                    button: UiButton::Mute,
                    on: panel.muted,
                });
                ui_commands.write(PanelUiCommand::SetButton {
                    button: UiButton::Bubble,
                    on: panel.shield_on,
                });
            }
            PanelUiEvent::Hover => {
                play_cue(&mut audio, SoundCue::Hover, config.hover_volume, sound_position);
            }
            PanelUiEvent::MuteClicked => {
                play_cue(&mut audio, SoundCue::Click, config.click_volume, sound_position);
                toggles.write(ToggleCommand::Mute);
            }
            PanelUiEvent::BubbleClicked => {
                play_cue(&mut audio, SoundCue::Click, config.click_volume, sound_position);
                toggles.write(ToggleCommand::PrivacyShield);
            }
            PanelUiEvent::ExpandClicked => {
                // Сам переход в Expanding делает rezzer_transitions
                play_cue(&mut audio, SoundCue::Click, config.click_volume, sound_position);
            }
        }
    }
}

fn play_cue(
    audio: &mut EventWriter<AudioCommand>,
    cue: SoundCue,
    volume: f32,
    position: Option<Vec3>,
) {
    // Без локального аватара звуку негде играть
    let Some(position) = position else {
        return;
    };
    audio.write(AudioCommand::Play {
        cue,
        volume,
        position,
    });
}
