//! Тесты моста web-диалог ↔ host (кнопки, звуки, зеркалирование статусов)

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use bevy::time::TimeUpdateStrategy;

    use crate::components::{AvatarJoints, Hand, LocalAvatar, RigInput};
    use crate::host::{
        AudioCommand, AudioMutedEvent, HostPlugin, PanelUiCommand, PanelUiEvent,
        PrivacyShieldEvent, SoundCue, ToggleCommand, UiButton,
    };
    use crate::rezzer::RezzerPlugin;
    use crate::{SimSet, SIM_TICK};

    fn create_relay_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(TimeUpdateStrategy::ManualDuration(SIM_TICK))
            .insert_resource(Time::<Fixed>::from_hz(50.0))
            .configure_sets(FixedUpdate, (SimSet::Intake, SimSet::Rezzer).chain())
            .add_plugins((HostPlugin, RezzerPlugin));
        // Первый update: Startup + инициализация часов (нулевая дельта,
        // fixed ticks ещё нет). Дальше ровно один tick на update().
        app.update();
        app
    }

    /// Доводит панель до Visible{Left} за 15 тиков
    fn show_panel_on_left(app: &mut App) {
        {
            let mut input = app.world_mut().resource_mut::<RigInput>();
            input.hmd_active = true;
            input.camera.position = Vec3::new(0.0, 1.7, 0.0);
            input.camera.orientation = Quat::IDENTITY;

            let camera_position = input.camera.position;
            let hand_world = Vec3::new(0.0, 1.6, -0.8);
            let to_hand = (hand_world - camera_position).normalize();
            let sample = input.hand_mut(Hand::Left);
            sample.pose_valid = true;
            sample.translation = hand_world;
            sample.rotation = Quat::from_rotation_arc(Vec3::NEG_Z, to_hand);
        }
        for _ in 0..15 {
            app.update();
        }
    }

    fn drain<E: Event>(app: &mut App) -> Vec<E> {
        app.world_mut().resource_mut::<Events<E>>().drain().collect()
    }

    #[test]
    fn ready_pushes_current_toggle_states() {
        let mut app = create_relay_app();
        show_panel_on_left(&mut app);

        app.world_mut().send_event(PanelUiEvent::Ready);
        app.update();

        assert_eq!(
            drain::<PanelUiCommand>(&mut app),
            vec![
                PanelUiCommand::SetButton {
                    button: UiButton::Mute,
                    on: false,
                },
                PanelUiCommand::SetButton {
                    button: UiButton::Bubble,
                    on: false,
                },
            ]
        );
    }

    #[test]
    fn hover_and_clicks_sound_at_host_palm() {
        let mut app = create_relay_app();
        let palm = Vec3::new(-0.2, 1.1, -0.6);
        app.world_mut().spawn((
            LocalAvatar,
            AvatarJoints {
                left_palm: palm,
                ..Default::default()
            },
        ));
        show_panel_on_left(&mut app);

        app.world_mut().send_event(PanelUiEvent::Hover);
        app.update();
        assert_eq!(
            drain::<AudioCommand>(&mut app),
            vec![AudioCommand::Play {
                cue: SoundCue::Hover,
                volume: 0.5,
                position: palm,
            }]
        );

        app.world_mut().send_event(PanelUiEvent::MuteClicked);
        app.update();
        assert_eq!(
            drain::<AudioCommand>(&mut app),
            vec![AudioCommand::Play {
                cue: SoundCue::Click,
                volume: 0.8,
                position: palm,
            }]
        );
        assert_eq!(drain::<ToggleCommand>(&mut app), vec![ToggleCommand::Mute]);

        app.world_mut().send_event(PanelUiEvent::BubbleClicked);
        app.update();
        assert_eq!(
            drain::<ToggleCommand>(&mut app),
            vec![ToggleCommand::PrivacyShield]
        );
    }

    #[test]
    fn host_status_mirrors_into_dialog() {
        let mut app = create_relay_app();
        show_panel_on_left(&mut app);

        app.world_mut().send_event(AudioMutedEvent { muted: true });
        app.update();
        assert_eq!(
            drain::<PanelUiCommand>(&mut app),
            vec![PanelUiCommand::SetButton {
                button: UiButton::Mute,
                on: true,
            }]
        );

        // Ready после этого отдаёт уже изменённое состояние
        app.world_mut().send_event(PanelUiEvent::Ready);
        app.update();
        assert_eq!(
            drain::<PanelUiCommand>(&mut app),
            vec![
                PanelUiCommand::SetButton {
                    button: UiButton::Mute,
                    on: true,
                },
                PanelUiCommand::SetButton {
                    button: UiButton::Bubble,
                    on: false,
                },
            ]
        );

        app.world_mut()
            .send_event(PrivacyShieldEvent { enabled: true });
        app.update();
        assert_eq!(
            drain::<PanelUiCommand>(&mut app),
            vec![PanelUiCommand::SetButton {
                button: UiButton::Bubble,
                on: true,
            }]
        );
    }

    #[test]
    fn expand_click_plays_click_without_toggle() {
        let mut app = create_relay_app();
        app.world_mut().spawn((
            LocalAvatar,
            AvatarJoints {
                left_palm: Vec3::new(-0.2, 1.1, -0.6),
                ..Default::default()
            },
        ));
        show_panel_on_left(&mut app);

        app.world_mut().send_event(PanelUiEvent::ExpandClicked);
        app.update();

        assert!(drain::<ToggleCommand>(&mut app).is_empty());
        let audio = drain::<AudioCommand>(&mut app);
        assert!(matches!(
            audio.as_slice(),
            [AudioCommand::Play {
                cue: SoundCue::Click,
                ..
            }]
        ));
    }
}
