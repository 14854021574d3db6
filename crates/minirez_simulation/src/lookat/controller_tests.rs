//! Тесты override-контроллера: автоматическое доворачивание головы,
//! camera-look и click-to-look циклы, gating по скорости и
//! independent-камере. Gaze-машина подменяется вручную выставленным
//! GazeMachine — контроллер видит только её выход.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use bevy::time::TimeUpdateStrategy;

    use crate::components::avatar::{AvatarJoints, AvatarPresence, LocalAvatar, RemoteAvatar};
    use crate::components::rig::{CameraMode, RigInput};
    use crate::host::{AvatarClickedEvent, CameraLookEvent, HostPlugin, LookAtCommand};
    use crate::lookat::components::{GazeMachine, LookAtConfig, LookController, LookState};
    use crate::lookat::controller::update_look_controller;
    use crate::SIM_TICK;

    /// Контроллер в изоляции: машина не тикает, её выход задают тесты
    fn create_controller_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(TimeUpdateStrategy::ManualDuration(SIM_TICK))
            .insert_resource(Time::<Fixed>::from_hz(50.0))
            .add_plugins(HostPlugin)
            .init_resource::<LookAtConfig>()
            .init_resource::<GazeMachine>()
            .init_resource::<LookController>()
            .add_systems(FixedUpdate, update_look_controller);
        // Первый update: инициализация часов с нулевой дельтой, fixed
        // ticks начинаются со следующего.
        app.update();
        app
    }

    fn joints_at(position: Vec3) -> AvatarJoints {
        AvatarJoints {
            head: position + Vec3::new(0.0, 1.7, 0.0),
            neck: position + Vec3::new(0.0, 1.5, 0.0),
            eyes_center: position + Vec3::new(0.0, 1.65, 0.0),
            left_eye: position + Vec3::new(-0.03, 1.65, 0.0),
            right_eye: position + Vec3::new(0.03, 1.65, 0.0),
            mouth: position + Vec3::new(0.0, 1.6, 0.0),
            left_palm: position + Vec3::new(-0.3, 1.0, 0.0),
            right_palm: position + Vec3::new(0.3, 1.0, 0.0),
        }
    }

    fn spawn_local(app: &mut App, position: Vec3) -> Entity {
        app.world_mut()
            .spawn((
                LocalAvatar,
                AvatarPresence {
                    position,
                    ..Default::default()
                },
                joints_at(position),
            ))
            .id()
    }

    fn spawn_remote(app: &mut App, position: Vec3) -> Entity {
        app.world_mut()
            .spawn((
                RemoteAvatar,
                AvatarPresence {
                    position,
                    ..Default::default()
                },
                joints_at(position),
            ))
            .id()
    }

    /// Выход gaze-машины, который контроллер будет отрабатывать
    fn set_machine(app: &mut App, head: Vec3, eyes: Vec3, speed: f32) {
        let mut machine = app.world_mut().resource_mut::<GazeMachine>();
        machine.head_target = head;
        machine.eyes_target = eyes;
        machine.head_speed = speed;
    }

    fn controller_state(app: &App) -> LookState {
        app.world().resource::<LookController>().state
    }

    fn run_ticks(app: &mut App, count: usize) -> Vec<LookAtCommand> {
        let mut commands = Vec::new();
        for _ in 0..count {
            app.update();
            commands.extend(
                app.world_mut()
                    .resource_mut::<Events<LookAtCommand>>()
                    .drain(),
            );
        }
        commands
    }

    /// Тикает до предиката; возвращает потраченные тики
    fn run_until(app: &mut App, limit: usize, predicate: impl Fn(&App) -> bool) -> usize {
        for tick in 1..=limit {
            app.update();
            app.world_mut()
                .resource_mut::<Events<LookAtCommand>>()
                .drain();
            if predicate(app) {
                return tick;
            }
        }
        panic!("предикат не сработал за {} тиков", limit);
    }

    fn head_targets(commands: &[LookAtCommand]) -> Vec<Vec3> {
        commands
            .iter()
            .filter_map(|command| match command {
                LookAtCommand::SetHeadTarget(point) => Some(*point),
                _ => None,
            })
            .collect()
    }

    fn releases(commands: &[LookAtCommand]) -> usize {
        commands
            .iter()
            .filter(|command| matches!(command, LookAtCommand::Release))
            .count()
    }

    #[test]
    fn automatic_mode_steers_head_to_machine_target() {
        let mut app = create_controller_app();
        spawn_local(&mut app, Vec3::ZERO);
        let eyes = Vec3::new(0.0, 1.65, 0.0);
        let target = eyes + Vec3::new(5.0, 0.0, -5.0);
        set_machine(&mut app, target, target, 0.3);

        let commands = run_ticks(&mut app, 40);

        // Каждый тик ровно пара SetHeadTarget + SetEyesTarget
        assert_eq!(commands.len(), 80);
        let heads = head_targets(&commands);
        assert_eq!(heads.len(), 40);
        // Первый шаг далеко от цели, к концу голова довёрнута
        assert!(heads[0].distance(target) > 1.0);
        assert!(heads.last().unwrap().distance(target) < 0.05);
        // Глаза идут в цель сразу, без интерполяции
        assert!(commands
            .iter()
            .any(|command| matches!(command, LookAtCommand::SetEyesTarget(point) if *point == target)));
    }

    #[test]
    fn camera_look_gesture_full_cycle() {
        let mut app = create_controller_app();
        spawn_local(&mut app, Vec3::ZERO);
        let eyes = Vec3::new(0.0, 1.65, 0.0);
        let ahead = eyes + Vec3::NEG_Z * 10.0;
        set_machine(&mut app, ahead, ahead, 0.3);
        app.world_mut()
            .resource_mut::<RigInput>()
            .camera
            .orientation = Quat::from_rotation_y(30.0_f32.to_radians());

        run_ticks(&mut app, 3);
        app.world_mut().send_event(CameraLookEvent);

        // Доворот к камере сходится за ~13 шагов, на границе один Release
        let commands = run_ticks(&mut app, 30);
        assert_eq!(controller_state(&app), LookState::CameraLookActive);
        assert_eq!(releases(&commands), 1);

        // Голова у движка: контроллер молчит
        let commands = run_ticks(&mut app, 200);
        assert!(commands.is_empty());

        // Таймер вышел — автоматика вернулась
        let commands = run_ticks(&mut app, 60);
        assert_eq!(controller_state(&app), LookState::AutomaticLook);
        assert_eq!(releases(&commands), 0);
        assert!(!head_targets(&commands).is_empty());
    }

    #[test]
    fn selfie_camera_look_turns_backwards() {
        let mut app = create_controller_app();
        spawn_local(&mut app, Vec3::ZERO);
        let eyes = Vec3::new(0.0, 1.65, 0.0);
        let ahead = eyes + Vec3::NEG_Z * 10.0;
        set_machine(&mut app, ahead, ahead, 0.3);
        app.world_mut().resource_mut::<RigInput>().camera.mode = CameraMode::Selfie;

        app.world_mut().send_event(CameraLookEvent);
        let commands = run_ticks(&mut app, 60);

        // Селфи-камера смотрит на нас: голова доворачивается назад (+Z)
        assert_eq!(controller_state(&app), LookState::CameraLookActive);
        let last = head_targets(&commands).last().cloned().unwrap();
        assert!((last - eyes).z > 0.9);
    }

    #[test]
    fn click_to_look_pins_eyes_then_returns() {
        let mut app = create_controller_app();
        spawn_local(&mut app, Vec3::ZERO);
        let remote = spawn_remote(&mut app, Vec3::new(2.0, 0.0, -3.0));
        let eyes = Vec3::new(0.0, 1.65, 0.0);
        let ahead = eyes + Vec3::NEG_Z * 10.0;
        set_machine(&mut app, ahead, ahead, 0.3);

        app.world_mut()
            .send_event(AvatarClickedEvent { target: remote });
        let commands = run_ticks(&mut app, 10);
        assert_eq!(controller_state(&app), LookState::ClickToLookActive);

        // Глаза прибиты ровно к голове кликнутого, каждый тик
        let head = app.world().get::<AvatarJoints>(remote).unwrap().head;
        let pinned = commands
            .iter()
            .filter(|command| matches!(command, LookAtCommand::SetEyesTarget(point) if *point == head))
            .count();
        assert_eq!(pinned, 10);

        // 5 секунд — возврат к автоматике через деактивацию
        let ticks = run_until(&mut app, 300, |app| {
            controller_state(app) == LookState::ClickToLookDeactivating
        });
        assert!(ticks <= 260);
        let ticks = run_until(&mut app, 120, |app| {
            controller_state(app) == LookState::AutomaticLook
        });
        assert!(ticks <= 110);
        assert_eq!(app.world().resource::<LookController>().click_target, None);
    }

    #[test]
    fn click_target_despawn_falls_back() {
        let mut app = create_controller_app();
        spawn_local(&mut app, Vec3::ZERO);
        let remote = spawn_remote(&mut app, Vec3::new(2.0, 0.0, -3.0));
        let eyes = Vec3::new(0.0, 1.65, 0.0);
        set_machine(&mut app, eyes + Vec3::NEG_Z * 10.0, eyes + Vec3::NEG_Z * 10.0, 0.3);

        app.world_mut()
            .send_event(AvatarClickedEvent { target: remote });
        run_ticks(&mut app, 5);
        assert_eq!(controller_state(&app), LookState::ClickToLookActive);

        // Кликнутый пропал из мира — мягкий возврат вместо зависания
        app.world_mut().despawn(remote);
        run_ticks(&mut app, 1);
        assert_eq!(controller_state(&app), LookState::ClickToLookDeactivating);
    }

    #[test]
    fn fast_movement_releases_ik_once() {
        let mut app = create_controller_app();
        let local = spawn_local(&mut app, Vec3::ZERO);
        let eyes = Vec3::new(0.0, 1.65, 0.0);
        set_machine(&mut app, eyes + Vec3::NEG_Z * 10.0, eyes + Vec3::NEG_Z * 10.0, 0.3);

        let commands = run_ticks(&mut app, 5);
        assert_eq!(head_targets(&commands).len(), 5);

        // Побежали: ровно один Release и тишина
        app.world_mut()
            .get_mut::<AvatarPresence>(local)
            .unwrap()
            .velocity = Vec3::new(2.0, 0.0, 0.0);
        let commands = run_ticks(&mut app, 20);
        assert_eq!(releases(&commands), 1);
        assert!(head_targets(&commands).is_empty());

        // Остановились: автоматика возобновилась
        app.world_mut()
            .get_mut::<AvatarPresence>(local)
            .unwrap()
            .velocity = Vec3::ZERO;
        let commands = run_ticks(&mut app, 5);
        assert_eq!(releases(&commands), 0);
        assert_eq!(head_targets(&commands).len(), 5);
    }

    #[test]
    fn independent_camera_blocks_gestures() {
        let mut app = create_controller_app();
        spawn_local(&mut app, Vec3::ZERO);
        let remote = spawn_remote(&mut app, Vec3::new(2.0, 0.0, -3.0));
        let eyes = Vec3::new(0.0, 1.65, 0.0);
        set_machine(&mut app, eyes + Vec3::NEG_Z * 10.0, eyes + Vec3::NEG_Z * 10.0, 0.3);

        app.world_mut().resource_mut::<RigInput>().camera.mode = CameraMode::Independent;
        app.world_mut()
            .send_event(AvatarClickedEvent { target: remote });
        app.world_mut().send_event(CameraLookEvent);

        let commands = run_ticks(&mut app, 10);
        assert_eq!(releases(&commands), 1);
        assert!(head_targets(&commands).is_empty());
        assert_eq!(controller_state(&app), LookState::AutomaticLook);

        // Камера вернулась (и повёрнута — доворот не мгновенный):
        // жесты снова работают
        app.world_mut().resource_mut::<RigInput>().camera.mode = CameraMode::FirstPerson;
        app.world_mut()
            .resource_mut::<RigInput>()
            .camera
            .orientation = Quat::from_rotation_y(45.0_f32.to_radians());
        app.world_mut().send_event(CameraLookEvent);
        run_ticks(&mut app, 1);
        assert_eq!(controller_state(&app), LookState::CameraLookActivating);
    }

    #[test]
    fn click_gesture_wins_over_camera_gesture() {
        let mut app = create_controller_app();
        spawn_local(&mut app, Vec3::ZERO);
        let remote = spawn_remote(&mut app, Vec3::new(2.0, 0.0, -3.0));
        let eyes = Vec3::new(0.0, 1.65, 0.0);
        set_machine(&mut app, eyes + Vec3::NEG_Z * 10.0, eyes + Vec3::NEG_Z * 10.0, 0.3);

        app.world_mut()
            .send_event(AvatarClickedEvent { target: remote });
        app.world_mut().send_event(CameraLookEvent);
        run_ticks(&mut app, 1);

        assert_eq!(controller_state(&app), LookState::ClickToLookActive);
    }
}
