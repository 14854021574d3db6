//! Look controller: override-машина поверх gaze-машины
//!
//! AutomaticLook — обычный режим: интерполируем голову к выходу машины
//! и каждый тик шлём host'у SetHeadTarget/SetEyesTarget. Два override'а:
//! camera-look (доворот к направлению камеры, потом отдаём голову движку)
//! и click-to-look (взгляд прибит к кликнутому аватару). Переходы между
//! режимами — та же quat-mix интерполяция с лимитом шагов.

use bevy::prelude::*;

use crate::components::avatar::{AvatarJoints, AvatarPresence, LocalAvatar, RemoteAvatar};
use crate::components::rig::{CameraMode, RigInput};
use crate::host::commands::LookAtCommand;
use crate::host::events::{AvatarClickedEvent, CameraLookEvent};
use crate::lookat::components::{GazeMachine, LookAtConfig, LookController, LookState};
use crate::{log, log_info};

/// Дистанция дефолтного взгляда «прямо вперёд», метры
const FORWARD_LOOK_DISTANCE: f32 = 10.0;

impl LookController {
    /// Текущая интерполированная точка взгляда
    /// (до инициализации — прямо по курсу аватара)
    pub fn current_head(&self, eyes: Vec3, presence: &AvatarPresence) -> Vec3 {
        self.interpolated_head
            .unwrap_or_else(|| eyes + presence.forward() * FORWARD_LOOK_DISTANCE)
    }
}

#[allow(clippy::too_many_arguments)]
pub fn update_look_controller(
    time: Res<Time>,
    config: Res<LookAtConfig>,
    input: Res<RigInput>,
    machine: Res<GazeMachine>,
    mut controller: ResMut<LookController>,
    mut clicks: EventReader<AvatarClickedEvent>,
    mut camera_looks: EventReader<CameraLookEvent>,
    local: Query<(&AvatarPresence, &AvatarJoints), With<LocalAvatar>>,
    remotes: Query<&AvatarJoints, With<RemoteAvatar>>,
    mut commands: EventWriter<LookAtCommand>,
) {
    let dt = time.delta_secs();
    let Ok((presence, joints)) = local.single() else {
        return;
    };

    // Independent-камера — кинематограф: IK отпускаем целиком
    if input.camera.mode == CameraMode::Independent {
        if !controller.released {
            controller.released = true;
            controller.state = LookState::AutomaticLook;
            controller.interpolated_head = None;
            controller.click_target = None;
            commands.write(LookAtCommand::Release);
            log_info("👁 LOOKAT: released (independent camera)");
        }
        clicks.clear();
        camera_looks.clear();
        return;
    }

    let eyes = joints.eyes_center;
    let up = presence.orientation * Vec3::Y;
    let transit_speed = (config.camera_mix_alpha * dt * config.normalize_fps).min(1.0);

    // Жесты принимаются только из авто-режима
    let camera_requested = camera_looks.read().count() > 0;
    let clicked = clicks.read().last().map(|click| click.target);
    if controller.state == LookState::AutomaticLook {
        if let Some(target) = clicked {
            if remotes.contains(target) {
                controller.state = LookState::ClickToLookActive;
                controller.click_target = Some(target);
                controller.click_timer = 0.0;
                log_info(&format!("👁 LOOKAT: click-to-look at {:?}", target));
            }
        } else if camera_requested {
            controller.state = LookState::CameraLookActivating;
            controller.camera_timer = 0.0;
            controller.steps = 0;
            log_info("👁 LOOKAT: aligning head to camera");
        }
    }

    match controller.state {
        LookState::ClickToLookActive => {
            let target = controller
                .click_target
                .and_then(|entity| remotes.get(entity).ok())
                .map(|target_joints| target_joints.head);
            match target {
                Some(point) => {
                    let current = controller.current_head(eyes, presence);
                    let mixed = mix_look_target(eyes, current, point, transit_speed, up, false);
                    controller.interpolated_head = Some(mixed);
                    commands.write(LookAtCommand::SetHeadTarget(mixed));
                    commands.write(LookAtCommand::SetEyesTarget(point));
                    if controller.click_timer > config.click_look_time {
                        controller.state = LookState::ClickToLookDeactivating;
                        controller.steps = 0;
                    }
                    controller.click_timer += dt;
                }
                None => {
                    // Кликнутый аватар пропал из мира
                    controller.state = LookState::ClickToLookDeactivating;
                    controller.steps = 0;
                }
            }
        }
        LookState::ClickToLookDeactivating => {
            let current = controller.current_head(eyes, presence);
            let (mixed, settled) = step_toward(
                eyes,
                current,
                machine.head_target,
                transit_speed,
                up,
                false,
                config.settle_tolerance,
            );
            controller.interpolated_head = Some(mixed);
            commands.write(LookAtCommand::SetHeadTarget(mixed));
            let broke = controller.steps > config.max_interpolation_steps;
            if settled || broke {
                controller.state = LookState::AutomaticLook;
                controller.steps = 0;
                controller.click_target = None;
                if broke {
                    log("👁 LOOKAT: breaking click interpolation");
                }
            } else {
                controller.steps += 1;
            }
        }
        LookState::CameraLookActivating => {
            let mut front = input.camera.forward();
            if input.camera.mode == CameraMode::Selfie {
                front = -front;
            }
            let current = controller.current_head(eyes, presence);
            let (mixed, settled) = step_toward(
                eyes,
                current,
                eyes + front,
                transit_speed,
                up,
                true,
                config.settle_tolerance,
            );
            controller.interpolated_head = Some(mixed);
            commands.write(LookAtCommand::SetHeadTarget(mixed));
            let broke = controller.steps > config.max_interpolation_steps;
            if settled || broke {
                controller.state = LookState::CameraLookActive;
                controller.camera_timer = 0.0;
                controller.steps = 0;
                // Дальше голова следует камере силами движка
                commands.write(LookAtCommand::Release);
                if broke {
                    log("👁 LOOKAT: breaking camera interpolation");
                }
            } else {
                controller.steps += 1;
            }
        }
        LookState::CameraLookActive => {
            if controller.camera_timer > config.camera_look_time {
                controller.state = LookState::AutomaticLook;
                controller.interpolated_head = None;
            }
            controller.camera_timer += dt;
        }
        LookState::AutomaticLook => {
            if presence.velocity.length() >= config.fast_speed_limit {
                // Бежим: IK отпускаем, пока не остановимся
                if !controller.released {
                    controller.released = true;
                    controller.interpolated_head = None;
                    commands.write(LookAtCommand::Release);
                    log_info("👁 LOOKAT: released (moving fast)");
                }
            } else {
                controller.released = false;
                let current = controller.current_head(eyes, presence);
                let mixed = mix_look_target(
                    eyes,
                    current,
                    machine.head_target,
                    machine.head_speed,
                    up,
                    true,
                );
                controller.interpolated_head = Some(mixed);
                commands.write(LookAtCommand::SetHeadTarget(mixed));
                commands.write(LookAtCommand::SetEyesTarget(machine.eyes_target));
            }
        }
    }
}

/// Quat-mix текущего направления взгляда к цели: поворачиваем на долю
/// alpha, длину берём до цели. no_pitch прижимает точку к высоте глаз.
fn mix_look_target(
    eyes: Vec3,
    current: Vec3,
    target: Vec3,
    alpha: f32,
    up: Vec3,
    no_pitch: bool,
) -> Vec3 {
    let target_rotation = look_rotation(target - eyes, up);
    let current_rotation = look_rotation(current - eyes, up);
    let mixed = current_rotation.slerp(target_rotation, alpha);
    let mut point = eyes + (target - eyes).length() * (mixed * Vec3::NEG_Z);
    if no_pitch {
        point.y = eyes.y;
    }
    point
}

/// Шаг интерполяции; settled когда направление сошлось с целевым
fn step_toward(
    eyes: Vec3,
    current: Vec3,
    target: Vec3,
    alpha: f32,
    up: Vec3,
    no_pitch: bool,
    tolerance: f32,
) -> (Vec3, bool) {
    let mixed = mix_look_target(eyes, current, target, alpha, up, no_pitch);
    let settled = (mixed - eyes)
        .normalize_or_zero()
        .dot((target - eyes).normalize_or_zero())
        > tolerance;
    (mixed, settled)
}

fn look_rotation(direction: Vec3, up: Vec3) -> Quat {
    if direction.length_squared() < 1e-8 {
        return Quat::IDENTITY;
    }
    Transform::default().looking_to(direction, up).rotation
}
