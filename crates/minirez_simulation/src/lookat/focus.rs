//! Gaze machine: выбор фокуса и действий взгляда
//!
//! Двухуровневый таймер: фокус (на ком взгляд, секунды) и действие
//! (куда именно и как смотрим, доли секунды). Новый фокус выбирается
//! только на границе действия — взгляд не дёргается посреди stare.

use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::components::avatar::{AvatarJoints, AvatarPresence, LocalAvatar};
use crate::host::events::AvatarClickedEvent;
use crate::lookat::action::{
    action_profile, head_comfort_angle, joint_point, pick_audience, roll_face_mode, roll_range,
    roll_weighted, rotate_look_point, AudienceView, LookAction, OffsetMode, TargetMode,
};
use crate::lookat::components::{
    AudienceMember, FocusState, GazeMachine, LockFocusType, LookAtConfig, LookController,
    LookState, SceneFrame, TalkingState,
};
use crate::{log, DeterministicRng};

type MemberQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static AvatarPresence,
        &'static AvatarJoints,
        &'static AudienceMember,
    ),
>;

/// Тик gaze-машины: talking state → focus state → фокус → действие
#[allow(clippy::too_many_arguments)]
pub fn update_gaze_machine(
    time: Res<Time>,
    config: Res<LookAtConfig>,
    frame: Res<SceneFrame>,
    controller: Res<LookController>,
    mut machine: ResMut<GazeMachine>,
    mut rng: ResMut<DeterministicRng>,
    mut clicks: EventReader<AvatarClickedEvent>,
    local: Query<(Entity, &AvatarPresence, &AvatarJoints), With<LocalAvatar>>,
    members: MemberQuery,
) {
    let dt = time.delta_secs();
    let Ok((local_entity, local_presence, local_joints)) = local.single() else {
        return;
    };

    // Пока head/eyes у override-контроллера, машина заморожена
    if controller.state != LookState::AutomaticLook {
        clicks.clear();
        return;
    }

    let current_look = controller.current_head(local_joints.eyes_center, local_presence);
    if !machine.primed {
        machine.primed = true;
        machine.action.target_point = current_look;
    }

    let dice = &mut rng.rng;

    // Клик по аватару жёстко фиксирует фокус
    for click in clicks.read() {
        if members.get(click.target).is_ok() {
            machine.locked_focus = Some(click.target);
            machine.lock_type = LockFocusType::Click;
            log(&format!("👁 LOOKAT: focus locked on {:?} (click)", click.target));
        }
    }

    if frame.members.is_empty() {
        return;
    }

    let mut abort_action = machine.lock_type == LockFocusType::Click;

    // Взмах руками перехватывает внимание (кроме чужой речи без жеста)
    if !frame.fast_hands.is_empty() && machine.lock_type == LockFocusType::None {
        let views = collect_views(&frame.fast_hands, &members);
        let waver = pick_audience(
            &views,
            local_entity,
            local_presence.position,
            local_presence.forward(),
            config.audience_range,
            dice,
        );
        if let Some(waver) = waver {
            let talking = members
                .get(waver)
                .map(|(_, _, member)| member.talking)
                .unwrap_or(false);
            if !talking || frame.talker == Some(waver) {
                abort_action = dice.gen::<f32>() < config.abort_on_movement_chance;
                machine.locked_focus = Some(waver);
                machine.lock_type = LockFocusType::Movement;
            }
        }
    } else if machine.focus_total_time >= machine.focus_max {
        machine.lock_type = LockFocusType::None;
    }

    machine.talking_state =
        compute_talking_state(&frame, local_entity, machine.current_talker, machine.focus);

    // Новый говорящий: шанс перевести взгляд на него после текущего действия
    let refocus_on_talker = machine.talking_state == TalkingState::OtherFirst
        && dice.gen::<f32>() < config.refocus_on_new_talker_chance;
    if machine.locked_focus.is_some() || refocus_on_talker {
        machine.focus_total_time = machine.focus_max;
        if abort_action {
            machine.action.elapse_time = machine.action.total_time;
        }
    }

    let needs_new_focus = machine.focus_total_time >= machine.focus_max;
    let needs_new_action = machine.action.elapse_time >= machine.action.total_time;
    let mut new_focus = machine.focus;

    if needs_new_action && needs_new_focus {
        machine.focus_state = compute_focus_state(
            &frame,
            machine.talking_state,
            machine.focus,
            machine.locked_focus,
            machine.lock_type,
            &config,
            dice,
        );
        new_focus = compute_avatar_focus(
            machine.focus_state,
            &frame,
            machine.focus,
            machine.locked_focus,
            local_entity,
            local_presence,
            &members,
            &config,
            dice,
        );
        machine.locked_focus = None;
        machine.focus_max = if machine.lock_type == LockFocusType::Click {
            config.clicked_focus_time
        } else if machine.talking_state == TalkingState::MeAgain {
            config.min_focus_talker + dice.gen::<f32>() * config.focus_talker_range
        } else {
            config.min_focus_listener + dice.gen::<f32>() * config.focus_listener_range
        };
        machine.focus_total_time = 0.0;
        machine.current_talker = frame.talker;
        log(&format!(
            "👁 LOOKAT: focus {:?} ({:?}/{:?}, {:.1}s)",
            new_focus, machine.talking_state, machine.focus_state, machine.focus_max
        ));
    } else {
        machine.focus_total_time += dt;
    }

    if needs_new_action {
        if refocus_on_talker {
            // Случайная задержка перед сменой: старое действие идёт по второму кругу
            machine.action.elapse_time = 0.0;
        } else {
            machine.action = request_new_action(
                new_focus,
                local_presence,
                local_joints,
                current_look,
                &members,
                &config,
                dice,
            );
        }
        machine.focus = new_focus;
        if machine.focus.is_none()
            || matches!(
                machine.talking_state,
                TalkingState::MeFirst | TalkingState::MeAgain
            )
        {
            // Сами говорим или смотрим в никуда — голова движется минимально
            machine.action.speed = config.min_head_mix_alpha;
        }
    } else {
        update_current_action(&mut machine.action, &members, dt);
    }

    // Итоговые точки: offset по флагам + comfort-доворот головы
    let mut head_target = machine.action.target_point;
    if machine.action.offset_head {
        head_target += machine.action.offset;
    }
    head_target = rotate_look_point(
        local_joints.eyes_center,
        local_presence.orientation * Vec3::Y,
        head_target,
        machine.action.comfort_angle,
    );
    let mut eyes_target = machine.action.target_point;
    if machine.action.offset_eyes {
        eyes_target += machine.action.offset;
    }
    let head_speed = (machine.action.speed * dt * config.normalize_fps).min(1.0);

    machine.head_target = head_target;
    machine.eyes_target = eyes_target;
    machine.head_speed = head_speed;
}

pub(crate) fn compute_talking_state(
    frame: &SceneFrame,
    local: Entity,
    current_talker: Option<Entity>,
    current_focus: Option<Entity>,
) -> TalkingState {
    if frame.talker == Some(local) {
        if current_talker != Some(local) {
            TalkingState::MeFirst
        } else {
            TalkingState::MeAgain
        }
    } else if frame.talking_count > 1 {
        TalkingState::Several
    } else if frame.talking_count > 0 {
        if frame.talker != current_focus {
            TalkingState::OtherFirst
        } else {
            TalkingState::OtherAgain
        }
    } else {
        TalkingState::Nobody
    }
}

pub(crate) fn compute_focus_state(
    frame: &SceneFrame,
    talking_state: TalkingState,
    current_focus: Option<Entity>,
    locked_focus: Option<Entity>,
    lock_type: LockFocusType,
    config: &LookAtConfig,
    rng: &mut ChaCha8Rng,
) -> FocusState {
    let mut state = match talking_state {
        TalkingState::Nobody => {
            if !frame.previous_talkers.is_empty() {
                FocusState::LastTalker
            } else if rng.gen::<f32>() < config.idle_focus_chance {
                FocusState::RandomAudience
            } else {
                FocusState::Nobody
            }
        }
        TalkingState::MeFirst => {
            if current_focus.is_some() {
                FocusState::LastFocus
            } else if !frame.previous_talkers.is_empty() {
                FocusState::RandomLastTalker
            } else {
                FocusState::RandomAudience
            }
        }
        TalkingState::MeAgain => FocusState::RandomAudience,
        TalkingState::OtherFirst => FocusState::Talker,
        TalkingState::OtherAgain => {
            if rng.gen::<f32>() < config.switch_from_talker_chance {
                FocusState::RandomLastTalker
            } else {
                FocusState::Talker
            }
        }
        TalkingState::Several => {
            if rng.gen::<f32>() < config.keep_focus_on_several_chance {
                FocusState::LastFocus
            } else {
                FocusState::Talker
            }
        }
    };
    if locked_focus.is_some() {
        state = match lock_type {
            LockFocusType::Click => FocusState::Selected,
            LockFocusType::Movement => FocusState::Movement,
            LockFocusType::None => state,
        };
    }
    state
}

#[allow(clippy::too_many_arguments)]
fn compute_avatar_focus(
    focus_state: FocusState,
    frame: &SceneFrame,
    current_focus: Option<Entity>,
    locked_focus: Option<Entity>,
    local: Entity,
    local_presence: &AvatarPresence,
    members: &MemberQuery,
    config: &LookAtConfig,
    rng: &mut ChaCha8Rng,
) -> Option<Entity> {
    match focus_state {
        FocusState::Talker => frame.talker,
        FocusState::RandomAudience => pick_from(
            &frame.members,
            local,
            local_presence,
            members,
            config,
            rng,
        ),
        FocusState::LastTalker | FocusState::RandomLastTalker => {
            let mut focus = if frame.previous_talkers.is_empty() {
                None
            } else {
                pick_from(
                    &frame.previous_talkers,
                    local,
                    local_presence,
                    members,
                    config,
                    rng,
                )
            };
            if focus.is_none()
                && (focus_state == FocusState::RandomLastTalker
                    || rng.gen::<f32>() < config.fallback_glance_chance)
            {
                focus = pick_from(&frame.members, local, local_presence, members, config, rng);
            }
            focus
        }
        FocusState::LastFocus => current_focus,
        FocusState::Selected | FocusState::Movement => locked_focus,
        FocusState::Nobody => None,
    }
}

fn pick_from(
    pool: &[Entity],
    local: Entity,
    local_presence: &AvatarPresence,
    members: &MemberQuery,
    config: &LookAtConfig,
    rng: &mut ChaCha8Rng,
) -> Option<Entity> {
    let views = collect_views(pool, members);
    pick_audience(
        &views,
        local,
        local_presence.position,
        local_presence.forward(),
        config.audience_range,
        rng,
    )
}

fn collect_views(pool: &[Entity], members: &MemberQuery) -> Vec<AudienceView> {
    pool.iter()
        .filter_map(|&entity| {
            members
                .get(entity)
                .ok()
                .map(|(presence, _, member)| AudienceView {
                    entity,
                    position: presence.position,
                    forward: presence.forward(),
                    engaged: member.engaged,
                    distance: member.distance,
                })
        })
        .collect()
}

/// Новое действие для цели: точка лица/рук + смещение + длительность
fn request_new_action(
    target: Option<Entity>,
    local_presence: &AvatarPresence,
    local_joints: &AvatarJoints,
    current_look: Vec3,
    members: &MemberQuery,
    config: &LookAtConfig,
    rng: &mut ChaCha8Rng,
) -> LookAction {
    let (mode, target_point) = match target.and_then(|entity| members.get(entity).ok()) {
        Some((_, joints, member)) => {
            let mode = if member
                .palm_speeds
                .iter()
                .any(|speed| *speed > config.hand_trigger_speed)
            {
                // Жестикуляция интереснее лица — смотрим на более быструю руку
                if member.palm_speeds[1] < member.palm_speeds[0] {
                    TargetMode::LeftHand
                } else {
                    TargetMode::RightHand
                }
            } else {
                roll_face_mode(member.talking, rng)
            };
            (mode, joint_point(mode, joints).unwrap_or(current_look))
        }
        None => (TargetMode::NoTarget, current_look),
    };

    let profile = action_profile(mode);
    let offset_mode = roll_weighted(&profile.offsets, rng);
    let (offset, offset_eyes, offset_head) = if offset_mode != OffsetMode::NoOffset {
        let head = local_joints.head;
        let angle = roll_range(profile.offset_angle, rng);
        let angle = if rng.gen::<f32>() < 0.5 { -angle } else { angle };
        // Смещение = поворот вектора голова→цель вокруг мировой Y
        let rotation = Quat::from_rotation_y(angle.to_radians());
        (
            head + rotation * (target_point - head) - target_point,
            matches!(offset_mode, OffsetMode::EyesOnly | OffsetMode::HeadAndEyes),
            matches!(offset_mode, OffsetMode::HeadOnly | OffsetMode::HeadAndEyes),
        )
    } else {
        (Vec3::ZERO, false, false)
    };

    LookAction {
        target,
        mode,
        target_point,
        elapse_time: 0.0,
        total_time: roll_range(profile.stare, rng),
        offset,
        offset_eyes,
        offset_head,
        comfort_angle: head_comfort_angle(
            local_joints.eyes_center,
            local_presence.forward(),
            local_presence.right(),
            target_point,
            config.comfort_max_degrees,
        ),
        speed: roll_range((config.min_head_mix_alpha, config.max_head_mix_alpha), rng),
    }
}

/// Освежает точку по суставу цели (цель могла сдвинуться) и копит elapse
fn update_current_action(action: &mut LookAction, members: &MemberQuery, dt: f32) {
    if let Some((_, joints, _)) = action.target.and_then(|entity| members.get(entity).ok()) {
        if let Some(point) = joint_point(action.mode, joints) {
            action.target_point = point;
        }
    }
    action.elapse_time += dt;
}
