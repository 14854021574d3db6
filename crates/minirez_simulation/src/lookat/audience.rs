//! Аудитория: кто в зоне внимания, кто говорит, кто машет руками
//!
//! Зона поиска смещена вперёд по курсу — стоящие сзади выпадают из
//! внимания раньше, чем стоящие впереди. Локальный аватар тоже член
//! аудитории: его речь детектится тем же EMA-механизмом.

use bevy::prelude::*;

use crate::components::avatar::{
    AvatarJoints, AvatarPresence, AvatarVoice, DisplayName, LocalAvatar,
};
use crate::host::{SightlineProbe, SightlineReport};
use crate::lookat::components::{AudienceMember, LookAtConfig, SceneFrame, SightlineTracker};
use crate::log;

/// Пересборка списка аудитории + детекция речи и жестов
///
/// Loudness квантуется (порог → 0/100) и сглаживается EMA: talking
/// включается только на устойчивую речь, а не на одиночный пик.
/// Замолчавшие остаются в previous_talkers, пока распадается talking_time.
pub fn update_audience(
    time: Res<Time>,
    config: Res<LookAtConfig>,
    mut frame: ResMut<SceneFrame>,
    local: Query<(Entity, &AvatarPresence), With<LocalAvatar>>,
    mut avatars: Query<(
        Entity,
        &AvatarPresence,
        &AvatarJoints,
        &AvatarVoice,
        Option<&mut AudienceMember>,
        Option<&DisplayName>,
    )>,
    mut commands: Commands,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }
    let Ok((local_entity, local_presence)) = local.single() else {
        return;
    };
    let center = local_presence.position
        + config.search_forward_bias * config.search_range * local_presence.forward();

    let mut members = Vec::new();
    let mut talker = None;
    let mut max_loudness = 0.0_f32;
    let mut talking_count = 0_u32;
    let mut previous_talkers = Vec::new();
    let mut fast_hands = Vec::new();

    for (entity, presence, joints, voice, member, name) in avatars.iter_mut() {
        let in_zone = presence.position.distance(center) <= config.search_range;
        let Some(mut member) = member else {
            if in_zone {
                // Регистрация: позиции ладоней затравливаем текущими,
                // чтобы первый апдейт не дал ложный palm-speed спайк
                commands.entity(entity).insert(AudienceMember {
                    last_position: presence.position,
                    palm_positions: [joints.left_palm, joints.right_palm],
                    ..Default::default()
                });
                log(&format!(
                    "👁 LOOKAT: {} entered attention zone",
                    label(entity, name)
                ));
            }
            continue;
        };
        if !in_zone {
            commands.entity(entity).remove::<AudienceMember>();
            log(&format!(
                "👁 LOOKAT: {} left attention zone",
                label(entity, name)
            ));
            continue;
        }

        members.push(entity);

        // Сдвиг (шаг/телепорт) или ненулевая velocity инвалидируют sightline
        if member.last_position.distance(presence.position) > 0.0
            || presence.velocity.length() > 0.0
        {
            member.moved = true;
        }
        member.last_position = presence.position;
        member.distance = local_presence.position.distance(presence.position);

        // За перекрытым аватаром речь/жесты не трекаем
        if !member.engaged {
            continue;
        }

        let quantized = if voice.loudness > config.loudness_quantize_threshold {
            100.0
        } else {
            0.0
        };
        member.smoothed_loudness += config.loudness_tau * (quantized - member.smoothed_loudness);

        let attenuation = if member.distance > 1.0 {
            1.0 / member.distance
        } else {
            1.0
        };
        let palms = [joints.left_palm, joints.right_palm];
        for side in 0..2 {
            member.palm_speeds[side] =
                attenuation * member.palm_positions[side].distance(palms[side]) / dt;
            member.palm_positions[side] = palms[side];
        }

        member.talking = false;
        if member.smoothed_loudness > config.talking_loudness_threshold {
            if member.talking_time < config.max_talking_time {
                member.talking_time += dt;
            }
            member.talking = true;
            talking_count += 1;
            if max_loudness < member.smoothed_loudness {
                max_loudness = member.smoothed_loudness;
                talker = Some(entity);
            }
        } else if member.talking_time > 0.0 {
            member.talking_time =
                (member.talking_time - config.silence_attenuation * dt).max(0.0);
        }
        if !member.talking && member.talking_time > 0.0 {
            previous_talkers.push(entity);
        }

        let waving = member
            .palm_speeds
            .iter()
            .any(|speed| *speed > config.attention_palm_speed);
        if waving && entity != local_entity {
            if !member.talking {
                fast_hands.push(entity);
            } else if palms[0].y.max(palms[1].y) > joints.neck.y {
                // Говорящий с поднятой рукой тоже перехватывает внимание
                fast_hands.push(entity);
            }
        }
    }

    // Стабильный порядок независимо от раскладки архетипов
    members.sort_unstable_by_key(|entity| entity.index());
    previous_talkers.sort_unstable_by_key(|entity| entity.index());
    fast_hands.sort_unstable_by_key(|entity| entity.index());

    frame.members = members;
    frame.talker = talker;
    frame.talking_count = talking_count;
    frame.previous_talkers = previous_talkers;
    frame.fast_hands = fast_hands;
}

/// Round-robin line-of-sight проверки через host raycast
///
/// Одна probe на тик и только для аватаров со сдвигом — host не
/// заваливается лучами. Без ответов engaged-флаги просто стареют.
pub fn update_sightlines(
    local: Query<(Entity, &AvatarJoints), With<LocalAvatar>>,
    frame: Res<SceneFrame>,
    mut members: Query<(&AvatarJoints, &mut AudienceMember)>,
    mut tracker: ResMut<SightlineTracker>,
    mut probes: EventWriter<SightlineProbe>,
    mut reports: EventReader<SightlineReport>,
) {
    for report in reports.read() {
        let Some(entity) = tracker.pending.remove(&report.probe) else {
            continue;
        };
        if let Ok((_, mut member)) = members.get_mut(entity) {
            if member.engaged == report.blocked {
                log(&format!(
                    "👁 LOOKAT: sightline to {:?} {}",
                    entity,
                    if report.blocked { "blocked" } else { "clear" }
                ));
            }
            member.engaged = !report.blocked;
        }
    }

    let Ok((local_entity, local_joints)) = local.single() else {
        return;
    };
    if frame.members.is_empty() {
        return;
    }

    // Наш собственный сдвиг меняет геометрию всех лучей разом
    let local_moved = members
        .get(local_entity)
        .map(|(_, member)| member.moved)
        .unwrap_or(false);
    if local_moved {
        for (_, mut member) in members.iter_mut() {
            member.moved = true;
        }
        if let Ok((_, mut member)) = members.get_mut(local_entity) {
            member.moved = false;
        }
    }

    tracker.cursor = if tracker.cursor + 1 >= frame.members.len() {
        0
    } else {
        tracker.cursor + 1
    };
    let target = frame.members[tracker.cursor];
    if target == local_entity {
        return;
    }
    let Ok((joints, mut member)) = members.get_mut(target) else {
        return;
    };
    if !member.moved {
        return;
    }
    member.moved = false;

    tracker.next_probe += 1;
    let probe = tracker.next_probe;
    // Повторная probe того же аватара заменяет неотвеченную
    tracker.pending.retain(|_, pending| *pending != target);
    tracker.pending.insert(probe, target);
    probes.write(SightlineProbe {
        probe,
        origin: local_joints.eyes_center,
        target: joints.head,
    });
}

fn label(entity: Entity, name: Option<&DisplayName>) -> String {
    match name {
        Some(DisplayName(name)) => name.clone(),
        None => format!("{:?}", entity),
    }
}
