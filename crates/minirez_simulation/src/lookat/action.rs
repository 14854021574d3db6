//! Look actions: таблицы поведения взгляда + чистые хелперы
//!
//! Действие = "смотреть на такую-то точку фокус-аватара столько-то секунд
//! с такой-то скоростью головы и случайным смещением". Все распределения
//! (время, смещения, выбор точки лица) заданы таблицами per-режим.

use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::components::avatar::AvatarJoints;

/// Куда на аватаре смотрим в рамках действия
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetMode {
    /// Фокуса нет, взгляд остаётся где был
    #[default]
    NoTarget,
    LeftEye,
    RightEye,
    Mouth,
    LeftHand,
    RightHand,
    /// Беглый взгляд: голова цели + крупное смещение
    Random,
}

/// Что смещаем от точки цели
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetMode {
    #[default]
    NoOffset,
    HeadOnly,
    EyesOnly,
    HeadAndEyes,
}

/// Распределения одного TargetMode
#[derive(Debug, Clone)]
pub struct ActionProfile {
    /// Длительность stare, секунды (min, max)
    pub stare: (f32, f32),
    /// Шансы offset-режимов
    pub offsets: [(OffsetMode, f32); 4],
    /// Угол смещения, градусы (min, max)
    pub offset_angle: (f32, f32),
}

static MOUTH_PROFILE: ActionProfile = ActionProfile {
    stare: (0.2, 2.0),
    offsets: [
        (OffsetMode::NoOffset, 0.7),
        (OffsetMode::HeadOnly, 0.3),
        (OffsetMode::EyesOnly, 0.0),
        (OffsetMode::HeadAndEyes, 0.0),
    ],
    offset_angle: (1.0, 5.0),
};

static EYE_PROFILE: ActionProfile = ActionProfile {
    stare: (0.2, 2.0),
    offsets: [
        (OffsetMode::NoOffset, 0.5),
        (OffsetMode::HeadOnly, 0.3),
        (OffsetMode::EyesOnly, 0.1),
        (OffsetMode::HeadAndEyes, 0.1),
    ],
    offset_angle: (1.0, 5.0),
};

static HAND_PROFILE: ActionProfile = ActionProfile {
    stare: (0.2, 2.0),
    offsets: [
        (OffsetMode::NoOffset, 0.9),
        (OffsetMode::HeadOnly, 0.1),
        (OffsetMode::EyesOnly, 0.0),
        (OffsetMode::HeadAndEyes, 0.0),
    ],
    offset_angle: (1.0, 10.0),
};

static GLANCE_PROFILE: ActionProfile = ActionProfile {
    stare: (0.2, 1.0),
    offsets: [
        (OffsetMode::NoOffset, 0.0),
        (OffsetMode::HeadOnly, 0.0),
        (OffsetMode::EyesOnly, 0.4),
        (OffsetMode::HeadAndEyes, 0.6),
    ],
    offset_angle: (5.0, 12.0),
};

static IDLE_PROFILE: ActionProfile = ActionProfile {
    stare: (0.1, 2.0),
    offsets: [
        (OffsetMode::NoOffset, 0.5),
        (OffsetMode::HeadOnly, 0.0),
        (OffsetMode::EyesOnly, 0.5),
        (OffsetMode::HeadAndEyes, 0.0),
    ],
    offset_angle: (1.0, 15.0),
};

pub fn action_profile(mode: TargetMode) -> &'static ActionProfile {
    match mode {
        TargetMode::Mouth => &MOUTH_PROFILE,
        TargetMode::LeftEye | TargetMode::RightEye => &EYE_PROFILE,
        TargetMode::LeftHand | TargetMode::RightHand => &HAND_PROFILE,
        TargetMode::Random => &GLANCE_PROFILE,
        TargetMode::NoTarget => &IDLE_PROFILE,
    }
}

/// Точка сустава цели для режима (None = режим без цели)
pub fn joint_point(mode: TargetMode, joints: &AvatarJoints) -> Option<Vec3> {
    match mode {
        TargetMode::NoTarget => None,
        TargetMode::LeftEye => Some(joints.left_eye),
        TargetMode::RightEye => Some(joints.right_eye),
        TargetMode::Mouth => Some(joints.mouth),
        TargetMode::LeftHand => Some(joints.left_palm),
        TargetMode::RightHand => Some(joints.right_palm),
        TargetMode::Random => Some(joints.head),
    }
}

/// Текущее действие взгляда
#[derive(Debug, Clone)]
pub struct LookAction {
    pub target: Option<Entity>,
    pub mode: TargetMode,
    /// Мировая точка взгляда (освежается по суставу цели)
    pub target_point: Vec3,
    pub elapse_time: f32,
    pub total_time: f32,
    /// Смещение от точки цели (применяется по offset_* флагам)
    pub offset: Vec3,
    pub offset_eyes: bool,
    pub offset_head: bool,
    /// Comfort-доворот головы к корпусу, градусы со знаком
    pub comfort_angle: f32,
    /// Mix-alpha головы (без timescale)
    pub speed: f32,
}

impl Default for LookAction {
    fn default() -> Self {
        Self {
            target: None,
            mode: TargetMode::NoTarget,
            target_point: Vec3::ZERO,
            elapse_time: 0.0,
            total_time: 1.0,
            offset: Vec3::ZERO,
            offset_eyes: false,
            offset_head: false,
            comfort_angle: 0.0,
            speed: 0.04,
        }
    }
}

/// Выбор точки лица: говорящему в лицо смотрим равновероятно,
/// слушателю — чаще в глаза, чем в рот
pub fn roll_face_mode(talking: bool, rng: &mut ChaCha8Rng) -> TargetMode {
    if talking {
        let modes = [TargetMode::Mouth, TargetMode::RightEye, TargetMode::LeftEye];
        modes[rng.gen_range(0..modes.len())]
    } else {
        roll_weighted(
            &[
                (TargetMode::Mouth, 0.2),
                (TargetMode::RightEye, 0.4),
                (TargetMode::LeftEye, 0.4),
            ],
            rng,
        )
    }
}

/// Взвешенный roll по таблице шансов (нормализуется на сумму)
pub fn roll_weighted<T: Copy>(options: &[(T, f32)], rng: &mut ChaCha8Rng) -> T {
    let total: f32 = options.iter().map(|(_, chance)| chance).sum();
    let dice = rng.gen::<f32>() * total;
    let mut floor = 0.0;
    for &(value, chance) in options {
        if dice < floor + chance {
            return value;
        }
        floor += chance;
    }
    options[options.len() - 1].0
}

/// Равномерный roll в диапазоне (min, max)
pub fn roll_range(range: (f32, f32), rng: &mut ChaCha8Rng) -> f32 {
    range.0 + rng.gen::<f32>() * (range.1 - range.0)
}

/// Случайная перестановка индексов 0..count (draw without replacement)
pub fn random_permutation(count: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..count).collect();
    let mut order = Vec::with_capacity(count);
    while !pool.is_empty() {
        let index = if pool.len() > 1 {
            rng.gen_range(0..pool.len())
        } else {
            0
        };
        order.push(pool.remove(index));
    }
    order
}

/// Снимок кандидата для выбора аудитории
#[derive(Debug, Clone)]
pub struct AudienceView {
    pub entity: Entity,
    pub position: Vec3,
    pub forward: Vec3,
    pub engaged: bool,
    pub distance: f32,
}

/// Случайный выбор собеседника из пула
///
/// Скан в случайном порядке: первый engaged кандидат ближе audience_range
/// со взаимным взглядом (он лицом к нам, мы лицом к нему) побеждает.
/// Fallback — первый близкий, затем первый любой.
pub fn pick_audience(
    pool: &[AudienceView],
    local: Entity,
    local_position: Vec3,
    local_forward: Vec3,
    audience_range: f32,
    rng: &mut ChaCha8Rng,
) -> Option<Entity> {
    if pool.len() == 1 {
        let view = &pool[0];
        return (view.entity != local && view.engaged).then_some(view.entity);
    }
    if pool.is_empty() {
        return None;
    }

    let mut first_any = None;
    let mut first_near = None;
    for index in random_permutation(pool.len(), rng) {
        let view = &pool[index];
        if view.entity == local || !view.engaged {
            continue;
        }
        first_any.get_or_insert(view.entity);
        if view.distance < audience_range {
            first_near.get_or_insert(view.entity);
            let other_to_me = (local_position - view.position).normalize_or_zero();
            if view.forward.dot(other_to_me) > 0.0 && local_forward.dot(other_to_me) < 0.0 {
                return Some(view.entity);
            }
        }
    }
    first_near.or(first_any)
}

/// Comfort-угол: чем дальше цель от оси корпуса, тем сильнее голова
/// доворачивается к ней (максимум max_offset_degrees на 90°).
/// Знак — в сторону правой оси аватара.
pub fn head_comfort_angle(
    eyes: Vec3,
    forward: Vec3,
    right: Vec3,
    point: Vec3,
    max_offset_degrees: f32,
) -> f32 {
    let eyes_to_point = point - eyes;
    if eyes_to_point.length_squared() < 1e-8 {
        return 0.0;
    }
    let angle = eyes_to_point.angle_between(forward).to_degrees().min(90.0);
    let sign = if eyes_to_point.dot(right) > 0.0 { 1.0 } else { -1.0 };
    sign * (max_offset_degrees / 90.0) * angle
}

/// Поворот точки взгляда вокруг оси up на angle градусов (вокруг глаз)
pub fn rotate_look_point(eyes: Vec3, up: Vec3, point: Vec3, angle_degrees: f32) -> Vec3 {
    let rotation = Quat::from_axis_angle(up, angle_degrees.to_radians());
    eyes + rotation * (point - eyes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn roll_weighted_respects_zero_chances() {
        let mut dice = rng(7);
        for _ in 0..100 {
            let value = roll_weighted(&[("a", 0.0), ("b", 1.0)], &mut dice);
            assert_eq!(value, "b", "нулевой шанс не должен выпадать");
        }
    }

    #[test]
    fn roll_weighted_single_option_always_wins() {
        let mut dice = rng(8);
        for _ in 0..10 {
            assert_eq!(roll_weighted(&[(42, 0.3)], &mut dice), 42);
        }
    }

    #[test]
    fn random_permutation_covers_all_indexes() {
        let mut dice = rng(9);
        let mut order = random_permutation(10, &mut dice);
        order.sort_unstable();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn pick_audience_prefers_mutual_facing() {
        let mut world = bevy::ecs::world::World::new();
        let local = world.spawn_empty().id();
        let facing = world.spawn_empty().id();
        let away = world.spawn_empty().id();

        let pool = [
            AudienceView {
                entity: local,
                position: Vec3::ZERO,
                forward: Vec3::NEG_Z,
                engaged: true,
                distance: 0.0,
            },
            AudienceView {
                entity: away,
                position: Vec3::new(0.0, 0.0, -2.0),
                forward: Vec3::NEG_Z, // спиной к нам
                engaged: true,
                distance: 2.0,
            },
            AudienceView {
                entity: facing,
                position: Vec3::new(1.0, 0.0, -2.0),
                forward: Vec3::Z, // лицом к нам
                engaged: true,
                distance: 2.2,
            },
        ];

        // Взаимный кандидат один — порядок скана не важен
        for seed in 0..20 {
            let mut dice = rng(seed);
            let picked = pick_audience(&pool, local, Vec3::ZERO, Vec3::NEG_Z, 8.0, &mut dice);
            assert_eq!(picked, Some(facing));
        }
    }

    #[test]
    fn pick_audience_falls_back_to_near_candidate() {
        let mut world = bevy::ecs::world::World::new();
        let local = world.spawn_empty().id();
        let near_away = world.spawn_empty().id();
        let far = world.spawn_empty().id();

        let pool = [
            AudienceView {
                entity: local,
                position: Vec3::ZERO,
                forward: Vec3::NEG_Z,
                engaged: true,
                distance: 0.0,
            },
            AudienceView {
                entity: far,
                position: Vec3::new(0.0, 0.0, -12.0),
                forward: Vec3::Z,
                engaged: true,
                distance: 12.0,
            },
            AudienceView {
                entity: near_away,
                position: Vec3::new(0.0, 0.0, -3.0),
                forward: Vec3::NEG_Z,
                engaged: true,
                distance: 3.0,
            },
        ];

        let mut dice = rng(3);
        let picked = pick_audience(&pool, local, Vec3::ZERO, Vec3::NEG_Z, 8.0, &mut dice);
        assert_eq!(picked, Some(near_away), "близкий кандидат бьёт далёкого");
    }

    #[test]
    fn pick_audience_single_skips_self_and_disengaged() {
        let mut world = bevy::ecs::world::World::new();
        let local = world.spawn_empty().id();
        let other = world.spawn_empty().id();

        let self_only = [AudienceView {
            entity: local,
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            engaged: true,
            distance: 0.0,
        }];
        let mut dice = rng(4);
        assert_eq!(
            pick_audience(&self_only, local, Vec3::ZERO, Vec3::NEG_Z, 8.0, &mut dice),
            None
        );

        let occluded = [AudienceView {
            entity: other,
            position: Vec3::new(0.0, 0.0, -2.0),
            forward: Vec3::Z,
            engaged: false,
            distance: 2.0,
        }];
        assert_eq!(
            pick_audience(&occluded, local, Vec3::ZERO, Vec3::NEG_Z, 8.0, &mut dice),
            None
        );
    }

    #[test]
    fn comfort_angle_sign_follows_right_axis() {
        let eyes = Vec3::new(0.0, 1.6, 0.0);
        // Цель строго справа: угол 90° → полный offset +20
        let right_angle = head_comfort_angle(
            eyes,
            Vec3::NEG_Z,
            Vec3::X,
            Vec3::new(5.0, 1.6, 0.0),
            20.0,
        );
        assert!((right_angle - 20.0).abs() < 1e-3);

        // Слева под 45° → −10
        let left_angle = head_comfort_angle(
            eyes,
            Vec3::NEG_Z,
            Vec3::X,
            Vec3::new(-3.0, 1.6, -3.0),
            20.0,
        );
        assert!((left_angle + 10.0).abs() < 1e-3);

        // Прямо по курсу — без доворота
        let straight = head_comfort_angle(
            eyes,
            Vec3::NEG_Z,
            Vec3::X,
            Vec3::new(0.0, 1.6, -4.0),
            20.0,
        );
        assert!(straight.abs() < 1e-3);
    }

    #[test]
    fn comfort_angle_clamps_behind_target() {
        let eyes = Vec3::ZERO;
        // Цель сзади-справа: угол > 90° режется до 90° → ровно max
        let angle = head_comfort_angle(
            eyes,
            Vec3::NEG_Z,
            Vec3::X,
            Vec3::new(1.0, 0.0, 5.0),
            20.0,
        );
        assert!((angle - 20.0).abs() < 1e-3);
    }

    #[test]
    fn rotate_look_point_spins_around_up() {
        let rotated = rotate_look_point(Vec3::ZERO, Vec3::Y, Vec3::new(0.0, 0.0, -1.0), 90.0);
        assert!((rotated - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn profiles_cover_every_mode() {
        for mode in [
            TargetMode::NoTarget,
            TargetMode::LeftEye,
            TargetMode::RightEye,
            TargetMode::Mouth,
            TargetMode::LeftHand,
            TargetMode::RightHand,
            TargetMode::Random,
        ] {
            let profile = action_profile(mode);
            assert!(profile.stare.0 < profile.stare.1);
            let total: f32 = profile.offsets.iter().map(|(_, chance)| chance).sum();
            assert!((total - 1.0).abs() < 1e-6, "шансы {:?} не нормированы", mode);
        }
    }
}
