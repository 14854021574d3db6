//! Rig input: сырые сэмплы от host engine + нормализованный RigState
//!
//! Host engine перезаписывает RigInput перед каждым тиком (poll model,
//! не events: controller/camera — непрерывные сигналы). Система
//! update_rig_state превращает сырые значения в то, что читают
//! behaviour-машины: гистерезисные защёлки trigger/grip, clamp масштаба
//! аватара, двойной конусный тест "рука ↔ камера".

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Рука (индексация сэмплов, панели, защёлок)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize,
)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn index(self) -> usize {
        match self {
            Hand::Left => 0,
            Hand::Right => 1,
        }
    }

    pub fn other(self) -> Hand {
        match self {
            Hand::Left => Hand::Right,
            Hand::Right => Hand::Left,
        }
    }

    /// Joint name руки в скелете аватара ("LeftHand"/"RightHand")
    pub fn joint_name(self) -> &'static str {
        match self {
            Hand::Left => "LeftHand",
            Hand::Right => "RightHand",
        }
    }

    /// Обратное отображение из grab-сообщений host engine
    pub fn from_joint_name(name: &str) -> Option<Hand> {
        match name {
            "LeftHand" => Some(Hand::Left),
            "RightHand" => Some(Hand::Right),
            _ => None,
        }
    }

    /// Joint для парентинга панели: controller-джойнты точнее скелетных,
    /// в third person нужны camera-relative варианты.
    pub fn attachment_joint(self, mode: CameraMode) -> &'static str {
        match (self, mode) {
            (Hand::Left, CameraMode::FirstPerson) => "_CONTROLLER_LEFTHAND",
            (Hand::Left, CameraMode::ThirdPerson) => "_CAMERA_RELATIVE_CONTROLLER_LEFTHAND",
            (Hand::Left, _) => "LeftHand",
            (Hand::Right, CameraMode::FirstPerson) => "_CONTROLLER_RIGHTHAND",
            (Hand::Right, CameraMode::ThirdPerson) => "_CAMERA_RELATIVE_CONTROLLER_RIGHTHAND",
            (Hand::Right, _) => "RightHand",
        }
    }
}

/// Режим камеры хост-движка
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Reflect, Serialize, Deserialize,
)]
pub enum CameraMode {
    #[default]
    FirstPerson,
    ThirdPerson,
    Selfie,
    /// Независимая камера (cinematics) — look-at её не трогает
    Independent,
}

/// Сэмпл одной руки: joint в object frame аватара + аналоговые оси
#[derive(Debug, Clone, Copy, Reflect)]
pub struct HandSample {
    /// Controller pose валиден (контроллер в руке и трекается)
    pub pose_valid: bool,
    pub translation: Vec3,
    pub rotation: Quat,
    /// Trigger axis 0.0..=1.0
    pub trigger: f32,
    /// Grip axis 0.0..=1.0
    pub grip: f32,
}

impl Default for HandSample {
    fn default() -> Self {
        Self {
            pose_valid: false,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            trigger: 0.0,
            grip: 0.0,
        }
    }
}

/// Сэмпл камеры (world frame)
#[derive(Debug, Clone, Copy, Reflect)]
pub struct CameraSample {
    pub position: Vec3,
    pub orientation: Quat,
    pub mode: CameraMode,
}

impl Default for CameraSample {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            mode: CameraMode::FirstPerson,
        }
    }
}

impl CameraSample {
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }
}

/// Сэмпл локального аватара (world frame) + домен-ограничения масштаба
#[derive(Debug, Clone, Copy, Reflect)]
pub struct AvatarSample {
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    pub scale: f32,
    pub domain_min_scale: f32,
    pub domain_max_scale: f32,
}

impl Default for AvatarSample {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            scale: 1.0,
            domain_min_scale: 0.005,
            domain_max_scale: 1000.0,
        }
    }
}

/// Сырой input от host engine — перезаписывается каждый тик
#[derive(Resource, Debug, Clone, Default)]
pub struct RigInput {
    /// HMD надет и активен (false = desktop mode)
    pub hmd_active: bool,
    /// Host уже показывает полный tablet
    pub tablet_shown: bool,
    /// Tablet пришвартован к toolbar — панель не нужна
    pub toolbar_mode: bool,
    pub avatar: AvatarSample,
    pub camera: CameraSample,
    pub hands: [HandSample; 2],
}

impl RigInput {
    pub fn hand(&self, hand: Hand) -> &HandSample {
        &self.hands[hand.index()]
    }

    pub fn hand_mut(&mut self, hand: Hand) -> &mut HandSample {
        &mut self.hands[hand.index()]
    }
}

/// Гистерезис squeeze-защёлки: ON выше 0.15, OFF ниже 0.10.
/// Значения между порогами защёлку не трогают (контроллеры шумят).
pub const SQUEEZE_ON_VALUE: f32 = 0.15;
pub const SQUEEZE_OFF_VALUE: f32 = 0.10;

/// Защёлка trigger/grip одной руки
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct SqueezeSense {
    pub trigger_on: bool,
    pub grip_on: bool,
}

impl SqueezeSense {
    pub fn update(&mut self, trigger: f32, grip: f32) {
        self.trigger_on = latch(self.trigger_on, trigger);
        self.grip_on = latch(self.grip_on, grip);
    }

    /// Рука чем-то занята (гистерезисное состояние, не сырые оси)
    pub fn squeezed(&self) -> bool {
        self.trigger_on || self.grip_on
    }
}

fn latch(current: bool, value: f32) -> bool {
    if current {
        value >= SQUEEZE_OFF_VALUE
    } else {
        value > SQUEEZE_ON_VALUE
    }
}

/// Минимальный угол рука↔камера для показа панели (degrees)
pub const MIN_HAND_CAMERA_ANGLE: f32 = 30.0;

/// Нормализованный rig — то, что читают behaviour-системы
#[derive(Resource, Debug, Clone)]
pub struct RigState {
    /// avatar.scale после clamp в домен-границы
    pub effective_scale: f32,
    pub squeeze: [SqueezeSense; 2],
    /// Двойной конусный тест пройден (ладонь к камере, камера на руку)
    pub hand_facing_camera: [bool; 2],
}

impl Default for RigState {
    fn default() -> Self {
        Self {
            effective_scale: 1.0,
            squeeze: [SqueezeSense::default(); 2],
            hand_facing_camera: [false; 2],
        }
    }
}

impl RigState {
    pub fn squeeze(&self, hand: Hand) -> &SqueezeSense {
        &self.squeeze[hand.index()]
    }

    pub fn facing_camera(&self, hand: Hand) -> bool {
        self.hand_facing_camera[hand.index()]
    }
}

/// Система: RigInput → RigState (каждый тик, до behaviour-машин)
pub fn update_rig_state(input: Res<RigInput>, mut state: ResMut<RigState>) {
    state.effective_scale = input
        .avatar
        .scale
        .clamp(input.avatar.domain_min_scale, input.avatar.domain_max_scale);

    for hand in Hand::BOTH {
        let sample = input.hand(hand);
        state.squeeze[hand.index()].update(sample.trigger, sample.grip);
        state.hand_facing_camera[hand.index()] =
            hand_facing_camera(&input.avatar, &input.camera, sample);
    }
}

/// Двойной конусный тест: ладонь ориентирована к камере И камера смотрит
/// на руку, обе — в конусе MIN_HAND_CAMERA_ANGLE.
pub fn hand_facing_camera(avatar: &AvatarSample, camera: &CameraSample, hand: &HandSample) -> bool {
    if !hand.pose_valid {
        return false;
    }

    let min_cos = MIN_HAND_CAMERA_ANGLE.to_radians().cos();

    // Joint переводим из object frame аватара в world
    let hand_position = avatar.position + avatar.orientation * hand.translation;
    let hand_orientation = avatar.orientation * hand.rotation;
    let camera_to_hand = (hand_position - camera.position).normalize_or_zero();
    if camera_to_hand == Vec3::ZERO {
        return false;
    }

    camera_to_hand.dot(hand_orientation * Vec3::NEG_Z) > min_cos
        && camera_to_hand.dot(camera.forward()) > min_cos
}
