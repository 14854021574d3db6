//! Общие компоненты симуляции (avatar presence, rig input)

pub mod avatar;
pub mod rig;


pub use avatar::{AvatarJoints, AvatarPresence, AvatarVoice, DisplayName, LocalAvatar, RemoteAvatar};
pub use rig::{
    update_rig_state, AvatarSample, CameraMode, CameraSample, Hand, HandSample, RigInput, RigState,
    SqueezeSense, MIN_HAND_CAMERA_ANGLE, SQUEEZE_OFF_VALUE, SQUEEZE_ON_VALUE,
};
