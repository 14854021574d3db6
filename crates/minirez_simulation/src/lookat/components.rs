//! Lookat components/resources: параметры, аудитория, состояние машин

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::lookat::action::LookAction;

/// Параметры gaze/attention машины
#[derive(Resource, Debug, Clone, Reflect, Serialize, Deserialize)]
#[reflect(Resource)]
pub struct LookAtConfig {
    /// Радиус поиска аватаров, метры
    pub search_range: f32,
    /// Центр поиска смещён вперёд на эту долю радиуса
    pub search_forward_bias: f32,
    /// Дальше этого собеседник не считается аудиторией, метры
    pub audience_range: f32,

    /// Порог quantize сырого loudness (выше → 100, иначе 0)
    pub loudness_quantize_threshold: f32,
    /// EMA-коэффициент сглаживания loudness (на тик)
    pub loudness_tau: f32,
    /// Сглаженный loudness выше — аватар говорит
    pub talking_loudness_threshold: f32,
    /// Потолок накопления talking_time, секунды
    pub max_talking_time: f32,
    /// Скорость распада talking_time в тишине (доля dt)
    pub silence_attenuation: f32,

    /// Скорость ладони (с учётом затухания по дистанции), привлекающая взгляд
    pub attention_palm_speed: f32,
    /// Скорость ладони фокус-аватара, переключающая взгляд на руку
    pub hand_trigger_speed: f32,

    /// Фокус слушателя: min + rand * range, секунды
    pub min_focus_listener: f32,
    pub focus_listener_range: f32,
    /// Фокус говорящего (скан аудитории): min + rand * range, секунды
    pub min_focus_talker: f32,
    pub focus_talker_range: f32,
    /// Жёсткий фокус по клику, секунды
    pub clicked_focus_time: f32,

    /// Шанс случайного взгляда, когда никто не говорит
    pub idle_focus_chance: f32,
    /// Шанс перефокусировки на нового говорящего
    pub refocus_on_new_talker_chance: f32,
    /// Шанс отвлечься от говорящего на прошлых говоривших
    pub switch_from_talker_chance: f32,
    /// Шанс сохранить фокус, когда говорят несколько
    pub keep_focus_on_several_chance: f32,
    /// Шанс гарантированного взгляда при пустом списке прошлых говоривших
    pub fallback_glance_chance: f32,
    /// Шанс оборвать текущее действие при взмахе руками
    pub abort_on_movement_chance: f32,

    /// Диапазон mix-alpha головы (рандомизируется на действие)
    pub min_head_mix_alpha: f32,
    pub max_head_mix_alpha: f32,
    /// Mix-alpha переходов camera-look / click-to-look
    pub camera_mix_alpha: f32,
    /// Максимум comfort-доворота головы, градусы
    pub comfort_max_degrees: f32,
    /// Alpha-константы подобраны под этот FPS; timescale = dt * fps
    pub normalize_fps: f32,

    /// Длительность camera-look, секунды
    pub camera_look_time: f32,
    /// Длительность click-to-look, секунды
    pub click_look_time: f32,
    /// Лимит шагов интерполяции перехода
    pub max_interpolation_steps: u32,
    /// dot(текущее, целевое) выше — интерполяция сошлась
    pub settle_tolerance: f32,

    /// Быстрее этой скорости аватара машина отпускает управление, м/с
    pub fast_speed_limit: f32,
}

impl Default for LookAtConfig {
    fn default() -> Self {
        Self {
            search_range: 15.0,
            search_forward_bias: 0.8,
            audience_range: 8.0,

            loudness_quantize_threshold: 30.0,
            loudness_tau: 0.01,
            talking_loudness_threshold: 50.0,
            max_talking_time: 5.0,
            silence_attenuation: 0.5,

            attention_palm_speed: 2.0,
            hand_trigger_speed: 0.2,

            min_focus_listener: 3.0,
            focus_listener_range: 5.0,
            min_focus_talker: 0.5,
            focus_talker_range: 1.5,
            clicked_focus_time: 10.0,

            idle_focus_chance: 0.1,
            refocus_on_new_talker_chance: 0.5,
            switch_from_talker_chance: 0.15,
            keep_focus_on_several_chance: 0.5,
            fallback_glance_chance: 0.2,
            abort_on_movement_chance: 0.3,

            min_head_mix_alpha: 0.04,
            max_head_mix_alpha: 0.08,
            camera_mix_alpha: 0.06,
            comfort_max_degrees: 20.0,
            normalize_fps: 60.0,

            camera_look_time: 5.0,
            click_look_time: 5.0,
            max_interpolation_steps: 100,
            settle_tolerance: 0.98,

            fast_speed_limit: 1.0,
        }
    }
}

/// Бухгалтерия внимания на одного аватара в зоне поиска
/// (вешается/снимается системой update_audience, локальный аватар включён)
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct AudienceMember {
    /// Sightline до головы чистый (по последней probe)
    pub engaged: bool,
    /// Геометрия изменилась с последней probe
    pub moved: bool,
    /// EMA quantized loudness
    pub smoothed_loudness: f32,
    pub talking: bool,
    /// Накопленное время разговора (распадается в тишине)
    pub talking_time: f32,
    pub last_position: Vec3,
    /// [left, right] мировые позиции ладоней прошлого тика
    pub palm_positions: [Vec3; 2],
    /// [left, right] скорости ладоней с затуханием по дистанции
    pub palm_speeds: [f32; 2],
    /// Дистанция до локального аватара
    pub distance: f32,
}

impl Default for AudienceMember {
    fn default() -> Self {
        Self {
            engaged: true,
            moved: true,
            smoothed_loudness: 0.0,
            talking: false,
            talking_time: 0.0,
            last_position: Vec3::ZERO,
            palm_positions: [Vec3::ZERO; 2],
            palm_speeds: [0.0; 2],
            distance: 0.0,
        }
    }
}

/// Снимок сцены текущего тика (пересобирается update_audience)
#[derive(Resource, Debug, Default)]
pub struct SceneFrame {
    /// Member-сущности, отсортированы по Entity index
    pub members: Vec<Entity>,
    /// Самый громкий говорящий
    pub talker: Option<Entity>,
    pub talking_count: u32,
    /// Замолчали, но talking_time ещё не распался
    pub previous_talkers: Vec<Entity>,
    /// Аватары с быстрыми ладонями (кандидаты на внимание)
    pub fast_hands: Vec<Entity>,
}

/// Кто говорит относительно нас и текущего фокуса
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TalkingState {
    #[default]
    Nobody,
    /// Мы начали говорить
    MeFirst,
    /// Мы продолжаем говорить
    MeAgain,
    /// Заговорил не тот, на ком фокус
    OtherFirst,
    /// Говорит тот, на ком уже фокус
    OtherAgain,
    /// Говорят несколько одновременно
    Several,
}

/// Куда направить следующий фокус
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    Nobody,
    Talker,
    RandomAudience,
    LastTalker,
    RandomLastTalker,
    LastFocus,
    /// Кликнутый аватар
    Selected,
    /// Аватар, махнувший руками
    Movement,
}

/// Вид жёсткой фиксации фокуса
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockFocusType {
    #[default]
    None,
    Click,
    Movement,
}

/// Состояние gaze-машины: кто в фокусе и какое действие играет
#[derive(Resource, Debug, Default)]
pub struct GazeMachine {
    /// Стартовое действие инициализировано текущим взглядом
    pub primed: bool,
    pub focus: Option<Entity>,
    /// Говоривший на момент последней смены фокуса
    pub current_talker: Option<Entity>,
    pub action: LookAction,

    pub focus_total_time: f32,
    pub focus_max: f32,
    pub locked_focus: Option<Entity>,
    pub lock_type: LockFocusType,

    pub talking_state: TalkingState,
    pub focus_state: FocusState,

    /// Выход машины для controller'а
    pub head_target: Vec3,
    pub eyes_target: Vec3,
    /// Mix-alpha головы на этот тик (уже с timescale, clamp 1.0)
    pub head_speed: f32,
}

/// Режим override-контроллера головы/глаз
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookState {
    #[default]
    AutomaticLook,
    /// Доворот к направлению камеры
    CameraLookActivating,
    /// Управление отдано движку (голова следует камере)
    CameraLookActive,
    /// Взгляд прибит к кликнутому аватару
    ClickToLookActive,
    /// Возврат от клика к автоматике
    ClickToLookDeactivating,
}

/// Состояние контроллера переопределений (клик и camera-look поверх автоматики)
#[derive(Resource, Debug, Default)]
pub struct LookController {
    pub state: LookState,
    /// Интерполированная точка взгляда головы
    /// (None = ещё не инициализирована, берём взгляд прямо вперёд)
    pub interpolated_head: Option<Vec3>,
    pub click_timer: f32,
    pub camera_timer: f32,
    /// Шаги текущей интерполяции (лимит рвёт зависшие переходы)
    pub steps: u32,
    pub click_target: Option<Entity>,
    /// Release уже отправлен (gating шлёт его один раз)
    pub released: bool,
}

/// Round-robin выдача sightline-проб
#[derive(Resource, Debug, Default)]
pub struct SightlineTracker {
    pub cursor: usize,
    pub next_probe: u32,
    /// probe id → member, которому предназначен ответ
    pub pending: HashMap<u32, Entity>,
}
