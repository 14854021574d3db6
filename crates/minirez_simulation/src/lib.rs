//! MINIREZ Simulation Core
//!
//! ECS-симуляция на Bevy 0.16 (strategic layer)
//!
//! HYBRID ARCHITECTURE:
//! - ECS = strategic layer (panel FSM, gaze/attention decisions, input conditioning)
//! - Host engine = tactical layer (rendering, overlays, controllers, audio, raycasts)
//!
//! Host engine общается через host::* (RigInput + events → commands).
//! Сам crate headless: никакого рендера, только решения.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

// Публичные модули
pub mod components;
pub mod host;
pub mod lookat;
pub mod rezzer;
pub mod tween;

// Re-export базовых типов для удобства
pub use components::*;
pub use host::{
    AudioCommand, AudioMutedEvent, AvatarClickedEvent, CameraLookEvent, GrabAction, HostGrabEvent,
    HostPlugin, LookAtCommand, OverlayCommand, OverlayId, OverlayIdAllocator, OverlayParent,
    OverlayPatch, OverlaySpec, PanelUiCommand, PanelUiEvent, PrivacyShieldEvent, SightlineProbe,
    SightlineReport, SoundCue, TabletCommand, ToggleCommand, UiButton,
};
pub use lookat::{LookAtConfig, LookAtPlugin, LookState};
pub use rezzer::{PanelTransition, RezzerConfig, RezzerPlugin, RezzerState, RezzerStateKind};

/// Тик симуляции: 20ms (50Hz). Все behaviour-системы живут в FixedUpdate.
pub const SIM_TICK: Duration = Duration::from_millis(20);

/// Порядок фаз внутри FixedUpdate
///
/// Intake → Rezzer → LookAt, чтобы behaviour-системы читали
/// нормализованный rig текущего тика, а не предыдущего.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimSet {
    /// Нормализация host input (hysteresis, scale clamp, gaze test)
    Intake,
    /// Panel FSM + overlay sync + UI relay
    Rezzer,
    /// Gaze/attention machine
    LookAt,
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 50Hz — decision tick 20ms
            .insert_resource(Time::<Fixed>::from_hz(50.0))
            .configure_sets(
                FixedUpdate,
                (SimSet::Intake, SimSet::Rezzer, SimSet::LookAt).chain(),
            )
            // Подсистемы (ECS strategic layer)
            .add_plugins((HostPlugin, RezzerPlugin, LookAtPlugin));

        // Не затираем seed, если embedding уже вставил свой (create_headless_app)
        if app.world().get_resource::<DeterministicRng>().is_none() {
            app.insert_resource(DeterministicRng::new(42));
        }
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время двигаем вручную ровно на SIM_TICK за app.update() — иначе
/// FixedUpdate зависит от wall clock и скриптованные прогоны не реплеятся.
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(SIM_TICK))
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(50.0)); // 1 fixed tick на update()

    app
}

/// Snapshot мира для сравнения детерминизма
/// (упрощённая версия: Debug-байты отсортированных компонентов)
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    // Собираем все компоненты в детерминированный формат
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    // Сериализуем в байты через Debug (простейший способ)
    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}

use once_cell::sync::Lazy;
use std::sync::Mutex;

// Потокобезопасный глобальный logger (без Arc, для static он не нужен)
static LOGGER: Lazy<Mutex<Option<Box<dyn LogPrinter>>>> =
    Lazy::new(|| Mutex::new(None));

pub static LOGGER_LEVEL: Lazy<Mutex<LogLevel>> = Lazy::new(|| Mutex::new(LogLevel::Debug));

pub fn set_logger(logger: Box<dyn LogPrinter>) {
    *LOGGER.lock().unwrap() = Some(logger);
}

pub fn set_log_level(level: LogLevel) {
    *LOGGER_LEVEL.lock().unwrap() = level;
}

pub fn set_logger_if_needed(logger: Box<dyn LogPrinter>) {
    if LOGGER.lock().unwrap().is_none() {
        set_logger(logger);
    }
}

pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl PartialOrd for LogLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogLevel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_int().cmp(&other.as_int())
    }
}

impl PartialEq for LogLevel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for LogLevel {}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn as_int(&self) -> i32 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
        }
    }
}

pub trait LogPrinter: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

pub fn log(message: &str) {
    log_with_level(LogLevel::Debug, message);
}

pub fn log_info(message: &str) {
    log_with_level(LogLevel::Info, message);
}

pub fn log_warning(message: &str) {
    log_with_level(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log_with_level(LogLevel::Error, message);
}

pub fn log_with_level(level: LogLevel, message: &str) {
    // Фильтр по уровню, затем лочим mutex и отдаём printer'у
    // (timestamp добавляем здесь, не в host printer)
    if level < *LOGGER_LEVEL.lock().unwrap() {
        return;
    }
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        logger.log(level, &format!("[{}] {}", timestamp, message));
    }
}

struct ConsoleLogger;

impl LogPrinter for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str) {
        println!("[{}] {}", level.as_str(), message);
    }
}

pub fn init_logger() {
    set_logger_if_needed(Box::new(ConsoleLogger));
}
