//! Скриптованный сценарий: канированная сессия вместо живого rig'а
//!
//! Каждый тик applied-шаги пишут RigInput/события ровно так, как это
//! делал бы host engine. Вторая половина — эмуляция реакций host'а:
//! показ tablet'а после hand-off и ответы на sightline-пробы.

use bevy::prelude::*;

use minirez_simulation::{
    AvatarClickedEvent, AvatarJoints, AvatarPresence, AvatarVoice, Hand, LocalAvatar, PanelUiEvent,
    RemoteAvatar, RigInput, SightlineProbe, SightlineReport, SimSet, TabletCommand,
};

pub struct ScenarioPlugin;

impl Plugin for ScenarioPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(demo_scenario())
            .add_systems(Startup, spawn_cast)
            .add_systems(FixedUpdate, apply_scenario.before(SimSet::Intake))
            .add_systems(
                FixedUpdate,
                (host_show_tablet, host_answer_probes).after(SimSet::LookAt),
            );
    }
}

/// Шаг сценария: на каком тике что сделать
#[derive(Debug, Clone)]
pub struct ScenarioStep {
    pub tick: u64,
    pub action: ScenarioAction,
}

#[derive(Debug, Clone)]
pub enum ScenarioAction {
    WearHmd,
    RaiseHand(Hand),
    LowerHand(Hand),
    /// Кнопка Expand на web-экранчике панели
    ClickExpand,
    /// Host убирает полный tablet
    DismissTablet,
    /// Голос remote-аватара (индекс в DemoCast)
    Say { avatar: usize, loudness: f32 },
    /// Клик по remote-аватару (click-to-look)
    ClickAvatar { avatar: usize },
}

#[derive(Resource)]
pub struct Scenario {
    steps: Vec<ScenarioStep>,
    cursor: usize,
}

/// Entities канированной сцены: локальный аватар + два собеседника
#[derive(Resource)]
pub struct DemoCast {
    pub remotes: Vec<Entity>,
}

/// Демо-сессия: показ → мигание глушится debounce'ом → смена руки →
/// expand в tablet → возврат → разговор двух remote'ов → click-to-look
fn demo_scenario() -> Scenario {
    use ScenarioAction::*;

    let steps = vec![
        ScenarioStep { tick: 5, action: WearHmd },
        // Панель появляется на левой руке
        ScenarioStep { tick: 60, action: RaiseHand(Hand::Left) },
        // Рука опустилась и вернулась внутри debounce-окна: панель не мигает
        ScenarioStep { tick: 90, action: LowerHand(Hand::Left) },
        ScenarioStep { tick: 110, action: RaiseHand(Hand::Left) },
        // Теперь прячем по-настоящему и зовём на правой
        ScenarioStep { tick: 160, action: LowerHand(Hand::Left) },
        ScenarioStep { tick: 200, action: RaiseHand(Hand::Right) },
        // Expand с web-экранчика → hand-off в полный tablet
        ScenarioStep { tick: 320, action: ClickExpand },
        ScenarioStep { tick: 400, action: DismissTablet },
        // Разговор: A говорит, клик на B, затем B подхватывает
        ScenarioStep { tick: 450, action: Say { avatar: 0, loudness: 80.0 } },
        ScenarioStep { tick: 650, action: ClickAvatar { avatar: 1 } },
        ScenarioStep { tick: 700, action: Say { avatar: 0, loudness: 0.0 } },
        ScenarioStep { tick: 700, action: Say { avatar: 1, loudness: 80.0 } },
    ];

    Scenario { steps, cursor: 0 }
}

fn spawn_cast(mut commands: Commands) {
    commands.spawn((
        LocalAvatar,
        AvatarPresence::default(),
        joints_at(Vec3::ZERO),
        AvatarVoice::default(),
    ));

    let mut remotes = Vec::new();
    for position in [Vec3::new(-1.5, 0.0, -3.5), Vec3::new(1.5, 0.0, -3.5)] {
        let remote = commands
            .spawn((
                RemoteAvatar,
                AvatarPresence {
                    position,
                    // Лицом к локальному аватару в origin
                    orientation: Quat::from_rotation_y(std::f32::consts::PI),
                    velocity: Vec3::ZERO,
                },
                joints_at(position),
                AvatarVoice::default(),
            ))
            .id();
        remotes.push(remote);
    }

    commands.insert_resource(DemoCast { remotes });
    minirez_simulation::log_info("SCENARIO: cast spawned (local + 2 remotes)");
}

#[allow(clippy::too_many_arguments)]
fn apply_scenario(
    mut scenario: ResMut<Scenario>,
    mut tick: Local<u64>,
    cast: Res<DemoCast>,
    mut input: ResMut<RigInput>,
    mut voices: Query<&mut AvatarVoice>,
    mut panel_ui: EventWriter<PanelUiEvent>,
    mut avatar_clicks: EventWriter<AvatarClickedEvent>,
) {
    while scenario.cursor < scenario.steps.len() && scenario.steps[scenario.cursor].tick == *tick {
        let step = scenario.steps[scenario.cursor].clone();
        scenario.cursor += 1;
        minirez_simulation::log_info(&format!("SCENARIO [{}]: {:?}", step.tick, step.action));

        match step.action {
            ScenarioAction::WearHmd => {
                input.hmd_active = true;
                input.camera.position = Vec3::new(0.0, 1.7, 0.0);
                input.camera.orientation = Quat::IDENTITY;
            }
            ScenarioAction::RaiseHand(hand) => raise_hand(&mut input, hand),
            ScenarioAction::LowerHand(hand) => {
                input.hand_mut(hand).pose_valid = false;
            }
            ScenarioAction::ClickExpand => {
                panel_ui.write(PanelUiEvent::ExpandClicked);
            }
            ScenarioAction::DismissTablet => {
                input.tablet_shown = false;
            }
            ScenarioAction::Say { avatar, loudness } => {
                if let Some(&entity) = cast.remotes.get(avatar) {
                    if let Ok(mut voice) = voices.get_mut(entity) {
                        voice.loudness = loudness;
                    }
                }
            }
            ScenarioAction::ClickAvatar { avatar } => {
                if let Some(&target) = cast.remotes.get(avatar) {
                    avatar_clicks.write(AvatarClickedEvent { target });
                }
            }
        }
    }
    *tick += 1;
}

/// Host-реакция: после hand-off'а полный tablet считается показанным
fn host_show_tablet(mut tablets: EventReader<TabletCommand>, mut input: ResMut<RigInput>) {
    if tablets.read().count() > 0 {
        input.tablet_shown = true;
    }
}

/// Host-реакция: сцена пустая, все лучи проходят
fn host_answer_probes(
    mut probes: EventReader<SightlineProbe>,
    mut reports: EventWriter<SightlineReport>,
) {
    for probe in probes.read() {
        reports.write(SightlineReport {
            probe: probe.probe,
            blocked: false,
        });
    }
}

fn raise_hand(input: &mut RigInput, hand: Hand) {
    let camera_position = input.camera.position;
    let hand_world = Vec3::new(0.0, 1.6, -0.8);
    let to_hand = (hand_world - camera_position).normalize();

    let sample = input.hand_mut(hand);
    sample.pose_valid = true;
    sample.translation = hand_world;
    sample.rotation = Quat::from_rotation_arc(Vec3::NEG_Z, to_hand);
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
