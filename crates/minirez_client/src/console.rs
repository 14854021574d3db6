//! Консольный "host": печатает команды симуляции так, как их видел бы
//! движок. Edit-шторм от твинов глушится — печатаем только структурные
//! правки (parent/visible), hand-off и звук.

use bevy::prelude::*;

use minirez_simulation::{
    log, log_info, AudioCommand, LookAtCommand, OverlayCommand, PanelTransition, SimSet,
    TabletCommand, ToggleCommand,
};

pub struct ConsolePlugin;

impl Plugin for ConsolePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (echo_overlay_traffic, echo_host_traffic, echo_gaze_traffic).after(SimSet::LookAt),
        );
    }
}

fn echo_overlay_traffic(
    mut overlays: EventReader<OverlayCommand>,
    mut transitions: EventReader<PanelTransition>,
) {
    for transition in transitions.read() {
        log_info(&format!(
            "HOST: panel {:?} → {:?} (hand {:?})",
            transition.from, transition.to, transition.hand
        ));
    }
    for command in overlays.read() {
        match command {
            OverlayCommand::Create { id, spec } => {
                log_info(&format!("HOST: create {:?} {:?}", id, spec.kind));
            }
            OverlayCommand::Edit { id, patch } => {
                if patch.parent.is_some() || patch.visible.is_some() {
                    log(&format!(
                        "HOST: edit {:?} parent {:?} visible {:?}",
                        id, patch.parent, patch.visible
                    ));
                }
            }
            OverlayCommand::Delete { id } => {
                log_info(&format!("HOST: delete {:?}", id));
            }
        }
    }
}

fn echo_host_traffic(
    mut tablets: EventReader<TabletCommand>,
    mut audio: EventReader<AudioCommand>,
    mut toggles: EventReader<ToggleCommand>,
) {
    for command in tablets.read() {
        let TabletCommand::Open { position, .. } = command;
        log_info(&format!("HOST: tablet hand-off at {:?}", position));
    }
    for command in audio.read() {
        let AudioCommand::Play { cue, volume, .. } = command;
        log(&format!("HOST: sound {:?} ({:.1})", cue, volume));
    }
    for command in toggles.read() {
        log_info(&format!("HOST: toggle {:?}", command));
    }
}

/// Поток SetHeadTarget идёт каждый тик — печатаем раз в полсекунды
fn echo_gaze_traffic(mut looks: EventReader<LookAtCommand>, mut ticker: Local<u32>) {
    *ticker += 1;
    let mut head_target = None;
    for command in looks.read() {
        match command {
            LookAtCommand::SetHeadTarget(point) => head_target = Some(*point),
            LookAtCommand::Release => log_info("HOST: look-at released"),
            LookAtCommand::SetEyesTarget(_) => {}
        }
    }
    if *ticker % 25 == 0 {
        if let Some(point) = head_target {
            log(&format!("HOST: head target {:?}", point));
        }
    }
}
