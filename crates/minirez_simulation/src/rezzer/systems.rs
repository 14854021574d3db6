//! Rezzer systems (FSM transitions + overlay sync)
//!
//! rezzer_transitions решает "в каком состоянии панель", rezzer_overlay_sync
//! переводит состояние в поток OverlayCommand (tween-кадры, прогрев экрана,
//! масштаб аватара). Порядок систем фиксирован через .chain().

use bevy::prelude::*;

use crate::components::{Hand, RigInput, RigState};
use crate::host::{
    GrabAction, HostGrabEvent, OverlayCommand, OverlayId, OverlayIdAllocator, OverlayKind,
    OverlayParent, OverlayPatch, OverlaySpec, PanelUiEvent, TabletCommand,
};
use crate::rezzer::components::{MiniPanel, RezzerConfig, RezzerState, RezzerStateKind};
use crate::rezzer::events::PanelTransition;
use crate::tween;

/// Система: переходы state-машины панели
///
/// Порядок приоритетов в активных состояниях:
/// 1. HMD снят → Disabled (overlays удаляются)
/// 2. tablet_shown → Hidden (мгновенно, минуя tween)
/// 3. grab / expand-click → Expanding (debounce не блокирует)
/// 4. Условие показа (конус + squeeze-защёлки) с toggle_holdoff debounce
pub fn rezzer_transitions(
    mut panels: Query<(&mut RezzerState, &mut MiniPanel, &RezzerConfig)>,
    input: Res<RigInput>,
    rig: Res<RigState>,
    time: Res<Time<Fixed>>,
    mut grab_events: EventReader<HostGrabEvent>,
    mut ui_events: EventReader<PanelUiEvent>,
    mut ids: ResMut<OverlayIdAllocator>,
    mut overlays: EventWriter<OverlayCommand>,
    mut tablet: EventWriter<TabletCommand>,
    mut transitions: EventWriter<PanelTransition>,
) {
    let Ok((mut state, mut panel, config)) = panels.single_mut() else {
        return;
    };

    let dt = time.delta_secs();

    // Grab-запросы этого тика: (цель, рука из joint-имени)
    let grabs: Vec<(OverlayId, Option<Hand>)> = grab_events
        .read()
        .filter(|event| event.action == GrabAction::Grab)
        .map(|event| (event.target, Hand::from_joint_name(&event.joint)))
        .collect();
    let expand_clicked = ui_events
        .read()
        .any(|event| matches!(event, PanelUiEvent::ExpandClicked));

    // Debounce-таймеры тикают всегда
    panel.show_holdoff = (panel.show_holdoff - dt).max(0.0);
    panel.hide_holdoff = (panel.hide_holdoff - dt).max(0.0);

    // HMD снят — выключаемся из любого состояния
    if !input.hmd_active {
        if state.kind() != RezzerStateKind::Disabled {
            enter_state(
                RezzerState::Disabled,
                &mut state,
                &mut panel,
                config,
                &input,
                &rig,
                &mut ids,
                &mut overlays,
                &mut tablet,
                &mut transitions,
            );
        }
        return;
    }

    // Условие показа: рука в конусе камеры и ничего не сжимает
    let gaze_ok =
        |hand: Hand| rig.facing_camera(hand) && !rig.squeeze(hand).squeezed();

    let next = match state.as_ref() {
        // hmd_active уже проверен выше
        RezzerState::Disabled => Some(RezzerState::Hidden),

        RezzerState::Hidden => {
            if input.tablet_shown || input.toolbar_mode || panel.show_holdoff > 0.0 {
                None
            } else if gaze_ok(Hand::Left) {
                // Левая рука выигрывает при одновременном совпадении
                Some(RezzerState::Showing {
                    hand: Hand::Left,
                    progress: 0.0,
                })
            } else if gaze_ok(Hand::Right) {
                Some(RezzerState::Showing {
                    hand: Hand::Right,
                    progress: 0.0,
                })
            } else {
                None
            }
        }

        RezzerState::Showing { hand, progress } => {
            let hand = *hand;
            if input.tablet_shown {
                Some(RezzerState::Hidden)
            } else if !gaze_ok(hand) {
                // Условие потеряно на полпути — отмена показа с debounce
                panel.show_holdoff = config.toggle_holdoff;
                Some(RezzerState::Hidden)
            } else {
                let p = tween::advance(*progress, dt, config.show_hide_duration);
                if p >= 1.0 {
                    Some(RezzerState::Visible { hand })
                } else {
                    Some(RezzerState::Showing { hand, progress: p })
                }
            }
        }

        RezzerState::Visible { hand } => {
            let hand = *hand;
            if input.tablet_shown {
                Some(RezzerState::Hidden)
            } else if let Some(grab_hand) = grab_hand_for(&grabs, panel.model_overlay, hand) {
                crate::log(&format!("🖐 REZZER: panel grabbed by {:?} hand", grab_hand));
                Some(RezzerState::Expanding {
                    host_hand: hand,
                    grab_hand,
                    progress: 0.0,
                })
            } else if expand_clicked {
                Some(RezzerState::Expanding {
                    host_hand: hand,
                    grab_hand: hand,
                    progress: 0.0,
                })
            } else if !gaze_ok(hand) && panel.hide_holdoff <= 0.0 {
                Some(RezzerState::Hiding {
                    hand,
                    progress: 0.0,
                })
            } else {
                None
            }
        }

        RezzerState::Hiding { hand, progress } => {
            let hand = *hand;
            if input.tablet_shown {
                Some(RezzerState::Hidden)
            } else if gaze_ok(hand) {
                // Условие вернулось — отмена скрытия
                Some(RezzerState::Visible { hand })
            } else {
                let p = tween::advance(*progress, dt, config.show_hide_duration);
                if p >= 1.0 {
                    // Штатное завершение скрытия тоже взводит debounce
                    panel.show_holdoff = config.toggle_holdoff;
                    Some(RezzerState::Hidden)
                } else {
                    Some(RezzerState::Hiding { hand, progress: p })
                }
            }
        }

        RezzerState::Expanding {
            host_hand,
            grab_hand,
            progress,
        } => {
            if input.tablet_shown {
                // Tablet открыли мимо нас — прячемся
                Some(RezzerState::Hidden)
            } else {
                let p = tween::advance(*progress, dt, config.expand_duration);
                if p >= 1.0 {
                    Some(RezzerState::Open)
                } else {
                    Some(RezzerState::Expanding {
                        host_hand: *host_hand,
                        grab_hand: *grab_hand,
                        progress: p,
                    })
                }
            }
        }

        // Транзит: команда открытия ушла при входе, сразу прячемся
        RezzerState::Open => Some(RezzerState::Hidden),
    };

    let Some(next) = next else {
        return;
    };

    if next.kind() == state.kind() {
        // Прогресс-апдейт внутри состояния, не переход
        *state = next;
        return;
    }

    enter_state(
        next,
        &mut state,
        &mut panel,
        config,
        &input,
        &rig,
        &mut ids,
        &mut overlays,
        &mut tablet,
        &mut transitions,
    );
}

/// Применяет переход: exit/enter-эффекты, лог, PanelTransition
#[allow(clippy::too_many_arguments)]
fn enter_state(
    next: RezzerState,
    state: &mut RezzerState,
    panel: &mut MiniPanel,
    config: &RezzerConfig,
    input: &RigInput,
    rig: &RigState,
    ids: &mut OverlayIdAllocator,
    overlays: &mut EventWriter<OverlayCommand>,
    tablet: &mut EventWriter<TabletCommand>,
    transitions: &mut EventWriter<PanelTransition>,
) {
    let old_kind = state.kind();
    let new_kind = next.kind();
    if old_kind == new_kind {
        crate::log_error(&format!(
            "❌ REZZER: null state transition {:?} → {:?}",
            old_kind, new_kind
        ));
        return;
    }

    let scale = rig.effective_scale;

    match &next {
        RezzerState::Disabled => {
            destroy_overlays(panel, overlays);
        }

        RezzerState::Hidden => {
            if panel.model_overlay.is_none() {
                // Пришли из Disabled: готовим overlays заранее, чтобы показ
                // не ловил артефакты создания
                create_overlays(panel, config, scale, ids, overlays);
            } else {
                hide_overlays(panel, overlays);
            }
            // Debounce повторного показа взводится в rezzer_transitions
            // и только на condition-driven путях: отмена показа и штатное
            // завершение скрытия. Event-пути (tablet_shown, дрен Open)
            // оставляют панель готовой вернуться сразу.
        }

        RezzerState::Showing { hand, .. } => {
            attach_panel(*hand, panel, config, input, scale, overlays);
            if !panel.screen_warmed && panel.screen_warmup.is_none() {
                panel.screen_warmup = Some(config.screen_warmup_delay);
            }
        }

        RezzerState::Visible { .. } => {
            // Полный мини-размер + debounce обратного скрытия
            size_panel(panel, config, scale, overlays);
            panel.synced_scale = scale;
            panel.hide_holdoff = config.toggle_holdoff;
        }

        RezzerState::Hiding { .. } => {}

        RezzerState::Expanding { grab_hand, .. } => {
            // Снапшот точки захвата: рост идёт вокруг якоря, а не центра
            let local_position = config.attach_position * scale;
            panel.expand_rotation = config.attach_rotation;
            panel.expand_anchor =
                local_position + config.attach_rotation * (config.expand_handle(*grab_hand) * scale);
        }

        RezzerState::Open => {
            if let RezzerState::Expanding {
                host_hand,
                grab_hand,
                ..
            } = &*state
            {
                let (position, orientation) =
                    panel_world_transform(input, rig, panel, config, *host_hand, *grab_hand);
                hide_overlays(panel, overlays);
                tablet.write(TabletCommand::Open {
                    position,
                    orientation,
                });
                crate::log_info("📟 REZZER: expanding complete, opening tablet");
            }
        }
    }

    crate::log_info(&format!("REZZER: {:?} → {:?}", old_kind, new_kind));
    transitions.write(PanelTransition {
        from: old_kind,
        to: new_kind,
        hand: next.hand(),
    });
    *state = next;
}

/// Система: покадровая синхронизация overlays
///
/// Tween-кадры Showing/Hiding/Expanding, прогрев экрана, пересинхронизация
/// размеров при смене масштаба аватара в Visible.
pub fn rezzer_overlay_sync(
    mut panels: Query<(&RezzerState, &mut MiniPanel, &RezzerConfig)>,
    rig: Res<RigState>,
    time: Res<Time<Fixed>>,
    mut overlays: EventWriter<OverlayCommand>,
) {
    let Ok((state, mut panel, config)) = panels.single_mut() else {
        return;
    };

    let dt = time.delta_secs();

    // Прогрев web-экрана: однократный alpha 0 → 1 после первого показа
    if let Some(left) = panel.screen_warmup {
        let left = left - dt;
        if left <= 0.0 {
            if let Some(screen) = panel.screen_overlay {
                overlays.write(OverlayCommand::Edit {
                    id: screen,
                    patch: OverlayPatch {
                        alpha: Some(1.0),
                        ..Default::default()
                    },
                });
            }
            panel.screen_warmup = None;
            panel.screen_warmed = true;
        } else {
            panel.screen_warmup = Some(left);
        }
    }

    let scale = rig.effective_scale;

    match state {
        RezzerState::Showing { progress, .. } => {
            size_panel(&panel, config, scale * progress, &mut overlays);
            panel.synced_scale = scale;
        }

        RezzerState::Hiding { progress, .. } => {
            size_panel(&panel, config, scale * (1.0 - progress), &mut overlays);
            panel.synced_scale = scale;
        }

        RezzerState::Expanding {
            grab_hand,
            progress,
            ..
        } => {
            let factor = expand_factor(scale, config, *progress);
            if let Some(model) = panel.model_overlay {
                overlays.write(OverlayCommand::Edit {
                    id: model,
                    patch: OverlayPatch {
                        local_position: Some(
                            panel.expand_anchor
                                - panel.expand_rotation * (config.expand_handle(*grab_hand) * factor),
                        ),
                        dimensions: Some(config.panel_dimensions * factor),
                        ..Default::default()
                    },
                });
            }
            size_screen(&panel, config, factor, &mut overlays);
        }

        RezzerState::Visible { .. } => {
            // Масштаб аватара мог поменяться прямо на руке
            if (scale - panel.synced_scale).abs() > f32::EPSILON {
                if let Some(model) = panel.model_overlay {
                    overlays.write(OverlayCommand::Edit {
                        id: model,
                        patch: OverlayPatch {
                            local_position: Some(config.attach_position * scale),
                            dimensions: Some(config.panel_dimensions * scale),
                            ..Default::default()
                        },
                    });
                }
                size_screen(&panel, config, scale, &mut overlays);
                panel.synced_scale = scale;
            }
        }

        _ => {}
    }
}

/// Множитель габаритов в Expanding: масштаб аватара × линейный рост
/// ширины от мини-панели к полному tablet
pub(crate) fn expand_factor(scale: f32, config: &RezzerConfig, progress: f32) -> f32 {
    let initial_width = config.panel_dimensions.x;
    scale * (1.0 + progress * (config.expanded_width - initial_width) / initial_width)
}

fn grab_hand_for(
    grabs: &[(OverlayId, Option<Hand>)],
    model: Option<OverlayId>,
    host_hand: Hand,
) -> Option<Hand> {
    let model = model?;
    grabs
        .iter()
        .find(|(target, _)| *target == model)
        // Неизвестный joint считаем свободной рукой
        .map(|(_, hand)| hand.unwrap_or(host_hand.other()))
}

/// Мировой transform панели на момент полного расширения
/// (приближение: controller joint руки-хоста + локальный offset якоря)
fn panel_world_transform(
    input: &RigInput,
    rig: &RigState,
    panel: &MiniPanel,
    config: &RezzerConfig,
    host_hand: Hand,
    grab_hand: Hand,
) -> (Vec3, Quat) {
    let sample = input.hand(host_hand);
    let hand_position = input.avatar.position + input.avatar.orientation * sample.translation;
    let hand_orientation = input.avatar.orientation * sample.rotation;

    let factor = expand_factor(rig.effective_scale, config, 1.0);
    let local_position =
        panel.expand_anchor - panel.expand_rotation * (config.expand_handle(grab_hand) * factor);

    (
        hand_position + hand_orientation * local_position,
        hand_orientation * panel.expand_rotation,
    )
}

fn create_overlays(
    panel: &mut MiniPanel,
    config: &RezzerConfig,
    scale: f32,
    ids: &mut OverlayIdAllocator,
    overlays: &mut EventWriter<OverlayCommand>,
) {
    let model = ids.allocate();
    let screen = ids.allocate();

    overlays.write(OverlayCommand::Create {
        id: model,
        spec: OverlaySpec {
            kind: OverlayKind::Model {
                url: config.model_url.clone(),
            },
            parent: OverlayParent::None,
            local_position: Vec3::ZERO,
            local_rotation: Quat::IDENTITY,
            dimensions: config.panel_dimensions * scale,
            alpha: 1.0,
            dpi: None,
            solid: true,
            grabbable: true,
            visible: false,
        },
    });
    overlays.write(OverlayCommand::Create {
        id: screen,
        spec: OverlaySpec {
            kind: OverlayKind::Web {
                url: config.screen_url.clone(),
            },
            parent: OverlayParent::Overlay(model),
            local_position: config.screen_local_position() * scale,
            local_rotation: Quat::from_rotation_y(std::f32::consts::PI),
            dimensions: (config.screen_dimensions * scale).extend(0.0),
            // alpha 0 прячет экран, пока web-контент создаётся
            alpha: 0.0,
            dpi: Some(config.screen_dpi / scale),
            solid: false,
            grabbable: false,
            visible: false,
        },
    });

    panel.model_overlay = Some(model);
    panel.screen_overlay = Some(screen);
    panel.screen_warmed = false;
    panel.screen_warmup = None;
    panel.synced_scale = scale;
}

fn destroy_overlays(panel: &mut MiniPanel, overlays: &mut EventWriter<OverlayCommand>) {
    // Сначала ребёнок, потом родитель
    if let Some(screen) = panel.screen_overlay.take() {
        overlays.write(OverlayCommand::Delete { id: screen });
    }
    if let Some(model) = panel.model_overlay.take() {
        overlays.write(OverlayCommand::Delete { id: model });
    }
    panel.screen_warmup = None;
    panel.screen_warmed = false;
}

fn hide_overlays(panel: &MiniPanel, overlays: &mut EventWriter<OverlayCommand>) {
    if let Some(model) = panel.model_overlay {
        overlays.write(OverlayCommand::Edit {
            id: model,
            patch: OverlayPatch {
                // Отпускаем руку — она должна мочь схватить полный tablet
                parent: Some(OverlayParent::None),
                visible: Some(false),
                ..Default::default()
            },
        });
    }
    if let Some(screen) = panel.screen_overlay {
        overlays.write(OverlayCommand::Edit {
            id: screen,
            patch: OverlayPatch {
                visible: Some(false),
                ..Default::default()
            },
        });
    }
}

fn attach_panel(
    hand: Hand,
    panel: &MiniPanel,
    config: &RezzerConfig,
    input: &RigInput,
    scale: f32,
    overlays: &mut EventWriter<OverlayCommand>,
) {
    let Some(model) = panel.model_overlay else {
        crate::log_warning("REZZER: attach requested without overlays");
        return;
    };

    overlays.write(OverlayCommand::Edit {
        id: model,
        patch: OverlayPatch {
            parent: Some(OverlayParent::AvatarJoint {
                joint: hand.attachment_joint(input.camera.mode).to_string(),
            }),
            local_position: Some(config.attach_position * scale),
            local_rotation: Some(config.attach_rotation),
            // Вырастет в rezzer_overlay_sync
            dimensions: Some(Vec3::ZERO),
            visible: Some(true),
            ..Default::default()
        },
    });
    if let Some(screen) = panel.screen_overlay {
        overlays.write(OverlayCommand::Edit {
            id: screen,
            patch: OverlayPatch {
                visible: Some(true),
                ..Default::default()
            },
        });
    }
}

/// Габариты модели + экрана под общий множитель
pub(crate) fn size_panel(
    panel: &MiniPanel,
    config: &RezzerConfig,
    factor: f32,
    overlays: &mut EventWriter<OverlayCommand>,
) {
    if let Some(model) = panel.model_overlay {
        overlays.write(OverlayCommand::Edit {
            id: model,
            patch: OverlayPatch {
                dimensions: Some(config.panel_dimensions * factor),
                ..Default::default()
            },
        });
    }
    size_screen(panel, config, factor, overlays);
}

fn size_screen(
    panel: &MiniPanel,
    config: &RezzerConfig,
    factor: f32,
    overlays: &mut EventWriter<OverlayCommand>,
) {
    let Some(screen) = panel.screen_overlay else {
        return;
    };
    overlays.write(OverlayCommand::Edit {
        id: screen,
        patch: OverlayPatch {
            local_position: Some(config.screen_local_position() * factor),
            dimensions: Some((config.screen_dimensions * factor).extend(0.0)),
            dpi: Some(config.screen_dpi / factor.max(1e-4)),
            ..Default::default()
        },
    });
}
