use bevy::app::{AppExit, ScheduleRunnerPlugin};
use bevy::log::LogPlugin;
use bevy::prelude::*;
use std::time::Duration;

use ghost_hunt_feedback::capture::{CaptureCancelled, CaptureCompleted, CaptureProgress};
use ghost_hunt_feedback::config::{ConfigError, FeedbackConfig};
use ghost_hunt_feedback::effects::{EffectAnchors, VisualEffects};
use ghost_hunt_feedback::hunt::{CaptureInput, DepositRequest, HuntPlugin, HuntState};
use ghost_hunt_feedback::indicators::{Indicators, ProximityUpdate};
use ghost_hunt_feedback::inventory::{InventoryModal, InventoryToggle};
use ghost_hunt_feedback::toast::ToastQueue;
use ghost_hunt_feedback::{FeedbackPlugin, FeedbackSet};

const APPROACH_STEP_M: f32 = 15.0;
const CAPTURE_RANGE_M: f32 = 5.0;
const EARLY_RELEASE: Duration = Duration::from_secs(1);
const LINGER: Duration = Duration::from_secs(2);

/// Where the scripted player is in the hunt.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Approach { distance: f32 },
    Holding { since: Duration },
    Full,
    Inventory,
    WrongCode,
    Deposit,
    Done { since: Duration },
}

#[derive(Resource)]
struct Demo {
    stage: Stage,
    released_early: bool,
}

#[derive(Resource)]
struct ScriptTimer(Timer);

#[derive(Resource)]
struct StatusLogTimer(Timer);

fn main() -> Result<(), ConfigError> {
    let config = FeedbackConfig::from_env()?;
    let range = config.hunt.proximity_range_m;

    App::new()
        // Headless: no window, drive the schedule ourselves at 60 Hz.
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            1.0 / 60.0,
        ))))
        .add_plugins(LogPlugin::default())
        .add_plugins((FeedbackPlugin { config }, HuntPlugin))
        .insert_resource(Demo { stage: Stage::Approach { distance: range }, released_early: false })
        .insert_resource(ScriptTimer(Timer::from_seconds(0.25, TimerMode::Repeating)))
        .insert_resource(StatusLogTimer(Timer::from_seconds(1.0, TimerMode::Repeating)))
        .add_systems(Startup, place_first_ghost)
        .add_systems(Update, play_hunt.in_set(FeedbackSet::Input))
        .add_systems(Update, log_status.after(FeedbackSet::Present))
        .run();
    Ok(())
}

fn place_first_ghost(mut hunt: ResMut<HuntState>, anchors: Res<EffectAnchors>) {
    if let Some(target) = hunt.spawn_ghost(anchors.ghost) {
        info!("a {} appeared", target.kind.label());
    }
}

#[allow(clippy::too_many_arguments)]
fn play_hunt(
    time: Res<Time>,
    config: Res<FeedbackConfig>,
    hunt: Res<HuntState>,
    mut timer: ResMut<ScriptTimer>,
    mut demo: ResMut<Demo>,
    mut completed: EventReader<CaptureCompleted>,
    mut cancelled: EventReader<CaptureCancelled>,
    mut proximity: EventWriter<ProximityUpdate>,
    mut input: EventWriter<CaptureInput>,
    mut deposits: EventWriter<DepositRequest>,
    mut inventory: EventWriter<InventoryToggle>,
    mut exit: EventWriter<AppExit>,
) {
    let now = time.elapsed();
    let range = config.hunt.proximity_range_m;

    if cancelled.read().count() > 0 {
        demo.stage = Stage::Approach { distance: range / 2.0 };
    }
    if completed.read().count() > 0 {
        demo.stage = Stage::Approach { distance: range };
    }

    timer.0.tick(time.delta());
    if !timer.0.just_finished() {
        return;
    }

    let released_early = demo.released_early;
    let stage = demo.stage;
    let next = match stage {
        Stage::Approach { .. } if hunt.is_full() => Stage::Full,
        Stage::Approach { distance } => {
            let distance = (distance - APPROACH_STEP_M).max(0.0);
            proximity.send(ProximityUpdate { distance_m: distance });
            if distance > CAPTURE_RANGE_M {
                Stage::Approach { distance }
            } else {
                input.send(CaptureInput::Press);
                Stage::Holding { since: now }
            }
        }
        Stage::Holding { since } if !released_early && now - since >= EARLY_RELEASE => {
            info!("letting go of the trigger early");
            demo.released_early = true;
            input.send(CaptureInput::Release);
            Stage::Holding { since }
        }
        Stage::Full => {
            input.send(CaptureInput::Press);
            Stage::Inventory
        }
        Stage::Inventory => {
            inventory.send(InventoryToggle::Open);
            Stage::WrongCode
        }
        Stage::WrongCode => {
            deposits.send(DepositRequest("PIZZA_PARLOR_QR".to_string()));
            Stage::Deposit
        }
        Stage::Deposit => {
            deposits.send(DepositRequest(config.hunt.containment_code.clone()));
            inventory.send(InventoryToggle::Close);
            Stage::Done { since: now }
        }
        Stage::Done { since } if now - since >= LINGER => {
            match hunt.profile().to_bytes() {
                Ok(bytes) => info!("profile snapshot: {} bytes", bytes.len()),
                Err(err) => warn!("profile snapshot failed: {}", err),
            }
            info!(
                "hunt over: {} points from {} captures, ecto-1 unlocked: {}",
                hunt.profile().points,
                hunt.profile().captures,
                hunt.profile().ecto1_unlocked
            );
            exit.send(AppExit::Success);
            Stage::Done { since }
        }
        stage => stage,
    };
    demo.stage = next;
}

fn log_status(
    time: Res<Time>,
    mut timer: ResMut<StatusLogTimer>,
    progress: Res<CaptureProgress>,
    toasts: Res<ToastQueue>,
    effects: Res<VisualEffects>,
    modal: Res<InventoryModal>,
    indicators: Res<Indicators>,
) {
    timer.0.tick(time.delta());
    if timer.0.finished() {
        info!(
            "capture={:?} {:.0}% toasts={} particles={} inventory={:?}/{:?} proximity={:?}",
            progress.phase(),
            progress.percent(),
            toasts.visible_count(),
            effects.particles().len(),
            modal.visibility(),
            indicators.inventory(),
            indicators.proximity()
        );
    }
}
