//! Capture progress bar: the timed 0–100 % interaction behind the proton pack.
//!
//! [`CaptureProgress`] is a pure state machine over an injected clock. Every
//! call takes `now` (time since app start) and the machine reports what
//! happened as a list of [`CaptureEffect`]s from [`CaptureProgress::advance`].
//! Nothing in here reads a wall clock or touches a device, so the whole
//! lifecycle can be driven frame by frame in tests.
//!
//! ```text
//! Idle -> Showing -> Active -> Completing -> Hiding -> Idle
//!            \          \
//!             `----------`--> Cancelling -> Idle
//! ```
//!
//! [`CaptureDriver`] wraps the machine with the callback contract used by
//! hosts that are not ECS-driven, and [`CapturePlugin`] wires it into Bevy.

use bevy::prelude::*;
use std::time::Duration;

use crate::config::{CaptureTimings, FeedbackConfig};
use crate::easing::{ease_in_cubic, ease_in_out_cubic, ratio};
use crate::effects::{EffectAnchors, EffectRequest};
use crate::haptics::{HapticRequest, HapticToken};

const MIDDLE_STAGE_PERCENT: f32 = 50.0;
const CRITICAL_STAGE_PERCENT: f32 = 80.0;
const SHAKE_PERCENT: f32 = 90.0;
/// Share of critical-stage frames that add a medium buzz.
pub const CRITICAL_PULSE_CHANCE: f32 = 0.3;
/// Length of an animated [`CaptureProgress::set_progress`].
pub const SET_PROGRESS_SPAN: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CapturePhase {
    #[default]
    Idle,
    Showing,
    Active,
    Completing,
    Hiding,
    Cancelling,
}

/// Visual stage of the bar fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaptureStage {
    #[default]
    Start,
    Middle,
    Critical,
}

impl CaptureStage {
    pub fn for_percent(percent: f32) -> Self {
        if percent > CRITICAL_STAGE_PERCENT {
            CaptureStage::Critical
        } else if percent > MIDDLE_STAGE_PERCENT {
            CaptureStage::Middle
        } else {
            CaptureStage::Start
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureEffect {
    Phase(CapturePhase),
    /// Displayed (eased) percentage and raw linear progress in `[0, 1]`.
    Tick { percent: f32, raw: f32 },
    Stage(CaptureStage),
    /// Emitted on every critical-stage tick; hosts decide whether to buzz.
    CriticalPulse,
    Haptic(HapticToken),
    BeamOn,
    BeamOff,
    /// The ghost escaped; show the failure burst.
    Failed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Accepted,
    /// Released inside the guard window; the capture keeps running.
    TooEarly,
    NotActive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    pub started_at: Duration,
    pub duration: Duration,
    pub percent: f32,
    pub phase: CapturePhase,
    phase_since: Duration,
    stage: CaptureStage,
    shaken: bool,
    drain_from: f32,
}

impl CaptureSession {
    fn new(now: Duration, duration: Duration) -> Self {
        Self {
            started_at: now,
            duration,
            percent: 0.0,
            phase: CapturePhase::Showing,
            phase_since: now,
            stage: CaptureStage::Start,
            shaken: false,
            drain_from: 0.0,
        }
    }

    fn enter(&mut self, phase: CapturePhase, at: Duration, out: &mut Vec<CaptureEffect>) {
        self.phase = phase;
        self.phase_since = at;
        out.push(CaptureEffect::Phase(phase));
    }
}

/// Fill set from outside a capture, easing from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ManualFill {
    from: f32,
    to: f32,
    since: Duration,
    span: Duration,
    percent: f32,
    settled: bool,
}

impl ManualFill {
    fn at(&self, now: Duration) -> f32 {
        let p = ratio(now.saturating_sub(self.since), self.span);
        self.from + (self.to - self.from) * ease_in_out_cubic(p)
    }
}

/// What a renderer needs to draw the bar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CaptureBar {
    pub visible: bool,
    pub fill_percent: f32,
    pub stage: CaptureStage,
    pub critical: bool,
    pub shaking: bool,
    pub success: bool,
    pub hiding: bool,
}

#[derive(Resource, Debug, Clone)]
pub struct CaptureProgress {
    timings: CaptureTimings,
    session: Option<CaptureSession>,
    manual: Option<ManualFill>,
    pending: Vec<CaptureEffect>,
}

impl Default for CaptureProgress {
    fn default() -> Self {
        Self::new(CaptureTimings::default())
    }
}

impl CaptureProgress {
    pub fn new(timings: CaptureTimings) -> Self {
        Self { timings, session: None, manual: None, pending: Vec::new() }
    }

    pub fn phase(&self) -> CapturePhase {
        self.session.as_ref().map_or(CapturePhase::Idle, |s| s.phase)
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    /// Displayed fill, including the cancel drain and any externally set value.
    pub fn percent(&self) -> f32 {
        match (&self.session, &self.manual) {
            (Some(session), _) => session.percent,
            (None, Some(fill)) => fill.percent,
            (None, None) => 0.0,
        }
    }

    /// True while the player is still holding a capture that has not resolved.
    pub fn is_capturing(&self) -> bool {
        matches!(self.phase(), CapturePhase::Showing | CapturePhase::Active)
    }

    /// Begins a capture. Returns `false` (and does nothing) unless idle.
    pub fn start(&mut self, now: Duration, duration: Duration) -> bool {
        self.settle_pending(now);
        if self.session.is_some() {
            debug!("capture start ignored: already {:?}", self.phase());
            return false;
        }
        self.session = Some(CaptureSession::new(now, duration));
        self.manual = None;
        self.pending.extend([
            CaptureEffect::Phase(CapturePhase::Showing),
            CaptureEffect::Haptic(HapticToken::CaptureStart),
            CaptureEffect::BeamOn,
        ]);
        true
    }

    pub fn cancel(&mut self, now: Duration) -> CancelOutcome {
        self.settle_pending(now);
        let guard = self.timings.cancel_guard;
        let Some(session) = self.session.as_mut() else { return CancelOutcome::NotActive };
        if !matches!(session.phase, CapturePhase::Showing | CapturePhase::Active) {
            return CancelOutcome::NotActive;
        }

        let held = now.saturating_sub(session.started_at);
        if held < guard {
            debug!("capture cancel ignored after {:?} (guard {:?})", held, guard);
            return CancelOutcome::TooEarly;
        }

        session.drain_from = session.percent;
        session.enter(CapturePhase::Cancelling, now, &mut self.pending);
        self.pending.extend([
            CaptureEffect::Haptic(HapticToken::Error),
            CaptureEffect::BeamOff,
            CaptureEffect::Failed,
            CaptureEffect::Cancelled,
        ]);
        CancelOutcome::Accepted
    }

    /// Sets the fill from outside a capture, clamped to `[0, 100]`. Animated
    /// changes ease from the current fill over [`SET_PROGRESS_SPAN`] and tick
    /// from `advance`. Refused (`false`) while a capture owns the bar.
    pub fn set_progress(&mut self, now: Duration, percent: f32, animated: bool) -> bool {
        self.settle_pending(now);
        if self.session.is_some() {
            debug!("set_progress ignored: capture {:?}", self.phase());
            return false;
        }
        let target = percent.clamp(0.0, 100.0);
        if animated {
            let from = self.manual.map_or(0.0, |fill| fill.at(now));
            self.manual = Some(ManualFill {
                from,
                to: target,
                since: now,
                span: SET_PROGRESS_SPAN,
                percent: from,
                settled: false,
            });
        } else {
            self.manual = Some(ManualFill {
                from: target,
                to: target,
                since: now,
                span: Duration::ZERO,
                percent: target,
                settled: true,
            });
            self.pending.push(CaptureEffect::Tick { percent: target, raw: target / 100.0 });
        }
        true
    }

    /// Runs every transition due at `now` and returns the effects produced
    /// since the previous call, in order.
    pub fn advance(&mut self, now: Duration) -> Vec<CaptureEffect> {
        let mut out = std::mem::take(&mut self.pending);
        self.settle(now, &mut out);
        self.settle_manual(now, &mut out);
        out
    }

    pub fn bar(&self) -> CaptureBar {
        let Some(session) = self.session.as_ref() else {
            return self.manual.map_or_else(CaptureBar::default, |fill| CaptureBar {
                visible: fill.percent > 0.0,
                fill_percent: fill.percent,
                stage: CaptureStage::for_percent(fill.percent),
                ..CaptureBar::default()
            });
        };
        let active = session.phase == CapturePhase::Active;
        CaptureBar {
            visible: true,
            fill_percent: session.percent,
            stage: session.stage,
            critical: active && session.percent > CRITICAL_STAGE_PERCENT,
            shaking: active && session.shaken,
            success: matches!(session.phase, CapturePhase::Completing | CapturePhase::Hiding),
            hiding: matches!(session.phase, CapturePhase::Hiding | CapturePhase::Cancelling),
        }
    }

    fn settle_pending(&mut self, now: Duration) {
        let mut out = std::mem::take(&mut self.pending);
        self.settle(now, &mut out);
        self.pending = out;
    }

    fn settle(&mut self, now: Duration, out: &mut Vec<CaptureEffect>) {
        while self.step(now, out) {}
    }

    fn settle_manual(&mut self, now: Duration, out: &mut Vec<CaptureEffect>) {
        if self.session.is_some() {
            return;
        }
        let Some(fill) = self.manual.as_mut().filter(|fill| !fill.settled) else { return };
        fill.percent = fill.at(now);
        fill.settled = now.saturating_sub(fill.since) >= fill.span;
        out.push(CaptureEffect::Tick { percent: fill.percent, raw: fill.percent / 100.0 });
    }

    /// One transition at most. Returns whether the phase changed.
    fn step(&mut self, now: Duration, out: &mut Vec<CaptureEffect>) -> bool {
        let t = self.timings;
        let Some(session) = self.session.as_mut() else { return false };

        let phase = session.phase;
        match phase {
            CapturePhase::Idle => {
                self.session = None;
                false
            }
            CapturePhase::Showing => {
                let active_at = session.started_at + t.entry_delay;
                if now < active_at {
                    return false;
                }
                session.enter(CapturePhase::Active, active_at, out);
                true
            }
            CapturePhase::Active => {
                let raw = ratio(now.saturating_sub(session.started_at), session.duration);
                session.percent = ease_in_out_cubic(raw) * 100.0;
                out.push(CaptureEffect::Tick { percent: session.percent, raw });

                let stage = CaptureStage::for_percent(session.percent);
                if stage != session.stage {
                    session.stage = stage;
                    out.push(CaptureEffect::Stage(stage));
                }
                if stage == CaptureStage::Critical && raw < 1.0 {
                    out.push(CaptureEffect::CriticalPulse);
                }
                if session.percent > SHAKE_PERCENT && !session.shaken {
                    session.shaken = true;
                    out.push(CaptureEffect::Haptic(HapticToken::Heavy));
                }

                if raw < 1.0 {
                    return false;
                }
                let done_at = (session.started_at + session.duration).max(session.phase_since);
                session.percent = 100.0;
                session.enter(CapturePhase::Completing, done_at, out);
                out.extend([
                    CaptureEffect::Haptic(HapticToken::CaptureSuccess),
                    CaptureEffect::BeamOff,
                    CaptureEffect::Completed,
                ]);
                true
            }
            CapturePhase::Completing => {
                let hide_at = session.phase_since + t.completion_hold;
                if now < hide_at {
                    return false;
                }
                session.enter(CapturePhase::Hiding, hide_at, out);
                true
            }
            CapturePhase::Hiding => {
                if now < session.phase_since + t.hide {
                    return false;
                }
                self.session = None;
                out.push(CaptureEffect::Phase(CapturePhase::Idle));
                true
            }
            CapturePhase::Cancelling => {
                let p = ratio(now.saturating_sub(session.phase_since), t.cancel_drain);
                session.percent = session.drain_from * (1.0 - ease_in_cubic(p));
                if p < 1.0 {
                    return false;
                }
                self.session = None;
                out.push(CaptureEffect::Phase(CapturePhase::Idle));
                true
            }
        }
    }
}

type CompleteHook = Box<dyn FnOnce() + Send + Sync>;
type TickHook = Box<dyn FnMut(f32, f32) + Send + Sync>;

/// Callback-style front end: `start(duration, on_complete, on_tick)`.
///
/// `on_complete` is a `FnOnce`, so it cannot run twice for one start.
pub struct CaptureDriver {
    progress: CaptureProgress,
    on_complete: Option<CompleteHook>,
    on_tick: Option<TickHook>,
}

impl CaptureDriver {
    pub fn new(timings: CaptureTimings) -> Self {
        Self { progress: CaptureProgress::new(timings), on_complete: None, on_tick: None }
    }

    pub fn progress(&self) -> &CaptureProgress {
        &self.progress
    }

    pub fn start(
        &mut self,
        now: Duration,
        duration: Duration,
        on_complete: impl FnOnce() + Send + Sync + 'static,
        on_tick: impl FnMut(f32, f32) + Send + Sync + 'static,
    ) -> bool {
        if !self.progress.start(now, duration) {
            return false;
        }
        self.on_complete = Some(Box::new(on_complete));
        self.on_tick = Some(Box::new(on_tick));
        true
    }

    pub fn cancel(&mut self, now: Duration) -> CancelOutcome {
        self.progress.cancel(now)
    }

    pub fn advance(&mut self, now: Duration) -> Vec<CaptureEffect> {
        let effects = self.progress.advance(now);
        for effect in &effects {
            match *effect {
                CaptureEffect::Tick { percent, raw } => {
                    if let Some(on_tick) = self.on_tick.as_mut() {
                        on_tick(percent, raw);
                    }
                }
                CaptureEffect::Completed => {
                    self.on_tick = None;
                    if let Some(on_complete) = self.on_complete.take() {
                        on_complete();
                    }
                }
                CaptureEffect::Cancelled => {
                    self.on_tick = None;
                    self.on_complete = None;
                }
                _ => {}
            }
        }
        effects
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum CaptureCommand {
    Start { duration: Duration },
    Cancel,
    /// Externally driven fill; ignored while a capture is running.
    SetProgress { percent: f32, animated: bool },
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct CaptureTick {
    pub percent: f32,
    pub raw: f32,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureCompleted;

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureCancelled;

#[allow(clippy::too_many_arguments)]
pub fn drive_capture(
    time: Res<Time>,
    anchors: Res<EffectAnchors>,
    mut progress: ResMut<CaptureProgress>,
    mut commands: EventReader<CaptureCommand>,
    mut ticks: EventWriter<CaptureTick>,
    mut completed: EventWriter<CaptureCompleted>,
    mut cancelled: EventWriter<CaptureCancelled>,
    mut haptics: EventWriter<HapticRequest>,
    mut fx: EventWriter<EffectRequest>,
) {
    let now = time.elapsed();
    for command in commands.read() {
        match *command {
            CaptureCommand::Start { duration } => {
                if progress.start(now, duration) {
                    info!("capture started ({} ms)", duration.as_millis());
                }
            }
            CaptureCommand::Cancel => match progress.cancel(now) {
                CancelOutcome::Accepted => info!("capture cancelled at {:.0}%", progress.percent()),
                CancelOutcome::TooEarly => debug!("capture release inside guard window"),
                CancelOutcome::NotActive => {}
            },
            CaptureCommand::SetProgress { percent, animated } => {
                if !progress.set_progress(now, percent, animated) {
                    debug!("capture bar busy, {:.0}% not applied", percent);
                }
            }
        }
    }

    for effect in progress.advance(now) {
        match effect {
            CaptureEffect::Tick { percent, raw } => {
                ticks.send(CaptureTick { percent, raw });
            }
            CaptureEffect::CriticalPulse => {
                if rand::random::<f32>() < CRITICAL_PULSE_CHANCE {
                    haptics.send(HapticRequest(HapticToken::Medium));
                }
            }
            CaptureEffect::Haptic(token) => {
                haptics.send(HapticRequest(token));
            }
            CaptureEffect::BeamOn => {
                fx.send(EffectRequest::BeamStart);
            }
            CaptureEffect::BeamOff => {
                fx.send(EffectRequest::BeamStop);
            }
            CaptureEffect::Failed => {
                fx.send(EffectRequest::CaptureFail { at: anchors.ghost });
            }
            CaptureEffect::Completed => {
                info!("capture completed");
                completed.send(CaptureCompleted);
            }
            CaptureEffect::Cancelled => {
                cancelled.send(CaptureCancelled);
            }
            CaptureEffect::Phase(phase) => debug!("capture phase -> {:?}", phase),
            CaptureEffect::Stage(stage) => debug!("capture stage -> {:?}", stage),
        }
    }
}

pub struct CapturePlugin;

impl Plugin for CapturePlugin {
    fn build(&self, app: &mut App) {
        let timings = app
            .world()
            .get_resource::<FeedbackConfig>()
            .map(|c| c.capture)
            .unwrap_or_default();
        app.insert_resource(CaptureProgress::new(timings))
            .add_event::<CaptureCommand>()
            .add_event::<CaptureTick>()
            .add_event::<CaptureCompleted>()
            .add_event::<CaptureCancelled>()
            .add_systems(Update, drive_capture.in_set(crate::FeedbackSet::Capture));
    }
}
