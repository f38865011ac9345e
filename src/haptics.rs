//! Haptic feedback: a closed set of intents mapped onto vibration patterns.
//!
//! The dispatcher has no state of its own beyond the injected [`Vibrator`].
//! Without a device, or with one that reports itself unavailable, every
//! request is dropped silently.

use bevy::prelude::*;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HapticToken {
    Light,
    Medium,
    Heavy,
    Success,
    Error,
    Notification,
    ModalOpen,
    ButtonPress,
    CaptureStart,
    CaptureSuccess,
    InventoryFull,
    GhostNearby,
}

impl HapticToken {
    pub fn pattern(self) -> VibrationPattern {
        use VibrationPattern::{Pulse, Shaped};
        match self {
            HapticToken::Light => Pulse(50),
            HapticToken::Medium => Pulse(100),
            HapticToken::Heavy => Pulse(200),
            HapticToken::Success => Shaped(&[100, 50, 100]),
            HapticToken::Error => Shaped(&[200, 100, 200, 100, 200]),
            HapticToken::Notification => Shaped(&[50, 50, 50]),
            HapticToken::ModalOpen => Pulse(30),
            HapticToken::ButtonPress => Pulse(20),
            HapticToken::CaptureStart => Shaped(&[50, 30, 80]),
            HapticToken::CaptureSuccess => Shaped(&[100, 50, 100, 50, 300]),
            HapticToken::InventoryFull => Shaped(&[300, 100, 300]),
            HapticToken::GhostNearby => Shaped(&[30, 60, 30, 60, 30]),
        }
    }

    /// Lenient lookup used for names coming from the host; anything unknown
    /// is treated as a light tap.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or(HapticToken::Light)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownToken;

impl FromStr for HapticToken {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "light" => HapticToken::Light,
            "medium" => HapticToken::Medium,
            "heavy" => HapticToken::Heavy,
            "success" => HapticToken::Success,
            "error" => HapticToken::Error,
            "notification" => HapticToken::Notification,
            "modal_open" => HapticToken::ModalOpen,
            "button_press" => HapticToken::ButtonPress,
            "capture_start" => HapticToken::CaptureStart,
            "capture_success" => HapticToken::CaptureSuccess,
            "inventory_full" => HapticToken::InventoryFull,
            "ghost_nearby" => HapticToken::GhostNearby,
            _ => return Err(UnknownToken),
        })
    }
}

/// Either a single buzz or alternating on/off durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VibrationPattern {
    Pulse(u32),
    Shaped(&'static [u32]),
}

impl VibrationPattern {
    pub fn total_ms(&self) -> u32 {
        match self {
            VibrationPattern::Pulse(ms) => *ms,
            VibrationPattern::Shaped(steps) => steps.iter().sum(),
        }
    }
}

/// Device capability behind the dispatcher.
pub trait Vibrator: Send + Sync + 'static {
    fn is_available(&self) -> bool {
        true
    }

    fn vibrate(&self, pattern: VibrationPattern);
}

/// Vibrator that only writes the pattern to the log.
pub struct LogVibrator;

impl Vibrator for LogVibrator {
    fn vibrate(&self, pattern: VibrationPattern) {
        debug!("vibrate {:?} ({} ms)", pattern, pattern.total_ms());
    }
}

#[derive(Resource, Default)]
pub struct HapticDispatcher {
    device: Option<Box<dyn Vibrator>>,
}

impl HapticDispatcher {
    pub fn new(device: impl Vibrator) -> Self {
        Self { device: Some(Box::new(device)) }
    }

    pub fn disabled() -> Self {
        Self { device: None }
    }

    pub fn trigger(&self, token: HapticToken) {
        let Some(device) = self.device.as_ref() else { return };
        if !device.is_available() {
            return;
        }
        device.vibrate(token.pattern());
    }

    pub fn trigger_named(&self, name: &str) {
        self.trigger(HapticToken::from_name(name));
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HapticRequest(pub HapticToken);

pub fn dispatch_haptics(
    dispatcher: Res<HapticDispatcher>,
    mut requests: EventReader<HapticRequest>,
) {
    for HapticRequest(token) in requests.read() {
        dispatcher.trigger(*token);
    }
}

pub struct HapticsPlugin;

impl Plugin for HapticsPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<HapticDispatcher>() {
            app.insert_resource(HapticDispatcher::new(LogVibrator));
        }
        app.add_event::<HapticRequest>()
            .add_systems(Update, dispatch_haptics.in_set(crate::FeedbackSet::Present));
    }
}
