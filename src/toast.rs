//! Bounded queue of short-lived notifications.
//!
//! Removal is two-phase: a toast is first marked removing, which takes it out
//! of the visible count, and is detached once the exit animation is over.

use bevy::prelude::*;
use std::time::Duration;

use crate::config::{FeedbackConfig, ToastSettings};
use crate::haptics::{HapticRequest, HapticToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn haptic(self) -> HapticToken {
        match self {
            Severity::Success => HapticToken::Success,
            Severity::Error => HapticToken::Error,
            Severity::Warning => HapticToken::Medium,
            Severity::Info => HapticToken::Light,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Severity::Success => "✓",
            Severity::Error => "✕",
            Severity::Warning => "⚠",
            Severity::Info => "ℹ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub severity: Severity,
    /// Zero means the toast stays until dismissed.
    pub duration: Duration,
    pub created_at: Duration,
}

impl Toast {
    fn expires_at(&self) -> Option<Duration> {
        (!self.duration.is_zero()).then(|| self.created_at + self.duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastEvent {
    Shown { id: ToastId, severity: Severity },
    Removing(ToastId),
    Removed(ToastId),
}

struct Slot {
    toast: Toast,
    removing_since: Option<Duration>,
}

#[derive(Resource)]
pub struct ToastQueue {
    settings: ToastSettings,
    next_id: u64,
    slots: Vec<Slot>,
    pending: Vec<ToastEvent>,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(ToastSettings::default())
    }
}

impl ToastQueue {
    pub fn new(settings: ToastSettings) -> Self {
        Self {
            settings: ToastSettings { max_visible: settings.max_visible.max(1), ..settings },
            next_id: 0,
            slots: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn show(
        &mut self,
        now: Duration,
        message: impl Into<String>,
        severity: Severity,
        duration: Option<Duration>,
    ) -> ToastId {
        self.evict_down_to(now, self.settings.max_visible - 1);

        self.next_id += 1;
        let id = ToastId(self.next_id);
        self.slots.push(Slot {
            toast: Toast {
                id,
                message: message.into(),
                severity,
                duration: duration.unwrap_or(self.settings.default_duration),
                created_at: now,
            },
            removing_since: None,
        });
        self.pending.push(ToastEvent::Shown { id, severity });
        id
    }

    pub fn success(&mut self, now: Duration, message: impl Into<String>) -> ToastId {
        self.show(now, message, Severity::Success, None)
    }

    pub fn error(&mut self, now: Duration, message: impl Into<String>) -> ToastId {
        self.show(now, message, Severity::Error, None)
    }

    pub fn warning(&mut self, now: Duration, message: impl Into<String>) -> ToastId {
        self.show(now, message, Severity::Warning, None)
    }

    pub fn info(&mut self, now: Duration, message: impl Into<String>) -> ToastId {
        self.show(now, message, Severity::Info, None)
    }

    pub fn dismiss(&mut self, now: Duration, id: ToastId) {
        let Some(slot) = self.slots.iter_mut().find(|s| s.toast.id == id) else {
            return;
        };
        if slot.removing_since.is_none() {
            slot.removing_since = Some(now);
            self.pending.push(ToastEvent::Removing(id));
        }
    }

    pub fn dismiss_all(&mut self, now: Duration) {
        self.evict_down_to(now, 0);
    }

    pub fn set_default_duration(&mut self, duration: Duration) {
        self.settings.default_duration = duration;
    }

    /// Shrinking the limit evicts the oldest visible toasts straight away.
    pub fn set_max_visible(&mut self, now: Duration, max_visible: usize) {
        self.settings.max_visible = max_visible.max(1);
        self.evict_down_to(now, self.settings.max_visible);
    }

    /// Fires auto-dismiss timers, detaches finished exits and drains the
    /// events produced since the last call.
    pub fn advance(&mut self, now: Duration) -> Vec<ToastEvent> {
        for slot in &mut self.slots {
            if slot.removing_since.is_some() {
                continue;
            }
            if let Some(at) = slot.toast.expires_at().filter(|at| *at <= now) {
                slot.removing_since = Some(at);
                self.pending.push(ToastEvent::Removing(slot.toast.id));
            }
        }

        let exit = self.settings.exit;
        let pending = &mut self.pending;
        self.slots.retain(|slot| match slot.removing_since {
            Some(since) if since + exit <= now => {
                pending.push(ToastEvent::Removed(slot.toast.id));
                false
            }
            _ => true,
        });

        std::mem::take(&mut self.pending)
    }

    pub fn get(&self, id: ToastId) -> Option<&Toast> {
        self.slots.iter().map(|s| &s.toast).find(|t| t.id == id)
    }

    /// Toasts on screen and not leaving, oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.slots.iter().filter(|s| s.removing_since.is_none()).map(|s| &s.toast)
    }

    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }

    /// Everything still attached, including toasts playing their exit.
    pub fn attached_count(&self) -> usize {
        self.slots.len()
    }

    fn evict_down_to(&mut self, now: Duration, keep: usize) {
        let mut visible = self.visible_count();
        for slot in &mut self.slots {
            if visible <= keep {
                break;
            }
            if slot.removing_since.is_none() {
                slot.removing_since = Some(now);
                self.pending.push(ToastEvent::Removing(slot.toast.id));
                visible -= 1;
            }
        }
    }
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct ShowToast {
    pub message: String,
    pub severity: Severity,
    pub duration: Option<Duration>,
}

impl ShowToast {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self { message: message.into(), severity, duration: None }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Success)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Warning)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Info)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

pub fn run_toasts(
    time: Res<Time>,
    mut queue: ResMut<ToastQueue>,
    mut requests: EventReader<ShowToast>,
    mut haptics: EventWriter<HapticRequest>,
) {
    let now = time.elapsed();
    for request in requests.read() {
        queue.show(now, request.message.clone(), request.severity, request.duration);
    }
    for event in queue.advance(now) {
        match event {
            ToastEvent::Shown { id, severity } => {
                if let Some(toast) = queue.get(id) {
                    info!("{} {}", severity.icon(), toast.message);
                }
                haptics.send(HapticRequest(severity.haptic()));
            }
            ToastEvent::Removed(id) => debug!("toast {:?} detached", id),
            ToastEvent::Removing(_) => {}
        }
    }
}

pub struct ToastPlugin;

impl Plugin for ToastPlugin {
    fn build(&self, app: &mut App) {
        let settings = app
            .world()
            .get_resource::<FeedbackConfig>()
            .map(|c| c.toast)
            .unwrap_or_default();
        app.insert_resource(ToastQueue::new(settings))
            .add_event::<ShowToast>()
            .add_systems(Update, run_toasts.in_set(crate::FeedbackSet::Present));
    }
}
