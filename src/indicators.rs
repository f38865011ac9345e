//! HUD indicators: inventory badge, ghost proximity, proton pack glow and the
//! short success pulses shown after a capture, deposit or unlock.

use bevy::prelude::*;
use std::time::Duration;

use crate::capture::{CaptureCancelled, CaptureCompleted, CaptureTick};
use crate::config::FeedbackConfig;
use crate::easing::{ease_out_cubic, ratio};
use crate::haptics::{HapticRequest, HapticToken};
use crate::hunt::HuntState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InventoryLevel {
    #[default]
    Normal,
    Warning,
    Full,
}

impl InventoryLevel {
    pub fn from_counts(count: usize, capacity: usize) -> Self {
        if capacity == 0 {
            return InventoryLevel::Full;
        }
        let percent = count as f32 / capacity as f32 * 100.0;
        if percent >= 100.0 {
            InventoryLevel::Full
        } else if percent >= 80.0 {
            InventoryLevel::Warning
        } else {
            InventoryLevel::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum ProximityLevel {
    #[default]
    None,
    Far,
    Medium,
    Close,
    VeryClose,
}

impl ProximityLevel {
    /// Closeness in `[0, 100]`, 100 meaning on top of the ghost.
    pub fn percent(distance: f32, max: f32) -> f32 {
        if max <= 0.0 {
            return 0.0;
        }
        ((max - distance) / max * 100.0).clamp(0.0, 100.0)
    }

    pub fn from_percent(percent: f32) -> Self {
        if percent > 80.0 {
            ProximityLevel::VeryClose
        } else if percent > 60.0 {
            ProximityLevel::Close
        } else if percent > 30.0 {
            ProximityLevel::Medium
        } else if percent > 10.0 {
            ProximityLevel::Far
        } else {
            ProximityLevel::None
        }
    }

    pub fn from_distance(distance: f32, max: f32) -> Self {
        Self::from_percent(Self::percent(distance, max))
    }
}

/// Filter multipliers for the proton pack icon while capturing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureGlow {
    pub brightness: f32,
    pub saturation: f32,
}

pub fn capture_glow(percent: f32) -> CaptureGlow {
    let intensity = (percent / 100.0).clamp(0.0, 1.0);
    CaptureGlow { brightness: 1.0 + intensity * 0.5, saturation: 1.0 + intensity }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuccessPulse {
    Capture,
    Deposit,
    Unlock,
}

impl SuccessPulse {
    pub fn duration(self) -> Duration {
        match self {
            SuccessPulse::Capture => Duration::from_millis(2000),
            SuccessPulse::Deposit => Duration::from_millis(1500),
            SuccessPulse::Unlock => Duration::from_millis(3000),
        }
    }

    pub fn color(self) -> u32 {
        match self {
            SuccessPulse::Capture => 0x4CAF50,
            SuccessPulse::Deposit => 0x2196F3,
            SuccessPulse::Unlock => 0xFF9800,
        }
    }

    /// Opacity and scale at `t` in `[0, 1]`: grows to 1.5x at 0.8 opacity
    /// half way, then fades out while reaching 2x.
    pub fn sample(t: f32) -> (f32, f32) {
        let e = ease_out_cubic(t);
        if e < 0.5 {
            let k = e / 0.5;
            (0.8 * k, 1.5 * k)
        } else {
            let k = (e - 0.5) / 0.5;
            (0.8 * (1.0 - k), 1.5 + 0.5 * k)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivePulse {
    pub kind: SuccessPulse,
    pub started_at: Duration,
}

impl ActivePulse {
    pub fn frame(&self, now: Duration) -> (f32, f32) {
        SuccessPulse::sample(ratio(now.saturating_sub(self.started_at), self.kind.duration()))
    }

    fn finished(&self, now: Duration) -> bool {
        now >= self.started_at + self.kind.duration()
    }
}

/// Badge changes worth a one-shot icon animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeCue {
    Shake,
    Bounce,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct Indicators {
    inventory: InventoryLevel,
    proximity_percent: f32,
    glow: Option<CaptureGlow>,
    pulses: Vec<ActivePulse>,
}

impl Indicators {
    pub fn inventory(&self) -> InventoryLevel {
        self.inventory
    }

    pub fn proximity(&self) -> ProximityLevel {
        ProximityLevel::from_percent(self.proximity_percent)
    }

    pub fn proximity_percent(&self) -> f32 {
        self.proximity_percent
    }

    pub fn glow(&self) -> Option<CaptureGlow> {
        self.glow
    }

    pub fn pulses(&self) -> &[ActivePulse] {
        &self.pulses
    }

    /// Returns a cue only when the level actually changes.
    pub fn update_inventory(&mut self, count: usize, capacity: usize) -> Option<BadgeCue> {
        let level = InventoryLevel::from_counts(count, capacity);
        if level == self.inventory {
            return None;
        }
        self.inventory = level;
        debug!("inventory badge {:?} ({}/{})", level, count, capacity);
        match level {
            InventoryLevel::Full => Some(BadgeCue::Shake),
            InventoryLevel::Warning => Some(BadgeCue::Bounce),
            InventoryLevel::Normal => None,
        }
    }

    /// Returns whether the ghost is close enough for a proximity buzz.
    pub fn update_proximity(&mut self, distance: f32, max: f32) -> bool {
        self.proximity_percent = ProximityLevel::percent(distance, max);
        self.proximity_percent > 90.0
    }

    pub fn show_capture(&mut self, percent: f32) {
        self.glow = Some(capture_glow(percent));
    }

    pub fn hide_capture(&mut self) {
        self.glow = None;
    }

    pub fn show_success(&mut self, now: Duration, kind: SuccessPulse) {
        self.pulses.push(ActivePulse { kind, started_at: now });
    }

    pub fn advance(&mut self, now: Duration) {
        self.pulses.retain(|p| !p.finished(now));
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ProximityUpdate {
    pub distance_m: f32,
}

#[allow(clippy::too_many_arguments)]
pub fn update_indicators(
    time: Res<Time>,
    config: Res<FeedbackConfig>,
    hunt: Option<Res<HuntState>>,
    mut indicators: ResMut<Indicators>,
    mut proximity: EventReader<ProximityUpdate>,
    mut ticks: EventReader<CaptureTick>,
    mut completed: EventReader<CaptureCompleted>,
    mut cancelled: EventReader<CaptureCancelled>,
    mut haptics: EventWriter<HapticRequest>,
) {
    if let Some(hunt) = hunt.filter(|h| h.is_changed()) {
        let cue = indicators.update_inventory(hunt.profile().inventory.len(), hunt.capacity());
        if cue == Some(BadgeCue::Shake) {
            haptics.send(HapticRequest(HapticToken::Success));
        }
    }

    for update in proximity.read() {
        if indicators.update_proximity(update.distance_m, config.hunt.proximity_range_m) {
            haptics.send(HapticRequest(HapticToken::Light));
        }
    }

    if let Some(tick) = ticks.read().last() {
        indicators.show_capture(tick.percent);
    }
    if completed.read().count() + cancelled.read().count() > 0 {
        indicators.hide_capture();
    }

    indicators.advance(time.elapsed());
}

pub struct IndicatorsPlugin;

impl Plugin for IndicatorsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Indicators>()
            .add_event::<ProximityUpdate>()
            .add_systems(Update, update_indicators.in_set(crate::FeedbackSet::Present));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_levels() {
        assert_eq!(InventoryLevel::from_counts(0, 5), InventoryLevel::Normal);
        assert_eq!(InventoryLevel::from_counts(3, 5), InventoryLevel::Normal);
        assert_eq!(InventoryLevel::from_counts(4, 5), InventoryLevel::Warning);
        assert_eq!(InventoryLevel::from_counts(5, 5), InventoryLevel::Full);
        assert_eq!(InventoryLevel::from_counts(7, 5), InventoryLevel::Full);
    }

    #[test]
    fn proximity_thresholds_are_exclusive() {
        assert_eq!(ProximityLevel::from_distance(0.0, 100.0), ProximityLevel::VeryClose);
        assert_eq!(ProximityLevel::from_distance(25.0, 100.0), ProximityLevel::Close);
        assert_eq!(ProximityLevel::from_distance(55.0, 100.0), ProximityLevel::Medium);
        assert_eq!(ProximityLevel::from_distance(75.0, 100.0), ProximityLevel::Far);
        assert_eq!(ProximityLevel::from_distance(95.0, 100.0), ProximityLevel::None);
        assert_eq!(ProximityLevel::from_distance(500.0, 100.0), ProximityLevel::None);

        assert_eq!(ProximityLevel::from_percent(80.0), ProximityLevel::Close);
        assert_eq!(ProximityLevel::from_percent(60.0), ProximityLevel::Medium);
        assert_eq!(ProximityLevel::from_percent(30.0), ProximityLevel::Far);
        assert_eq!(ProximityLevel::from_percent(10.0), ProximityLevel::None);
        assert_eq!(ProximityLevel::percent(-5.0, 100.0), 100.0);
    }

    #[test]
    fn glow_scales_with_progress() {
        assert_eq!(capture_glow(0.0), CaptureGlow { brightness: 1.0, saturation: 1.0 });
        assert_eq!(capture_glow(100.0), CaptureGlow { brightness: 1.5, saturation: 2.0 });
        assert_eq!(capture_glow(250.0), capture_glow(100.0));
    }

    #[test]
    fn pulse_curve_peaks_then_fades() {
        assert_eq!(SuccessPulse::sample(0.0), (0.0, 0.0));
        let (opacity, scale) = SuccessPulse::sample(1.0);
        assert!(opacity.abs() < 1e-6);
        assert!((scale - 2.0).abs() < 1e-6);
        let peak = (0..=100)
            .map(|i| SuccessPulse::sample(i as f32 / 100.0).0)
            .fold(0.0f32, f32::max);
        assert!(peak > 0.75 && peak <= 0.8);
    }

    #[test]
    fn pulses_expire_after_their_duration() {
        let mut ind = Indicators::default();
        ind.show_success(Duration::ZERO, SuccessPulse::Deposit);
        ind.show_success(Duration::ZERO, SuccessPulse::Unlock);
        ind.advance(Duration::from_millis(1499));
        assert_eq!(ind.pulses().len(), 2);
        ind.advance(Duration::from_millis(1500));
        assert_eq!(ind.pulses().len(), 1);
        ind.advance(Duration::from_millis(3000));
        assert!(ind.pulses().is_empty());
    }

    #[test]
    fn badge_cues_fire_on_change_only() {
        let mut ind = Indicators::default();
        assert_eq!(ind.update_inventory(1, 5), None);
        assert_eq!(ind.update_inventory(4, 5), Some(BadgeCue::Bounce));
        assert_eq!(ind.update_inventory(5, 5), Some(BadgeCue::Shake));
        assert_eq!(ind.update_inventory(5, 5), None);
        assert_eq!(ind.update_inventory(0, 5), None);
        assert_eq!(ind.inventory(), InventoryLevel::Normal);
    }

    #[derive(Resource, Default)]
    struct Buzzes(Vec<HapticToken>);

    fn collect(mut seen: ResMut<Buzzes>, mut events: EventReader<HapticRequest>) {
        seen.0.extend(events.read().map(|HapticRequest(t)| *t));
    }

    #[test]
    fn system_tracks_proximity_and_glow() {
        let mut app = App::new();
        app.insert_resource(Time::<()>::default());
        app.insert_resource(FeedbackConfig::default());
        app.init_resource::<Buzzes>();
        app.add_event::<HapticRequest>();
        app.add_event::<CaptureTick>();
        app.add_event::<CaptureCompleted>();
        app.add_event::<CaptureCancelled>();
        app.add_plugins(IndicatorsPlugin);
        app.add_systems(Update, collect.after(update_indicators));

        app.world_mut().send_event(ProximityUpdate { distance_m: 5.0 });
        app.world_mut().send_event(CaptureTick { percent: 50.0, raw: 0.5 });
        app.update();

        let ind = app.world().resource::<Indicators>();
        assert_eq!(ind.proximity(), ProximityLevel::VeryClose);
        assert_eq!(ind.glow(), Some(CaptureGlow { brightness: 1.25, saturation: 1.5 }));
        assert_eq!(app.world().resource::<Buzzes>().0, vec![HapticToken::Light]);

        app.world_mut().send_event(CaptureCompleted);
        app.world_mut().send_event(ProximityUpdate { distance_m: 50.0 });
        app.update();

        let ind = app.world().resource::<Indicators>();
        assert_eq!(ind.glow(), None);
        assert_eq!(ind.proximity(), ProximityLevel::Medium);
        assert_eq!(app.world().resource::<Buzzes>().0.len(), 1);
    }
}
