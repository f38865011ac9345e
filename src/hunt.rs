//! Hunt bookkeeping: the part of the game controller the feedback layer
//! reacts to. Owns the player profile and decides whether a capture may start.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::capture::{CaptureCancelled, CaptureCommand, CaptureCompleted, CaptureProgress};
use crate::config::{FeedbackConfig, HuntSettings};
use crate::effects::{CelebrationKind, EffectAnchors, EffectRequest, ScheduleEffect, ScreenPoint};
use crate::haptics::{HapticRequest, HapticToken};
use crate::indicators::{Indicators, SuccessPulse};
use crate::inventory::InventoryModal;
use crate::toast::ShowToast;

const STRONG_GHOST_CHANCE: f64 = 0.25;
const FULL_WARNING: Duration = Duration::from_millis(6000);
const ECTO1_TOAST: Duration = Duration::from_millis(8000);
const ECTO1_CELEBRATION_DELAY: Duration = Duration::from_millis(1000);
const FULL_WARNING_TEXT: &str =
    "Inventory full! Find a Containment Unit to deposit your ghosts.";
const FULL_REFUSAL: &str = "Inventory full! Deposit your ghosts first.";

#[derive(Debug, thiserror::Error)]
pub enum HuntError {
    #[error("{0:?} is not a containment unit code")]
    InvalidCode(String),
    #[error("inventory full ({capacity} ghosts)")]
    InventoryFull { capacity: usize },
    #[error("profile codec: {0}")]
    Codec(#[from] bincode::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GhostKind {
    Common,
    Strong,
}

impl GhostKind {
    pub fn points(self) -> u32 {
        match self {
            GhostKind::Common => 10,
            GhostKind::Strong => 25,
        }
    }

    pub fn capture_duration(self) -> Duration {
        match self {
            GhostKind::Common => Duration::from_millis(5000),
            GhostKind::Strong => Duration::from_millis(8000),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GhostKind::Common => "Common Ghost",
            GhostKind::Strong => "Strong Ghost",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InventoryItem {
    pub id: u64,
    pub kind: GhostKind,
    pub points: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PlayerProfile {
    pub points: u32,
    pub captures: u32,
    pub inventory: Vec<InventoryItem>,
    pub ecto1_unlocked: bool,
}

impl PlayerProfile {
    pub fn to_bytes(&self) -> Result<Vec<u8>, HuntError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HuntError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// The ghost currently placed in front of the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureTarget {
    pub kind: GhostKind,
    pub screen: ScreenPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRecord {
    pub item: InventoryItem,
    pub inventory_full: bool,
    /// Set only on the capture that crossed the unlock threshold.
    pub ecto1_unlocked: bool,
}

#[derive(Resource, Debug, Clone)]
pub struct HuntState {
    settings: HuntSettings,
    profile: PlayerProfile,
    target: Option<CaptureTarget>,
    last_item_id: u64,
    rng: StdRng,
}

impl HuntState {
    pub fn new(settings: HuntSettings, seed: u64) -> Self {
        Self::with_profile(settings, seed, PlayerProfile::default())
    }

    pub fn with_profile(settings: HuntSettings, seed: u64, profile: PlayerProfile) -> Self {
        let last_item_id = profile.inventory.iter().map(|i| i.id).max().unwrap_or(0);
        Self { settings, profile, target: None, last_item_id, rng: StdRng::seed_from_u64(seed) }
    }

    pub fn profile(&self) -> &PlayerProfile {
        &self.profile
    }

    pub fn capacity(&self) -> usize {
        self.settings.inventory_capacity
    }

    pub fn target(&self) -> Option<CaptureTarget> {
        self.target
    }

    pub fn is_full(&self) -> bool {
        self.profile.inventory.len() >= self.settings.inventory_capacity
    }

    pub fn can_capture(&self) -> bool {
        !self.is_full()
    }

    /// Places the next ghost at `screen`, one in four being strong.
    /// Nothing spawns while the inventory is full.
    pub fn spawn_ghost(&mut self, screen: ScreenPoint) -> Option<CaptureTarget> {
        self.target = if self.is_full() {
            None
        } else {
            let kind = if self.rng.gen_bool(STRONG_GHOST_CHANCE) {
                GhostKind::Strong
            } else {
                GhostKind::Common
            };
            Some(CaptureTarget { kind, screen })
        };
        self.target
    }

    /// Timestamp-based item id, bumped when two captures share a millisecond.
    pub fn next_item_id(&mut self, now: Duration) -> u64 {
        let id = (now.as_millis() as u64).max(self.last_item_id + 1);
        self.last_item_id = id;
        id
    }

    /// Stores a captured ghost. Refused once the inventory holds `capacity`
    /// items, whatever path the capture took to complete.
    pub fn record_capture(&mut self, id: u64, kind: GhostKind) -> Result<CaptureRecord, HuntError> {
        if self.is_full() {
            return Err(HuntError::InventoryFull { capacity: self.capacity() });
        }
        let item = InventoryItem { id, kind, points: kind.points() };
        self.profile.inventory.push(item.clone());
        self.profile.points += item.points;
        self.profile.captures += 1;
        self.target = None;

        let unlock = !self.profile.ecto1_unlocked
            && self.profile.captures >= self.settings.ecto1_unlock_captures;
        if unlock {
            self.profile.ecto1_unlocked = true;
        }
        Ok(CaptureRecord { item, inventory_full: self.is_full(), ecto1_unlocked: unlock })
    }

    /// Empties the inventory into the containment unit identified by `code`.
    pub fn deposit(&mut self, code: &str) -> Result<usize, HuntError> {
        if code != self.settings.containment_code {
            return Err(HuntError::InvalidCode(code.to_string()));
        }
        let count = self.profile.inventory.len();
        self.profile.inventory.clear();
        Ok(count)
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureInput {
    Press,
    Release,
}

/// A scanned containment unit code.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct DepositRequest(pub String);

pub fn handle_capture_input(
    hunt: Res<HuntState>,
    progress: Res<CaptureProgress>,
    mut inputs: EventReader<CaptureInput>,
    mut commands: EventWriter<CaptureCommand>,
    mut toasts: EventWriter<ShowToast>,
    mut haptics: EventWriter<HapticRequest>,
) {
    for input in inputs.read() {
        match input {
            CaptureInput::Press => {
                if progress.is_capturing() {
                    continue;
                }
                if !hunt.can_capture() {
                    toasts.send(ShowToast::warning(FULL_REFUSAL));
                    haptics.send(HapticRequest(HapticToken::InventoryFull));
                    continue;
                }
                match hunt.target() {
                    Some(target) => {
                        let duration = target.kind.capture_duration();
                        commands.send(CaptureCommand::Start { duration });
                    }
                    None => debug!("capture pressed with no ghost placed"),
                }
            }
            CaptureInput::Release => {
                commands.send(CaptureCommand::Cancel);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_capture_outcome(
    time: Res<Time>,
    config: Res<FeedbackConfig>,
    anchors: Res<EffectAnchors>,
    mut hunt: ResMut<HuntState>,
    mut completed: EventReader<CaptureCompleted>,
    mut cancelled: EventReader<CaptureCancelled>,
    mut fx: EventWriter<EffectRequest>,
    mut delayed: EventWriter<ScheduleEffect>,
    mut toasts: EventWriter<ShowToast>,
    mut haptics: EventWriter<HapticRequest>,
    mut modal: ResMut<InventoryModal>,
    mut indicators: ResMut<Indicators>,
) {
    let now = time.elapsed();
    let delay = config.effects.celebration_delay;

    for _ in completed.read() {
        let kind = hunt.target().map_or(GhostKind::Common, |t| t.kind);
        let id = hunt.next_item_id(now);
        let record = match hunt.record_capture(id, kind) {
            Ok(record) => record,
            Err(err) => {
                warn!("capture discarded: {}", err);
                haptics.send(HapticRequest(HapticToken::InventoryFull));
                toasts.send(ShowToast::warning(FULL_REFUSAL));
                continue;
            }
        };
        info!(
            "captured {} (+{}), {}/{} in inventory",
            kind.label(),
            record.item.points,
            hunt.profile().inventory.len(),
            hunt.capacity()
        );

        fx.send(EffectRequest::Suction { from: anchors.ghost, to: anchors.pack });
        delayed.send(ScheduleEffect {
            after: delay,
            request: EffectRequest::Celebration {
                at: anchors.pack,
                kind: CelebrationKind::GhostCaptured,
            },
        });
        indicators.show_success(now, SuccessPulse::Capture);
        modal.celebrate_new_item(now);
        toasts.send(ShowToast::success(format!(
            "Ghost captured! You now have {} points.",
            hunt.profile().points
        )));

        if record.inventory_full {
            haptics.send(HapticRequest(HapticToken::InventoryFull));
            fx.send(EffectRequest::Celebration {
                at: anchors.pack,
                kind: CelebrationKind::InventoryFull,
            });
            modal.pulse_full(now);
            toasts.send(ShowToast::warning(FULL_WARNING_TEXT).with_duration(FULL_WARNING));
        }
        if record.ecto1_unlocked {
            info!("ecto-1 unlocked after {} captures", hunt.profile().captures);
            delayed.send(ScheduleEffect {
                after: ECTO1_CELEBRATION_DELAY,
                request: EffectRequest::Celebration {
                    at: anchors.center,
                    kind: CelebrationKind::Ecto1Unlocked,
                },
            });
            indicators.show_success(now, SuccessPulse::Unlock);
            toasts.send(
                ShowToast::success("ECTO-1 UNLOCKED! Something special appeared on the map.")
                    .with_duration(ECTO1_TOAST),
            );
        }

        hunt.spawn_ghost(anchors.ghost);
    }

    for _ in cancelled.read() {
        toasts.send(ShowToast::error("Capture failed! The ghost escaped!"));
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_deposits(
    time: Res<Time>,
    anchors: Res<EffectAnchors>,
    mut hunt: ResMut<HuntState>,
    mut requests: EventReader<DepositRequest>,
    mut toasts: EventWriter<ShowToast>,
    mut haptics: EventWriter<HapticRequest>,
    mut indicators: ResMut<Indicators>,
) {
    let now = time.elapsed();
    for DepositRequest(code) in requests.read() {
        match hunt.deposit(code) {
            Ok(count) => {
                info!("deposited {} ghosts", count);
                haptics.send(HapticRequest(HapticToken::Success));
                indicators.show_success(now, SuccessPulse::Deposit);
                toasts.send(ShowToast::success("Ghosts deposited successfully!"));
                hunt.spawn_ghost(anchors.ghost);
            }
            Err(err) => {
                warn!("deposit refused: {}", err);
                haptics.send(HapticRequest(HapticToken::Error));
                toasts.send(ShowToast::error("Invalid QR code!"));
            }
        }
    }
}

pub struct HuntPlugin;

impl Plugin for HuntPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<HuntState>() {
            let config = app.world().get_resource::<FeedbackConfig>().cloned().unwrap_or_default();
            app.insert_resource(HuntState::new(config.hunt, config.effects.seed));
        }
        app.add_event::<CaptureInput>()
            .add_event::<DepositRequest>()
            .add_systems(
                Update,
                (handle_capture_outcome, handle_deposits, handle_capture_input)
                    .chain()
                    .in_set(crate::FeedbackSet::Input),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE: &str = "GHOSTBUSTERS_CONTAINMENT_UNIT_01";

    fn state() -> HuntState {
        HuntState::new(HuntSettings::default(), 1)
    }

    #[test]
    fn ghost_kinds_carry_points_and_durations() {
        assert_eq!(GhostKind::Common.points(), 10);
        assert_eq!(GhostKind::Strong.points(), 25);
        assert_eq!(GhostKind::Common.capture_duration(), Duration::from_millis(5000));
        assert_eq!(GhostKind::Strong.capture_duration(), Duration::from_millis(8000));
    }

    #[test]
    fn full_inventory_refuses_captures() {
        let mut hunt = state();
        for i in 0..4 {
            assert!(hunt.can_capture());
            let record = hunt.record_capture(i, GhostKind::Common).unwrap();
            assert!(!record.inventory_full);
        }
        let record = hunt.record_capture(4, GhostKind::Strong).unwrap();
        assert!(record.inventory_full);
        assert!(!hunt.can_capture());
        assert_eq!(hunt.spawn_ghost(Vec2::ZERO), None);
        assert_eq!(hunt.profile().points, 65);

        let err = hunt.record_capture(5, GhostKind::Common).unwrap_err();
        assert!(matches!(err, HuntError::InventoryFull { capacity: 5 }));
        assert_eq!(hunt.profile().inventory.len(), 5);
        assert_eq!(hunt.profile().captures, 5);
        assert_eq!(hunt.profile().points, 65);
    }

    #[test]
    fn ecto1_unlocks_exactly_once() {
        let mut hunt = state();
        let mut unlocks = 0;
        for i in 0..12 {
            if hunt.is_full() {
                hunt.deposit(CODE).unwrap();
            }
            if hunt.record_capture(i, GhostKind::Common).unwrap().ecto1_unlocked {
                unlocks += 1;
                assert_eq!(hunt.profile().captures, 5);
            }
        }
        assert_eq!(unlocks, 1);
        assert!(hunt.profile().ecto1_unlocked);
    }

    #[test]
    fn deposit_checks_the_code() {
        let mut hunt = state();
        hunt.record_capture(1, GhostKind::Common).unwrap();
        hunt.record_capture(2, GhostKind::Strong).unwrap();

        let err = hunt.deposit("PIZZA_PLACE").unwrap_err();
        assert!(matches!(err, HuntError::InvalidCode(ref c) if c == "PIZZA_PLACE"));
        assert_eq!(hunt.profile().inventory.len(), 2);

        assert_eq!(hunt.deposit(CODE).unwrap(), 2);
        assert!(hunt.profile().inventory.is_empty());
        assert_eq!(hunt.profile().points, 35);
    }

    #[test]
    fn item_ids_stay_unique_within_a_millisecond() {
        let mut hunt = state();
        let now = Duration::from_millis(1234);
        let a = hunt.next_item_id(now);
        let b = hunt.next_item_id(now);
        assert_eq!(a, 1234);
        assert_eq!(b, 1235);
    }

    #[test]
    fn spawned_ghosts_mix_kinds() {
        let mut hunt = state();
        let kinds: Vec<_> =
            (0..200).filter_map(|_| hunt.spawn_ghost(Vec2::ZERO)).map(|t| t.kind).collect();
        assert_eq!(kinds.len(), 200);
        assert!(kinds.contains(&GhostKind::Common));
        assert!(kinds.contains(&GhostKind::Strong));
    }

    #[test]
    fn profile_round_trips_through_bincode() {
        let mut hunt = state();
        hunt.record_capture(42, GhostKind::Strong).unwrap();
        let bytes = hunt.profile().to_bytes().unwrap();
        assert_eq!(PlayerProfile::from_bytes(&bytes).unwrap(), *hunt.profile());

        assert!(matches!(PlayerProfile::from_bytes(&[0xff]), Err(HuntError::Codec(_))));
    }

    fn hunt_app() -> App {
        let mut app = App::new();
        app.insert_resource(Time::<()>::default());
        app.add_plugins((crate::FeedbackPlugin::default(), HuntPlugin));
        app
    }

    fn frame(app: &mut App) {
        app.world_mut().resource_mut::<Time>().advance_by(Duration::from_millis(16));
        app.update();
    }

    #[test]
    fn pressing_with_full_inventory_warns_instead_of_starting() {
        let mut app = hunt_app();
        {
            let mut hunt = app.world_mut().resource_mut::<HuntState>();
            for i in 0..5 {
                hunt.record_capture(i, GhostKind::Common).unwrap();
            }
        }
        app.world_mut().send_event(CaptureInput::Press);
        frame(&mut app);
        frame(&mut app);

        assert!(!app.world().resource::<CaptureProgress>().is_capturing());
        let toasts = app.world().resource::<crate::toast::ToastQueue>();
        assert_eq!(toasts.visible_count(), 1);
        assert_eq!(
            toasts.visible().next().map(|t| t.severity),
            Some(crate::toast::Severity::Warning)
        );
    }

    #[test]
    fn completed_capture_lands_in_the_inventory() {
        let mut app = hunt_app();
        app.world_mut().resource_mut::<HuntState>().target =
            Some(CaptureTarget { kind: GhostKind::Common, screen: Vec2::new(195.0, 422.0) });

        app.world_mut().send_event(CaptureInput::Press);
        frame(&mut app);
        assert!(app.world().resource::<CaptureProgress>().is_capturing());

        // 5 s capture plus a few frames for the outcome to propagate.
        for _ in 0..320 {
            frame(&mut app);
        }

        let hunt = app.world().resource::<HuntState>();
        assert_eq!(hunt.profile().captures, 1);
        assert_eq!(hunt.profile().points, 10);
        assert!(hunt.target().is_some());
        let toasts = app.world().resource::<crate::toast::ToastQueue>();
        assert!(toasts.visible().any(|t| t.message == "Ghost captured! You now have 10 points."));
    }

    #[test]
    fn direct_start_cannot_overfill_the_inventory() {
        let mut app = hunt_app();
        {
            let mut hunt = app.world_mut().resource_mut::<HuntState>();
            for i in 0..5 {
                hunt.record_capture(i, GhostKind::Common).unwrap();
            }
            hunt.target = Some(CaptureTarget { kind: GhostKind::Common, screen: Vec2::ZERO });
        }

        app.world_mut().send_event(CaptureCommand::Start { duration: Duration::from_millis(500) });
        for _ in 0..120 {
            frame(&mut app);
        }

        let hunt = app.world().resource::<HuntState>();
        assert_eq!(hunt.profile().inventory.len(), 5);
        assert_eq!(hunt.profile().captures, 5);
        let toasts = app.world().resource::<crate::toast::ToastQueue>();
        assert!(toasts.visible().any(|t| t.message == FULL_REFUSAL));
        assert!(!toasts.visible().any(|t| t.message.starts_with("Ghost captured!")));
    }

    #[test]
    fn bad_code_keeps_the_inventory() {
        let mut app = hunt_app();
        app.world_mut().resource_mut::<HuntState>().record_capture(1, GhostKind::Strong).unwrap();

        app.world_mut().send_event(DepositRequest("NOPE".into()));
        frame(&mut app);
        assert_eq!(app.world().resource::<HuntState>().profile().inventory.len(), 1);

        app.world_mut().send_event(DepositRequest(CODE.into()));
        frame(&mut app);
        assert!(app.world().resource::<HuntState>().profile().inventory.is_empty());
        let toasts = app.world().resource::<crate::toast::ToastQueue>();
        let messages: Vec<_> = toasts.visible().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["Invalid QR code!", "Ghosts deposited successfully!"]);
    }
}
