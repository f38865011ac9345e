//! Inventory modal: open/close animation timing and staggered row reveal over
//! a read-only snapshot of the player's inventory.

use bevy::prelude::*;
use std::time::Duration;

use crate::config::{FeedbackConfig, ModalTimings};
use crate::haptics::{HapticRequest, HapticToken};
use crate::hunt::{GhostKind, HuntState, InventoryItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModalVisibility {
    #[default]
    Hidden,
    Showing,
    Shown,
    Hiding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rarity {
    Common,
    Rare,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRow {
    pub item_id: u64,
    pub icon: &'static str,
    pub title: &'static str,
    pub points: u32,
    pub rarity: Rarity,
}

impl From<&InventoryItem> for InventoryRow {
    fn from(item: &InventoryItem) -> Self {
        let (icon, rarity) = match item.kind {
            GhostKind::Common => ("👻", Rarity::Common),
            GhostKind::Strong => ("👹", Rarity::Rare),
        };
        Self { item_id: item.id, icon, title: item.kind.label(), points: item.points, rarity }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Listing {
    /// Placeholder row inviting the player to go hunting.
    #[default]
    Empty,
    Rows(Vec<InventoryRow>),
}

impl Listing {
    /// Number of animated list entries; the placeholder counts as one.
    pub fn slots(&self) -> usize {
        match self {
            Listing::Empty => 1,
            Listing::Rows(rows) => rows.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalEffect {
    Haptic(HapticToken),
    /// Entry animation finished.
    Opened,
    Hidden,
    RowRevealed(usize),
    GlowEnded,
    PulseEnded,
}

#[derive(Resource, Debug, Clone)]
pub struct InventoryModal {
    timings: ModalTimings,
    is_open: bool,
    animating_until: Option<Duration>,
    visibility: ModalVisibility,
    listing: Listing,
    stagger_from: Option<Duration>,
    revealed: usize,
    glow_until: Option<Duration>,
    pulse_until: Option<Duration>,
    pending: Vec<ModalEffect>,
}

impl Default for InventoryModal {
    fn default() -> Self {
        Self::new(ModalTimings::default())
    }
}

impl InventoryModal {
    pub fn new(timings: ModalTimings) -> Self {
        Self {
            timings,
            is_open: false,
            animating_until: None,
            visibility: ModalVisibility::Hidden,
            listing: Listing::Empty,
            stagger_from: None,
            revealed: 0,
            glow_until: None,
            pulse_until: None,
            pending: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_animating(&self) -> bool {
        self.animating_until.is_some()
    }

    pub fn visibility(&self) -> ModalVisibility {
        self.visibility
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    pub fn revealed_rows(&self) -> usize {
        self.revealed
    }

    pub fn is_glowing(&self) -> bool {
        self.glow_until.is_some()
    }

    pub fn is_pulsing(&self) -> bool {
        self.pulse_until.is_some()
    }

    pub fn open(&mut self, now: Duration) -> bool {
        self.settle(now);
        if self.is_animating() || self.is_open {
            return false;
        }
        self.is_open = true;
        self.visibility = ModalVisibility::Showing;
        self.animating_until = Some(now + self.timings.entry);
        self.pending.push(ModalEffect::Haptic(HapticToken::ModalOpen));
        true
    }

    pub fn close(&mut self, now: Duration) -> bool {
        self.settle(now);
        if self.is_animating() || !self.is_open {
            return false;
        }
        self.is_open = false;
        self.visibility = ModalVisibility::Hiding;
        self.animating_until = Some(now + self.timings.exit);
        self.stagger_from = None;
        self.pending.push(ModalEffect::Haptic(HapticToken::ButtonPress));
        true
    }

    pub fn toggle(&mut self, now: Duration) -> bool {
        if self.is_open {
            self.close(now)
        } else {
            self.open(now)
        }
    }

    /// Hides immediately, abandoning any animation in flight along with the
    /// open/close feedback it had queued.
    pub fn force_close(&mut self) {
        self.is_open = false;
        self.animating_until = None;
        self.visibility = ModalVisibility::Hidden;
        self.stagger_from = None;
        self.pending.retain(|effect| {
            !matches!(
                effect,
                ModalEffect::Haptic(HapticToken::ModalOpen | HapticToken::ButtonPress)
                    | ModalEffect::Opened
                    | ModalEffect::RowRevealed(_)
            )
        });
    }

    pub fn show_items(&mut self, now: Duration, items: &[InventoryItem]) {
        self.listing = if items.is_empty() {
            Listing::Empty
        } else {
            Listing::Rows(items.iter().map(InventoryRow::from).collect())
        };
        self.revealed = 0;
        if self.is_open {
            self.stagger_from = Some(now + self.timings.refresh_delay);
        }
    }

    pub fn celebrate_new_item(&mut self, now: Duration) -> bool {
        if !self.is_open {
            return false;
        }
        self.glow_until = Some(now + self.timings.celebrate_glow);
        self.pending.push(ModalEffect::Haptic(HapticToken::Success));
        true
    }

    pub fn pulse_full(&mut self, now: Duration) {
        self.pulse_until = Some(now + self.timings.full_pulse);
    }

    /// Runs the timers due at `now` and drains the effects produced since
    /// the previous call.
    pub fn advance(&mut self, now: Duration) -> Vec<ModalEffect> {
        self.settle(now);
        std::mem::take(&mut self.pending)
    }

    fn settle(&mut self, now: Duration) {
        let out = &mut self.pending;

        if let Some(until) = self.animating_until.filter(|until| *until <= now) {
            self.animating_until = None;
            if self.is_open {
                self.visibility = ModalVisibility::Shown;
                self.stagger_from = Some(until);
                self.revealed = 0;
                out.push(ModalEffect::Opened);
            } else {
                self.visibility = ModalVisibility::Hidden;
                out.push(ModalEffect::Hidden);
            }
        }

        if let Some(from) = self.stagger_from {
            while self.revealed < self.listing.slots()
                && from + self.timings.item_stagger * (self.revealed as u32) <= now
            {
                out.push(ModalEffect::RowRevealed(self.revealed));
                self.revealed += 1;
            }
            if self.revealed >= self.listing.slots() {
                self.stagger_from = None;
            }
        }

        if self.glow_until.is_some_and(|until| until <= now) {
            self.glow_until = None;
            out.push(ModalEffect::GlowEnded);
        }
        if self.pulse_until.is_some_and(|until| until <= now) {
            self.pulse_until = None;
            out.push(ModalEffect::PulseEnded);
        }
    }
}

/// Host request to open or close the inventory.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryToggle {
    Open,
    Close,
    Toggle,
}

pub fn run_inventory_modal(
    time: Res<Time>,
    hunt: Option<Res<HuntState>>,
    mut modal: ResMut<InventoryModal>,
    mut toggles: EventReader<InventoryToggle>,
    mut haptics: EventWriter<HapticRequest>,
) {
    let now = time.elapsed();
    if let Some(hunt) = hunt.filter(|h| h.is_changed()) {
        modal.show_items(now, &hunt.profile().inventory);
    }
    for toggle in toggles.read() {
        let changed = match toggle {
            InventoryToggle::Open => modal.open(now),
            InventoryToggle::Close => modal.close(now),
            InventoryToggle::Toggle => modal.toggle(now),
        };
        if !changed {
            debug!("inventory {:?} ignored while {:?}", toggle, modal.visibility());
        }
    }
    for effect in modal.advance(now) {
        match effect {
            ModalEffect::Haptic(token) => {
                haptics.send(HapticRequest(token));
            }
            other => debug!("inventory modal {:?}", other),
        }
    }
}

pub struct InventoryPlugin;

impl Plugin for InventoryPlugin {
    fn build(&self, app: &mut App) {
        let timings = app
            .world()
            .get_resource::<FeedbackConfig>()
            .map(|c| c.modal)
            .unwrap_or_default();
        app.insert_resource(InventoryModal::new(timings))
            .add_event::<InventoryToggle>()
            .add_systems(Update, run_inventory_modal.in_set(crate::FeedbackSet::Present));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn items(n: u64) -> Vec<InventoryItem> {
        (0..n)
            .map(|i| {
                let kind = if i % 2 == 0 { GhostKind::Common } else { GhostKind::Strong };
                InventoryItem { id: 1000 + i, kind, points: kind.points() }
            })
            .collect()
    }

    fn revealed(effects: &[ModalEffect]) -> Vec<usize> {
        effects
            .iter()
            .filter_map(|e| match e {
                ModalEffect::RowRevealed(i) => Some(*i),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn open_animates_then_staggers_rows() {
        let mut modal = InventoryModal::default();
        modal.show_items(ms(0), &items(3));

        assert!(modal.open(ms(0)));
        assert_eq!(modal.advance(ms(0)), vec![ModalEffect::Haptic(HapticToken::ModalOpen)]);
        assert!(modal.is_animating());
        assert!(!modal.open(ms(100)));

        let effects = modal.advance(ms(200));
        assert_eq!(effects, vec![ModalEffect::Opened, ModalEffect::RowRevealed(0)]);
        assert_eq!(modal.visibility(), ModalVisibility::Shown);
        assert!(revealed(&modal.advance(ms(299))).is_empty());
        assert_eq!(revealed(&modal.advance(ms(300))), vec![1]);
        assert_eq!(revealed(&modal.advance(ms(1000))), vec![2]);
        assert_eq!(modal.revealed_rows(), 3);
    }

    #[test]
    fn close_hides_after_exit() {
        let mut modal = InventoryModal::default();
        assert!(!modal.close(ms(0)));
        modal.open(ms(0));
        assert!(!modal.close(ms(100)));
        modal.advance(ms(200));

        assert!(modal.close(ms(500)));
        assert_eq!(modal.advance(ms(500)), vec![ModalEffect::Haptic(HapticToken::ButtonPress)]);
        assert_eq!(modal.visibility(), ModalVisibility::Hiding);
        assert!(modal.advance(ms(899)).is_empty());
        assert_eq!(modal.advance(ms(900)), vec![ModalEffect::Hidden]);
        assert_eq!(modal.visibility(), ModalVisibility::Hidden);
    }

    #[test]
    fn refreshing_an_open_modal_restaggers() {
        let mut modal = InventoryModal::default();
        modal.open(ms(0));
        modal.advance(ms(1000));
        assert_eq!(modal.listing(), &Listing::Empty);
        assert_eq!(modal.revealed_rows(), 1);

        modal.show_items(ms(2000), &items(2));
        assert!(revealed(&modal.advance(ms(2049))).is_empty());
        assert_eq!(revealed(&modal.advance(ms(2050))), vec![0]);
        assert_eq!(revealed(&modal.advance(ms(2150))), vec![1]);

        let Listing::Rows(rows) = modal.listing() else { panic!("expected rows") };
        assert_eq!(rows[0].rarity, Rarity::Common);
        assert_eq!(rows[1].icon, "👹");
        assert_eq!(rows[1].points, 25);
    }

    #[test]
    fn closed_modal_does_not_stagger() {
        let mut modal = InventoryModal::default();
        modal.show_items(ms(0), &items(2));
        assert!(modal.advance(ms(5000)).is_empty());
        assert_eq!(modal.revealed_rows(), 0);
    }

    #[test]
    fn celebration_needs_an_open_modal() {
        let mut modal = InventoryModal::default();
        assert!(!modal.celebrate_new_item(ms(0)));

        modal.open(ms(0));
        modal.advance(ms(200));
        assert!(modal.celebrate_new_item(ms(300)));
        assert!(modal.is_glowing());
        assert_eq!(modal.advance(ms(300)), vec![ModalEffect::Haptic(HapticToken::Success)]);
        assert_eq!(modal.advance(ms(1300)), vec![ModalEffect::GlowEnded]);
    }

    #[test]
    fn full_pulse_and_force_close() {
        let mut modal = InventoryModal::default();
        modal.pulse_full(ms(0));
        assert!(modal.is_pulsing());
        modal.open(ms(10));
        modal.force_close();
        assert!(!modal.is_open());
        assert!(!modal.is_animating());
        assert_eq!(modal.visibility(), ModalVisibility::Hidden);

        assert_eq!(modal.advance(ms(2000)), vec![ModalEffect::PulseEnded]);
        assert!(modal.open(ms(2000)));
    }

    #[test]
    fn force_close_drops_the_queued_open_buzz() {
        let mut modal = InventoryModal::default();
        modal.open(ms(0));
        modal.celebrate_new_item(ms(0));
        modal.force_close();

        assert_eq!(modal.advance(ms(16)), vec![ModalEffect::Haptic(HapticToken::Success)]);
        assert!(modal.advance(ms(500)).iter().all(|e| !matches!(e, ModalEffect::Opened)));
    }

    #[derive(Resource, Default)]
    struct Buzzes(Vec<HapticToken>);

    fn collect(mut seen: ResMut<Buzzes>, mut events: EventReader<HapticRequest>) {
        seen.0.extend(events.read().map(|HapticRequest(t)| *t));
    }

    #[test]
    fn toggle_events_drive_the_modal() {
        let mut app = App::new();
        app.insert_resource(Time::<()>::default());
        app.init_resource::<Buzzes>();
        app.add_event::<HapticRequest>();
        app.add_plugins(InventoryPlugin);
        app.add_systems(Update, collect.after(run_inventory_modal));

        app.world_mut().send_event(InventoryToggle::Toggle);
        app.update();
        assert!(app.world().resource::<InventoryModal>().is_open());

        app.world_mut().send_event(InventoryToggle::Close);
        app.update();
        assert!(app.world().resource::<InventoryModal>().is_open());

        app.world_mut().resource_mut::<Time>().advance_by(ms(250));
        app.world_mut().send_event(InventoryToggle::Toggle);
        app.update();
        assert!(!app.world().resource::<InventoryModal>().is_open());
        assert_eq!(
            app.world().resource::<Buzzes>().0,
            vec![HapticToken::ModalOpen, HapticToken::ButtonPress]
        );
    }
}
