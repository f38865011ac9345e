//! Feedback and presentation layer for a location-based ghost hunting game:
//! capture progress, haptics, toasts, particle effects, the inventory modal
//! and HUD indicators, each as a Bevy resource advanced by its own system.

use bevy::prelude::*;

pub mod capture;
pub mod config;
pub mod easing;
pub mod effects;
pub mod haptics;
pub mod hunt;
pub mod indicators;
pub mod inventory;
pub mod toast;

use crate::config::{ConfigError, FeedbackConfig};

/// Per-frame ordering on `Update`: host input first, then the capture
/// machine, then particles, then everything the player sees or feels.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedbackSet {
    Input,
    Capture,
    Effects,
    Present,
}

#[derive(Default)]
pub struct FeedbackPlugin {
    pub config: FeedbackConfig,
}

impl FeedbackPlugin {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self { config: FeedbackConfig::from_env()? })
    }
}

impl Plugin for FeedbackPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone()).configure_sets(
            Update,
            (
                FeedbackSet::Input,
                FeedbackSet::Capture,
                FeedbackSet::Effects,
                FeedbackSet::Present,
            )
                .chain(),
        );
        app.add_plugins((
            haptics::HapticsPlugin,
            toast::ToastPlugin,
            effects::EffectsPlugin,
            capture::CapturePlugin,
            inventory::InventoryPlugin,
            indicators::IndicatorsPlugin,
        ));
    }
}
