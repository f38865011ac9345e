use bevy::prelude::*;
use std::env;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
}

/// Timing of the capture progress bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureTimings {
    /// Bar entry animation before progress starts counting frames.
    pub entry_delay: Duration,
    /// Hold at 100 % before the bar starts hiding.
    pub completion_hold: Duration,
    pub hide: Duration,
    /// Releases closer than this to the start are treated as accidental.
    pub cancel_guard: Duration,
    /// Drain animation after an accepted cancel.
    pub cancel_drain: Duration,
}

impl Default for CaptureTimings {
    fn default() -> Self {
        Self {
            entry_delay: Duration::from_millis(300),
            completion_hold: Duration::from_millis(800),
            hide: Duration::from_millis(300),
            cancel_guard: Duration::from_millis(300),
            cancel_drain: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToastSettings {
    pub max_visible: usize,
    pub default_duration: Duration,
    pub exit: Duration,
}

impl Default for ToastSettings {
    fn default() -> Self {
        Self {
            max_visible: 5,
            default_duration: Duration::from_millis(4000),
            exit: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModalTimings {
    pub entry: Duration,
    pub exit: Duration,
    pub item_stagger: Duration,
    pub refresh_delay: Duration,
    pub celebrate_glow: Duration,
    pub full_pulse: Duration,
}

impl Default for ModalTimings {
    fn default() -> Self {
        Self {
            entry: Duration::from_millis(200),
            exit: Duration::from_millis(400),
            item_stagger: Duration::from_millis(100),
            refresh_delay: Duration::from_millis(50),
            celebrate_glow: Duration::from_millis(1000),
            full_pulse: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectSettings {
    /// Skips particle spawning entirely (prefers-reduced-motion).
    pub reduced_motion: bool,
    pub seed: u64,
    /// Reference frame the per-frame particle constants were tuned for.
    pub frame: Duration,
    pub beam_linger: Duration,
    /// Celebration delay after the suction effect on a successful capture.
    pub celebration_delay: Duration,
    pub screen_size: Vec2,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            reduced_motion: false,
            seed: 0x6e6f_7420_6166_7261,
            frame: Duration::from_millis(16),
            beam_linger: Duration::from_millis(500),
            celebration_delay: Duration::from_millis(500),
            screen_size: Vec2::new(390.0, 844.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HuntSettings {
    pub inventory_capacity: usize,
    pub ecto1_unlock_captures: u32,
    pub containment_code: String,
    /// Distance at which the proximity indicator starts reacting.
    pub proximity_range_m: f32,
}

impl Default for HuntSettings {
    fn default() -> Self {
        Self {
            inventory_capacity: 5,
            ecto1_unlock_captures: 5,
            containment_code: "GHOSTBUSTERS_CONTAINMENT_UNIT_01".to_string(),
            proximity_range_m: 100.0,
        }
    }
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct FeedbackConfig {
    pub capture: CaptureTimings,
    pub toast: ToastSettings,
    pub modal: ModalTimings,
    pub effects: EffectSettings,
    pub hunt: HuntSettings,
}

impl FeedbackConfig {
    /// Defaults with `GHOST_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply(|var| env::var(var).ok())?;
        Ok(config)
    }

    fn apply(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(n) = parse_var::<usize>(&lookup, "GHOST_TOAST_MAX", "count")? {
            if n == 0 {
                return Err(ConfigError::Zero { var: "GHOST_TOAST_MAX" });
            }
            self.toast.max_visible = n;
        }
        if let Some(ms) =
            parse_var::<u64>(&lookup, "GHOST_TOAST_DURATION_MS", "millisecond count")?
        {
            self.toast.default_duration = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "GHOST_CANCEL_GUARD_MS", "millisecond count")? {
            self.capture.cancel_guard = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var::<usize>(&lookup, "GHOST_INVENTORY_CAPACITY", "count")? {
            if n == 0 {
                return Err(ConfigError::Zero { var: "GHOST_INVENTORY_CAPACITY" });
            }
            self.hunt.inventory_capacity = n;
        }
        if let Some(seed) = parse_var::<u64>(&lookup, "GHOST_FX_SEED", "integer seed")? {
            self.effects.seed = seed;
        }
        if let Some(raw) = lookup("GHOST_REDUCED_MOTION") {
            let flag = match raw.trim() {
                "1" | "true" | "TRUE" => Some(true),
                "0" | "false" | "FALSE" | "" => Some(false),
                _ => None,
            };
            self.effects.reduced_motion = flag.ok_or(ConfigError::Invalid {
                var: "GHOST_REDUCED_MOTION",
                value: raw,
                expected: "boolean",
            })?;
        }
        if let Some(code) = lookup("GHOST_CONTAINMENT_CODE") {
            let code = code.trim();
            if !code.is_empty() {
                self.hunt.containment_code = code.to_string();
            }
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(var) else { return Ok(None) };
    let parsed = raw.trim().parse::<T>();
    parsed
        .map(Some)
        .map_err(|_| ConfigError::Invalid { var, value: raw, expected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn apply(pairs: &[(&str, &str)]) -> Result<FeedbackConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = FeedbackConfig::default();
        config.apply(|k| vars.get(k).cloned())?;
        Ok(config)
    }

    #[test]
    fn empty_environment_keeps_defaults() {
        let config = apply(&[]).unwrap();
        assert_eq!(config, FeedbackConfig::default());
        assert_eq!(config.toast.max_visible, 5);
        assert_eq!(config.capture.cancel_guard, Duration::from_millis(300));
    }

    #[test]
    fn overrides_are_applied() {
        let config = apply(&[
            ("GHOST_TOAST_MAX", "3"),
            ("GHOST_CANCEL_GUARD_MS", "0"),
            ("GHOST_REDUCED_MOTION", "true"),
            ("GHOST_CONTAINMENT_CODE", " UNIT_02 "),
        ])
        .unwrap();
        assert_eq!(config.toast.max_visible, 3);
        assert_eq!(config.capture.cancel_guard, Duration::ZERO);
        assert!(config.effects.reduced_motion);
        assert_eq!(config.hunt.containment_code, "UNIT_02");
    }

    #[test]
    fn bad_values_are_reported() {
        let err = apply(&[("GHOST_TOAST_MAX", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "GHOST_TOAST_MAX", .. }));

        let err = apply(&[("GHOST_INVENTORY_CAPACITY", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Zero { .. }));

        let err = apply(&[("GHOST_REDUCED_MOTION", "maybe")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "GHOST_REDUCED_MOTION=\"maybe\" is not a valid boolean"
        );
    }
}
