//! Easing curves shared by the progress bar, toasts and the modal.

/// Cubic ease-in-out. Input is clamped to `[0, 1]`.
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Cubic ease-in. Input is clamped to `[0, 1]`.
pub fn ease_in_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * t
}

/// Cubic ease-out. Input is clamped to `[0, 1]`.
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t.clamp(0.0, 1.0)).powi(3)
}

/// Fraction of `span` covered by `elapsed`, clamped to `[0, 1]`.
/// A zero span counts as already finished.
pub fn ratio(elapsed: std::time::Duration, span: std::time::Duration) -> f32 {
    if span.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / span.as_secs_f64()).min(1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn in_out_cubic_fixes_endpoints_and_midpoint() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn in_out_cubic_stays_in_range_and_never_decreases() {
        let mut prev = 0.0;
        for i in 0..=1000 {
            let v = ease_in_out_cubic(i as f32 / 1000.0);
            assert!((0.0..=1.0).contains(&v), "out of range at step {i}: {v}");
            assert!(v >= prev, "decreased at step {i}: {prev} -> {v}");
            prev = v;
        }
    }

    #[test]
    fn in_cubic_is_cube_and_clamped() {
        assert!((ease_in_cubic(0.5) - 0.125).abs() < 1e-6);
        assert_eq!(ease_in_cubic(-1.0), 0.0);
        assert_eq!(ease_in_cubic(3.0), 1.0);
    }

    #[test]
    fn out_cubic_front_loads_progress() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-6);
    }

    #[test]
    fn ratio_clamps_and_handles_zero_span() {
        let span = Duration::from_millis(500);
        assert_eq!(ratio(Duration::ZERO, span), 0.0);
        assert!((ratio(Duration::from_millis(250), span) - 0.5).abs() < 1e-6);
        assert_eq!(ratio(Duration::from_secs(9), span), 1.0);
        assert_eq!(ratio(Duration::from_millis(1), Duration::ZERO), 1.0);
    }
}
