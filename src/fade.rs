//! Fade animator: steps every window's opacity toward its target once per
//! paint tick.
//!
//! Grounded on `fade_step`/`set_target_opacity`/`apply_opacity_change` in
//! the original compositor (`examples/original_source/commoner.c:1900-2011`).
//! The stepping rule is multiplicative-by-`OPAQUE`-and-clamp, exactly as the
//! C original computes it in fixed point; this keeps the same integer
//! fixed-point representation (`u32`, `OPAQUE = 0xFFFF_FFFF`) rather than
//! switching to floats, since clamp-against-target arithmetic is exact in
//! that representation and only approximate in floating point.

use crate::window::{WindowId, WindowRegistry, OPAQUE};

#[derive(Debug, Clone, Copy)]
pub struct FadeConfig {
    pub fade_in_step: f64,
    pub fade_out_step: f64,
    pub fade_delta_ms: u64,
    pub enabled: bool,
}

impl Default for FadeConfig {
    fn default() -> Self {
        FadeConfig {
            fade_in_step: 0.06,
            fade_out_step: 0.07,
            fade_delta_ms: 8,
            enabled: false,
        }
    }
}

fn step_once(opacity: u32, target: u32, step: f64) -> u32 {
    let delta = (OPAQUE as f64 * step) as u32;
    if opacity < target {
        opacity.saturating_add(delta).min(target)
    } else {
        opacity.saturating_sub(delta).max(target)
    }
}

/// Advances every mid-fade window by one step. Returns the handles of
/// windows that just reached target opacity 0 while unmapped, which the
/// caller must run `finish_unmap` on after this pass.
pub fn advance(registry: &mut WindowRegistry, cfg: &FadeConfig) -> Vec<WindowId> {
    let mut finished_unmaps = Vec::new();
    let handles: Vec<WindowId> = registry.stack.clone();
    for handle in handles {
        let Some(record) = registry.get_mut(handle) else {
            continue;
        };
        if record.opacity == record.target_opacity {
            continue;
        }
        let step = if record.target_opacity > record.opacity {
            cfg.fade_in_step
        } else {
            cfg.fade_out_step
        };
        record.opacity = step_once(record.opacity, record.target_opacity, step);

        if record.opacity == record.target_opacity && record.opacity == 0 && !record.attrs.viewable {
            record.fade_finished = true;
            finished_unmaps.push(handle);
        }
    }
    finished_unmaps
}

/// Sets a window's target opacity, respecting the fade toggle: with fading
/// off the change is applied immediately (both fields written); with fading
/// on only the target is updated and [`advance`] will catch up to it over
/// subsequent ticks. Mirrors `set_target_opacity`.
pub fn set_target_opacity(registry: &mut WindowRegistry, handle: WindowId, target: u32, cfg: &FadeConfig) {
    let Some(record) = registry.get_mut(handle) else {
        return;
    };
    record.target_opacity = target;
    if !cfg.enabled {
        record.opacity = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::Attrs;

    fn attrs(viewable: bool) -> Attrs {
        Attrs {
            viewable,
            ..Default::default()
        }
    }

    #[test]
    fn fade_in_moves_toward_target_without_overshoot() {
        let cfg = FadeConfig {
            enabled: true,
            ..Default::default()
        };
        let mut reg = WindowRegistry::new();
        let h = reg.add_win(1, attrs(true), None);
        reg.get_mut(h).unwrap().opacity = 0;
        reg.get_mut(h).unwrap().target_opacity = OPAQUE;

        let mut last = 0u32;
        for _ in 0..100 {
            advance(&mut reg, &cfg);
            let cur = reg.get(h).unwrap().opacity;
            assert!(cur >= last);
            assert!(cur <= OPAQUE);
            last = cur;
            if cur == OPAQUE {
                break;
            }
        }
        assert_eq!(reg.get(h).unwrap().opacity, OPAQUE);
    }

    #[test]
    fn fade_out_to_zero_on_unmapped_window_marks_fade_finished() {
        let cfg = FadeConfig {
            enabled: true,
            ..Default::default()
        };
        let mut reg = WindowRegistry::new();
        let h = reg.add_win(1, attrs(false), None);
        reg.get_mut(h).unwrap().opacity = OPAQUE;
        reg.get_mut(h).unwrap().target_opacity = 0;

        let mut finished = Vec::new();
        for _ in 0..200 {
            finished = advance(&mut reg, &cfg);
            if !finished.is_empty() {
                break;
            }
        }
        assert_eq!(finished, vec![h]);
        assert!(reg.get(h).unwrap().fade_finished);
        assert_eq!(reg.get(h).unwrap().opacity, 0);
    }

    #[test]
    fn disabled_fading_applies_target_immediately() {
        let cfg = FadeConfig {
            enabled: false,
            ..Default::default()
        };
        let mut reg = WindowRegistry::new();
        let h = reg.add_win(1, attrs(true), None);
        set_target_opacity(&mut reg, h, 12345, &cfg);
        assert_eq!(reg.get(h).unwrap().opacity, 12345);
        assert_eq!(reg.get(h).unwrap().target_opacity, 12345);
    }
}
