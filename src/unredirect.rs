//! Fullscreen unredirect policy: pass the X server's own compositing
//! through untouched when a single opaque window covers the whole root, to
//! avoid an extra composite pass on games/video.
//!
//! Grounded on `is_fullscreen`/`check_unredirect`
//! (`examples/original_source/commoner.c:1440-1472`).

use crate::classify::WindowType;
use crate::window::{WindowRegistry, OPAQUE};

#[derive(Debug)]
pub struct UnredirectState {
    pub enabled: bool,
    pub redirected: bool,
    pub should_redir: bool,
    pub should_unredir: bool,
}

impl Default for UnredirectState {
    /// The compositor starts out redirected (`redirected = True`,
    /// `examples/original_source/commoner.c:547`); it's `check`'s job to
    /// schedule the first unredirect once a fullscreen candidate shows up.
    fn default() -> Self {
        UnredirectState {
            enabled: false,
            redirected: true,
            should_redir: false,
            should_unredir: false,
        }
    }
}

fn is_fullscreen(registry: &WindowRegistry, handle: crate::window::WindowId, root_w: u16, root_h: u16) -> bool {
    let Some(w) = registry.get(handle) else {
        return false;
    };
    if w.destroyed || !w.attrs.viewable {
        return false;
    }
    if w.opacity != OPAQUE {
        return false;
    }
    if w.window_type.blocks_unredirect_exclusion() {
        return false;
    }
    let a = &w.attrs;
    a.x <= 0 && a.y <= 0 && (a.x as i32 + a.width as i32) >= root_w as i32 && (a.y as i32 + a.height as i32) >= root_h as i32
}

/// Scans the stack for a fullscreen-opaque candidate and schedules the
/// appropriate policy transition for the *next* paint. A no-op unless the
/// feature is enabled.
pub fn check(state: &mut UnredirectState, registry: &WindowRegistry, root_w: u16, root_h: u16) {
    if !state.enabled {
        return;
    }
    let found = registry
        .stack
        .iter()
        .any(|&h| is_fullscreen(registry, h, root_w, root_h));

    if found && state.redirected {
        state.should_unredir = true;
    } else if !found && !state.redirected {
        state.should_redir = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::Attrs;

    fn fullscreen_attrs(w: u16, h: u16) -> Attrs {
        Attrs {
            x: 0,
            y: 0,
            width: w,
            height: h,
            viewable: true,
            ..Default::default()
        }
    }

    #[test]
    fn schedules_unredirect_when_fullscreen_opaque_window_present() {
        let mut reg = WindowRegistry::new();
        let h = reg.add_win(1, fullscreen_attrs(1920, 1080), None);
        reg.get_mut(h).unwrap().opacity = OPAQUE;
        reg.get_mut(h).unwrap().window_type = WindowType::Normal;

        let mut state = UnredirectState {
            enabled: true,
            redirected: true,
            ..Default::default()
        };
        check(&mut state, &reg, 1920, 1080);
        assert!(state.should_unredir);
        assert!(!state.should_redir);
    }

    #[test]
    fn excluded_types_never_trigger_unredirect() {
        let mut reg = WindowRegistry::new();
        let h = reg.add_win(1, fullscreen_attrs(1920, 1080), None);
        reg.get_mut(h).unwrap().opacity = OPAQUE;
        reg.get_mut(h).unwrap().window_type = WindowType::Splash;

        let mut state = UnredirectState {
            enabled: true,
            redirected: true,
            ..Default::default()
        };
        check(&mut state, &reg, 1920, 1080);
        assert!(!state.should_unredir);
    }

    #[test]
    fn default_state_starts_redirected() {
        let state = UnredirectState::default();
        assert!(state.redirected);
        assert!(!state.enabled);
    }

    #[test]
    fn schedules_redirect_when_no_longer_fullscreen() {
        let mut reg = WindowRegistry::new();
        let mut state = UnredirectState {
            enabled: true,
            redirected: false,
            ..Default::default()
        };
        check(&mut state, &reg, 1920, 1080);
        assert!(state.should_redir);
    }
}
