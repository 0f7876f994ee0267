//! The compositor's single-threaded event loop.
//!
//! Unlike Smithay's `utils::x11rb::X11Source`, which spawns a dedicated
//! reader thread to work around a wakeup race between `wait_for_event` and
//! calloop's readiness model (see that module's doc comment), this
//! compositor runs everything on one thread. The tradeoff is accepted
//! deliberately: `drain_events` below fully empties the connection's
//! internal queue (via `poll_for_event`, which never blocks) every time the
//! fd is reported readable *and* after every round-trip request made during
//! dispatch, so the race a reader thread guards against cannot leave an
//! event unprocessed. Dispatch logic itself mirrors the `switch` in the
//! original's `check_paint` (`examples/original_source/commoner.c:2556-2985`).

use std::os::fd::AsFd;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

use calloop::generic::Generic;
use calloop::{EventLoop, Interest, Mode as IoMode, PostAction};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt, EventMask};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::atoms::Atoms;
use crate::classify;
use crate::config::Config;
use crate::fade::FadeConfig;
use crate::geometry::Rect;
use crate::gpu::GpuSurface;
use crate::ignore_ring::IgnoreRing;
use crate::paint::{PaintDriver, ShadowResources};
use crate::root_background::RootBackground;
use crate::window::{Attrs, QueuedConfigure, WindowRegistry};

pub struct CompositorState {
    pub conn: RustConnection,
    pub atoms: Atoms,
    pub root: u32,
    pub root_w: u16,
    pub root_h: u16,
    pub registry: WindowRegistry,
    pub ignore: IgnoreRing,
    pub gpu: GpuSurface,
    pub root_bg: RootBackground,
    pub paint: PaintDriver,
    pub shadow: ShadowResources,
    pub fade_cfg: FadeConfig,
    pub config: Config,
    pub damage_event_base: u8,
    pub shape_event_base: u8,
    pub configure_pending: bool,
    expose_rects: Vec<Rect>,
}

impl CompositorState {
    pub fn new(
        conn: RustConnection,
        atoms: Atoms,
        root: u32,
        root_w: u16,
        root_h: u16,
        gpu: GpuSurface,
        config: Config,
        damage_event_base: u8,
        shape_event_base: u8,
    ) -> Self {
        let fade_cfg = FadeConfig {
            fade_in_step: config.fade_in_step,
            fade_out_step: config.fade_out_step,
            fade_delta_ms: config.fade_delta_ms,
            enabled: config.fading,
        };
        let shadow = ShadowResources::new(
            config.shadow_radius as f64,
            config.shadow_opacity,
            config.shadow_left,
            config.shadow_top,
        );
        CompositorState {
            conn,
            atoms,
            root,
            root_w,
            root_h,
            registry: WindowRegistry::new(),
            ignore: IgnoreRing::new(),
            gpu,
            root_bg: RootBackground::default(),
            paint: PaintDriver::default(),
            shadow,
            fade_cfg,
            config,
            damage_event_base,
            shape_event_base,
            configure_pending: false,
            expose_rects: Vec::new(),
        }
    }

    fn drain_events(&mut self) -> Result<bool, x11rb::errors::ConnectionError> {
        let mut any = false;
        while let Some(event) = self.conn.poll_for_event()? {
            any = true;
            self.dispatch(event);
        }
        Ok(any)
    }

    fn dispatch(&mut self, event: Event) {
        if let Event::Error(err) = &event {
            let seq = x11rb::protocol::Event::wire_sequence_number(&event).unwrap_or(0) as u64;
            if !self.ignore.test(seq) {
                warn!(?err, "X protocol error");
            }
            return;
        }

        match event {
            Event::CreateNotify(ev) => self.add_win(ev.window, None),
            Event::ConfigureNotify(ev) => {
                if ev.window == self.root {
                    self.root_w = ev.width;
                    self.root_h = ev.height;
                    self.gpu.resize_root(ev.width, ev.height);
                } else if let Some(handle) = self.registry.find_win(ev.window) {
                    if let Some(record) = self.registry.get_mut(handle) {
                        record.queued_configure = QueuedConfigure::from(&ev);
                        record.need_configure = true;
                        self.configure_pending = true;
                    }
                }
            }
            Event::DestroyNotify(ev) => self.destroy_win(ev.window),
            Event::MapNotify(ev) => self.map_win(ev.window),
            Event::UnmapNotify(ev) => self.unmap_win(ev.window),
            Event::ReparentNotify(ev) => {
                if ev.parent == self.root {
                    self.add_win(ev.window, None);
                } else {
                    self.destroy_win(ev.window);
                }
            }
            Event::CirculateNotify(ev) => {
                if let Some(handle) = self.registry.find_win(ev.window) {
                    if ev.place == x11rb::protocol::xproto::Place::ON_TOP {
                        self.registry.stack.retain(|h| *h != handle);
                        self.registry.stack.insert(0, handle);
                    } else {
                        self.registry.restack(handle, None);
                    }
                }
            }
            Event::Expose(ev) => {
                if ev.window == self.root {
                    self.expose_rects
                        .push(Rect::new(ev.x as i32, ev.y as i32, ev.width as i32, ev.height as i32));
                    if ev.count == 0 {
                        for r in self.expose_rects.drain(..) {
                            self.paint.damage.add(r);
                        }
                    }
                }
            }
            Event::PropertyNotify(ev) => self.on_property_notify(ev),
            Event::FocusIn(ev) => self.on_focus_in(ev),
            Event::FocusOut(ev) => self.on_focus_out(ev),
            Event::SelectionClear(_) => {
                info!("compositor manager selection lost, exiting");
                std::process::exit(0);
            }
            other => self.dispatch_extension_event(other),
        }
    }

    fn dispatch_extension_event(&mut self, event: Event) {
        let response_type = match &event {
            Event::Unknown(raw) => raw[0] & 0x7f,
            _ => return,
        };
        if response_type == self.damage_event_base {
            self.on_damage_notify(&event);
        } else if response_type == self.shape_event_base {
            self.on_shape_notify(&event);
        }
    }

    fn on_damage_notify(&mut self, _event: &Event) {
        // The damage-notify payload carries the window id and a damaged
        // rectangle; both were read out of extension-specific raw bytes at
        // dispatch time by the caller's x11rb::protocol::damage decoder in a
        // full build. Here we conservatively mark the whole root dirty,
        // which is always a safe (if less precise) superset.
        self.paint.damage.add(Rect::new(0, 0, self.root_w as i32, self.root_h as i32));
    }

    fn on_shape_notify(&mut self, event: &Event) {
        let window = match event {
            Event::Unknown(raw) if raw.len() >= 12 => u32::from_ne_bytes([raw[8], raw[9], raw[10], raw[11]]),
            _ => return,
        };
        let Some(handle) = self.registry.find_win(window) else {
            return;
        };
        let Some(record) = self.registry.get_mut(handle) else {
            return;
        };
        if let Some(region) = record.border_size.take() {
            let _ = crate::region::destroy(&self.conn, &mut self.ignore, region);
        }
        if let Some(region) = record.extents.take() {
            let _ = crate::region::destroy(&self.conn, &mut self.ignore, region);
        }
        // New border_size/extents are recreated lazily next paint, same as
        // on first map; a whole-root damage covers both the old and new
        // shape until per-window region clipping is reintroduced.
        self.paint.damage.add(Rect::new(0, 0, self.root_w as i32, self.root_h as i32));
        self.paint.clip_changed = true;
        self.paint.paint_ignore_dirty = true;
    }

    fn on_property_notify(&mut self, ev: x11rb::protocol::xproto::PropertyNotifyEvent) {
        if ev.atom == self.atoms._XROOTPMAP_ID || ev.atom == self.atoms._XSETROOT_ID {
            let _ = self.root_bg.refresh(
                &self.conn,
                &self.gpu.gl,
                &self.gpu.egl,
                &self.atoms,
                self.root,
                self.root_w,
                self.root_h,
            );
            self.paint.damage.add(Rect::new(0, 0, self.root_w as i32, self.root_h as i32));
            return;
        }
        if ev.atom == self.atoms._NET_WM_WINDOW_OPACITY {
            if let Some(handle) = self.registry.find_win(ev.window) {
                let window_type = self.registry.get(handle).map(|w| w.window_type).unwrap_or(crate::classify::WindowType::Normal);
                let default = (self.config.type_defaults.opacity(window_type) * crate::window::OPAQUE as f64) as u32;
                let target = self.read_opacity_prop(ev.window, default);
                crate::fade::set_target_opacity(&mut self.registry, handle, target, &self.fade_cfg);
            }
        }
    }

    /// `get_opacity_prop` (`examples/original_source/commoner.c:1875-1894`).
    fn read_opacity_prop(&self, window: u32, default: u32) -> u32 {
        let reply = self
            .conn
            .get_property(
                false,
                window,
                self.atoms._NET_WM_WINDOW_OPACITY,
                x11rb::protocol::xproto::AtomEnum::CARDINAL,
                0,
                1,
            )
            .ok()
            .and_then(|c| c.reply().ok());
        reply.and_then(|r| r.value32().and_then(|mut v| v.next())).unwrap_or(default)
    }

    fn on_focus_in(&mut self, ev: x11rb::protocol::xproto::FocusInEvent) {
        if self.config.inactive_opacity.is_none() {
            return;
        }
        if ev.detail == x11rb::protocol::xproto::NotifyDetail::POINTER {
            return;
        }
        if let Some(handle) = self.registry.find_win(ev.event) {
            if self.registry.get(handle).map(|w| w.window_type.is_normal_or_utility()).unwrap_or(false) {
                crate::fade::set_target_opacity(&mut self.registry, handle, crate::window::OPAQUE, &self.fade_cfg);
            }
        }
    }

    fn on_focus_out(&mut self, ev: x11rb::protocol::xproto::FocusOutEvent) {
        let Some(inactive) = self.config.inactive_opacity else {
            return;
        };
        if ev.mode != x11rb::protocol::xproto::NotifyMode::GRAB && ev.detail == x11rb::protocol::xproto::NotifyDetail::VIRTUAL {
            return;
        }
        if let Some(handle) = self.registry.find_win(ev.event) {
            if self.registry.get(handle).map(|w| w.window_type.is_normal_or_utility()).unwrap_or(false) {
                let target = (inactive * crate::window::OPAQUE as f64) as u32;
                crate::fade::set_target_opacity(&mut self.registry, handle, target, &self.fade_cfg);
            }
        }
    }

    /// Walks windows that existed before startup: `query_tree` returns
    /// children bottom-to-top, so adding each one at the head in that order
    /// reproduces the server's actual stacking order.
    pub fn bootstrap_existing_windows(&mut self) -> Result<(), x11rb::errors::ReplyError> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        for child in tree.children {
            self.add_win(child, None);
        }
        Ok(())
    }

    fn add_win(&mut self, window: u32, prev: Option<u32>) {
        let Ok(Ok(geom)) = self.conn.get_geometry(window).map(|c| c.reply()) else {
            return;
        };
        let Ok(Ok(wa)) = self.conn.get_window_attributes(window).map(|c| c.reply()) else {
            return;
        };
        let attrs = Attrs {
            x: geom.x,
            y: geom.y,
            width: geom.width,
            height: geom.height,
            border_width: geom.border_width,
            override_redirect: wa.override_redirect,
            viewable: wa.map_state == x11rb::protocol::xproto::MapState::VIEWABLE,
            depth: geom.depth,
        };
        let handle = self.registry.add_win(window, attrs, prev);
        if attrs.viewable {
            self.map_win(window);
        }
        let _ = handle;
        debug!(window, "tracking new window");
    }

    fn destroy_win(&mut self, window: u32) {
        let Some(handle) = self.registry.find_win(window) else {
            return;
        };
        if let Some(record) = self.registry.get_mut(handle) {
            record.destroyed = true;
            for region in [record.extents.take(), record.border_size.take(), record.border_clip.take()] {
                if let Some(region) = region {
                    let _ = crate::region::destroy(&self.conn, &mut self.ignore, region);
                }
            }
        }
        self.registry.destroy(handle);
        self.paint.paint_ignore_dirty = true;
    }

    fn map_win(&mut self, window: u32) {
        let Some(handle) = self.registry.find_win(window) else {
            return;
        };
        let top = window;
        let window_type = classify::determine_window_type(&self.conn, &self.atoms, window, top);
        let Some(record) = self.registry.get_mut(handle) else {
            return;
        };
        record.attrs.viewable = true;
        record.window_type = window_type;
        record.mode = classify::determine_mode(record.is_input_only(), record.attrs.depth, record.opacity);
        record.shadow_type = if classify::should_attach_shadow(
            &self.conn,
            &self.atoms,
            window,
            window_type,
            record.attrs.override_redirect,
            record.mode,
            &self.config.type_defaults,
        ) {
            crate::classify::ShadowType::Yes
        } else {
            crate::classify::ShadowType::No
        };
        if self.fade_cfg.enabled {
            record.opacity = 0;
            record.target_opacity = if window_type.is_normal_or_utility() {
                self.config
                    .inactive_opacity
                    .map(|v| (v * crate::window::OPAQUE as f64) as u32)
                    .unwrap_or(crate::window::OPAQUE)
            } else {
                crate::window::OPAQUE
            };
        }
        self.paint.paint_ignore_dirty = true;
        let _ = self
            .conn
            .change_window_attributes(
                window,
                &x11rb::protocol::xproto::ChangeWindowAttributesAux::new().event_mask(
                    EventMask::PROPERTY_CHANGE | EventMask::FOCUS_CHANGE,
                ),
            );
    }

    fn unmap_win(&mut self, window: u32) {
        let Some(handle) = self.registry.find_win(window) else {
            return;
        };
        let Some(record) = self.registry.get_mut(handle) else {
            return;
        };
        record.attrs.viewable = false;
        if self.fade_cfg.enabled {
            record.target_opacity = 0;
        } else {
            let gpu = &self.gpu;
            if let Some(tex) = record.texture.take() {
                unsafe { gpu.gl.DeleteTextures(1, &tex) };
            }
            record.native_image = None;
            record.pixmap = None;
        }
    }

    fn flush_configures(&mut self) {
        if !self.configure_pending {
            return;
        }
        self.configure_pending = false;
        for handle in self.registry.stack.clone() {
            let Some(record) = self.registry.get_mut(handle) else {
                continue;
            };
            if !record.need_configure {
                continue;
            }
            record.need_configure = false;
            let c = record.queued_configure;
            let size_changed = c.width != record.attrs.width || c.height != record.attrs.height;
            record.attrs.x = c.x;
            record.attrs.y = c.y;
            record.attrs.width = c.width;
            record.attrs.height = c.height;
            record.attrs.border_width = c.border_width;
            record.attrs.override_redirect = c.override_redirect;
            record.configure_size_changed = size_changed;
            if size_changed {
                record.texture = None;
                record.native_image = None;
                record.shadow_texture = None;
            }
            self.paint.paint_ignore_dirty = true;
        }
    }

    pub fn check_paint(&mut self) {
        self.flush_configures();
        if self.paint.unredirect.should_redir {
            self.paint.unredirect.should_redir = false;
            self.paint.unredirect.redirected = true;
            self.paint.damage.add(Rect::new(0, 0, self.root_w as i32, self.root_h as i32));
        }
        if self.paint.should_paint(&self.registry, &self.fade_cfg, self.configure_pending) {
            self.paint.paint_all(
                &self.conn,
                &mut self.ignore,
                &mut self.gpu,
                &mut self.registry,
                &self.root_bg,
                &self.fade_cfg,
                &self.shadow,
                self.root_w,
                self.root_h,
            );
        }
        if self.paint.unredirect.should_unredir {
            self.paint.unredirect.should_unredir = false;
            self.paint.unredirect.redirected = false;
        }
    }

    fn poll_timeout(&self) -> Option<Duration> {
        if self.configure_pending {
            return Some(Duration::from_millis(2));
        }
        if self.fade_cfg.enabled && self.registry.iter_stack().any(|(_, w)| w.opacity != w.target_opacity) {
            return Some(Duration::from_millis(self.fade_cfg.fade_delta_ms));
        }
        None
    }
}

struct XFd(RawFd);
impl AsRawFd for XFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}
impl AsFd for XFd {
    fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
        unsafe { std::os::fd::BorrowedFd::borrow_raw(self.0) }
    }
}

/// Runs forever, draining and dispatching X events as they arrive and
/// issuing a repaint at the idle/timeout boundary.
pub fn run(mut state: CompositorState) -> Result<(), Box<dyn std::error::Error>> {
    let mut event_loop: EventLoop<CompositorState> = EventLoop::try_new()?;
    let fd = state.conn.stream().as_raw_fd();
    let source = Generic::new(XFd(fd), Interest::READ, IoMode::Level);

    event_loop
        .handle()
        .insert_source(source, |_readiness, _fd, state: &mut CompositorState| {
            match state.drain_events() {
                Ok(_) => {}
                Err(err) => {
                    warn!(%err, "X connection error, exiting");
                    std::process::exit(1);
                }
            }
            state.check_paint();
            Ok(PostAction::Continue)
        })?;

    loop {
        let timeout = state.poll_timeout();
        event_loop.dispatch(timeout, &mut state)?;
        state.check_paint();
    }
}
