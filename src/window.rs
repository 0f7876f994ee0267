//! The window registry: a generational arena of tracked top-level windows
//! plus the z-ordered stacking list.
//!
//! The original tracks windows as a singly linked list in server stacking
//! order (`struct _win`, `examples/original_source/commoner.c:428-466`).
//! That's implemented here instead as a slotmap-style arena (`WindowId` =
//! index + generation) with stacking order tracked separately as a
//! `Vec<WindowId>`, avoiding the raw-pointer traversal and manual freeing
//! the linked-list version relies on. `add_win`/`restack`/`find_win` below
//! are the direct Rust-idiomatic reading of the C original's
//! `add_win`/`restack_win`/`find_win`.

use std::collections::HashMap;

use x11rb::protocol::damage::Damage;
use x11rb::protocol::xfixes::Region;
use x11rb::protocol::xproto::{ConfigureNotifyEvent, Pixmap, Window as XWindow};

use crate::classify::{Mode, ShadowType, WindowType};

pub const OPAQUE: u32 = 0xffff_ffff;

/// Cached geometry, mirroring `XWindowAttributes` fields the compositor
/// actually reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Attrs {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
    pub override_redirect: bool,
    pub viewable: bool,
    pub depth: u8,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueuedConfigure {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
    pub above_sibling: XWindow,
    pub override_redirect: bool,
}

impl From<&ConfigureNotifyEvent> for QueuedConfigure {
    fn from(ev: &ConfigureNotifyEvent) -> Self {
        QueuedConfigure {
            x: ev.x,
            y: ev.y,
            width: ev.width,
            height: ev.height,
            border_width: ev.border_width,
            above_sibling: ev.above_sibling,
            override_redirect: ev.override_redirect,
        }
    }
}

/// One tracked top-level window, minus the C original's intrusive `next`
/// pointer (stacking order lives in [`WindowRegistry::stack`] instead).
#[derive(Debug)]
pub struct WindowRecord {
    pub id: XWindow,
    pub attrs: Attrs,

    pub pixmap: Option<Pixmap>,
    pub damage: Option<Damage>,
    pub texture: Option<u32>,
    pub native_image: Option<crate::gpu::texture::NativeImage>,

    pub shadow_texture: Option<u32>,
    pub shadow_w: u32,
    pub shadow_h: u32,
    pub shadow_dx: i32,
    pub shadow_dy: i32,

    pub extents: Option<Region>,
    pub border_size: Option<Region>,
    pub border_clip: Option<Region>,

    pub mode: Mode,
    pub window_type: WindowType,
    pub shadow_type: ShadowType,

    pub opacity: u32,
    pub target_opacity: u32,
    pub fade_finished: bool,

    pub damaged: bool,
    pub paint_needed: bool,

    pub destroyed: bool,

    pub queued_configure: QueuedConfigure,
    pub need_configure: bool,
    pub configure_size_changed: bool,

    /// Transient per-frame link used only while building the bottom-up
    /// paint chain during a repaint; not part of stacking order.
    pub prev_trans: Option<WindowId>,
}

impl WindowRecord {
    fn new(id: XWindow, attrs: Attrs) -> Self {
        WindowRecord {
            id,
            attrs,
            pixmap: None,
            damage: None,
            texture: None,
            native_image: None,
            shadow_texture: None,
            shadow_w: 0,
            shadow_h: 0,
            shadow_dx: 0,
            shadow_dy: 0,
            extents: None,
            border_size: None,
            border_clip: None,
            mode: Mode::Solid,
            window_type: WindowType::Unknown,
            shadow_type: ShadowType::Unknown,
            opacity: OPAQUE,
            target_opacity: OPAQUE,
            fade_finished: false,
            damaged: false,
            paint_needed: false,
            destroyed: false,
            queued_configure: QueuedConfigure::default(),
            need_configure: false,
            configure_size_changed: false,
            prev_trans: None,
        }
    }

    pub fn is_input_only(&self) -> bool {
        self.attrs.depth == 0
    }
}

/// Generational handle into [`WindowRegistry`]. A stale generation (the
/// record it named has since been destroyed and the slot reused) is always
/// rejected by `get`/`get_mut`, so a dangling handle can never silently
/// read or mutate an unrelated window that reused the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId {
    index: usize,
    generation: u64,
}

struct Slot {
    generation: u64,
    record: Option<WindowRecord>,
}

/// The window registry: owns every tracked record, the stacking order, and
/// the X-id-to-handle lookup.
pub struct WindowRegistry {
    slots: Vec<Slot>,
    free: Vec<usize>,
    by_xid: HashMap<XWindow, WindowId>,
    /// Top-to-bottom stacking order, mirroring the head-is-topmost
    /// convention of the original linked list.
    pub stack: Vec<WindowId>,
}

impl Default for WindowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowRegistry {
    pub fn new() -> Self {
        WindowRegistry {
            slots: Vec::new(),
            free: Vec::new(),
            by_xid: HashMap::new(),
            stack: Vec::new(),
        }
    }

    fn insert(&mut self, record: WindowRecord) -> WindowId {
        let id = record.id;
        let handle = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.generation += 1;
            slot.record = Some(record);
            WindowId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len();
            self.slots.push(Slot {
                generation: 0,
                record: Some(record),
            });
            WindowId {
                index,
                generation: 0,
            }
        };
        self.by_xid.insert(id, handle);
        handle
    }

    /// `add_win(id, prev)`: inserts immediately after the record whose X id
    /// is `prev` in stacking order, or at the head if `prev` is `None`.
    /// Caller is responsible for attribute fetch / damage creation / initial
    /// map; this only creates the bookkeeping record and places it in the
    /// stack.
    pub fn add_win(&mut self, id: XWindow, attrs: Attrs, prev: Option<XWindow>) -> WindowId {
        let handle = self.insert(WindowRecord::new(id, attrs));
        let pos = match prev.and_then(|p| self.find_win(p)) {
            Some(prev_handle) => self
                .stack
                .iter()
                .position(|h| *h == prev_handle)
                .map(|i| i + 1)
                .unwrap_or(0),
            None => 0,
        };
        self.stack.insert(pos, handle);
        handle
    }

    /// `restack(w, new_above)`: relinks `w` immediately before the record
    /// whose id is `new_above`, or at the tail if `None`.
    pub fn restack(&mut self, w: WindowId, new_above: Option<XWindow>) {
        let Some(cur_pos) = self.stack.iter().position(|h| *h == w) else {
            return;
        };
        self.stack.remove(cur_pos);
        let pos = match new_above.and_then(|a| self.find_win(a)) {
            Some(above_handle) => self
                .stack
                .iter()
                .position(|h| *h == above_handle)
                .unwrap_or(self.stack.len()),
            None => self.stack.len(),
        };
        self.stack.insert(pos, w);
    }

    /// `find_win(id)`: lookup by X id; tombstoned (destroyed) records are
    /// treated as absent even though their slot has not been reused yet.
    pub fn find_win(&self, id: XWindow) -> Option<WindowId> {
        let handle = *self.by_xid.get(&id)?;
        let record = self.get(handle)?;
        if record.destroyed {
            None
        } else {
            Some(handle)
        }
    }

    pub fn get(&self, handle: WindowId) -> Option<&WindowRecord> {
        let slot = self.slots.get(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.record.as_ref()
    }

    pub fn get_mut(&mut self, handle: WindowId) -> Option<&mut WindowRecord> {
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.record.as_mut()
    }

    /// Destroy: unlinks from the stack and frees the slot immediately.
    /// Callers must have already torn down the record's X/GPU resources
    /// (damage handle, regions, texture, native image) before calling this.
    pub fn destroy(&mut self, handle: WindowId) -> Option<WindowRecord> {
        self.stack.retain(|h| *h != handle);
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        let record = slot.record.take()?;
        self.by_xid.remove(&record.id);
        self.free.push(handle.index);
        Some(record)
    }

    /// Iterates live records top to bottom, the order the repaint driver's
    /// occlusion pass walks.
    pub fn iter_stack(&self) -> impl Iterator<Item = (WindowId, &WindowRecord)> {
        self.stack.iter().filter_map(move |h| self.get(*h).map(|r| (*h, r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> Attrs {
        Attrs {
            width: 100,
            height: 100,
            depth: 24,
            viewable: true,
            ..Default::default()
        }
    }

    #[test]
    fn add_win_with_no_prev_goes_to_head() {
        let mut reg = WindowRegistry::new();
        let a = reg.add_win(1, attrs(), None);
        let b = reg.add_win(2, attrs(), None);
        assert_eq!(reg.stack, vec![b, a]);
    }

    #[test]
    fn add_win_after_prev_inserts_immediately_after_it() {
        let mut reg = WindowRegistry::new();
        let a = reg.add_win(1, attrs(), None);
        let b = reg.add_win(2, attrs(), Some(1));
        let c = reg.add_win(3, attrs(), Some(1));
        // c inserted after a, then b inserted after a: b ends up directly
        // after a, ahead of c.
        assert_eq!(reg.stack, vec![a, b, c]);
    }

    #[test]
    fn find_win_ignores_destroyed_records() {
        let mut reg = WindowRegistry::new();
        let a = reg.add_win(1, attrs(), None);
        assert_eq!(reg.find_win(1), Some(a));
        reg.get_mut(a).unwrap().destroyed = true;
        assert_eq!(reg.find_win(1), None);
    }

    #[test]
    fn destroy_frees_the_slot_and_unlinks_from_stack() {
        let mut reg = WindowRegistry::new();
        let a = reg.add_win(1, attrs(), None);
        let b = reg.add_win(2, attrs(), None);
        reg.destroy(a);
        assert_eq!(reg.stack, vec![b]);
        assert!(reg.get(a).is_none());
        assert!(reg.find_win(1).is_none());
    }

    #[test]
    fn destroyed_slot_is_reused_with_bumped_generation() {
        let mut reg = WindowRegistry::new();
        let a = reg.add_win(1, attrs(), None);
        reg.destroy(a);
        let c = reg.add_win(3, attrs(), None);
        assert_eq!(c.index, a.index);
        assert_ne!(c.generation, a.generation);
        // The stale handle must not resolve to the new record.
        assert!(reg.get(a).is_none());
        assert!(reg.get(c).is_some());
    }

    #[test]
    fn restack_moves_window_immediately_before_new_above() {
        let mut reg = WindowRegistry::new();
        let a = reg.add_win(1, attrs(), None);
        let b = reg.add_win(2, attrs(), None);
        let c = reg.add_win(3, attrs(), None);
        // stack is [c, b, a]; move a to directly before b.
        reg.restack(a, Some(2));
        assert_eq!(reg.stack, vec![c, a, b]);
    }

    #[test]
    fn restack_with_no_above_moves_to_tail() {
        let mut reg = WindowRegistry::new();
        let a = reg.add_win(1, attrs(), None);
        let b = reg.add_win(2, attrs(), None);
        reg.restack(b, None);
        assert_eq!(reg.stack, vec![a, b]);
    }
}
