//! Thin wrapper over XFixes server-side regions.
//!
//! Region handles race benignly with window teardown (a damage-notify for a
//! window destroyed moments earlier can still reference a region that's
//! already been freed server-side), so every request that can fail this way
//! notes its sequence in the [`IgnoreRing`](crate::ignore_ring::IgnoreRing)
//! immediately before issuing it. Grounded on the
//! `XFixesCreateRegion`/`XFixesUnionRegion`/`XFixesSubtractRegion`/
//! `XFixesTranslateRegion`/`XFixesDestroyRegion` call sites scattered through
//! `examples/original_source/commoner.c` (e.g. `add_damage`, `win_extents`,
//! `border_size`).

use x11rb::connection::Connection;
use x11rb::protocol::xfixes::{ConnectionExt, Region};
use x11rb::protocol::xproto::{Rectangle, Window as XWindow};

use crate::ignore_ring::IgnoreRing;

pub fn create<C: Connection>(conn: &C, rects: &[Rectangle]) -> Result<Region, x11rb::errors::ReplyOrIdError> {
    let region = conn.generate_id()?;
    conn.xfixes_create_region(region, rects)?;
    Ok(region)
}

pub fn create_from_window_bounding<C: Connection>(
    conn: &C,
    ignore: &mut IgnoreRing,
    window: XWindow,
) -> Result<Region, x11rb::errors::ReplyOrIdError> {
    let region = conn.generate_id()?;
    let seq = conn
        .xfixes_create_region_from_window(region, window, x11rb::protocol::shape::SK::BOUNDING)?
        .sequence_number();
    ignore.note(seq);
    Ok(region)
}

pub fn set<C: Connection>(conn: &C, region: Region, rects: &[Rectangle]) -> Result<(), x11rb::errors::ConnectionError> {
    conn.xfixes_set_region(region, rects)?;
    Ok(())
}

pub fn translate<C: Connection>(
    conn: &C,
    ignore: &mut IgnoreRing,
    region: Region,
    dx: i16,
    dy: i16,
) -> Result<(), x11rb::errors::ConnectionError> {
    let seq = conn.xfixes_translate_region(region, dx, dy)?.sequence_number();
    ignore.note(seq);
    Ok(())
}

pub fn union<C: Connection>(
    conn: &C,
    dst: Region,
    a: Region,
    b: Region,
) -> Result<(), x11rb::errors::ConnectionError> {
    conn.xfixes_union_region(a, b, dst)?;
    Ok(())
}

pub fn subtract<C: Connection>(
    conn: &C,
    ignore: &mut IgnoreRing,
    dst: Region,
    a: Region,
    b: Region,
) -> Result<(), x11rb::errors::ConnectionError> {
    let seq = conn.xfixes_subtract_region(a, b, dst)?.sequence_number();
    ignore.note(seq);
    Ok(())
}

/// Destroys `region`, noting the request sequence first so a benign "bad
/// region" error racing with some other already-in-flight teardown doesn't
/// surface to the user.
pub fn destroy<C: Connection>(conn: &C, ignore: &mut IgnoreRing, region: Region) -> Result<(), x11rb::errors::ConnectionError> {
    let seq = conn.xfixes_destroy_region(region)?.sequence_number();
    ignore.note(seq);
    Ok(())
}
