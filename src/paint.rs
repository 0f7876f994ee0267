//! Damage accumulation and the repaint driver.
//!
//! Grounded on `add_damage`/`paint_all`/`check_paint`
//! (`examples/original_source/commoner.c`, main paint loop). The original
//! tracks damage as a multi-rectangle XFixes region and clips the GL pass
//! against it; this port tracks the accumulated damage as a single bounding
//! rectangle (see DESIGN.md) and relies on the occlusion-rectangle walk from
//! [`crate::geometry::paint_needed`] for the per-window skip that actually
//! matters for correctness, rather than sub-window region clipping.

use tracing::trace;

use crate::classify::ShadowType;
use crate::fade::{self, FadeConfig};
use crate::geometry::{paint_needed, Rect};
use crate::gpu::ffi::gl;
use crate::gpu::texture;
use crate::gpu::GpuSurface;
use crate::ignore_ring::IgnoreRing;
use crate::root_background::RootBackground;
use crate::shadow::{make_shadow, GaussianMap, ShadowTables};
use crate::unredirect::{self, UnredirectState};
use crate::window::{WindowId, WindowRecord, WindowRegistry};

/// The presummed Gaussian shadow tables, built once at startup from the
/// configured blur radius, plus the offset/opacity every shadow quad is
/// drawn with.
pub struct ShadowResources {
    map: GaussianMap,
    tables: ShadowTables,
    opacity: f64,
    offset_x: i32,
    offset_y: i32,
}

impl ShadowResources {
    pub fn new(radius: f64, opacity: f64, offset_x: i32, offset_y: i32) -> Self {
        let map = GaussianMap::new(radius);
        let tables = ShadowTables::build(&map);
        ShadowResources {
            map,
            tables,
            opacity,
            offset_x,
            offset_y,
        }
    }
}

/// Lazily builds and uploads a window's shadow texture the first time it's
/// painted, mirroring the original's on-demand `create_shadow_texture` call
/// from `win_extents`. A no-op once `shadow_texture` is already populated or
/// the window doesn't carry a shadow.
fn ensure_shadow_texture(gl: &gl::Gles2, shadow: &ShadowResources, record: &mut WindowRecord) {
    if record.shadow_type != ShadowType::Yes || record.shadow_texture.is_some() {
        return;
    }
    let width = record.attrs.width as u32 + 2 * record.attrs.border_width as u32;
    let height = record.attrs.height as u32 + 2 * record.attrs.border_width as u32;
    if width == 0 || height == 0 {
        return;
    }

    let image = make_shadow(&shadow.map, &shadow.tables, shadow.opacity, width, height);
    let texture = unsafe {
        let mut tex = 0;
        gl.GenTextures(1, &mut tex);
        gl.BindTexture(gl::TEXTURE_2D, tex);
        gl.TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as gl::types::GLint);
        gl.TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as gl::types::GLint);
        gl.TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as gl::types::GLint);
        gl.TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as gl::types::GLint);
        gl.TexImage2D(
            gl::TEXTURE_2D,
            0,
            gl::ALPHA as gl::types::GLint,
            image.width as gl::types::GLsizei,
            image.height as gl::types::GLsizei,
            0,
            gl::ALPHA,
            gl::UNSIGNED_BYTE,
            image.data.as_ptr() as *const _,
        );
        tex
    };

    record.shadow_texture = Some(texture);
    record.shadow_w = image.width;
    record.shadow_h = image.height;
    record.shadow_dx = shadow.offset_x;
    record.shadow_dy = shadow.offset_y;
}

#[derive(Default)]
pub struct DamageAccumulator {
    bounds: Option<Rect>,
}

impl DamageAccumulator {
    pub fn add(&mut self, r: Rect) {
        self.bounds = Some(match self.bounds {
            Some(b) => union(b, r),
            None => r,
        });
    }

    pub fn is_dirty(&self) -> bool {
        self.bounds.is_some()
    }

    pub fn clear(&mut self) {
        self.bounds = None;
    }
}

fn union(a: Rect, b: Rect) -> Rect {
    let x1 = a.x1.min(b.x1);
    let y1 = a.y1.min(b.y1);
    let x2 = a.x2.max(b.x2);
    let y2 = a.y2.max(b.y2);
    Rect {
        x1,
        y1,
        x2,
        y2,
        w: x2 - x1,
        h: y2 - y1,
    }
}

fn window_extents(record: &crate::window::WindowRecord) -> Rect {
    let a = &record.attrs;
    let mut r = Rect::new(a.x as i32, a.y as i32, a.width as i32 + 2 * a.border_width as i32, a.height as i32 + 2 * a.border_width as i32);
    if record.shadow_type == crate::classify::ShadowType::Yes {
        let sr = Rect::new(
            a.x as i32 + record.shadow_dx,
            a.y as i32 + record.shadow_dy,
            record.shadow_w as i32,
            record.shadow_h as i32,
        );
        r = union(r, sr);
    }
    r
}

pub struct PaintDriver {
    pub damage: DamageAccumulator,
    pub clip_changed: bool,
    pub paint_ignore_dirty: bool,
    pub unredirect: UnredirectState,
}

impl Default for PaintDriver {
    fn default() -> Self {
        PaintDriver {
            damage: DamageAccumulator::default(),
            clip_changed: true,
            paint_ignore_dirty: true,
            unredirect: UnredirectState::default(),
        }
    }
}

impl PaintDriver {
    /// Whether a paint should be issued this tick.
    pub fn should_paint(&self, registry: &WindowRegistry, fade_cfg: &FadeConfig, configure_flush_ran: bool) -> bool {
        if self.damage.is_dirty() || configure_flush_ran {
            return true;
        }
        fade_cfg.enabled && registry.iter_stack().any(|(_, w)| w.opacity != w.target_opacity)
    }

    /// Renders one composited frame.
    #[allow(clippy::too_many_arguments)]
    pub fn paint_all<C: x11rb::connection::Connection>(
        &mut self,
        conn: &C,
        ignore: &mut IgnoreRing,
        gpu: &mut GpuSurface,
        registry: &mut WindowRegistry,
        root_bg: &RootBackground,
        fade_cfg: &FadeConfig,
        shadow: &ShadowResources,
        root_w: u16,
        root_h: u16,
    ) {
        if self.unredirect.enabled && !self.unredirect.redirected {
            return;
        }

        let finished_unmaps = fade::advance(registry, fade_cfg);
        for handle in finished_unmaps {
            finish_unmap(conn, ignore, &mut self.damage, gpu, registry, handle);
            self.clip_changed = true;
        }

        gpu.bind_default_framebuffer_and_clear(0.0, 0.0, 0.0);
        if let Some(tex) = root_bg.texture {
            gpu.draw_quad(tex, 0.0, 0.0, root_w as f32, root_h as f32, 1.0);
        }

        let mut ignore = Rect::default();
        let mut chain: Vec<WindowId> = Vec::new();

        for handle in registry.stack.clone() {
            let Some(record) = registry.get_mut(handle) else {
                continue;
            };
            if !record.attrs.viewable || record.destroyed {
                continue;
            }

            if record.texture.is_none() || record.damaged {
                if let Some(pixmap) = record.pixmap {
                    let tex_opt = &mut record.texture;
                    let native_opt = &mut record.native_image;
                    match texture::upload(conn, &gpu.gl, &gpu.egl, pixmap, tex_opt, native_opt) {
                        Ok(()) => record.damaged = false,
                        Err(err) => trace!(?err, window = record.id, "texture upload failed, skipping this frame"),
                    }
                }
            }

            ensure_shadow_texture(&gpu.gl, shadow, record);

            if self.paint_ignore_dirty {
                let extents = window_extents(record);
                record.paint_needed = paint_needed(&mut ignore, &extents);
            }

            if record.paint_needed {
                chain.push(handle);
            }
        }
        self.paint_ignore_dirty = false;

        // Second pass, bottom to top: draw shadow then window quad.
        for &handle in chain.iter().rev() {
            let Some(record) = registry.get(handle) else {
                continue;
            };
            let alpha = record.opacity as f32 / crate::window::OPAQUE as f32;
            let a = &record.attrs;

            if let Some(shadow_tex) = record.shadow_texture {
                gpu.draw_quad(
                    shadow_tex,
                    (a.x as i32 + record.shadow_dx) as f32,
                    (a.y as i32 + record.shadow_dy) as f32,
                    record.shadow_w as f32,
                    record.shadow_h as f32,
                    alpha,
                );
            }
            if let Some(tex) = record.texture {
                gpu.draw_quad(
                    tex,
                    a.x as f32,
                    a.y as f32,
                    (a.width as i32 + 2 * a.border_width as i32) as f32,
                    (a.height as i32 + 2 * a.border_width as i32) as f32,
                    alpha,
                );
            }
        }

        gpu.swap_buffers();

        self.damage.clear();
        self.clip_changed = false;

        unredirect::check(&mut self.unredirect, registry, root_w, root_h);
    }
}

/// `finish_unmap_win` (`examples/original_source/commoner.c:1797-1829`): tears
/// down the GL and native-pixmap resources an unmapped window no longer
/// needs. `border_size` goes with it, since it's cheap to recompute from
/// `border_size()` on the next map; `extents` survives (the original never
/// frees it here either) so a pending damage repaint still knows the last
/// on-screen footprint to repaint over.
fn finish_unmap<C: x11rb::connection::Connection>(
    conn: &C,
    ignore: &mut IgnoreRing,
    damage: &mut DamageAccumulator,
    gpu: &GpuSurface,
    registry: &mut WindowRegistry,
    handle: WindowId,
) {
    let Some(record) = registry.get_mut(handle) else {
        return;
    };
    if record.extents.is_some() {
        let a = &record.attrs;
        damage.add(Rect::new(
            a.x as i32,
            a.y as i32,
            a.width as i32 + 2 * a.border_width as i32,
            a.height as i32 + 2 * a.border_width as i32,
        ));
    }
    if let Some(tex) = record.texture.take() {
        unsafe { gpu.gl.DeleteTextures(1, &tex) };
    }
    record.native_image = None;
    record.pixmap = None;
    if let Some(region) = record.border_size.take() {
        let _ = crate::region::destroy(conn, ignore, region);
    }
    if let Some(tex) = record.shadow_texture.take() {
        unsafe { gpu.gl.DeleteTextures(1, &tex) };
    }
}
