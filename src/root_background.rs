//! Root-pixmap ("wallpaper") tracker.
//!
//! The wallpaper itself is set by some other client (`feh`, `xsetroot`, a
//! desktop shell); this module only observes `_XROOTPMAP_ID`/`_XSETROOT_ID`
//! and re-uploads when they change, mirroring the original's
//! `get_root_pixmap`/`allocate_root_background`
//! (`examples/original_source/commoner.c`) but routed through the same
//! upload path as window textures.

use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt, Pixmap, Window as XWindow};

use crate::atoms::Atoms;
use crate::error::PaintError;
use crate::gpu::egl::EglContext;
use crate::gpu::ffi::gl;
use crate::gpu::texture;

pub struct RootBackground {
    pixmap: Option<Pixmap>,
    pub texture: Option<gl::types::GLuint>,
    native_image: Option<texture::NativeImage>,
}

impl Default for RootBackground {
    fn default() -> Self {
        RootBackground {
            pixmap: None,
            texture: None,
            native_image: None,
        }
    }
}

fn read_root_pixmap_property<C: Connection>(conn: &C, atoms: &Atoms, root: XWindow) -> Option<Pixmap> {
    for atom in [atoms._XROOTPMAP_ID, atoms._XSETROOT_ID] {
        if let Ok(Ok(reply)) = conn
            .get_property(false, root, atom, AtomEnum::PIXMAP, 0, 1)
            .map(|c| c.reply())
        {
            if let Some(mut values) = reply.value32() {
                if let Some(id) = values.next() {
                    return Some(id);
                }
            }
        }
    }
    None
}

impl RootBackground {
    /// Called on startup and on every property-change of a background atom.
    /// If the pixmap id hasn't changed and a texture already exists, this is
    /// a no-op.
    pub fn refresh<C: Connection>(
        &mut self,
        conn: &C,
        gl: &gl::Gles2,
        egl_ctx: &EglContext,
        atoms: &Atoms,
        root: XWindow,
        root_w: u16,
        root_h: u16,
    ) -> Result<(), PaintError> {
        let new_pixmap = read_root_pixmap_property(conn, atoms, root);

        if new_pixmap == self.pixmap && self.texture.is_some() {
            return Ok(());
        }

        if let Some(tex) = self.texture.take() {
            unsafe { gl.DeleteTextures(1, &tex) };
        }
        self.native_image = None;
        self.pixmap = new_pixmap;

        let Some(pixmap) = new_pixmap else {
            debug!("root background property cleared, no texture until it is set again");
            return Ok(());
        };

        let geom = conn.get_geometry(pixmap)?.reply()?;
        if geom.width != root_w || geom.height != root_h {
            debug!(
                pixmap_w = geom.width,
                pixmap_h = geom.height,
                root_w,
                root_h,
                "root pixmap size does not match root window, leaving background unset"
            );
            return Ok(());
        }

        texture::upload(conn, gl, egl_ctx, pixmap, &mut self.texture, &mut self.native_image)
    }
}
