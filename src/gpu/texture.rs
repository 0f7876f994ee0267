//! Window-texture upload: zero-copy `EGL_KHR_image_pixmap` binding when
//! available, falling back to a server-side `GetImage` round trip.
//!
//! Grounded on `update_texture` in the original compositor
//! (`examples/original_source/commoner.c:1150-1236`) for the format-selection
//! and alpha-forcing logic, and on Smithay's `backend::renderer::gles2`
//! texture-upload path for the GL call sequence (`TexImage2D` with linear
//! filtering, clamp-to-edge wrapping).

use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt, ImageFormat, Pixmap};

use crate::error::PaintError;
use crate::gpu::egl::EglContext;
use crate::gpu::ffi::{egl, gl};

/// A zero-copy binding from an X pixmap to a GL texture via
/// `EGL_KHR_image_pixmap`. Dropping it releases the underlying `EGLImage`.
#[derive(Debug)]
pub struct NativeImage {
    image: egl::types::EGLImageKHR,
    display: egl::types::EGLDisplay,
}

impl NativeImage {
    fn create(egl_ctx: &EglContext, pixmap: Pixmap) -> Result<Self, PaintError> {
        let attribs = [egl::IMAGE_PRESERVED_KHR as egl::types::EGLint, egl::TRUE as egl::types::EGLint, egl::NONE as egl::types::EGLint];
        let image = unsafe {
            egl::CreateImageKHR(
                egl_ctx.display,
                egl::NO_CONTEXT,
                egl::NATIVE_PIXMAP_KHR,
                pixmap as egl::types::EGLClientBuffer,
                attribs.as_ptr(),
            )
        };
        if image.is_null() {
            return Err(PaintError::NativeImage("eglCreateImageKHR returned EGL_NO_IMAGE_KHR".into()));
        }
        Ok(NativeImage {
            image,
            display: egl_ctx.display,
        })
    }

    fn bind_to_texture(&self, gl: &gl::Gles2, texture: gl::types::GLuint) {
        unsafe {
            gl.BindTexture(gl::TEXTURE_2D, texture);
            gl.EGLImageTargetTexture2DOES(gl::TEXTURE_2D, self.image as gl::types::GLeglImageOES);
        }
    }
}

impl Drop for NativeImage {
    fn drop(&mut self) {
        unsafe {
            egl::DestroyImageKHR(self.display, self.image);
        }
    }
}

fn ensure_texture(gl: &gl::Gles2, texture: &mut Option<gl::types::GLuint>) -> gl::types::GLuint {
    if let Some(tex) = texture {
        return *tex;
    }
    unsafe {
        let mut tex = 0;
        gl.GenTextures(1, &mut tex);
        gl.BindTexture(gl::TEXTURE_2D, tex);
        gl.TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as gl::types::GLint);
        gl.TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as gl::types::GLint);
        gl.TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as gl::types::GLint);
        gl.TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as gl::types::GLint);
        *texture = Some(tex);
        tex
    }
}

/// Uploads `pixmap`'s current contents into `texture`/`native_image`,
/// preferring the zero-copy path. The caller (the paint driver) is
/// responsible for calling this only when the window is marked damaged.
pub fn upload<C: Connection>(
    conn: &C,
    gl: &gl::Gles2,
    egl_ctx: &EglContext,
    pixmap: Pixmap,
    texture: &mut Option<gl::types::GLuint>,
    native_image: &mut Option<NativeImage>,
) -> Result<(), PaintError> {
    let geom = conn.get_geometry(pixmap)?.reply()?;
    if geom.width == 0 || geom.height == 0 {
        return Err(PaintError::ZeroSizedPixmap);
    }

    let tex = ensure_texture(gl, texture);

    if egl_ctx.supports_pixmap_image {
        *native_image = None;
        let image = NativeImage::create(egl_ctx, pixmap)?;
        image.bind_to_texture(gl, tex);
        *native_image = Some(image);
        return Ok(());
    }

    upload_via_get_image(conn, gl, pixmap, tex, geom.width, geom.height, geom.depth)
}

fn upload_via_get_image<C: Connection>(
    conn: &C,
    gl: &gl::Gles2,
    pixmap: Pixmap,
    texture: gl::types::GLuint,
    width: u16,
    height: u16,
    depth: u8,
) -> Result<(), PaintError> {
    if depth != 24 && depth != 32 {
        return Err(PaintError::UnsupportedDepth(depth));
    }

    let reply = conn
        .get_image(ImageFormat::Z_PIXMAP, pixmap, 0, 0, width, height, !0)?
        .reply()?;
    let mut data = reply.data;

    // x11rb returns bytes in the server's native order; on the overwhelming
    // majority of deployed X servers (and always on little-endian hosts)
    // that's BGRA for 24/32-bit ZPixmap data, matching the original's
    // LSBFirst branch.
    let format = gl::BGRA_EXT;

    // Depth-24 pixmaps carry an undefined byte where alpha would be; depth
    // 32 is left untouched so ARGB windows keep their real alpha channel.
    if depth == 24 && data.len() >= width as usize * height as usize * 4 {
        for px in data.chunks_exact_mut(4) {
            px[3] = 0xFF;
        }
    }

    debug!(width, height, depth, "uploaded window texture via GetImage fallback");

    unsafe {
        gl.BindTexture(gl::TEXTURE_2D, texture);
        gl.TexImage2D(
            gl::TEXTURE_2D,
            0,
            gl::RGBA8 as gl::types::GLint,
            width as gl::types::GLsizei,
            height as gl::types::GLsizei,
            0,
            format,
            gl::UNSIGNED_BYTE,
            data.as_ptr() as *const _,
        );
    }
    Ok(())
}
