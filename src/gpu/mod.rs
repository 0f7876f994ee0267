//! GPU surface bring-up: overlay window, EGL context, quad shader, and the
//! (currently unbound) offscreen framebuffer scaffold for future off-screen
//! composition. Grounded on Smithay's
//! `backend::renderer::gles2::Gles2Renderer` for the blend/depth-state setup
//! that follows context creation.

pub mod egl;
pub mod ffi;
pub mod shader;
pub mod texture;

use std::os::raw::c_void;

use tracing::info;
use x11rb::connection::Connection;
use x11rb::protocol::composite::ConnectionExt as _;
use x11rb::protocol::xfixes::ConnectionExt as _;
use x11rb::protocol::xproto::Window as XWindow;

use crate::error::InitError;
use egl::EglContext;
use ffi::gl;
use shader::QuadProgram;

/// An offscreen color target sized to the root window. Allocated at startup
/// and resized alongside the root but never bound as the paint driver's
/// draw target; it exists so a future off-screen-composition mode (e.g. to
/// support server-side blur or screen capture of the composited result)
/// does not need to restructure `GpuSurface`.
struct RootFbo {
    fbo: gl::types::GLuint,
    texture: gl::types::GLuint,
    width: u16,
    height: u16,
}

pub struct GpuSurface {
    pub egl: EglContext,
    pub gl: gl::Gles2,
    pub quad: QuadProgram,
    root_fbo: RootFbo,
    pub screen_w: u16,
    pub screen_h: u16,
}

impl GpuSurface {
    /// `overlay` is the composite overlay window already acquired and
    /// shape-masked to empty by the caller; `root_w`/`root_h` size the
    /// (currently unbound) offscreen framebuffer.
    pub fn new(native_display: *mut c_void, overlay: XWindow, root_w: u16, root_h: u16) -> Result<Self, InitError> {
        let gl = ffi::load()?;
        let egl_ctx = EglContext::new(native_display, overlay)?;

        unsafe {
            gl.Enable(gl::BLEND);
            gl.BlendFunc(gl::ONE, gl::ONE_MINUS_SRC_ALPHA);
            gl.Disable(gl::DEPTH_TEST);
        }

        let quad = QuadProgram::compile(&gl)?;
        let root_fbo = alloc_root_fbo(&gl, root_w, root_h);

        info!(supports_pixmap_image = egl_ctx.supports_pixmap_image, "GPU surface ready");

        Ok(GpuSurface {
            egl: egl_ctx,
            gl,
            quad,
            root_fbo,
            screen_w: root_w,
            screen_h: root_h,
        })
    }

    /// ConfigureNotify on the root window resizes the scaffold framebuffer
    /// to match.
    pub fn resize_root(&mut self, width: u16, height: u16) {
        if width == self.root_fbo.width && height == self.root_fbo.height {
            return;
        }
        unsafe {
            self.gl.DeleteFramebuffers(1, &self.root_fbo.fbo);
            self.gl.DeleteTextures(1, &self.root_fbo.texture);
        }
        self.root_fbo = alloc_root_fbo(&self.gl, width, height);
        self.screen_w = width;
        self.screen_h = height;
    }

    pub fn bind_default_framebuffer_and_clear(&self, r: f32, g: f32, b: f32) {
        unsafe {
            self.gl.BindFramebuffer(gl::FRAMEBUFFER, 0);
            self.gl.Viewport(0, 0, self.screen_w as i32, self.screen_h as i32);
            self.gl.ClearColor(r, g, b, 1.0);
            self.gl.Clear(gl::COLOR_BUFFER_BIT);
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_quad(&self, texture: gl::types::GLuint, x: f32, y: f32, w: f32, h: f32, alpha: f32) {
        self.quad
            .draw_quad(&self.gl, texture, x, y, w, h, alpha, self.screen_w as f32, self.screen_h as f32);
    }

    pub fn swap_buffers(&self) {
        self.egl.swap_buffers();
    }
}

fn alloc_root_fbo(gl: &gl::Gles2, width: u16, height: u16) -> RootFbo {
    unsafe {
        let mut texture = 0;
        gl.GenTextures(1, &mut texture);
        gl.BindTexture(gl::TEXTURE_2D, texture);
        gl.TexImage2D(
            gl::TEXTURE_2D,
            0,
            gl::RGBA8 as gl::types::GLint,
            width.max(1) as gl::types::GLsizei,
            height.max(1) as gl::types::GLsizei,
            0,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            std::ptr::null(),
        );
        gl.TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as gl::types::GLint);
        gl.TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as gl::types::GLint);

        let mut fbo = 0;
        gl.GenFramebuffers(1, &mut fbo);
        gl.BindFramebuffer(gl::FRAMEBUFFER, fbo);
        gl.FramebufferTexture2D(gl::FRAMEBUFFER, gl::COLOR_ATTACHMENT0, gl::TEXTURE_2D, texture, 0);
        gl.BindFramebuffer(gl::FRAMEBUFFER, 0);

        RootFbo {
            fbo,
            texture,
            width,
            height,
        }
    }
}

/// Acquires the composite overlay window and masks its input shape to
/// empty, so it never steals events from windows below it. Grounded on the
/// original's `allocate_root_background`
/// overlay setup plus `XShapeCombineRectangles(..., ShapeInput, ..., 0, ...)`
/// in `commoner.c`'s compositor bring-up.
pub fn acquire_overlay<C: Connection>(conn: &C, root: XWindow) -> Result<XWindow, InitError> {
    let overlay = conn.composite_get_overlay_window(root)?.reply()?.overlay_win;
    conn.xfixes_query_version(5, 0)?.reply()?;
    x11rb::protocol::shape::ConnectionExt::shape_rectangles(
        conn,
        x11rb::protocol::shape::SO::SET,
        x11rb::protocol::shape::SK::INPUT,
        x11rb::protocol::xproto::ClipOrdering::UNSORTED,
        overlay,
        0,
        0,
        &[],
    )?;
    Ok(overlay)
}
