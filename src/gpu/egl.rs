//! EGL display/context/surface bring-up on the compositor overlay window.
//!
//! Grounded on `EGLDisplay::new`/`EGLContext::new` in Smithay's
//! `backend::egl::{display,context}` (load-once, `eglInitialize`,
//! `eglChooseConfig`, `eglCreateContext`), trimmed to the single native
//! target this compositor ever drives: an X11 window, not a generic
//! `native::Backend`.

use std::os::raw::c_void;

use tracing::{debug, info};
use x11rb::protocol::xproto::Window as XWindow;

use super::ffi::egl;
use crate::error::InitError;

pub struct EglContext {
    pub display: egl::types::EGLDisplay,
    pub context: egl::types::EGLContext,
    pub surface: egl::types::EGLSurface,
    pub config: egl::types::EGLConfig,
    /// Whether `EGL_KHR_image_pixmap` (zero-copy native-pixmap binding) is
    /// advertised by this display.
    pub supports_pixmap_image: bool,
}

const CONFIG_ATTRIBS: [egl::types::EGLint; 13] = [
    egl::RED_SIZE as egl::types::EGLint,
    8,
    egl::GREEN_SIZE as egl::types::EGLint,
    8,
    egl::BLUE_SIZE as egl::types::EGLint,
    8,
    egl::ALPHA_SIZE as egl::types::EGLint,
    8,
    egl::SURFACE_TYPE as egl::types::EGLint,
    egl::WINDOW_BIT as egl::types::EGLint,
    egl::RENDERABLE_TYPE as egl::types::EGLint,
    egl::OPENGL_ES2_BIT as egl::types::EGLint,
    egl::NONE as egl::types::EGLint,
];

const CONTEXT_ATTRIBS: [egl::types::EGLint; 3] =
    [egl::CONTEXT_CLIENT_VERSION as egl::types::EGLint, 2, egl::NONE as egl::types::EGLint];

impl EglContext {
    /// `native_display` is the `Display*` returned by the X11 connection's
    /// underlying Xlib handle; EGL on X11 is always driven through
    /// `eglGetDisplay` with the native Xlib display, never a bare connection
    /// fd. The caller must have already resolved `egl::` entry points via
    /// [`super::ffi::load`].
    pub fn new(native_display: *mut c_void, overlay: XWindow) -> Result<Self, InitError> {
        let display = unsafe { egl::GetDisplay(native_display as egl::types::NativeDisplayType) };
        if display.is_null() {
            return Err(InitError::Egl("eglGetDisplay returned EGL_NO_DISPLAY".into()));
        }

        let (mut major, mut minor) = (0, 0);
        if unsafe { egl::Initialize(display, &mut major, &mut minor) } == egl::FALSE as egl::types::EGLBoolean
        {
            return Err(InitError::Egl("eglInitialize failed".into()));
        }
        info!(major, minor, "EGL initialized");

        if unsafe { egl::BindAPI(egl::OPENGL_ES_API) } == egl::FALSE as egl::types::EGLBoolean {
            return Err(InitError::Egl("OpenGL ES not supported by this EGL implementation".into()));
        }

        let extensions = query_extensions(display);
        let supports_pixmap_image = extensions.iter().any(|e| e == "EGL_KHR_image_pixmap");
        debug!(supports_pixmap_image, "EGL extension probe");

        let config = choose_config(display)?;

        let context = unsafe {
            egl::CreateContext(display, config, egl::NO_CONTEXT, CONTEXT_ATTRIBS.as_ptr())
        };
        if context.is_null() {
            return Err(InitError::Egl("eglCreateContext failed".into()));
        }

        let surface = unsafe {
            egl::CreateWindowSurface(display, config, overlay as egl::types::NativeWindowType, std::ptr::null())
        };
        if surface.is_null() {
            return Err(InitError::Egl("eglCreateWindowSurface failed".into()));
        }

        if unsafe { egl::MakeCurrent(display, surface, surface, context) }
            == egl::FALSE as egl::types::EGLBoolean
        {
            return Err(InitError::Egl("eglMakeCurrent failed".into()));
        }

        Ok(EglContext {
            display,
            context,
            surface,
            config,
            supports_pixmap_image,
        })
    }

    pub fn swap_buffers(&self) {
        unsafe {
            egl::SwapBuffers(self.display, self.surface);
        }
    }
}

fn query_extensions(display: egl::types::EGLDisplay) -> Vec<String> {
    unsafe {
        let ptr = egl::QueryString(display, egl::EXTENSIONS as egl::types::EGLint);
        if ptr.is_null() {
            return Vec::new();
        }
        std::ffi::CStr::from_ptr(ptr)
            .to_string_lossy()
            .split_whitespace()
            .map(str::to_owned)
            .collect()
    }
}

fn choose_config(display: egl::types::EGLDisplay) -> Result<egl::types::EGLConfig, InitError> {
    let mut config: egl::types::EGLConfig = std::ptr::null();
    let mut num_configs: egl::types::EGLint = 0;
    let ok = unsafe {
        egl::ChooseConfig(display, CONFIG_ATTRIBS.as_ptr(), &mut config, 1, &mut num_configs)
    };
    if ok == egl::FALSE as egl::types::EGLBoolean || num_configs == 0 {
        return Err(InitError::Egl("no suitable EGLConfig (RGBA8, window-capable)".into()));
    }
    Ok(config)
}
