//! Raw EGL/GLES bindings and the `dlopen`-based loader that brings them up.
//!
//! Grounded on Smithay's `backend::egl::ffi`: bindings are generated at
//! build time by `gl_generator` (see `build.rs`) and loaded through
//! `libloading` rather than linked, so the binary runs on any GLVND or
//! legacy driver stack without a build-time `-lEGL`/`-lGLESv2`. EGL is
//! generated as free functions (`gl_generator::GlobalGenerator`, matching
//! `backend::egl::ffi::egl`); GLES2 is generated as methods on a `Gles2`
//! struct (`gl_generator::StructGenerator`, matching
//! `backend::renderer::gles2::ffi`), since a compositor process only ever
//! needs a single EGL function table but may in principle hold several GL
//! contexts.

use std::ffi::CString;
use std::os::raw::c_void;
use std::sync::OnceLock;

use libloading::Library;

use crate::error::InitError;

pub mod egl {
    #![allow(clippy::all, non_upper_case_globals, non_snake_case, dead_code)]

    pub type khronos_utime_nanoseconds_t = khronos_uint64_t;
    pub type khronos_uint64_t = u64;
    pub type khronos_ssize_t = std::os::raw::c_long;
    pub type EGLint = i32;
    pub type EGLNativeDisplayType = NativeDisplayType;
    pub type EGLNativePixmapType = NativePixmapType;
    pub type EGLNativeWindowType = NativeWindowType;
    pub type NativeDisplayType = *const std::os::raw::c_void;
    pub type NativePixmapType = *const std::os::raw::c_void;
    pub type NativeWindowType = *const std::os::raw::c_void;

    include!(concat!(env!("OUT_DIR"), "/egl_bindings.rs"));
}

pub mod gl {
    #![allow(clippy::all, non_upper_case_globals, non_snake_case, dead_code)]
    include!(concat!(env!("OUT_DIR"), "/gl_bindings.rs"));
}

static EGL_LIB: OnceLock<Library> = OnceLock::new();
static GL_LIB: OnceLock<Library> = OnceLock::new();

fn load_lib(name: &'static str) -> Result<&'static Library, InitError> {
    // SAFETY: loading a system driver library by its conventional soname;
    // every symbol resolved through it is only ever called with the argument
    // shapes gl_generator's bindings encode.
    let lib = unsafe { Library::new(name) }.map_err(|source| InitError::LoadLibrary { lib: name, source })?;
    Ok(match name {
        "libEGL.so.1" => EGL_LIB.get_or_init(|| lib),
        _ => GL_LIB.get_or_init(|| lib),
    })
}

fn dlsym(lib: &Library, sym: &str) -> *const c_void {
    let name = match CString::new(sym) {
        Ok(n) => n,
        Err(_) => return std::ptr::null(),
    };
    unsafe {
        lib.get::<*mut c_void>(name.as_bytes_with_nul())
            .map(|ptr| *ptr as *const c_void)
            .unwrap_or(std::ptr::null())
    }
}

/// Loads `libEGL.so.1`, resolves every `egl::` entry point, then loads
/// `libGLESv2.so.2` and returns a `Gles2` function table. Must run exactly
/// once, before any other `gpu` module is touched.
pub fn load() -> Result<gl::Gles2, InitError> {
    let egl_lib = load_lib("libEGL.so.1")?;
    egl::load_with(|sym| dlsym(egl_lib, sym));

    let gl_lib = load_lib("libGLESv2.so.2")?;
    let gles2 = gl::Gles2::load_with(|sym| {
        let direct = dlsym(gl_lib, sym);
        if !direct.is_null() {
            return direct;
        }
        // Extension and some core entry points are only resolvable through
        // eglGetProcAddress, not the library's dynsym table.
        let cname = CString::new(sym).unwrap_or_default();
        unsafe { egl::GetProcAddress(cname.as_ptr()) as *const c_void }
    });
    Ok(gles2)
}
