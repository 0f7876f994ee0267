use gl_generator::{Api, Fallbacks, Profile, Registry};
use std::{env, fs::File, path::PathBuf};

fn main() {
    let dest = PathBuf::from(env::var("OUT_DIR").unwrap());

    let mut egl_file = File::create(dest.join("egl_bindings.rs")).unwrap();
    Registry::new(
        Api::Egl,
        (1, 5),
        Profile::Core,
        Fallbacks::All,
        ["EGL_KHR_image_base", "EGL_KHR_image_pixmap", "EGL_EXT_image_dma_buf_import"],
    )
    .write_bindings(gl_generator::GlobalGenerator, &mut egl_file)
    .unwrap();

    let mut gl_file = File::create(dest.join("gl_bindings.rs")).unwrap();
    Registry::new(
        Api::Gles2,
        (3, 0),
        Profile::Core,
        Fallbacks::All,
        ["GL_OES_EGL_image", "GL_EXT_texture_format_BGRA8888"],
    )
        .write_bindings(gl_generator::StructGenerator, &mut gl_file)
        .unwrap();
}
