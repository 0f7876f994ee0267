//! The single quad shader used to draw every textured rectangle the
//! compositor ever puts on screen: window contents, shadows, and the root
//! background.
//!
//! Grounded on `compile_shader`/`link_program` in Smithay's
//! `backend::renderer::gles2`, adapted from its generic multi-shader-variant
//! renderer (which compiles a program per capture/blend combination) down to
//! the one shader this compositor needs: two attributes, two uniforms, one
//! sampler, fixed blend mode.

use std::ffi::CString;

use crate::error::InitError;
use crate::gpu::ffi::gl;

const VERTEX_SRC: &str = r#"
attribute vec2 position;
attribute vec2 texcoord;
varying vec2 v_texcoord;
uniform mat4 projection;
void main() {
    gl_Position = projection * vec4(position, 0.0, 1.0);
    v_texcoord = texcoord;
}
"#;

const FRAGMENT_SRC: &str = r#"
precision mediump float;
varying vec2 v_texcoord;
uniform sampler2D tex;
uniform float alpha;
void main() {
    gl_FragColor = texture2D(tex, v_texcoord) * alpha;
}
"#;

unsafe fn compile_shader(gl: &gl::Gles2, kind: gl::types::GLenum, src: &str) -> Result<gl::types::GLuint, InitError> {
    let shader = gl.CreateShader(kind);
    let src_cstr = CString::new(src).expect("shader source has no interior NUL");
    let len = src.len() as gl::types::GLint;
    gl.ShaderSource(shader, 1, &src_cstr.as_ptr(), &len);
    gl.CompileShader(shader);

    let mut status = gl::FALSE as gl::types::GLint;
    gl.GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);
    if status == gl::FALSE as gl::types::GLint {
        let log = shader_info_log(gl, shader);
        gl.DeleteShader(shader);
        return Err(InitError::Shader(log));
    }
    Ok(shader)
}

unsafe fn shader_info_log(gl: &gl::Gles2, shader: gl::types::GLuint) -> String {
    let mut buf = vec![0u8; 1024];
    let mut written: gl::types::GLsizei = 0;
    gl.GetShaderInfoLog(shader, buf.len() as gl::types::GLsizei, &mut written, buf.as_mut_ptr() as *mut _);
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).into_owned()
}

/// The compiled quad program plus its attribute/uniform locations.
pub struct QuadProgram {
    program: gl::types::GLuint,
    position_loc: gl::types::GLint,
    texcoord_loc: gl::types::GLint,
    projection_loc: gl::types::GLint,
    alpha_loc: gl::types::GLint,
    vbo: gl::types::GLuint,
}

impl QuadProgram {
    pub fn compile(gl: &gl::Gles2) -> Result<Self, InitError> {
        unsafe {
            let vert = compile_shader(gl, gl::VERTEX_SHADER, VERTEX_SRC)?;
            let frag = compile_shader(gl, gl::FRAGMENT_SHADER, FRAGMENT_SRC)?;
            let program = gl.CreateProgram();
            gl.AttachShader(program, vert);
            gl.AttachShader(program, frag);
            gl.LinkProgram(program);
            gl.DetachShader(program, vert);
            gl.DetachShader(program, frag);
            gl.DeleteShader(vert);
            gl.DeleteShader(frag);

            let mut status = gl::FALSE as gl::types::GLint;
            gl.GetProgramiv(program, gl::LINK_STATUS, &mut status);
            if status == gl::FALSE as gl::types::GLint {
                gl.DeleteProgram(program);
                return Err(InitError::Shader("quad program failed to link".into()));
            }

            let position_loc = gl.GetAttribLocation(program, c_str(b"position\0").as_ptr());
            let texcoord_loc = gl.GetAttribLocation(program, c_str(b"texcoord\0").as_ptr());
            let projection_loc = gl.GetUniformLocation(program, c_str(b"projection\0").as_ptr());
            let alpha_loc = gl.GetUniformLocation(program, c_str(b"alpha\0").as_ptr());

            let mut vbo = 0;
            gl.GenBuffers(1, &mut vbo);

            Ok(QuadProgram {
                program,
                position_loc,
                texcoord_loc,
                projection_loc,
                alpha_loc,
                vbo,
            })
        }
    }

    /// Draws a textured rectangle at `(x, y, w, h)` in pixel space, against
    /// a top-left-origin Y-flipped ortho projection sized `(screen_w,
    /// screen_h)`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_quad(
        &self,
        gl: &gl::Gles2,
        texture: gl::types::GLuint,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        alpha: f32,
        screen_w: f32,
        screen_h: f32,
    ) {
        let projection = ortho_top_left(screen_w, screen_h);

        #[rustfmt::skip]
        let verts: [f32; 24] = [
            x,     y,     0.0, 0.0,
            x + w, y,     1.0, 0.0,
            x,     y + h, 0.0, 1.0,
            x,     y + h, 0.0, 1.0,
            x + w, y,     1.0, 0.0,
            x + w, y + h, 1.0, 1.0,
        ];

        unsafe {
            gl.UseProgram(self.program);
            gl.ActiveTexture(gl::TEXTURE0);
            gl.BindTexture(gl::TEXTURE_2D, texture);
            gl.Uniform1i(gl.GetUniformLocation(self.program, c_str(b"tex\0").as_ptr()), 0);
            gl.UniformMatrix4fv(self.projection_loc, 1, gl::FALSE, projection.as_ptr());
            gl.Uniform1f(self.alpha_loc, alpha);

            gl.BindBuffer(gl::ARRAY_BUFFER, self.vbo);
            gl.BufferData(
                gl::ARRAY_BUFFER,
                std::mem::size_of_val(&verts) as isize,
                verts.as_ptr() as *const _,
                gl::STREAM_DRAW,
            );

            let stride = 4 * std::mem::size_of::<f32>() as gl::types::GLsizei;
            gl.EnableVertexAttribArray(self.position_loc as gl::types::GLuint);
            gl.VertexAttribPointer(
                self.position_loc as gl::types::GLuint,
                2,
                gl::FLOAT,
                gl::FALSE,
                stride,
                std::ptr::null(),
            );
            gl.EnableVertexAttribArray(self.texcoord_loc as gl::types::GLuint);
            gl.VertexAttribPointer(
                self.texcoord_loc as gl::types::GLuint,
                2,
                gl::FLOAT,
                gl::FALSE,
                stride,
                (2 * std::mem::size_of::<f32>()) as *const _,
            );

            gl.DrawArrays(gl::TRIANGLES, 0, 6);
        }
    }
}

fn c_str(bytes: &'static [u8]) -> &'static std::ffi::CStr {
    std::ffi::CStr::from_bytes_with_nul(bytes).expect("literal is NUL-terminated")
}

/// Column-major 4x4 pixel-space ortho projection, Y flipped so `(0, 0)` is
/// the top-left corner of the surface.
fn ortho_top_left(w: f32, h: f32) -> [f32; 16] {
    [
        2.0 / w, 0.0, 0.0, 0.0,
        0.0, -2.0 / h, 0.0, 0.0,
        0.0, 0.0, -1.0, 0.0,
        -1.0, 1.0, 0.0, 1.0,
    ]
}
