use std::sync::Arc;

use glow::HasContext;

use crate::error::{Error, PlatformError, Result};
use crate::presenter::{FRAGMENT_SHADER, QUAD_POSITIONS, QUAD_TEX_COORDS, RenderBackend, VERTEX_SHADER};
use crate::types::Size;

const POSITION_ATTRIB: u32 = 0;
const TEX_COORD_ATTRIB: u32 = 1;

struct GlObjects {
    program: glow::NativeProgram,
    texture: glow::NativeTexture,
    positions: glow::NativeBuffer,
    tex_coords: glow::NativeBuffer,
    sampler: Option<glow::NativeUniformLocation>,
}

/// Renders through `glow`. The context must be current on the thread that
/// drives the [`Presenter`](crate::presenter::Presenter).
pub struct GlBackend {
    gl: Arc<glow::Context>,
    objects: Option<GlObjects>,
}

impl GlBackend {
    pub fn new(gl: Arc<glow::Context>) -> Self {
        GlBackend { gl, objects: None }
    }

    fn objects(&self) -> Result<&GlObjects> {
        self.objects
            .as_ref()
            .ok_or_else(|| Error::Platform(PlatformError::Message("backend not initialised".into())))
    }
}

fn gl_err(what: &str, e: String) -> Error {
    Error::Platform(PlatformError::Message(format!("{what} failed: {e}")))
}

unsafe fn compile_shader(gl: &glow::Context, stage: u32, source: &str) -> Result<glow::NativeShader> {
    let name = if stage == glow::VERTEX_SHADER { "vertex" } else { "fragment" };
    let shader = unsafe { gl.create_shader(stage) }.map_err(|e| gl_err("create_shader", e))?;
    unsafe {
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(Error::Platform(PlatformError::Shader { stage: name, log }));
        }
    }
    Ok(shader)
}

unsafe fn link_program(gl: &glow::Context) -> Result<glow::NativeProgram> {
    let vs = unsafe { compile_shader(gl, glow::VERTEX_SHADER, VERTEX_SHADER)? };
    let fs = match unsafe { compile_shader(gl, glow::FRAGMENT_SHADER, FRAGMENT_SHADER) } {
        Ok(fs) => fs,
        Err(e) => {
            unsafe { gl.delete_shader(vs) };
            return Err(e);
        }
    };

    let program = unsafe { gl.create_program() }.map_err(|e| gl_err("create_program", e))?;
    unsafe {
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.bind_attrib_location(program, POSITION_ATTRIB, "aPosition");
        gl.bind_attrib_location(program, TEX_COORD_ATTRIB, "aTexCoord");
        gl.link_program(program);
        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(Error::Platform(PlatformError::Link(log)));
        }
    }
    Ok(program)
}

unsafe fn static_buffer(gl: &glow::Context, data: &[f32]) -> Result<glow::NativeBuffer> {
    let buffer = unsafe { gl.create_buffer() }.map_err(|e| gl_err("create_buffer", e))?;
    // SAFETY: f32 has no padding and any byte pattern is a valid u8.
    let bytes = unsafe {
        core::slice::from_raw_parts(data.as_ptr() as *const u8, core::mem::size_of_val(data))
    };
    unsafe {
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
        gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytes, glow::STATIC_DRAW);
        gl.bind_buffer(glow::ARRAY_BUFFER, None);
    }
    Ok(buffer)
}

impl RenderBackend for GlBackend {
    fn init(&mut self) -> Result<()> {
        let gl = &*self.gl;
        unsafe {
            let program = link_program(gl)?;
            let positions = static_buffer(gl, &QUAD_POSITIONS)?;
            let tex_coords = static_buffer(gl, &QUAD_TEX_COORDS)?;
            let sampler = gl.get_uniform_location(program, "uTexture");

            let texture = gl.create_texture().map_err(|e| gl_err("create_texture", e))?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.bind_texture(glow::TEXTURE_2D, None);

            self.objects = Some(GlObjects {
                program,
                texture,
                positions,
                tex_coords,
                sampler,
            });
        }
        tracing::debug!("gl backend initialised");
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        unsafe { self.gl.viewport(0, 0, width as i32, height as i32) };
    }

    fn upload_luminance(&mut self, size: Size, data: &[u8], reinit: bool) -> Result<()> {
        if data.len() != size.pixel_count() {
            return Err(Error::BufferSize {
                expected: size.pixel_count(),
                actual: data.len(),
            });
        }
        let texture = self.objects()?.texture;
        let gl = &*self.gl;
        let (w, h) = (size.width as i32, size.height as i32);
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            // Rows of a single-channel image are not 4-byte aligned in general.
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            if reinit {
                gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    glow::LUMINANCE as i32,
                    w,
                    h,
                    0,
                    glow::LUMINANCE,
                    glow::UNSIGNED_BYTE,
                    Some(data),
                );
            } else {
                gl.tex_sub_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    0,
                    0,
                    w,
                    h,
                    glow::LUMINANCE,
                    glow::UNSIGNED_BYTE,
                    glow::PixelUnpackData::Slice(data),
                );
            }
            gl.bind_texture(glow::TEXTURE_2D, None);
        }
        Ok(())
    }

    fn draw_quad(&mut self, clear_color: [f32; 4]) -> Result<()> {
        self.clear(clear_color)?;
        let objects = self.objects()?;
        let gl = &*self.gl;
        unsafe {
            gl.use_program(Some(objects.program));

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(objects.positions));
            gl.enable_vertex_attrib_array(POSITION_ATTRIB);
            gl.vertex_attrib_pointer_f32(POSITION_ATTRIB, 2, glow::FLOAT, false, 0, 0);

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(objects.tex_coords));
            gl.enable_vertex_attrib_array(TEX_COORD_ATTRIB);
            gl.vertex_attrib_pointer_f32(TEX_COORD_ATTRIB, 2, glow::FLOAT, false, 0, 0);

            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(objects.texture));
            gl.uniform_1_i32(objects.sampler.as_ref(), 0);

            gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);

            gl.disable_vertex_attrib_array(POSITION_ATTRIB);
            gl.disable_vertex_attrib_array(TEX_COORD_ATTRIB);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.use_program(None);
        }
        Ok(())
    }

    fn clear(&mut self, clear_color: [f32; 4]) -> Result<()> {
        let [r, g, b, a] = clear_color;
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
        Ok(())
    }
}

impl Drop for GlBackend {
    fn drop(&mut self) {
        if let Some(objects) = self.objects.take() {
            unsafe {
                self.gl.delete_program(objects.program);
                self.gl.delete_texture(objects.texture);
                self.gl.delete_buffer(objects.positions);
                self.gl.delete_buffer(objects.tex_coords);
            }
        }
    }
}
