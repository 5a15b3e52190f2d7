//! OpenGL backend over `glow`.
//!
//! Wraps a `glow::Context` behind the [`RenderBackend`] trait. The caller
//! owns context creation (through a windowing toolkit or offscreen
//! context); this backend maps the trait's integer handles onto the native
//! objects it creates and forwards every operation.

use std::collections::HashMap;

use glow::HasContext;
use parking_lot::Mutex;

use silene_core::vertex::VertexAttribute;

use crate::error::ApiError;
use crate::program::ShaderStage;
use crate::uniform::UniformValue;

use super::{
    BufferHandle, BufferTarget, FramebufferHandle, ProgramHandle, RenderBackend, ShaderHandle,
    TextureFilter, TextureHandle, TextureParameter, TextureUnit, TextureWrap, UniformSlot,
    VertexArrayHandle,
};

#[derive(Default)]
struct Registry {
    next_handle: u64,
    shaders: HashMap<u64, glow::NativeShader>,
    programs: HashMap<u64, glow::NativeProgram>,
    textures: HashMap<u64, glow::NativeTexture>,
    buffers: HashMap<u64, glow::NativeBuffer>,
    vertex_arrays: HashMap<u64, glow::NativeVertexArray>,
    framebuffers: HashMap<u64, glow::NativeFramebuffer>,
    /// Native uniform locations keyed by the slot index handed out for them.
    uniform_locations: HashMap<i32, glow::NativeUniformLocation>,
    next_slot: i32,
}

impl Registry {
    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// [`RenderBackend`] implementation over a live OpenGL context.
pub struct GlowBackend {
    gl: glow::Context,
    registry: Mutex<Registry>,
}

impl GlowBackend {
    /// Wrap an existing context. The context must stay current on the
    /// calling thread for the lifetime of the backend; the whole system is
    /// single-threaded by design.
    pub fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            registry: Mutex::new(Registry::default()),
        }
    }

    fn stage_type(stage: ShaderStage) -> u32 {
        match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }

    fn filter_value(filter: TextureFilter) -> i32 {
        match filter {
            TextureFilter::Nearest => glow::NEAREST as i32,
            TextureFilter::Linear => glow::LINEAR as i32,
        }
    }

    fn wrap_value(wrap: TextureWrap) -> i32 {
        match wrap {
            TextureWrap::Repeat => glow::REPEAT as i32,
            TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT as i32,
            TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE as i32,
            TextureWrap::ClampToBorder => glow::CLAMP_TO_BORDER as i32,
        }
    }
}

impl RenderBackend for GlowBackend {
    fn name(&self) -> &'static str {
        "OpenGL"
    }

    fn create_shader(&self, stage: ShaderStage) -> ShaderHandle {
        let mut registry = self.registry.lock();
        let id = registry.allocate();
        match unsafe { self.gl.create_shader(Self::stage_type(stage)) } {
            Ok(shader) => {
                registry.shaders.insert(id, shader);
            }
            Err(error) => log::error!("failed to create {stage} shader object: {error}"),
        }
        ShaderHandle(id)
    }

    fn shader_source(&self, shader: ShaderHandle, source: &str) {
        let registry = self.registry.lock();
        if let Some(native) = registry.shaders.get(&shader.0) {
            unsafe { self.gl.shader_source(*native, source) };
        }
    }

    fn compile_shader(&self, shader: ShaderHandle) -> Result<(), String> {
        let registry = self.registry.lock();
        let native = registry
            .shaders
            .get(&shader.0)
            .ok_or_else(|| "no such shader object".to_owned())?;
        unsafe {
            self.gl.compile_shader(*native);
            if self.gl.get_shader_compile_status(*native) {
                Ok(())
            } else {
                Err(self.gl.get_shader_info_log(*native))
            }
        }
    }

    fn delete_shader(&self, shader: ShaderHandle) {
        let mut registry = self.registry.lock();
        if let Some(native) = registry.shaders.remove(&shader.0) {
            unsafe { self.gl.delete_shader(native) };
        }
    }

    fn create_program(&self) -> ProgramHandle {
        let mut registry = self.registry.lock();
        let id = registry.allocate();
        match unsafe { self.gl.create_program() } {
            Ok(program) => {
                registry.programs.insert(id, program);
            }
            Err(error) => log::error!("failed to create program object: {error}"),
        }
        ProgramHandle(id)
    }

    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        let registry = self.registry.lock();
        if let (Some(program), Some(shader)) = (
            registry.programs.get(&program.0),
            registry.shaders.get(&shader.0),
        ) {
            unsafe { self.gl.attach_shader(*program, *shader) };
        }
    }

    fn detach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        let registry = self.registry.lock();
        if let (Some(program), Some(shader)) = (
            registry.programs.get(&program.0),
            registry.shaders.get(&shader.0),
        ) {
            unsafe { self.gl.detach_shader(*program, *shader) };
        }
    }

    fn link_program(&self, program: ProgramHandle) -> Result<(), String> {
        let registry = self.registry.lock();
        let native = registry
            .programs
            .get(&program.0)
            .ok_or_else(|| "no such program object".to_owned())?;
        unsafe {
            self.gl.link_program(*native);
            if self.gl.get_program_link_status(*native) {
                Ok(())
            } else {
                Err(self.gl.get_program_info_log(*native))
            }
        }
    }

    fn use_program(&self, program: ProgramHandle) {
        let registry = self.registry.lock();
        if let Some(native) = registry.programs.get(&program.0) {
            unsafe { self.gl.use_program(Some(*native)) };
        }
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut registry = self.registry.lock();
        if let Some(native) = registry.programs.remove(&program.0) {
            unsafe { self.gl.delete_program(native) };
        }
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformSlot> {
        let mut registry = self.registry.lock();
        let native = *registry.programs.get(&program.0)?;
        let location = unsafe { self.gl.get_uniform_location(native, name) }?;
        let slot = registry.next_slot;
        registry.next_slot += 1;
        registry.uniform_locations.insert(slot, location);
        Some(UniformSlot(slot))
    }

    fn set_uniform(&self, slot: UniformSlot, value: &UniformValue) {
        let registry = self.registry.lock();
        let location = match registry.uniform_locations.get(&slot.0) {
            Some(location) => location.clone(),
            None => return,
        };
        let loc = Some(&location);

        // nalgebra matrices are RxC row-by-column and stored column-major;
        // the native MatrixAxB upload names A columns by B rows, so the
        // rectangular shapes swap names. Matrix data is never transposed.
        unsafe {
            match value {
                UniformValue::Float(v) => self.gl.uniform_1_f32(loc, *v),
                UniformValue::Int(v) => self.gl.uniform_1_i32(loc, *v),
                UniformValue::UInt(v) => self.gl.uniform_1_u32(loc, *v),
                UniformValue::Double(v) => self.gl.uniform_1_f32(loc, *v as f32),
                UniformValue::Half(v) => self.gl.uniform_1_f32(loc, v.to_f32()),
                UniformValue::Vec2(v) => self.gl.uniform_2_f32(loc, v.x, v.y),
                UniformValue::IVec2(v) => self.gl.uniform_2_i32(loc, v.x, v.y),
                UniformValue::HVec2(v) => {
                    self.gl.uniform_2_f32(loc, v.x.to_f32(), v.y.to_f32())
                }
                UniformValue::Vec3(v) => self.gl.uniform_3_f32(loc, v.x, v.y, v.z),
                UniformValue::IVec3(v) => self.gl.uniform_3_i32(loc, v.x, v.y, v.z),
                UniformValue::HVec3(v) => {
                    self.gl
                        .uniform_3_f32(loc, v.x.to_f32(), v.y.to_f32(), v.z.to_f32())
                }
                UniformValue::Vec4(v) => self.gl.uniform_4_f32(loc, v.x, v.y, v.z, v.w),
                UniformValue::IVec4(v) => self.gl.uniform_4_i32(loc, v.x, v.y, v.z, v.w),
                UniformValue::HVec4(v) => self.gl.uniform_4_f32(
                    loc,
                    v.x.to_f32(),
                    v.y.to_f32(),
                    v.z.to_f32(),
                    v.w.to_f32(),
                ),
                UniformValue::Mat2(m) => {
                    self.gl.uniform_matrix_2_f32_slice(loc, false, m.as_slice())
                }
                UniformValue::Mat2x3(m) => {
                    self.gl
                        .uniform_matrix_3x2_f32_slice(loc, false, m.as_slice())
                }
                UniformValue::Mat2x4(m) => {
                    self.gl
                        .uniform_matrix_4x2_f32_slice(loc, false, m.as_slice())
                }
                UniformValue::Mat3x2(m) => {
                    self.gl
                        .uniform_matrix_2x3_f32_slice(loc, false, m.as_slice())
                }
                UniformValue::Mat3(m) => {
                    self.gl.uniform_matrix_3_f32_slice(loc, false, m.as_slice())
                }
                UniformValue::Mat3x4(m) => {
                    self.gl
                        .uniform_matrix_4x3_f32_slice(loc, false, m.as_slice())
                }
                UniformValue::Mat4x2(m) => {
                    self.gl
                        .uniform_matrix_2x4_f32_slice(loc, false, m.as_slice())
                }
                UniformValue::Mat4x3(m) => {
                    self.gl
                        .uniform_matrix_3x4_f32_slice(loc, false, m.as_slice())
                }
                UniformValue::Mat4(m) => {
                    self.gl.uniform_matrix_4_f32_slice(loc, false, m.as_slice())
                }
            }
        }
    }

    fn create_texture(&self) -> TextureHandle {
        let mut registry = self.registry.lock();
        let id = registry.allocate();
        match unsafe { self.gl.create_texture() } {
            Ok(texture) => {
                registry.textures.insert(id, texture);
            }
            Err(error) => log::error!("failed to create texture object: {error}"),
        }
        TextureHandle(id)
    }

    fn bind_texture(&self, unit: TextureUnit, texture: Option<TextureHandle>) {
        let registry = self.registry.lock();
        let native = texture.and_then(|t| registry.textures.get(&t.0).copied());
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit.index());
            self.gl.bind_texture(glow::TEXTURE_2D, native);
        }
    }

    fn tex_image_2d(&self, texture: TextureHandle, width: u32, height: u32, pixels: &[u8]) {
        let registry = self.registry.lock();
        if let Some(native) = registry.textures.get(&texture.0) {
            unsafe {
                self.gl.bind_texture(glow::TEXTURE_2D, Some(*native));
                self.gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    glow::RGBA8 as i32,
                    width as i32,
                    height as i32,
                    0,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    Some(pixels),
                );
                self.gl.bind_texture(glow::TEXTURE_2D, None);
            }
        }
    }

    fn tex_parameter(&self, texture: TextureHandle, parameter: TextureParameter) {
        let registry = self.registry.lock();
        if let Some(native) = registry.textures.get(&texture.0) {
            let (name, value) = match parameter {
                TextureParameter::MinFilter(f) => {
                    (glow::TEXTURE_MIN_FILTER, Self::filter_value(f))
                }
                TextureParameter::MagFilter(f) => {
                    (glow::TEXTURE_MAG_FILTER, Self::filter_value(f))
                }
                TextureParameter::WrapS(w) => (glow::TEXTURE_WRAP_S, Self::wrap_value(w)),
                TextureParameter::WrapT(w) => (glow::TEXTURE_WRAP_T, Self::wrap_value(w)),
            };
            unsafe {
                self.gl.bind_texture(glow::TEXTURE_2D, Some(*native));
                self.gl.tex_parameter_i32(glow::TEXTURE_2D, name, value);
                self.gl.bind_texture(glow::TEXTURE_2D, None);
            }
        }
    }

    fn generate_mipmap(&self, texture: TextureHandle) {
        let registry = self.registry.lock();
        if let Some(native) = registry.textures.get(&texture.0) {
            unsafe {
                self.gl.bind_texture(glow::TEXTURE_2D, Some(*native));
                self.gl.generate_mipmap(glow::TEXTURE_2D);
                self.gl.bind_texture(glow::TEXTURE_2D, None);
            }
        }
    }

    fn delete_texture(&self, texture: TextureHandle) {
        let mut registry = self.registry.lock();
        if let Some(native) = registry.textures.remove(&texture.0) {
            unsafe { self.gl.delete_texture(native) };
        }
    }

    fn create_buffer(&self) -> BufferHandle {
        let mut registry = self.registry.lock();
        let id = registry.allocate();
        match unsafe { self.gl.create_buffer() } {
            Ok(buffer) => {
                registry.buffers.insert(id, buffer);
            }
            Err(error) => log::error!("failed to create buffer object: {error}"),
        }
        BufferHandle(id)
    }

    fn buffer_data(&self, target: BufferTarget, buffer: BufferHandle, data: &[u8]) {
        let registry = self.registry.lock();
        if let Some(native) = registry.buffers.get(&buffer.0) {
            let target = match target {
                BufferTarget::Array => glow::ARRAY_BUFFER,
                BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
            };
            unsafe {
                self.gl.bind_buffer(target, Some(*native));
                self.gl.buffer_data_u8_slice(target, data, glow::STATIC_DRAW);
                self.gl.bind_buffer(target, None);
            }
        }
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        let mut registry = self.registry.lock();
        if let Some(native) = registry.buffers.remove(&buffer.0) {
            unsafe { self.gl.delete_buffer(native) };
        }
    }

    fn create_vertex_array(&self) -> VertexArrayHandle {
        let mut registry = self.registry.lock();
        let id = registry.allocate();
        match unsafe { self.gl.create_vertex_array() } {
            Ok(vao) => {
                registry.vertex_arrays.insert(id, vao);
            }
            Err(error) => log::error!("failed to create vertex array object: {error}"),
        }
        VertexArrayHandle(id)
    }

    fn configure_vertex_array(
        &self,
        vertex_array: VertexArrayHandle,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        stride: usize,
        attributes: &[VertexAttribute],
    ) {
        let registry = self.registry.lock();
        let (Some(vao), Some(vbo), Some(ibo)) = (
            registry.vertex_arrays.get(&vertex_array.0),
            registry.buffers.get(&vertex_buffer.0),
            registry.buffers.get(&index_buffer.0),
        ) else {
            return;
        };
        unsafe {
            self.gl.bind_vertex_array(Some(*vao));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(*vbo));
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(*ibo));
            for attribute in attributes {
                self.gl.enable_vertex_attrib_array(attribute.index);
                self.gl.vertex_attrib_pointer_f32(
                    attribute.index,
                    attribute.components,
                    glow::FLOAT,
                    false,
                    stride as i32,
                    attribute.offset as i32,
                );
            }
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayHandle>) {
        let registry = self.registry.lock();
        let native = vertex_array.and_then(|v| registry.vertex_arrays.get(&v.0).copied());
        unsafe { self.gl.bind_vertex_array(native) };
    }

    fn draw_elements(&self, index_count: i32) {
        unsafe {
            self.gl
                .draw_elements(glow::TRIANGLES, index_count, glow::UNSIGNED_INT, 0)
        };
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle) {
        let mut registry = self.registry.lock();
        if let Some(native) = registry.vertex_arrays.remove(&vertex_array.0) {
            unsafe { self.gl.delete_vertex_array(native) };
        }
    }

    fn create_framebuffer(&self) -> FramebufferHandle {
        let mut registry = self.registry.lock();
        let id = registry.allocate();
        match unsafe { self.gl.create_framebuffer() } {
            Ok(framebuffer) => {
                registry.framebuffers.insert(id, framebuffer);
            }
            Err(error) => log::error!("failed to create framebuffer object: {error}"),
        }
        FramebufferHandle(id)
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>) {
        let registry = self.registry.lock();
        let native = framebuffer.and_then(|f| registry.framebuffers.get(&f.0).copied());
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, native) };
    }

    fn framebuffer_color_texture(&self, framebuffer: FramebufferHandle, texture: TextureHandle) {
        let registry = self.registry.lock();
        if let (Some(fbo), Some(tex)) = (
            registry.framebuffers.get(&framebuffer.0),
            registry.textures.get(&texture.0),
        ) {
            unsafe {
                self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(*fbo));
                self.gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    glow::COLOR_ATTACHMENT0,
                    glow::TEXTURE_2D,
                    Some(*tex),
                    0,
                );
                self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            }
        }
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferHandle) {
        let mut registry = self.registry.lock();
        if let Some(native) = registry.framebuffers.remove(&framebuffer.0) {
            unsafe { self.gl.delete_framebuffer(native) };
        }
    }

    fn poll_error(&self) -> Option<ApiError> {
        ApiError::from_code(unsafe { self.gl.get_error() })
    }
}
