//! Native graphics API abstraction.
//!
//! [`RenderBackend`] is the seam between the resource layer and the native
//! graphics API. Operations mirror the shape of an OpenGL-class API: opaque
//! integer handles, an active program, numbered texture units, and a polled
//! error state. Two implementations exist:
//!
//! - [`HeadlessBackend`] (always built) records all state in memory and is
//!   the default for tests and machines without a GPU.
//! - `GlowBackend` (feature `glow-backend`) forwards to a real OpenGL
//!   context through `glow`.

mod headless;

#[cfg(feature = "glow-backend")]
mod glow_backend;

pub use headless::HeadlessBackend;

#[cfg(feature = "glow-backend")]
pub use glow_backend::GlowBackend;

use silene_core::vertex::VertexAttribute;

use crate::error::ApiError;
use crate::program::ShaderStage;
use crate::uniform::UniformValue;

/// Handle to a native shader stage object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub(crate) u64);

/// Handle to a native linked program.
///
/// Handles are non-zero once created; zero never names a live program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u64);

/// Handle to a native texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u64);

/// Handle to a native buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a native vertex array object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(pub(crate) u64);

/// Handle to a native framebuffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferHandle(pub(crate) u64);

/// The resolved location a compiled program assigns to a named uniform.
///
/// Stable for the life of that linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformSlot(pub(crate) i32);

impl UniformSlot {
    /// The raw location index.
    pub fn index(self) -> i32 {
        self.0
    }
}

/// A hardware texture unit.
///
/// This is a small fixed enumeration of binding points, not an arbitrary
/// integer; the scaffold exposes the sixteen units every GL 3.3 class
/// implementation guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TextureUnit {
    Unit0,
    Unit1,
    Unit2,
    Unit3,
    Unit4,
    Unit5,
    Unit6,
    Unit7,
    Unit8,
    Unit9,
    Unit10,
    Unit11,
    Unit12,
    Unit13,
    Unit14,
    Unit15,
}

impl TextureUnit {
    /// Number of available units.
    pub const COUNT: usize = 16;

    /// The zero-based unit number, as uploaded into sampler uniforms.
    pub fn index(self) -> u32 {
        self as u32
    }

    /// Look a unit up by its zero-based number.
    pub fn from_index(index: u32) -> Option<Self> {
        use TextureUnit::*;
        const UNITS: [TextureUnit; TextureUnit::COUNT] = [
            Unit0, Unit1, Unit2, Unit3, Unit4, Unit5, Unit6, Unit7, Unit8, Unit9, Unit10, Unit11,
            Unit12, Unit13, Unit14, Unit15,
        ];
        UNITS.get(index as usize).copied()
    }
}

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Texture coordinate wrapping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// One texture sampling parameter with its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureParameter {
    MinFilter(TextureFilter),
    MagFilter(TextureFilter),
    WrapS(TextureWrap),
    WrapT(TextureWrap),
}

/// Target a buffer is bound to when its data is pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex data.
    Array,
    /// Index data.
    ElementArray,
}

/// Interface to the native graphics API.
///
/// All methods take `&self`; implementations use interior locks where they
/// keep state. Hard failures with native diagnostics (compile, link) return
/// the log in `Err`; everything else is surfaced through the polled error
/// state, matching how the native API reports misuse.
pub trait RenderBackend: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &'static str;

    // Shaders and programs

    /// Create an empty shader stage object.
    fn create_shader(&self, stage: ShaderStage) -> ShaderHandle;

    /// Replace the source text of a shader stage.
    fn shader_source(&self, shader: ShaderHandle, source: &str);

    /// Compile a shader stage. `Err` carries the native diagnostic log.
    fn compile_shader(&self, shader: ShaderHandle) -> Result<(), String>;

    /// Release a shader stage object.
    fn delete_shader(&self, shader: ShaderHandle);

    /// Create an empty program object.
    fn create_program(&self) -> ProgramHandle;

    /// Attach a compiled stage to a program.
    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle);

    /// Detach a stage from a program.
    fn detach_shader(&self, program: ProgramHandle, shader: ShaderHandle);

    /// Link the attached stages. `Err` carries the native diagnostic log.
    fn link_program(&self, program: ProgramHandle) -> Result<(), String>;

    /// Make a program the active one for subsequent uniform and draw calls.
    fn use_program(&self, program: ProgramHandle);

    /// Release a program object.
    fn delete_program(&self, program: ProgramHandle);

    /// Resolve a uniform name to its slot in a linked program.
    ///
    /// Exact-name lookup; `None` if the program reports no such active
    /// uniform.
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformSlot>;

    /// Push a uniform value to a slot of the active program.
    ///
    /// This is the single kind-keyed upload dispatch: the implementation
    /// selects the 1- to 4-component or matrix upload call from the value's
    /// kind. Matrix uploads are never transposed.
    fn set_uniform(&self, slot: UniformSlot, value: &UniformValue);

    // Textures

    /// Create a texture object.
    fn create_texture(&self) -> TextureHandle;

    /// Bind a texture (or unbind with `None`) on a texture unit.
    fn bind_texture(&self, unit: TextureUnit, texture: Option<TextureHandle>);

    /// Upload RGBA8 pixel data for a texture.
    fn tex_image_2d(&self, texture: TextureHandle, width: u32, height: u32, pixels: &[u8]);

    /// Apply a sampling parameter to a texture.
    fn tex_parameter(&self, texture: TextureHandle, parameter: TextureParameter);

    /// Generate the mipmap chain for a texture.
    fn generate_mipmap(&self, texture: TextureHandle);

    /// Release a texture object.
    fn delete_texture(&self, texture: TextureHandle);

    // Buffers and vertex arrays

    /// Create a buffer object.
    fn create_buffer(&self) -> BufferHandle;

    /// Upload the full contents of a buffer.
    fn buffer_data(&self, target: BufferTarget, buffer: BufferHandle, data: &[u8]);

    /// Release a buffer object.
    fn delete_buffer(&self, buffer: BufferHandle);

    /// Create a vertex array object.
    fn create_vertex_array(&self) -> VertexArrayHandle;

    /// Wire a vertex array to its vertex/index buffers and attribute layout.
    fn configure_vertex_array(
        &self,
        vertex_array: VertexArrayHandle,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        stride: usize,
        attributes: &[VertexAttribute],
    );

    /// Bind a vertex array (or unbind with `None`).
    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayHandle>);

    /// Draw indexed triangles from the bound vertex array.
    fn draw_elements(&self, index_count: i32);

    /// Release a vertex array object.
    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle);

    // Framebuffers

    /// Create a framebuffer object.
    fn create_framebuffer(&self) -> FramebufferHandle;

    /// Bind a framebuffer, or the default framebuffer with `None`.
    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>);

    /// Attach a texture as the framebuffer's color target.
    fn framebuffer_color_texture(&self, framebuffer: FramebufferHandle, texture: TextureHandle);

    /// Release a framebuffer object.
    fn delete_framebuffer(&self, framebuffer: FramebufferHandle);

    // Error state

    /// Pop the oldest outstanding API error, if any.
    fn poll_error(&self) -> Option<ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_unit_indices() {
        assert_eq!(TextureUnit::Unit0.index(), 0);
        assert_eq!(TextureUnit::Unit15.index(), 15);
        assert_eq!(TextureUnit::from_index(3), Some(TextureUnit::Unit3));
        assert_eq!(TextureUnit::from_index(16), None);
    }
}
