//! Materials.
//!
//! A [`Material`] composes a shared [`ShaderProgram`] with a
//! [`UniformTable`] and a fixed list of common uniform names that
//! participate in persistence regardless of what was explicitly declared.
//! Binding a material activates its program and pushes every declared
//! uniform value; persistence round-trips the program's stage references
//! and the declared name set through the codec's text encoding.
//!
//! Programs are borrowed, not owned: several materials may reference one
//! program, and its native handles are released when the last reference
//! goes away. Textures registered through [`Material::set_texture`] are
//! owned and released on [`Material::dispose`].

use std::sync::Arc;

use silene_core::paths::AssetPaths;

use crate::backend::{TextureUnit, UniformSlot};
use crate::codec::{self, DecodeMode};
use crate::device::RenderDevice;
use crate::error::{RenderError, RenderResult};
use crate::program::ShaderProgram;
use crate::texture::Texture;
use crate::uniform::{LockPolicy, UniformTable, UniformValue};

/// Uniform names every material persists, whether or not they were
/// explicitly declared: the model-view-projection matrix and the object
/// position.
pub const COMMON_UNIFORM_NAMES: [&str; 2] = ["u_MVP", "u_Position"];

/// A program plus a concrete, nameable set of uniform values and texture
/// bindings, ready to be bound before a draw.
pub struct Material {
    device: Arc<RenderDevice>,
    program: Arc<ShaderProgram>,
    uniforms: UniformTable,
    common_uniforms: Vec<String>,
    disposed: bool,
}

impl Material {
    /// Create a material backed by the device's default program.
    pub fn new(device: &Arc<RenderDevice>) -> RenderResult<Self> {
        let program = device.default_program()?;
        Ok(Self::with_program(device, program))
    }

    /// Create a material over an existing (shared) program.
    pub fn with_program(device: &Arc<RenderDevice>, program: Arc<ShaderProgram>) -> Self {
        Self {
            device: Arc::clone(device),
            program,
            uniforms: UniformTable::new(),
            common_uniforms: COMMON_UNIFORM_NAMES.iter().map(|s| (*s).to_owned()).collect(),
            disposed: false,
        }
    }

    /// Set the lock policy of the uniform table.
    ///
    /// Replaces the table with an empty one; call this before declaring any
    /// uniforms.
    #[must_use]
    pub fn with_lock_policy(mut self, policy: LockPolicy) -> Self {
        self.uniforms = UniformTable::with_policy(policy);
        self
    }

    /// The program this material binds.
    pub fn program(&self) -> &Arc<ShaderProgram> {
        &self.program
    }

    /// Replace the program. Previously resolved slots keep referring to the
    /// old program; callers normally swap programs before declaring names.
    pub fn set_program(&mut self, program: Arc<ShaderProgram>) {
        self.program = program;
    }

    /// The uniform table.
    pub fn uniforms(&self) -> &UniformTable {
        &self.uniforms
    }

    /// The names appended to every persisted payload.
    pub fn common_uniform_names(&self) -> &[String] {
        &self.common_uniforms
    }

    /// Whether [`Material::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Resolve and record a uniform name against the program.
    pub fn declare_uniform(&mut self, name: &str) -> RenderResult<UniformSlot> {
        self.uniforms.declare(name, &self.program)
    }

    /// Record a uniform value, resolving its slot against the program.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> RenderResult<()> {
        self.uniforms.set(name, value, &self.program)
    }

    /// Bind a texture to a sampler uniform on the given unit.
    ///
    /// The material takes ownership of the registered texture.
    pub fn set_texture(
        &mut self,
        name: &str,
        unit: TextureUnit,
        texture: Arc<Texture>,
    ) -> RenderResult<()> {
        self.uniforms.set_texture(name, unit, texture, &self.program)
    }

    /// Close the uniform name set. One-directional.
    pub fn lock_uniform_names(&mut self) {
        self.uniforms.lock();
    }

    /// Bind the material for drawing: activate the program, then push every
    /// declared uniform value. Downstream errors propagate unchanged.
    pub fn bind(&self) -> RenderResult<()> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        self.program.bind()?;
        self.uniforms.bind(self.device.backend())
    }

    /// Release the owned textures. Idempotent.
    ///
    /// The program is shared, so this drops nothing of it; its native
    /// handles are released when the last referencing owner goes away.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.uniforms.dispose_textures();
        self.disposed = true;
    }

    // Persistence

    /// Serialize the program's stage references and the declared uniform
    /// name set.
    ///
    /// With `include_instance_values` the uniform records carry the
    /// instance-state marker (a trailing empty field). The common uniform
    /// names are always appended.
    pub fn to_bytes(&self, include_instance_values: bool) -> Vec<u8> {
        codec::encode(
            &self.program,
            self.uniforms.names(),
            self.common_uniforms.iter().map(String::as_str),
            include_instance_values,
        )
    }

    /// Rebuild this material from a persisted payload, leniently.
    ///
    /// A fresh program is constructed and compiled from the payload's stage
    /// records (resolved against `paths`), every recorded uniform name is
    /// declared, and the table is locked.
    pub fn set_from_bytes(&mut self, bytes: &[u8], paths: &AssetPaths) -> RenderResult<()> {
        self.set_from_bytes_with(bytes, paths, DecodeMode::Lenient)
    }

    /// Rebuild this material from a persisted payload with an explicit
    /// decode mode.
    pub fn set_from_bytes_with(
        &mut self,
        bytes: &[u8],
        paths: &AssetPaths,
        mode: DecodeMode,
    ) -> RenderResult<()> {
        let (program, table) =
            codec::decode(&self.device, bytes, paths, mode, self.uniforms.policy())?;
        self.program = Arc::new(program);
        self.uniforms = table;
        self.disposed = false;
        Ok(())
    }

    /// Write this material to `<materials dir>/<name>.mtrl`.
    pub fn save(&self, name: &str, paths: &AssetPaths) -> RenderResult<()> {
        std::fs::create_dir_all(paths.materials())?;
        std::fs::write(paths.material_file(name), self.to_bytes(false))?;
        Ok(())
    }

    /// Load `<materials dir>/<name>.mtrl` into this material.
    pub fn load(&mut self, name: &str, paths: &AssetPaths) -> RenderResult<()> {
        let path = paths.material_file(name);
        let bytes = std::fs::read(&path)
            .map_err(|_| RenderError::ResourceNotFound(path.display().to_string()))?;
        self.set_from_bytes(&bytes, paths)
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("program", &self.program.id())
            .field("uniforms", &self.uniforms.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

static_assertions::assert_impl_all!(Material: Send, Sync);
