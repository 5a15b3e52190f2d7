//! Render device.
//!
//! [`RenderDevice`] owns the native backend and hands out the shared
//! default resources. It is shared as `Arc<RenderDevice>`; every GPU
//! resource holds a strong reference to the device it was created on.

use std::sync::{Arc, OnceLock};

use crate::backend::{HeadlessBackend, RenderBackend};
use crate::error::RenderResult;
use crate::material::Material;
use crate::program::ShaderProgram;

/// Owner of the native backend and the per-device default resources.
///
/// The default program (a hard-coded passthrough pair declaring `u_MVP` and
/// `u_Position`) and the default material backed by it are constructed
/// lazily on first access, shared by reference, and never mutated after
/// construction.
pub struct RenderDevice {
    backend: Arc<dyn RenderBackend>,
    default_program: OnceLock<Arc<ShaderProgram>>,
    default_material: OnceLock<Arc<Material>>,
}

impl RenderDevice {
    /// Create a device over the given backend.
    pub fn new(backend: Arc<dyn RenderBackend>) -> Arc<Self> {
        log::info!("render device created on {} backend", backend.name());
        Arc::new(Self {
            backend,
            default_program: OnceLock::new(),
            default_material: OnceLock::new(),
        })
    }

    /// Create a device over a fresh [`HeadlessBackend`].
    pub fn headless() -> Arc<Self> {
        Self::new(Arc::new(HeadlessBackend::new()))
    }

    /// The native backend.
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// The shared passthrough program, built on first access.
    pub fn default_program(self: &Arc<Self>) -> RenderResult<Arc<ShaderProgram>> {
        if let Some(program) = self.default_program.get() {
            return Ok(Arc::clone(program));
        }
        let program = Arc::new(ShaderProgram::passthrough(self)?);
        Ok(Arc::clone(self.default_program.get_or_init(|| program)))
    }

    /// The shared default material, backed by the default program.
    pub fn default_material(self: &Arc<Self>) -> RenderResult<Arc<Material>> {
        if let Some(material) = self.default_material.get() {
            return Ok(Arc::clone(material));
        }
        let material = Arc::new(Material::with_program(self, self.default_program()?));
        Ok(Arc::clone(self.default_material.get_or_init(|| material)))
    }
}

impl std::fmt::Debug for RenderDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderDevice")
            .field("backend", &self.backend.name())
            .finish()
    }
}

static_assertions::assert_impl_all!(RenderDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_program_is_a_singleton() {
        let device = RenderDevice::headless();
        let first = device.default_program().unwrap();
        let second = device.default_program().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn default_program_is_compiled_and_declares_commons() {
        let device = RenderDevice::headless();
        let program = device.default_program().unwrap();
        assert!(program.is_compiled());
        assert!(program.uniform_location("u_MVP").is_ok());
        assert!(program.uniform_location("u_Position").is_ok());
    }

    #[test]
    fn default_material_is_a_singleton_on_the_default_program() {
        let device = RenderDevice::headless();
        let first = device.default_material().unwrap();
        let second = device.default_material().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(first.program(), &device.default_program().unwrap()));
    }

    #[test]
    fn devices_are_independent() {
        let a = RenderDevice::headless();
        let b = RenderDevice::headless();
        let pa = a.default_program().unwrap();
        let pb = b.default_program().unwrap();
        assert!(!Arc::ptr_eq(&pa, &pb));
    }
}
