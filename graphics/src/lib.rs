//! # Silene Graphics
//!
//! GPU resource layer for the Silene rendering scaffold, built around an
//! abstract native-graphics backend.
//!
//! ## Overview
//!
//! - [`RenderDevice`] - Owner of the backend and the shared default
//!   program/material
//! - [`ShaderProgram`] - Two-stage compiled and linked GPU program
//! - [`UniformTable`] / [`UniformValue`] - Typed uniform set with the
//!   open -> locked name lifecycle
//! - [`Material`] - Program plus uniform values, bindable before a draw and
//!   round-trippable through the `.mtrl` text encoding
//! - [`Texture`], [`Mesh`], [`RenderTarget`] - Thin resource wrappers
//! - [`backend`] - The [`RenderBackend`] trait, the always-available
//!   [`HeadlessBackend`], and the optional `glow` OpenGL backend
//!
//! ## Example
//!
//! ```
//! use silene_graphics::{Material, RenderDevice};
//!
//! let device = RenderDevice::headless();
//! let mut material = Material::new(&device).unwrap();
//! material.declare_uniform("u_MVP").unwrap();
//! material.lock_uniform_names();
//! material.bind().unwrap();
//! ```

pub mod backend;
pub mod codec;
pub mod device;
pub mod error;
pub mod material;
pub mod mesh;
pub mod program;
pub mod render_target;
pub mod texture;
pub mod uniform;

// Re-export main types for convenience
pub use backend::{HeadlessBackend, RenderBackend, TextureUnit, UniformSlot};
pub use codec::{DecodeError, DecodeMode};
pub use device::RenderDevice;
pub use error::{ApiError, RenderError, RenderResult};
pub use material::{Material, COMMON_UNIFORM_NAMES};
pub use mesh::Mesh;
pub use program::{ShaderProgram, ShaderStage};
pub use render_target::RenderTarget;
pub use texture::{Texture, TextureSettings};
pub use uniform::{LockPolicy, TableState, UniformCategory, UniformKind, UniformTable, UniformValue};

#[cfg(feature = "glow-backend")]
pub use backend::GlowBackend;

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
pub fn init() {
    log::info!("Silene Graphics v{} initialized", VERSION);
}
