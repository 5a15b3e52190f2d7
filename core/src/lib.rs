//! # Silene Core
//!
//! Core crate for the Silene rendering scaffold: asset path configuration,
//! frame timing, and the plain data types (colors, vertices, math aliases)
//! shared by the graphics and app crates.

pub mod color;
pub mod math;
pub mod paths;
pub mod time;
pub mod vertex;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the core subsystem.
pub fn init() {
    log::info!("Silene Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
