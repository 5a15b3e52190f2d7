//! # Silene App
//!
//! Window and event host for the Silene rendering scaffold.
//!
//! The host owns a winit event loop and drives an [`AppHandler`]: `on_start`
//! once, then `on_update` every frame and `on_fixed_update` on a fixed
//! timestep, with window events forwarded in between. A headless stepping
//! mode runs the same handler lifecycle without a window.
//!
//! ## Example
//!
//! ```
//! use silene_app::{App, AppConfig, AppContext, AppHandler};
//! use silene_core::paths::AssetPaths;
//! use silene_graphics::RenderDevice;
//!
//! struct Demo;
//!
//! impl AppHandler for Demo {
//!     fn on_update(&mut self, ctx: &mut AppContext) {
//!         if ctx.frame_number() >= 2 {
//!             ctx.request_exit();
//!         }
//!     }
//! }
//!
//! let device = RenderDevice::headless();
//! let paths = AssetPaths::new("/tmp");
//! let mut app = App::new(Demo, device, paths, AppConfig::default());
//! app.run_frames(3);
//! ```

mod app;
mod context;
mod handler;

pub use app::{App, AppConfig};
pub use context::AppContext;
pub use handler::AppHandler;

/// App library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the app subsystem.
pub fn init() {
    log::info!("Silene App v{} initialized", VERSION);
}
