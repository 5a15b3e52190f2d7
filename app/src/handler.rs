//! Application handler trait.

use winit::event::KeyEvent;

use crate::context::AppContext;

/// Trait for application logic driven by the host.
///
/// # Lifecycle
///
/// 1. `on_start` - Called once before the first frame
/// 2. `on_fixed_update` - Called zero or more times per frame on the fixed
///    timestep
/// 3. `on_update` - Called once per frame
/// 4. `on_shutdown` - Called once when the host stops
///
/// Window callbacks (`on_resize`, `on_key`, `on_close_requested`) only fire
/// in windowed mode.
pub trait AppHandler {
    /// Called once before the first frame. Create GPU resources and load
    /// assets here.
    fn on_start(&mut self, _ctx: &mut AppContext) {}

    /// Called once per frame.
    fn on_update(&mut self, _ctx: &mut AppContext) {}

    /// Called on the fixed timestep, possibly several times per frame.
    fn on_fixed_update(&mut self, _ctx: &mut AppContext) {}

    /// Called when the window is resized; the new size is also available
    /// through the context.
    fn on_resize(&mut self, _ctx: &mut AppContext, _width: u32, _height: u32) {}

    /// Called when a key is pressed or released.
    fn on_key(&mut self, _ctx: &mut AppContext, _event: &KeyEvent) {}

    /// Called when the user asks to close the window. Return `true` to
    /// allow the close (the default), `false` to cancel it.
    fn on_close_requested(&mut self, _ctx: &mut AppContext) -> bool {
        true
    }

    /// Called once when the host is shutting down.
    fn on_shutdown(&mut self, _ctx: &mut AppContext) {}
}
