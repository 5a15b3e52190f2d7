//! State handed to the application handler.

use std::sync::Arc;

use silene_core::paths::AssetPaths;
use silene_core::time::Time;
use silene_graphics::RenderDevice;

/// Everything a handler needs while reacting to the host: the render
/// device, the asset path configuration, timing, and window geometry.
pub struct AppContext {
    pub(crate) device: Arc<RenderDevice>,
    pub(crate) paths: AssetPaths,
    pub(crate) time: Time,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) frame_number: u64,
    pub(crate) exit_requested: bool,
}

impl AppContext {
    pub(crate) fn new(device: Arc<RenderDevice>, paths: AssetPaths, width: u32, height: u32) -> Self {
        Self {
            device,
            paths,
            time: Time::new(),
            width,
            height,
            frame_number: 0,
            exit_requested: false,
        }
    }

    /// The render device.
    pub fn device(&self) -> &Arc<RenderDevice> {
        &self.device
    }

    /// The asset path configuration.
    pub fn paths(&self) -> &AssetPaths {
        &self.paths
    }

    /// Frame and fixed-step timing.
    pub fn time(&self) -> &Time {
        &self.time
    }

    /// Seconds elapsed in the last frame step.
    pub fn delta_seconds(&self) -> f32 {
        self.time.delta_seconds()
    }

    /// Current window width in physical pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Current window height in physical pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frames completed since start.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Ask the host to shut down after the current frame.
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Whether an exit has been requested.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}
