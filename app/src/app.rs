//! Main application struct and event loop.

use std::sync::Arc;
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

use silene_core::paths::AssetPaths;
use silene_graphics::RenderDevice;

use crate::context::AppContext;
use crate::handler::AppHandler;

/// Window and timing configuration for the host.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial window width in logical pixels.
    pub width: u32,
    /// Initial window height in logical pixels.
    pub height: u32,
    /// Interval between fixed updates.
    pub fixed_timestep: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Silene".to_owned(),
            width: 1280,
            height: 720,
            fixed_timestep: Duration::from_micros(16_667),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the initial window size.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the fixed update interval.
    #[must_use]
    pub fn with_fixed_timestep(mut self, timestep: Duration) -> Self {
        self.fixed_timestep = timestep;
        self
    }
}

/// Window/event host driving an [`AppHandler`].
///
/// In windowed mode the host runs a winit event loop, rendering on redraw
/// and forwarding input events. [`App::run_frames`] steps the same handler
/// lifecycle without any window, which is how tests and headless demos run.
pub struct App<H: AppHandler> {
    handler: H,
    config: AppConfig,
    context: AppContext,
    window: Option<Window>,
    accumulator: Duration,
    started: bool,
}

impl<H: AppHandler> App<H> {
    /// Create a host around a handler, a render device, and an asset root.
    pub fn new(handler: H, device: Arc<RenderDevice>, paths: AssetPaths, config: AppConfig) -> Self {
        let context = AppContext::new(device, paths, config.width, config.height);
        Self {
            handler,
            config,
            context,
            window: None,
            accumulator: Duration::ZERO,
            started: false,
        }
    }

    /// The handler's context.
    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Run the windowed event loop until the handler or the user exits.
    pub fn run(mut self) -> Result<(), winit::error::EventLoopError>
    where
        H: 'static,
    {
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("info"),
        )
        .try_init();

        silene_core::init();
        silene_graphics::init();
        crate::init();

        let event_loop = EventLoop::new()?;
        event_loop.run_app(&mut self)
    }

    /// Step the handler lifecycle for a fixed number of frames without a
    /// window: start, `frames` updates, shutdown.
    pub fn run_frames(&mut self, frames: u32) {
        self.start();
        for _ in 0..frames {
            self.step_frame();
            if self.context.exit_requested() {
                break;
            }
        }
        self.shutdown();
    }

    fn start(&mut self) {
        if self.started {
            return;
        }
        self.context.time.start();
        self.handler.on_start(&mut self.context);
        self.started = true;
    }

    fn step_frame(&mut self) {
        self.context.time.update();
        self.accumulator += self.context.time.delta();

        while self.accumulator >= self.config.fixed_timestep {
            self.context.time.fixed_update();
            self.handler.on_fixed_update(&mut self.context);
            self.accumulator -= self.config.fixed_timestep;
        }

        self.handler.on_update(&mut self.context);
        self.context.frame_number += 1;
    }

    fn shutdown(&mut self) {
        if !self.started {
            return;
        }
        self.handler.on_shutdown(&mut self.context);
        self.started = false;
    }
}

impl<H: AppHandler> ApplicationHandler for App<H> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let attributes = Window::default_attributes()
                .with_title(self.config.title.clone())
                .with_inner_size(LogicalSize::new(
                    self.config.width as f64,
                    self.config.height as f64,
                ));
            match event_loop.create_window(attributes) {
                Ok(window) => self.window = Some(window),
                Err(error) => {
                    log::error!("failed to create window: {error}");
                    event_loop.exit();
                    return;
                }
            }
        }
        self.start();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if self.handler.on_close_requested(&mut self.context) {
                    self.shutdown();
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(size) => {
                self.context.width = size.width;
                self.context.height = size.height;
                self.handler
                    .on_resize(&mut self.context, size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handler.on_key(&mut self.context, &event);
            }
            WindowEvent::RedrawRequested => {
                self.step_frame();
                if self.context.exit_requested() {
                    self.shutdown();
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingHandler {
        starts: u32,
        updates: u32,
        fixed_updates: u32,
        shutdowns: u32,
    }

    impl AppHandler for CountingHandler {
        fn on_start(&mut self, _ctx: &mut AppContext) {
            self.starts += 1;
        }

        fn on_update(&mut self, _ctx: &mut AppContext) {
            self.updates += 1;
        }

        fn on_fixed_update(&mut self, _ctx: &mut AppContext) {
            self.fixed_updates += 1;
        }

        fn on_shutdown(&mut self, _ctx: &mut AppContext) {
            self.shutdowns += 1;
        }
    }

    fn test_app(handler: CountingHandler, config: AppConfig) -> App<CountingHandler> {
        App::new(
            handler,
            RenderDevice::headless(),
            AssetPaths::new("/tmp"),
            config,
        )
    }

    #[test]
    fn run_frames_drives_the_full_lifecycle() {
        let mut app = test_app(CountingHandler::default(), AppConfig::default());
        app.run_frames(3);
        assert_eq!(app.handler.starts, 1);
        assert_eq!(app.handler.updates, 3);
        assert_eq!(app.handler.shutdowns, 1);
        assert_eq!(app.context().frame_number(), 3);
    }

    #[test]
    fn fixed_updates_follow_the_accumulator() {
        let config = AppConfig::new().with_fixed_timestep(Duration::from_nanos(1));
        let mut app = test_app(CountingHandler::default(), config);
        app.run_frames(2);
        // With a near-zero timestep every frame accumulates at least one
        // fixed update.
        assert!(app.handler.fixed_updates >= 2);
    }

    #[test]
    fn request_exit_stops_the_frame_loop() {
        struct ExitingHandler {
            updates: u32,
        }
        impl AppHandler for ExitingHandler {
            fn on_update(&mut self, ctx: &mut AppContext) {
                self.updates += 1;
                ctx.request_exit();
            }
        }

        let mut app = App::new(
            ExitingHandler { updates: 0 },
            RenderDevice::headless(),
            AssetPaths::new("/tmp"),
            AppConfig::default(),
        );
        app.run_frames(10);
        assert_eq!(app.handler.updates, 1);
    }
}
