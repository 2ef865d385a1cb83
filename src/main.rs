// =============================================================================
// INSTANCED VULKAN RENDERER
// =============================================================================
//
// Draws N textured, individually transformed copies of one model. Every
// instance shares one descriptor set; a dynamic uniform buffer offset picks
// its model matrix at draw time.
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  winit event loop (App)                                         │
// │    └── Engine (frame protocol, swapchain recreation)            │
// │          └── Backend components (swapchain, pipeline, buffers)  │
// │                └── GpuDevice (VulkanDevice over ash)            │
// └─────────────────────────────────────────────────────────────────┘
//
// FRAME FLOW:
// 1. Update per-instance transforms
// 2. Acquire swapchain image
// 3. Submit pre-recorded commands to GPU
// 4. Present rendered image to screen
// 5. Wait for the device to go idle
//
// =============================================================================

mod assets;
mod backend;
mod config;
mod engine;
mod error;

use anyhow::Result;
use backend::VulkanDevice;
use config::Config;
use engine::{Engine, FrameOutcome};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowAttributes},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    init_logging();

    let config = Config::load();
    log::info!("Starting instanced renderer");
    log::info!(
        "Window: {}x{} ({}), {} instances",
        config.window.width,
        config.window.height,
        if config.window.fullscreen { "fullscreen" } else { "windowed" },
        config.scene.instance_count
    );

    match run(config) {
        Ok(()) => {
            log::info!("Clean shutdown");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", error::format_chain(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config) -> Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// `Info` by default, overridable through `RUST_LOG`
fn init_logging() {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// IMPORTANT: Field order matters for Drop! The engine owns the surface,
/// which must go before the window it was created for.
struct App {
    config: Config,

    engine: Option<Engine<VulkanDevice>>,
    window: Option<Arc<Window>>,

    /// First fatal error; stops the loop and becomes the exit code
    error: Option<anyhow::Error>,
    /// Set while the window has zero area - skip rendering
    is_minimized: bool,

    // ─────────────────────────────────────────────────────────────────────────
    // FPS TRACKING
    // ─────────────────────────────────────────────────────────────────────────
    frame_count: u32,
    last_fps_update: Instant,
    last_frame_time: Instant,
}

impl App {
    fn new(config: Config) -> Self {
        let now = Instant::now();
        Self {
            config,
            engine: None,
            window: None,
            error: None,
            is_minimized: false,
            frame_count: 0,
            last_fps_update: now,
            last_frame_time: now,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        if self.error.is_none() {
            self.error = Some(error);
        }
        event_loop.exit();
    }

    /// Update uniforms, then draw. This is the hot path.
    fn render_frame(&mut self) -> Result<Option<FrameOutcome>> {
        if self.is_minimized {
            return Ok(None);
        }
        let Some(engine) = self.engine.as_mut() else {
            return Ok(None);
        };

        engine.update_uniform_buffer()?;
        engine.draw_frame().map(Some)
    }

    // =========================================================================
    // FPS TRACKING
    // =========================================================================

    fn update_fps(&mut self) {
        if !self.config.debug.show_fps {
            return;
        }

        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;
        self.frame_count += 1;

        // Update title every second
        let elapsed = now.duration_since(self.last_fps_update).as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frame_count as f32 / elapsed;

            if let Some(ref window) = self.window {
                window.set_title(&format!(
                    "{} - {:.0} FPS ({:.2}ms)",
                    self.config.window.title,
                    fps,
                    frame_time * 1000.0
                ));
            }

            self.frame_count = 0;
            self.last_fps_update = now;
        }
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let mut window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        if self.config.window.fullscreen {
            window_attributes =
                window_attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                self.fail(event_loop, anyhow::Error::new(e).context("Failed to create window"));
                return;
            }
        };

        match Engine::new(&window, &self.config) {
            Ok(engine) => self.engine = Some(engine),
            Err(e) => {
                self.fail(event_loop, e.context("Failed to initialize renderer"));
                return;
            }
        }

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                self.is_minimized = size.width == 0 || size.height == 0;

                let resized = match self.engine.as_mut() {
                    Some(engine) => engine.on_window_resized(size.width, size.height),
                    None => Ok(false),
                };
                if let Err(e) = resized {
                    self.fail(event_loop, e);
                }
            }

            WindowEvent::RedrawRequested => match self.render_frame() {
                Ok(Some(_)) => self.update_fps(),
                Ok(None) => {}
                Err(e) => self.fail(event_loop, e),
            },

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed()
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    log::info!("ESC pressed, exiting...");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }

    /// Called when the event loop is about to block waiting for events.
    /// We use this to request continuous redraws.
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

// =============================================================================
// CLEANUP
// =============================================================================

impl Drop for App {
    fn drop(&mut self) {
        log::info!("Cleaning up...");
        // Engine drop waits for the device, then releases resources in order
        self.engine = None;
        log::info!("Cleanup complete");
    }
}
