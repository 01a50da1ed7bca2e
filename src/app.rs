//! # Application Core (`app.rs`)
//!
//! The `App` struct is the `winit` host of the renderer. It creates the window (or attaches to
//! the page's canvas on the web), builds the [`Renderer`], and turns window events into renderer
//! calls.
//!
//! ## Event Handling
//!
//! | Event                          | Action                                              |
//! |--------------------------------|-----------------------------------------------------|
//! | `Resized`                      | Resize the surface, depth attachment and camera     |
//! | `RedrawRequested`              | Run one frame-loop tick                             |
//! | `CloseRequested` / `Escape`    | Raise the stop signal and exit the event loop       |
//!
//! After every event the window requests another redraw, so the loop runs at the display's
//! refresh rate.
//!
//! ## Platform-Specific Notes
//!
//! - **Desktop**:
//!   - The renderer is created synchronously with `pollster` in `resumed`.
//!   - A lost device is recovered synchronously on the next redraw.
//!
//! - **WebAssembly**:
//!   - The window is attached to the `<canvas id="canvas">` element of the page.
//!   - The renderer is created asynchronously and handed back through a `oneshot` channel,
//!     polled at the start of every window event. Device recovery uses the same channel.
//!
//! ## Failure Handling
//!
//! Any setup or fatal frame error is logged, stored, and ends the event loop. The entry point
//! retrieves it with [`App::take_failure`] and reports it.

use std::sync::Arc;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsCast;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    window::Window,
};

use crate::error::{RenderError, Result};
use crate::frame_loop::TickOutcome;
use crate::renderer::Renderer;
use crate::settings::Settings;

/// Id of the canvas element the renderer draws into on the web.
pub const CANVAS_ID: &str = "canvas";

/// Main application structure driven by the `winit` event loop.
#[derive(Default)]
pub struct App {
    /// Settings handed to the renderer when it is created.
    settings: Settings,

    /// The window, shared with the GPU surface.
    window: Option<Arc<Window>>,

    /// The renderer, available once setup has completed.
    renderer: Option<Renderer>,

    /// Delivers the renderer after asynchronous creation or device recovery on the web.
    #[cfg(target_arch = "wasm32")]
    renderer_receiver: Option<futures::channel::oneshot::Receiver<Result<Renderer>>>,

    /// The error that ended the application, if any.
    failure: Option<RenderError>,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Takes the error that ended the event loop, if there was one.
    pub fn take_failure(&mut self) -> Option<RenderError> {
        self.failure.take()
    }

    /// Records `error` and shuts the application down.
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: RenderError) {
        log::error!("{error}");
        if error.is_unsupported_environment() {
            log::error!("This environment cannot run the renderer");
        }
        if self.failure.is_none() {
            self.failure = Some(error);
        }
        self.shutdown(event_loop);
    }

    /// Stops the frame loop and exits the event loop.
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.as_ref() {
            renderer.stop_signal().stop();
        }
        event_loop.exit();
    }

    fn window_attributes(&self) -> Result<winit::window::WindowAttributes> {
        #[allow(unused_mut)]
        let mut attributes = Window::default_attributes().with_title(self.settings.window_title);

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;
            let canvas = find_canvas().ok_or(RenderError::CanvasNotFound(CANVAS_ID))?;
            log::info!("Canvas dimensions: ({} x {})", canvas.width(), canvas.height());
            attributes = attributes.with_canvas(Some(canvas));
        }

        Ok(attributes)
    }

    /// Runs one tick and reacts to its outcome.
    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if renderer.needs_rebuild() {
            self.rebuild(event_loop);
            return;
        }
        match renderer.render_frame() {
            Ok(TickOutcome::Suspended) => self.rebuild(event_loop),
            Ok(TickOutcome::Stopped) => event_loop.exit(),
            Ok(TickOutcome::Presented | TickOutcome::Skipped | TickOutcome::Idle) => {}
            Err(error) => self.fail(event_loop, error),
        }
    }

    /// Recovers the device and recreates the scene resources after device loss.
    #[cfg(not(target_arch = "wasm32"))]
    fn rebuild(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if let Err(error) = pollster::block_on(renderer.rebuild()) {
            self.fail(event_loop, error);
        }
    }

    /// Recovers the device and recreates the scene resources after device loss.
    ///
    /// The renderer is moved into the rebuild task and comes back through the receiver.
    #[cfg(target_arch = "wasm32")]
    fn rebuild(&mut self, _event_loop: &ActiveEventLoop) {
        let Some(mut renderer) = self.renderer.take() else {
            return;
        };
        let (sender, receiver) = futures::channel::oneshot::channel();
        self.renderer_receiver = Some(receiver);
        wasm_bindgen_futures::spawn_local(async move {
            let result = renderer.rebuild().await.map(|()| renderer);
            if sender.send(result).is_err() {
                log::error!("Failed to send rebuilt renderer!");
            }
        });
    }

    /// Picks up a renderer delivered by an asynchronous task.
    #[cfg(target_arch = "wasm32")]
    fn receive_renderer(&mut self, event_loop: &ActiveEventLoop) {
        let Some(receiver) = self.renderer_receiver.as_mut() else {
            return;
        };
        match receiver.try_recv() {
            Ok(Some(Ok(renderer))) => {
                self.renderer = Some(renderer);
                self.renderer_receiver = None;
            }
            Ok(Some(Err(error))) => {
                self.renderer_receiver = None;
                self.fail(event_loop, error);
            }
            Ok(None) => {}
            Err(_) => {
                log::error!("Renderer task ended without a result");
                self.renderer_receiver = None;
                event_loop.exit();
            }
        }
    }
}

impl ApplicationHandler for App {
    /// Creates the window and the renderer the first time the application is resumed.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match self
            .window_attributes()
            .and_then(|attributes| Ok(event_loop.create_window(attributes)?))
        {
            Ok(window) => Arc::new(window),
            Err(error) => {
                self.fail(event_loop, error);
                return;
            }
        };
        self.window = Some(window.clone());

        let size = window.inner_size();
        let settings = self.settings;

        #[cfg(not(target_arch = "wasm32"))]
        {
            match pollster::block_on(Renderer::new(window, size.width, size.height, settings)) {
                Ok(renderer) => self.renderer = Some(renderer),
                Err(error) => self.fail(event_loop, error),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let (sender, receiver) = futures::channel::oneshot::channel();
            self.renderer_receiver = Some(receiver);
            wasm_bindgen_futures::spawn_local(async move {
                let renderer = Renderer::new(window, size.width, size.height, settings).await;
                if sender.send(renderer).is_err() {
                    log::error!("Failed to create and send renderer!");
                }
            });
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        #[cfg(target_arch = "wasm32")]
        self.receive_renderer(event_loop);

        match event {
            WindowEvent::KeyboardInput {
                event:
                    winit::event::KeyEvent {
                        physical_key: winit::keyboard::PhysicalKey::Code(key_code),
                        ..
                    },
                ..
            } => {
                if matches!(key_code, winit::keyboard::KeyCode::Escape) {
                    self.shutdown(event_loop);
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    log::info!("Resizing renderer surface to: ({width}, {height})");
                    renderer.resize(width, height);
                }
            }
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting...");
                self.shutdown(event_loop);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => (),
        }

        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

/// Looks up the page's canvas element.
#[cfg(target_arch = "wasm32")]
fn find_canvas() -> Option<wgpu::web_sys::HtmlCanvasElement> {
    wgpu::web_sys::window()?
        .document()?
        .get_element_by_id(CANVAS_ID)?
        .dyn_into::<wgpu::web_sys::HtmlCanvasElement>()
        .ok()
}
