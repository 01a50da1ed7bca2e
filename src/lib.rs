//! # Cornell Box Renderer Library
//!
//! This library renders a Cornell box (a closed room with a red left wall, a green right wall,
//! white floor, ceiling and back wall, and a small emissive ceiling patch) with `wgpu`, while
//! a camera orbits the box and always looks at its center.
//!
//! ## Modules
//!
//! - [`app`]: The `winit` host; creates the window and routes window events.
//! - [`renderer`]: Ties the GPU, the scene resources and the frame loop together.
//! - [`gpu`]: Acquires the surface, device and queue; reports and recovers device loss.
//! - [`scene`]: Creates the GPU resources of the scene and records each frame.
//! - [`frame_loop`]: Orbit animation and the per-frame update and submit protocol.
//! - [`camera`]: View and projection matrices.
//! - [`mesh`]: Procedural construction of the box geometry.
//! - [`vertex`]: The vertex record and its buffer layout.
//! - [`uniform_buffer`]: The per-frame uniform record.
//! - [`uniform_binding`]: The ring of uniform buffers and their bind groups.
//! - [`shader`]: The WGSL program and its entry points.
//! - [`settings`]: Tunable parameters and environment overrides.
//! - [`error`]: Error types.
//!
//! ## Usage
//!
//! On desktop, call [`run`]; it opens a window and returns when the window is closed or the
//! renderer fails. On the web, the `wasm-bindgen` start function attaches to the page's
//! `<canvas id="canvas">` element.
//!
//! ```rust,no_run
//! fn main() {
//!     if let Err(error) = cornell_core::run() {
//!         eprintln!("{error}");
//!     }
//! }
//! ```
//!
//! Logging goes through the `log` facade: `env_logger` on desktop (filter with `RUST_LOG`),
//! the browser console on the web.

pub mod app;
pub mod camera;
pub mod error;
pub mod frame_loop;
pub mod gpu;
pub mod mesh;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod shader;
pub mod uniform_binding;
pub mod uniform_buffer;
pub mod vertex;

pub use crate::app::App;
pub use crate::camera::Camera;
pub use crate::error::{FrameError, RenderError, Result};
pub use crate::frame_loop::{FrameLoop, FrameTarget, LoopState, Orbit, StopSignal, TickOutcome};
pub use crate::gpu::Gpu;
pub use crate::mesh::{build_cornell_box, cornell_box_quads, Mesh, MeshBuilder, Quad};
pub use crate::renderer::Renderer;
pub use crate::scene::SceneResources;
pub use crate::settings::{CameraSettings, OrbitSettings, RenderSettings, Settings};
pub use crate::shader::{ShaderDescriptor, ShaderProgram, CORNELL_SHADER};
pub use crate::uniform_binding::UniformBinding;
pub use crate::uniform_buffer::FrameUniforms;
pub use crate::vertex::Vertex;

/// Opens a window and renders until it is closed.
///
/// Settings are read with [`Settings::from_env`].
///
/// # Errors
///
/// Returns the error that stopped the renderer, if any.
#[cfg(not(target_arch = "wasm32"))]
pub fn run() -> Result<()> {
    env_logger::init();

    let event_loop = winit::event_loop::EventLoop::new()?;
    let mut app = App::new(Settings::from_env());
    event_loop.run_app(&mut app)?;

    match app.take_failure() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Entry point on the web: starts the renderer on the page's canvas.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() -> std::result::Result<(), wasm_bindgen::JsValue> {
    use winit::platform::web::EventLoopExtWebSys;

    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    console_log::init_with_level(log::Level::Info)
        .map_err(|error| wasm_bindgen::JsValue::from_str(&error.to_string()))?;

    let event_loop = winit::event_loop::EventLoop::new()
        .map_err(|error| wasm_bindgen::JsValue::from_str(&error.to_string()))?;
    event_loop.spawn_app(App::new(Settings::from_env()));
    Ok(())
}
