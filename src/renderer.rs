//! # Renderer Module
//!
//! The `renderer` module ties the pieces of the crate together: the [`Gpu`], the scene
//! [`Mesh`], the [`SceneResources`] created from it, and the [`FrameLoop`] that animates the
//! camera.
//!
//! ## Responsibilities
//!
//! - **Setup**: acquire the GPU, build the mesh, create the scene resources, start the loop.
//! - **Resizing**: keep the surface, the depth attachment and the camera's aspect ratio in
//!   sync with the window.
//! - **Per-frame rendering**: run one frame-loop tick against the scene resources.
//! - **Device recovery**: after the loop reports a lost device, request a new device and
//!   rebuild every scene resource from the kept mesh.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cornell_core::{Renderer, Settings};
//!
//! async fn run(window: std::sync::Arc<winit::window::Window>) -> cornell_core::Result<()> {
//!     let size = window.inner_size();
//!     let settings = Settings::default();
//!     let mut renderer = Renderer::new(window, size.width, size.height, settings).await?;
//!     renderer.render_frame()?;
//!     Ok(())
//! }
//! ```

use crate::camera::Camera;
use crate::error::{FrameError, Result};
use crate::frame_loop::{FrameLoop, FrameTarget, LoopState, StopSignal, TickOutcome};
use crate::gpu::Gpu;
use crate::mesh::{build_cornell_box, Mesh};
use crate::scene::SceneResources;
use crate::settings::Settings;
use crate::shader::CORNELL_SHADER;
use crate::uniform_buffer::FrameUniforms;

/// Owns the GPU, the scene resources and the animation state.
pub struct Renderer {
    /// GPU device, queue and surface.
    gpu: Gpu,

    /// The scene geometry, kept on the CPU so resources can be rebuilt after device loss.
    mesh: Mesh,

    /// GPU resources for drawing `mesh`.
    scene: SceneResources,

    /// Orbit, camera and frame protocol.
    frame_loop: FrameLoop,

    settings: Settings,
}

/// Connects the frame loop to the scene resources for one tick.
struct FrameContext<'a> {
    gpu: &'a Gpu,
    scene: &'a mut SceneResources,
}

impl FrameTarget for FrameContext<'_> {
    fn device_lost(&mut self) -> bool {
        self.gpu.take_device_lost()
    }

    fn update_uniforms(&mut self, uniforms: &FrameUniforms) {
        self.scene
            .update_uniforms(&self.gpu.queue, &self.gpu.device, uniforms);
    }

    fn record_and_submit_frame(&mut self) -> std::result::Result<(), FrameError> {
        self.scene.record_and_submit_frame(self.gpu)
    }
}

impl Renderer {
    /// Creates the renderer for a window or canvas of the given pixel size.
    ///
    /// # Errors
    ///
    /// Any GPU acquisition or resource creation failure; see [`crate::RenderError`].
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        settings: Settings,
    ) -> Result<Self> {
        let gpu = Gpu::new_async(window, width, height).await?;
        let mesh = build_cornell_box();
        let scene = Self::create_scene(&gpu, &mesh, &settings).await?;

        let camera = Camera::new(gpu.aspect_ratio(), &settings.camera);
        let mut frame_loop = FrameLoop::new(camera, settings.orbit);
        frame_loop.start();

        Ok(Self {
            gpu,
            mesh,
            scene,
            frame_loop,
            settings,
        })
    }

    async fn create_scene(gpu: &Gpu, mesh: &Mesh, settings: &Settings) -> Result<SceneResources> {
        let (width, height) = gpu.size();
        SceneResources::new(
            &gpu.device,
            gpu.surface_format,
            width,
            height,
            mesh,
            &CORNELL_SHADER,
            &settings.render,
        )
        .await
    }

    /// Resizes the surface and depth attachment and updates the camera's aspect ratio.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        let (width, height) = self.gpu.size();
        self.scene.resize(&self.gpu.device, width, height);
        let aspect = self.gpu.aspect_ratio();
        self.frame_loop.camera_mut().set_aspect(aspect);
    }

    /// Runs one frame-loop tick.
    ///
    /// Returns [`TickOutcome::Suspended`] when the device was lost; call
    /// [`Renderer::rebuild`] before rendering again.
    pub fn render_frame(&mut self) -> Result<TickOutcome> {
        let mut target = FrameContext {
            gpu: &self.gpu,
            scene: &mut self.scene,
        };
        self.frame_loop.tick(&mut target)
    }

    /// Whether the frame loop is waiting for [`Renderer::rebuild`].
    pub fn needs_rebuild(&self) -> bool {
        self.frame_loop.state() == LoopState::Suspended
    }

    /// Recovers the GPU device and recreates every scene resource.
    ///
    /// Does nothing unless the loop is suspended. The orbit resumes from its last angle. On
    /// failure the loop stays suspended and the rebuild may be attempted again.
    pub async fn rebuild(&mut self) -> Result<()> {
        if !self.frame_loop.begin_rebuild() {
            return Ok(());
        }
        match self.recover().await {
            Ok(()) => {
                self.frame_loop.finish_rebuild();
                Ok(())
            }
            Err(error) => {
                self.frame_loop.abort_rebuild();
                Err(error)
            }
        }
    }

    async fn recover(&mut self) -> Result<()> {
        self.gpu.recover_device().await?;
        self.scene = Self::create_scene(&self.gpu, &self.mesh, &self.settings).await?;
        Ok(())
    }

    /// A handle that stops the frame loop.
    pub fn stop_signal(&self) -> StopSignal {
        self.frame_loop.stop_signal()
    }
}
