//! # GPU Management Module
//!
//! The `gpu` module is responsible for acquiring and managing the GPU objects the renderer
//! draws with: the surface tied to the window or canvas, the adapter-provided device and
//! queue, and the surface configuration.
//!
//! ## Overview
//!
//! [`Gpu`] is the output surface provider of the renderer. It answers three questions for the
//! rest of the crate:
//!
//! - **Where to draw**: the configured `wgpu::Surface` and its texture format.
//! - **How big**: the current pixel size, and from it the aspect ratio used by the camera.
//! - **Is the device still alive**: `wgpu` reports device loss through a callback, which sets a
//!   flag polled once per frame with [`Gpu::take_device_lost`]. After a loss,
//!   [`Gpu::recover_device`] requests a new device for the same surface.
//!
//! ## Failure Modes
//!
//! Initialization is fail-fast. Every failure maps to a [`RenderError`] variant:
//!
//! | Failure                               | Error                             |
//! |---------------------------------------|-----------------------------------|
//! | The window cannot become a surface    | [`RenderError::SurfaceCreation`]  |
//! | No adapter can present to the surface | [`RenderError::AdapterUnavailable`] |
//! | The adapter refuses a device          | [`RenderError::DeviceRequest`]    |
//! | The surface reports no formats        | [`RenderError::NoSurfaceFormat`]  |
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cornell_core::Gpu;
//! use winit::window::Window;
//!
//! async fn create_gpu(window: Arc<Window>) -> cornell_core::Result<Gpu> {
//!     let size = window.inner_size();
//!     Gpu::new_async(window, size.width, size.height).await
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wgpu::InstanceDescriptor;

use crate::error::{RenderError, Result};

/// The GPU objects required for rendering to one surface.
///
/// # Fields
/// - `instance`: Kept so a new adapter can be requested after device loss.
/// - `surface`: The window or canvas the frames are presented to.
/// - `device` and `queue`: Used to create resources and submit command buffers.
/// - `surface_config`: Size, format and presentation parameters of the surface.
/// - `surface_format`: The texture format the render pipeline targets.
pub struct Gpu {
    /// The `wgpu` instance the surface was created from.
    pub instance: wgpu::Instance,

    /// The surface associated with the GPU rendering target.
    ///
    /// It lives for the whole program; only the device it is configured with changes when
    /// the device is recovered.
    pub surface: wgpu::Surface<'static>,

    /// The device used to create every GPU resource of the scene.
    pub device: wgpu::Device,

    /// The command queue frames and uniform writes are submitted to.
    pub queue: wgpu::Queue,

    /// The configuration settings for the rendering surface.
    ///
    /// Width and height are always at least one pixel; a minimized window keeps the last
    /// non-empty configuration dimensions of one pixel rather than zero.
    pub surface_config: wgpu::SurfaceConfiguration,

    /// The texture format of the rendering surface: the first format the surface reports,
    /// which is its preferred one.
    pub surface_format: wgpu::TextureFormat,

    /// Set from the device-lost callback, cleared by [`Gpu::take_device_lost`].
    device_lost: Arc<AtomicBool>,
}

impl Gpu {
    /// Width divided by height of the surface.
    pub fn aspect_ratio(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height.max(1) as f32
    }

    /// Current surface size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// Resizes the surface. Zero dimensions are clamped to one pixel.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = clamp_size(width, height);
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Reapplies the current configuration, e.g. after the surface was reported lost or
    /// outdated.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Returns whether the device was lost since the last call, clearing the flag.
    pub fn take_device_lost(&self) -> bool {
        self.device_lost.swap(false, Ordering::AcqRel)
    }

    /// Requests a new adapter and device for the existing surface and reconfigures it.
    ///
    /// Every resource created from the old device is invalid afterwards and must be rebuilt
    /// by the caller.
    pub async fn recover_device(&mut self) -> Result<()> {
        log::warn!("Recovering lost GPU device");
        let adapter = request_adapter(&self.instance, &self.surface).await?;
        let (device, queue) = request_device(&adapter).await?;
        watch_device_loss(&device, &self.device_lost);

        self.device = device;
        self.queue = queue;
        self.device_lost.store(false, Ordering::Release);
        self.surface.configure(&self.device, &self.surface_config);
        log::info!("GPU device recovered");
        Ok(())
    }

    /// Asynchronously initializes the GPU for `window` at the given pixel size.
    ///
    /// # Errors
    ///
    /// See the module documentation for the mapping from failures to [`RenderError`]
    /// variants.
    pub async fn new_async(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(&InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;
        let adapter = request_adapter(&instance, &surface).await?;
        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = request_device(&adapter).await?;
        let device_lost = Arc::new(AtomicBool::new(false));
        watch_device_loss(&device, &device_lost);

        let surface_capabilities = surface.get_capabilities(&adapter);
        let surface_format = surface_capabilities
            .formats
            .first()
            .copied()
            .ok_or(RenderError::NoSurfaceFormat)?;

        let (width, height) = clamp_size(width, height);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: choose_alpha_mode(&surface_capabilities.alpha_modes),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        log::info!("Surface configured: {surface_format:?}, {width}x{height}");

        Ok(Self {
            instance,
            surface,
            device,
            queue,
            surface_config,
            surface_format,
            device_lost,
        })
    }
}

async fn request_adapter(
    instance: &wgpu::Instance,
    surface: &wgpu::Surface<'static>,
) -> Result<wgpu::Adapter> {
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(surface),
            force_fallback_adapter: false,
        })
        .await
        .ok_or(RenderError::AdapterUnavailable)
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
    log::debug!("WGPU Adapter Features: {:#?}", adapter.features());
    let device_and_queue = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Cornell Box Device"),
                memory_hints: wgpu::MemoryHints::default(),
                required_features: wgpu::Features::default(),
                #[cfg(not(target_arch = "wasm32"))]
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                #[cfg(all(target_arch = "wasm32", feature = "webgpu"))]
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                #[cfg(all(target_arch = "wasm32", feature = "webgl"))]
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
            },
            None,
        )
        .await?;
    Ok(device_and_queue)
}

fn watch_device_loss(device: &wgpu::Device, flag: &Arc<AtomicBool>) {
    let flag = Arc::clone(flag);
    device.set_device_lost_callback(move |reason, message| {
        // Dropping the device on purpose (shutdown, recovery) also reports a loss.
        if matches!(reason, wgpu::DeviceLostReason::Destroyed) {
            return;
        }
        log::error!("GPU device lost ({reason:?}): {message}");
        flag.store(true, Ordering::Release);
    });
}

/// Clamps a surface size so neither dimension is zero.
pub(crate) fn clamp_size(width: u32, height: u32) -> (u32, u32) {
    (width.max(1), height.max(1))
}

/// Prefers an opaque surface; otherwise takes whatever the surface lists first.
fn choose_alpha_mode(supported: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    if supported.contains(&wgpu::CompositeAlphaMode::Opaque) {
        wgpu::CompositeAlphaMode::Opaque
    } else {
        supported
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sizes_are_clamped() {
        assert_eq!(clamp_size(0, 0), (1, 1));
        assert_eq!(clamp_size(800, 0), (800, 1));
        assert_eq!(clamp_size(1280, 720), (1280, 720));
    }

    #[test]
    fn opaque_alpha_is_preferred() {
        use wgpu::CompositeAlphaMode::*;
        assert_eq!(choose_alpha_mode(&[PreMultiplied, Opaque]), Opaque);
        assert_eq!(choose_alpha_mode(&[PreMultiplied, Inherit]), PreMultiplied);
        assert_eq!(choose_alpha_mode(&[]), Auto);
    }
}
