//! # Errors
//!
//! Error types shared by the renderer.
//!
//! [`RenderError`] covers everything that can stop the renderer from starting or from
//! continuing: an unsupported environment, a failed resource acquisition, the GPU running out
//! of memory, or the windowing host failing. Setup code returns it through the crate-wide
//! [`Result`] alias and nothing below the top-level entry point swallows it.
//!
//! [`FrameError`] is narrower. It describes why a single frame did not reach the screen, and
//! most of its variants are recoverable: the frame loop skips the frame or rebuilds the GPU
//! resources and carries on.

use thiserror::Error;

/// Errors that abort renderer setup or end a running renderer.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The window or canvas could not be turned into a `wgpu` surface.
    #[error("Failed to create a rendering surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    /// The page has no canvas element with the expected id.
    #[error("No canvas element with id `{0}` found on the page")]
    CanvasNotFound(&'static str),

    /// No adapter compatible with the surface was found.
    #[error("No GPU adapter compatible with the surface is available")]
    AdapterUnavailable,

    /// The surface reported no texture formats for the chosen adapter.
    #[error("The surface does not support any texture format on this adapter")]
    NoSurfaceFormat,

    /// The adapter refused to hand out a device.
    #[error("Failed to request a GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// A GPU resource could not be created during initialization.
    #[error("Failed to create {step}: {message}")]
    ResourceCreation {
        /// The initialization step that failed, e.g. `"vertex buffer"`.
        step: &'static str,
        /// The validation or allocation message reported by `wgpu`.
        message: String,
    },

    /// The GPU ran out of memory while rendering.
    #[error("The GPU ran out of memory")]
    OutOfMemory,

    /// The native window could not be created.
    #[error("Failed to create the window: {0}")]
    Window(#[from] winit::error::OsError),

    /// The event loop could not be created or terminated abnormally.
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

impl RenderError {
    /// Whether the error means this machine or browser cannot run the renderer at all.
    pub fn is_unsupported_environment(&self) -> bool {
        matches!(
            self,
            Self::SurfaceCreation(_)
                | Self::CanvasNotFound(_)
                | Self::AdapterUnavailable
                | Self::NoSurfaceFormat
        )
    }
}

/// Why a single frame was not presented.
#[derive(Error, Debug)]
pub enum FrameError {
    /// The frame was dropped and the next one may succeed.
    #[error("Frame skipped: {0}")]
    Skipped(&'static str),

    /// The GPU device was lost; every GPU resource has to be recreated.
    #[error("The GPU device was lost")]
    DeviceLost,

    /// An unrecoverable error.
    #[error(transparent)]
    Fatal(#[from] RenderError),
}

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_errors_name_the_failed_step() {
        let error = RenderError::ResourceCreation {
            step: "index buffer",
            message: "Buffer size 0 is invalid".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to create index buffer: Buffer size 0 is invalid"
        );
    }

    #[test]
    fn unsupported_environment_classification() {
        assert!(RenderError::AdapterUnavailable.is_unsupported_environment());
        assert!(RenderError::NoSurfaceFormat.is_unsupported_environment());
        assert!(!RenderError::OutOfMemory.is_unsupported_environment());
    }

    #[test]
    fn fatal_frame_errors_are_transparent() {
        let error = FrameError::from(RenderError::OutOfMemory);
        assert!(matches!(error, FrameError::Fatal(RenderError::OutOfMemory)));
        assert_eq!(error.to_string(), "The GPU ran out of memory");
    }
}
