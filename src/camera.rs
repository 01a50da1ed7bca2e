//! # Camera
//!
//! The viewer of the scene: a perspective camera that always looks at a fixed target.
//!
//! All matrices are derived from the current fields on every call, so the camera can be moved
//! between calls (the frame loop moves it once per tick) without any cached state going stale.
//!
//! ## Conventions
//!
//! - World space is right-handed with `+Y` up.
//! - Matrices are column-major and transform column vectors (`clip = P * V * p`), matching
//!   `nalgebra-glm` storage and WGSL's `mat4x4<f32> * vec4<f32>`.
//! - The projection maps view depth to `[0, 1]`, the clip-space depth range of `wgpu`.
//!
//! ## Example
//!
//! ```rust
//! use cornell_core::{Camera, CameraSettings};
//!
//! let mut camera = Camera::new(16.0 / 9.0, &CameraSettings::default());
//! camera.position = nalgebra_glm::vec3(3.5, 0.2, 0.0);
//! let view_projection = camera.view_projection_matrix();
//! # let _ = view_projection;
//! ```

use nalgebra_glm as glm;

use crate::settings::CameraSettings;

/// A perspective camera looking from `position` towards `target`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Eye position in world space. The only field changed every frame.
    pub position: glm::Vec3,

    /// Point the camera looks at.
    pub target: glm::Vec3,

    /// Up direction used to orient the view.
    pub up: glm::Vec3,

    /// Vertical field of view, in radians.
    pub fov_y: f32,

    /// Width divided by height of the output surface.
    pub aspect: f32,

    /// Distance to the near clip plane.
    pub near: f32,

    /// Distance to the far clip plane.
    pub far: f32,
}

impl Camera {
    /// Creates a camera for an output surface with the given aspect ratio.
    pub fn new(aspect: f32, settings: &CameraSettings) -> Self {
        Self {
            position: glm::Vec3::from(settings.position),
            target: glm::Vec3::from(settings.target),
            up: glm::Vec3::from(settings.up),
            fov_y: settings.fov_y_degrees.to_radians(),
            aspect,
            near: settings.near,
            far: settings.far,
        }
    }

    /// World-to-view transform looking from `position` at `target`.
    pub fn view_matrix(&self) -> glm::Mat4 {
        glm::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// View-to-clip perspective transform.
    pub fn projection_matrix(&self) -> glm::Mat4 {
        glm::perspective_rh_zo(self.aspect, self.fov_y, self.near, self.far)
    }

    /// `projection * view`, ready to be applied to world-space column vectors.
    pub fn view_projection_matrix(&self) -> glm::Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Updates the aspect ratio after the output surface changed size.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }
}
