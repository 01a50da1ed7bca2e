//! # Uniform Buffer
//!
//! This module defines `FrameUniforms`, the per-frame record uploaded to the GPU, and the packer
//! that builds it from the camera's output.
//!
//! ## Layout
//!
//! The record mirrors the `FrameUniforms` struct declared in `shader.wgsl`:
//!
//! | Byte offset | Field             | Contents                                  |
//! |-------------|-------------------|-------------------------------------------|
//! | 0           | `view_projection` | 16 `f32`, column-major 4x4 matrix         |
//! | 64          | `camera_position` | 3 `f32`, world-space eye position         |
//! | 76          | `padding`         | 1 `f32`, never read                       |
//!
//! WGSL aligns a `vec3<f32>` to 16 bytes and rounds uniform structs up to a multiple of 16, so
//! the trailing pad float keeps the Rust struct and the shader struct both at exactly 80 bytes.
//! A size mismatch is a configuration error: it is rejected at compile time below and by
//! `wgpu` validation (`min_binding_size`) when the pipeline is created.
//!
//! ### Memory Layout and Traits
//!
//! - `#[repr(C)]`: Fields are laid out in declaration order without reordering.
//! - `bytemuck::Pod` and `bytemuck::Zeroable`: The record can be viewed as raw bytes for
//!   `wgpu::Queue::write_buffer` without copying or `unsafe` code.
//!
//! ## Example Usage
//!
//! ```rust
//! use cornell_core::{Camera, CameraSettings, FrameUniforms};
//!
//! let camera = Camera::new(1.0, &CameraSettings::default());
//! let uniforms = FrameUniforms::pack(&camera.view_projection_matrix(), &camera.position);
//! assert_eq!(uniforms.as_bytes().len(), FrameUniforms::SIZE);
//! ```

use nalgebra_glm as glm;

/// The per-frame uniform record consumed by the shader at group 0, binding 0.
///
/// Build it with [`FrameUniforms::pack`]; the fields are public so tests and callers can read
/// them back, but the layout is fixed by the shader contract.
#[repr(C)]
#[derive(Default, Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    /// Combined projection and view transform, stored column-major.
    pub view_projection: glm::Mat4,

    /// Camera position in world space.
    pub camera_position: glm::Vec3,

    /// Pads the record to a multiple of 16 bytes. Its value is never read.
    pub padding: f32,
}

const _: () = assert!(std::mem::size_of::<FrameUniforms>() == FrameUniforms::SIZE);

impl FrameUniforms {
    /// Size of the record in bytes, as expected by the shader's uniform binding.
    pub const SIZE: usize = 80;

    /// Packs a view-projection matrix and camera position into the uniform layout.
    ///
    /// `nalgebra-glm` already stores matrices column-major, which is what WGSL expects, so the
    /// matrix is copied as is. The pad float is written as zero.
    pub fn pack(view_projection: &glm::Mat4, camera_position: &glm::Vec3) -> Self {
        Self {
            view_projection: *view_projection,
            camera_position: *camera_position,
            padding: 0.0,
        }
    }

    /// The record as the raw bytes written into the uniform buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix() -> glm::Mat4 {
        glm::Mat4::from_fn(|row, column| (row * 4 + column) as f32 + 0.25)
    }

    #[test]
    fn record_is_eighty_bytes() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 80);
        let uniforms = FrameUniforms::pack(&sample_matrix(), &glm::vec3(1.0, 2.0, 3.0));
        assert_eq!(uniforms.as_bytes().len(), 80);
    }

    #[test]
    fn packing_round_trips_bit_exactly() {
        let matrix = sample_matrix();
        let position = glm::vec3(-3.356_409, 0.2, 0.992_837);
        let uniforms = FrameUniforms::pack(&matrix, &position);

        let floats: &[f32] = bytemuck::cast_slice(uniforms.as_bytes());
        assert_eq!(floats.len(), 20);

        for (packed, expected) in floats[..16].iter().zip(matrix.as_slice()) {
            assert_eq!(packed.to_bits(), expected.to_bits());
        }
        for (packed, expected) in floats[16..19].iter().zip(position.as_slice()) {
            assert_eq!(packed.to_bits(), expected.to_bits());
        }
    }

    #[test]
    fn matrix_is_stored_column_major() {
        let matrix = sample_matrix();
        let uniforms = FrameUniforms::pack(&matrix, &glm::Vec3::zeros());
        let floats: &[f32] = bytemuck::cast_slice(uniforms.as_bytes());

        // Element (row 1, column 0) comes second; element (row 0, column 1) comes fifth.
        assert_eq!(floats[1], matrix[(1, 0)]);
        assert_eq!(floats[4], matrix[(0, 1)]);
        // Translation lives in the last column.
        let translation = [matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)], matrix[(3, 3)]];
        assert_eq!(&floats[12..16], &translation);
    }

    #[test]
    fn camera_position_starts_at_byte_64() {
        let uniforms = FrameUniforms::pack(&glm::Mat4::identity(), &glm::vec3(7.0, 8.0, 9.0));
        let bytes = uniforms.as_bytes();
        let x = f32::from_ne_bytes(bytes[64..68].try_into().unwrap());
        let z = f32::from_ne_bytes(bytes[72..76].try_into().unwrap());
        assert_eq!((x, z), (7.0, 9.0));
    }
}
