//! # Vertex Module
//!
//! This module provides the `Vertex` struct and its associated methods for describing vertex
//! data to the GPU. Every vertex of the Cornell box carries a position, a surface normal and a
//! color, stored as nine contiguous `f32` values.
//!
//! # Overview
//!
//! ## Structs
//!
//! - [`Vertex`]: A single vertex with `position`, `normal` and `color` attributes.
//!
//! ## Methods
//!
//! - [`Vertex::new`]: Builds a vertex from its three attributes.
//! - [`Vertex::vertex_attributes`]: Returns the attribute list matching the shader inputs.
//! - [`Vertex::description`]: Returns the vertex buffer layout used by the render pipeline.
//!
//! ## Memory Layout
//!
//! | Attribute  | Shader location | Byte offset | Format      |
//! |------------|-----------------|-------------|-------------|
//! | `position` | 0               | 0           | `Float32x3` |
//! | `normal`   | 1               | 12          | `Float32x3` |
//! | `color`    | 2               | 24          | `Float32x3` |
//!
//! The stride is 36 bytes. The shader in `shader.wgsl` declares its `VertexInput` with the
//! same locations, so changing this table means changing the shader as well.
//!
//! # Crate Dependencies
//!
//! - `wgpu` for the GPU attributes and layouts.
//! - `bytemuck` for casting vertex slices to raw bytes for upload.

/// Number of `f32` values making up one [`Vertex`].
pub const FLOATS_PER_VERTEX: usize = 9;

/// Represents a single vertex of the scene mesh.
///
/// Position and normal channels lie in `[-1.0, 1.0]`, color channels in `[0.0, 1.0]`.
/// Vertices are never mutated once the mesh has been built.
///
/// ```rust
/// use cornell_core::Vertex;
///
/// let vertex = Vertex::new([0.0, -1.0, 0.0], [0.0, 1.0, 0.0], [0.73, 0.73, 0.73]);
/// assert_eq!(vertex.normal, [0.0, 1.0, 0.0]);
/// ```
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// The position of the vertex in world space (`x`, `y`, `z`).
    pub position: [f32; 3],

    /// The unit surface normal shared by every corner of the owning quad.
    ///
    /// For the Cornell box the normals point into the box, which is also the side the
    /// triangles wind counter-clockwise towards.
    pub normal: [f32; 3],

    /// The linear RGB color of the vertex.
    pub color: [f32; 3],
}

impl Vertex {
    /// Builds a vertex from its position, normal and color.
    pub const fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position,
            normal,
            color,
        }
    }

    /// Generates the vertex attributes layout for the `Vertex` struct.
    ///
    /// # Returns
    ///
    /// A `Vec<wgpu::VertexAttribute>` with three `Float32x3` attributes at shader locations
    /// 0 (`position`), 1 (`normal`) and 2 (`color`). Offsets are computed by
    /// `wgpu::vertex_attr_array!` and land on 0, 12 and 24 bytes.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cornell_core::Vertex;
    ///
    /// let attributes = Vertex::vertex_attributes();
    /// assert_eq!(attributes[2].offset, 24);
    /// ```
    pub fn vertex_attributes() -> Vec<wgpu::VertexAttribute> {
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3].to_vec()
    }

    /// Returns the vertex buffer layout for the `Vertex` struct.
    ///
    /// # Parameters
    ///
    /// - `attributes`: The attribute list, normally the result of
    ///   [`Vertex::vertex_attributes`]. It is borrowed because the layout only references it.
    ///
    /// # Returns
    ///
    /// A `wgpu::VertexBufferLayout` with a 36-byte stride, per-vertex stepping and the given
    /// attributes.
    pub fn description(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}
