//! # Mesh Module
//!
//! Procedural construction of the Cornell box geometry.
//!
//! The scene is made of six quads: the floor, the ceiling, the back wall, the red left wall,
//! the green right wall and a small emissive patch hanging just below the ceiling. The walls
//! are inscribed in the cube of half-extent `1.0` centered at the origin; the open side of the
//! box faces `+Z`, which is where the camera starts its orbit.
//!
//! ## Winding
//!
//! Every quad lists its corners so that the triangles `(0, 1, 2)` and `(0, 2, 3)` wind
//! counter-clockwise when viewed from the side its normal points to. The render pipeline
//! treats counter-clockwise triangles as front faces and culls back faces, so a quad with its
//! corners in the wrong order silently disappears. The tests below check this per wall.
//!
//! ## Example
//!
//! ```rust
//! let mesh = cornell_core::build_cornell_box();
//! assert_eq!(mesh.vertex_count(), 24);
//! assert_eq!(mesh.index_count(), 36);
//! ```

use crate::vertex::{Vertex, FLOATS_PER_VERTEX};

/// Index pattern applied to the four corners of every quad.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

const WHITE: [f32; 3] = [0.73, 0.73, 0.73];
const RED: [f32; 3] = [0.65, 0.05, 0.05];
const GREEN: [f32; 3] = [0.12, 0.45, 0.15];
const LIGHT: [f32; 3] = [1.0, 1.0, 1.0];

/// Half-extent of the emissive ceiling patch.
pub const LIGHT_HALF_EXTENT: f32 = 0.3;

/// Height of the emissive patch. Kept below the ceiling to avoid z-fighting.
pub const LIGHT_HEIGHT: f32 = 0.99;

/// A planar four-corner patch used while building the mesh.
///
/// Quads only exist during construction; the mesh keeps the resulting vertices and indices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    /// Name of the surface, used in logs and test failures.
    pub label: &'static str,

    /// Corners in counter-clockwise order as seen from the normal side.
    pub corners: [[f32; 3]; 4],

    /// Normal shared by all four corners.
    pub normal: [f32; 3],

    /// Color shared by all four corners.
    pub color: [f32; 3],
}

/// The static scene geometry: an ordered vertex list and a 16-bit index list.
///
/// A `Mesh` is built once by [`MeshBuilder`] and never mutated afterwards. It is the only
/// input to the vertex and index buffer uploads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
}

impl Mesh {
    /// The vertices in insertion order.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// The vertices flattened to `FLOATS_PER_VERTEX` floats each.
    pub fn vertex_data(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// The triangle list indices.
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// The vertex data as raw bytes, as uploaded to the GPU.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// The index data as raw bytes, as uploaded to the GPU.
    ///
    /// `wgpu` requires buffer writes to be 4-byte aligned. The Cornell box always produces a
    /// multiple of six `u16` indices, which satisfies that.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Accumulates quads into a [`Mesh`].
///
/// Each call to [`MeshBuilder::add_quad`] appends four vertices and six indices offset by the
/// number of vertices already present.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a quad's corners and its two triangles.
    pub fn add_quad(&mut self, quad: &Quad) -> &mut Self {
        let base = self.vertices.len() as u16;
        self.vertices.extend(
            quad.corners
                .iter()
                .map(|&corner| Vertex::new(corner, quad.normal, quad.color)),
        );
        self.indices
            .extend(QUAD_INDICES.iter().map(|&index| base + index));
        self
    }

    pub fn build(self) -> Mesh {
        debug_assert_eq!(self.vertices.len() % 4, 0);
        debug_assert_eq!(self.indices.len() % QUAD_INDICES.len(), 0);
        Mesh {
            vertices: self.vertices,
            indices: self.indices,
        }
    }
}

/// The six surfaces of the scene, in draw order.
pub fn cornell_box_quads() -> [Quad; 6] {
    let l = LIGHT_HALF_EXTENT;
    let y = LIGHT_HEIGHT;

    [
        Quad {
            label: "floor",
            corners: [
                [-1.0, -1.0, -1.0],
                [-1.0, -1.0, 1.0],
                [1.0, -1.0, 1.0],
                [1.0, -1.0, -1.0],
            ],
            normal: [0.0, 1.0, 0.0],
            color: WHITE,
        },
        Quad {
            label: "ceiling",
            corners: [
                [-1.0, 1.0, -1.0],
                [1.0, 1.0, -1.0],
                [1.0, 1.0, 1.0],
                [-1.0, 1.0, 1.0],
            ],
            normal: [0.0, -1.0, 0.0],
            color: WHITE,
        },
        Quad {
            label: "back wall",
            corners: [
                [-1.0, -1.0, -1.0],
                [1.0, -1.0, -1.0],
                [1.0, 1.0, -1.0],
                [-1.0, 1.0, -1.0],
            ],
            normal: [0.0, 0.0, 1.0],
            color: WHITE,
        },
        Quad {
            label: "left wall",
            corners: [
                [-1.0, -1.0, 1.0],
                [-1.0, -1.0, -1.0],
                [-1.0, 1.0, -1.0],
                [-1.0, 1.0, 1.0],
            ],
            normal: [1.0, 0.0, 0.0],
            color: RED,
        },
        Quad {
            label: "right wall",
            corners: [
                [1.0, -1.0, -1.0],
                [1.0, -1.0, 1.0],
                [1.0, 1.0, 1.0],
                [1.0, 1.0, -1.0],
            ],
            normal: [-1.0, 0.0, 0.0],
            color: GREEN,
        },
        Quad {
            label: "ceiling light",
            corners: [[-l, y, -l], [l, y, -l], [l, y, l], [-l, y, l]],
            normal: [0.0, -1.0, 0.0],
            color: LIGHT,
        },
    ]
}

/// Builds the Cornell box mesh. Pure and deterministic.
pub fn build_cornell_box() -> Mesh {
    let mut builder = MeshBuilder::new();
    for quad in &cornell_box_quads() {
        builder.add_quad(quad);
    }
    let mesh = builder.build();
    debug_assert_eq!(mesh.vertex_data().len(), mesh.vertices.len() * FLOATS_PER_VERTEX);
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Twice the signed area of the triangle projected onto the plane facing `normal`.
    fn facing_area(a: [f32; 3], b: [f32; 3], c: [f32; 3], normal: [f32; 3]) -> f32 {
        dot(cross(sub(b, a), sub(c, a)), normal)
    }

    #[test]
    fn every_index_references_an_existing_vertex() {
        let mesh = build_cornell_box();
        assert!(mesh
            .indices()
            .iter()
            .all(|&index| u32::from(index) < mesh.vertex_count()));
    }

    #[test]
    fn index_count_is_a_multiple_of_six() {
        let mesh = build_cornell_box();
        assert_eq!(mesh.index_count() % 6, 0);
        assert_eq!(mesh.index_count(), 6 * 6);
    }

    #[test]
    fn counts_match_raw_arrays() {
        let mesh = build_cornell_box();
        assert_eq!(
            mesh.vertex_count() as usize,
            mesh.vertex_data().len() / FLOATS_PER_VERTEX
        );
        assert_eq!(mesh.index_count() as usize, mesh.indices().len());
        assert_eq!(mesh.vertex_bytes().len(), mesh.vertices().len() * 36);
        assert_eq!(mesh.index_bytes().len(), mesh.indices().len() * 2);
        assert_eq!(mesh.index_bytes().len() % 4, 0);
    }

    #[test]
    fn build_is_deterministic() {
        assert_eq!(build_cornell_box(), build_cornell_box());
    }

    #[test]
    fn add_quad_offsets_indices_by_running_vertex_count() {
        let quads = cornell_box_quads();
        let mut builder = MeshBuilder::new();
        builder.add_quad(&quads[0]).add_quad(&quads[1]);
        let mesh = builder.build();

        assert_eq!(mesh.indices(), &[0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
        assert_eq!(mesh.vertices()[4].position, quads[1].corners[0]);
    }

    #[test]
    fn every_wall_winds_towards_its_normal() {
        for quad in cornell_box_quads() {
            let [p0, p1, p2, p3] = quad.corners;
            assert!(
                facing_area(p0, p1, p2, quad.normal) > 0.0,
                "{}: triangle (0, 1, 2) faces away from its normal",
                quad.label
            );
            assert!(
                facing_area(p0, p2, p3, quad.normal) > 0.0,
                "{}: triangle (0, 2, 3) faces away from its normal",
                quad.label
            );
        }
    }

    #[test]
    fn mesh_triangles_keep_quad_winding() {
        let mesh = build_cornell_box();
        let vertices = mesh.vertices();
        for triangle in mesh.indices().chunks(3) {
            let [a, b, c] = [
                vertices[triangle[0] as usize],
                vertices[triangle[1] as usize],
                vertices[triangle[2] as usize],
            ];
            assert!(facing_area(a.position, b.position, c.position, a.normal) > 0.0);
        }
    }

    #[test]
    fn walls_are_inscribed_in_unit_cube() {
        let mesh = build_cornell_box();
        for vertex in mesh.vertices() {
            assert!(vertex.position.iter().all(|c| (-1.0..=1.0).contains(c)));
            assert!(vertex.normal.iter().all(|c| (-1.0..=1.0).contains(c)));
            assert!(vertex.color.iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn ceiling_light_sits_just_below_ceiling() {
        let light = cornell_box_quads()[5];
        assert_eq!(light.label, "ceiling light");
        for corner in light.corners {
            assert_eq!(corner[1], LIGHT_HEIGHT);
            assert!(corner[0].abs() <= LIGHT_HALF_EXTENT);
            assert!(corner[2].abs() <= LIGHT_HALF_EXTENT);
        }
        assert!(LIGHT_HEIGHT < 1.0);
    }

    #[test]
    fn side_walls_are_colored() {
        let quads = cornell_box_quads();
        assert_eq!(quads[3].color, RED);
        assert_eq!(quads[4].color, GREEN);
    }
}
