//! GPU-side data layouts for quads.
//!
//! ```text
//! QuadVertex (16 bytes)
//! ┌──────────────┬──────────────┐
//! │ position     │ uv           │
//! │ [f32; 2]     │ [f32; 2]     │
//! │ offset 0     │ offset 8     │
//! │ location(0)  │ location(1)  │
//! └──────────────┴──────────────┘
//! ```
//!
//! Positions are in window pixels; the projection uniform maps them to clip
//! space with the origin at the top-left corner and +Y pointing down.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};

/// Corner index pattern of one quad: two triangles over the corners
/// top-left, bottom-left, bottom-right, top-right.
pub const QUAD_INDEX_PATTERN: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// UVs matching [`Quad::corners`](super::Quad::corners).
pub const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]];

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl QuadVertex {
    pub fn new(position: Vec2, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            uv,
        }
    }

    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct ProjectionUniform {
    pub matrix: [[f32; 4]; 4],
}

impl ProjectionUniform {
    /// Pixel-space orthographic projection for a `width` x `height` target.
    pub fn screen(width: u32, height: u32) -> Self {
        let projection = Mat4::orthographic_rh(0.0, width as f32, height as f32, 0.0, -1.0, 1.0);
        Self {
            matrix: projection.to_cols_array_2d(),
        }
    }
}

/// Index buffer contents for `quads` quads: the corner pattern offset by
/// `4 * i` for quad `i`.
pub fn quad_indices(quads: usize) -> Vec<u32> {
    (0..quads as u32)
        .flat_map(|quad| QUAD_INDEX_PATTERN.map(|corner| corner + 4 * quad))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<QuadVertex>(), 16);
        assert_eq!(QuadVertex::LAYOUT.array_stride, 16);
    }

    #[test]
    fn index_pattern_repeats_per_quad() {
        assert_eq!(
            quad_indices(2),
            vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]
        );
        assert!(quad_indices(0).is_empty());
        assert_eq!(quad_indices(12_000).len(), 72_000);
    }

    #[test]
    fn projection_maps_top_left_and_bottom_right() {
        let m = Mat4::from_cols_array_2d(&ProjectionUniform::screen(1280, 720).matrix);
        let top_left = m * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let bottom_right = m * Vec4::new(1280.0, 720.0, 0.0, 1.0);
        assert!((top_left.x + 1.0).abs() < 1e-6 && (top_left.y - 1.0).abs() < 1e-6);
        assert!((bottom_right.x - 1.0).abs() < 1e-6 && (bottom_right.y + 1.0).abs() < 1e-6);
    }
}
