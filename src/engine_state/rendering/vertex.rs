//! Vertex data structures and layouts for voxel rendering.
//!
//! Every chunk mesh is built from the same interleaved vertex record so that all chunks
//! can share one vertex buffer and be drawn with a single pipeline.

use cgmath::Point3;

/// A vertex in the voxel rendering pipeline.
///
/// # Memory Layout
/// - Position: [f32; 3] world space (12 bytes)
/// - Color: [f32; 3] linear RGB (12 bytes)
/// - Normal: [f32; 3] unit face normal (12 bytes)
///
/// Total size: 36 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// World-space position
    pub position: [f32; 3],
    /// Material color
    pub color: [f32; 3],
    /// Outward face normal
    pub normal: [f32; 3],
}

/// Size of one vertex in bytes.
pub const VERTEX_STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;

/// Size of one index in bytes (32-bit indices).
pub const INDEX_STRIDE: u64 = std::mem::size_of::<u32>() as u64;

impl Vertex {
    /// Creates a new vertex.
    ///
    /// # Arguments
    /// * `position` - The world-space position of the vertex
    /// * `color` - The material color
    /// * `normal` - The outward normal of the face the vertex belongs to
    pub fn new(position: Point3<f32>, color: [f32; 3], normal: [f32; 3]) -> Self {
        Vertex {
            position: position.into(),
            color,
            normal,
        }
    }

    /// The position as a point.
    pub fn point(&self) -> Point3<f32> {
        Point3::from(self.position)
    }

    /// Returns the vertex buffer layout description for the shader pipeline.
    ///
    /// # Shader Attributes
    /// - `location = 0`: position (vec3<f32>)
    /// - `location = 1`: color (vec3<f32>)
    /// - `location = 2`: normal (vec3<f32>)
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: VERTEX_STRIDE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}
