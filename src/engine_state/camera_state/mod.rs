//! # Camera State Management
//!
//! Tracks the camera, keeps its uniform buffer current and derives what the culling code
//! needs from it: the view frustum and the chunk the camera is in.
//!
//! ## Core Components
//! - `Camera`: the camera's position and orientation in 3D space
//! - `Projection`: the camera's projection matrix
//! - `CameraUniform`: GPU representation of camera data for shaders

use cgmath::Matrix4;
use wgpu::BufferUsages;

use crate::engine_state::{
    buffer_state::{BufferError, GpuBackend},
    culling::Frustum,
    voxels::chunk::ChunkKey,
};

pub mod camera;

pub use camera::{view_projection, Camera, CameraUniform, Projection};

/// Name of the GPU buffer used for camera uniform data
pub const CAMERA_BUFFER_NAME: &str = "camera_buffer";

/// The camera together with its GPU-side copy.
pub struct CameraState {
    /// The current camera position and orientation
    pub camera: Camera,
    /// The current projection
    pub projection: Projection,
    camera_uniform: CameraUniform,
    last_chunk: ChunkKey,
}

impl CameraState {
    /// Creates the camera state and its uniform buffer.
    pub fn new(backend: &mut impl GpuBackend, camera: Camera, projection: Projection) -> Self {
        backend.create_buffer(
            CAMERA_BUFFER_NAME,
            std::mem::size_of::<CameraUniform>() as u64,
            BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        );
        Self {
            last_chunk: camera.chunk_key(),
            camera,
            projection,
            camera_uniform: CameraUniform::new(),
        }
    }

    /// Combined projection and view matrix.
    pub fn view_projection(&self) -> Matrix4<f32> {
        view_projection(&self.camera, &self.projection)
    }

    /// The current view frustum.
    pub fn frustum(&self, epsilon: f32) -> Frustum {
        Frustum::from_view_projection(&self.view_projection()).with_epsilon(epsilon)
    }

    /// Uploads the uniform and reports the camera's chunk if it changed since the last
    /// call.
    pub fn sync(&mut self, backend: &mut impl GpuBackend) -> Result<Option<ChunkKey>, BufferError> {
        self.camera_uniform
            .update_view_proj_and_pos(&self.camera, &self.projection);
        backend.write_buffer(CAMERA_BUFFER_NAME, 0, bytemuck::cast_slice(&[self.camera_uniform]))?;

        let chunk = self.camera.chunk_key();
        if chunk == self.last_chunk {
            return Ok(None);
        }
        self.last_chunk = chunk;
        Ok(Some(chunk))
    }
}
