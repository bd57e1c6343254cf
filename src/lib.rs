#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! Chunk geometry and visibility for a streamed voxel world, built on WGPU and usable
//! natively or in the browser through WebAssembly.
//!
//! ## Key Modules
//!
//! * `engine_state` - chunk streaming, meshing, geometry arenas, culling and the frame loop
//!
//! ## Architecture
//!
//! Terrain is generated and meshed on worker threads. The main thread packs every chunk's
//! geometry into one shared vertex buffer and one shared index buffer, indexes chunks in
//! an octree and, each frame, picks the visible set either by frustum culling the octree
//! or by walking from the camera's chunk through connected chunk faces. The result is a
//! list of indexed draws whose `first_index` and `base_vertex` point straight into the
//! shared buffers.
//!
//! ## Usage
//!
//! ```ignore
//! // Native headless session
//! fn main() {
//!     voxel_world::run();
//! }
//! ```
//!
//! For web applications:
//!
//! ```ignore
//! // Called from JavaScript
//! voxel_world::run_web();
//! ```

use cgmath::{Deg, Point3, Vector3};
use log::info;
#[cfg(target_family = "wasm")]
use wasm_bindgen::prelude::wasm_bindgen;

use engine_state::{
    buffer_state::BufferState,
    camera_state::{Camera, Projection},
    config::EngineConfig,
    EngineState, FrameStats,
};

pub mod engine_state;

/// Frames simulated by a headless session.
pub const SESSION_FRAMES: usize = 240;

/// Blocks the camera moves per frame in a headless session.
const CAMERA_SPEED: f32 = 0.5;

/// Flies a camera across the world for `frames` frames and returns the last frame's
/// statistics.
///
/// Geometry is uploaded into host-memory buffers, so this runs without a GPU.
pub fn run_session(config: EngineConfig, frames: usize) -> FrameStats {
    let camera = Camera::new(Point3::new(8.0, 40.0, 8.0), Deg(0.0), Deg(-20.0));
    let projection = Projection::new(1280, 720, Deg(70.0), 0.1, 1000.0);
    let mut engine_state = EngineState::new(config, BufferState::new(), camera, projection);

    let mut stats = FrameStats::default();
    for frame in 0..frames {
        engine_state
            .camera_state
            .camera
            .translate(Vector3::new(CAMERA_SPEED, 0.0, 0.0));
        stats = engine_state.tick();
        if frame % 60 == 0 {
            info!("Frame {}: {:?}", frame, stats);
        }
    }

    // Let in-flight chunks land so the summary reflects the final position
    while !engine_state.task_manager.is_idle() {
        stats = engine_state.tick();
        std::thread::yield_now();
    }

    info!(
        "Session done: {} chunks meshed, {} of {} buffer bytes used",
        stats.chunks_meshed,
        engine_state.backend.get_total_used_memory(),
        engine_state.backend.get_total_allocated_memory()
    );
    stats
}

/// Runs a native headless session.
///
/// The first command line argument, if any, is a JSON config file.
#[cfg(not(target_family = "wasm"))]
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();
    info!("Logger initialized");

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("Ignoring config {}: {}", path, err);
                EngineConfig::default()
            }
        },
        None => EngineConfig::default(),
    };

    run_session(config, SESSION_FRAMES);
}

/// Runs a headless session in the browser, logging to the console.
#[cfg(target_family = "wasm")]
#[wasm_bindgen]
pub fn run_web() {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    // A host page may already have installed a logger
    let _ = console_log::init_with_level(log::Level::Info);

    // The browser main thread cannot block on workers
    let config = EngineConfig {
        num_workers: 0,
        ..EngineConfig::default()
    };
    run_session(config, SESSION_FRAMES);
}
