//! # Voxel World Entry Point
//!
//! Runs a headless streaming and culling session and logs per-frame statistics.
//!
//! For web applications, see the `run_web()` function in the library.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- config.json
//! ```

fn main() {
    #[cfg(not(target_family = "wasm"))]
    voxel_world::run();
}
