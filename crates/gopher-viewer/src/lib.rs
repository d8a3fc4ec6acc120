// src/lib.rs
//! Touch-controlled 3D gopher viewer.
//!
//! Twelve mesh pieces ship compressed inside the binary. They are unpacked and
//! uploaded on the first frame, then redrawn every frame under a lighting
//! shader with a camera that orbits and scales with the latest touch position.

pub mod app;
pub mod assets;
pub mod camera;
pub mod config;
pub mod gpu;
pub mod renderer;
pub mod touch;
pub mod ui;
