//! Live scene viewer application.
//!
//! Wires producers (playback, demo sources), the topic bus and the display
//! set to a winit/wgpu/egui shell. Producer threads and the sync thread feed
//! snapshots; the window thread builds the frame's render list and paints
//! the 2D overlays.

pub mod app;
pub mod camera;
pub mod demo;
pub mod gfx;
pub mod paint;
pub mod playback;
