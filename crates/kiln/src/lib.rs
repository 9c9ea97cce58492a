//! # Kiln
//!
//! A small 2D framework: an archetype entity-component store, phased
//! systems with a fixed-timestep loop, plugins, a winit window and a batched
//! wgpu quad renderer.
//!
//! Start with `use kiln::prelude::*` and build an [`App`](app::App).

pub mod app;
pub mod config;
pub mod ecs;
pub mod error;
pub mod logging;
pub mod math;
pub mod prelude;
pub mod render;
pub mod render2d;
pub mod time;
pub mod window;

pub use error::{Error, Result};
