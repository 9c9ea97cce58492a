//! Batched 2D quad rendering.
//!
//! Every entity with a [`Quad`] component is drawn each frame as a
//! pixel-space rectangle. The renderer is a [`Renderer2d`] resource driven by
//! three update systems:
//!
//! ```text
//! begin_frame    acquire + clear
//! collect_quads  batch every Quad, flushing when the batch fills up
//! end_frame      flush the remainder + present
//! ```
//!
//! [`Renderer2dPlugin`] wires this up on top of a [`WindowPlugin`] with the
//! wgpu backend. Tests and headless tools can call [`add_render_systems`]
//! with any [`RenderBackend`].

mod batch;
mod pipeline;
mod vertex;

use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use batch::{
    INDICES_PER_QUAD, QuadBatch, RenderBackend, RenderStats, Renderer2d, VERTICES_PER_QUAD,
};
pub use pipeline::WgpuQuadBackend;
pub use vertex::{QUAD_INDEX_PATTERN, QUAD_UVS, QuadVertex, quad_indices};

use crate::app::{App, Plugin};
use crate::ecs::{SystemResult, World, shutdown, startup, update};
use crate::error::{Error, Result};
use crate::render::GpuContext;
use crate::render::shader::SegmentedShader;
use crate::window::{WindowPlugin, destroy_window};

/// Quads per batch.
pub const MAX_QUADS: usize = 12_000;

/// Axis-aligned rectangle in window pixels. `position` is the top-left
/// corner, `dimension` the width and height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub position: Vec2,
    pub dimension: Vec2,
}

impl Quad {
    pub fn new(position: Vec2, dimension: Vec2) -> Self {
        Self {
            position,
            dimension,
        }
    }

    /// Top-left, bottom-left, bottom-right, top-right.
    pub fn corners(&self) -> [Vec2; 4] {
        let p = self.position;
        let d = self.dimension;
        [
            p,
            Vec2::new(p.x, p.y + d.y),
            p + d,
            Vec2::new(p.x + d.x, p.y),
        ]
    }
}

/// The quad shader shipped with the crate, compiled into the binary.
const BUNDLED_SHADER: &str = include_str!("../../resources/shaders/basic.qsh");
/// Name the bundled shader reports in error messages.
const BUNDLED_SHADER_NAME: &str = "resources/shaders/basic.qsh";

/// Parse the bundled quad shader.
pub fn bundled_shader() -> Result<SegmentedShader> {
    Ok(SegmentedShader::parse(BUNDLED_SHADER_NAME, BUNDLED_SHADER)?)
}

/// Settings for the wgpu renderer created at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererSettings {
    /// `.qsh` file to load at startup. `None` uses [`bundled_shader`], so a
    /// relocated binary does not depend on the source tree.
    pub shader_path: Option<PathBuf>,
    /// Quads per batch; also sizes the GPU vertex and index buffers.
    pub max_quads: usize,
    /// Linear RGBA.
    pub clear_color: [f64; 4],
}

impl RendererSettings {
    fn shader(&self) -> Result<SegmentedShader> {
        match &self.shader_path {
            Some(path) => Ok(SegmentedShader::load(path)?),
            None => bundled_shader(),
        }
    }
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            shader_path: None,
            max_quads: MAX_QUADS,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

fn renderer_mut<B: RenderBackend>(world: &mut World) -> Result<&mut Renderer2d<B>> {
    world
        .get_resource_mut::<Renderer2d<B>>()
        .ok_or_else(|| Error::Gpu("no 2D renderer registered".to_string()))
}

pub fn begin_frame<B: RenderBackend>(world: &mut World, _dt: f32) -> SystemResult {
    renderer_mut::<B>(world)?.begin_frame()
}

/// Feed every [`Quad`] to the renderer in storage order. Stops at the first
/// backend error.
pub fn collect_quads<B: RenderBackend>(world: &mut World, _dt: f32) -> SystemResult {
    let mut renderer = world
        .take_resource::<Renderer2d<B>>()
        .ok_or_else(|| Error::Gpu("no 2D renderer registered".to_string()))?;

    let mut failure = None;
    world.query::<&Quad>(|_, quad| {
        if failure.is_none()
            && let Err(e) = renderer.draw_quad(quad)
        {
            failure = Some(e);
        }
    });

    world.insert_resource(renderer);
    failure.map_or(Ok(()), Err)
}

pub fn end_frame<B: RenderBackend>(world: &mut World, _dt: f32) -> SystemResult {
    renderer_mut::<B>(world)?.end_frame()
}

/// Drop the renderer and its GPU objects. Safe to call when none exists.
pub fn teardown_renderer<B: RenderBackend>(world: &mut World) -> SystemResult {
    if world.remove_resource::<Renderer2d<B>>() {
        log::info!("2D renderer released");
    }
    Ok(())
}

/// Register the per-frame render systems and the shutdown teardown for a
/// [`Renderer2d<B>`] resource that something else registers.
///
/// Call this before anything that registers shutdown systems tearing down
/// what the backend uses, so the renderer is dropped first.
pub fn add_render_systems<B: RenderBackend>(app: &mut App) {
    app.add_system(update(begin_frame::<B>))
        .add_system(update(collect_quads::<B>))
        .add_system(update(end_frame::<B>))
        .add_system(shutdown(teardown_renderer::<B>));
}

/// Startup work of [`Renderer2dPlugin`]: load the shader and register a
/// [`Renderer2d<WgpuQuadBackend>`]. Needs the [`GpuContext`] from the window.
pub fn setup_wgpu_renderer(world: &mut World, settings: &RendererSettings) -> SystemResult {
    let shader = settings.shader()?;
    let gpu = world
        .get_resource::<GpuContext>()
        .ok_or_else(|| Error::Gpu("renderer needs a GpuContext, open a window first".to_string()))?;
    let backend = WgpuQuadBackend::new(gpu, &shader, settings.max_quads)?;
    let renderer =
        Renderer2d::new(backend, settings.max_quads).with_clear_color(settings.clear_color);
    world.register_resource(renderer)?;
    log::info!("2D renderer ready, shader {}", shader.path().display());
    Ok(())
}

/// Window plus batched quad renderer.
pub struct Renderer2dPlugin<H> {
    window: WindowPlugin<H>,
    settings: RendererSettings,
}

impl<H> Renderer2dPlugin<H>
where
    H: FnMut(&mut World, f32) -> SystemResult + 'static,
{
    pub fn new(window: WindowPlugin<H>) -> Self {
        Self {
            window,
            settings: RendererSettings::default(),
        }
    }

    pub fn with_clear_color(mut self, clear_color: [f64; 4]) -> Self {
        self.settings.clear_color = clear_color;
        self
    }

    pub fn with_shader_path(mut self, path: impl AsRef<Path>) -> Self {
        self.settings.shader_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_max_quads(mut self, max_quads: usize) -> Self {
        self.settings.max_quads = max_quads;
        self
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }
}

impl<H> Plugin for Renderer2dPlugin<H>
where
    H: FnMut(&mut World, f32) -> SystemResult + 'static,
{
    fn build(self, app: &mut App) -> Result<()> {
        if self.settings.max_quads == 0 {
            return Err(Error::Config("max_quads must be at least 1".to_string()));
        }
        self.window.install(app)?;

        let settings = self.settings;
        app.add_system(
            startup(move |world: &mut World| setup_wgpu_renderer(world, &settings))
                .named("setup_renderer"),
        );
        add_render_systems::<WgpuQuadBackend>(app);
        // The renderer holds the surface, so it goes before the window.
        app.add_system(shutdown(destroy_window));
        Ok(())
    }
}
