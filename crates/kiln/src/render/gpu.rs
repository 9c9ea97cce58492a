//! # GPU context: wgpu device, queue and window surface
//!
//! [`GpuContext`] is created together with the window and registered as a
//! resource. The surface sits behind an `Arc` and `wgpu::Device`/`Queue` are
//! cheap handles, so renderers keep their own clones instead of borrowing the
//! resource every frame.
//!
//! ## Design
//!
//! ```text
//! Instance ─▶ Surface (from the winit window)
//!    │
//!    └──▶ Adapter (compatible with that surface)
//!            └──▶ Device + Queue (default limits, no extra features)
//! ```
//!
//! wgpu's async setup calls are driven with `pollster::block_on`, since
//! startup systems are synchronous. The surface prefers an sRGB format and
//! presents with `AutoVsync`.
//!
//! Nothing here resizes the surface. The window is created non-resizable.

use std::sync::Arc;

use winit::window::Window;

use crate::error::{Error, Result};

/// Everything a renderer needs to talk to the GPU.
pub struct GpuContext {
    /// Creates buffers, pipelines and shader modules.
    pub device: wgpu::Device,
    /// Buffer writes and command submission.
    pub queue: wgpu::Queue,
    /// Swapchain of the window. Shared with renderers, which reconfigure it
    /// after a lost or outdated frame.
    pub surface: Arc<wgpu::Surface<'static>>,
    /// The configuration the surface was last configured with.
    pub surface_config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Pick an adapter compatible with `window`, open a device and configure
    /// the surface to the window's size.
    pub fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::Gpu(format!("cannot create surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| Error::Gpu(format!("no suitable adapter: {e}")))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("kiln device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))
        .map_err(|e| Error::Gpu(format!("cannot open device: {e}")))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| Error::Gpu("surface reports no formats".to_string()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        log::info!(
            "gpu ready: {} ({:?}), surface {}x{} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            surface_config.width,
            surface_config.height,
            format
        );

        Ok(Self {
            device,
            queue,
            surface: Arc::new(surface),
            surface_config,
        })
    }

    /// Color format render pipelines must target.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Width and height in physical pixels, never zero.
    pub fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }
}
