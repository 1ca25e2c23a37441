use std::thread::ThreadId;

use anyhow::{Context, Result};
use parking_lot::{Mutex, MutexGuard};

use super::{ContextAffinity, ContextError, GpuContext, GpuInit};

/// Color format of the offscreen target the render thread draws into.
pub const OFFSCREEN_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Depth format of the offscreen target.
pub const OFFSCREEN_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Requests an adapter + device compatible with `surface` (if given).
///
/// Adapter/device acquisition is asynchronous under wgpu; callers on a plain
/// thread block on it with `pollster`.
pub async fn request_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
    init: &GpuInit,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .context("failed to find a suitable GPU adapter")?;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("tandem device"),
            required_features: init.required_features,
            required_limits: init.required_limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")?;

    Ok((adapter, device, queue))
}

/// Color + depth textures standing in for the widget's framebuffer object.
///
/// The render thread draws into it; the owner thread samples it during
/// composition. Access goes through `WgpuContext::bound_target`, which only
/// succeeds while the context is current on the caller.
pub struct OffscreenTarget {
    width: u32,
    height: u32,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

impl OffscreenTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tandem offscreen color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tandem offscreen depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            width,
            height,
            color_view,
            depth_view,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }
}

/// wgpu-backed context: device, queue and the offscreen target.
///
/// wgpu itself has no notion of a "current" thread; the affinity bookkeeping
/// supplies it so the same handoff rules hold as for a GL context.
pub struct WgpuContext {
    affinity: ContextAffinity,
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: Mutex<OffscreenTarget>,
}

impl WgpuContext {
    pub fn new(owner: ThreadId, device: wgpu::Device, queue: wgpu::Queue, width: u32, height: u32) -> Self {
        let target = OffscreenTarget::new(&device, width, height);
        Self {
            affinity: ContextAffinity::new(owner),
            device,
            queue,
            target: Mutex::new(target),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The offscreen target, available only while the context is current on
    /// the calling thread.
    pub fn bound_target(&self) -> Result<MutexGuard<'_, OffscreenTarget>, ContextError> {
        self.affinity.ensure_current()?;
        Ok(self.target.lock())
    }

    /// Recreates the offscreen target at a new size. Requires the context to be
    /// current on the caller.
    pub fn resize_target(&self, width: u32, height: u32) -> Result<(), ContextError> {
        let mut target = self.bound_target()?;
        if target.size() != (width.max(1), height.max(1)) {
            *target = OffscreenTarget::new(&self.device, width, height);
            log::debug!("offscreen target resized to {width}x{height}");
        }
        Ok(())
    }
}

impl GpuContext for WgpuContext {
    fn affinity(&self) -> &ContextAffinity {
        &self.affinity
    }

    fn label(&self) -> &str {
        "wgpu context"
    }
}
