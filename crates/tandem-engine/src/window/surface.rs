use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::device::{request_device, GpuInit};

/// What to do after the swapchain refused a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceAction {
    /// Reconfigured; try again on the next redraw.
    Reconfigured,
    SkipFrame,
    /// Out of memory; stop.
    Fatal,
}

/// Swapchain of one window, plus the device it was created with.
pub struct WindowSurface<'w> {
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
}

impl<'w> WindowSurface<'w> {
    /// Creates the surface and a device that can present to it.
    pub fn new(instance: &wgpu::Instance, window: &'w Window, init: &GpuInit) -> Result<Self> {
        let size = window.inner_size();

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;
        let (adapter, device, queue) = pollster::block_on(request_device(instance, Some(&surface), init))?;

        let caps = surface.get_capabilities(&adapter);
        let format = pick_format(&caps, init.prefer_srgb).context("surface reports no formats")?;
        let alpha_mode = init
            .alpha_mode
            .filter(|m| caps.alpha_modes.contains(m))
            .or_else(|| caps.alpha_modes.first().copied())
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);
        log::info!(
            "surface {}x{} {:?} on {}",
            config.width,
            config.height,
            format,
            adapter.get_info().name
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Reconfigures for a new window size. Zero sizes are ignored.
    pub fn configure(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Next swapchain image. Presenting it is up to the caller.
    pub fn acquire(&self) -> Result<wgpu::SurfaceTexture, SurfaceAction> {
        self.surface.get_current_texture().map_err(|err| match err {
            SurfaceError::Lost | SurfaceError::Outdated => {
                self.surface.configure(&self.device, &self.config);
                SurfaceAction::Reconfigured
            }
            SurfaceError::OutOfMemory => SurfaceAction::Fatal,
            SurfaceError::Timeout | SurfaceError::Other => SurfaceAction::SkipFrame,
        })
    }
}

fn pick_format(caps: &wgpu::SurfaceCapabilities, prefer_srgb: bool) -> Option<wgpu::TextureFormat> {
    let first = caps.formats.first().copied()?;
    let wanted = |f: &&wgpu::TextureFormat| f.is_srgb() == prefer_srgb;
    Some(caps.formats.iter().find(wanted).copied().unwrap_or(first))
}
