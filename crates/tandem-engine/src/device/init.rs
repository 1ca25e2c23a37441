/// Device and surface parameters for the wgpu-backed context.
///
/// Keep this structure minimal. Add flags only when a concrete platform or
/// backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB swapchain format when available.
    ///
    /// Off by default: the offscreen target holds unencoded colors.
    pub prefer_srgb: bool,

    /// Present mode of the window surface.
    ///
    /// FIFO blocks on vsync, which is what paces the render thread.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    /// Hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,

    /// Backends the instance may pick from.
    pub backends: wgpu::Backends,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
            backends: wgpu::Backends::all(),
        }
    }
}
