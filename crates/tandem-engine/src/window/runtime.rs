use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use ouroboros::self_referencing;
use parking_lot::Mutex;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::window::{Window, WindowId};

use crate::device::{GpuContext, GpuInit, WgpuContext};
use crate::handoff::OwnerWaker;
use crate::render::WgpuLogoBackend;
use crate::widget::{GlWidget, WidgetConfig};

use super::{Compositor, SurfaceAction, WindowSurface};

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "tandem".to_string(),
            initial_size: LogicalSize::new(640.0, 480.0),
        }
    }
}

impl RuntimeConfig {
    /// Initial size in logical pixels.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.initial_size = LogicalSize::new(width, height);
        self
    }
}

/// Entry point: one window hosting one `GlWidget`.
pub struct Runtime;

impl Runtime {
    pub fn run(config: RuntimeConfig, gpu_init: GpuInit, widget: WidgetConfig) -> Result<()> {
        let event_loop = EventLoop::<Wake>::with_user_event()
            .build()
            .context("failed to create winit EventLoop")?;
        let proxy = event_loop.create_proxy();
        let mut state = AppState::new(config, gpu_init, widget, proxy);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        if let Some(err) = state.failure.take() {
            return Err(err);
        }
        Ok(())
    }
}

/// User event posted by the render thread.
#[derive(Debug, Copy, Clone)]
struct Wake;

/// Wakes the event loop from the render thread.
struct ProxyWaker(Mutex<EventLoopProxy<Wake>>);

impl OwnerWaker for ProxyWaker {
    fn wake(&self) {
        // Fails only once the loop is gone, at which point nobody is listening.
        let _ = self.0.lock().send_event(Wake);
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    surface: WindowSurface<'this>,
}

/// Everything that exists once the window is up.
struct Hosted {
    // Field order is drop order: the widget joins the render thread before the
    // context and the surface go away.
    widget: GlWidget,
    compositor: Compositor,
    context: Arc<WgpuContext>,
    entry: WindowEntry,
}

struct AppState {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    widget_config: WidgetConfig,
    proxy: EventLoopProxy<Wake>,
    instance: wgpu::Instance,

    hosted: Option<Hosted>,
    failure: Option<anyhow::Error>,
}

impl AppState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, widget_config: WidgetConfig, proxy: EventLoopProxy<Wake>) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: gpu_init.backends,
            ..Default::default()
        });
        Self {
            config,
            gpu_init,
            widget_config,
            proxy,
            instance,
            hosted: None,
            failure: None,
        }
    }

    fn host(&mut self, event_loop: &ActiveEventLoop) -> Result<Hosted> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size)
            .with_min_inner_size(LogicalSize::new(
                self.widget_config.min_size.0,
                self.widget_config.min_size.1,
            ));
        let window = event_loop.create_window(attrs).context("failed to create window")?;

        let (instance, gpu_init) = (&self.instance, &self.gpu_init);
        let entry = WindowEntryTryBuilder {
            window,
            surface_builder: |w| WindowSurface::new(instance, w, gpu_init),
        }
        .try_build()?;

        let (device, queue, format, (width, height)) = entry.with_surface(|s| {
            (s.device().clone(), s.queue().clone(), s.format(), s.size())
        });

        let waker = ProxyWaker(Mutex::new(self.proxy.clone()));
        let mut widget = GlWidget::new(self.widget_config.clone(), Arc::new(waker))?;
        let (width, height) = widget.set_size(width, height);

        let compositor = Compositor::new(&device, format);
        let context = Arc::new(WgpuContext::new(thread::current().id(), device, queue, width, height));
        let backend = WgpuLogoBackend::new(Arc::clone(&context));
        widget.initialize_gl(context.clone(), Box::new(backend))?;

        Ok(Hosted {
            widget,
            compositor,
            context,
            entry,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure.get_or_insert(err);
        self.close(event_loop);
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        // Widget first; see `Hosted`.
        self.hosted = None;
        event_loop.exit();
    }
}

impl Hosted {
    fn redraw(&self) -> Result<()> {
        let Self {
            widget,
            compositor,
            context,
            entry,
        } = self;

        let presented = widget.compose_with(|_| {
            entry.with(|fields| -> Result<(), SurfaceAction> {
                let frame = fields.surface.acquire()?;
                let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
                if let Err(err) = compositor.compose(context, &view) {
                    log::error!("composition failed: {err}");
                    return Err(SurfaceAction::SkipFrame);
                }
                fields.window.pre_present_notify();
                frame.present();
                Ok(())
            })
        })?;

        match presented {
            Some(Err(SurfaceAction::Fatal)) => anyhow::bail!("swapchain out of memory"),
            Some(Err(action)) => log::debug!("frame not presented: {action:?}"),
            Some(Ok(())) | None => {}
        }
        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        let (width, height) = self.widget.set_size(size.width, size.height);

        self.widget.on_about_to_resize();
        let resized = self.context.make_current().and_then(|()| {
            let r = self.context.resize_target(width, height);
            self.context.done_current();
            r
        });
        self.entry.with_surface_mut(|s| s.configure(size));
        self.widget.on_resized();

        resized.context("could not resize the offscreen target")
    }
}

impl ApplicationHandler<Wake> for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.hosted.is_some() {
            return;
        }
        match self.host(event_loop) {
            Ok(hosted) => {
                hosted.entry.with_window(|w| w.request_redraw());
                self.hosted = Some(hosted);
            }
            Err(err) => self.fail(event_loop, err.context("failed to set up the window")),
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, _event: Wake) {
        let Some(hosted) = self.hosted.as_ref() else {
            return;
        };
        hosted.widget.process_events();

        if let Some(fatal) = hosted.widget.stats().fatal {
            self.fail(event_loop, anyhow::anyhow!("render thread stopped: {fatal}"));
            return;
        }
        if hosted.widget.take_update_request() {
            hosted.entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(hosted) = self.hosted.as_mut() else {
            return;
        };

        let result = match event {
            WindowEvent::CloseRequested => {
                self.close(event_loop);
                return;
            }
            WindowEvent::Resized(size) => hosted.resize(size).map(|()| {
                hosted.entry.with_window(|w| w.request_redraw());
            }),
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = hosted.entry.with_window(|w| w.inner_size());
                hosted.resize(size)
            }
            WindowEvent::RedrawRequested => hosted.redraw(),
            _ => Ok(()),
        };

        if let Err(err) = result {
            self.fail(event_loop, err);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(hosted) = self.hosted.take() {
            log::info!("closing after {} frames", hosted.widget.stats().frames_drawn);
        }
    }
}
