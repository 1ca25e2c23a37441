use std::time::Duration;

use anyhow::{ensure, Result};
use clap::Parser;

use tandem_engine::device::GpuInit;
use tandem_engine::logging::{init_logging, LoggingConfig};
use tandem_engine::render::RenderSettings;
use tandem_engine::widget::{HeadlessHarness, WidgetConfig};
use tandem_engine::window::{Runtime, RuntimeConfig};

/// Rotating logo drawn on a render thread that borrows the window's GPU context.
#[derive(Debug, Parser)]
#[command(name = "tandem-studio", version)]
struct Args {
    /// Run without a window for a fixed number of frames.
    #[arg(long)]
    headless: bool,

    /// Frames to draw in headless mode.
    #[arg(long, default_value_t = 120)]
    frames: usize,

    /// Simulated vsync interval in headless mode, in milliseconds.
    #[arg(long, default_value_t = 16)]
    vsync_ms: u64,

    /// Log filter, RUST_LOG syntax. Falls back to RUST_LOG, then `info`.
    #[arg(long)]
    log: Option<String>,

    /// Degrees of rotation per drawn frame.
    #[arg(long, default_value_t = 1.0)]
    step: f32,

    /// Angular sectors of the logo ring.
    #[arg(long, default_value_t = 100)]
    sectors: usize,

    /// Delay before a resize takes the render lock, in milliseconds.
    #[arg(long, default_value_t = 10)]
    resize_settle_ms: u64,

    #[arg(long, default_value_t = 640.0)]
    width: f64,

    #[arg(long, default_value_t = 480.0)]
    height: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(LoggingConfig {
        env_filter: args.log.clone(),
        ..LoggingConfig::default()
    });

    ensure!(args.sectors >= 3, "--sectors must be at least 3");

    let widget = WidgetConfig {
        render: RenderSettings {
            rotation_step: args.step,
            sectors: args.sectors,
            ..RenderSettings::default()
        },
        resize_settle: Duration::from_millis(args.resize_settle_ms),
        ..WidgetConfig::default()
    };

    if args.headless {
        return run_headless(widget, args.frames, Duration::from_millis(args.vsync_ms));
    }

    Runtime::run(
        RuntimeConfig::default().with_size(args.width, args.height),
        GpuInit::default(),
        widget,
    )
}

fn run_headless(widget: WidgetConfig, frames: usize, vsync: Duration) -> Result<()> {
    let mut harness = HeadlessHarness::new(widget, vsync)?;
    harness.run_cycles(frames, Duration::from_secs(5))?;
    let report = harness.finish();

    log::info!(
        "{} frames in {:.2?}, angle {:.1}, {} context transfers, {} violations",
        report.stats.frames_drawn,
        report.elapsed,
        report.stats.angle,
        report.transfers,
        report.violations
    );
    ensure!(report.violations == 0, "context affinity was violated");
    Ok(())
}
