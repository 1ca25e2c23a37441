use std::io::Write;
use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "tandem_engine::handoff=trace,wgpu=warn").
///
/// `write_style` controls ANSI coloring behavior.
///
/// `thread_names` prefixes every record with the emitting thread's name, which
/// is what makes owner/render interleavings readable.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    pub thread_names: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            thread_names: true,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Idempotent; later calls are ignored. Uses `try_init` so a logger installed
/// by a test harness does not cause a panic.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter.as_deref() {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            // wgpu is chatty at info.
            builder.filter_level(log::LevelFilter::Info);
            builder.filter_module("wgpu_core", log::LevelFilter::Warn);
            builder.filter_module("wgpu_hal", log::LevelFilter::Warn);
        }

        builder.write_style(config.write_style);

        if config.thread_names {
            builder.format(|buf, record| {
                let thread = std::thread::current();
                let name = thread.name().unwrap_or("<unnamed>");
                let level_style = buf.default_level_style(record.level());
                writeln!(
                    buf,
                    "[{} {level_style}{:<5}{level_style:#} {} {}] {}",
                    buf.timestamp_millis(),
                    record.level(),
                    name,
                    record.target(),
                    record.args()
                )
            });
        }

        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}
