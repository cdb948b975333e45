use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Log targets of this workspace. `--log-level` applies to these only.
const DRIVER_TARGETS: [&str; 4] = ["tsnd", "tsnd_device", "tsnd_frame", "tsnd_transport"];

/// Everything else (serial port backends, ctrlc) stays quiet unless it warns.
const DEPENDENCY_LEVEL: LevelFilter = LevelFilter::WARN;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    /// Also logs every routed frame.
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    /// Module targets are only useful once the router and transport talk.
    fn shows_targets(self) -> bool {
        matches!(self, LogLevel::Debug | LogLevel::Trace)
    }
}

fn targets(level: LogLevel) -> Targets {
    DRIVER_TARGETS
        .iter()
        .fold(Targets::new().with_default(DEPENDENCY_LEVEL), |filter, target| {
            filter.with_target(*target, level.as_filter())
        })
}

/// Install the stderr subscriber. Device warnings (mode guard rejections,
/// schedule mismatches) surface here, tagged with the thread that raised
/// them so router output can be told apart from the command thread.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(level.shows_targets());
    let filter = targets(level);

    let _ = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(layer.json().with_filter(filter))
            .try_init(),
    };
}
