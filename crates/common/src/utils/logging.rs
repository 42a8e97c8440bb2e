use std::io;
use std::str::FromStr;

use tracing_subscriber::{fmt, EnvFilter};

/// Output shape of the global subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human readable single-line output
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "compact" | "text" | "pretty" => Ok(Self::Compact),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Initialize the global tracing subscriber.
/// - Respects `RUST_LOG` if set, otherwise uses `default_directive` (e.g. `info`)
/// - Writes to stdout for consistent container logging behavior
/// - A second call is a no-op; the first subscriber wins
pub fn init_logging(default_directive: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let builder = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stdout);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
}

/// Compact output, `info` unless `RUST_LOG` says otherwise.
pub fn init_logging_default() {
    init_logging("info,tower_http=info", LogFormat::Compact);
}
