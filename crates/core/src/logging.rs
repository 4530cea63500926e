//! Logging and observability
//!
//! Structured logging via `tracing-subscriber`, in human-readable text or JSON.
//! All logging output is directed to stderr so that stdout stays reserved for
//! the container's own output (and for `--dry-run` / `--list-aliases`).

use anyhow::Result;
use std::{io, sync::Once};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Default filter when neither `SCUBA_LOG` nor `RUST_LOG` is set
const DEFAULT_FILTER: &str = "warn";

/// Initialize the logging system with an optional format specification
///
/// Can be called multiple times safely; subsequent calls are no-ops.
///
/// ## Arguments
///
/// * `format` - `None` or `"text"` for human-readable output, `"json"` for
///   structured JSON. When `None`, `SCUBA_LOG_FORMAT` is consulted.
///
/// ## Environment Variables
///
/// * `SCUBA_LOG_FORMAT` - "json" for JSON, any other value for text
/// * `SCUBA_LOG` - logging filter directives
/// * `RUST_LOG` - fallback filter directives
///
/// ## Example
///
/// ```rust
/// use scuba_core::logging;
///
/// logging::init(None).expect("Failed to initialize logging");
/// ```
pub fn init(format: Option<&str>) -> Result<()> {
    INIT.call_once(|| {
        let filter = create_env_filter();

        let env_format = std::env::var("SCUBA_LOG_FORMAT").ok();
        let effective_format = format.or(env_format.as_deref()).unwrap_or("text");

        match effective_format {
            "json" => {
                tracing_subscriber::registry()
                    .with(fmt::layer().json().with_target(true).with_writer(io::stderr))
                    .with(filter)
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(fmt::layer().with_target(false).with_writer(io::stderr))
                    .with(filter)
                    .init();
            }
        }

        tracing::debug!("Logging initialized with format: {}", effective_format);
    });

    Ok(())
}

/// Create an EnvFilter based on environment variables
fn create_env_filter() -> EnvFilter {
    if let Ok(scuba_log) = std::env::var("SCUBA_LOG") {
        EnvFilter::try_new(&scuba_log).unwrap_or_else(|_| {
            eprintln!(
                "scuba: invalid SCUBA_LOG specification '{}', using '{}'",
                scuba_log, DEFAULT_FILTER
            );
            EnvFilter::new(DEFAULT_FILTER)
        })
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}
