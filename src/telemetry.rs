//! Stderr logging via `tracing`.
//!
//! Stdout is reserved for Argos markup, so the fmt layer always writes to stderr.
//! Filter precedence: `ARGOS_MENUS_LOG` (EnvFilter syntax), then `debug` when
//! `--debug` is given, then `warn`.

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::color::color_enabled_stderr;

pub const LOG_ENV: &str = "ARGOS_MENUS_LOG";

static INIT: OnceCell<()> = OnceCell::new();

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "argos_menus=debug"
    } else {
        "warn"
    }
}

/// Install the global subscriber once; later calls are no-ops.
pub fn init_logging(debug: bool) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(color_enabled_stderr())
                    .with_target(false),
            )
            .try_init()
            .ok();
    });
}
