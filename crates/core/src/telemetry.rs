use std::sync::OnceLock;

use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _};

static TELEMETRY_INIT: OnceLock<()> = OnceLock::new();

// transport crates are chatty at debug level
const QUIET_DEPENDENCIES: &str = "h2=warn,hyper=warn,hyper_util=warn,reqwest=warn";

pub fn get_subscriber() -> impl Subscriber + Send + Sync {
    // RUST_LOG wins, info otherwise
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::builder().parse_lossy(format!("{directives},{QUIET_DEPENDENCIES}"));

    let fmt_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::Registry::default()
        .with(filter)
        .with(fmt_layer)
}

/// Installs `subscriber` as the global default. Later calls are no-ops.
pub fn init_subscriber(
    subscriber: impl Subscriber + Send + Sync,
) -> Result<(), SetGlobalDefaultError> {
    if TELEMETRY_INIT.set(()).is_err() {
        return Ok(());
    }
    tracing::subscriber::set_global_default(subscriber)
}
