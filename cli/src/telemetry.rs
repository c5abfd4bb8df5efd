//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins over the `--log-level` flag. Output is compact text by
//! default and JSON lines with `--log-json`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn filter_directive(log_level: &str) -> String {
    format!("{level},spoar_core={level},spoar_cli={level}", level = log_level)
}

pub fn init_telemetry(log_level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .ok();
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}
