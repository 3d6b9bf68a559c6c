use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::infrastructure::config::LogFormat;

static TELEMETRY: OnceLock<()> = OnceLock::new();

pub fn init(format: LogFormat) {
    TELEMETRY.get_or_init(|| {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(env_filter);
        match format {
            LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
            LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
        }
    });
}
