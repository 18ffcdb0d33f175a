use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "vpt_engine=debug,wgpu_core=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

/// Used when neither the config nor `RUST_LOG` set a filter. The wgpu stack
/// is very chatty at `info`.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

static INIT: Once = Once::new();

/// Initializes the global logger once; later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        let filter = config
            .env_filter
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        builder.parse_filters(&filter);
        builder.write_style(config.write_style);
        builder.init();

        log::debug!("logging initialized ({filter})");
    });
}
