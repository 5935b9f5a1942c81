//! `clap`-derived logging flags, shared by `exec`'s CLI entry point (§6
//! "CLI tools" are out of scope as *functionality*, but the process still
//! needs `--log-format`/`--log-filter` flags to configure the ambient
//! logging stack described in §1 AMBIENT).
use crate::{Builder, LogFormat, Result, TroggingGuard};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
pub struct LoggingConfig {
    /// Logging format: `logfmt` or `json`.
    #[clap(long = "log-format", env = "LOG_FORMAT", default_value = "logfmt")]
    pub log_format: LogFormat,

    /// Filter directive applied when `RUST_LOG` is unset.
    #[clap(long = "log-filter", env = "LOG_FILTER", default_value = "info")]
    pub log_filter: String,
}

impl LoggingConfig {
    pub fn install_global(&self) -> Result<TroggingGuard> {
        Builder::new()
            .with_log_format(self.log_format)
            .with_default_log_filter(self.log_filter.clone())
            .install_global()
    }
}
