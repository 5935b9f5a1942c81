//! Logging pipeline built on `tokio-tracing` (§1 AMBIENT stack): process-level
//! setup of a [`tracing_subscriber`] registry with a selectable output format
//! (`logfmt` or JSON) and an env-filter, shared by every binary in the
//! workspace (today, just `exec`'s CLI entry point).
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

use observability_deps::tracing::Subscriber;
use std::io;
use thiserror::Error;
use tracing_subscriber::{
    fmt::{format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    EnvFilter, Layer, Registry,
};

#[cfg(feature = "clap")]
pub mod cli;

#[derive(Debug, Error)]
pub enum Error {
    #[error("error setting global tracing subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid log filter directive: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The wire format events are rendered in. `Logfmt` is the default — it's
/// what an operator tailing a worker's stdout reads when diagnosing a failed
/// query (§7 "User-visible behavior").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Logfmt,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Logfmt
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "logfmt" => Ok(Self::Logfmt),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}', expected logfmt|json")),
        }
    }
}

/// Constructs the process' global [`tracing`] subscriber. Mirrors the
/// teacher's `Builder` shape: defaults come from the environment
/// (`RUST_LOG` / an explicit default filter), are overridable by the
/// caller, and `install_global` is a one-shot — calling it twice is a
/// programmer error the second call surfaces via `SetGlobalDefaultError`.
#[derive(Debug)]
pub struct Builder<W = fn() -> io::Stdout> {
    format: LogFormat,
    default_log_filter: String,
    make_writer: W,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            default_log_filter: "info".to_string(),
            make_writer: io::stdout,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<W> Builder<W>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + Clone + 'static,
{
    pub fn with_log_format(self, format: LogFormat) -> Self {
        Self { format, ..self }
    }

    /// Filter directive applied when `RUST_LOG` is unset, e.g.
    /// `"warn,exec=debug"`.
    pub fn with_default_log_filter(self, directive: impl Into<String>) -> Self {
        Self {
            default_log_filter: directive.into(),
            ..self
        }
    }

    pub fn with_writer<W2>(self, make_writer: W2) -> Builder<W2>
    where
        W2: for<'w> MakeWriter<'w> + Send + Sync + Clone + 'static,
    {
        Builder {
            format: self.format,
            default_log_filter: self.default_log_filter,
            make_writer,
        }
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        Ok(EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.default_log_filter))?)
    }

    fn fmt_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let writer = self.make_writer.clone();
        match self.format {
            LogFormat::Logfmt => logfmt::LogFmtLayer::new(writer).boxed(),
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_span_events(FmtSpan::NONE)
                .boxed(),
        }
    }

    /// Build the subscriber without installing it globally, for tests that
    /// want to assert against a captured writer rather than stdout.
    pub fn build(&self) -> Result<impl Subscriber + Send + Sync> {
        let filter = self.env_filter()?;
        Ok(Registry::default().with(filter).with(self.fmt_layer()))
    }

    /// Install the constructed subscriber as the process-wide default.
    /// Returns a guard that, when dropped, does nothing observable — kept
    /// only so call sites read the same as the teacher's `TroggingGuard`
    /// pattern and can later grow drop-time flush behavior without a
    /// signature change.
    pub fn install_global(&self) -> Result<TroggingGuard> {
        let subscriber = self.build()?;
        tracing::subscriber::set_global_default(subscriber)?;
        Ok(TroggingGuard)
    }
}

/// Held for the lifetime of the process' logging setup.
#[derive(Debug)]
pub struct TroggingGuard;

trait LayerExt<S>: Layer<S> + Sized
where
    S: Subscriber,
{
    fn boxed(self) -> Box<dyn Layer<S> + Send + Sync>
    where
        Self: Layer<S> + Send + Sync + 'static,
    {
        Box::new(self)
    }
}

impl<S, L> LayerExt<S> for L
where
    L: Layer<S>,
    S: Subscriber,
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("logfmt".parse::<LogFormat>().unwrap(), LogFormat::Logfmt);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn builder_constructs_a_subscriber_without_installing_it() {
        let builder = Builder::new().with_default_log_filter("debug");
        assert!(builder.build().is_ok());
    }
}
