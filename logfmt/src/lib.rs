//! A `tracing_subscriber` layer that writes events in
//! [logfmt](https://brandur.org/logfmt) (`key=value key2=value2`) form, the
//! format operators read off the coordinator/worker logs when diagnosing a
//! failed query.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

use observability_deps::tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use std::{
    fmt::{self, Write as _},
    io::Write as _,
};
use tracing_subscriber::{layer::Context, Layer};

/// A [`Layer`] that formats each event as a single logfmt line and writes it
/// to the given writer (normally `std::io::stdout()`).
#[derive(Debug)]
pub struct LogFmtLayer<W> {
    writer: W,
}

impl<W> LogFmtLayer<W>
where
    W: for<'w> MakeWriterRef<'w>,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

/// A factory for a `std::io::Write` borrowed for the duration of one event.
/// Kept as its own trait (rather than requiring `io::Write` directly) so the
/// layer can be used with `fn() -> Stdout`-style makers as well as a fixed
/// `Arc<Mutex<Vec<u8>>>` in tests.
pub trait MakeWriterRef<'a> {
    type Writer: std::io::Write;
    fn make_writer(&'a self) -> Self::Writer;
}

impl<'a, F, W> MakeWriterRef<'a> for F
where
    F: Fn() -> W,
    W: std::io::Write,
{
    type Writer = W;
    fn make_writer(&'a self) -> W {
        (self)()
    }
}

impl<S, W> Layer<S> for LogFmtLayer<W>
where
    S: Subscriber,
    W: for<'w> MakeWriterRef<'w> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut line = String::new();
        let meta = event.metadata();

        write_kv(&mut line, "level", level_str(*meta.level()));
        write_kv(&mut line, "target", meta.target());

        let mut visitor = LogFmtVisitor { out: &mut line };
        event.record(&mut visitor);

        line.push('\n');
        let mut writer = self.writer.make_writer();
        let _ = writer.write_all(line.as_bytes());
    }
}

fn level_str(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

fn write_kv(out: &mut String, key: &str, value: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    let _ = write!(out, "{key}=");
    write_value(out, value);
}

/// Quote the value if it contains a space or an equals sign, escaping
/// embedded quotes; otherwise emit it bare.
fn write_value(out: &mut String, value: &str) {
    if value.contains(' ') || value.contains('=') || value.contains('"') {
        out.push('"');
        for c in value.chars() {
            if c == '"' || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('"');
    } else {
        out.push_str(value);
    }
}

struct LogFmtVisitor<'a> {
    out: &'a mut String,
}

impl<'a> Visit for LogFmtVisitor<'a> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        write_kv(self.out, field.name(), &rendered);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        write_kv(self.out, field.name(), value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        write_kv(self.out, field.name(), &value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        write_kv(self.out, field.name(), &value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        write_kv(self.out, field.name(), &value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_values_are_not_quoted() {
        let mut out = String::new();
        write_kv(&mut out, "attr", "v");
        assert_eq!(out, "attr=v");
    }

    #[test]
    fn values_with_spaces_are_quoted() {
        let mut out = String::new();
        write_kv(&mut out, "msg", "chunk not pinned");
        assert_eq!(out, r#"msg="chunk not pinned""#);
    }

    #[test]
    fn embedded_quotes_are_escaped() {
        let mut out = String::new();
        write_kv(&mut out, "msg", r#"said "hi""#);
        assert_eq!(out, r#"msg="said \"hi\"""#);
    }
}
