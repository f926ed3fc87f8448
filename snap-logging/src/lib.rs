//! Tracing subscriber setup for the snap binary.
//!
//! Everything is driven by environment variables so that a scheduler (cron,
//! systemd timers) can change verbosity without touching the job config:
//!
//! - `LOG_LEVEL`: default filter when `RUST_LOG` is unset (`info`)
//! - `LOG_OUTPUT`: `console`, `file`, `both` or `none`
//! - `LOG_FORMAT`: `human` or `json`
//! - `LOG_FILE_PATH`: daily-rolled log file (`/tmp/cloudsnap.log`)
//! - `LOG_TAGS`: comma separated `key:value` span field filters

use std::{
    collections::HashMap,
    env,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::{field::Visit, span, subscriber::Interest, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::MakeWriter,
    layer::{Context, Layer},
    prelude::*,
    registry, EnvFilter,
};

const DEFAULT_LOG_FILE: &str = "/tmp/cloudsnap.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    key: String,
    value: String,
}

/// Logging settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub output: LogOutput,
    pub format: LogFormat,
    pub file_path: PathBuf,
    pub tags: Vec<Tag>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let output = match lookup("LOG_OUTPUT").as_deref() {
            Some("file") => LogOutput::File,
            Some("both") => LogOutput::Both,
            Some("none") => LogOutput::None,
            _ => LogOutput::Console,
        };
        let format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Human,
        };

        Self {
            level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            output,
            format,
            file_path: lookup("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            tags: parse_tags(&lookup("LOG_TAGS").unwrap_or_default()),
        }
    }

    /// Same settings with a more verbose level, used by `--debug`.
    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }
}

fn parse_tags(raw: &str) -> Vec<Tag> {
    raw.split(',')
        .filter_map(|s| {
            let mut parts = s.splitn(2, ':');
            let key = parts.next()?.trim().to_string();
            let value = parts.next()?.trim().to_string();
            if key.is_empty() {
                return None;
            }
            Some(Tag { key, value })
        })
        .collect()
}

// --- Tee writer for console + file output ---
struct Tee<A, B> {
    a: A,
    b: B,
}

impl<A, B> Write for Tee<A, B>
where
    A: Write,
    B: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let res_a = self.a.write(buf);
        let res_b = self.b.write(buf);
        res_a.or(res_b)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()
    }
}

#[derive(Clone)]
struct MakeTee<A, B> {
    make_a: A,
    make_b: B,
}

impl<'a, A, B, W1, W2> MakeWriter<'a> for MakeTee<A, B>
where
    A: MakeWriter<'a, Writer = W1>,
    B: MakeWriter<'a, Writer = W2>,
    W1: Write + 'a,
    W2: Write + 'a,
{
    type Writer = Tee<W1, W2>;
    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            a: self.make_a.make_writer(),
            b: self.make_b.make_writer(),
        }
    }
}

// --- Span field filtering ---
struct TagFilterLayer {
    filters: Vec<Tag>,
}

impl<S> Layer<S> for TagFilterLayer
where
    S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = HashMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        span.extensions_mut().insert(fields);
    }

    fn register_callsite(&self, meta: &'static Metadata<'static>) -> Interest {
        // Event decisions depend on the current span, so they cannot be cached.
        if self.filters.is_empty() || meta.is_span() {
            Interest::always()
        } else {
            Interest::sometimes()
        }
    }

    fn enabled(&self, meta: &Metadata<'_>, ctx: Context<'_, S>) -> bool {
        // Spans always exist so their fields can be matched; only events are filtered.
        if self.filters.is_empty() || meta.is_span() {
            return true;
        }

        // Events outside any span are dropped once tags are requested.
        let Some(scope) = ctx.current_span().id().and_then(|id| ctx.span_scope(id)) else {
            return false;
        };

        let mut all_fields = HashMap::new();
        for span_ref in scope {
            if let Some(fields) = span_ref.extensions().get::<HashMap<String, String>>() {
                for (k, v) in fields {
                    all_fields.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }

        self.filters.iter().all(|filter| {
            all_fields
                .get(&filter.key)
                .is_some_and(|value| filter.value == "*" || value.contains(&filter.value))
        })
    }
}

struct FieldVisitor<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

fn build_filter(level: &str) -> EnvFilter {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    ["hyper=warn", "reqwest=warn", "rustls=warn"]
        .iter()
        .filter_map(|d| d.parse().ok())
        .fold(filter, |f, directive| f.add_directive(directive))
}

/// Initializes the global tracing subscriber.
///
/// Returns the appender guard when logging to a file; it must be held until
/// the process exits or buffered lines are lost.
pub fn init_subscriber(settings: &LogSettings) -> Option<WorkerGuard> {
    let subscriber = registry()
        .with(build_filter(&settings.level))
        .with(TagFilterLayer {
            filters: settings.tags.clone(),
        });

    let log_dir = settings
        .file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("/tmp"));
    let log_filename = settings
        .file_path
        .file_name()
        .unwrap_or("cloudsnap.log".as_ref());
    let is_json = settings.format == LogFormat::Json;

    // Console output goes to stderr; stdout is reserved for command output.
    match settings.output {
        LogOutput::Both => {
            let file_appender = tracing_appender::rolling::daily(log_dir, log_filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let fmt_layer = tracing_subscriber::fmt::layer().with_writer(MakeTee {
                make_a: std::io::stderr,
                make_b: non_blocking,
            });
            if is_json {
                subscriber.with(fmt_layer.json()).init();
            } else {
                subscriber.with(fmt_layer.with_ansi(false)).init();
            }
            Some(guard)
        }
        LogOutput::Console => {
            let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if is_json {
                subscriber.with(fmt_layer.json()).init();
            } else {
                subscriber.with(fmt_layer).init();
            }
            None
        }
        LogOutput::File => {
            let file_appender = tracing_appender::rolling::daily(log_dir, log_filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            if is_json {
                subscriber.with(fmt_layer.json()).init();
            } else {
                subscriber.with(fmt_layer).init();
            }
            Some(guard)
        }
        LogOutput::None => {
            subscriber.init();
            None
        }
    }
}
