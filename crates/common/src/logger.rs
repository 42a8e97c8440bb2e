//! Structured logger handle
//!
//! `Logger` is a cheap, cloneable handle around a `tracing` span tagged with
//! the owning service's name. Components receive a clone at construction and
//! log through it, so every event carries `service=<name>`.

use std::fmt::{self, Display};
use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn, Span};

use crate::utils::logging::{init_logging, LogFormat};

/// Options for [`Logger::new`].
#[derive(Clone, Debug)]
pub struct LoggerOptions {
    pub name: String,
    /// Default filter directive when `RUST_LOG` is unset, e.g. `info`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self { name: String::new(), level: "info".into(), format: LogFormat::Json }
    }
}

/// Caller-supplied context fields, rendered as `key=value` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fields(Vec<(&'static str, String)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, value: impl Display) -> Self {
        self.0.push((key, value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }
}

impl Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Logger {
    name: Arc<str>,
    span: Span,
}

impl Logger {
    /// Install the global subscriber (first call wins) and return a handle.
    pub fn new(opts: &LoggerOptions) -> Self {
        init_logging(&opts.level, opts.format);
        Self::named(&opts.name)
    }

    /// A handle for `name` that relies on whatever subscriber is installed.
    pub fn named(name: &str) -> Self {
        let span = info_span!("service", service = %name);
        Self { name: Arc::from(name), span }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn debug(&self, message: &str) {
        self.span.in_scope(|| debug!("{message}"));
    }

    pub fn debug_with(&self, message: &str, fields: &Fields) {
        self.span.in_scope(|| debug!(context = %fields, "{message}"));
    }

    pub fn info(&self, message: &str) {
        self.span.in_scope(|| info!("{message}"));
    }

    pub fn info_with(&self, message: &str, fields: &Fields) {
        self.span.in_scope(|| info!(context = %fields, "{message}"));
    }

    pub fn warn(&self, message: &str) {
        self.span.in_scope(|| warn!("{message}"));
    }

    pub fn warn_with(&self, message: &str, fields: &Fields) {
        self.span.in_scope(|| warn!(context = %fields, "{message}"));
    }

    pub fn error(&self, message: &str) {
        self.span.in_scope(|| error!("{message}"));
    }

    pub fn error_with<E: Display + ?Sized>(&self, message: &str, err: &E) {
        self.span.in_scope(|| error!(error = %err, "{message}"));
    }
}
