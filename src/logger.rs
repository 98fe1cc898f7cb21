//! Log record emission.
//!
//! The middleware hands every finished record to an [`AccessLogger`]. The
//! default, [`TracingLogger`], forwards to the process-global `tracing`
//! dispatcher; hosts with their own log pipeline inject a different
//! implementation at configuration time.

use std::fmt;

use tracing::Level;

use crate::types::{Attr, AttrValue};

/// Sink for finished access log records.
///
/// Logging is best-effort: implementations report nothing back and the
/// middleware never retries. Each record is delivered at most once.
pub trait AccessLogger: Send + Sync {
    /// Emits one record: a message key plus the ordered attribute list.
    fn log(&self, level: Level, message: &str, attrs: &[Attr]);
}

/// Default [`AccessLogger`] backed by the global `tracing` dispatcher.
///
/// `tracing` events carry statically-named fields, so the dynamic attribute
/// list is rendered in order into a single `attrs` field (see [`Attrs`]).
/// Emit under target `access`; subscribers can filter on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl AccessLogger for TracingLogger {
    fn log(&self, level: Level, message: &str, attrs: &[Attr]) {
        let attrs = Attrs(attrs);
        if level == Level::ERROR {
            tracing::error!(target: "access", attrs = %attrs, "{message}");
        } else if level == Level::WARN {
            tracing::warn!(target: "access", attrs = %attrs, "{message}");
        } else if level == Level::INFO {
            tracing::info!(target: "access", attrs = %attrs, "{message}");
        } else if level == Level::DEBUG {
            tracing::debug!(target: "access", attrs = %attrs, "{message}");
        } else {
            tracing::trace!(target: "access", attrs = %attrs, "{message}");
        }
    }
}

/// Renders an attribute list as `name=value` pairs in insertion order.
///
/// String values are quoted only when they contain whitespace, `"` or `=`;
/// empty values render as a bare `name=`.
pub struct Attrs<'a>(pub &'a [Attr]);

impl fmt::Display for Attrs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attr) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}=", attr.name)?;
            match &attr.value {
                AttrValue::Str(s) if needs_quoting(s) => write!(f, "{s:?}")?,
                value => write!(f, "{value}")?,
            }
        }
        Ok(())
    }
}

fn needs_quoting(s: &str) -> bool {
    s.chars().any(|c| c.is_whitespace() || c == '"' || c == '=')
}
