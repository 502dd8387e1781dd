//! Handler types and the per-invocation context handed to them.

use std::sync::Arc;

use tracklink_types::{resolve_index, HostControl, Value};

/// Result of running an action handler.
pub type HandlerResult = Result<(), HandlerError>;

/// A registered action body. Shared, never mutated after registration.
pub type Handler = Arc<dyn Fn(&mut ActionContext<'_>) -> HandlerResult + Send + Sync>;

/// Failure raised inside a handler body. Contained by the dispatcher.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HandlerError {
    #[error("missing argument {0}")]
    MissingArgument(usize),
    #[error("argument {index} is not a {expected}")]
    WrongType { index: usize, expected: &'static str },
    #[error("argument {index} is not a finite number")]
    NotFinite { index: usize },
    #[error("{what} index {index} out of range (have {count})")]
    IndexOutOfRange {
        what: &'static str,
        index: i64,
        count: usize,
    },
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Everything a handler may see: the host, validated arguments, and any
/// indices extracted from `XXX` placeholder segments of the pattern.
pub struct ActionContext<'a> {
    pub host: &'a mut dyn HostControl,
    pub args: &'a [Value],
    pub indices: &'a [i64],
}

impl<'a> ActionContext<'a> {
    fn arg(&self, index: usize) -> Result<&'a Value, HandlerError> {
        let args: &'a [Value] = self.args;
        args.get(index).ok_or(HandlerError::MissingArgument(index))
    }

    /// Finite numeric argument at `index`.
    pub fn number(&self, index: usize) -> Result<f64, HandlerError> {
        let n = self.arg(index)?.as_number().ok_or(HandlerError::WrongType {
            index,
            expected: "number",
        })?;
        if n.is_finite() {
            Ok(n)
        } else {
            Err(HandlerError::NotFinite { index })
        }
    }

    /// Numeric argument rounded and clamped into `[min, max]`.
    pub fn clamped_u8(&self, index: usize, min: u8, max: u8) -> Result<u8, HandlerError> {
        Ok(self.number(index)?.round().clamp(min as f64, max as f64) as u8)
    }

    pub fn string(&self, index: usize) -> Result<&'a str, HandlerError> {
        self.arg(index)?.as_str().ok_or(HandlerError::WrongType {
            index,
            expected: "string",
        })
    }

    pub fn boolean(&self, index: usize) -> Result<bool, HandlerError> {
        self.arg(index)?.as_bool().ok_or(HandlerError::WrongType {
            index,
            expected: "boolean",
        })
    }

    /// Track addressed by the first placeholder index (`-1` = selected).
    pub fn placeholder_track(&self) -> Result<usize, HandlerError> {
        let raw = self.indices.first().copied().unwrap_or(-1);
        self.track(raw)
    }

    /// Resolve a remote 1-based track index against the host.
    pub fn track(&self, raw: i64) -> Result<usize, HandlerError> {
        let count = self.host.track_count();
        resolve_index(raw, count, self.host.selected_track()).ok_or(
            HandlerError::IndexOutOfRange {
                what: "track",
                index: raw,
                count,
            },
        )
    }

    /// Resolve a remote 1-based instrument index against the host.
    pub fn instrument(&self, raw: i64) -> Result<usize, HandlerError> {
        let count = self.host.instrument_count();
        resolve_index(raw, count, self.host.selected_instrument()).ok_or(
            HandlerError::IndexOutOfRange {
                what: "instrument",
                index: raw,
                count,
            },
        )
    }
}
