//! Error types for form decoding and field access.

use std::io;

use thiserror::Error;

/// Errors raised while decoding a form or reading from the decoded tree.
///
/// Malformed-but-tolerable input (missing `=`, missing boundary, missing
/// `name`) never produces one of these; it is dropped or degraded during
/// decoding. A truncated stream is not an error either, see
/// [`Done::Eof`](crate::Done::Eof).
#[derive(Debug, Error)]
pub enum FormError {
    /// No field carries the requested name.
    #[error("field not found: {0}")]
    KeyNotFound(String),
    /// A single value was requested but several fields share the name.
    #[error("expected a single value for {name:?}, found {count}")]
    MultipleValues {
        /// The requested field name.
        name: String,
        /// How many fields carry it.
        count: usize,
    },
    /// Name-based access on a part that holds no child list.
    #[error("part is not indexable: it holds no child fields")]
    NotIndexable,
    /// One part's body exceeds the configured limit.
    #[error("part too large: {size} bytes exceeds limit of {max}")]
    PartTooLarge { size: usize, max: usize },
    /// The request as a whole exceeds the configured limit.
    #[error("total upload too large: {size} bytes exceeds limit of {max}")]
    TotalTooLarge { size: usize, max: usize },
    /// More fields than the configured limit.
    #[error("too many fields: {count} exceeds limit of {max}")]
    TooManyFields { count: usize, max: usize },
    /// Multipart parts nested deeper than the configured limit.
    #[error("multipart nesting too deep: depth {depth} exceeds limit of {max}")]
    TooDeep { depth: usize, max: usize },
    /// Reading the request stream or a part buffer failed.
    #[error("form I/O error: {0}")]
    Io(#[source] io::Error),
}

/// A size limit tripped inside a byte sink.
///
/// Sinks only speak `io::Error`, so limit violations are smuggled out as
/// the payload of one and recovered by `From<io::Error> for FormError`.
#[derive(Debug, Clone, Copy, Error)]
pub(crate) enum LimitExceeded {
    #[error("part too large: {size} bytes exceeds limit of {max}")]
    Part { size: usize, max: usize },
    #[error("total upload too large: {size} bytes exceeds limit of {max}")]
    Total { size: usize, max: usize },
}

impl LimitExceeded {
    pub(crate) fn into_io(self) -> io::Error {
        io::Error::other(self)
    }
}

impl From<LimitExceeded> for FormError {
    fn from(limit: LimitExceeded) -> Self {
        match limit {
            LimitExceeded::Part { size, max } => Self::PartTooLarge { size, max },
            LimitExceeded::Total { size, max } => Self::TotalTooLarge { size, max },
        }
    }
}

impl From<io::Error> for FormError {
    fn from(err: io::Error) -> Self {
        let limit = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<LimitExceeded>())
            .copied();
        match limit {
            Some(limit) => limit.into(),
            None => Self::Io(err),
        }
    }
}
