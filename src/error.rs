//! Error types and result utilities for stream operations.

use thiserror::Error;

/// Convenience type alias for results that may contain [`StreamError`].
pub type StreamResult<T> = Result<T, StreamError>;

/// Error types that can occur when constructing or consuming streams.
///
/// Ordinary exhaustion of a finite stream is *not* an error: it is reported
/// through the terminal [`Step::Done`](crate::stream::Step) signal. The
/// variants here cover contract violations caught eagerly at construction
/// time, recoverable out-of-range access, and failures surfaced by the
/// background-thread adapter.
#[derive(Error, Debug, PartialEq)]
pub enum StreamError {
    /// Error that occurs when a single-index access walks past the end of a
    /// finite stream.
    ///
    /// `length` is the number of values the stream produced before ending.
    #[error("index {index} out of range for stream of length {length}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of values the stream yielded before terminating.
        length: usize,
    },

    /// Error that occurs when slice bounds are inconsistent.
    #[error("invalid slice bounds: {0}")]
    InvalidSlice(String),

    /// Error that occurs when invalid parameters are provided to a
    /// combinator, such as a zero slice step.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error that occurs when the worker thread behind a background stream
    /// disappears without delivering a terminal result.
    #[error("background stream worker disconnected without a terminal result")]
    WorkerDisconnected,

    /// Failure of an underlying resource (device, socket) wrapped by a
    /// stream adapter, delivered as a terminal payload rather than thrown
    /// mid-step.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl StreamError {
    /// Create an [`StreamError::InvalidParameter`] error.
    pub fn invalid_parameter(details: impl Into<String>) -> Self {
        Self::InvalidParameter(details.into())
    }

    /// Create an [`StreamError::InvalidSlice`] error.
    pub fn invalid_slice(details: impl Into<String>) -> Self {
        Self::InvalidSlice(details.into())
    }
}
