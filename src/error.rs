use crate::format::rtsp::{Method, SessionState};
use thiserror::Error;

/// Errors surfaced by RTSP control operations.
#[derive(Error, Debug)]
pub enum RtspError {
    /// The control connection or the datagram channel could not be
    /// established, or the client has already been closed.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server sent something that is not a well-formed response.
    #[error("protocol format error: {0}")]
    ProtocolFormat(String),

    /// The operation is not valid in the current session state.
    #[error("cannot {method} in state {state}")]
    Sequence {
        /// Rejected operation
        method: Method,
        /// State the session was in
        state: SessionState,
    },

    /// Well-formed response carrying a status code other than 200.
    #[error("server rejected request: {code} {message}")]
    ServerRejected {
        /// Status code from the status line
        code: i32,
        /// Reason phrase from the status line
        message: String,
    },

    /// The control stream closed before a complete response was read.
    #[error("stream ended before a response was received")]
    StreamEnded,

    /// Transport failure while exchanging a request.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for control operations.
pub type Result<T> = std::result::Result<T, RtspError>;
