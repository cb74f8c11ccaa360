//! # RTSP session control
//!
//! [`RTSPClient`] negotiates a single media resource over an RTSP control
//! connection and, while the session is playing, runs a background task that
//! receives RTP datagrams on a dedicated UDP socket and forwards decoded
//! frames to a [`SessionHandler`](crate::av::SessionHandler).
//!
//! ```text
//!          SETUP           PLAY
//!   INIT ---------> READY ------> PLAYING
//!    ^               |  ^           |
//!    |   TEARDOWN    |  |  PAUSE /  |
//!    +---------------+  +-----------+
//!    ^                   end of stream
//!    |        TEARDOWN              |
//!    +------------------------------+
//! ```

mod client;
mod connection;
mod receiver;
mod request;
mod response;
mod state;

pub use client::{RTSPClient, DEFAULT_RTSP_PORT};
pub use connection::RTSPConnection;
pub use receiver::{CancelFlag, PacketReceiver, ReceiverHandle, ReceiverStats};
pub use request::{RTSPRequest, RTSP_VERSION};
pub use response::{read_response, RTSPResponse, STATUS_OK};
pub use state::{transition, Method, SessionState, TRANSITIONS};
