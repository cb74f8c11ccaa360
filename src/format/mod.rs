pub mod rtp;
pub mod rtsp;

pub use self::rtp::{parse_rtp_packet, RTPError};
pub use self::rtsp::{RTSPClient, RTSPResponse, SessionState};
