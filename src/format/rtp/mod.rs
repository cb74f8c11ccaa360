//! # RTP packet decoding
//!
//! Turns a received datagram into an [`Frame`]. Only the fields the session
//! layer needs are decoded; the first header byte (version, padding,
//! extension, CSRC count) and the SSRC are skipped, since the stream is
//! assumed to be single-source without header extensions.
//!
//! ```rust
//! use rtspio::format::rtp::parse_rtp_packet;
//!
//! let data = [
//!     0x80, 0x61, 0x00, 0x05, // V=2, M=0, PT=97, seq=5
//!     0x00, 0x00, 0x03, 0xE8, // timestamp=1000
//!     0x00, 0x00, 0x00, 0x00, // SSRC
//!     0xAA, 0xBB,             // payload
//! ];
//! let frame = parse_rtp_packet(&data).unwrap();
//! assert_eq!(frame.payload_type, 97);
//! assert_eq!(frame.sequence_number, 5);
//! assert_eq!(frame.timestamp, 1000);
//! assert_eq!(&frame.payload[..], &[0xAA, 0xBB]);
//! ```

use crate::av::{Frame, RTP_HEADER_LEN};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while decoding an RTP datagram
#[derive(Debug, Error, PartialEq)]
pub enum RTPError {
    /// The datagram cannot hold the fixed 12-byte header
    #[error("RTP packet too short: {0} bytes")]
    PacketTooShort(usize),
}

/// Specialized Result type for RTP operations
pub type Result<T> = std::result::Result<T, RTPError>;

/// Decodes the fixed RTP header and copies out the payload.
///
/// # Errors
///
/// Returns [`RTPError::PacketTooShort`] if `data` is shorter than 12 bytes.
/// Callers treat this as a droppable packet, not a transport failure.
pub fn parse_rtp_packet(data: &[u8]) -> Result<Frame> {
    if data.len() < RTP_HEADER_LEN {
        return Err(RTPError::PacketTooShort(data.len()));
    }

    let second_byte = data[1];
    let marker = (second_byte & 0x80) != 0;
    let payload_type = second_byte & 0x7f;

    let sequence_number = u16::from_be_bytes([data[2], data[3]]);
    let timestamp = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);

    Ok(Frame {
        payload_type,
        marker,
        sequence_number,
        timestamp,
        payload: Bytes::copy_from_slice(&data[RTP_HEADER_LEN..]),
    })
}
