use bytes::{BufMut, Bytes, BytesMut};

/// Size of the fixed RTP header preceding every payload.
pub const RTP_HEADER_LEN: usize = 12;

/// One media packet decoded from the RTP stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 7-bit RTP payload type
    pub payload_type: u8,
    /// Marker bit
    pub marker: bool,
    /// 16-bit RTP sequence number
    pub sequence_number: u16,
    /// 32-bit media timestamp
    pub timestamp: u32,
    /// Media payload following the fixed header
    pub payload: Bytes,
}

impl Frame {
    /// Creates a frame. Only the low seven bits of `payload_type` are kept.
    pub fn new(
        payload_type: u8,
        marker: bool,
        sequence_number: u16,
        timestamp: u32,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            payload_type: payload_type & 0x7f,
            marker,
            sequence_number,
            timestamp,
            payload: payload.into(),
        }
    }

    /// A frame with an empty payload marks the end of the stream.
    pub fn is_end_of_stream(&self) -> bool {
        self.payload.is_empty()
    }

    /// Serializes the frame as an RTP version 2 packet with no padding,
    /// extension or CSRC list.
    pub fn to_bytes(&self, ssrc: u32) -> Bytes {
        let mut buf = BytesMut::with_capacity(RTP_HEADER_LEN + self.payload.len());
        buf.put_u8(0x80);
        buf.put_u8(((self.marker as u8) << 7) | (self.payload_type & 0x7f));
        buf.put_u16(self.sequence_number);
        buf.put_u32(self.timestamp);
        buf.put_u32(ssrc);
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}
