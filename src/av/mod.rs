use async_trait::async_trait;

/// Consumer of decoded media frames.
///
/// Methods are invoked from the packet receiver task, never from the task
/// issuing control commands, so implementations must be `Send + Sync`.
#[async_trait]
pub trait SessionHandler: Send + Sync {
    /// Called once for every decoded frame, in arrival order.
    async fn process_received_frame(&self, frame: Frame);

    /// Called once when the server signals the end of the stream.
    ///
    /// `sequence_number` is the CSeq of the most recent control request.
    async fn video_ended(&self, sequence_number: u32);
}

mod frame;
pub use frame::*;
