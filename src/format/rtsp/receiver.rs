use crate::av::{Frame, SessionHandler};
use crate::format::rtp::parse_rtp_packet;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Cooperative stop signal shared between the client and its receiver.
///
/// The flag is authoritative. The notify only wakes a receive that is
/// currently waiting; without it the receive timeout bounds how long a stop
/// takes to be observed.
#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    /// Creates a flag in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag and wakes a waiting receive.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn cancelled(&self) {
        self.notify.notified().await
    }
}

/// Counters for one streaming session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiverStats {
    /// Frames delivered to the handler
    pub frames_received: u64,
    /// Payload bytes delivered to the handler
    pub bytes_received: u64,
    /// Datagrams too short to decode
    pub packets_dropped: u64,
    /// Receives that hit the idle timeout
    pub timeouts: u64,
    /// Sequence numbers skipped between delivered frames
    pub packets_lost: u32,
    /// Sequence number of the last delivered frame
    pub last_sequence: Option<u16>,
}

impl ReceiverStats {
    /// Accounts for one delivered frame.
    ///
    /// Gaps are counted with `u16` wrap-around. A frame at or behind the last
    /// sequence number (a late or duplicated packet) adds no loss.
    pub fn record_frame(&mut self, frame: &Frame) {
        self.frames_received += 1;
        self.bytes_received += frame.payload.len() as u64;

        match self.last_sequence {
            Some(last) => {
                let gap = frame.sequence_number.wrapping_sub(last.wrapping_add(1));
                if gap < 0x8000 {
                    self.packets_lost += gap as u32;
                    self.last_sequence = Some(frame.sequence_number);
                }
            }
            None => self.last_sequence = Some(frame.sequence_number),
        }
    }
}

/// Receives RTP datagrams and hands decoded frames to a [`SessionHandler`].
///
/// Everything the loop touches is passed in explicitly; the receiver never
/// owns the socket's lifecycle.
pub struct PacketReceiver {
    socket: Arc<UdpSocket>,
    handler: Arc<dyn SessionHandler>,
    cancel: Arc<CancelFlag>,
    cseq: Arc<AtomicU32>,
    stats: Arc<Mutex<ReceiverStats>>,
    ended: Arc<AtomicBool>,
    receive_timeout: Duration,
    buffer_size: usize,
}

impl PacketReceiver {
    /// Binds a receiver to the shared socket, handler, stop flag, CSeq
    /// counter and statistics. Nothing runs until [`spawn`](Self::spawn).
    pub fn new(
        socket: Arc<UdpSocket>,
        handler: Arc<dyn SessionHandler>,
        cancel: Arc<CancelFlag>,
        cseq: Arc<AtomicU32>,
        stats: Arc<Mutex<ReceiverStats>>,
        receive_timeout: Duration,
        buffer_size: usize,
    ) -> Self {
        Self {
            socket,
            handler,
            cancel,
            cseq,
            stats,
            ended: Arc::new(AtomicBool::new(false)),
            receive_timeout,
            buffer_size,
        }
    }

    /// Starts the receive loop on its own task.
    pub fn spawn(self) -> ReceiverHandle {
        let cancel = self.cancel.clone();
        let ended = self.ended.clone();
        let task = tokio::spawn(self.run());
        ReceiverHandle { cancel, ended, task }
    }

    /// Runs until cancelled, until the end-of-stream frame arrives, or until
    /// the socket fails.
    pub async fn run(self) {
        let mut buffer = vec![0u8; self.buffer_size];
        debug!("RTP receiver started (timeout {:?})", self.receive_timeout);

        loop {
            if self.cancel.is_cancelled() {
                debug!("RTP receiver cancelled");
                break;
            }

            let received = tokio::select! {
                _ = self.cancel.cancelled() => continue,
                result = timeout(self.receive_timeout, self.socket.recv_from(&mut buffer)) => result,
            };

            let len = match received {
                Err(_) => {
                    self.stats.lock().timeouts += 1;
                    continue;
                }
                Ok(Err(e)) => {
                    warn!("RTP receive failed, stopping receiver: {}", e);
                    break;
                }
                Ok(Ok((len, _addr))) => len,
            };

            let frame = match parse_rtp_packet(&buffer[..len]) {
                Ok(frame) => frame,
                Err(e) => {
                    debug!("Dropping datagram: {}", e);
                    self.stats.lock().packets_dropped += 1;
                    continue;
                }
            };

            if frame.is_end_of_stream() {
                info!("End of stream at RTP sequence {}", frame.sequence_number);
                self.ended.store(true, Ordering::SeqCst);
                self.handler
                    .video_ended(self.cseq.load(Ordering::SeqCst))
                    .await;
                break;
            }

            self.stats.lock().record_frame(&frame);
            self.handler.process_received_frame(frame).await;
        }
    }
}

/// Owner-side handle to a running [`PacketReceiver`].
#[derive(Debug)]
pub struct ReceiverHandle {
    cancel: Arc<CancelFlag>,
    ended: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ReceiverHandle {
    /// Requests cancellation without waiting for the loop to exit.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the loop stopped because the stream ended.
    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Whether the task has exited, for any reason.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels the loop and waits for the task to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("RTP receiver task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::Frame;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    #[derive(Debug, PartialEq)]
    enum Event {
        Frame(Frame),
        Ended(u32),
    }

    struct ChannelHandler(mpsc::UnboundedSender<Event>);

    #[async_trait]
    impl SessionHandler for ChannelHandler {
        async fn process_received_frame(&self, frame: Frame) {
            let _ = self.0.send(Event::Frame(frame));
        }

        async fn video_ended(&self, sequence_number: u32) {
            let _ = self.0.send(Event::Ended(sequence_number));
        }
    }

    async fn start(
        receive_timeout: Duration,
    ) -> (
        ReceiverHandle,
        UdpSocket,
        mpsc::UnboundedReceiver<Event>,
        Arc<Mutex<ReceiverStats>>,
    ) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        server.connect(socket.local_addr().unwrap()).await.unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(Mutex::new(ReceiverStats::default()));
        let handle = PacketReceiver::new(
            Arc::new(socket),
            Arc::new(ChannelHandler(tx)),
            Arc::new(CancelFlag::new()),
            Arc::new(AtomicU32::new(7)),
            stats.clone(),
            receive_timeout,
            0x10000,
        )
        .spawn();
        (handle, server, rx, stats)
    }

    #[tokio::test]
    async fn test_frames_then_end_of_stream() {
        let (handle, server, mut rx, stats) = start(Duration::from_secs(2)).await;

        let first = Frame::new(26, false, 1, 100, vec![1, 2, 3]);
        let second = Frame::new(26, true, 2, 200, vec![4]);
        server.send(&first.to_bytes(1)).await.unwrap();
        server.send(&[0x80, 0x1a]).await.unwrap();
        server.send(&second.to_bytes(1)).await.unwrap();
        server
            .send(&Frame::new(26, false, 3, 300, Vec::new()).to_bytes(1))
            .await
            .unwrap();
        let _ = server.send(&Frame::new(26, false, 4, 400, vec![9]).to_bytes(1)).await;

        assert_eq!(rx.recv().await, Some(Event::Frame(first)));
        assert_eq!(rx.recv().await, Some(Event::Frame(second)));
        assert_eq!(rx.recv().await, Some(Event::Ended(7)));

        handle.task.await.unwrap();
        assert_eq!(rx.recv().await, None);

        let stats = stats.lock().clone();
        assert_eq!(stats.frames_received, 2);
        assert_eq!(stats.bytes_received, 4);
        assert_eq!(stats.packets_dropped, 1);
        assert_eq!(stats.last_sequence, Some(2));
    }

    #[tokio::test]
    async fn test_cancel_wakes_idle_receiver() {
        let (handle, _server, _rx, _stats) = start(Duration::from_secs(30)).await;
        assert!(!handle.is_finished());

        let stopped = tokio::time::timeout(Duration::from_secs(5), handle.stop()).await;
        assert!(stopped.is_ok());
    }

    #[tokio::test]
    async fn test_timeouts_keep_receiving() {
        let (handle, server, mut rx, stats) = start(Duration::from_millis(20)).await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!handle.is_finished());
        assert!(stats.lock().timeouts >= 1);

        let frame = Frame::new(96, false, 10, 0, vec![5]);
        server.send(&frame.to_bytes(0)).await.unwrap();
        assert_eq!(rx.recv().await, Some(Event::Frame(frame)));
        assert!(!handle.has_ended());

        handle.stop().await;
    }

    #[test]
    fn test_loss_accounting() {
        let mut stats = ReceiverStats::default();
        stats.record_frame(&Frame::new(96, false, 65534, 0, vec![0]));
        stats.record_frame(&Frame::new(96, false, 65535, 0, vec![0]));
        stats.record_frame(&Frame::new(96, false, 2, 0, vec![0]));
        assert_eq!(stats.packets_lost, 2);

        // late packet
        stats.record_frame(&Frame::new(96, false, 1, 0, vec![0]));
        assert_eq!(stats.packets_lost, 2);
        assert_eq!(stats.last_sequence, Some(2));
        assert_eq!(stats.frames_received, 4);
    }
}
