use super::{
    connection::RTSPConnection,
    receiver::{CancelFlag, PacketReceiver, ReceiverHandle, ReceiverStats},
    request::RTSPRequest,
    response::RTSPResponse,
    state::{transition, Method, SessionState},
};
use crate::av::SessionHandler;
use crate::config::{get_config, ClientConfig};
use crate::{Result, RtspError};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use url::Url;

/// Port used when an `rtsp://` URL does not name one.
pub const DEFAULT_RTSP_PORT: u16 = 554;

/// RTSP session client.
///
/// Drives one media session through SETUP, PLAY, PAUSE and TEARDOWN over a
/// single control connection, and runs an RTP receiver task while the
/// session is playing. Decoded frames go to the [`SessionHandler`] given at
/// construction.
///
/// Operations take `&mut self`, so at most one is in flight per client.
/// Share a client between tasks by wrapping it in `tokio::sync::Mutex`.
pub struct RTSPClient {
    /// Control connection; `None` once closed
    connection: Option<RTSPConnection>,
    /// Consumer of decoded frames
    handler: Arc<dyn SessionHandler>,
    config: ClientConfig,
    /// CSeq of the most recent request, shared with the receiver
    cseq: Arc<AtomicU32>,
    state: SessionState,
    /// Resource negotiated by SETUP
    resource: Option<String>,
    /// Session identifier issued by the server
    session: Option<String>,
    /// RTP socket, bound on SETUP and dropped on TEARDOWN
    rtp_socket: Option<Arc<UdpSocket>>,
    /// Receiver task, present while playing
    receiver: Option<ReceiverHandle>,
    stats: Arc<Mutex<ReceiverStats>>,
}

impl fmt::Debug for RTSPClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTSPClient")
            .field("connected", &self.connection.is_some())
            .field("cseq", &self.cseq())
            .field("state", &self.state)
            .field("resource", &self.resource)
            .field("session", &self.session)
            .field("rtp_port", &self.rtp_port())
            .finish()
    }
}

impl RTSPClient {
    /// Connects to `host:port` using the process-wide configuration.
    ///
    /// No request is sent and no stream is set up.
    pub async fn connect(host: &str, port: u16, handler: Arc<dyn SessionHandler>) -> Result<Self> {
        Self::connect_with_config(host, port, handler, get_config()).await
    }

    /// Connects to the server named by an `rtsp://host[:port]` URL.
    pub async fn connect_url(url: &str, handler: Arc<dyn SessionHandler>) -> Result<Self> {
        let parsed_url =
            Url::parse(url).map_err(|e| RtspError::Connection(format!("Invalid URL: {}", e)))?;

        if parsed_url.scheme() != "rtsp" {
            return Err(RtspError::Connection("URL scheme is not 'rtsp'".into()));
        }

        let host = parsed_url
            .host_str()
            .ok_or_else(|| RtspError::Connection("No host in URL".into()))?;
        let port = parsed_url.port().unwrap_or(DEFAULT_RTSP_PORT);

        Self::connect(host, port, handler).await
    }

    /// Connects to `host:port` with an explicit configuration.
    pub async fn connect_with_config(
        host: &str,
        port: u16,
        handler: Arc<dyn SessionHandler>,
        config: ClientConfig,
    ) -> Result<Self> {
        let connection = RTSPConnection::connect(host, port).await?;
        info!("Connected to RTSP server {}:{}", host, port);

        Ok(Self {
            connection: Some(connection),
            handler,
            config,
            cseq: Arc::new(AtomicU32::new(0)),
            state: SessionState::Init,
            resource: None,
            session: None,
            rtp_socket: None,
            receiver: None,
            stats: Arc::new(Mutex::new(ReceiverStats::default())),
        })
    }

    /// Current session state.
    ///
    /// A session whose stream has ended reports [`SessionState::Ready`] even
    /// before the next operation settles it.
    pub fn state(&self) -> SessionState {
        match &self.receiver {
            Some(receiver) if self.state == SessionState::Playing && receiver.has_ended() => {
                SessionState::Ready
            }
            _ => self.state,
        }
    }

    /// CSeq of the most recent request; 0 before the first.
    pub fn cseq(&self) -> u32 {
        self.cseq.load(Ordering::SeqCst)
    }

    /// Session identifier negotiated by SETUP.
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Resource negotiated by SETUP.
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Local port of the RTP socket, if one is bound.
    pub fn rtp_port(&self) -> Option<u16> {
        self.rtp_socket
            .as_ref()
            .and_then(|socket| socket.local_addr().ok())
            .map(|addr| addr.port())
    }

    /// Snapshot of the receiver counters for the current session.
    pub fn statistics(&self) -> ReceiverStats {
        self.stats.lock().clone()
    }

    /// Whether an RTP receiver task is currently running.
    pub fn is_receiving(&self) -> bool {
        self.receiver
            .as_ref()
            .map_or(false, |receiver| !receiver.is_finished())
    }

    /// Sets up `resource`: binds an RTP socket on an ephemeral port, sends
    /// SETUP advertising that port, and records the session identifier.
    ///
    /// On any failure the RTP socket is closed before the error is returned.
    ///
    /// # Panics
    ///
    /// Panics if `resource` is empty.
    pub async fn setup(&mut self, resource: &str) -> Result<()> {
        assert!(!resource.trim().is_empty(), "resource name must not be empty");

        let cseq = self.next_cseq();
        let next = self.check(Method::Setup).await?;

        let bind_addr = format!("{}:0", self.config.rtp_bind_address);
        let socket = UdpSocket::bind(&bind_addr).await.map_err(|e| {
            RtspError::Connection(format!("Failed to bind RTP socket on {}: {}", bind_addr, e))
        })?;
        let port = socket
            .local_addr()
            .map_err(|e| RtspError::Connection(format!("RTP socket has no local address: {}", e)))?
            .port();

        let request = RTSPRequest::setup(resource, cseq, port);
        let response = self.exchange(&request, cseq).await?;

        let session = response
            .session_id()
            .ok_or_else(|| {
                RtspError::ProtocolFormat("SETUP response carries no session identifier".into())
            })?
            .to_string();

        info!(
            "SETUP {} complete: session {}, RTP port {}",
            resource, session, port
        );
        *self.stats.lock() = ReceiverStats::default();
        self.rtp_socket = Some(Arc::new(socket));
        self.resource = Some(resource.to_string());
        self.session = Some(session);
        self.state = next;
        Ok(())
    }

    /// Starts or resumes playback and spawns the RTP receiver.
    pub async fn play(&mut self) -> Result<()> {
        let cseq = self.next_cseq();
        let next = self.check(Method::Play).await?;

        let request = self.session_request(Method::Play, cseq);
        self.exchange(&request, cseq).await?;

        let socket = self
            .rtp_socket
            .clone()
            .ok_or_else(|| RtspError::Connection("RTP socket is not bound".into()))?;

        if let Some(previous) = self.receiver.take() {
            previous.stop().await;
        }

        self.receiver = Some(
            PacketReceiver::new(
                socket,
                self.handler.clone(),
                Arc::new(CancelFlag::new()),
                self.cseq.clone(),
                self.stats.clone(),
                self.config.receive_timeout,
                self.config.receive_buffer_size,
            )
            .spawn(),
        );
        self.state = next;
        info!("PLAY {} started", self.resource.as_deref().unwrap_or_default());
        Ok(())
    }

    /// Pauses playback and stops the RTP receiver.
    pub async fn pause(&mut self) -> Result<()> {
        let cseq = self.next_cseq();
        let next = self.check(Method::Pause).await?;

        let request = self.session_request(Method::Pause, cseq);
        self.exchange(&request, cseq).await?;

        if let Some(receiver) = self.receiver.take() {
            receiver.stop().await;
        }
        self.state = next;
        info!("PAUSE {} complete", self.resource.as_deref().unwrap_or_default());
        Ok(())
    }

    /// Ends the session from READY or PLAYING.
    ///
    /// The receiver is stopped and the RTP socket released whatever the
    /// server answers, and the session returns to INIT; a failed exchange is
    /// still reported. The control connection stays open for another SETUP.
    pub async fn teardown(&mut self) -> Result<()> {
        let cseq = self.next_cseq();
        self.check(Method::Teardown).await?;

        let request = self.session_request(Method::Teardown, cseq);
        let result = self.exchange(&request, cseq).await;

        self.release_media().await;
        match &result {
            Ok(_) => info!("TEARDOWN complete"),
            Err(e) => warn!("TEARDOWN failed, session resources released anyway: {}", e),
        }
        result.map(|_| ())
    }

    /// Closes the RTP receiver, the RTP socket and the control connection.
    ///
    /// Safe to call more than once; errors during release are ignored.
    pub async fn close(&mut self) {
        self.release_media().await;
        if let Some(mut connection) = self.connection.take() {
            connection.shutdown().await;
            info!("RTSP connection closed");
        }
    }

    // Private helper methods...

    fn next_cseq(&self) -> u32 {
        self.cseq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Settles an ended stream, then validates `method` against the state.
    async fn check(&mut self, method: Method) -> Result<SessionState> {
        if self.state == SessionState::Playing
            && self.receiver.as_ref().map_or(false, |r| r.has_ended())
        {
            if let Some(receiver) = self.receiver.take() {
                receiver.stop().await;
            }
            self.state = SessionState::Ready;
            info!("Stream ended, session is READY");
        }

        transition(self.state, method).ok_or(RtspError::Sequence {
            method,
            state: self.state,
        })
    }

    fn session_request(&self, method: Method, cseq: u32) -> RTSPRequest {
        RTSPRequest::in_session(
            method,
            self.resource.as_deref().unwrap_or_default(),
            cseq,
            self.session.as_deref().unwrap_or_default(),
        )
    }

    /// Sends `request` and requires a 200 response.
    async fn exchange(&mut self, request: &RTSPRequest, cseq: u32) -> Result<RTSPResponse> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| RtspError::Connection("Connection is closed".into()))?;

        let response = connection.exchange(request).await?;

        if response.cseq() != Some(cseq) {
            warn!(
                "{} response echoed CSeq {:?}, expected {}",
                request.method,
                response.cseq(),
                cseq
            );
        }

        if !response.is_success() {
            return Err(RtspError::ServerRejected {
                code: response.code,
                message: response.message,
            });
        }

        debug!("{} accepted with {} {}", request.method, response.code, response.message);
        Ok(response)
    }

    /// Stops the receiver, then drops the RTP socket and the negotiated
    /// session.
    async fn release_media(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            receiver.stop().await;
        }
        self.rtp_socket = None;
        self.resource = None;
        self.session = None;
        self.state = SessionState::Init;
    }
}

impl Drop for RTSPClient {
    fn drop(&mut self) {
        // The task exits on its own once it sees the flag.
        if let Some(receiver) = &self.receiver {
            receiver.cancel();
        }
    }
}
