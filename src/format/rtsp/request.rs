use super::Method;

/// Protocol token sent on every request line.
pub const RTSP_VERSION: &str = "RTSP/1.0";

/// An outgoing control request.
#[derive(Debug, Clone, PartialEq)]
pub struct RTSPRequest {
    /// Request method
    pub method: Method,
    /// Media resource the request targets
    pub resource: String,
    /// Headers in the order they are written
    pub headers: Vec<(String, String)>,
}

impl RTSPRequest {
    /// Creates a request carrying only the `CSeq` header.
    pub fn new(method: Method, resource: &str, cseq: u32) -> Self {
        Self {
            method,
            resource: resource.to_string(),
            headers: vec![("CSeq".to_string(), cseq.to_string())],
        }
    }

    /// SETUP asking the server to stream to `client_port`.
    pub fn setup(resource: &str, cseq: u32, client_port: u16) -> Self {
        Self::new(Method::Setup, resource, cseq)
            .with_header("Transport", &format!("RTP/UDP;client_port={}", client_port))
    }

    /// PLAY, PAUSE or TEARDOWN within an established session.
    pub fn in_session(method: Method, resource: &str, cseq: u32, session: &str) -> Self {
        Self::new(method, resource, cseq).with_header("Session", session)
    }

    /// Appends a header line.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Renders the request in wire format, blank line included.
    pub fn encode(&self) -> String {
        let mut request = format!("{} {} {}\r\n", self.method, self.resource, RTSP_VERSION);
        for (name, value) in &self.headers {
            request.push_str(&format!("{}: {}\r\n", name, value));
        }
        request.push_str("\r\n");
        request
    }
}
