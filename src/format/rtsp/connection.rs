use super::request::RTSPRequest;
use super::response::{read_response, RTSPResponse};
use crate::{Result, RtspError};
use log::debug;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// The control channel to an RTSP server.
#[derive(Debug)]
pub struct RTSPConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl RTSPConnection {
    /// Opens a TCP connection to `host:port`.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| RtspError::Connection(format!("Failed to connect to {}: {}", addr, e)))?;

        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Sends a request and reads its response.
    ///
    /// A stream that closes before the status line is [`RtspError::StreamEnded`].
    pub async fn exchange(&mut self, request: &RTSPRequest) -> Result<RTSPResponse> {
        let wire = request.encode();
        debug!("Sending request:\n{}", wire);
        self.writer.write_all(wire.as_bytes()).await?;
        self.writer.flush().await?;

        let response = read_response(&mut self.reader)
            .await?
            .ok_or(RtspError::StreamEnded)?;
        debug!(
            "Received response: {} {} {} ({} headers)",
            response.version,
            response.code,
            response.message,
            response.headers.len()
        );
        Ok(response)
    }

    /// Best-effort shutdown of the write side; errors are ignored.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.writer.shutdown().await {
            debug!("Ignoring error while closing control connection: {}", e);
        }
    }
}
