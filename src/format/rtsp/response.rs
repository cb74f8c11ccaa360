use crate::error::{Result, RtspError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Status code of a successful response.
pub const STATUS_OK: i32 = 200;

/// A parsed RTSP response: status line plus headers.
#[derive(Debug, Clone, PartialEq)]
pub struct RTSPResponse {
    /// Protocol token from the status line, e.g. `RTSP/1.0`
    pub version: String,
    /// Numeric status code
    pub code: i32,
    /// Reason phrase
    pub message: String,
    /// Headers in arrival order. Names keep the case they were sent with.
    pub headers: Vec<(String, String)>,
}

impl RTSPResponse {
    /// Creates a response with no headers.
    pub fn new(version: &str, code: i32, message: &str) -> Self {
        Self {
            version: version.to_string(),
            code,
            message: message.to_string(),
            headers: Vec::new(),
        }
    }

    /// Stores a header. A repeated name replaces the earlier value in place.
    pub fn add_header(&mut self, name: &str, value: &str) {
        if let Some(existing) = self.headers.iter_mut().find(|(n, _)| n == name) {
            existing.1 = value.to_string();
        } else {
            self.headers.push((name.to_string(), value.to_string()));
        }
    }

    /// Case-sensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the status code is 200.
    pub fn is_success(&self) -> bool {
        self.code == STATUS_OK
    }

    /// The echoed `CSeq`, if present and numeric.
    pub fn cseq(&self) -> Option<u32> {
        self.header("CSeq").and_then(|v| v.parse().ok())
    }

    /// Session identifier with any `;`-delimited parameters stripped.
    ///
    /// Returns `None` when the header is absent or the identifier is empty.
    pub fn session_id(&self) -> Option<&str> {
        let value = self.header("Session")?;
        let id = value.split(';').next().unwrap_or_default().trim();
        (!id.is_empty()).then_some(id)
    }
}

/// Reads one response from `reader`.
///
/// Returns `Ok(None)` if the stream ends before a status line arrives. Reading
/// stops at the blank line terminating the headers, so consecutive responses
/// can be read from the same reader.
///
/// # Errors
///
/// [`RtspError::ProtocolFormat`] if the status line has no separator after
/// the status code, the status code is not numeric, a header line has no colon, or a
/// line is not valid UTF-8. [`RtspError::Io`] on transport failures.
pub async fn read_response<R>(reader: &mut R) -> Result<Option<RTSPResponse>>
where
    R: AsyncBufRead + Unpin,
{
    let status_line = match read_line(reader).await? {
        Some(line) => line,
        None => return Ok(None),
    };

    let mut response = parse_status_line(&status_line)?;

    while let Some(line) = read_line(reader).await? {
        if line.is_empty() {
            break;
        }

        let (name, value) = line.split_once(':').ok_or_else(|| {
            RtspError::ProtocolFormat(format!("header line without colon: {:?}", line))
        })?;
        response.add_header(name.trim(), value.trim());
    }

    Ok(Some(response))
}

fn parse_status_line(line: &str) -> Result<RTSPResponse> {
    let malformed = || RtspError::ProtocolFormat(format!("malformed status line: {:?}", line));

    let (version, rest) = split_field(line).ok_or_else(malformed)?;
    let (code, message) = split_field(rest).ok_or_else(malformed)?;

    let code = code
        .parse::<i32>()
        .map_err(|_| RtspError::ProtocolFormat(format!("non-numeric status code: {:?}", code)))?;

    Ok(RTSPResponse::new(version, code, message.trim_end()))
}

/// Splits off the first whitespace-delimited token.
fn split_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    let end = s.find(char::is_whitespace)?;
    Some((&s[..end], s[end..].trim_start()))
}

/// Reads a line without its terminator. `None` at end of stream.
async fn read_line<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }

    if buf.ends_with(b"\n") {
        buf.pop();
        if buf.ends_with(b"\r") {
            buf.pop();
        }
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| RtspError::ProtocolFormat("response line is not valid UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::BufReader;
    use tokio_test::io::Builder;

    async fn parse(raw: &[u8]) -> Result<Option<RTSPResponse>> {
        let mut builder = Builder::new();
        if !raw.is_empty() {
            builder.read(raw);
        }
        let mut reader = BufReader::new(builder.build());
        read_response(&mut reader).await
    }

    #[tokio::test]
    async fn test_parse_setup_response() {
        let response = parse(b"RTSP/1.0 200 OK\r\nCSeq: 1\r\nSession: 4231abc;timeout=60\r\n\r\n")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.version, "RTSP/1.0");
        assert_eq!(response.code, 200);
        assert_eq!(response.message, "OK");
        assert!(response.is_success());
        assert_eq!(response.cseq(), Some(1));
        assert_eq!(response.session_id(), Some("4231abc"));
        assert_eq!(
            response.headers,
            vec![
                ("CSeq".to_string(), "1".to_string()),
                ("Session".to_string(), "4231abc;timeout=60".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_multi_word_message() {
        let response = parse(b"RTSP/1.0 454 Session Not Found\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.code, 454);
        assert_eq!(response.message, "Session Not Found");
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_end_of_stream_is_no_response() {
        assert_eq!(parse(b"").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_headers_end_at_eof() {
        let response = parse(b"RTSP/1.0 200 OK\nCSeq: 3\n").await.unwrap().unwrap();
        assert_eq!(response.cseq(), Some(3));
    }

    #[tokio::test]
    async fn test_two_field_status_line() {
        let err = parse(b"RTSP/1.0 200\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, RtspError::ProtocolFormat(_)));
    }

    #[tokio::test]
    async fn test_empty_reason_phrase() {
        let response = parse(b"RTSP/1.0 200 \r\nCSeq: 1\r\n\r\n").await.unwrap().unwrap();
        assert_eq!(response.code, 200);
        assert_eq!(response.message, "");
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_out_of_range_status_codes_are_numeric() {
        let response = parse(b"RTSP/1.0 70000 Odd\r\n\r\n").await.unwrap().unwrap();
        assert_eq!(response.code, 70000);
        assert!(!response.is_success());

        let response = parse(b"RTSP/1.0 -1 Negative\r\n\r\n").await.unwrap().unwrap();
        assert_eq!(response.code, -1);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_non_numeric_status() {
        let err = parse(b"RTSP/1.0 OK fine\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, RtspError::ProtocolFormat(_)));
    }

    #[tokio::test]
    async fn test_header_without_colon() {
        let err = parse(b"RTSP/1.0 200 OK\r\nCSeq 1\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, RtspError::ProtocolFormat(_)));
    }

    #[tokio::test]
    async fn test_invalid_utf8_line() {
        let err = parse(b"RTSP/1.0 200 OK\r\nX: \xff\xfe\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, RtspError::ProtocolFormat(_)));
    }

    #[tokio::test]
    async fn test_duplicate_header_last_wins() {
        let response = parse(b"RTSP/1.0 200 OK\r\nSession: a\r\nCSeq: 1\r\nSession: b\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.header("Session"), Some("b"));
        assert_eq!(response.headers.len(), 2);
        assert_eq!(response.headers[0].0, "Session");
    }

    #[tokio::test]
    async fn test_header_lookup_is_case_sensitive() {
        let response = parse(b"RTSP/1.0 200 OK\r\nsession: abc\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.header("session"), Some("abc"));
        assert_eq!(response.session_id(), None);
    }

    #[tokio::test]
    async fn test_value_keeps_colons() {
        let response = parse(b"RTSP/1.0 200 OK\r\nContent-Base: rtsp://host:554/a\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.header("Content-Base"), Some("rtsp://host:554/a"));
    }

    #[tokio::test]
    async fn test_reads_one_response_at_a_time() {
        let raw = b"RTSP/1.0 200 OK\r\nCSeq: 1\r\n\r\nRTSP/1.0 200 OK\r\nCSeq: 2\r\n\r\n";
        let mut reader = BufReader::new(Builder::new().read(raw).build());

        let first = read_response(&mut reader).await.unwrap().unwrap();
        let second = read_response(&mut reader).await.unwrap().unwrap();
        assert_eq!(first.cseq(), Some(1));
        assert_eq!(second.cseq(), Some(2));
        assert_eq!(read_response(&mut reader).await.unwrap(), None);
    }

    #[test]
    fn test_empty_session_id() {
        let mut response = RTSPResponse::new("RTSP/1.0", 200, "OK");
        response.add_header("Session", " ;timeout=60");
        assert_eq!(response.session_id(), None);
    }
}
