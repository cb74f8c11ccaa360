use crate::av::RTP_HEADER_LEN;
use lazy_static::lazy_static;
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

/// Idle timeout applied to every datagram receive.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(2);

/// Largest RTP datagram the receiver accepts.
pub const DEFAULT_RECEIVE_BUFFER_SIZE: usize = 0x10000;

/// Local address the RTP socket binds to. The port is always ephemeral.
pub const DEFAULT_RTP_BIND_ADDRESS: &str = "0.0.0.0";

lazy_static! {
    static ref CONFIG: RwLock<ClientConfig> = RwLock::new(ClientConfig::load());
}

/// Tunables for an [`RTSPClient`](crate::format::rtsp::RTSPClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Idle timeout for a single datagram receive
    pub receive_timeout: Duration,
    /// Receive buffer size for RTP datagrams
    pub receive_buffer_size: usize,
    /// Local address for the RTP socket
    pub rtp_bind_address: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            rtp_bind_address: DEFAULT_RTP_BIND_ADDRESS.to_string(),
        }
    }
}

impl ClientConfig {
    /// Builds a configuration from defaults, then the first readable config
    /// file, then `RTSPIO_*` environment variables.
    pub fn load() -> Self {
        let mut config = ClientConfig::default();

        let config_paths = ["./config.toml", "./rtspio_config.toml"];
        for path in &config_paths {
            if let Ok(mut file) = File::open(path) {
                let mut content = String::new();
                if file.read_to_string(&mut content).is_ok() {
                    config.apply_file(&content);
                    break;
                }
            }
        }

        config.apply_env();
        config
    }

    /// Applies `key = value` lines. Unknown keys and unparsable values are
    /// ignored.
    pub fn apply_file(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"').trim_matches('\'');
                self.apply_value(key.trim(), value);
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(ms) = env::var("RTSPIO_RECEIVE_TIMEOUT_MS") {
            self.apply_value("receive_timeout_ms", &ms);
        }
        if let Ok(size) = env::var("RTSPIO_RECEIVE_BUFFER_SIZE") {
            self.apply_value("receive_buffer_size", &size);
        }
        if let Ok(addr) = env::var("RTSPIO_RTP_BIND_ADDRESS") {
            self.apply_value("rtp_bind_address", &addr);
        }
    }

    fn apply_value(&mut self, key: &str, value: &str) {
        match key {
            "receive_timeout_ms" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.set_receive_timeout(Duration::from_millis(ms));
                }
            }
            "receive_buffer_size" => {
                if let Ok(size) = value.parse::<usize>() {
                    self.set_receive_buffer_size(size);
                }
            }
            "rtp_bind_address" => {
                self.set_rtp_bind_address(value);
            }
            _ => {}
        }
    }

    // A zero timeout would turn the receive loop into a busy spin.
    fn set_receive_timeout(&mut self, timeout: Duration) {
        if !timeout.is_zero() {
            self.receive_timeout = timeout;
        }
    }

    // Must at least hold an RTP header.
    fn set_receive_buffer_size(&mut self, size: usize) {
        if size >= RTP_HEADER_LEN {
            self.receive_buffer_size = size;
        }
    }

    fn set_rtp_bind_address(&mut self, address: &str) {
        if !address.is_empty() {
            self.rtp_bind_address = address.to_string();
        }
    }

    /// Sets the idle timeout for datagram receives. A zero timeout is
    /// ignored.
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.set_receive_timeout(timeout);
        self
    }

    /// Sets the receive buffer size for RTP datagrams. Sizes smaller than
    /// an RTP header are ignored.
    pub fn with_receive_buffer_size(mut self, size: usize) -> Self {
        self.set_receive_buffer_size(size);
        self
    }

    /// Sets the local address for the RTP socket. An empty address is
    /// ignored.
    pub fn with_rtp_bind_address(mut self, address: &str) -> Self {
        self.set_rtp_bind_address(address);
        self
    }

    /// Re-reads the process-wide configuration.
    pub fn reload() {
        let new_config = ClientConfig::load();
        if let Ok(mut config) = CONFIG.write() {
            *config = new_config;
        }
    }
}

/// Returns a copy of the process-wide configuration.
pub fn get_config() -> ClientConfig {
    match CONFIG.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# rtspio configuration
# Copy this file to 'config.toml' and adjust as needed.

# Idle timeout for each RTP receive, in milliseconds
receive_timeout_ms = 2000

# Receive buffer size for RTP datagrams, in bytes
receive_buffer_size = 65536

# Local address for the RTP socket (port is always ephemeral)
rtp_bind_address = "0.0.0.0"
"#;
        std::fs::write(path, template)?;
    }
    Ok(())
}
