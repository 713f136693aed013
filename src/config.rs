use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

/// Largest request a session buffers before answering 400.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Server configuration.
///
/// Loaded from YAML when `WEFT_CONFIG` names a file, otherwise defaults.
/// `LISTEN` always wins over the file's `listen_addr`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    /// Where the Logger extension appends entries. No Logger when unset.
    pub log_file: Option<PathBuf>,
    /// Directory served through the Files extension.
    pub public_dir: Option<PathBuf>,
    pub log_filter: String,
    pub max_request_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN.to_string(),
            log_file: None,
            public_dir: None,
            log_filter: "info".to_string(),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var("WEFT_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(listen) = std::env::var("LISTEN") {
            cfg.listen_addr = listen;
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Splits `listen_addr` into the ip and port a server binds to.
    pub fn socket_addr(&self) -> Result<(IpAddr, u16), ConfigError> {
        let addr: SocketAddr = self
            .listen_addr
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.listen_addr.clone()))?;
        Ok((addr.ip(), addr.port()))
    }
}
