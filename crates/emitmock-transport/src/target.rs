use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use emitmock_frame::FrameConfig;

use crate::channel::Session;
use crate::error::TransportError;
use crate::stream::TcpSession;

/// Prefix selecting a Unix domain socket target.
pub const UNIX_PREFIX: &str = "unix:";

/// Where the ingestion service listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `host:port`
    Tcp(String),
    /// `unix:/path/to/socket`
    Unix(PathBuf),
}

impl Target {
    /// Build the session that opens channels to this target.
    pub fn session(&self, config: FrameConfig) -> crate::Result<Arc<dyn Session>> {
        match self {
            Self::Tcp(addr) => Ok(Arc::new(TcpSession::new(addr.clone(), config))),
            #[cfg(unix)]
            Self::Unix(path) => Ok(Arc::new(crate::stream::UnixSession::new(
                path.clone(),
                config,
            ))),
            #[cfg(not(unix))]
            Self::Unix(path) => Err(TransportError::Connect {
                target: format!("{UNIX_PREFIX}{}", path.display()),
                source: std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "unix domain sockets are not available on this platform",
                ),
            }),
        }
    }
}

impl FromStr for Target {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if let Some(path) = input.strip_prefix(UNIX_PREFIX) {
            if path.is_empty() {
                return Err(TransportError::InvalidTarget(input.to_string()));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }

        match input.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(Self::Tcp(input.to_string()))
            }
            _ => Err(TransportError::InvalidTarget(input.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => f.write_str(addr),
            Self::Unix(path) => write!(f, "{UNIX_PREFIX}{}", path.display()),
        }
    }
}
