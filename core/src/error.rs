//! Error types for the relay

use thiserror::Error;

/// Main error type for the relay
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Configuration error: {0}")]
    Config(String),
    
    #[error("Connection error: {0}")]
    Connection(String),
    
    /// The relay target's stream rejected a write
    #[error("Relay to [{network}] failed: {source}")]
    PeerWrite {
        network: String,
        #[source]
        source: Box<Error>,
    },
    
    /// An operation needed the stream before `connect()` completed
    #[error("Session [{0}] is not connected")]
    NotConnected(String),
    
    #[error("Session [{network}] idle for {seconds}s")]
    IdleTimeout { network: String, seconds: u64 },
    
    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
    
    #[error("Config serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error came from the relay target rather than the local stream
    pub fn is_peer_failure(&self) -> bool {
        matches!(self, Error::PeerWrite { .. })
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Config(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Config(s)
    }
}
