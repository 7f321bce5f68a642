//! Stream establishment (TCP or TLS)

use crate::{config::NetworkConfig, Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_rustls::TlsConnector;

/// Bidirectional byte stream a session runs over
pub trait RelayStream: AsyncRead + AsyncWrite + Send + Sync + Unpin {}

impl<T> RelayStream for T where T: AsyncRead + AsyncWrite + Send + Sync + Unpin {}

/// Boxed stream handed to a session
pub type BoxedStream = Box<dyn RelayStream>;

/// Opens the stream for one network
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, network: &NetworkConfig) -> Result<BoxedStream>;
}

/// Connector for real networks: plain TCP, upgraded to TLS when configured
pub struct TcpConnector {
    tls: TlsConnector,
}

impl TcpConnector {
    /// Create a connector trusting the platform's root certificates
    pub fn new() -> Self {
        let mut roots = rustls::RootCertStore::empty();
        match rustls_native_certs::load_native_certs() {
            Ok(certs) => {
                for cert in certs {
                    if let Err(e) = roots.add(&rustls::Certificate(cert.0)) {
                        tracing::warn!("Failed to add root cert: {}", e);
                    }
                }
            }
            Err(e) => tracing::warn!("Error loading native certs: {}", e),
        }

        let config = rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Self {
            tls: TlsConnector::from(Arc::new(config)),
        }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn open(&self, network: &NetworkConfig) -> Result<BoxedStream> {
        let address = network.address();
        let stream = TcpStream::connect(&address)
            .await
            .map_err(|e| Error::Connection(format!("Failed to connect to {}: {}", address, e)))?;

        if !network.tls {
            return Ok(Box::new(stream));
        }

        let server_name = rustls::ServerName::try_from(network.server.as_str())
            .map_err(|e| Error::Connection(format!("Invalid TLS server name {}: {}", network.server, e)))?;

        tracing::debug!("Starting TLS handshake with {}", address);
        let tls_stream = self
            .tls
            .connect(server_name, stream)
            .await
            .map_err(|e| Error::Connection(format!("TLS handshake with {} failed: {}", address, e)))?;

        Ok(Box::new(tls_stream))
    }
}
