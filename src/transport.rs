//! Connection establishment: direct TCP, SOCKS proxies, TLS.
//!
//! The core only needs one primitive from the transport layer:
//! `connect(destination, tls, proxy) → stream`. Codecs and the line parser
//! live elsewhere; everything returned here is a plain byte stream.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tokio_socks::tcp::{Socks4Stream, Socks5Stream};
use tracing::debug;

use crate::error::ConfigError;

/// Byte stream of an established connection.
pub trait IrcStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> IrcStream for T {}

/// SOCKS protocol version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProxyVersion {
    /// SOCKS4, optional user id.
    Socks4,
    /// SOCKS5, optional username/password authentication.
    Socks5,
}

impl TryFrom<u8> for ProxyVersion {
    type Error = ConfigError;

    fn try_from(version: u8) -> Result<Self, ConfigError> {
        match version {
            4 => Ok(Self::Socks4),
            5 => Ok(Self::Socks5),
            other => Err(ConfigError::InvalidProxyVersion(other)),
        }
    }
}

/// SOCKS proxy configuration.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Proxy host.
    pub host: String,
    /// Proxy port.
    pub port: u16,
    /// SOCKS version.
    pub version: ProxyVersion,
    /// Username (SOCKS5) or user id (SOCKS4).
    pub username: Option<String>,
    /// Password (SOCKS5 only).
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Unauthenticated proxy from a numeric version.
    pub fn new(host: impl Into<String>, port: u16, version: u8) -> Result<Self, ConfigError> {
        Ok(Self {
            host: host.into(),
            port,
            version: ProxyVersion::try_from(version)?,
            username: None,
            password: None,
        })
    }

    /// Attach credentials, builder-style.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// TLS client configuration for an in-band secured connection.
#[derive(Clone, Debug, Default)]
pub struct TlsConfig {
    /// Override the SNI/verification name; defaults to the destination
    /// host.
    pub server_name: Option<String>,
}

/// Establish a connection to `dest`, optionally via a SOCKS proxy,
/// optionally wrapped in TLS.
pub async fn connect(
    dest: (&str, u16),
    tls: Option<TlsConfig>,
    proxy: Option<ProxyConfig>,
) -> Result<Box<dyn IrcStream>> {
    let (host, port) = dest;

    let stream: Box<dyn IrcStream> = match &proxy {
        None => {
            debug!(host, port, "connecting directly");
            Box::new(
                TcpStream::connect((host, port))
                    .await
                    .with_context(|| format!("connecting to {host}:{port}"))?,
            )
        }
        Some(proxy) => proxy_connect(proxy, (host, port)).await?,
    };

    match tls {
        None => Ok(stream),
        Some(config) => {
            let name = config.server_name.unwrap_or_else(|| host.to_string());
            let server = ServerName::try_from(name).context("invalid TLS server name")?;
            let connector = tls_connector();
            let secured = connector
                .connect(server, stream)
                .await
                .context("TLS handshake failed")?;
            Ok(Box::new(secured))
        }
    }
}

async fn proxy_connect(
    proxy: &ProxyConfig,
    target: (&str, u16),
) -> Result<Box<dyn IrcStream>> {
    let addr = (proxy.host.as_str(), proxy.port);
    debug!(
        proxy = %proxy.host,
        port = proxy.port,
        version = ?proxy.version,
        "connecting via SOCKS proxy"
    );
    match proxy.version {
        ProxyVersion::Socks5 => match (&proxy.username, &proxy.password) {
            (Some(username), Some(password)) => Ok(Box::new(
                Socks5Stream::connect_with_password(addr, target, username, password).await?,
            )),
            _ => Ok(Box::new(Socks5Stream::connect(addr, target).await?)),
        },
        ProxyVersion::Socks4 => match &proxy.username {
            Some(user_id) => Ok(Box::new(
                Socks4Stream::connect_with_userid(addr, target, user_id).await?,
            )),
            None => Ok(Box::new(Socks4Stream::connect(addr, target).await?)),
        },
    }
}

fn tls_connector() -> TlsConnector {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_version_from_u8() {
        assert_eq!(ProxyVersion::try_from(4), Ok(ProxyVersion::Socks4));
        assert_eq!(ProxyVersion::try_from(5), Ok(ProxyVersion::Socks5));
        assert_eq!(
            ProxyVersion::try_from(6),
            Err(ConfigError::InvalidProxyVersion(6))
        );
    }

    #[test]
    fn test_proxy_config_rejects_bad_version() {
        assert!(ProxyConfig::new("localhost", 1080, 5).is_ok());
        assert!(matches!(
            ProxyConfig::new("localhost", 1080, 0),
            Err(ConfigError::InvalidProxyVersion(0))
        ));
    }

    #[test]
    fn test_proxy_config_credentials() {
        let config = ProxyConfig::new("localhost", 1080, 5)
            .unwrap()
            .with_credentials("user", "pass");
        assert_eq!(config.username.as_deref(), Some("user"));
        assert_eq!(config.password.as_deref(), Some("pass"));
    }
}
