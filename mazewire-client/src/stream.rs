//! Connection stream for http and https base URLs.

use crate::error::TransportError;
use pin_project_lite::pin_project;
use rustls::pki_types::ServerName;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

pin_project! {
    /// An API connection, either plain TCP or TLS over TCP.
    #[project = ApiStreamProj]
    pub enum ApiStream {
        Plain { #[pin] stream: TcpStream },
        Tls { #[pin] stream: TlsStream<TcpStream> },
    }
}

impl ApiStream {
    /// Opens a plain TCP connection.
    pub async fn plain(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(ApiStream::Plain { stream })
    }

    /// Opens a TCP connection and runs the TLS handshake over it.
    pub async fn tls(
        addr: &str,
        connector: &TlsConnector,
        server_name: ServerName<'static>,
    ) -> Result<Self, TransportError> {
        let tcp = TcpStream::connect(addr).await?;
        tcp.set_nodelay(true)?;
        let stream = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| TransportError::TlsHandshake(e.to_string()))?;
        Ok(ApiStream::Tls { stream })
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, ApiStream::Tls { .. })
    }
}

impl AsyncRead for ApiStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.project() {
            ApiStreamProj::Plain { stream } => stream.poll_read(cx, buf),
            ApiStreamProj::Tls { stream } => stream.poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ApiStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.project() {
            ApiStreamProj::Plain { stream } => stream.poll_write(cx, buf),
            ApiStreamProj::Tls { stream } => stream.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            ApiStreamProj::Plain { stream } => stream.poll_flush(cx),
            ApiStreamProj::Tls { stream } => stream.poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            ApiStreamProj::Plain { stream } => stream.poll_shutdown(cx),
            ApiStreamProj::Tls { stream } => stream.poll_shutdown(cx),
        }
    }
}
