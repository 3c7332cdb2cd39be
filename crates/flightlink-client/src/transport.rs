//! Transport abstraction for opening the session's byte stream.
//!
//! The session only needs an ordered, reliable byte stream. Production uses
//! TCP; tests plug in in-memory pipes or a simulated network (turmoil) by
//! implementing [`Transport`] or by handing a stream to
//! [`crate::Session::from_stream`] directly.

use std::io;

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

/// Opens byte streams to a simulator endpoint.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Stream type produced by [`Transport::connect`].
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connect to `host:port`.
    ///
    /// Returns once the stream is established; the protocol handshake is
    /// performed by the caller.
    async fn connect(&self, host: &str, port: u16) -> io::Result<Self::Stream>;
}

/// Plain TCP with Nagle disabled, so small control frames go out at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}
