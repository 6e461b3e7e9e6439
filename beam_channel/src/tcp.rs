use crate::channel::{Channel, TokioReader, TokioWriter};
use crate::identifier::NetworkIdentifier;
use async_trait::async_trait;
use beam_buffer::IoResult;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

/// A `Channel` backed by a live `TcpStream` (`Network/TcpSocketChannel.hpp`).
pub struct TcpChannel {
    id: NetworkIdentifier,
    reader: TokioReader<tokio::net::tcp::OwnedReadHalf>,
    writer: TokioWriter<tokio::net::tcp::OwnedWriteHalf>,
}

impl TcpChannel {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        let (read_half, write_half) = stream.into_split();
        TcpChannel {
            id: NetworkIdentifier::new(peer.to_string()),
            reader: TokioReader::new(read_half),
            writer: TokioWriter::new(write_half),
        }
    }
}

impl Channel for TcpChannel {
    type Id = NetworkIdentifier;
    type Reader = TokioReader<tokio::net::tcp::OwnedReadHalf>;
    type Writer = TokioWriter<tokio::net::tcp::OwnedWriteHalf>;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn reader(&mut self) -> &mut Self::Reader {
        &mut self.reader
    }

    fn writer(&mut self) -> &mut Self::Writer {
        &mut self.writer
    }

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        (self.reader, self.writer)
    }
}

/// Builds a client-side `TcpChannel` by connecting to a fixed address
/// (`Network/TcpSocketChannel.hpp`'s client constructor).
pub struct TcpChannelBuilder {
    address: SocketAddr,
}

impl TcpChannelBuilder {
    pub fn new(address: SocketAddr) -> Self {
        TcpChannelBuilder { address }
    }

    pub async fn connect(&self) -> IoResult<TcpChannel> {
        let stream = TcpStream::connect(self.address).await?;
        Ok(TcpChannel::new(stream, self.address))
    }
}

/// Accepts incoming `TcpChannel`s (`Network/TcpServerSocket.hpp`).
pub struct TcpServer {
    listener: TcpListener,
}

impl TcpServer {
    pub async fn bind(address: SocketAddr) -> IoResult<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(TcpServer { listener })
    }

    pub fn local_addr(&self) -> IoResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn accept(&self) -> IoResult<TcpChannel> {
        let (stream, peer) = self.listener.accept().await?;
        Ok(TcpChannel::new(stream, peer))
    }
}
