//! Datagram transport used by the client.

mod channel;

pub use channel::ChannelTransport;

use bytes::Bytes;
use std::{
    future::Future,
    io,
    net::{Ipv4Addr, SocketAddr, UdpSocket as StdUdpSocket},
    time::Duration,
};
use thiserror::Error;
use tokio::{net::UdpSocket as TokioUdpSocket, time};

/// Largest datagram the receive path accepts.
const MAX_DATAGRAM: usize = 1500;

/// Defines all possible errors for transport operations.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to create a new socket")]
    CreateSocket(#[source] io::Error),

    #[error("Failed to enable broadcast on socket")]
    SetBroadcast(#[source] io::Error),

    #[error("Failed to set SO_BINDTODEVICE on interface '{interface}'")]
    BindToDevice {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to bind socket to address")]
    BindSocket(#[source] io::Error),

    #[error("Failed to set SO_REUSEADDR on socket")]
    SetReuseAddress(#[source] io::Error),

    #[error("Failed to set socket to non-blocking mode")]
    SetNonBlocking(#[source] io::Error),

    #[error("Failed to convert socket to TokioUdpSocket")]
    ConvertToTokio(#[source] io::Error),

    #[error("Failed to send datagram")]
    Send(#[source] io::Error),

    #[error("Failed to receive datagram")]
    Receive(#[source] io::Error),

    #[error("Transport closed")]
    Closed,

    #[error("Binding to a specific device is not implemented on this platform")]
    NotImplemented,
}

/// Broadcast send and deadline-bounded receive.
pub trait Transport {
    fn send(&mut self, datagram: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Waits at most `timeout` for one datagram.
    ///
    /// `Ok(None)` means the deadline elapsed. A zero timeout still returns a
    /// datagram that is already queued.
    fn recv_with_deadline(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<Bytes>, TransportError>> + Send;
}

/// UDP transport: bound to the client port, sending to the broadcast address.
pub struct UdpTransport {
    socket: TokioUdpSocket,
    target: SocketAddr,
}

impl UdpTransport {
    /// Binds `0.0.0.0:port`, optionally pinned to `interface`.
    pub fn bind(
        interface: Option<&str>,
        port: u16,
        target: SocketAddr,
    ) -> Result<Self, TransportError> {
        let socket = new_tokio_socket_bound_to_device(interface, port)?;
        tracing::debug!("Socket bound to port {}, target {}", port, target);
        Ok(Self { socket, target })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Transport for UdpTransport {
    async fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        let sent = self
            .socket
            .send_to(datagram, self.target)
            .await
            .map_err(TransportError::Send)?;
        tracing::debug!("Successfully sent {} bytes to {}", sent, self.target);
        Ok(())
    }

    async fn recv_with_deadline(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Bytes>, TransportError> {
        let mut buf = [0u8; MAX_DATAGRAM];
        match time::timeout(timeout, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((len, addr))) => {
                tracing::debug!("Received {} bytes from {}", len, addr);
                Ok(Some(Bytes::copy_from_slice(&buf[..len])))
            }
            Ok(Err(e)) => Err(TransportError::Receive(e)),
            Err(_) => Ok(None),
        }
    }
}

/// Creates a broadcast-capable `tokio::net::UdpSocket` bound to `0.0.0.0:port`.
///
/// With an interface name the socket is also bound to that device, so
/// broadcasts leave through it regardless of the routing table.
pub fn new_tokio_socket_bound_to_device(
    interface: Option<&str>,
    port: u16,
) -> Result<TokioUdpSocket, TransportError> {
    use socket2::{Domain, Socket, Type};

    let socket2 =
        Socket::new(Domain::IPV4, Type::DGRAM, None).map_err(TransportError::CreateSocket)?;

    socket2
        .set_broadcast(true)
        .map_err(TransportError::SetBroadcast)?;

    socket2
        .set_reuse_address(true)
        .map_err(TransportError::SetReuseAddress)?;

    if let Some(interface) = interface {
        bind_to_device(&socket2, interface)?;
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket2
        .bind(&addr.into())
        .map_err(TransportError::BindSocket)?;

    let std_socket: StdUdpSocket = socket2.into();
    std_socket
        .set_nonblocking(true)
        .map_err(TransportError::SetNonBlocking)?;
    TokioUdpSocket::from_std(std_socket).map_err(TransportError::ConvertToTokio)
}

#[cfg(target_os = "linux")]
fn bind_to_device(socket: &socket2::Socket, interface: &str) -> Result<(), TransportError> {
    use std::os::fd::AsRawFd;

    // SAFETY: the fd is owned by `socket` and the option value points to
    // `interface.len()` readable bytes.
    let ret = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_BINDTODEVICE,
            interface.as_ptr() as *const libc::c_void,
            interface.len() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(TransportError::BindToDevice {
            interface: interface.to_string(),
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// `SO_BINDTODEVICE` is Linux-only.
#[cfg(not(target_os = "linux"))]
fn bind_to_device(_socket: &socket2::Socket, _interface: &str) -> Result<(), TransportError> {
    Err(TransportError::NotImplemented)
}
