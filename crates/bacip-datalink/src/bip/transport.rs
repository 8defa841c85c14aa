use crate::bip::broadcast::broadcast_address;
use crate::{BacnetAddress, DataLink, DataLinkAddress, DataLinkError};
use bacip_core::npdu::Npdu;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::UdpSocket;
use tokio::sync::watch;

/// Largest datagram the transport sends or expects to receive.
pub const MAX_BIP_FRAME_LEN: usize = 1600;

/// BACnet/IP over a single UDP socket.
///
/// Unicast frames go to the destination's MAC; broadcasts of any scope go
/// to the configured directed-broadcast address.
#[derive(Debug)]
pub struct BacnetIpTransport {
    socket: UdpSocket,
    broadcast: SocketAddr,
    shutdown: watch::Sender<bool>,
    closed: AtomicBool,
}

impl BacnetIpTransport {
    pub async fn bind(bind_addr: SocketAddr, broadcast: SocketAddr) -> Result<Self, DataLinkError> {
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.set_broadcast(true)?;
        let (shutdown, _) = watch::channel(false);
        log::debug!(
            "bacnet/ip bound to {} (broadcast {broadcast})",
            socket.local_addr()?
        );
        Ok(Self {
            socket,
            broadcast,
            shutdown,
            closed: AtomicBool::new(false),
        })
    }

    /// Binds every interface on `port` and broadcasts to the directed
    /// broadcast address of `cidr`, e.g. `"192.168.23.1/24"`.
    pub async fn bind_cidr(cidr: &str, port: u16) -> Result<Self, DataLinkError> {
        let broadcast = broadcast_address(cidr)?;
        Self::bind(
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
            SocketAddr::new(IpAddr::V4(broadcast), port),
        )
        .await
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DataLinkError> {
        self.socket.local_addr().map_err(DataLinkError::Io)
    }

    pub fn broadcast_addr(&self) -> SocketAddr {
        self.broadcast
    }

    fn target(&self, destination: &BacnetAddress) -> SocketAddr {
        if destination.is_broadcast() || destination.is_sub_broadcast() {
            return self.broadcast;
        }
        destination
            .mac
            .map_or(self.broadcast, DataLinkAddress::as_socket_addr)
    }
}

impl DataLink for BacnetIpTransport {
    async fn send(
        &self,
        frame: &[u8],
        npdu: &Npdu,
        destination: &BacnetAddress,
    ) -> Result<usize, DataLinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DataLinkError::Closed);
        }
        if frame.len() > MAX_BIP_FRAME_LEN {
            return Err(DataLinkError::FrameTooLarge);
        }
        let target = self.target(destination);
        log::trace!(
            "tx {} bytes to {target} (dest {destination}, expecting reply: {})",
            frame.len(),
            npdu.expecting_reply()
        );
        Ok(self.socket.send_to(frame, target).await?)
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, DataLinkAddress), DataLinkError> {
        let mut shutdown = self.shutdown.subscribe();
        let closed = *shutdown.borrow_and_update();
        if closed || self.closed.load(Ordering::Acquire) {
            return Err(DataLinkError::Closed);
        }
        tokio::select! {
            received = self.socket.recv_from(buf) => {
                let (n, src) = received?;
                log::trace!("rx {n} bytes from {src}");
                Ok((n, DataLinkAddress::Ip(src)))
            }
            _ = shutdown.changed() => Err(DataLinkError::Closed),
        }
    }

    fn close(&self) -> Result<(), DataLinkError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.shutdown.send_replace(true);
            log::debug!("bacnet/ip transport closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::BacnetIpTransport;
    use crate::{BacnetAddress, DataLink, DataLinkAddress, DataLinkError};
    use bacip_core::npdu::Npdu;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;
    use tokio::net::UdpSocket;
    use tokio::time::{timeout, Duration};

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    async fn transport_with_peer() -> (BacnetIpTransport, UdpSocket) {
        let peer = UdpSocket::bind(loopback()).await.unwrap();
        let transport = BacnetIpTransport::bind(loopback(), peer.local_addr().unwrap())
            .await
            .unwrap();
        (transport, peer)
    }

    #[tokio::test]
    async fn unicast_goes_to_destination_mac() {
        let (transport, peer) = transport_with_peer().await;
        let other = UdpSocket::bind(loopback()).await.unwrap();
        let dest = BacnetAddress::local(DataLinkAddress::Ip(other.local_addr().unwrap()));

        let sent = transport
            .send(&[0x81, 0x0A, 0x00, 0x06, 0x01, 0x00], &Npdu::new(0), &dest)
            .await
            .unwrap();
        assert_eq!(sent, 6);

        let mut buf = [0u8; 16];
        let (n, _) = other.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x81, 0x0A, 0x00, 0x06, 0x01, 0x00]);
        assert!(timeout(Duration::from_millis(50), peer.recv_from(&mut buf))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn broadcasts_go_to_broadcast_address() {
        let (transport, peer) = transport_with_peer().await;
        let mut buf = [0u8; 16];
        for dest in [
            BacnetAddress::local_broadcast(),
            BacnetAddress::global_broadcast(),
            BacnetAddress::remote_broadcast(7),
        ] {
            transport
                .send(&[0x81, 0x0B, 0x00, 0x04], &Npdu::new(0), &dest)
                .await
                .unwrap();
            let (n, src) = peer.recv_from(&mut buf).await.unwrap();
            assert_eq!(n, 4);
            assert_eq!(src, transport.local_addr().unwrap());
        }
    }

    #[tokio::test]
    async fn recv_reports_sender() {
        let (transport, peer) = transport_with_peer().await;
        peer.send_to(&[0x81, 0x0A, 0x00, 0x04], transport.local_addr().unwrap())
            .await
            .unwrap();
        let mut buf = [0u8; 16];
        let (n, src) = transport.recv(&mut buf).await.unwrap();
        assert_eq!(n, 4);
        assert_eq!(src, DataLinkAddress::Ip(peer.local_addr().unwrap()));
    }

    #[tokio::test]
    async fn oversized_frame_is_refused() {
        let (transport, _peer) = transport_with_peer().await;
        let frame = vec![0u8; super::MAX_BIP_FRAME_LEN + 1];
        let err = transport
            .send(&frame, &Npdu::new(0), &BacnetAddress::local_broadcast())
            .await
            .unwrap_err();
        assert!(matches!(err, DataLinkError::FrameTooLarge));
    }

    #[tokio::test]
    async fn close_wakes_pending_recv() {
        let (transport, _peer) = transport_with_peer().await;
        let transport = Arc::new(transport);
        let reader = {
            let transport = transport.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 16];
                transport.recv(&mut buf).await
            })
        };
        tokio::task::yield_now().await;
        transport.close().unwrap();
        transport.close().unwrap();

        let result = timeout(Duration::from_secs(1), reader).await.unwrap().unwrap();
        assert!(matches!(result, Err(DataLinkError::Closed)));

        let mut buf = [0u8; 4];
        assert!(matches!(
            transport.recv(&mut buf).await,
            Err(DataLinkError::Closed)
        ));
        assert!(matches!(
            transport
                .send(&[0x81, 0x0B, 0x00, 0x04], &Npdu::new(0), &BacnetAddress::local_broadcast())
                .await,
            Err(DataLinkError::Closed)
        ));
    }

    #[tokio::test]
    async fn bind_cidr_rejects_bad_network() {
        let err = BacnetIpTransport::bind_cidr("frog/24", 0).await.unwrap_err();
        assert!(matches!(err, DataLinkError::InvalidAddress(_)));
    }
}
