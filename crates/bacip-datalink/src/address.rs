use bacip_core::npdu::{NpduAddress, GLOBAL_NETWORK};
use core::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};

/// Address of a peer on the local link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataLinkAddress {
    Ip(SocketAddr),
}

impl DataLinkAddress {
    /// UDP port 0xBAC0.
    pub const BACNET_IP_DEFAULT_PORT: u16 = 47808;

    pub fn bacnet_default(addr: IpAddr) -> Self {
        Self::Ip(SocketAddr::new(addr, Self::BACNET_IP_DEFAULT_PORT))
    }

    pub fn as_socket_addr(self) -> SocketAddr {
        match self {
            Self::Ip(addr) => addr,
        }
    }

    /// The six-octet B/IP MAC (address then port) used in NPDU SADR/DADR.
    pub fn to_bip_mac(self) -> Option<[u8; 6]> {
        match self.as_socket_addr() {
            SocketAddr::V4(v4) => {
                let mut mac = [0u8; 6];
                mac[..4].copy_from_slice(&v4.ip().octets());
                mac[4..].copy_from_slice(&v4.port().to_be_bytes());
                Some(mac)
            }
            SocketAddr::V6(_) => None,
        }
    }

    pub fn from_bip_mac(mac: &[u8]) -> Option<Self> {
        let mac: [u8; 6] = mac.try_into().ok()?;
        let ip = Ipv4Addr::new(mac[0], mac[1], mac[2], mac[3]);
        let port = u16::from_be_bytes([mac[4], mac[5]]);
        Some(Self::Ip(SocketAddr::V4(SocketAddrV4::new(ip, port))))
    }
}

impl From<SocketAddr> for DataLinkAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::Ip(addr)
    }
}

impl fmt::Display for DataLinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(addr) => write!(f, "{addr}"),
        }
    }
}

/// Where a request goes: a station on the local link, a station behind a
/// router, or one of the broadcast scopes.
///
/// `mac` is the next hop on this link; `None` means the link's broadcast
/// address. `remote` is the NPDU destination for anything beyond this link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BacnetAddress {
    pub mac: Option<DataLinkAddress>,
    pub remote: Option<NpduAddress>,
}

impl BacnetAddress {
    /// A station directly reachable on this link.
    pub const fn local(mac: DataLinkAddress) -> Self {
        Self {
            mac: Some(mac),
            remote: None,
        }
    }

    /// A station on `network` reached through the router at `router`.
    pub fn routed(router: DataLinkAddress, network: u16, station_mac: &[u8]) -> Self {
        Self {
            mac: Some(router),
            remote: Some(NpduAddress::station(network, station_mac)),
        }
    }

    /// Every station on this link.
    pub const fn local_broadcast() -> Self {
        Self {
            mac: None,
            remote: None,
        }
    }

    /// Every station on every network.
    pub const fn global_broadcast() -> Self {
        Self {
            mac: None,
            remote: Some(NpduAddress::broadcast(GLOBAL_NETWORK)),
        }
    }

    /// Every station on one remote network.
    pub const fn remote_broadcast(network: u16) -> Self {
        Self {
            mac: None,
            remote: Some(NpduAddress::broadcast(network)),
        }
    }

    /// Local or global broadcast.
    pub fn is_broadcast(&self) -> bool {
        match self.remote {
            None => self.mac.is_none(),
            Some(remote) => remote.network == GLOBAL_NETWORK && remote.is_broadcast(),
        }
    }

    /// Broadcast on a specific remote network.
    pub fn is_sub_broadcast(&self) -> bool {
        matches!(self.remote, Some(r) if r.network != GLOBAL_NETWORK && r.is_broadcast())
    }
}

impl From<DataLinkAddress> for BacnetAddress {
    fn from(mac: DataLinkAddress) -> Self {
        Self::local(mac)
    }
}

impl fmt::Display for BacnetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mac {
            Some(mac) => write!(f, "{mac}")?,
            None => f.write_str("broadcast")?,
        }
        if let Some(remote) = &self.remote {
            write!(f, " net {}", remote.network)?;
            if !remote.is_broadcast() {
                f.write_str(" mac ")?;
                for b in remote.mac() {
                    write!(f, "{b:02x}")?;
                }
            }
        }
        Ok(())
    }
}
