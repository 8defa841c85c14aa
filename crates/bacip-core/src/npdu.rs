use crate::encoding::{reader::Reader, writer::Writer};
use crate::{DecodeError, EncodeError};

/// Network layer protocol version; the only one defined.
pub const NPDU_VERSION: u8 = 0x01;

/// Control octet bits.
pub mod control {
    pub const NETWORK_MESSAGE: u8 = 0x80;
    pub const DESTINATION_PRESENT: u8 = 0x20;
    pub const SOURCE_PRESENT: u8 = 0x08;
    pub const EXPECTING_REPLY: u8 = 0x04;
    pub const PRIORITY_MASK: u8 = 0x03;
}

/// Network number meaning "every network".
pub const GLOBAL_NETWORK: u16 = 0xFFFF;

/// DNET/DADR or SNET/SADR pair. A zero-length MAC on a destination means a
/// broadcast on that network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NpduAddress {
    pub network: u16,
    pub mac: [u8; 6],
    pub mac_len: u8,
}

impl NpduAddress {
    /// Broadcast on `network` (0xFFFF for every network).
    pub const fn broadcast(network: u16) -> Self {
        Self {
            network,
            mac: [0; 6],
            mac_len: 0,
        }
    }

    /// Station `mac` on `network`. MACs longer than six octets are truncated.
    pub fn station(network: u16, mac: &[u8]) -> Self {
        let mut out = Self::broadcast(network);
        let len = mac.len().min(6);
        out.mac[..len].copy_from_slice(&mac[..len]);
        out.mac_len = len as u8;
        out
    }

    pub fn mac(&self) -> &[u8] {
        &self.mac[..(self.mac_len as usize).min(6)]
    }

    pub const fn is_broadcast(&self) -> bool {
        self.mac_len == 0
    }
}

/// Network layer header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Npdu {
    pub control: u8,
    pub destination: Option<NpduAddress>,
    pub source: Option<NpduAddress>,
    pub hop_count: Option<u8>,
    pub message_type: Option<u8>,
    pub vendor_id: Option<u16>,
}

impl Npdu {
    pub const fn new(control: u8) -> Self {
        Self {
            control,
            destination: None,
            source: None,
            hop_count: None,
            message_type: None,
            vendor_id: None,
        }
    }

    /// Header for an application message, routed to `destination` when set.
    pub fn application(expecting_reply: bool, destination: Option<NpduAddress>) -> Self {
        let mut bits = 0;
        if expecting_reply {
            bits |= control::EXPECTING_REPLY;
        }
        if destination.is_some() {
            bits |= control::DESTINATION_PRESENT;
        }
        Self {
            control: bits,
            destination,
            hop_count: destination.map(|_| 255),
            ..Self::new(0)
        }
    }

    pub const fn is_network_message(&self) -> bool {
        self.control & control::NETWORK_MESSAGE != 0
    }

    pub const fn expecting_reply(&self) -> bool {
        self.control & control::EXPECTING_REPLY != 0
    }

    pub const fn priority(&self) -> u8 {
        self.control & control::PRIORITY_MASK
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut bits = self.control & !(control::DESTINATION_PRESENT | control::SOURCE_PRESENT);
        if self.destination.is_some() {
            bits |= control::DESTINATION_PRESENT;
        }
        if self.source.is_some() {
            bits |= control::SOURCE_PRESENT;
        }

        w.write_u8(NPDU_VERSION)?;
        w.write_u8(bits)?;
        if let Some(dest) = &self.destination {
            write_address(w, dest)?;
        }
        if let Some(src) = &self.source {
            write_address(w, src)?;
        }
        if self.destination.is_some() {
            w.write_u8(self.hop_count.unwrap_or(255))?;
        }
        if self.is_network_message() {
            let message_type = self.message_type.unwrap_or(0);
            w.write_u8(message_type)?;
            if message_type >= 0x80 {
                w.write_be_u16(self.vendor_id.unwrap_or(0))?;
            }
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != NPDU_VERSION {
            return Err(DecodeError::InvalidValue);
        }
        let bits = r.read_u8()?;

        let destination = if bits & control::DESTINATION_PRESENT != 0 {
            Some(read_address(r)?)
        } else {
            None
        };
        let source = if bits & control::SOURCE_PRESENT != 0 {
            Some(read_address(r)?)
        } else {
            None
        };
        let hop_count = match destination {
            Some(_) => Some(r.read_u8()?),
            None => None,
        };

        let mut npdu = Self {
            control: bits,
            destination,
            source,
            hop_count,
            message_type: None,
            vendor_id: None,
        };
        if npdu.is_network_message() {
            let message_type = r.read_u8()?;
            npdu.message_type = Some(message_type);
            if message_type >= 0x80 {
                npdu.vendor_id = Some(r.read_be_u16()?);
            }
        }
        Ok(npdu)
    }
}

fn write_address(w: &mut Writer<'_>, addr: &NpduAddress) -> Result<(), EncodeError> {
    if addr.mac_len > 6 {
        return Err(EncodeError::InvalidLength);
    }
    w.write_be_u16(addr.network)?;
    w.write_u8(addr.mac_len)?;
    w.write_all(addr.mac())
}

fn read_address(r: &mut Reader<'_>) -> Result<NpduAddress, DecodeError> {
    let network = r.read_be_u16()?;
    let mac_len = r.read_u8()?;
    if mac_len > 6 {
        return Err(DecodeError::InvalidLength);
    }
    Ok(NpduAddress::station(network, r.read_exact(mac_len as usize)?))
}
