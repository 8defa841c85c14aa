use crate::BacnetAddress;
use bacip_core::encoding::{reader::Reader, writer::Writer};
use bacip_core::{DecodeError, EncodeError};
use std::net::{Ipv4Addr, SocketAddrV4};

pub const BVLC_TYPE_BIP: u8 = 0x81;
/// Type, function and length octets.
pub const BVLC_HEADER_LEN: usize = 4;
/// Header plus the six-octet originating B/IP address.
pub const BVLC_FORWARDED_HEADER_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvlcFunction {
    Result,
    WriteBroadcastDistributionTable,
    ReadBroadcastDistributionTable,
    ReadBroadcastDistributionTableAck,
    ForwardedNpdu,
    RegisterForeignDevice,
    ReadForeignDeviceTable,
    ReadForeignDeviceTableAck,
    DeleteForeignDeviceTableEntry,
    DistributeBroadcastToNetwork,
    OriginalUnicastNpdu,
    OriginalBroadcastNpdu,
    Unknown(u8),
}

impl BvlcFunction {
    const KNOWN: [BvlcFunction; 12] = [
        Self::Result,
        Self::WriteBroadcastDistributionTable,
        Self::ReadBroadcastDistributionTable,
        Self::ReadBroadcastDistributionTableAck,
        Self::ForwardedNpdu,
        Self::RegisterForeignDevice,
        Self::ReadForeignDeviceTable,
        Self::ReadForeignDeviceTableAck,
        Self::DeleteForeignDeviceTableEntry,
        Self::DistributeBroadcastToNetwork,
        Self::OriginalUnicastNpdu,
        Self::OriginalBroadcastNpdu,
    ];

    pub fn from_u8(value: u8) -> Self {
        Self::KNOWN
            .get(value as usize)
            .copied()
            .unwrap_or(Self::Unknown(value))
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Unknown(v) => v,
            known => Self::KNOWN
                .iter()
                .position(|f| *f == known)
                .map_or(0xFF, |i| i as u8),
        }
    }

    /// Function for an NPDU originating here: broadcast for any broadcast
    /// scope, unicast otherwise.
    pub fn original_for(destination: &BacnetAddress) -> Self {
        if destination.is_broadcast() || destination.is_sub_broadcast() {
            Self::OriginalBroadcastNpdu
        } else {
            Self::OriginalUnicastNpdu
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvlcHeader {
    pub function: BvlcFunction,
    /// Length of the whole frame, header included.
    pub length: u16,
}

impl BvlcHeader {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(BVLC_TYPE_BIP)?;
        w.write_u8(self.function.to_u8())?;
        w.write_be_u16(self.length)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != BVLC_TYPE_BIP {
            return Err(DecodeError::InvalidValue);
        }
        let function = BvlcFunction::from_u8(r.read_u8()?);
        let length = r.read_be_u16()?;
        if (length as usize) < BVLC_HEADER_LEN {
            return Err(DecodeError::InvalidLength);
        }
        Ok(Self { function, length })
    }
}

/// A received datagram split into its BVLC header and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvlcFrame<'a> {
    pub header: BvlcHeader,
    /// Originating station of a Forwarded-NPDU.
    pub origin: Option<SocketAddrV4>,
    pub payload: &'a [u8],
}

impl<'a> BvlcFrame<'a> {
    /// Decodes `datagram`, checking the length field against the datagram
    /// size. Trailing bytes beyond the declared length are ignored.
    pub fn decode(datagram: &'a [u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(datagram);
        let header = BvlcHeader::decode(&mut r)?;
        let body = r.read_exact(header.length as usize - BVLC_HEADER_LEN)?;

        if header.function != BvlcFunction::ForwardedNpdu {
            return Ok(Self {
                header,
                origin: None,
                payload: body,
            });
        }

        let mut r = Reader::new(body);
        let [a, b, c, d] = r.read_array()?;
        let port = r.read_be_u16()?;
        Ok(Self {
            header,
            origin: Some(SocketAddrV4::new(Ipv4Addr::new(a, b, c, d), port)),
            payload: r.rest(),
        })
    }
}

/// Writes a complete frame: header with `function`, then `payload`.
pub fn encode_frame(
    w: &mut Writer<'_>,
    function: BvlcFunction,
    payload: &[u8],
) -> Result<(), EncodeError> {
    let length = u16::try_from(BVLC_HEADER_LEN + payload.len())
        .map_err(|_| EncodeError::ValueOutOfRange)?;
    BvlcHeader { function, length }.encode(w)?;
    w.write_all(payload)
}

#[cfg(test)]
mod tests {
    use super::{encode_frame, BvlcFrame, BvlcFunction, BvlcHeader, BVLC_TYPE_BIP};
    use crate::{BacnetAddress, DataLinkAddress};
    use bacip_core::encoding::{reader::Reader, writer::Writer};
    use bacip_core::DecodeError;
    use std::net::{Ipv4Addr, SocketAddrV4};

    #[test]
    fn function_codes_map_both_ways() {
        for code in 0u8..=0x0B {
            assert_eq!(BvlcFunction::from_u8(code).to_u8(), code);
        }
        assert_eq!(BvlcFunction::from_u8(0x0B), BvlcFunction::OriginalBroadcastNpdu);
        assert_eq!(BvlcFunction::from_u8(0x99), BvlcFunction::Unknown(0x99));
        assert_eq!(BvlcFunction::Unknown(0x99).to_u8(), 0x99);
    }

    #[test]
    fn broadcast_scopes_use_broadcast_function() {
        let station = DataLinkAddress::Ip(([10, 0, 0, 9], 47808).into());
        for (dest, expected) in [
            (BacnetAddress::local_broadcast(), BvlcFunction::OriginalBroadcastNpdu),
            (BacnetAddress::global_broadcast(), BvlcFunction::OriginalBroadcastNpdu),
            (BacnetAddress::remote_broadcast(3), BvlcFunction::OriginalBroadcastNpdu),
            (BacnetAddress::local(station), BvlcFunction::OriginalUnicastNpdu),
            (BacnetAddress::routed(station, 3, &[0x21]), BvlcFunction::OriginalUnicastNpdu),
        ] {
            assert_eq!(BvlcFunction::original_for(&dest), expected, "{dest}");
        }
    }

    #[test]
    fn unicast_frame_layout() {
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        encode_frame(&mut w, BvlcFunction::OriginalUnicastNpdu, &[0x01, 0x04]).unwrap();
        assert_eq!(w.as_written(), &[BVLC_TYPE_BIP, 0x0A, 0x00, 0x06, 0x01, 0x04]);

        let frame = BvlcFrame::decode(w.as_written()).unwrap();
        assert_eq!(frame.header.length, 6);
        assert_eq!(frame.origin, None);
        assert_eq!(frame.payload, &[0x01, 0x04]);
    }

    #[test]
    fn forwarded_frame_exposes_origin() {
        let datagram = [
            0x81, 0x04, 0x00, 0x0C, 10, 1, 2, 3, 0xBA, 0xC0, 0x01, 0x00,
        ];
        let frame = BvlcFrame::decode(&datagram).unwrap();
        assert_eq!(
            frame.origin,
            Some(SocketAddrV4::new(Ipv4Addr::new(10, 1, 2, 3), 47808))
        );
        assert_eq!(frame.payload, &[0x01, 0x00]);
    }

    #[test]
    fn declared_length_beyond_datagram_is_rejected() {
        let err = BvlcFrame::decode(&[0x81, 0x0A, 0x00, 0x20, 0x01, 0x00]).unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedEof);
    }

    #[test]
    fn short_length_and_wrong_type_are_rejected() {
        let mut r = Reader::new(&[0x81, 0x0A, 0x00, 0x03]);
        assert_eq!(BvlcHeader::decode(&mut r).unwrap_err(), DecodeError::InvalidLength);
        let mut r = Reader::new(&[0x82, 0x0A, 0x00, 0x04]);
        assert_eq!(BvlcHeader::decode(&mut r).unwrap_err(), DecodeError::InvalidValue);
    }

    #[test]
    fn forwarded_frame_without_origin_is_truncated() {
        let err = BvlcFrame::decode(&[0x81, 0x04, 0x00, 0x07, 10, 1, 2]).unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedEof);
    }
}
