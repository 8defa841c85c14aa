//! Application layer.
//!
//! The header types encode and decode one PDU kind each. [`Apdu::decode`]
//! looks at the type nibble and returns whichever one the frame carries,
//! with the service body left as a borrowed slice.

/// Headers of the confirmed-service exchange (request, acks, error, reject, abort).
pub mod confirmed;
/// Unconfirmed request header.
pub mod unconfirmed;

pub use confirmed::{
    AbortPdu, BacnetError, ComplexAckHeader, ConfirmedRequestHeader, RejectPdu, SegmentAck,
    SimpleAck,
};
pub use unconfirmed::UnconfirmedRequestHeader;

use crate::encoding::reader::Reader;
use crate::DecodeError;

/// PDU type carried in the high nibble of the first APDU octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ApduType {
    ConfirmedRequest = 0,
    UnconfirmedRequest = 1,
    SimpleAck = 2,
    ComplexAck = 3,
    SegmentAck = 4,
    Error = 5,
    Reject = 6,
    Abort = 7,
}

impl ApduType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::ConfirmedRequest,
            1 => Self::UnconfirmedRequest,
            2 => Self::SimpleAck,
            3 => Self::ComplexAck,
            4 => Self::SegmentAck,
            5 => Self::Error,
            6 => Self::Reject,
            7 => Self::Abort,
            _ => return None,
        })
    }

    /// Type of the APDU starting with `first_octet`.
    pub fn of(first_octet: u8) -> Option<Self> {
        Self::from_u8(first_octet >> 4)
    }

    pub(crate) fn check(self, first_octet: u8) -> Result<(), DecodeError> {
        if Self::of(first_octet) == Some(self) {
            Ok(())
        } else {
            Err(DecodeError::InvalidValue)
        }
    }
}

/// One decoded APDU. Service bodies stay undecoded in `payload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apdu<'a> {
    ConfirmedRequest {
        header: ConfirmedRequestHeader,
        payload: &'a [u8],
    },
    UnconfirmedRequest {
        header: UnconfirmedRequestHeader,
        payload: &'a [u8],
    },
    SimpleAck(SimpleAck),
    ComplexAck {
        header: ComplexAckHeader,
        payload: &'a [u8],
    },
    SegmentAck(SegmentAck),
    Error(BacnetError),
    Reject(RejectPdu),
    Abort(AbortPdu),
}

impl<'a> Apdu<'a> {
    pub fn decode(r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let kind = ApduType::of(r.peek_u8()?).ok_or(DecodeError::InvalidValue)?;
        let apdu = match kind {
            ApduType::ConfirmedRequest => Apdu::ConfirmedRequest {
                header: ConfirmedRequestHeader::decode(r)?,
                payload: take_rest(r),
            },
            ApduType::UnconfirmedRequest => Apdu::UnconfirmedRequest {
                header: UnconfirmedRequestHeader::decode(r)?,
                payload: take_rest(r),
            },
            ApduType::SimpleAck => Apdu::SimpleAck(SimpleAck::decode(r)?),
            ApduType::ComplexAck => Apdu::ComplexAck {
                header: ComplexAckHeader::decode(r)?,
                payload: take_rest(r),
            },
            ApduType::SegmentAck => Apdu::SegmentAck(SegmentAck::decode(r)?),
            ApduType::Error => Apdu::Error(BacnetError::decode(r)?),
            ApduType::Reject => Apdu::Reject(RejectPdu::decode(r)?),
            ApduType::Abort => Apdu::Abort(AbortPdu::decode(r)?),
        };
        Ok(apdu)
    }

    pub fn apdu_type(&self) -> ApduType {
        match self {
            Apdu::ConfirmedRequest { .. } => ApduType::ConfirmedRequest,
            Apdu::UnconfirmedRequest { .. } => ApduType::UnconfirmedRequest,
            Apdu::SimpleAck(_) => ApduType::SimpleAck,
            Apdu::ComplexAck { .. } => ApduType::ComplexAck,
            Apdu::SegmentAck(_) => ApduType::SegmentAck,
            Apdu::Error(_) => ApduType::Error,
            Apdu::Reject(_) => ApduType::Reject,
            Apdu::Abort(_) => ApduType::Abort,
        }
    }

    /// Invoke id of confirmed traffic; `None` for unconfirmed requests.
    pub fn invoke_id(&self) -> Option<u8> {
        match self {
            Apdu::ConfirmedRequest { header, .. } => Some(header.invoke_id),
            Apdu::UnconfirmedRequest { .. } => None,
            Apdu::SimpleAck(ack) => Some(ack.invoke_id),
            Apdu::ComplexAck { header, .. } => Some(header.invoke_id),
            Apdu::SegmentAck(ack) => Some(ack.invoke_id),
            Apdu::Error(err) => Some(err.invoke_id),
            Apdu::Reject(rej) => Some(rej.invoke_id),
            Apdu::Abort(abort) => Some(abort.invoke_id),
        }
    }
}

fn take_rest<'a>(r: &mut Reader<'a>) -> &'a [u8] {
    let rest = r.rest();
    // Cannot fail: `rest` is exactly what remains.
    let _ = r.read_exact(rest.len());
    rest
}
