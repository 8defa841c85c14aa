use crate::apdu::ApduType;
use crate::encoding::{
    primitives::{decode_unsigned, encode_app_enumerated},
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::{DecodeError, EncodeError};

const SEGMENTED: u8 = 0b0000_1000;
const MORE_FOLLOWS: u8 = 0b0000_0100;
const SEGMENTED_RESPONSE_ACCEPTED: u8 = 0b0000_0010;

const fn type_octet(kind: ApduType, flags: u8) -> u8 {
    ((kind as u8) << 4) | flags
}

fn read_segment_fields(r: &mut Reader<'_>, segmented: bool) -> Result<(Option<u8>, Option<u8>), DecodeError> {
    if segmented {
        Ok((Some(r.read_u8()?), Some(r.read_u8()?)))
    } else {
        Ok((None, None))
    }
}

/// Header of a BACnet-Confirmed-Request-PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfirmedRequestHeader {
    pub segmented: bool,
    pub more_follows: bool,
    pub segmented_response_accepted: bool,
    pub max_segments: u8,
    pub max_apdu: u8,
    pub invoke_id: u8,
    pub sequence_number: Option<u8>,
    pub proposed_window_size: Option<u8>,
    pub service_choice: u8,
}

impl ConfirmedRequestHeader {
    /// Unsegmented request advertising a 1476-octet max APDU.
    pub const fn new(invoke_id: u8, service_choice: u8) -> Self {
        Self {
            segmented: false,
            more_follows: false,
            segmented_response_accepted: false,
            max_segments: 0,
            max_apdu: 5,
            invoke_id,
            sequence_number: None,
            proposed_window_size: None,
            service_choice,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut flags = 0;
        if self.segmented {
            flags |= SEGMENTED;
        }
        if self.more_follows {
            flags |= MORE_FOLLOWS;
        }
        if self.segmented_response_accepted {
            flags |= SEGMENTED_RESPONSE_ACCEPTED;
        }
        w.write_u8(type_octet(ApduType::ConfirmedRequest, flags))?;
        w.write_u8((self.max_segments << 4) | (self.max_apdu & 0x0F))?;
        w.write_u8(self.invoke_id)?;
        if self.segmented {
            w.write_u8(self.sequence_number.unwrap_or(0))?;
            w.write_u8(self.proposed_window_size.unwrap_or(1))?;
        }
        w.write_u8(self.service_choice)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let first = r.read_u8()?;
        ApduType::ConfirmedRequest.check(first)?;
        let segmented = first & SEGMENTED != 0;
        let limits = r.read_u8()?;
        let invoke_id = r.read_u8()?;
        let (sequence_number, proposed_window_size) = read_segment_fields(r, segmented)?;
        Ok(Self {
            segmented,
            more_follows: first & MORE_FOLLOWS != 0,
            segmented_response_accepted: first & SEGMENTED_RESPONSE_ACCEPTED != 0,
            max_segments: limits >> 4,
            max_apdu: limits & 0x0F,
            invoke_id,
            sequence_number,
            proposed_window_size,
            service_choice: r.read_u8()?,
        })
    }
}

/// Header of a BACnet-ComplexACK-PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ComplexAckHeader {
    pub segmented: bool,
    pub more_follows: bool,
    pub invoke_id: u8,
    pub sequence_number: Option<u8>,
    pub proposed_window_size: Option<u8>,
    pub service_choice: u8,
}

impl ComplexAckHeader {
    pub const fn new(invoke_id: u8, service_choice: u8) -> Self {
        Self {
            segmented: false,
            more_follows: false,
            invoke_id,
            sequence_number: None,
            proposed_window_size: None,
            service_choice,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut flags = 0;
        if self.segmented {
            flags |= SEGMENTED;
        }
        if self.more_follows {
            flags |= MORE_FOLLOWS;
        }
        w.write_u8(type_octet(ApduType::ComplexAck, flags))?;
        w.write_u8(self.invoke_id)?;
        if self.segmented {
            w.write_u8(self.sequence_number.unwrap_or(0))?;
            w.write_u8(self.proposed_window_size.unwrap_or(1))?;
        }
        w.write_u8(self.service_choice)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let first = r.read_u8()?;
        ApduType::ComplexAck.check(first)?;
        let segmented = first & SEGMENTED != 0;
        let invoke_id = r.read_u8()?;
        let (sequence_number, proposed_window_size) = read_segment_fields(r, segmented)?;
        Ok(Self {
            segmented,
            more_follows: first & MORE_FOLLOWS != 0,
            invoke_id,
            sequence_number,
            proposed_window_size,
            service_choice: r.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimpleAck {
    pub invoke_id: u8,
    pub service_choice: u8,
}

impl SimpleAck {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(type_octet(ApduType::SimpleAck, 0))?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.service_choice)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        ApduType::SimpleAck.check(r.read_u8()?)?;
        Ok(Self {
            invoke_id: r.read_u8()?,
            service_choice: r.read_u8()?,
        })
    }
}

/// BACnet-Error-PDU. Class and code are optional because some devices send
/// the bare three-octet form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BacnetError {
    pub invoke_id: u8,
    pub service_choice: u8,
    pub error_class: Option<u32>,
    pub error_code: Option<u32>,
}

impl BacnetError {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(type_octet(ApduType::Error, 0))?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.service_choice)?;
        if let (Some(class), Some(code)) = (self.error_class, self.error_code) {
            encode_app_enumerated(w, class)?;
            encode_app_enumerated(w, code)?;
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        ApduType::Error.check(r.read_u8()?)?;
        let mut out = Self {
            invoke_id: r.read_u8()?,
            service_choice: r.read_u8()?,
            error_class: None,
            error_code: None,
        };
        if r.is_empty() {
            return Ok(out);
        }

        // Some services wrap the pair in context tag [0].
        let mut first = Tag::decode(r)?;
        let wrapped = first == Tag::Opening { tag_num: 0 };
        if wrapped {
            first = Tag::decode(r)?;
        }
        out.error_class = Some(error_field(r, first, 0)?);
        let second = Tag::decode(r)?;
        out.error_code = Some(error_field(r, second, 1)?);
        if wrapped {
            Tag::expect(r, Tag::Closing { tag_num: 0 })?;
        }
        Ok(out)
    }
}

fn error_field(r: &mut Reader<'_>, tag: Tag, context_tag: u8) -> Result<u32, DecodeError> {
    match tag {
        Tag::Application {
            tag: AppTag::Enumerated,
            len,
        } => decode_unsigned(r, len as usize),
        Tag::Context { tag_num, len } if tag_num == context_tag => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RejectPdu {
    pub invoke_id: u8,
    pub reason: u8,
}

impl RejectPdu {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(type_octet(ApduType::Reject, 0))?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.reason)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        ApduType::Reject.check(r.read_u8()?)?;
        Ok(Self {
            invoke_id: r.read_u8()?,
            reason: r.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AbortPdu {
    pub server: bool,
    pub invoke_id: u8,
    pub reason: u8,
}

impl AbortPdu {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(type_octet(ApduType::Abort, u8::from(self.server)))?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.reason)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let first = r.read_u8()?;
        ApduType::Abort.check(first)?;
        Ok(Self {
            server: first & 0x01 != 0,
            invoke_id: r.read_u8()?,
            reason: r.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SegmentAck {
    pub negative_ack: bool,
    pub sent_by_server: bool,
    pub invoke_id: u8,
    pub sequence_number: u8,
    pub actual_window_size: u8,
}

impl SegmentAck {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let flags = (u8::from(self.negative_ack) << 1) | u8::from(self.sent_by_server);
        w.write_u8(type_octet(ApduType::SegmentAck, flags))?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.sequence_number)?;
        w.write_u8(self.actual_window_size)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let first = r.read_u8()?;
        ApduType::SegmentAck.check(first)?;
        Ok(Self {
            negative_ack: first & 0x02 != 0,
            sent_by_server: first & 0x01 != 0,
            invoke_id: r.read_u8()?,
            sequence_number: r.read_u8()?,
            actual_window_size: r.read_u8()?,
        })
    }
}
