use crate::apdu::UnconfirmedRequestHeader;
use crate::encoding::{primitives::decode_ctx_unsigned, primitives::encode_ctx_unsigned};
use crate::encoding::{reader::Reader, writer::Writer};
use crate::types::ObjectId;
use crate::{DecodeError, EncodeError};

pub const SERVICE_WHO_IS: u8 = 0x08;

/// Who-Is, optionally limited to an inclusive device instance range.
///
/// Both limits are present or neither is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhoIsRequest {
    pub low_limit: Option<u32>,
    pub high_limit: Option<u32>,
}

impl WhoIsRequest {
    /// Every device on the network.
    pub const fn global() -> Self {
        Self {
            low_limit: None,
            high_limit: None,
        }
    }

    pub const fn range(low: u32, high: u32) -> Self {
        Self {
            low_limit: Some(low),
            high_limit: Some(high),
        }
    }

    /// Whether a device with `instance` should answer this request.
    pub fn matches(&self, instance: u32) -> bool {
        match (self.low_limit, self.high_limit) {
            (Some(low), Some(high)) => (low..=high).contains(&instance),
            _ => true,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        UnconfirmedRequestHeader {
            service_choice: SERVICE_WHO_IS,
        }
        .encode(w)?;

        match (self.low_limit, self.high_limit) {
            (Some(low), Some(high)) => {
                if low > ObjectId::MAX_INSTANCE || high > ObjectId::MAX_INSTANCE {
                    return Err(EncodeError::ValueOutOfRange);
                }
                encode_ctx_unsigned(w, 0, low)?;
                encode_ctx_unsigned(w, 1, high)
            }
            (None, None) => Ok(()),
            _ => Err(EncodeError::Message("who-is limits must be given together")),
        }
    }

    pub fn decode_after_header(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.is_empty() {
            return Ok(Self::global());
        }
        let low = decode_ctx_unsigned(r, 0)?;
        let high = decode_ctx_unsigned(r, 1)?;
        Ok(Self::range(low, high))
    }
}
