use crate::apdu::ConfirmedRequestHeader;
use crate::encoding::{
    primitives::{encode_closing_tag, encode_ctx_object_id, encode_ctx_unsigned, encode_opening_tag},
    writer::Writer,
};
use crate::services::value_codec::encode_application_data_value;
use crate::types::{DataValue, ObjectId, PropertyId};
use crate::EncodeError;

pub const SERVICE_WRITE_PROPERTY: u8 = 0x0F;

/// Highest command priority; 16 is the lowest.
pub const MAX_PRIORITY: u8 = 1;
pub const MIN_PRIORITY: u8 = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct WritePropertyRequest<'a> {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub value: DataValue<'a>,
    pub array_index: Option<u32>,
    pub priority: Option<u8>,
    pub invoke_id: u8,
}

impl<'a> WritePropertyRequest<'a> {
    /// Write of `value` to the present-value of `object_id` with no priority.
    pub fn present_value(object_id: ObjectId, value: DataValue<'a>) -> Self {
        Self {
            object_id,
            property_id: PropertyId::PresentValue,
            value,
            array_index: None,
            priority: None,
            invoke_id: 0,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if matches!(self.priority, Some(p) if !(MAX_PRIORITY..=MIN_PRIORITY).contains(&p)) {
            return Err(EncodeError::ValueOutOfRange);
        }

        ConfirmedRequestHeader::new(self.invoke_id, SERVICE_WRITE_PROPERTY).encode(w)?;
        encode_ctx_object_id(w, 0, self.object_id)?;
        encode_ctx_unsigned(w, 1, self.property_id.to_u32())?;
        if let Some(index) = self.array_index {
            encode_ctx_unsigned(w, 2, index)?;
        }
        encode_opening_tag(w, 3)?;
        encode_application_data_value(w, &self.value)?;
        encode_closing_tag(w, 3)?;
        if let Some(priority) = self.priority {
            encode_ctx_unsigned(w, 4, u32::from(priority))?;
        }
        Ok(())
    }
}
