use crate::apdu::ConfirmedRequestHeader;
use crate::encoding::{
    primitives::{encode_closing_tag, encode_ctx_object_id, encode_ctx_unsigned, encode_opening_tag},
    writer::Writer,
};
use crate::services::value_codec::encode_application_data_value;
use crate::services::write_property::{MAX_PRIORITY, MIN_PRIORITY};
use crate::types::{DataValue, ObjectId, PropertyId};
use crate::EncodeError;

pub const SERVICE_WRITE_PROPERTY_MULTIPLE: u8 = 0x10;

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyWriteSpec<'a> {
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
    pub value: DataValue<'a>,
    pub priority: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteAccessSpecification<'a> {
    pub object_id: ObjectId,
    pub properties: &'a [PropertyWriteSpec<'a>],
}

#[derive(Debug, Clone, PartialEq)]
pub struct WritePropertyMultipleRequest<'a> {
    pub specs: &'a [WriteAccessSpecification<'a>],
    pub invoke_id: u8,
}

impl<'a> WritePropertyMultipleRequest<'a> {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        ConfirmedRequestHeader::new(self.invoke_id, SERVICE_WRITE_PROPERTY_MULTIPLE).encode(w)?;

        for spec in self.specs {
            encode_ctx_object_id(w, 0, spec.object_id)?;
            encode_opening_tag(w, 1)?;
            for prop in spec.properties {
                encode_ctx_unsigned(w, 0, prop.property_id.to_u32())?;
                if let Some(index) = prop.array_index {
                    encode_ctx_unsigned(w, 1, index)?;
                }
                encode_opening_tag(w, 2)?;
                encode_application_data_value(w, &prop.value)?;
                encode_closing_tag(w, 2)?;
                if let Some(priority) = prop.priority {
                    if !(MAX_PRIORITY..=MIN_PRIORITY).contains(&priority) {
                        return Err(EncodeError::ValueOutOfRange);
                    }
                    encode_ctx_unsigned(w, 3, u32::from(priority))?;
                }
            }
            encode_closing_tag(w, 1)?;
        }
        Ok(())
    }
}
