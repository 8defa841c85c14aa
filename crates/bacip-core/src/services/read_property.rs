use crate::apdu::{ComplexAckHeader, ConfirmedRequestHeader};
use crate::encoding::{
    primitives::{
        decode_ctx_object_id, decode_ctx_unsigned, decode_unsigned, encode_closing_tag,
        encode_ctx_object_id, encode_ctx_unsigned, encode_opening_tag,
    },
    reader::Reader,
    tag::Tag,
    writer::Writer,
};
use crate::services::value_codec::{
    decode_application_data_value_from_tag, encode_application_data_value,
};
use crate::types::{DataValue, ObjectId, PropertyId};
use crate::{DecodeError, EncodeError};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

pub const SERVICE_READ_PROPERTY: u8 = 0x0C;

/// Context tag that brackets the property value.
const VALUE_TAG: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPropertyRequest {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
    pub invoke_id: u8,
}

impl ReadPropertyRequest {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        ConfirmedRequestHeader::new(self.invoke_id, SERVICE_READ_PROPERTY).encode(w)?;
        encode_ctx_object_id(w, 0, self.object_id)?;
        encode_ctx_unsigned(w, 1, self.property_id.to_u32())?;
        if let Some(index) = self.array_index {
            encode_ctx_unsigned(w, 2, index)?;
        }
        Ok(())
    }
}

/// ReadProperty-ACK body.
///
/// A property that answers with more than one value (a list, or a whole
/// array) decodes as [`DataValue::Constructed`] with tag number 3.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPropertyAck<'a> {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
    pub value: DataValue<'a>,
}

impl<'a> ReadPropertyAck<'a> {
    /// Writes the complete ComplexACK, header included.
    pub fn encode(&self, invoke_id: u8, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        ComplexAckHeader::new(invoke_id, SERVICE_READ_PROPERTY).encode(w)?;
        encode_ctx_object_id(w, 0, self.object_id)?;
        encode_ctx_unsigned(w, 1, self.property_id.to_u32())?;
        if let Some(index) = self.array_index {
            encode_ctx_unsigned(w, 2, index)?;
        }
        encode_opening_tag(w, VALUE_TAG)?;
        match &self.value {
            #[cfg(feature = "alloc")]
            DataValue::Constructed {
                tag_num: VALUE_TAG,
                values,
            } => {
                for value in values {
                    encode_application_data_value(w, value)?;
                }
            }
            value => encode_application_data_value(w, value)?,
        }
        encode_closing_tag(w, VALUE_TAG)
    }

    pub fn decode_after_header(r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let object_id = decode_ctx_object_id(r, 0)?;
        let property_id = PropertyId::from_u32(decode_ctx_unsigned(r, 1)?);

        let (array_index, open) = match Tag::decode(r)? {
            Tag::Context { tag_num: 2, len } => {
                (Some(decode_unsigned(r, len as usize)?), Tag::decode(r)?)
            }
            other => (None, other),
        };
        if open != (Tag::Opening { tag_num: VALUE_TAG }) {
            return Err(DecodeError::InvalidTag);
        }

        Ok(Self {
            object_id,
            property_id,
            array_index,
            value: decode_property_value(r)?,
        })
    }
}

#[cfg(feature = "alloc")]
fn decode_property_value<'a>(r: &mut Reader<'a>) -> Result<DataValue<'a>, DecodeError> {
    let mut values = Vec::new();
    loop {
        match Tag::decode(r)? {
            Tag::Closing { tag_num: VALUE_TAG } => break,
            tag => values.push(decode_application_data_value_from_tag(r, tag)?),
        }
    }
    match values.len() {
        0 => Err(DecodeError::InvalidValue),
        1 => Ok(values.remove(0)),
        _ => Ok(DataValue::Constructed {
            tag_num: VALUE_TAG,
            values,
        }),
    }
}

#[cfg(not(feature = "alloc"))]
fn decode_property_value<'a>(r: &mut Reader<'a>) -> Result<DataValue<'a>, DecodeError> {
    let tag = Tag::decode(r)?;
    let value = decode_application_data_value_from_tag(r, tag)?;
    Tag::expect(r, Tag::Closing { tag_num: VALUE_TAG })?;
    Ok(value)
}
