use crate::apdu::ConfirmedRequestHeader;
use crate::encoding::{
    primitives::{encode_closing_tag, encode_ctx_object_id, encode_ctx_unsigned, encode_opening_tag},
    writer::Writer,
};
use crate::types::{ObjectId, PropertyId};
use crate::EncodeError;

#[cfg(feature = "alloc")]
use crate::apdu::ComplexAckHeader;
#[cfg(feature = "alloc")]
use crate::encoding::{
    primitives::{decode_ctx_object_id, decode_unsigned, encode_app_enumerated},
    reader::Reader,
    tag::Tag,
};
#[cfg(feature = "alloc")]
use crate::services::value_codec::{
    decode_application_data_value_from_tag, encode_application_data_value,
};
#[cfg(feature = "alloc")]
use crate::types::DataValue;
#[cfg(feature = "alloc")]
use crate::DecodeError;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

pub const SERVICE_READ_PROPERTY_MULTIPLE: u8 = 0x0E;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyReference {
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
}

impl From<PropertyId> for PropertyReference {
    fn from(property_id: PropertyId) -> Self {
        Self {
            property_id,
            array_index: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadAccessSpecification<'a> {
    pub object_id: ObjectId,
    pub properties: &'a [PropertyReference],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPropertyMultipleRequest<'a> {
    pub specs: &'a [ReadAccessSpecification<'a>],
    pub invoke_id: u8,
}

impl<'a> ReadPropertyMultipleRequest<'a> {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        ConfirmedRequestHeader::new(self.invoke_id, SERVICE_READ_PROPERTY_MULTIPLE).encode(w)?;

        for spec in self.specs {
            encode_ctx_object_id(w, 0, spec.object_id)?;
            encode_opening_tag(w, 1)?;
            for prop in spec.properties {
                encode_ctx_unsigned(w, 0, prop.property_id.to_u32())?;
                if let Some(index) = prop.array_index {
                    encode_ctx_unsigned(w, 1, index)?;
                }
            }
            encode_closing_tag(w, 1)?;
        }
        Ok(())
    }
}

/// Outcome for one property: its value, or the access error the device
/// reported for it.
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, PartialEq)]
pub enum ReadResult<'a> {
    Value(DataValue<'a>),
    Error { error_class: u32, error_code: u32 },
}

#[cfg(feature = "alloc")]
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResultElement<'a> {
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
    pub result: ReadResult<'a>,
}

#[cfg(feature = "alloc")]
#[derive(Debug, Clone, PartialEq)]
pub struct ReadAccessResult<'a> {
    pub object_id: ObjectId,
    pub results: Vec<ReadResultElement<'a>>,
}

#[cfg(feature = "alloc")]
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPropertyMultipleAck<'a> {
    pub results: Vec<ReadAccessResult<'a>>,
}

#[cfg(feature = "alloc")]
impl<'a> ReadPropertyMultipleAck<'a> {
    /// Writes the complete ComplexACK, header included.
    pub fn encode(&self, invoke_id: u8, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        ComplexAckHeader::new(invoke_id, SERVICE_READ_PROPERTY_MULTIPLE).encode(w)?;
        for access in &self.results {
            encode_ctx_object_id(w, 0, access.object_id)?;
            encode_opening_tag(w, 1)?;
            for element in &access.results {
                encode_ctx_unsigned(w, 2, element.property_id.to_u32())?;
                if let Some(index) = element.array_index {
                    encode_ctx_unsigned(w, 3, index)?;
                }
                match &element.result {
                    ReadResult::Value(value) => {
                        encode_opening_tag(w, 4)?;
                        encode_application_data_value(w, value)?;
                        encode_closing_tag(w, 4)?;
                    }
                    ReadResult::Error {
                        error_class,
                        error_code,
                    } => {
                        encode_opening_tag(w, 5)?;
                        encode_app_enumerated(w, *error_class)?;
                        encode_app_enumerated(w, *error_code)?;
                        encode_closing_tag(w, 5)?;
                    }
                }
            }
            encode_closing_tag(w, 1)?;
        }
        Ok(())
    }

    pub fn decode_after_header(r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let mut results = Vec::new();
        while !r.is_empty() {
            let object_id = decode_ctx_object_id(r, 0)?;
            Tag::expect(r, Tag::Opening { tag_num: 1 })?;

            let mut elements = Vec::new();
            loop {
                let property_id = match Tag::decode(r)? {
                    Tag::Closing { tag_num: 1 } => break,
                    Tag::Context { tag_num: 2, len } => {
                        PropertyId::from_u32(decode_unsigned(r, len as usize)?)
                    }
                    _ => return Err(DecodeError::InvalidTag),
                };
                let (array_index, open) = match Tag::decode(r)? {
                    Tag::Context { tag_num: 3, len } => {
                        (Some(decode_unsigned(r, len as usize)?), Tag::decode(r)?)
                    }
                    other => (None, other),
                };
                let result = match open {
                    Tag::Opening { tag_num: 4 } => {
                        let tag = Tag::decode(r)?;
                        let value = decode_application_data_value_from_tag(r, tag)?;
                        Tag::expect(r, Tag::Closing { tag_num: 4 })?;
                        ReadResult::Value(value)
                    }
                    Tag::Opening { tag_num: 5 } => {
                        let error_class = decode_error_field(r)?;
                        let error_code = decode_error_field(r)?;
                        Tag::expect(r, Tag::Closing { tag_num: 5 })?;
                        ReadResult::Error {
                            error_class,
                            error_code,
                        }
                    }
                    _ => return Err(DecodeError::InvalidTag),
                };
                elements.push(ReadResultElement {
                    property_id,
                    array_index,
                    result,
                });
            }
            results.push(ReadAccessResult {
                object_id,
                results: elements,
            });
        }
        Ok(Self { results })
    }
}

#[cfg(feature = "alloc")]
fn decode_error_field(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    use crate::encoding::tag::AppTag;
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::Enumerated,
            len,
        }
        | Tag::Context { len, .. } => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}
