//! Application-tagged [`DataValue`] encoding.

use crate::encoding::{
    primitives::{decode_signed, decode_unsigned, encode_app_enumerated, encode_app_real},
    primitives::{encode_app_object_id, encode_app_signed, encode_app_unsigned},
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::types::{BitString, DataValue, Date, ObjectId, Time};
use crate::{DecodeError, EncodeError};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Character set octet for ANSI X3.4 / UTF-8.
const CHARSET_UTF8: u8 = 0;

fn content_len(len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::ValueOutOfRange)
}

fn app_header(w: &mut Writer<'_>, tag: AppTag, len: usize) -> Result<(), EncodeError> {
    Tag::Application {
        tag,
        len: content_len(len)?,
    }
    .encode(w)
}

pub fn encode_application_data_value(
    w: &mut Writer<'_>,
    value: &DataValue<'_>,
) -> Result<(), EncodeError> {
    match value {
        DataValue::Null => app_header(w, AppTag::Null, 0),
        DataValue::Boolean(v) => app_header(w, AppTag::Boolean, usize::from(*v)),
        DataValue::Unsigned(v) => encode_app_unsigned(w, *v),
        DataValue::Signed(v) => encode_app_signed(w, *v),
        DataValue::Real(v) => encode_app_real(w, *v),
        DataValue::Double(v) => {
            app_header(w, AppTag::Double, 8)?;
            w.write_all(&v.to_bits().to_be_bytes())
        }
        DataValue::OctetString(bytes) => {
            app_header(w, AppTag::OctetString, bytes.len())?;
            w.write_all(bytes)
        }
        DataValue::CharacterString(text) => {
            app_header(w, AppTag::CharacterString, text.len() + 1)?;
            w.write_u8(CHARSET_UTF8)?;
            w.write_all(text.as_bytes())
        }
        DataValue::BitString(bits) => {
            if bits.unused_bits > 7 {
                return Err(EncodeError::ValueOutOfRange);
            }
            app_header(w, AppTag::BitString, bits.data.len() + 1)?;
            w.write_u8(bits.unused_bits)?;
            w.write_all(bits.data)
        }
        DataValue::Enumerated(v) => encode_app_enumerated(w, *v),
        DataValue::Date(d) => {
            app_header(w, AppTag::Date, 4)?;
            w.write_all(&[d.year_since_1900, d.month, d.day, d.weekday])
        }
        DataValue::Time(t) => {
            app_header(w, AppTag::Time, 4)?;
            w.write_all(&[t.hour, t.minute, t.second, t.hundredths])
        }
        DataValue::ObjectId(id) => encode_app_object_id(w, *id),
        #[cfg(feature = "alloc")]
        DataValue::Constructed { tag_num, values } => {
            Tag::Opening { tag_num: *tag_num }.encode(w)?;
            for child in values {
                encode_application_data_value(w, child)?;
            }
            Tag::Closing { tag_num: *tag_num }.encode(w)
        }
    }
}

pub fn decode_application_data_value<'a>(r: &mut Reader<'a>) -> Result<DataValue<'a>, DecodeError> {
    let tag = Tag::decode(r)?;
    decode_application_data_value_from_tag(r, tag)
}

/// Decodes the value whose tag header has already been consumed.
pub fn decode_application_data_value_from_tag<'a>(
    r: &mut Reader<'a>,
    tag: Tag,
) -> Result<DataValue<'a>, DecodeError> {
    let (app, len) = match tag {
        Tag::Application { tag, len } => (tag, len as usize),
        #[cfg(feature = "alloc")]
        Tag::Opening { tag_num } => return decode_constructed(r, tag_num),
        _ => return Err(DecodeError::Unsupported),
    };

    let value = match app {
        AppTag::Null => DataValue::Null,
        AppTag::Boolean => DataValue::Boolean(len != 0),
        AppTag::UnsignedInt => DataValue::Unsigned(decode_unsigned(r, len)?),
        AppTag::SignedInt => DataValue::Signed(decode_signed(r, len)?),
        AppTag::Enumerated => DataValue::Enumerated(decode_unsigned(r, len)?),
        AppTag::Real => DataValue::Real(f32::from_bits(u32::from_be_bytes(fixed(r, len)?))),
        AppTag::Double => DataValue::Double(f64::from_bits(u64::from_be_bytes(fixed(r, len)?))),
        AppTag::OctetString => DataValue::OctetString(r.read_exact(len)?),
        AppTag::CharacterString => {
            let (charset, text) = split_first(r.read_exact(len)?)?;
            if charset != CHARSET_UTF8 {
                return Err(DecodeError::Unsupported);
            }
            DataValue::CharacterString(
                core::str::from_utf8(text).map_err(|_| DecodeError::InvalidValue)?,
            )
        }
        AppTag::BitString => {
            let (unused_bits, data) = split_first(r.read_exact(len)?)?;
            if unused_bits > 7 {
                return Err(DecodeError::InvalidValue);
            }
            DataValue::BitString(BitString::new(unused_bits, data))
        }
        AppTag::Date => {
            let [year_since_1900, month, day, weekday] = fixed(r, len)?;
            DataValue::Date(Date {
                year_since_1900,
                month,
                day,
                weekday,
            })
        }
        AppTag::Time => {
            let [hour, minute, second, hundredths] = fixed(r, len)?;
            DataValue::Time(Time {
                hour,
                minute,
                second,
                hundredths,
            })
        }
        AppTag::ObjectId => DataValue::ObjectId(ObjectId::from_raw(u32::from_be_bytes(fixed(
            r, len,
        )?))),
    };
    Ok(value)
}

fn fixed<const N: usize>(r: &mut Reader<'_>, len: usize) -> Result<[u8; N], DecodeError> {
    if len != N {
        return Err(DecodeError::InvalidLength);
    }
    r.read_array()
}

fn split_first(raw: &[u8]) -> Result<(u8, &[u8]), DecodeError> {
    raw.split_first()
        .map(|(first, rest)| (*first, rest))
        .ok_or(DecodeError::InvalidLength)
}

#[cfg(feature = "alloc")]
fn decode_constructed<'a>(r: &mut Reader<'a>, tag_num: u8) -> Result<DataValue<'a>, DecodeError> {
    let mut values = Vec::new();
    loop {
        match Tag::decode(r)? {
            Tag::Closing { tag_num: n } if n == tag_num => break,
            Tag::Closing { .. } => return Err(DecodeError::InvalidTag),
            tag => values.push(decode_application_data_value_from_tag(r, tag)?),
        }
    }
    Ok(DataValue::Constructed { tag_num, values })
}
