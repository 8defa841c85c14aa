//! Primitive content encodings shared by the service codecs.
//!
//! Unsigned and signed integers use the shortest big-endian form (1 to 4
//! octets). The `app_*` helpers write an application tag first, the `ctx_*`
//! helpers a context tag.

use crate::encoding::{
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::types::ObjectId;
use crate::{DecodeError, EncodeError};

fn unsigned_len(value: u32) -> usize {
    match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}

fn signed_len(value: i32) -> usize {
    match value {
        -0x80..=0x7F => 1,
        -0x8000..=0x7FFF => 2,
        -0x80_0000..=0x7F_FFFF => 3,
        _ => 4,
    }
}

pub fn encode_unsigned(w: &mut Writer<'_>, value: u32) -> Result<usize, EncodeError> {
    let len = unsigned_len(value);
    w.write_all(&value.to_be_bytes()[4 - len..])?;
    Ok(len)
}

pub fn decode_unsigned(r: &mut Reader<'_>, len: usize) -> Result<u32, DecodeError> {
    if !(1..=4).contains(&len) {
        return Err(DecodeError::InvalidLength);
    }
    Ok(r
        .read_exact(len)?
        .iter()
        .fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
}

pub fn encode_signed(w: &mut Writer<'_>, value: i32) -> Result<usize, EncodeError> {
    let len = signed_len(value);
    w.write_all(&value.to_be_bytes()[4 - len..])?;
    Ok(len)
}

pub fn decode_signed(r: &mut Reader<'_>, len: usize) -> Result<i32, DecodeError> {
    if !(1..=4).contains(&len) {
        return Err(DecodeError::InvalidLength);
    }
    let raw = r.read_exact(len)?;
    let fill = if raw[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut out = [fill; 4];
    out[4 - len..].copy_from_slice(raw);
    Ok(i32::from_be_bytes(out))
}

fn write_tagged_unsigned(w: &mut Writer<'_>, tag: Tag, value: u32) -> Result<(), EncodeError> {
    let len = unsigned_len(value);
    let tag = match tag {
        Tag::Application { tag, .. } => Tag::Application {
            tag,
            len: len as u32,
        },
        Tag::Context { tag_num, .. } => Tag::Context {
            tag_num,
            len: len as u32,
        },
        _ => return Err(EncodeError::Unsupported),
    };
    tag.encode(w)?;
    encode_unsigned(w, value).map(|_| ())
}

fn write_tagged_signed(w: &mut Writer<'_>, tag: Tag, value: i32) -> Result<(), EncodeError> {
    let len = signed_len(value) as u32;
    let tag = match tag {
        Tag::Application { tag, .. } => Tag::Application { tag, len },
        Tag::Context { tag_num, .. } => Tag::Context { tag_num, len },
        _ => return Err(EncodeError::Unsupported),
    };
    tag.encode(w)?;
    encode_signed(w, value).map(|_| ())
}

pub fn encode_app_unsigned(w: &mut Writer<'_>, value: u32) -> Result<(), EncodeError> {
    write_tagged_unsigned(
        w,
        Tag::Application {
            tag: AppTag::UnsignedInt,
            len: 0,
        },
        value,
    )
}

pub fn encode_app_enumerated(w: &mut Writer<'_>, value: u32) -> Result<(), EncodeError> {
    write_tagged_unsigned(
        w,
        Tag::Application {
            tag: AppTag::Enumerated,
            len: 0,
        },
        value,
    )
}

pub fn encode_app_signed(w: &mut Writer<'_>, value: i32) -> Result<(), EncodeError> {
    write_tagged_signed(
        w,
        Tag::Application {
            tag: AppTag::SignedInt,
            len: 0,
        },
        value,
    )
}

pub fn encode_app_real(w: &mut Writer<'_>, value: f32) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::Real,
        len: 4,
    }
    .encode(w)?;
    w.write_be_u32(value.to_bits())
}

pub fn encode_app_object_id(w: &mut Writer<'_>, id: ObjectId) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::ObjectId,
        len: 4,
    }
    .encode(w)?;
    w.write_be_u32(id.raw())
}

pub fn encode_ctx_unsigned(w: &mut Writer<'_>, tag_num: u8, value: u32) -> Result<(), EncodeError> {
    write_tagged_unsigned(w, Tag::Context { tag_num, len: 0 }, value)
}

pub fn encode_ctx_signed(w: &mut Writer<'_>, tag_num: u8, value: i32) -> Result<(), EncodeError> {
    write_tagged_signed(w, Tag::Context { tag_num, len: 0 }, value)
}

pub fn encode_ctx_object_id(w: &mut Writer<'_>, tag_num: u8, id: ObjectId) -> Result<(), EncodeError> {
    Tag::Context { tag_num, len: 4 }.encode(w)?;
    w.write_be_u32(id.raw())
}

pub fn encode_opening_tag(w: &mut Writer<'_>, tag_num: u8) -> Result<(), EncodeError> {
    Tag::Opening { tag_num }.encode(w)
}

pub fn encode_closing_tag(w: &mut Writer<'_>, tag_num: u8) -> Result<(), EncodeError> {
    Tag::Closing { tag_num }.encode(w)
}

pub fn decode_app_unsigned(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::UnsignedInt,
            len,
        } => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_enumerated(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::Enumerated,
            len,
        } => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_signed(r: &mut Reader<'_>) -> Result<i32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::SignedInt,
            len,
        } => decode_signed(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_real(r: &mut Reader<'_>) -> Result<f32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::Real,
            len: 4,
        } => r.read_be_u32().map(f32::from_bits),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_object_id(r: &mut Reader<'_>) -> Result<ObjectId, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::ObjectId,
            len: 4,
        } => r.read_be_u32().map(ObjectId::from_raw),
        _ => Err(DecodeError::InvalidTag),
    }
}

/// Reads a context-tagged unsigned that must carry `tag_num`.
pub fn decode_ctx_unsigned(r: &mut Reader<'_>, tag_num: u8) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Context { tag_num: n, len } if n == tag_num => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

/// Reads a context-tagged object identifier that must carry `tag_num`.
pub fn decode_ctx_object_id(r: &mut Reader<'_>, tag_num: u8) -> Result<ObjectId, DecodeError> {
    match Tag::decode(r)? {
        Tag::Context { tag_num: n, len: 4 } if n == tag_num => {
            r.read_be_u32().map(ObjectId::from_raw)
        }
        _ => Err(DecodeError::InvalidTag),
    }
}
