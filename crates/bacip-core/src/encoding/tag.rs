use crate::encoding::{reader::Reader, writer::Writer};
use crate::{DecodeError, EncodeError};

const CLASS_CONTEXT: u8 = 0b0000_1000;
const EXTENDED_TAG_NUMBER: u8 = 0x0F;
const LVT_EXTENDED_LENGTH: u8 = 5;
const LVT_OPENING: u8 = 6;
const LVT_CLOSING: u8 = 7;

/// Application tag numbers (ASHRAE 135 clause 20.2.1.4).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppTag {
    Null = 0,
    Boolean = 1,
    UnsignedInt = 2,
    SignedInt = 3,
    Real = 4,
    Double = 5,
    OctetString = 6,
    CharacterString = 7,
    BitString = 8,
    Enumerated = 9,
    Date = 10,
    Time = 11,
    ObjectId = 12,
}

impl AppTag {
    const ALL: [AppTag; 13] = [
        Self::Null,
        Self::Boolean,
        Self::UnsignedInt,
        Self::SignedInt,
        Self::Real,
        Self::Double,
        Self::OctetString,
        Self::CharacterString,
        Self::BitString,
        Self::Enumerated,
        Self::Date,
        Self::Time,
        Self::ObjectId,
    ];

    pub fn from_u8(value: u8) -> Result<Self, DecodeError> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(DecodeError::InvalidTag)
    }
}

/// One decoded tag header. The content octets, if any, follow in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tag {
    Application { tag: AppTag, len: u32 },
    Context { tag_num: u8, len: u32 },
    Opening { tag_num: u8 },
    Closing { tag_num: u8 },
}

impl Tag {
    pub fn encode(self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Tag::Application { tag, len } => write_header(w, tag as u8, 0, len),
            Tag::Context { tag_num, len } => write_header(w, tag_num, CLASS_CONTEXT, len),
            Tag::Opening { tag_num } => write_initial(w, tag_num, CLASS_CONTEXT | LVT_OPENING),
            Tag::Closing { tag_num } => write_initial(w, tag_num, CLASS_CONTEXT | LVT_CLOSING),
        }
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let initial = r.read_u8()?;
        let tag_num = match initial >> 4 {
            EXTENDED_TAG_NUMBER => r.read_u8()?,
            n => n,
        };
        let lvt = initial & 0x07;

        if initial & CLASS_CONTEXT == 0 {
            let len = read_length(r, lvt)?;
            return Ok(Tag::Application {
                tag: AppTag::from_u8(tag_num)?,
                len,
            });
        }

        match lvt {
            LVT_OPENING => Ok(Tag::Opening { tag_num }),
            LVT_CLOSING => Ok(Tag::Closing { tag_num }),
            _ => Ok(Tag::Context {
                tag_num,
                len: read_length(r, lvt)?,
            }),
        }
    }

    /// Consumes the next tag and fails unless it is `expected`.
    pub fn expect(r: &mut Reader<'_>, expected: Tag) -> Result<(), DecodeError> {
        if Tag::decode(r)? == expected {
            Ok(())
        } else {
            Err(DecodeError::InvalidTag)
        }
    }
}

fn write_initial(w: &mut Writer<'_>, tag_num: u8, low_bits: u8) -> Result<(), EncodeError> {
    if tag_num < EXTENDED_TAG_NUMBER {
        w.write_u8((tag_num << 4) | low_bits)
    } else {
        w.write_u8((EXTENDED_TAG_NUMBER << 4) | low_bits)?;
        w.write_u8(tag_num)
    }
}

fn write_header(w: &mut Writer<'_>, tag_num: u8, class: u8, len: u32) -> Result<(), EncodeError> {
    if len < LVT_EXTENDED_LENGTH as u32 {
        return write_initial(w, tag_num, class | len as u8);
    }

    write_initial(w, tag_num, class | LVT_EXTENDED_LENGTH)?;
    match len {
        0..=253 => w.write_u8(len as u8),
        254..=0xFFFF => {
            w.write_u8(254)?;
            w.write_be_u16(len as u16)
        }
        _ => {
            w.write_u8(255)?;
            w.write_be_u32(len)
        }
    }
}

fn read_length(r: &mut Reader<'_>, lvt: u8) -> Result<u32, DecodeError> {
    if lvt < LVT_EXTENDED_LENGTH {
        return Ok(lvt as u32);
    }
    if lvt > LVT_EXTENDED_LENGTH {
        return Err(DecodeError::InvalidLength);
    }
    match r.read_u8()? {
        254 => r.read_be_u16().map(u32::from),
        255 => r.read_be_u32(),
        short => Ok(short as u32),
    }
}
