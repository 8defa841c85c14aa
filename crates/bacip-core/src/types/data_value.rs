use crate::types::ObjectId;

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Application-tagged property value borrowing from the frame it was decoded
/// from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue<'a> {
    Null,
    Boolean(bool),
    Unsigned(u32),
    Signed(i32),
    Real(f32),
    Double(f64),
    OctetString(&'a [u8]),
    CharacterString(&'a str),
    BitString(BitString<'a>),
    Enumerated(u32),
    Date(Date),
    Time(Time),
    ObjectId(ObjectId),
    /// Values bracketed by an opening/closing context tag pair, or several
    /// values returned for a single property.
    #[cfg(feature = "alloc")]
    Constructed {
        tag_num: u8,
        values: Vec<DataValue<'a>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitString<'a> {
    pub unused_bits: u8,
    pub data: &'a [u8],
}

impl<'a> BitString<'a> {
    pub const fn new(unused_bits: u8, data: &'a [u8]) -> Self {
        Self { unused_bits, data }
    }

    /// Number of meaningful bits.
    pub fn len(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.unused_bits as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bit `index`, counting from the most significant bit of the first octet.
    pub fn bit(&self, index: usize) -> Option<bool> {
        if index >= self.len() {
            return None;
        }
        let octet = self.data[index / 8];
        Some(octet & (0x80 >> (index % 8)) != 0)
    }
}

/// Calendar date. `0xFF` in any field means "unspecified".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Date {
    pub year_since_1900: u8,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
}

/// Time of day. `0xFF` in any field means "unspecified".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub hundredths: u8,
}

#[cfg(test)]
mod tests {
    use super::BitString;

    #[test]
    fn status_flags_bits() {
        // in-alarm, fault, overridden, out-of-service
        let flags = BitString::new(4, &[0b0100_0000]);
        assert_eq!(flags.len(), 4);
        assert_eq!(flags.bit(0), Some(false));
        assert_eq!(flags.bit(1), Some(true));
        assert_eq!(flags.bit(4), None);
    }
}
