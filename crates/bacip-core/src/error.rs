use core::fmt;

/// Failure while writing a frame into a caller buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// The output slice ran out of room.
    BufferTooSmall,
    ValueOutOfRange,
    InvalidLength,
    Unsupported,
    Message(&'static str),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::BufferTooSmall => "output buffer too small",
            Self::ValueOutOfRange => "value out of range",
            Self::InvalidLength => "invalid length",
            Self::Unsupported => "unsupported encoding",
            Self::Message(msg) => msg,
        };
        f.write_str(text)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// Failure while reading a frame out of a received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The input ended before the structure was complete.
    UnexpectedEof,
    InvalidTag,
    InvalidLength,
    InvalidValue,
    Unsupported,
    Message(&'static str),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnexpectedEof => "unexpected end of input",
            Self::InvalidTag => "invalid tag",
            Self::InvalidLength => "invalid length",
            Self::InvalidValue => "invalid value",
            Self::Unsupported => "unsupported encoding",
            Self::Message(msg) => msg,
        };
        f.write_str(text)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}
