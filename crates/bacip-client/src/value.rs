use bacip_core::types::{DataValue, Date, ObjectId, Time};
use core::fmt;

/// Owned copy of a decoded property value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClientDataValue {
    Null,
    Boolean(bool),
    Unsigned(u32),
    Signed(i32),
    Real(f32),
    Double(f64),
    OctetString(Vec<u8>),
    CharacterString(String),
    BitString { unused_bits: u8, data: Vec<u8> },
    Enumerated(u32),
    Date(Date),
    Time(Time),
    ObjectId(ObjectId),
    Constructed { tag_num: u8, values: Vec<ClientDataValue> },
}

impl ClientDataValue {
    pub fn as_unsigned(&self) -> Option<u32> {
        match self {
            Self::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Self::ObjectId(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<DataValue<'_>> for ClientDataValue {
    fn from(value: DataValue<'_>) -> Self {
        match value {
            DataValue::Null => Self::Null,
            DataValue::Boolean(v) => Self::Boolean(v),
            DataValue::Unsigned(v) => Self::Unsigned(v),
            DataValue::Signed(v) => Self::Signed(v),
            DataValue::Real(v) => Self::Real(v),
            DataValue::Double(v) => Self::Double(v),
            DataValue::OctetString(v) => Self::OctetString(v.to_vec()),
            DataValue::CharacterString(v) => Self::CharacterString(v.to_string()),
            DataValue::BitString(v) => Self::BitString {
                unused_bits: v.unused_bits,
                data: v.data.to_vec(),
            },
            DataValue::Enumerated(v) => Self::Enumerated(v),
            DataValue::Date(v) => Self::Date(v),
            DataValue::Time(v) => Self::Time(v),
            DataValue::ObjectId(v) => Self::ObjectId(v),
            DataValue::Constructed { tag_num, values } => Self::Constructed {
                tag_num,
                values: values.into_iter().map(Self::from).collect(),
            },
        }
    }
}

impl fmt::Display for ClientDataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Unsigned(v) | Self::Enumerated(v) => write!(f, "{v}"),
            Self::Signed(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::CharacterString(v) => write!(f, "{v:?}"),
            Self::OctetString(bytes) | Self::BitString { data: bytes, .. } => {
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::Date(d) => write!(f, "{:04}-{:02}-{:02}", 1900 + u16::from(d.year_since_1900), d.month, d.day),
            Self::Time(t) => write!(f, "{:02}:{:02}:{:02}.{:02}", t.hour, t.minute, t.second, t.hundredths),
            Self::ObjectId(id) => write!(f, "{id}"),
            Self::Constructed { values, .. } => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}
