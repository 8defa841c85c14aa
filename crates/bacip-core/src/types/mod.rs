mod data_value;
mod enums;
mod object_id;
mod object_type;
mod property_id;

pub use data_value::{BitString, DataValue, Date, Time};
pub use enums::{ErrorClass, ErrorCode, MaxApdu, Segmentation};
pub use object_id::ObjectId;
pub use object_type::ObjectType;
pub use property_id::PropertyId;

/// Declares a fieldless enum with a catch-all `Proprietary` variant and the
/// numeric conversions in both directions.
macro_rules! numbered_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $repr:ty {
            $($variant:ident = $value:literal,)*
        }
        $to:ident, $from:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $($variant,)*
            Proprietary($repr),
        }

        impl $name {
            pub const fn $to(self) -> $repr {
                match self {
                    $(Self::$variant => $value,)*
                    Self::Proprietary(v) => v,
                }
            }

            pub const fn $from(value: $repr) -> Self {
                match value {
                    $($value => Self::$variant,)*
                    v => Self::Proprietary(v),
                }
            }
        }
    };
}

pub(crate) use numbered_enum;
