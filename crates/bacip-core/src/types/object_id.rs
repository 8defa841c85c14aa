use crate::types::ObjectType;
use core::fmt;

const INSTANCE_MASK: u32 = 0x003F_FFFF;
const TYPE_SHIFT: u32 = 22;

/// Object type and 22-bit instance number packed the way they travel on the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectId(u32);

impl ObjectId {
    /// Largest instance number an object id can carry.
    pub const MAX_INSTANCE: u32 = INSTANCE_MASK;

    pub const fn new(object_type: ObjectType, instance: u32) -> Self {
        Self(((object_type.to_u16() as u32 & 0x03FF) << TYPE_SHIFT) | (instance & INSTANCE_MASK))
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn object_type(self) -> ObjectType {
        ObjectType::from_u16((self.0 >> TYPE_SHIFT) as u16)
    }

    pub const fn instance(self) -> u32 {
        self.0 & INSTANCE_MASK
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object_type() {
            ObjectType::Proprietary(t) => write!(f, "proprietary-{t}:{}", self.instance()),
            known => write!(f, "{known:?}:{}", self.instance()),
        }
    }
}
