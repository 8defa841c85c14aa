use super::numbered_enum;

numbered_enum! {
    /// Segmentation support advertised in I-Am.
    pub enum Segmentation: u32 {
        SegmentedBoth = 0,
        SegmentedTransmit = 1,
        SegmentedReceive = 2,
        NoSegmentation = 3,
    }
    to_u32, from_u32
}

numbered_enum! {
    /// Encoded max-APDU field of a confirmed request header.
    pub enum MaxApdu: u8 {
        UpTo50 = 0,
        UpTo128 = 1,
        UpTo206 = 2,
        UpTo480 = 3,
        UpTo1024 = 4,
        UpTo1476 = 5,
    }
    to_u8, from_u8
}

impl MaxApdu {
    /// Octet count the encoded value stands for, if it is a standard one.
    pub const fn octets(self) -> Option<u16> {
        match self {
            Self::UpTo50 => Some(50),
            Self::UpTo128 => Some(128),
            Self::UpTo206 => Some(206),
            Self::UpTo480 => Some(480),
            Self::UpTo1024 => Some(1024),
            Self::UpTo1476 => Some(1476),
            Self::Proprietary(_) => None,
        }
    }
}

numbered_enum! {
    /// Error class carried by an Error PDU.
    pub enum ErrorClass: u32 {
        Device = 0,
        Object = 1,
        Property = 2,
        Resources = 3,
        Security = 4,
        Services = 5,
        Vt = 6,
        Communication = 7,
    }
    to_u32, from_u32
}

numbered_enum! {
    /// Error code carried by an Error PDU. Only codes a client typically
    /// acts on are named.
    pub enum ErrorCode: u32 {
        Other = 0,
        ConfigurationInProgress = 2,
        DeviceBusy = 3,
        InconsistentParameters = 7,
        InvalidDataType = 9,
        MissingRequiredParameter = 16,
        NoSpaceForObject = 18,
        ServiceRequestDenied = 29,
        Timeout = 30,
        UnknownObject = 31,
        UnknownProperty = 32,
        ValueOutOfRange = 37,
        WriteAccessDenied = 40,
        PropertyIsNotAnArray = 50,
        InvalidArrayIndex = 42,
    }
    to_u32, from_u32
}

#[cfg(test)]
mod tests {
    use super::{ErrorClass, ErrorCode, MaxApdu};

    #[test]
    fn max_apdu_octets() {
        assert_eq!(MaxApdu::from_u8(5).octets(), Some(1476));
        assert_eq!(MaxApdu::from_u8(9).octets(), None);
    }

    #[test]
    fn error_pair_from_wire() {
        assert_eq!(ErrorClass::from_u32(2), ErrorClass::Property);
        assert_eq!(ErrorCode::from_u32(32), ErrorCode::UnknownProperty);
        assert_eq!(ErrorCode::from_u32(999), ErrorCode::Proprietary(999));
    }
}
