use super::numbered_enum;

numbered_enum! {
    /// Property identifiers the client commonly reads or writes.
    pub enum PropertyId: u32 {
        Description = 28,
        MaxApduLengthAccepted = 62,
        ModelName = 70,
        ObjectIdentifier = 75,
        ObjectList = 76,
        ObjectName = 77,
        ObjectType = 79,
        PresentValue = 85,
        PriorityArray = 87,
        ProtocolVersion = 98,
        SegmentationSupported = 107,
        StatusFlags = 111,
        SystemStatus = 112,
        Units = 117,
        VendorIdentifier = 120,
        VendorName = 121,
    }
    to_u32, from_u32
}
