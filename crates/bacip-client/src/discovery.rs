use bacip_core::services::i_am::IAmRequest;
use bacip_core::types::{ObjectId, Segmentation};
use bacip_datalink::BacnetAddress;

/// A device that answered a Who-Is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiscoveredDevice {
    /// Where to send requests. Routed devices keep their network number and
    /// MAC in `address.remote`.
    pub address: BacnetAddress,
    pub device_id: ObjectId,
    pub max_apdu: u32,
    pub segmentation: Segmentation,
    pub vendor_id: u32,
}

impl DiscoveredDevice {
    pub fn from_i_am(address: BacnetAddress, i_am: &IAmRequest) -> Self {
        Self {
            address,
            device_id: i_am.device_id,
            max_apdu: i_am.max_apdu,
            segmentation: i_am.segmentation,
            vendor_id: i_am.vendor_id,
        }
    }

    pub fn instance(&self) -> u32 {
        self.device_id.instance()
    }
}
