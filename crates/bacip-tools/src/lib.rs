use bacip_core::types::{ObjectType, PropertyId};
use bacip_datalink::{BacnetAddress, DataLinkAddress};
use clap::{Args, ValueEnum};
use std::net::IpAddr;

/// Local interface options shared by every tool.
#[derive(Debug, Clone, Args)]
pub struct NetworkArgs {
    /// Interface address with prefix length, e.g. 192.168.1.20/24.
    #[arg(long)]
    pub cidr: String,
    #[arg(long, default_value_t = 47808)]
    pub port: u16,
}

/// Target device options for tools that talk to one station.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    #[arg(long)]
    pub ip: IpAddr,
    #[arg(long, default_value_t = 47808)]
    pub target_port: u16,
    /// Remote network number when the device sits behind a router at `ip`.
    #[arg(long, requires = "mac")]
    pub network: Option<u16>,
    /// Station MAC on the remote network, as hex bytes (e.g. 0a or c0a8010abac0).
    #[arg(long, value_parser = parse_mac)]
    pub mac: Option<StationMac>,
}

/// Station MAC bytes on a remote network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationMac(pub Vec<u8>);

impl TargetArgs {
    pub fn address(&self) -> BacnetAddress {
        let hop = DataLinkAddress::Ip((self.ip, self.target_port).into());
        match (self.network, &self.mac) {
            (Some(network), Some(mac)) => BacnetAddress::routed(hop, network, &mac.0),
            _ => BacnetAddress::local(hop),
        }
    }
}

fn parse_mac(text: &str) -> Result<StationMac, String> {
    if !text.is_ascii() || text.is_empty() || text.len() % 2 != 0 || text.len() > 12 {
        return Err(format!("expected 1 to 6 hex bytes, got {text:?}"));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect::<Result<Vec<u8>, String>>()
        .map(StationMac)
}

/// CLI-friendly names for BACnet object types.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ObjectTypeArg {
    AnalogInput,
    AnalogOutput,
    AnalogValue,
    BinaryInput,
    BinaryOutput,
    BinaryValue,
    Calendar,
    Device,
    MultiStateInput,
    MultiStateOutput,
    MultiStateValue,
    NetworkPort,
    Schedule,
    TrendLog,
}

impl ObjectTypeArg {
    pub const fn into_object_type(self) -> ObjectType {
        match self {
            Self::AnalogInput => ObjectType::AnalogInput,
            Self::AnalogOutput => ObjectType::AnalogOutput,
            Self::AnalogValue => ObjectType::AnalogValue,
            Self::BinaryInput => ObjectType::BinaryInput,
            Self::BinaryOutput => ObjectType::BinaryOutput,
            Self::BinaryValue => ObjectType::BinaryValue,
            Self::Calendar => ObjectType::Calendar,
            Self::Device => ObjectType::Device,
            Self::MultiStateInput => ObjectType::MultiStateInput,
            Self::MultiStateOutput => ObjectType::MultiStateOutput,
            Self::MultiStateValue => ObjectType::MultiStateValue,
            Self::NetworkPort => ObjectType::NetworkPort,
            Self::Schedule => ObjectType::Schedule,
            Self::TrendLog => ObjectType::TrendLog,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PropertyArg {
    Description,
    ModelName,
    ObjectList,
    ObjectName,
    PresentValue,
    StatusFlags,
    Units,
    VendorName,
}

impl PropertyArg {
    pub const fn into_property_id(self) -> PropertyId {
        match self {
            Self::Description => PropertyId::Description,
            Self::ModelName => PropertyId::ModelName,
            Self::ObjectList => PropertyId::ObjectList,
            Self::ObjectName => PropertyId::ObjectName,
            Self::PresentValue => PropertyId::PresentValue,
            Self::StatusFlags => PropertyId::StatusFlags,
            Self::Units => PropertyId::Units,
            Self::VendorName => PropertyId::VendorName,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_mac, StationMac, TargetArgs};
    use bacip_datalink::{BacnetAddress, DataLinkAddress};

    #[test]
    fn parses_hex_mac() {
        assert_eq!(parse_mac("0a").unwrap(), StationMac(vec![0x0A]));
        assert_eq!(
            parse_mac("c0a8010abac0").unwrap(),
            StationMac(vec![0xC0, 0xA8, 0x01, 0x0A, 0xBA, 0xC0])
        );
        assert!(parse_mac("").is_err());
        assert!(parse_mac("abc").is_err());
        assert!(parse_mac("zz").is_err());
        assert!(parse_mac("00112233445566").is_err());
    }

    #[test]
    fn routed_target_needs_network_and_mac() {
        let mut target = TargetArgs {
            ip: "10.0.0.5".parse().unwrap(),
            target_port: 47808,
            network: None,
            mac: None,
        };
        let hop = DataLinkAddress::Ip(([10, 0, 0, 5], 47808).into());
        assert_eq!(target.address(), BacnetAddress::local(hop));

        target.network = Some(12);
        target.mac = Some(StationMac(vec![0x21]));
        assert_eq!(target.address(), BacnetAddress::routed(hop, 12, &[0x21]));
    }
}
