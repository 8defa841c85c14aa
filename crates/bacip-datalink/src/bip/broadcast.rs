use crate::DataLinkError;
use std::net::Ipv4Addr;

/// Directed broadcast address of the IPv4 network written as `a.b.c.d/len`.
///
/// `"192.168.23.1/24"` yields `192.168.23.255`.
pub fn broadcast_address(cidr: &str) -> Result<Ipv4Addr, DataLinkError> {
    let invalid = || DataLinkError::InvalidAddress(cidr.to_string());

    let (ip, prefix) = cidr.trim().split_once('/').ok_or_else(invalid)?;
    let ip: Ipv4Addr = ip.parse().map_err(|_| invalid())?;
    let prefix: u32 = prefix.parse().map_err(|_| invalid())?;
    if prefix > 32 {
        return Err(invalid());
    }

    let host_mask = u32::MAX.checked_shr(prefix).unwrap_or(0);
    Ok(Ipv4Addr::from(u32::from(ip) | host_mask))
}

#[cfg(test)]
mod tests {
    use super::broadcast_address;
    use crate::DataLinkError;
    use std::net::Ipv4Addr;

    #[test]
    fn malformed_cidrs_are_rejected() {
        for bad in ["frog", "frog/dog", "frog/24", "16.18.dog/32", "10.0.0.1/33", "10.0.0.1"] {
            match broadcast_address(bad) {
                Err(DataLinkError::InvalidAddress(s)) => assert_eq!(s, bad),
                other => panic!("{bad} should be invalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn computes_directed_broadcast() {
        assert_eq!(
            broadcast_address("192.168.23.1/24").unwrap(),
            Ipv4Addr::new(192, 168, 23, 255)
        );
        assert_eq!(
            broadcast_address("10.4.7.9/20").unwrap(),
            Ipv4Addr::new(10, 4, 15, 255)
        );
        assert_eq!(
            broadcast_address("172.16.0.5/32").unwrap(),
            Ipv4Addr::new(172, 16, 0, 5)
        );
        assert_eq!(broadcast_address("172.16.0.5/0").unwrap(), Ipv4Addr::BROADCAST);
    }
}
