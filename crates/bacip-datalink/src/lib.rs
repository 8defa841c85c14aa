//! BACnet/IP virtual link layer for bacip.
//!
//! [`DataLink`] is the seam between the protocol engine and the network. It
//! moves already-framed datagrams and reports where received ones came from.
//! [`BacnetIpTransport`] is the UDP implementation. BVLC framing types live in
//! [`bip::bvlc`] so the engine can wrap and unwrap frames itself.

pub mod address;
pub mod bip;
pub mod traits;

pub use address::{BacnetAddress, DataLinkAddress};
pub use bip::broadcast::broadcast_address;
pub use bip::transport::{BacnetIpTransport, MAX_BIP_FRAME_LEN};
pub use traits::{DataLink, DataLinkError};
