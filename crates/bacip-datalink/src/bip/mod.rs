/// Directed-broadcast address computation.
pub mod broadcast;
/// BACnet Virtual Link Control header and frame types (Annex J).
pub mod bvlc;
/// UDP transport.
pub mod transport;
