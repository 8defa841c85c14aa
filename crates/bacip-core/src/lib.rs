//! Wire codec for the BACnet/IP client stack.
//!
//! `bacip-core` turns NPDU and APDU frames into typed values and back without
//! allocating on the hot path. Reads borrow from the datagram buffer and
//! writes go into caller-provided slices, so the same code works in `no_std`
//! builds.
//!
//! # Feature flags
//!
//! - **`std`** (default): `std::error::Error` for the codec errors.
//! - **`alloc`** (default): constructed values and the multi-property
//!   acknowledgement decoders.
//! - **`serde`**: `Serialize`/`Deserialize` on identifier types.
//! - **`defmt`**: `defmt::Format` on frame-level enums.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

/// Application layer headers and the decoded [`apdu::Apdu`] view.
pub mod apdu;
/// Tags, primitive encoders and the byte cursor types.
pub mod encoding;
/// Codec error types.
pub mod error;
/// Network layer header.
pub mod npdu;
/// Request and acknowledgement bodies for the services the client speaks.
pub mod services;
/// Identifiers, enumerations and property values.
pub mod types;

pub use error::{DecodeError, EncodeError};
