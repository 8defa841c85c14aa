//! Service request and acknowledgement bodies.
//!
//! Request encoders write the full APDU including its header. Decoders named
//! `decode_after_header` expect the reader to sit just past the APDU header
//! (or on the payload slice handed out by [`crate::apdu::Apdu`]).

pub mod i_am;
pub mod read_property;
pub mod read_property_multiple;
pub mod value_codec;
pub mod who_is;
pub mod write_property;
pub mod write_property_multiple;
