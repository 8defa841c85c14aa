/// Primitive value encoders and decoders (unsigned, signed, real, object id).
pub mod primitives;
/// Borrowing cursor over a received frame.
pub mod reader;
/// BACnet tag header encoding.
pub mod tag;
/// Cursor writing into a caller-owned buffer.
pub mod writer;
