use crate::{BacnetAddress, DataLinkAddress};
use bacip_core::npdu::Npdu;
use std::future::Future;
use thiserror::Error;

/// Errors that can occur at the data-link layer.
#[derive(Debug, Error)]
pub enum DataLinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame too large")]
    FrameTooLarge,
    #[error("invalid frame")]
    InvalidFrame,
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("data link closed")]
    Closed,
}

/// Moves complete BVLC frames between the engine and the network.
///
/// Both futures are `Send` so a client built on any implementation can be
/// driven from spawned tasks.
pub trait DataLink: Send + Sync {
    /// Transmits `frame` to `destination`, returning the number of bytes
    /// written. `npdu` is the network header already encoded inside `frame`;
    /// implementations may use it for routing decisions or logging.
    fn send(
        &self,
        frame: &[u8],
        npdu: &Npdu,
        destination: &BacnetAddress,
    ) -> impl Future<Output = Result<usize, DataLinkError>> + Send;

    /// Waits for the next datagram, copies it into `buf` and returns its
    /// length and sender. Returns [`DataLinkError::Closed`] once
    /// [`close`](Self::close) has been called.
    fn recv(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = Result<(usize, DataLinkAddress), DataLinkError>> + Send;

    /// Releases the underlying socket and wakes any pending `recv`.
    /// Calling it more than once is harmless.
    fn close(&self) -> Result<(), DataLinkError>;
}
