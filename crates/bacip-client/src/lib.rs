//! Async BACnet/IP client.
//!
//! One receive loop ([`BacnetClient::run`]) feeds every datagram to a
//! [`Dispatcher`] on its own task. Confirmed replies are matched to their
//! request through the invoke-id pool in [`tsm`]; I-Am announcements fan out
//! to discovery subscribers through [`utsm`].

mod buffer;
pub mod client;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod tsm;
pub mod utsm;
pub mod value;

pub use client::BacnetClient;
pub use config::ClientConfig;
pub use discovery::DiscoveredDevice;
pub use dispatch::{Dispatcher, Routed};
pub use error::ClientError;
pub use tsm::{Reply, Transaction, Tsm};
pub use utsm::{Manager, SubscriberConfig, SubscriberFilter, Subscription, SubscriptionState};
pub use value::ClientDataValue;
