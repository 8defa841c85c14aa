use crate::utsm::SubscriberConfig;
use bacip_datalink::bip::bvlc::BVLC_HEADER_LEN;
use std::time::Duration;

/// Smallest frame worth configuring: BVLC and a bare NPDU around a
/// 50-octet APDU, the minimum every device must accept.
pub const MIN_FRAME_LEN: usize = BVLC_HEADER_LEN + 2 + 50;

/// Tunables for [`BacnetClient`](crate::BacnetClient).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClientConfig {
    /// How long a confirmed request waits for its reply.
    pub request_timeout: Duration,
    /// Number of invoke ids, at most 256.
    pub transaction_pool_size: usize,
    /// Overall lifetime of a discovery subscription.
    pub subscriber_timeout: Duration,
    /// Longest gap between two I-Am replies before discovery gives up.
    pub last_received_timeout: Duration,
    /// Per-subscription queue depth.
    pub subscriber_buffer: usize,
    /// Datagrams being decoded at once; anything beyond is dropped.
    pub max_in_flight: usize,
    /// Size of the receive buffers.
    pub max_frame_len: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let subscriber = SubscriberConfig::default();
        Self {
            request_timeout: Duration::from_secs(3),
            transaction_pool_size: crate::tsm::DEFAULT_POOL_SIZE,
            subscriber_timeout: subscriber.subscriber_timeout,
            last_received_timeout: subscriber.last_received_timeout,
            subscriber_buffer: subscriber.buffer,
            max_in_flight: 1024,
            max_frame_len: bacip_datalink::MAX_BIP_FRAME_LEN,
        }
    }
}

impl ClientConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_transaction_pool_size(mut self, size: usize) -> Self {
        self.transaction_pool_size = size;
        self
    }

    pub fn with_subscriber_timeout(mut self, timeout: Duration) -> Self {
        self.subscriber_timeout = timeout;
        self
    }

    pub fn with_last_received_timeout(mut self, timeout: Duration) -> Self {
        self.last_received_timeout = timeout;
        self
    }

    pub fn with_subscriber_buffer(mut self, buffer: usize) -> Self {
        self.subscriber_buffer = buffer.max(1);
        self
    }

    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max.max(1);
        self
    }

    /// Receive buffer size, never below [`MIN_FRAME_LEN`].
    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len.max(MIN_FRAME_LEN);
        self
    }

    pub fn subscriber_config(&self) -> SubscriberConfig {
        SubscriberConfig::default()
            .with_subscriber_timeout(self.subscriber_timeout)
            .with_last_received_timeout(self.last_received_timeout)
            .with_buffer(self.subscriber_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientConfig, MIN_FRAME_LEN};
    use std::time::Duration;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.transaction_pool_size, 20);
        assert_eq!(config.subscriber_timeout, Duration::from_secs(10));
        assert_eq!(config.last_received_timeout, Duration::from_secs(2));
        assert_eq!(config.max_frame_len, 1600);
    }

    #[test]
    fn builders_feed_subscriber_config() {
        let config = ClientConfig::default()
            .with_subscriber_timeout(Duration::from_secs(4))
            .with_last_received_timeout(Duration::from_millis(500))
            .with_subscriber_buffer(0);
        let sub = config.subscriber_config();
        assert_eq!(sub.subscriber_timeout, Duration::from_secs(4));
        assert_eq!(sub.last_received_timeout, Duration::from_millis(500));
        assert_eq!(sub.buffer, 1);
    }

    #[test]
    fn frame_len_has_a_floor() {
        assert_eq!(ClientConfig::default().with_max_frame_len(0).max_frame_len, MIN_FRAME_LEN);
        assert_eq!(ClientConfig::default().with_max_frame_len(480).max_frame_len, 480);
        assert_eq!(ClientConfig::default().with_max_in_flight(0).max_in_flight, 1);
    }
}
