use crate::types::{DEFAULT_EVENT_PORT, DEFAULT_HEARTBEAT_PORT};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_DATAGRAM_SIZE: usize = 1024;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_EVENT_CAPACITY: usize = 5;
const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024;

/// Settings for [`AnnouncementListener`](crate::AnnouncementListener)
///
/// # Example
///
/// ```
/// use plum_lightpad::ListenerConfig;
/// use std::time::Duration;
///
/// let config = ListenerConfig::new().with_poll_interval(Duration::from_millis(250));
/// assert_eq!(config.port(), 43770);
/// ```
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    bind_address: IpAddr,
    port: u16,
    poll_interval: Duration,
    datagram_size: usize,
}

impl ListenerConfig {
    /// Listen on every interface at the lightpad heartbeat port
    #[must_use]
    pub fn new() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_HEARTBEAT_PORT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            datagram_size: DEFAULT_DATAGRAM_SIZE,
        }
    }

    /// Bind to a specific local address
    #[must_use]
    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    /// Listen on a different port (0 picks a free one)
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// How long a single receive may block before cancellation is re-checked
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Largest datagram accepted; longer payloads are truncated
    #[must_use]
    pub fn with_datagram_size(mut self, size: usize) -> Self {
        self.datagram_size = size.max(1);
        self
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn datagram_size(&self) -> usize {
        self.datagram_size
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings for [`EventSubscriber`](crate::EventSubscriber)
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    port: u16,
    connect_timeout: Duration,
    poll_interval: Duration,
    capacity: usize,
    max_frame_len: usize,
}

impl SubscriberConfig {
    /// Connect to the lightpad event port with default timings
    #[must_use]
    pub fn new() -> Self {
        Self {
            port: DEFAULT_EVENT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            capacity: DEFAULT_EVENT_CAPACITY,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Connect to a different event port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Give up connecting after this long
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Read deadline after which cancellation is re-checked
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Number of events buffered before the read loop waits for the consumer
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Longest frame accepted, newline included.
    ///
    /// A longer frame is reported as malformed and the rest of it skipped.
    #[must_use]
    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len.max(1);
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self::new()
    }
}
