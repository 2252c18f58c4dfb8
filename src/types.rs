use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use uuid::Uuid;

/// Lightpad identifier (a stringified UUID on current firmware)
pub type DeviceId = String;

/// Port on which lightpads accept HTTPS command requests
pub const DEFAULT_LIGHTPAD_PORT: u16 = 8443;

/// Port lightpads broadcast their heartbeat announcements to.
///
/// Each lightpad announces itself roughly once every five minutes.
pub const DEFAULT_HEARTBEAT_PORT: u16 = 43770;

/// Port on which lightpads serve their state-change event stream
pub const DEFAULT_EVENT_PORT: u16 = 2708;

/// Leading text of every lightpad heartbeat datagram
pub const ANNOUNCEMENT_PREFIX: &str = "PLUM 8888";

/// A lightpad heartbeat received from the local network
///
/// Announcements repeat periodically; deduplicating them is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAnnouncement {
    /// Lightpad ID as announced
    pub device_id: DeviceId,

    /// Address the datagram came from
    pub source_address: IpAddr,

    /// Port the lightpad listens on for commands
    pub listen_port: u16,
}

impl DeviceAnnouncement {
    /// The announced ID as a UUID, if it is one
    pub fn device_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.device_id).ok()
    }

    /// Address and port of the lightpad's command endpoint
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.source_address, self.listen_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn announcement(id: &str) -> DeviceAnnouncement {
        DeviceAnnouncement {
            device_id: id.to_string(),
            source_address: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 91)),
            listen_port: 8443,
        }
    }

    #[test]
    fn device_uuid_parses_lightpad_ids() {
        let ann = announcement("8429176c-bf88-4aee-be07-b6a9064cf1ab");
        assert_eq!(
            ann.device_uuid().map(|u| u.to_string()).as_deref(),
            Some("8429176c-bf88-4aee-be07-b6a9064cf1ab")
        );
    }

    #[test]
    fn device_uuid_is_none_for_opaque_ids() {
        assert!(announcement("lightpad-7").device_uuid().is_none());
    }

    #[test]
    fn socket_addr_uses_listen_port() {
        let ann = announcement("x");
        assert_eq!(ann.socket_addr().to_string(), "192.168.1.91:8443");
    }
}
