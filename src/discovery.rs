use crate::cancel::CancelSignal;
use crate::config::ListenerConfig;
use crate::error::{PlumError, Result};
use crate::protocol::parse_announcement;
use crate::subscription::AnnouncementStream;
use crate::types::DeviceAnnouncement;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Listener for lightpad heartbeat broadcasts
///
/// Lightpads broadcast a short UDP heartbeat announcing their ID and command
/// port. The listener decodes these into [`DeviceAnnouncement`]s until its
/// [`CancelSignal`] fires.
///
/// # Example
///
/// ```no_run
/// use plum_lightpad::{AnnouncementListener, CancelSignal, ListenerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cancel = CancelSignal::new();
///     let mut announcements = AnnouncementListener::new(ListenerConfig::new())
///         .listen(cancel.clone())
///         .await?;
///
///     if let Some(ann) = announcements.recv().await {
///         println!("Found lightpad {} at {}", ann.device_id, ann.source_address);
///     }
///
///     cancel.cancel();
///     announcements.finish().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AnnouncementListener {
    config: ListenerConfig,
}

impl AnnouncementListener {
    /// Create a listener with the given settings
    pub fn new(config: ListenerConfig) -> Self {
        Self { config }
    }

    /// Bind the heartbeat port and start receiving in the background
    ///
    /// Fails only if the socket cannot be bound. The returned stream hands
    /// over one announcement at a time; the loop waits for the consumer
    /// before receiving the next datagram.
    pub async fn listen(&self, cancel: CancelSignal) -> Result<AnnouncementStream> {
        let addr = self.config.bind_addr();
        tracing::debug!("About to listen for lightpad heartbeats on {}", addr);

        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| PlumError::Bind { addr, source })?;
        let local_addr = socket.local_addr()?;
        tracing::info!("Listening for lightpad heartbeats on {}", local_addr);

        let (tx, rx) = mpsc::channel(1);
        let config = self.config.clone();
        let task = tokio::spawn(receive_loop(socket, config, tx, cancel));

        Ok(AnnouncementStream::new(rx, task, local_addr))
    }
}

async fn receive_loop(
    socket: UdpSocket,
    config: ListenerConfig,
    tx: mpsc::Sender<DeviceAnnouncement>,
    cancel: CancelSignal,
) -> Result<()> {
    let mut buf = vec![0u8; config.datagram_size()];

    loop {
        if cancel.is_cancelled() {
            tracing::info!("Heartbeat listener cancelled");
            return Ok(());
        }
        if tx.is_closed() {
            tracing::debug!("Announcement receiver dropped, stopping listener");
            return Ok(());
        }

        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => continue,
            r = timeout(config.poll_interval(), socket.recv_from(&mut buf)) => r,
        };

        let (n, source) = match received {
            Err(_elapsed) => continue,
            Ok(Ok(r)) => r,
            Ok(Err(e)) => {
                tracing::error!("Heartbeat receive failed: {}", e);
                return Err(e.into());
            }
        };

        let parsed = {
            let payload = String::from_utf8_lossy(&buf[..n]);
            tracing::debug!("Received {:?} from {}", payload, source);
            parse_announcement(&payload, source.ip())
        };
        // Wipe the payload before the next receive
        buf[..n].fill(0);

        let announcement = match parsed {
            Ok(ann) => ann,
            Err(e) => {
                tracing::warn!("Ignoring datagram from {}: {}", source, e);
                continue;
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => continue,
            sent = tx.send(announcement) => {
                if sent.is_err() {
                    tracing::debug!("Announcement receiver dropped, stopping listener");
                    return Ok(());
                }
            }
        }
    }
}
