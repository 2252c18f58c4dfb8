use crate::cancel::CancelSignal;
use crate::config::SubscriberConfig;
use crate::error::{PlumError, Result};
use crate::protocol::classify_frame;
use crate::subscription::{Event, EventStream, FrameError};
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Subscriber to a lightpad's live state-change stream
///
/// Each call to [`subscribe`](Self::subscribe) opens its own connection;
/// there is no reconnection, so a consumer that wants one subscribes again.
///
/// # Example
///
/// ```no_run
/// use plum_lightpad::{CancelSignal, Event, EventSubscriber, SubscriberConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cancel = CancelSignal::new();
///     let mut events = EventSubscriber::new(SubscriberConfig::new())
///         .subscribe("192.168.1.91".parse()?, cancel.clone())
///         .await?;
///
///     while let Some(event) = events.recv().await {
///         if let Event::DimmerChange { level } = event {
///             println!("Dimmer now at {}", level);
///             break;
///         }
///     }
///
///     cancel.cancel();
///     events.finish().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventSubscriber {
    config: SubscriberConfig,
}

impl EventSubscriber {
    /// Create a subscriber with the given settings
    pub fn new(config: SubscriberConfig) -> Self {
        Self { config }
    }

    /// Connect to the lightpad at `ip` and start reading events
    ///
    /// Fails if the connection cannot be established. After that, every
    /// frame the lightpad sends arrives as exactly one [`Event`], in order.
    pub async fn subscribe(&self, ip: IpAddr, cancel: CancelSignal) -> Result<EventStream> {
        let addr = SocketAddr::new(ip, self.config.port());
        tracing::debug!("About to connect to lightpad at {}", addr);

        let stream = match timeout(self.config.connect_timeout(), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                tracing::debug!("Failed to connect to lightpad at {}: {}", addr, source);
                return Err(PlumError::Connect { addr, source });
            }
            Err(_) => {
                tracing::debug!("Timed out connecting to lightpad at {}", addr);
                return Err(PlumError::ConnectTimeout(addr));
            }
        };
        let local_addr = stream.local_addr()?;
        tracing::info!("Subscribed to lightpad events from {}", addr);

        let (tx, rx) = mpsc::channel(self.config.capacity());
        let config = self.config.clone();
        let task = tokio::spawn(read_loop(stream, addr, config, tx, cancel));

        Ok(EventStream::new(rx, task, local_addr))
    }
}

async fn read_loop(
    stream: TcpStream,
    addr: SocketAddr,
    config: SubscriberConfig,
    tx: mpsc::Sender<Event>,
    cancel: CancelSignal,
) -> Result<()> {
    let mut reader = BufReader::new(stream);
    let limit = config.max_frame_len();
    // Kept across deadline expiries so a partially received frame is not lost.
    // Always shorter than `limit` between reads.
    let mut frame: Vec<u8> = Vec::new();
    // Set while skipping the tail of a frame that exceeded `limit`
    let mut oversized = false;

    loop {
        if cancel.is_cancelled() {
            tracing::info!("Event subscription to {} cancelled", addr);
            return Ok(());
        }
        if tx.is_closed() {
            tracing::debug!("Event receiver for {} dropped, closing connection", addr);
            return Ok(());
        }

        let mut limited = (&mut reader).take((limit - frame.len()) as u64);
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => continue,
            r = timeout(config.poll_interval(), limited.read_until(b'\n', &mut frame)) => r,
        };

        match read {
            Err(_elapsed) => continue,
            Ok(Ok(0)) => {
                if !frame.is_empty() && !oversized {
                    // Deliver whatever arrived before the lightpad hung up
                    let event = take_event(&mut frame);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(()),
                        _ = tx.send(event) => {}
                    }
                }
                tracing::info!("Lightpad at {} closed the event stream", addr);
                return Err(PlumError::ConnectionClosed);
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::error!("Event stream from {} failed: {}", addr, e);
                return Err(e.into());
            }
        }

        let complete = frame.last() == Some(&b'\n');
        if oversized {
            if complete {
                oversized = false;
            }
            frame.clear();
            continue;
        }

        let event = if complete {
            take_event(&mut frame)
        } else if frame.len() >= limit {
            oversized = true;
            let event = Event::Malformed(FrameError::Malformed {
                frame: String::from_utf8_lossy(&frame).into_owned(),
                reason: format!("frame exceeds {} bytes", limit),
            });
            frame.clear();
            event
        } else {
            continue;
        };
        if let Event::Malformed(e) = &event {
            tracing::warn!("Bad frame from {}: {}", addr, e);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => continue,
            sent = tx.send(event) => {
                if sent.is_err() {
                    tracing::debug!("Event receiver for {} dropped, closing connection", addr);
                    return Ok(());
                }
            }
        }
    }
}

fn take_event(frame: &mut Vec<u8>) -> Event {
    let event = {
        let text = String::from_utf8_lossy(frame);
        tracing::debug!("Received frame {:?}", text);
        classify_frame(&text)
    };
    frame.clear();
    event
}
