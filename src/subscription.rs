use crate::error::{PlumError, Result};
use futures_util::Stream;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// State change reported by a lightpad
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The load's dimmer level changed
    DimmerChange { level: i64 },

    /// The load's power draw changed
    PowerChange { watts: i64 },

    /// The motion sensor fired
    MotionSignal { signal: i64 },

    /// The lightpad's configuration changed
    ConfigChange,

    /// A well-formed notification of a type this library does not know.
    /// Carries the frame text so newer firmware can still be handled.
    Unknown { message: String },

    /// A frame that could not be decoded
    Malformed(FrameError),
}

impl Event {
    /// Short name of the variant.
    ///
    /// For the three routed notifications this equals the frame's `type`
    /// tag; the other names are labels only.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::DimmerChange { .. } => "dimmerchange",
            Event::PowerChange { .. } => "power",
            Event::MotionSignal { .. } => "pirSignal",
            Event::ConfigChange => "configchange",
            Event::Unknown { .. } => "unknown",
            Event::Malformed(_) => "malformed",
        }
    }

    /// Whether this event reports a decoding failure
    pub fn is_malformed(&self) -> bool {
        matches!(self, Event::Malformed(_))
    }
}

/// Why a single frame of the event stream could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The frame is not a JSON notification at all
    #[error("malformed frame {frame:?}: {reason}")]
    Malformed { frame: String, reason: String },

    /// The frame's type was recognized but its fields were not
    #[error("invalid {kind} payload in frame {frame:?}: {reason}")]
    InvalidPayload {
        kind: String,
        frame: String,
        reason: String,
    },
}

impl FrameError {
    /// The offending frame text
    pub fn frame(&self) -> &str {
        match self {
            FrameError::Malformed { frame, .. } | FrameError::InvalidPayload { frame, .. } => frame,
        }
    }
}

/// Receiving end of a background listener
///
/// Values arrive in the order the listener produced them. Once the listener
/// stops, [`recv`](Self::recv) returns `None` and [`finish`](Self::finish)
/// reports why it stopped.
pub struct ListenerStream<T> {
    rx: mpsc::Receiver<T>,
    task: JoinHandle<Result<()>>,
    local_addr: SocketAddr,
}

/// Stream of lightpad announcements from [`AnnouncementListener`](crate::AnnouncementListener)
pub type AnnouncementStream = ListenerStream<crate::types::DeviceAnnouncement>;

/// Stream of lightpad events from [`EventSubscriber`](crate::EventSubscriber)
pub type EventStream = ListenerStream<Event>;

impl<T> ListenerStream<T> {
    pub(crate) fn new(rx: mpsc::Receiver<T>, task: JoinHandle<Result<()>>, local_addr: SocketAddr) -> Self {
        Self { rx, task, local_addr }
    }

    /// Receive the next value
    ///
    /// Returns `None` once the listener has stopped and everything it sent
    /// has been received.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Try to receive a value without blocking
    ///
    /// Returns `Ok(None)` if nothing is pending. Once the loop has stopped
    /// and the channel is drained this returns
    /// [`PlumError::ConnectionClosed`] whatever the cause, including a clean
    /// cancellation; [`finish`](Self::finish) reports the actual reason.
    pub fn try_recv(&mut self) -> Result<Option<T>> {
        match self.rx.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(PlumError::ConnectionClosed),
        }
    }

    /// Local address of the listener's socket
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the background loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop receiving and wait for the background loop to exit
    ///
    /// Returns `Ok(())` if the loop stopped because it was cancelled or this
    /// receiver went away, and the fatal error otherwise. Pair with
    /// [`CancelSignal::cancel`](crate::CancelSignal::cancel) to shut down
    /// promptly.
    pub async fn finish(self) -> Result<()> {
        let Self { mut rx, task, .. } = self;
        rx.close();
        drop(rx);
        task.await?
    }
}

impl<T> Unpin for ListenerStream<T> {}

impl<T> Stream for ListenerStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn local() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[test]
    fn kind_names_each_variant() {
        assert_eq!(Event::DimmerChange { level: 1 }.kind(), "dimmerchange");
        assert_eq!(Event::PowerChange { watts: 1 }.kind(), "power");
        assert_eq!(Event::MotionSignal { signal: 1 }.kind(), "pirSignal");
        assert_eq!(Event::ConfigChange.kind(), "configchange");
        assert_eq!(
            Event::Unknown {
                message: "{}".to_string()
            }
            .kind(),
            "unknown"
        );
        assert!(!Event::ConfigChange.is_malformed());
    }

    #[test]
    fn frame_error_keeps_frame_text() {
        let err = FrameError::InvalidPayload {
            kind: "power".to_string(),
            frame: r#"{"type":"power","Watts":"lots"}"#.to_string(),
            reason: "invalid type".to_string(),
        };
        assert_eq!(err.frame(), r#"{"type":"power","Watts":"lots"}"#);
        assert!(err.to_string().starts_with("invalid power payload"));
    }

    #[tokio::test]
    async fn finish_reports_loop_result() {
        let (tx, rx) = mpsc::channel::<Event>(1);
        let task = tokio::spawn(async move {
            drop(tx);
            Err(PlumError::ConnectionClosed)
        });
        let stream = ListenerStream::new(rx, task, local());
        assert!(matches!(stream.finish().await, Err(PlumError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn finish_unblocks_a_pending_send() {
        let (tx, rx) = mpsc::channel::<Event>(1);
        let task = tokio::spawn(async move {
            loop {
                if tx.send(Event::ConfigChange).await.is_err() {
                    return Ok(());
                }
            }
        });
        let stream = ListenerStream::new(rx, task, local());
        assert!(stream.finish().await.is_ok());
    }

    #[tokio::test]
    async fn try_recv_disconnect_does_not_mean_failure() {
        let (tx, rx) = mpsc::channel::<Event>(1);
        let task = tokio::spawn(async { Ok(()) });
        let mut stream = ListenerStream::new(rx, task, local());
        assert!(matches!(stream.try_recv(), Ok(None)));
        tx.send(Event::ConfigChange).await.unwrap();
        drop(tx);
        assert_eq!(stream.try_recv().unwrap(), Some(Event::ConfigChange));
        assert!(matches!(stream.try_recv(), Err(PlumError::ConnectionClosed)));
        // The loop itself exited cleanly
        assert!(stream.finish().await.is_ok());
    }
}
