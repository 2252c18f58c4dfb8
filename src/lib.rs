//! Rust library for discovering Plum lightpads and streaming their state changes
//!
//! This library provides the realtime side of talking to Plum lightpad smart
//! switches on the local network:
//!
//! - Discovery via the lightpads' UDP heartbeat broadcasts
//! - Live state-change subscriptions over each lightpad's event stream
//! - A typed event taxonomy (dimmer, power, motion) with a catch-all for
//!   notification types newer firmware may add
//! - Cooperative cancellation of both listeners
//!
//! # Quick Start
//!
//! ```no_run
//! use plum_lightpad::{
//!     AnnouncementListener, CancelSignal, EventSubscriber, ListenerConfig, SubscriberConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cancel = CancelSignal::new();
//!
//!     // Wait for a lightpad to announce itself
//!     let mut announcements = AnnouncementListener::new(ListenerConfig::new())
//!         .listen(cancel.clone())
//!         .await?;
//!     let Some(lightpad) = announcements.recv().await else {
//!         return Ok(());
//!     };
//!     println!("Found lightpad {} at {}", lightpad.device_id, lightpad.source_address);
//!
//!     // Follow its state changes
//!     let mut events = EventSubscriber::new(SubscriberConfig::new())
//!         .subscribe(lightpad.source_address, cancel.clone())
//!         .await?;
//!     if let Some(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//!
//!     cancel.cancel();
//!     announcements.finish().await?;
//!     events.finish().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The library is organized into several layers:
//!
//! - **Discovery**: UDP heartbeat listener
//! - **Connection**: per-lightpad event stream reader
//! - **Subscription**: event types and the receiving end of both listeners
//! - **Protocol**: decoding of heartbeat datagrams and event frames
//! - **Types**: announcements and well-known ports
//!
//! Neither listener keeps device state or retries a lost connection; those
//! belong to the code built on top.

mod cancel;
mod config;
mod connection;
mod discovery;
mod error;
pub mod protocol;
mod subscription;
mod types;

// Public exports
pub use cancel::CancelSignal;
pub use config::{ListenerConfig, SubscriberConfig};
pub use connection::EventSubscriber;
pub use discovery::AnnouncementListener;
pub use error::{PlumError, Result};
pub use subscription::{AnnouncementStream, Event, EventStream, FrameError, ListenerStream};
pub use types::{
    DeviceAnnouncement, DeviceId, ANNOUNCEMENT_PREFIX, DEFAULT_EVENT_PORT,
    DEFAULT_HEARTBEAT_PORT, DEFAULT_LIGHTPAD_PORT,
};
