//! Discover lightpads on the local network and print their state changes.
//!
//! Run with `RUST_LOG`-style verbosity via tracing's fmt subscriber, and stop
//! with Ctrl-C.

use plum_lightpad::{
    AnnouncementListener, CancelSignal, Event, EventSubscriber, ListenerConfig, SubscriberConfig,
};
use std::collections::HashSet;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cancel = CancelSignal::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let mut announcements = AnnouncementListener::new(ListenerConfig::new())
        .listen(cancel.clone())
        .await?;
    println!("Waiting for lightpad heartbeats on {}", announcements.local_addr());

    let subscriber = EventSubscriber::new(SubscriberConfig::new());
    let mut seen = HashSet::new();
    let mut watchers = Vec::new();

    while let Some(lightpad) = announcements.recv().await {
        if !seen.insert(lightpad.device_id.clone()) {
            continue;
        }
        println!(
            "Found lightpad {} at {} (port {})",
            lightpad.device_id, lightpad.source_address, lightpad.listen_port
        );

        let mut events = match subscriber.subscribe(lightpad.source_address, cancel.clone()).await {
            Ok(events) => events,
            Err(e) => {
                println!("  could not subscribe: {}", e);
                // Try again on its next heartbeat
                seen.remove(&lightpad.device_id);
                continue;
            }
        };

        watchers.push(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    Event::DimmerChange { level } => println!("[{}] dimmer {}", lightpad.device_id, level),
                    Event::PowerChange { watts } => println!("[{}] power {}W", lightpad.device_id, watts),
                    Event::MotionSignal { signal } => println!("[{}] motion {}", lightpad.device_id, signal),
                    Event::ConfigChange => println!("[{}] config changed", lightpad.device_id),
                    Event::Unknown { message } => println!("[{}] {}", lightpad.device_id, message),
                    Event::Malformed(e) => println!("[{}] bad frame: {}", lightpad.device_id, e),
                }
            }
            if let Err(e) = events.finish().await {
                println!("[{}] subscription ended: {}", lightpad.device_id, e);
            }
        }));
    }

    announcements.finish().await?;
    for watcher in watchers {
        let _ = watcher.await;
    }
    Ok(())
}
