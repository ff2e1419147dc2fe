//! Event sink that logs through `tracing`

use consilium_application::{EventSink, LifecycleEvent};
use tracing::info;

/// Emits every lifecycle event as an `info` line on the `consilium::events` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: LifecycleEvent) {
        info!(
            target: "consilium::events",
            event_type = %event.event_type,
            payload = %event.payload,
            "lifecycle event"
        );
    }
}
