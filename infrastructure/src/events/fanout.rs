//! Forward events to several sinks

use consilium_application::{EventSink, LifecycleEvent};
use std::sync::Arc;

/// Publishes each event to every wrapped sink, in order
#[derive(Default)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutEventSink {
    fn publish(&self, event: LifecycleEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.publish(event.clone());
            }
            last.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingEventSink {
        events: Mutex<Vec<String>>,
    }

    impl EventSink for RecordingEventSink {
        fn publish(&self, event: LifecycleEvent) {
            self.events.lock().unwrap().push(event.event_type);
        }
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let a = Arc::new(RecordingEventSink::default());
        let b = Arc::new(RecordingEventSink::default());
        let fanout = FanoutEventSink::default()
            .with_sink(a.clone())
            .with_sink(b.clone());

        fanout.publish(LifecycleEvent::new("one", serde_json::json!({})));
        fanout.publish(LifecycleEvent::new("two", serde_json::json!({})));

        assert_eq!(*a.events.lock().unwrap(), vec!["one", "two"]);
        assert_eq!(*b.events.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn test_empty_fanout_is_noop() {
        let fanout = FanoutEventSink::new(Vec::new());
        assert!(fanout.is_empty());
        fanout.publish(LifecycleEvent::new("ignored", serde_json::json!(null)));
    }
}
