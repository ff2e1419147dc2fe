//! Lifecycle event sinks
//!
//! Implementations of the [`EventSink`](consilium_application::EventSink)
//! port:
//!
//! - [`JsonlEventSink`] appends one JSON object per event to a file
//! - [`TracingEventSink`] emits each event as a structured tracing line
//! - [`FanoutEventSink`] forwards every event to several sinks

mod fanout;
mod jsonl_sink;
mod tracing_sink;

pub use fanout::FanoutEventSink;
pub use jsonl_sink::JsonlEventSink;
pub use tracing_sink::TracingEventSink;
