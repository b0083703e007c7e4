//! JSON-lines event sink.

pub mod sink;
pub mod writer;

pub use crate::config::EventsOutConfig;
pub use sink::JsonlEventSink;
pub use writer::{start_events_out, EventsOutTx};
