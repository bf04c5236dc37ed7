//! Lifecycle events.
//!
//! Jobs, flows and steps report what they do through an [`EventSink`].
//! A process-wide default sink can be installed with [`set_event_sink`];
//! jobs built without an explicit sink pick it up.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use parking_lot::RwLock;
use std::sync::Arc;

/// Event type names.
pub mod types {
    /// A job run began.
    pub const JOB_STARTED: &str = "job.started";
    /// A job run ended successfully.
    pub const JOB_COMPLETED: &str = "job.completed";
    /// A job run ended in failure.
    pub const JOB_FAILED: &str = "job.failed";
    /// The launcher refused to start a job instance.
    pub const JOB_REFUSED: &str = "job.refused";
    /// A step began.
    pub const STEP_STARTED: &str = "step.started";
    /// A step ended successfully.
    pub const STEP_COMPLETED: &str = "step.completed";
    /// A step ended in failure.
    pub const STEP_FAILED: &str = "step.failed";
    /// A chunk was flushed to the sink.
    pub const CHUNK_WRITTEN: &str = "chunk.written";
    /// The flow moved from one step to another.
    pub const FLOW_TRANSITION: &str = "flow.transition";
}

static GLOBAL_EVENT_SINK: RwLock<Option<Arc<dyn EventSink>>> = RwLock::new(None);

/// Sets the process-wide event sink.
pub fn set_event_sink(sink: Arc<dyn EventSink>) {
    *GLOBAL_EVENT_SINK.write() = Some(sink);
}

/// Clears the process-wide event sink.
pub fn clear_event_sink() {
    *GLOBAL_EVENT_SINK.write() = None;
}

/// Returns the process-wide event sink, or a [`NoOpEventSink`] if none is set.
pub fn get_event_sink() -> Arc<dyn EventSink> {
    GLOBAL_EVENT_SINK
        .read()
        .clone()
        .unwrap_or_else(|| Arc::new(NoOpEventSink))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_global_sink_round_trip() {
        let collecting = Arc::new(CollectingEventSink::new());
        set_event_sink(collecting.clone());
        get_event_sink().try_emit("global.before-clear", None);
        clear_event_sink();
        get_event_sink().try_emit("global.after-clear", None);

        assert_eq!(collecting.events_of_type("global.").len(), 1);
    }
}
