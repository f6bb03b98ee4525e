//! Lifecycle events.
//!
//! A rebuild run reports its progress as a stream of events:
//!
//! - `start`: the run began (once)
//! - `module-found`: a native module entered the rebuild decision
//! - `module-done`: a module finished, whether skipped or rebuilt
//! - `module-skip`: sent right after `module-done` when the module was
//!   already built for this configuration
//!
//! Events for one module are ordered; events of different modules may
//! interleave in parallel mode.

use std::sync::mpsc::{channel, Receiver, Sender};

use serde::Serialize;

/// A lifecycle notification.
///
/// Serialized as a single JSON object per line, tagged by `event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum LifecycleEvent {
    /// The run began.
    #[serde(rename = "start")]
    Start,

    /// A native module was found and is being considered.
    #[serde(rename = "module-found")]
    ModuleFound {
        /// Module directory name
        name: String,
    },

    /// A module finished.
    #[serde(rename = "module-done")]
    ModuleDone,

    /// The module finished because it was already up to date.
    #[serde(rename = "module-skip")]
    ModuleSkip,
}

impl LifecycleEvent {
    /// Create a module-found event.
    pub fn found(name: impl Into<String>) -> Self {
        LifecycleEvent::ModuleFound { name: name.into() }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Sending half of the event stream.
///
/// Cheap to clone into worker threads. A sink without a receiver, or whose
/// receiver was dropped, discards events.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<Sender<LifecycleEvent>>,
}

impl EventSink {
    /// Create a sink and the receiver observing it.
    pub fn channel() -> (Self, Receiver<LifecycleEvent>) {
        let (tx, rx) = channel();
        (EventSink { sender: Some(tx) }, rx)
    }

    /// A sink that discards every event.
    pub fn disconnected() -> Self {
        EventSink::default()
    }

    /// Send an event.
    pub fn emit(&self, event: LifecycleEvent) {
        tracing::trace!(event = %event.to_json(), "lifecycle");
        if let Some(ref sender) = self.sender {
            // Observers may stop listening at any time.
            let _ = sender.send(event);
        }
    }
}
