//! Event layer - typed activity events and the observer sinks receiving them

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;

use super::instance::{SurfaceHandle, SurfaceKind};

/// Default number of events a [`BufferSink`] retains.
pub const DEFAULT_EVENT_BUFFER: usize = 1000;

/// Activity emitted by a running player instance.
///
/// Network-facing variants come from the instance's server; `MatchActivity`
/// and `DetailChanged` come from its strategy. The manager never interprets
/// event contents, it only routes them to the sinks attached at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlayerEvent {
    /// The server began listening on its port.
    ServerStarted { port: u16 },
    /// The server stopped listening.
    ServerStopped { port: u16 },
    /// A client connected.
    ConnectionOpened { port: u16, peer: String },
    /// A client disconnected.
    ConnectionClosed { port: u16, peer: String },
    /// A request was answered by the strategy.
    RequestHandled {
        port: u16,
        request: String,
        reply: String,
    },
    /// The strategy refused or failed to answer a request.
    RequestFailed {
        port: u16,
        request: String,
        error: String,
    },
    /// Match-level activity reported by the strategy.
    MatchActivity { message: String },
    /// The strategy's observable internal state changed.
    DetailChanged { detail: String },
}

/// Receives events from one strategy or one server.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &PlayerEvent);
}

/// An event sink that also owns a display surface, so the presentation
/// layer can render what the sink has collected.
pub trait DisplaySink: EventSink {
    fn surface(&self) -> SurfaceHandle;
}

/// Attach-only list of sinks owned by one strategy or one server.
///
/// Delivery is synchronous on the emitting thread. A hub only ever carries
/// its owner's events, which is what keeps instances isolated from each
/// other's traffic.
#[derive(Default)]
pub struct EventHub {
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a sink. There is no single-sink detach; observers are fixed
    /// for the instance's lifetime and dropped wholesale on stop.
    pub fn attach(&self, sink: Arc<dyn EventSink>) {
        self.sinks
            .write()
            .expect("Sink list lock poisoned")
            .push(sink);
    }

    /// Drop every attached sink. Happens when an instance is stopped.
    pub fn detach_all(&self) {
        self.sinks.write().expect("Sink list lock poisoned").clear();
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Deliver an event to every attached sink.
    pub fn emit(&self, event: PlayerEvent) {
        // Delivery happens outside the list lock; a sink callback may attach
        // further sinks.
        let sinks: Vec<Arc<dyn EventSink>> =
            self.sinks.read().expect("Sink list lock poisoned").clone();
        for sink in sinks {
            sink.on_event(&event);
        }
    }
}

/// A display adapter retaining the most recent events in a ring buffer.
///
/// The presentation layer snapshots the buffer whenever it redraws the
/// surface.
pub struct BufferSink {
    surface: SurfaceHandle,
    capacity: usize,
    events: Mutex<VecDeque<PlayerEvent>>,
}

impl BufferSink {
    pub fn new(kind: SurfaceKind, capacity: usize) -> Self {
        Self {
            surface: SurfaceHandle::new(kind),
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// The retained events, oldest first.
    pub fn snapshot(&self) -> Vec<PlayerEvent> {
        self.events
            .lock()
            .expect("Event buffer lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for BufferSink {
    fn on_event(&self, event: &PlayerEvent) {
        let mut events = self.events.lock().expect("Event buffer lock poisoned");
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

impl DisplaySink for BufferSink {
    fn surface(&self) -> SurfaceHandle {
        self.surface
    }
}
