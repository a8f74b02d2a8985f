//! Player collaborators - the narrow seams the lifecycle manager drives
//!
//! The decision-making logic behind a strategy and the match protocol a
//! server speaks live outside this crate; these traits are the whole
//! contract between them and the manager.

mod tcp;

pub use tcp::{TcpPlayerServer, TcpServerFactory};

use std::sync::Arc;

use anyhow::Result;

use crate::core::{
    BufferSink, DisplaySink, EventHub, SurfaceHandle, SurfaceKind, DEFAULT_EVENT_BUFFER,
};

/// Decision-making logic driving one player instance.
///
/// A fresh strategy is built per instance and never shared across instances.
pub trait Strategy: Send + Sync {
    /// Name shown alongside the instance in the presentation layer.
    fn name(&self) -> &str;

    /// Answer one protocol message. Framing and message contents are owned
    /// by the server implementation; the strategy only maps a request to a
    /// reply.
    fn respond(&self, request: &str) -> Result<String>;

    /// Match-activity and detail-state events are emitted here.
    fn observers(&self) -> &EventHub;

    /// Surface on which the presentation layer renders this strategy's
    /// configuration parameters.
    fn config_surface(&self) -> SurfaceHandle;

    /// The strategy's own state view. Attached to [`Strategy::observers`]
    /// when an instance is created.
    fn detail_sink(&self) -> Arc<dyn DisplaySink>;
}

/// Builds a fresh strategy per instance.
pub trait StrategyFactory: Send + Sync {
    fn build(&self) -> Result<Arc<dyn Strategy>>;
}

/// Network-facing half of an instance, bound to one port.
pub trait PlayerServer: Send + Sync {
    /// The port this server was built for.
    fn port(&self) -> u16;

    /// Network-activity events are emitted here.
    fn observers(&self) -> &EventHub;

    /// Begin accepting connections. Non-blocking: the accept loop runs on
    /// the server's own execution context.
    fn start(&self) -> Result<()>;

    /// Stop accepting connections and tear down the accept loop.
    fn shutdown(&self);
}

/// Builds a server bound to a port, parameterized by the instance's
/// strategy.
pub trait ServerFactory: Send + Sync {
    fn build(&self, port: u16, strategy: Arc<dyn Strategy>) -> Result<Box<dyn PlayerServer>>;
}

/// Builds the per-instance display adapters the manager attaches as
/// observers: one match-activity sink and one network-activity sink per
/// instance.
pub trait SinkFactory: Send + Sync {
    fn match_sink(&self) -> Arc<dyn DisplaySink>;
    fn network_sink(&self) -> Arc<dyn DisplaySink>;
}

/// Ready-made [`SinkFactory`] producing ring-buffered display adapters.
pub struct BufferSinkFactory {
    capacity: usize,
}

impl BufferSinkFactory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }
}

impl Default for BufferSinkFactory {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

impl SinkFactory for BufferSinkFactory {
    fn match_sink(&self) -> Arc<dyn DisplaySink> {
        Arc::new(BufferSink::new(SurfaceKind::Match, self.capacity))
    }

    fn network_sink(&self) -> Arc<dyn DisplaySink> {
        Arc::new(BufferSink::new(SurfaceKind::Network, self.capacity))
    }
}
