//! PlayerHost - Host multiple game player server instances in one process
//!
//! A headless core for a player control panel: it allocates a port for each
//! new player instance, wires the instance's event stream to display
//! observers, starts the server, and tracks it alongside its siblings so
//! each can be independently displayed and shut down.
//!
//! The decision-making logic and the match protocol are external
//! collaborators behind the [`player`] seams; the presentation layer renders
//! the opaque surface handles carried by each [`InstanceDescriptor`].

pub mod core;
pub mod player;

pub use crate::core::{
    BufferSink, DisplaySink, EventHub, EventSink, HostSettings, InstanceDescriptor, InstanceError,
    InstanceId, InstanceManager, InstanceStatus, PlayerEvent, PlayerInstance, SurfaceHandle,
    SurfaceKind, DEFAULT_EVENT_BUFFER, DEFAULT_PLAYER_PORT,
};
pub use crate::player::{
    BufferSinkFactory, PlayerServer, ServerFactory, SinkFactory, Strategy, StrategyFactory,
};
