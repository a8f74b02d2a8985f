//! Core module - instance model, lifecycle manager, events, and settings

mod events;
mod instance;
mod manager;
mod settings;

pub use events::{BufferSink, DisplaySink, EventHub, EventSink, PlayerEvent, DEFAULT_EVENT_BUFFER};
pub use instance::{
    InstanceDescriptor, InstanceId, InstanceStatus, PlayerInstance, SurfaceHandle, SurfaceKind,
};
pub use manager::{InstanceError, InstanceManager};
pub use settings::{HostSettings, DEFAULT_PLAYER_PORT};
