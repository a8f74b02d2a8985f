//! Instance model - one hosted player server and its display descriptor

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::player::{PlayerServer, Strategy};

use super::events::DisplaySink;

/// Unique identifier for a hosted instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a hosted instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceStatus {
    /// The server is listening on its port.
    Running,
    /// The server has been shut down.
    Stopped,
}

impl InstanceStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Stopped => "Stopped",
        }
    }
}

/// Kind of display surface an instance exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// Strategy parameter editor.
    Config,
    /// Match activity view.
    Match,
    /// Network traffic view.
    Network,
    /// Strategy internal-state view.
    Detail,
}

/// Opaque handle to a display surface.
///
/// The core never renders anything; it hands these to the presentation
/// layer, which maps each handle to a widget of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceHandle {
    kind: SurfaceKind,
    id: Uuid,
}

impl SurfaceHandle {
    pub fn new(kind: SurfaceKind) -> Self {
        Self {
            kind,
            id: Uuid::new_v4(),
        }
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Read-only summary of an instance, handed to the presentation layer for
/// rendering into tabs.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceDescriptor {
    pub id: InstanceId,
    /// Tab title, `"Port <port>"`.
    pub label: String,
    pub port: u16,
    pub strategy_name: String,
    pub status: InstanceStatus,
    pub created_at: DateTime<Utc>,
    pub config_surface: SurfaceHandle,
    pub match_surface: SurfaceHandle,
    pub network_surface: SurfaceHandle,
    pub detail_surface: SurfaceHandle,
}

/// One running player server plus its dedicated strategy and the sinks
/// attached at creation.
///
/// The port is assigned at creation and immutable thereafter. The attached
/// sinks are fixed for the instance's lifetime; they are only detached
/// wholesale when the instance is stopped.
pub struct PlayerInstance {
    id: InstanceId,
    port: u16,
    status: InstanceStatus,
    created_at: DateTime<Utc>,
    strategy: Arc<dyn Strategy>,
    server: Box<dyn PlayerServer>,
    match_sink: Arc<dyn DisplaySink>,
    network_sink: Arc<dyn DisplaySink>,
    detail_sink: Arc<dyn DisplaySink>,
}

impl PlayerInstance {
    pub(crate) fn new(
        port: u16,
        strategy: Arc<dyn Strategy>,
        server: Box<dyn PlayerServer>,
        match_sink: Arc<dyn DisplaySink>,
        network_sink: Arc<dyn DisplaySink>,
        detail_sink: Arc<dyn DisplaySink>,
    ) -> Self {
        Self {
            id: InstanceId::new(),
            port,
            status: InstanceStatus::Running,
            created_at: Utc::now(),
            strategy,
            server,
            match_sink,
            network_sink,
            detail_sink,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    /// Tab title shown for this instance.
    pub fn label(&self) -> String {
        format!("Port {}", self.port)
    }

    pub fn descriptor(&self) -> InstanceDescriptor {
        InstanceDescriptor {
            id: self.id,
            label: self.label(),
            port: self.port,
            strategy_name: self.strategy.name().to_string(),
            status: self.status,
            created_at: self.created_at,
            config_surface: self.strategy.config_surface(),
            match_surface: self.match_sink.surface(),
            network_surface: self.network_sink.surface(),
            detail_surface: self.detail_sink.surface(),
        }
    }

    /// Shut the server down and drop every attached sink.
    pub(crate) fn shut_down(&mut self) {
        self.server.shutdown();
        self.strategy.observers().detach_all();
        self.server.observers().detach_all();
        self.status = InstanceStatus::Stopped;
    }
}
