//! Instance lifecycle - port allocation, creation, listing, and shutdown

use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{error, info};

use crate::player::{ServerFactory, SinkFactory, StrategyFactory};

use super::instance::{InstanceDescriptor, PlayerInstance};
use super::settings::HostSettings;

/// Failure while creating or stopping a player instance.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("failed to construct strategy: {0:#}")]
    StrategyBuild(anyhow::Error),
    #[error("failed to construct server on port {port}: {source:#}")]
    ServerBuild { port: u16, source: anyhow::Error },
    #[error("failed to start server on port {port}: {source:#}")]
    ServerStart { port: u16, source: anyhow::Error },
    #[error("no instance bound to port {0}")]
    UnknownPort(u16),
    #[error("instance limit of {0} reached")]
    LimitReached(u32),
}

/// Sole owner of port allocation and instance bookkeeping; the single entry
/// point for creating, listing, and stopping player instances.
///
/// Clones share the same state, so one manager can be handed to several
/// panel components.
pub struct InstanceManager {
    state: Arc<RwLock<ManagerState>>,
    strategies: Arc<dyn StrategyFactory>,
    servers: Arc<dyn ServerFactory>,
    sinks: Arc<dyn SinkFactory>,
    settings: HostSettings,
}

struct ManagerState {
    /// Port handed to the next successful creation. Never decremented,
    /// never advanced by a failed attempt.
    next_port: u16,
    /// Insertion order is creation order.
    instances: Vec<PlayerInstance>,
}

impl InstanceManager {
    pub fn new(
        settings: HostSettings,
        strategies: Arc<dyn StrategyFactory>,
        servers: Arc<dyn ServerFactory>,
        sinks: Arc<dyn SinkFactory>,
    ) -> Self {
        let state = ManagerState {
            next_port: settings.initial_port,
            instances: Vec::new(),
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            strategies,
            servers,
            sinks,
            settings,
        }
    }

    /// Create, wire, and start a new player instance on the next port.
    ///
    /// On success the instance is appended to the tracked list and its
    /// descriptor returned. On failure nothing is tracked, no attached sink
    /// ever sees an event, and the port is conserved for the next attempt.
    pub fn create_instance(&self) -> Result<InstanceDescriptor, InstanceError> {
        // The write lock spans the whole read-build-start-append sequence so
        // concurrent callers observe strictly increasing ports.
        let mut state = self.state.write().expect("Manager state lock poisoned");

        if self.settings.max_instances > 0
            && state.instances.len() >= self.settings.max_instances as usize
        {
            let err = InstanceError::LimitReached(self.settings.max_instances);
            error!("Failed to create player instance: {}", err);
            return Err(err);
        }

        let port = state.next_port;
        match self.build_instance(port) {
            Ok(instance) => {
                let descriptor = instance.descriptor();
                state.instances.push(instance);
                state.next_port += 1;
                info!("Created player instance on port {}", port);
                Ok(descriptor)
            }
            Err(e) => {
                error!("Failed to create player instance on port {}: {}", port, e);
                Err(e)
            }
        }
    }

    /// Construct the strategy and server for one instance, attach the
    /// display sinks, and start the server.
    fn build_instance(&self, port: u16) -> Result<PlayerInstance, InstanceError> {
        // A fresh strategy per instance; strategies are never shared.
        let strategy = self
            .strategies
            .build()
            .map_err(InstanceError::StrategyBuild)?;

        let server = self
            .servers
            .build(port, strategy.clone())
            .map_err(|source| InstanceError::ServerBuild { port, source })?;

        // Match activity and the strategy's own detail view observe the
        // strategy; network activity observes the server.
        let match_sink = self.sinks.match_sink();
        let detail_sink = strategy.detail_sink();
        let network_sink = self.sinks.network_sink();
        strategy.observers().attach(match_sink.clone());
        strategy.observers().attach(detail_sink.clone());
        server.observers().attach(network_sink.clone());

        server
            .start()
            .map_err(|source| InstanceError::ServerStart { port, source })?;

        Ok(PlayerInstance::new(
            port,
            strategy,
            server,
            match_sink,
            network_sink,
            detail_sink,
        ))
    }

    /// Descriptors of the currently tracked instances, in creation order.
    pub fn list_instances(&self) -> Vec<InstanceDescriptor> {
        self.state
            .read()
            .expect("Manager state lock poisoned")
            .instances
            .iter()
            .map(PlayerInstance::descriptor)
            .collect()
    }

    /// Shut down the instance bound to `port`, detach its observers, and
    /// remove it from the tracked list. The port is not reused.
    pub fn stop_instance(&self, port: u16) -> Result<(), InstanceError> {
        let mut state = self.state.write().expect("Manager state lock poisoned");
        let idx = state
            .instances
            .iter()
            .position(|i| i.port() == port)
            .ok_or(InstanceError::UnknownPort(port))?;

        let mut instance = state.instances.remove(idx);
        instance.shut_down();
        info!("Stopped player instance on port {}", port);
        Ok(())
    }

    /// Stop every tracked instance.
    pub fn stop_all(&self) {
        let ports: Vec<u16> = self
            .state
            .read()
            .expect("Manager state lock poisoned")
            .instances
            .iter()
            .map(PlayerInstance::port)
            .collect();
        for port in ports {
            if let Err(e) = self.stop_instance(port) {
                error!("Failed to stop instance on port {}: {}", port, e);
            }
        }
    }

    /// Number of currently tracked instances.
    pub fn instance_count(&self) -> usize {
        self.state.read().map(|s| s.instances.len()).unwrap_or(0)
    }

    /// The port the next successful creation will bind.
    pub fn next_port(&self) -> u16 {
        self.state
            .read()
            .map(|s| s.next_port)
            .unwrap_or(self.settings.initial_port)
    }

    pub fn settings(&self) -> &HostSettings {
        &self.settings
    }
}

impl Clone for InstanceManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            strategies: Arc::clone(&self.strategies),
            servers: Arc::clone(&self.servers),
            sinks: Arc::clone(&self.sinks),
            settings: self.settings.clone(),
        }
    }
}
