//! TCP player server - a line-delimited transport behind the server seam

use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::{EventHub, PlayerEvent};

use super::{PlayerServer, ServerFactory, Strategy};

/// Builds [`TcpPlayerServer`]s on a shared runtime handle.
pub struct TcpServerFactory {
    bind_addr: IpAddr,
    runtime: Handle,
}

impl TcpServerFactory {
    pub fn new(bind_addr: IpAddr, runtime: Handle) -> Self {
        Self { bind_addr, runtime }
    }
}

impl ServerFactory for TcpServerFactory {
    fn build(&self, port: u16, strategy: Arc<dyn Strategy>) -> Result<Box<dyn PlayerServer>> {
        Ok(Box::new(TcpPlayerServer::new(
            SocketAddr::new(self.bind_addr, port),
            strategy,
            self.runtime.clone(),
        )))
    }
}

/// A player server speaking a line-delimited request/reply transport.
///
/// Each request line is answered by the instance's strategy; the match
/// protocol inside the lines is not this type's concern. The accept loop
/// runs as a task on the runtime handle supplied at construction, so
/// [`TcpPlayerServer::start`] returns as soon as the listener is bound.
pub struct TcpPlayerServer {
    addr: SocketAddr,
    strategy: Arc<dyn Strategy>,
    observers: Arc<EventHub>,
    runtime: Handle,
    shutdown_tx: watch::Sender<bool>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl TcpPlayerServer {
    pub fn new(addr: SocketAddr, strategy: Arc<dyn Strategy>, runtime: Handle) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            addr,
            strategy,
            observers: Arc::new(EventHub::new()),
            runtime,
            shutdown_tx,
            accept_task: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// Address actually bound, available once started. Differs from the
    /// configured address when port 0 was requested.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().expect("Local addr lock poisoned")
    }

    fn bound_port(&self) -> u16 {
        self.local_addr().map(|a| a.port()).unwrap_or(self.addr.port())
    }
}

impl PlayerServer for TcpPlayerServer {
    fn port(&self) -> u16 {
        self.addr.port()
    }

    fn observers(&self) -> &EventHub {
        &self.observers
    }

    fn start(&self) -> Result<()> {
        let mut accept_task = self.accept_task.lock().expect("Accept task lock poisoned");
        if accept_task.is_some() {
            anyhow::bail!("Server on port {} is already started", self.addr.port());
        }

        // Bind synchronously so a failure surfaces to the caller instead of
        // inside the accept task.
        let listener = std::net::TcpListener::bind(self.addr)
            .with_context(|| format!("Failed to bind {}", self.addr))?;
        listener
            .set_nonblocking(true)
            .context("Failed to set listener non-blocking")?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read bound address")?;
        *self.local_addr.lock().expect("Local addr lock poisoned") = Some(local_addr);

        let port = local_addr.port();
        let strategy = Arc::clone(&self.strategy);
        let observers = Arc::clone(&self.observers);
        let shutdown_rx = self.shutdown_tx.subscribe();

        let task = self.runtime.spawn(async move {
            let listener = match TcpListener::from_std(listener) {
                Ok(listener) => listener,
                Err(e) => {
                    warn!("Failed to register listener on port {}: {}", port, e);
                    return;
                }
            };
            accept_loop(listener, port, strategy, observers, shutdown_rx).await;
        });
        *accept_task = Some(task);

        info!("Player server listening on {}", local_addr);
        self.observers.emit(PlayerEvent::ServerStarted { port });
        Ok(())
    }

    fn shutdown(&self) {
        let task = self
            .accept_task
            .lock()
            .expect("Accept task lock poisoned")
            .take();
        if let Some(task) = task {
            // Wakes the accept loop and every connection task.
            let _ = self.shutdown_tx.send(true);
            task.abort();

            let port = self.bound_port();
            info!("Player server on port {} shut down", port);
            self.observers.emit(PlayerEvent::ServerStopped { port });
        }
    }
}

impl Drop for TcpPlayerServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.accept_task.get_mut().ok().and_then(|t| t.take()) {
            task.abort();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    port: u16,
    strategy: Arc<dyn Strategy>,
    observers: Arc<EventHub>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        observers.emit(PlayerEvent::ConnectionOpened {
                            port,
                            peer: peer.to_string(),
                        });
                        let strategy = Arc::clone(&strategy);
                        let observers = Arc::clone(&observers);
                        let shutdown_rx = shutdown_rx.clone();
                        tokio::spawn(async move {
                            serve_connection(stream, peer, port, strategy, observers, shutdown_rx)
                                .await;
                        });
                    }
                    Err(e) => {
                        warn!("Accept failed on port {}: {}", port, e);
                    }
                }
            }
        }
    }
}

/// Read request lines until the peer disconnects, the strategy fails, or
/// the server shuts down.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    port: u16,
    strategy: Arc<dyn Strategy>,
    observers: Arc<EventHub>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            _ = shutdown_rx.changed() => break,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(request)) => match strategy.respond(&request) {
                Ok(reply) => {
                    observers.emit(PlayerEvent::RequestHandled {
                        port,
                        request,
                        reply: reply.clone(),
                    });
                    if let Err(e) = writer.write_all(reply.as_bytes()).await {
                        warn!("Write to {} failed: {}", peer, e);
                        break;
                    }
                    if let Err(e) = writer.write_all(b"\n").await {
                        warn!("Write to {} failed: {}", peer, e);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Strategy failed to answer request from {}: {:#}", peer, e);
                    observers.emit(PlayerEvent::RequestFailed {
                        port,
                        request,
                        error: format!("{e:#}"),
                    });
                    break;
                }
            },
            Ok(None) => break,
            Err(e) => {
                warn!("Read from {} failed: {}", peer, e);
                break;
            }
        }
    }

    observers.emit(PlayerEvent::ConnectionClosed {
        port,
        peer: peer.to_string(),
    });
}
