//! Room server
//!
//! `ServerState` is built once at startup and shared by every connection
//! task. Each accepted socket gets its own task running
//! [`client::handle_client`].

pub mod client;
pub mod rooms;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

use crate::config::ServerConfig;
use crate::network::protocol::ServerMessage;
use rooms::RoomRegistry;

/// Outbound handle of one connection. Cloned into every room the
/// connection is seated in or watching.
#[derive(Debug, Clone)]
pub struct Peer {
    id: u64,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl Peer {
    pub fn new(id: u64, tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queues `msg` for the connection's writer task. Never blocks; a
    /// connection that already went away is skipped.
    pub fn send(&self, msg: ServerMessage) {
        if self.tx.send(msg).is_err() {
            tracing::debug!("[server] [send_dropped] conn={}", self.id);
        }
    }
}

pub struct ServerState {
    pub config: ServerConfig,
    pub registry: RoomRegistry,
    next_conn_id: AtomicU64,
    shutdown: watch::Sender<bool>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            registry: RoomRegistry::new(),
            next_conn_id: AtomicU64::new(1),
            shutdown,
        }
    }

    pub fn next_connection_id(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Stops the accept loop; connection tasks notice on their next poll.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub async fn run(state: Arc<Self>, bind_addr: &str) -> Result<()> {
        let listener = TcpListener::bind(bind_addr).await?;
        tracing::info!("[server] [ready] addr={}", listener.local_addr()?);
        Self::serve(state, listener).await
    }

    /// Accept loop over an already bound listener. Returns once shutdown
    /// has been requested.
    pub async fn serve(state: Arc<Self>, listener: TcpListener) -> Result<()> {
        let mut shutdown_rx = state.subscribe_shutdown();
        loop {
            if *shutdown_rx.borrow_and_update() {
                break;
            }
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        let s = Arc::clone(&state);
                        tokio::spawn(async move {
                            handle_new_connection(s, stream, peer_addr).await;
                        });
                    }
                    Err(e) => tracing::error!("[server] [accept_failed] err={}", e),
                },
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("[server] [stopped] rooms={}", state.registry.len().await);
        Ok(())
    }
}

pub async fn handle_new_connection(state: Arc<ServerState>, stream: TcpStream, peer_addr: SocketAddr) {
    let conn_id = state.next_connection_id();
    if let Err(e) = stream.set_nodelay(true) {
        tracing::warn!("[server] [nodelay_failed] conn={} err={}", conn_id, e);
    }
    tracing::info!("[server] [connect] conn={} peer={}", conn_id, peer_addr);
    client::handle_client(state, stream, conn_id).await;
    tracing::info!("[server] [disconnect] conn={} peer={}", conn_id, peer_addr);
}
