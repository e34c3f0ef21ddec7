use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::server::events::{EventSender, Notifier};
use crate::server::session;

/// Lifecycle of the listening socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerState {
    NotRunning,
    Starting,
    Running,
    Stopping,
    /// The last start or stop failed; start may be retried
    Failed,
}

/// Tunables for source connections
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bytes read from the socket per decode step
    pub read_buffer_size: usize,
    /// Upper bound on the SOURCE request head
    pub max_request_len: usize,
    /// Time allowed between accept and a complete SOURCE request
    pub handshake_timeout: Duration,
    /// Quiet period after which an unfinished SOURCE request is answered
    pub handshake_idle: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            read_buffer_size: 16 * 1024,
            max_request_len: 8 * 1024,
            handshake_timeout: Duration::from_secs(10),
            handshake_idle: Duration::from_millis(500),
        }
    }
}

#[derive(Debug)]
struct RunningServer {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Debug)]
struct ManagerState {
    state: ServerState,
    server: Option<RunningServer>,
    /// Peer of the single active source connection
    connection: Option<SocketAddr>,
}

/// Owns the listening socket and the single active source connection.
///
/// Cloning yields another handle to the same server. At most one start or
/// stop can be in flight; a second one fails with
/// [`Error::TransitionInProgress`].
#[derive(Debug, Clone)]
pub struct SessionManager {
    inner: Arc<Mutex<ManagerState>>,
    events: Notifier,
    config: ServerConfig,
}

fn lock(inner: &Mutex<ManagerState>) -> MutexGuard<'_, ManagerState> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a pending start/stop; leaves the manager `Failed` unless completed.
struct Transition<'a> {
    inner: &'a Mutex<ManagerState>,
    completed: bool,
}

impl<'a> Transition<'a> {
    fn begin(inner: &'a Mutex<ManagerState>) -> Self {
        Transition {
            inner,
            completed: false,
        }
    }

    fn complete(mut self, state: &mut ManagerState, next: ServerState) {
        state.state = next;
        self.completed = true;
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if !self.completed {
            lock(self.inner).state = ServerState::Failed;
        }
    }
}

/// Occupancy of the active connection slot, held by the session task
#[derive(Debug)]
pub(crate) struct ConnectionSlot {
    inner: Arc<Mutex<ManagerState>>,
    peer: SocketAddr,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        let mut state = lock(&self.inner);
        if state.connection == Some(self.peer) {
            state.connection = None;
        }
    }
}

impl SessionManager {
    pub fn new(events: EventSender) -> Self {
        Self::with_config(events, ServerConfig::default())
    }

    pub fn with_config(events: EventSender, config: ServerConfig) -> Self {
        SessionManager {
            inner: Arc::new(Mutex::new(ManagerState {
                state: ServerState::NotRunning,
                server: None,
                connection: None,
            })),
            events: Notifier::new(events),
            config,
        }
    }

    pub fn state(&self) -> ServerState {
        lock(&self.inner).state
    }

    /// Address the server is listening on while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        lock(&self.inner).server.as_ref().map(|s| s.local_addr)
    }

    /// Peer of the active source connection
    pub fn active_connection(&self) -> Option<SocketAddr> {
        lock(&self.inner).connection
    }

    /// Start listening for a source on `host:port`.
    ///
    /// Resolves once the socket is listening and returns the bound address
    /// (useful with port 0).
    pub async fn start(&self, host: &str, port: u16) -> Result<SocketAddr> {
        {
            let mut state = lock(&self.inner);
            match state.state {
                ServerState::Running => return Err(Error::AlreadyRunning),
                ServerState::Starting => return Err(Error::TransitionInProgress("start")),
                ServerState::Stopping => return Err(Error::TransitionInProgress("stop")),
                ServerState::NotRunning | ServerState::Failed => {}
            }
            if state.server.is_some() {
                return Err(Error::AlreadyRunning);
            }
            if state.connection.is_some() {
                return Err(Error::OpenConnection);
            }
            state.state = ServerState::Starting;
        }
        let transition = Transition::begin(&self.inner);

        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| Error::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| Error::Bind { addr, source })?;

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(accept_loop(
            listener,
            self.inner.clone(),
            self.events.clone(),
            self.config.clone(),
            shutdown.clone(),
        ));

        {
            let mut state = lock(&self.inner);
            state.server = Some(RunningServer {
                local_addr,
                shutdown,
                task,
            });
            transition.complete(&mut state, ServerState::Running);
        }

        info!("Server started on {}", local_addr);
        Ok(local_addr)
    }

    /// Close the active connection and the listening socket.
    ///
    /// Resolves once both are gone; a later start begins from a clean state.
    pub async fn stop(&self) -> Result<()> {
        let server = {
            let mut state = lock(&self.inner);
            match state.state {
                ServerState::Running => {}
                ServerState::Starting => return Err(Error::TransitionInProgress("start")),
                ServerState::Stopping => return Err(Error::TransitionInProgress("stop")),
                ServerState::NotRunning | ServerState::Failed => return Err(Error::NotRunning),
            }
            let Some(server) = state.server.take() else {
                state.state = ServerState::NotRunning;
                return Err(Error::NotRunning);
            };
            state.state = ServerState::Stopping;
            server
        };
        let transition = Transition::begin(&self.inner);

        server.shutdown.cancel();
        server
            .task
            .await
            .map_err(|e| Error::Close(e.to_string()))?;

        {
            let mut state = lock(&self.inner);
            state.connection = None;
            transition.complete(&mut state, ServerState::NotRunning);
        }

        info!("Stopped server that was running on {}", server.local_addr);
        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    inner: Arc<Mutex<ManagerState>>,
    events: Notifier,
    config: ServerConfig,
    shutdown: CancellationToken,
) {
    let mut active: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = wait_for(&mut active) => {
                active = None;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) if active.as_ref().is_some_and(|session| !session.is_finished()) => {
                    warn!(peer = %peer, "There is already an active connection. Closing socket.");
                    drop(stream);
                }
                Ok((stream, peer)) => {
                    info!(peer = %peer, "Client connected");
                    lock(&inner).connection = Some(peer);
                    let slot = ConnectionSlot {
                        inner: inner.clone(),
                        peer,
                    };
                    active = Some(tokio::spawn(session::run(
                        stream,
                        peer,
                        events.clone(),
                        config.clone(),
                        shutdown.child_token(),
                        slot,
                    )));
                }
                Err(e) => warn!("Failed to accept connection: {}", e),
            },
        }
    }

    drop(listener);
    // The session's token is a child of `shutdown`, so it is winding down too.
    if active.is_some() {
        wait_for(&mut active).await;
    }
}

/// Wait for the active session to finish; pending forever when there is none
async fn wait_for(session: &mut Option<JoinHandle<()>>) {
    match session {
        Some(handle) => {
            if let Err(e) = handle.await {
                error!("Session task failed: {}", e);
            }
        }
        None => std::future::pending().await,
    }
}
