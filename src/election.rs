//! Election Engine
//!
//! Drives the claim/watch/re-claim cycle against the coordination service
//! and holds the authoritative local leadership flag.
//!
//! The state machine is `Disconnected → Connecting → Contending → Leader`
//! with the re-contend loop `Contending → Following → Contending`. The
//! whole cycle runs inside one spawned task: every step is the direct
//! continuation of the previous completion, so claim and watch never
//! overlap for the same election path. Contention between processes is
//! arbitrated entirely by the coordination service's atomic
//! create-if-absent; first successful creation wins, no priorities.
//!
//! Leadership is sticky. There is no step-down: the ephemeral node is
//! deleted by the service when the winning session ends, and followers
//! detect that through their watch.

use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::client::{ConnectSpec, CoordinationSession, Coordinator, CreateOutcome, ExistsEvent};
use crate::config::ElectionConfig;
use crate::error::Result;
use crate::notify::{LeaderElected, LeadershipNotifier};

/// Payload written to the election node by the winning session
pub const LEADER_PAYLOAD: &[u8] = b"I am the master";

/// Engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No session; waiting for a bootstrap or settings trigger
    Disconnected,
    /// Session establishment in flight
    Connecting,
    /// Claim attempt in flight
    Contending,
    /// Lost the claim; watching the election node
    Following,
    /// Won the claim; holds leadership until the session ends
    Leader,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Disconnected => write!(f, "DISCONNECTED"),
            EngineState::Connecting => write!(f, "CONNECTING"),
            EngineState::Contending => write!(f, "CONTENDING"),
            EngineState::Following => write!(f, "FOLLOWING"),
            EngineState::Leader => write!(f, "LEADER"),
        }
    }
}

/// Shared handle to the election settings
///
/// The engine snapshots the settings once per (re)connect; updates while a
/// session exists take effect only after a process restart.
pub type SettingsHandle = Arc<RwLock<ElectionConfig>>;

struct EngineInner {
    /// Session connector
    coordinator: Arc<dyn Coordinator>,
    /// Election settings, owned by the configuration collaborator
    settings: SettingsHandle,
    /// The live session; also the idempotent-bootstrap guard
    session: Mutex<Option<Arc<dyn CoordinationSession>>>,
    /// Current state
    state: RwLock<EngineState>,
    /// Local leadership flag
    is_leader: AtomicBool,
    /// Leadership event publisher
    notifier: LeadershipNotifier,
}

/// Single-leader election engine, one instance per process
///
/// Cheap to clone; clones share the same session, state, and flag.
#[derive(Clone)]
pub struct ElectionEngine {
    inner: Arc<EngineInner>,
}

impl ElectionEngine {
    /// Create a new election engine
    pub fn new(
        coordinator: Arc<dyn Coordinator>,
        settings: SettingsHandle,
        notifier: LeadershipNotifier,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                coordinator,
                settings,
                session: Mutex::new(None),
                state: RwLock::new(EngineState::Disconnected),
                is_leader: AtomicBool::new(false),
                notifier,
            }),
        }
    }

    /// Check if this instance is the leader
    ///
    /// Reflects locally cached state only, never a live remote check.
    /// Safe to call from any context.
    pub fn is_leader(&self) -> bool {
        self.inner.is_leader.load(Ordering::SeqCst)
    }

    /// Get current state
    pub async fn state(&self) -> EngineState {
        *self.inner.state.read().await
    }

    /// Subscribe to leadership events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<LeaderElected> {
        self.inner.notifier.subscribe()
    }

    /// Ensure a session exists and the election cycle is running
    ///
    /// Idempotent bootstrap entry point: both process startup and settings
    /// changes funnel into this. While a session exists the call
    /// short-circuits, so repeated triggers cannot open a second session
    /// or start a second claim. A failed connect is logged and leaves the
    /// engine `Disconnected` until the next external trigger; there is no
    /// automatic retry.
    pub async fn ensure_client(&self) -> Result<()> {
        let inner = &self.inner;

        let mut session_guard = inner.session.lock().await;
        if session_guard.is_some() {
            tracing::debug!("Session already established, ignoring trigger");
            return Ok(());
        }

        *inner.state.write().await = EngineState::Connecting;

        let config = inner.settings.read().await.clone();
        let spec = ConnectSpec::from_config(&config);
        tracing::info!("Connecting to coordination service at {}", spec.connect_string);

        match inner.coordinator.connect(&spec).await {
            Ok(session) => {
                tracing::info!("Connected to coordination service (session {})", session.id());
                *session_guard = Some(Arc::clone(&session));
                drop(session_guard);

                let inner = Arc::clone(inner);
                tokio::spawn(async move {
                    inner.run_election(session, config).await;
                });
                Ok(())
            }
            Err(e) => {
                tracing::error!("Coordination service connection failed: {}", e);
                *inner.state.write().await = EngineState::Disconnected;
                Err(e)
            }
        }
    }
}

impl EngineInner {
    /// The claim/watch/re-claim cycle
    ///
    /// Runs until the claim succeeds or fails hard. Strictly sequential:
    /// each step starts only when the previous one has completed.
    async fn run_election(&self, session: Arc<dyn CoordinationSession>, config: ElectionConfig) {
        let path = config.node_path();

        loop {
            *self.state.write().await = EngineState::Contending;

            match session.create_ephemeral(&path, Bytes::from_static(LEADER_PAYLOAD)).await {
                Ok(CreateOutcome::Created) => {
                    *self.state.write().await = EngineState::Leader;
                    self.is_leader.store(true, Ordering::SeqCst);
                    tracing::info!("This instance is now the MASTER ({})", path);
                    self.notifier.publish();
                    return;
                }
                Ok(CreateOutcome::AlreadyExists) => {
                    self.is_leader.store(false, Ordering::SeqCst);
                    *self.state.write().await = EngineState::Following;
                    tracing::info!("Master already exists on {}, watching for changes", path);

                    self.watch_master(&session, &path).await;
                    // Node gone or watch broken; fall through and re-contend
                }
                Err(e) => {
                    tracing::error!("Error while creating master node {}: {}", path, e);
                    return;
                }
            }
        }
    }

    /// Watch the election node until it is reported absent
    ///
    /// Still-present firings (data changes, spurious notifications) are
    /// logged and the one-shot watch is re-armed; they never trigger a
    /// claim. A failed watch is treated as absence: a broken watch is more
    /// likely a leader or session failure than a transient glitch, so the
    /// engine fails open toward re-election.
    async fn watch_master(&self, session: &Arc<dyn CoordinationSession>, path: &str) {
        loop {
            match session.watch_exists(path).await {
                Ok(ExistsEvent::Present(stat)) => {
                    tracing::debug!(
                        "Master node {} still present (owner {}, v{}), re-arming watch",
                        path,
                        stat.owner,
                        stat.version
                    );
                }
                Ok(ExistsEvent::Absent) => {
                    tracing::info!("No master found on {}, trying to become master", path);
                    return;
                }
                Err(e) => {
                    tracing::warn!("Watch on {} failed ({}), treating as absent", path, e);
                    return;
                }
            }
        }
    }
}
