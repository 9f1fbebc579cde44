//! In-Process Coordination Backend
//!
//! A coordination backend that lives inside the process, sharing one node
//! namespace between all sessions it hands out. It keeps the contract that
//! matters for elections: create-if-absent is atomic, ephemeral nodes
//! vanish when their session expires, and existence watches are one-shot.
//!
//! Used by the test suite to race real sessions against each other and by
//! the `demo` subcommand. It is not a coordination service: no wire
//! protocol, no quorum, no persistence.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

use super::{
    ConnectSpec, CoordinationSession, Coordinator, CreateOutcome, ExistsEvent, NodeStat, SessionId,
};
use crate::error::{Error, Result};

struct NodeRecord {
    data: Bytes,
    stat: NodeStat,
}

#[derive(Default)]
struct Namespace {
    nodes: HashMap<String, NodeRecord>,
    watches: HashMap<String, Vec<oneshot::Sender<ExistsEvent>>>,
}

impl Namespace {
    /// Fire and drain all watches on a path
    fn fire_watches(&mut self, path: &str, event: ExistsEvent) {
        if let Some(waiters) = self.watches.remove(path) {
            for waiter in waiters {
                // Receiver may have given up; nothing to do then
                let _ = waiter.send(event.clone());
            }
        }
    }
}

/// Shared in-process coordination service state
pub struct MemoryCoordinator {
    namespace: Arc<Mutex<Namespace>>,
    refuse_connections: AtomicBool,
    sessions: Mutex<Vec<Arc<MemorySession>>>,
}

impl MemoryCoordinator {
    /// Create an empty namespace
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            namespace: Arc::new(Mutex::new(Namespace::default())),
            refuse_connections: AtomicBool::new(false),
            sessions: Mutex::new(Vec::new()),
        })
    }

    /// Make subsequent connect attempts fail
    pub fn fail_connections(&self, refuse: bool) {
        self.refuse_connections.store(refuse, Ordering::SeqCst);
    }

    /// Number of sessions handed out so far
    pub async fn sessions_opened(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Open a session with a concrete handle
    ///
    /// Same as [`Coordinator::connect`], but keeps the [`MemorySession`]
    /// type so callers can drive expiry.
    pub async fn open_session(&self, spec: &ConnectSpec) -> Result<Arc<MemorySession>> {
        if self.refuse_connections.load(Ordering::SeqCst) {
            return Err(Error::Connection {
                address: spec.connect_string.clone(),
                reason: "connection refused".into(),
            });
        }

        let session = Arc::new(MemorySession {
            id: SessionId::new(),
            namespace: Arc::clone(&self.namespace),
            expired: AtomicBool::new(false),
        });
        self.sessions.lock().await.push(Arc::clone(&session));

        tracing::debug!(
            "Memory session {} opened to {} (timeout {:?}, deterministic host order: {})",
            session.id,
            spec.connect_string,
            spec.session_timeout,
            spec.host_order_deterministic
        );

        Ok(session)
    }

    /// Check whether a node currently exists
    pub async fn node_exists(&self, path: &str) -> bool {
        self.namespace.lock().await.nodes.contains_key(path)
    }

    /// Expire the session that owns a node, deleting its ephemeral nodes
    ///
    /// Returns false when the node does not exist. This is the crash
    /// switch: what the coordination service does to a leader that stops
    /// heartbeating.
    pub async fn expire_owner(&self, path: &str) -> bool {
        let owner = {
            let ns = self.namespace.lock().await;
            match ns.nodes.get(path) {
                Some(record) => record.stat.owner,
                None => return false,
            }
        };

        let session = {
            let sessions = self.sessions.lock().await;
            sessions.iter().find(|s| s.id == owner).cloned()
        };

        if let Some(session) = session {
            session.expire().await;
            true
        } else {
            false
        }
    }

    /// Overwrite a node's data, firing existence watches with `Present`
    ///
    /// This is the spurious-notification case: the node is still there,
    /// only its data changed.
    pub async fn set_data(&self, path: &str, data: Bytes) -> Result<()> {
        let mut ns = self.namespace.lock().await;
        let stat = match ns.nodes.get_mut(path) {
            Some(record) => {
                record.data = data;
                record.stat.version += 1;
                record.stat.clone()
            }
            None => {
                return Err(Error::Internal(format!("no such node: {}", path)));
            }
        };
        ns.fire_watches(path, ExistsEvent::Present(stat));
        Ok(())
    }
}

#[async_trait]
impl Coordinator for MemoryCoordinator {
    async fn connect(&self, spec: &ConnectSpec) -> Result<Arc<dyn CoordinationSession>> {
        let session = self.open_session(spec).await?;
        Ok(session as Arc<dyn CoordinationSession>)
    }
}

/// One session against the shared namespace
pub struct MemorySession {
    id: SessionId,
    namespace: Arc<Mutex<Namespace>>,
    expired: AtomicBool,
}

impl MemorySession {
    /// End the session, deleting its ephemeral nodes and firing watches
    ///
    /// Simulates what the coordination service does when a session times
    /// out after a crash or network partition.
    pub async fn expire(&self) {
        self.expired.store(true, Ordering::SeqCst);

        let mut ns = self.namespace.lock().await;
        let owned: Vec<String> = ns
            .nodes
            .iter()
            .filter(|(_, record)| record.stat.owner == self.id)
            .map(|(path, _)| path.clone())
            .collect();

        for path in owned {
            ns.nodes.remove(&path);
            tracing::debug!("Ephemeral node {} removed (session {} expired)", path, self.id);
            ns.fire_watches(&path, ExistsEvent::Absent);
        }
    }

    fn check_alive(&self) -> Result<()> {
        if self.expired.load(Ordering::SeqCst) {
            return Err(Error::SessionExpired);
        }
        Ok(())
    }
}

#[async_trait]
impl CoordinationSession for MemorySession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn create_ephemeral(&self, path: &str, data: Bytes) -> Result<CreateOutcome> {
        self.check_alive()?;

        let mut ns = self.namespace.lock().await;
        if ns.nodes.contains_key(path) {
            return Ok(CreateOutcome::AlreadyExists);
        }

        let stat = NodeStat {
            owner: self.id,
            version: 0,
            created_at: Utc::now(),
        };
        ns.nodes.insert(path.to_string(), NodeRecord { data, stat: stat.clone() });
        ns.fire_watches(path, ExistsEvent::Present(stat));

        Ok(CreateOutcome::Created)
    }

    async fn watch_exists(&self, path: &str) -> Result<ExistsEvent> {
        self.check_alive()?;

        let rx = {
            let mut ns = self.namespace.lock().await;
            if !ns.nodes.contains_key(path) {
                return Ok(ExistsEvent::Absent);
            }
            let (tx, rx) = oneshot::channel();
            ns.watches.entry(path.to_string()).or_default().push(tx);
            rx
        };

        rx.await.map_err(|_| Error::Watch {
            path: path.to_string(),
            reason: "watch channel closed".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ConnectSpec {
        ConnectSpec {
            connect_string: "zoo1:2181".into(),
            session_timeout: std::time::Duration::from_secs(5),
            host_order_deterministic: false,
        }
    }

    #[tokio::test]
    async fn test_create_is_exclusive() {
        let coordinator = MemoryCoordinator::new();
        let a = coordinator.open_session(&spec()).await.unwrap();
        let b = coordinator.open_session(&spec()).await.unwrap();

        assert_eq!(
            a.create_ephemeral("/master", Bytes::from_static(b"a")).await.unwrap(),
            CreateOutcome::Created
        );
        assert_eq!(
            b.create_ephemeral("/master", Bytes::from_static(b"b")).await.unwrap(),
            CreateOutcome::AlreadyExists
        );
        assert!(coordinator.node_exists("/master").await);
    }

    #[tokio::test]
    async fn test_racing_creates_have_one_winner() {
        let coordinator = MemoryCoordinator::new();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let session = coordinator.open_session(&spec()).await.unwrap();
            handles.push(tokio::spawn(async move {
                session.create_ephemeral("/master", Bytes::from_static(b"x")).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() == CreateOutcome::Created {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_watch_fires_absent_on_expiry() {
        let coordinator = MemoryCoordinator::new();
        let leader = coordinator.open_session(&spec()).await.unwrap();
        let follower = coordinator.open_session(&spec()).await.unwrap();

        leader.create_ephemeral("/master", Bytes::from_static(b"m")).await.unwrap();

        let watch = tokio::spawn(async move { follower.watch_exists("/master").await.unwrap() });
        // Give the watcher a chance to register before the expiry
        tokio::task::yield_now().await;

        leader.expire().await;

        assert_eq!(watch.await.unwrap(), ExistsEvent::Absent);
        assert!(!coordinator.node_exists("/master").await);
    }

    #[tokio::test]
    async fn test_watch_immediate_when_absent() {
        let coordinator = MemoryCoordinator::new();
        let session = coordinator.open_session(&spec()).await.unwrap();

        assert_eq!(session.watch_exists("/master").await.unwrap(), ExistsEvent::Absent);
    }

    #[tokio::test]
    async fn test_data_change_fires_present() {
        let coordinator = MemoryCoordinator::new();
        let leader = coordinator.open_session(&spec()).await.unwrap();
        let follower = coordinator.open_session(&spec()).await.unwrap();

        leader.create_ephemeral("/master", Bytes::from_static(b"v0")).await.unwrap();

        let watch = tokio::spawn(async move { follower.watch_exists("/master").await.unwrap() });
        tokio::task::yield_now().await;

        coordinator.set_data("/master", Bytes::from_static(b"v1")).await.unwrap();

        match watch.await.unwrap() {
            ExistsEvent::Present(stat) => assert_eq!(stat.version, 1),
            ExistsEvent::Absent => panic!("node is still present"),
        }
    }

    #[tokio::test]
    async fn test_expire_owner_targets_the_right_session() {
        let coordinator = MemoryCoordinator::new();
        let leader = coordinator.open_session(&spec()).await.unwrap();
        let other = coordinator.open_session(&spec()).await.unwrap();

        leader.create_ephemeral("/master", Bytes::from_static(b"m")).await.unwrap();
        other.create_ephemeral("/other", Bytes::from_static(b"o")).await.unwrap();

        assert!(coordinator.expire_owner("/master").await);
        assert!(!coordinator.node_exists("/master").await);
        // Unrelated session keeps its node
        assert!(coordinator.node_exists("/other").await);
        assert!(!coordinator.expire_owner("/master").await);
    }

    #[tokio::test]
    async fn test_refused_connections() {
        let coordinator = MemoryCoordinator::new();
        coordinator.fail_connections(true);
        assert!(coordinator.open_session(&spec()).await.is_err());

        coordinator.fail_connections(false);
        assert!(coordinator.open_session(&spec()).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_session_rejects_operations() {
        let coordinator = MemoryCoordinator::new();
        let session = coordinator.open_session(&spec()).await.unwrap();
        session.expire().await;

        assert!(session.create_ephemeral("/master", Bytes::new()).await.is_err());
        assert!(session.watch_exists("/master").await.is_err());
    }
}
