//! Coordination Client Adapter
//!
//! Contracts for the single long-lived session to the external
//! coordination service. The election engine only ever needs three
//! primitives: connect, ephemeral-node create, and existence watch.
//! The transport behind them (wire protocol, keep-alive, watch delivery)
//! is a trusted collaborator behind these traits.

mod memory;

pub use memory::{MemoryCoordinator, MemorySession};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::ElectionConfig;
use crate::error::Result;

/// Identifier of a live coordination session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh session identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection parameters for a session
#[derive(Debug, Clone)]
pub struct ConnectSpec {
    /// host:port of the coordination service
    pub connect_string: String,
    /// Session timeout forwarded to the service
    pub session_timeout: Duration,
    /// Resolve multi-host connect strings in a deterministic order
    pub host_order_deterministic: bool,
}

impl ConnectSpec {
    /// Build a connect spec from election settings
    pub fn from_config(config: &ElectionConfig) -> Self {
        Self {
            connect_string: config.connect_string(),
            session_timeout: config.session_timeout(),
            host_order_deterministic: config.host_order_deterministic,
        }
    }
}

/// Outcome of an ephemeral-node create attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Node created; the caller won the race
    Created,
    /// Another session already holds the node
    AlreadyExists,
}

/// Metadata of an existing node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStat {
    /// Session that owns the ephemeral node
    pub owner: SessionId,
    /// Data version, bumped on every write
    pub version: u32,
    /// When the node was created
    pub created_at: DateTime<Utc>,
}

/// Resolution of an existence watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistsEvent {
    /// The node exists; fired on data change or delivered immediately
    Present(NodeStat),
    /// The node is absent; fired on deletion or delivered immediately
    Absent,
}

/// Connector for establishing coordination sessions
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Establish a session
    ///
    /// On error the session is unusable and the caller decides whether a
    /// later trigger retries; this layer never retries on its own.
    async fn connect(&self, spec: &ConnectSpec) -> Result<Arc<dyn CoordinationSession>>;
}

/// A live session to the coordination service
///
/// Ephemeral nodes created through a session disappear automatically when
/// the session ends, whether by crash, disconnect, or process exit.
#[async_trait]
pub trait CoordinationSession: Send + Sync {
    /// This session's identifier
    fn id(&self) -> SessionId;

    /// Atomically create an ephemeral node
    ///
    /// Exactly one of any set of racing sessions observes `Created`; the
    /// rest observe `AlreadyExists`. Any other failure is a hard error.
    async fn create_ephemeral(&self, path: &str, data: Bytes) -> Result<CreateOutcome>;

    /// Register a one-shot existence watch and wait for it to resolve
    ///
    /// Resolves immediately with [`ExistsEvent::Absent`] when the node is
    /// already gone, otherwise on the next existence-state event (deletion
    /// or data change). The watch does not re-arm itself; call again to
    /// keep observing.
    async fn watch_exists(&self, path: &str) -> Result<ExistsEvent>;
}
