//! zkelect - Single-Leader Election over a Coordination Service
//!
//! Elects exactly one leader among a fleet of equivalent server processes,
//! coordinated through a ZooKeeper-like hierarchical store. Leader-only
//! work (scheduled jobs, one-time migrations, seed tasks) then runs exactly
//! once across the fleet while every other process follows and watches for
//! leader failure.
//!
//! # Architecture
//!
//! The election is a race for one ephemeral node: the first session to
//! create it leads, everyone else watches it. When the leader's session
//! ends the service deletes the node, the watches fire, and the followers
//! re-contend. The local engine never steps down voluntarily; failure
//! detection is entirely session expiry.
//!
//! # Features
//!
//! - Ephemeral-node claim with watch-based failover detection
//! - Idempotent bootstrap shared by startup and settings-change triggers
//! - Typed broadcast of the leader-elected event for leader-only work
//! - Pluggable coordination backend behind async traits
//! - In-process backend for tests and demos

pub mod client;
pub mod config;
pub mod election;
pub mod error;
pub mod lifecycle;
pub mod notify;

pub use config::ZkElectConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{CoordinationSession, Coordinator, CreateOutcome, ExistsEvent};
    pub use crate::config::{ElectionConfig, ZkElectConfig};
    pub use crate::election::{ElectionEngine, EngineState};
    pub use crate::error::{Error, Result};
    pub use crate::lifecycle::{LifecycleBinding, LifecycleEvent};
    pub use crate::notify::{LeaderElected, LeadershipNotifier};
}
