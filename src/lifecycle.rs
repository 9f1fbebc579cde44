//! Lifecycle Binding
//!
//! Funnels process-bootstrap and settings-change triggers into the
//! engine's idempotent `ensure_client` entry point. Settings changes are
//! scoped: only events for this component's settings group are acted on.

use tokio::sync::mpsc;

use crate::election::ElectionEngine;

/// Settings group this component listens to
pub const SETTINGS_GROUP: &str = "zkelect";

/// Triggers consumed by the binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Process has booted
    Bootstrap,
    /// A settings group changed at runtime
    SettingsChanged { group: String },
}

/// Binds the election engine to application lifecycle signals
pub struct LifecycleBinding {
    engine: ElectionEngine,
}

impl LifecycleBinding {
    /// Create a new binding
    pub fn new(engine: ElectionEngine) -> Self {
        Self { engine }
    }

    /// Consume lifecycle events until the channel closes
    ///
    /// Errors from `ensure_client` are logged and absorbed; nothing in the
    /// election subsystem escalates to a process-fatal fault. A failed
    /// connect simply waits for the next trigger.
    pub async fn run(self, mut events: mpsc::Receiver<LifecycleEvent>) {
        tracing::info!("Lifecycle binding started");

        while let Some(event) = events.recv().await {
            match event {
                LifecycleEvent::Bootstrap => {
                    tracing::info!("Bootstrap trigger received");
                    self.trigger().await;
                }
                LifecycleEvent::SettingsChanged { group } if group == SETTINGS_GROUP => {
                    tracing::info!("Settings changed for group '{}'", group);
                    self.trigger().await;
                }
                LifecycleEvent::SettingsChanged { group } => {
                    tracing::trace!("Ignoring settings change for group '{}'", group);
                }
            }
        }

        tracing::info!("Lifecycle binding stopped");
    }

    async fn trigger(&self) {
        if let Err(e) = self.engine.ensure_client().await {
            tracing::warn!("Election bootstrap failed, waiting for next trigger: {}", e);
        }
    }
}
