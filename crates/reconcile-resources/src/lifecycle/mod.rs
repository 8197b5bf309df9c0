//! # System Lifecycle & Orchestration
//!
//! Starts the in-memory control plane, wires one [`ReconciliationEngine`] per
//! resource kind to it, and shuts everything down again.
//!
//! ## The ReconcileSystem Pattern
//!
//! ```rust,ignore
//! let system = ReconcileSystem::new(ControlPlaneConfig::default(), EngineConfig::default());
//!
//! let outcome = system.driver.drive(&system.clusters, ReconcileRequest::create(desired)).await?;
//!
//! system.shutdown().await?;
//! ```
//!
//! ## Graceful Shutdown
//!
//! 1. **Drop all clients** - every engine holds a clone of the control plane
//!    client, so the engines go too.
//! 2. **Actor detects closure** - `receiver.recv()` returns `None`.
//! 3. **Await completion** - wait for the actor task to finish.

pub mod driver;

pub use driver::{DriveError, Driver, DriverConfig};

use crate::cluster::ClusterHandler;
use crate::control_plane::{self, ControlPlaneClient, ControlPlaneConfig};
use crate::target_policy::TargetPolicyHandler;
use reconcile_framework::{EngineConfig, ReconciliationEngine};
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("control plane task failed: {0}")]
    ControlPlane(#[from] tokio::task::JoinError),
}

/// The running system: control plane plus one engine per kind.
pub struct ReconcileSystem {
    pub clusters: ReconciliationEngine<ClusterHandler>,
    pub policies: ReconciliationEngine<TargetPolicyHandler>,
    /// Direct access for fault injection and out-of-band inspection.
    pub control_plane: ControlPlaneClient,
    pub driver: Driver,
    handle: JoinHandle<()>,
}

impl ReconcileSystem {
    pub fn new(plane: ControlPlaneConfig, engine: EngineConfig) -> Self {
        Self::with_driver(plane, engine, DriverConfig::default())
    }

    /// Must be called from within a Tokio runtime.
    pub fn with_driver(plane: ControlPlaneConfig, engine: EngineConfig, driver: DriverConfig) -> Self {
        let (control_plane, handle) = control_plane::spawn(plane);

        let clusters = ReconciliationEngine::new(ClusterHandler::new(), control_plane.clone())
            .with_config(engine.clone());
        let policies = ReconciliationEngine::new(TargetPolicyHandler::new(), control_plane.clone())
            .with_config(engine);

        Self {
            clusters,
            policies,
            control_plane,
            driver: Driver::new(driver),
            handle,
        }
    }

    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        info!("Shutting down system...");

        let Self {
            clusters,
            policies,
            control_plane,
            handle,
            ..
        } = self;
        drop(clusters);
        drop(policies);
        drop(control_plane);

        if let Err(e) = handle.await {
            error!(error = %e, "Control plane task failed");
            return Err(e.into());
        }

        info!("System shut down cleanly");
        Ok(())
    }
}
