//! # Driver
//!
//! A minimal orchestrator: it keeps calling the engine with the continuation it
//! got back until the outcome is terminal, sleeping between calls. Retrying
//! failed outcomes is left to the caller.

use reconcile_framework::{ReconcileOutcome, ReconcileRequest, ReconciliationEngine, ResourceHandler};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub poll_interval: Duration,
    /// Invocations per logical operation, the first one included.
    pub max_invocations: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            max_invocations: 20,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("{resource_type} {verb} still in progress after {invocations} invocations")]
    Exhausted {
        resource_type: String,
        verb: String,
        invocations: u32,
        last: Box<ReconcileOutcome>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Driver {
    config: DriverConfig,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Runs one logical operation to a terminal outcome.
    pub async fn drive<H: ResourceHandler>(
        &self,
        engine: &ReconciliationEngine<H>,
        mut request: ReconcileRequest,
    ) -> Result<ReconcileOutcome, DriveError> {
        let max = self.config.max_invocations.max(1);
        let mut invocation = 1;
        loop {
            let outcome = engine.reconcile(request.clone()).await;
            let continuation = match outcome.continuation() {
                Some(continuation) => continuation.clone(),
                None => {
                    info!(invocation, "Terminal outcome");
                    return Ok(outcome);
                }
            };

            if invocation >= max {
                warn!(invocation, "Giving up");
                return Err(DriveError::Exhausted {
                    resource_type: engine.handler().schema().type_name.clone(),
                    verb: request.verb.to_string(),
                    invocations: invocation,
                    last: Box::new(outcome),
                });
            }

            debug!(invocation, checks = continuation.checks, "Waiting");
            request = request.with_continuation(continuation);
            tokio::time::sleep(self.config.poll_interval).await;
            invocation += 1;
        }
    }
}
