//! # Reconcile Demo
//!
//! Runs a scripted lifecycle against the in-memory control plane:
//!
//! 1. Create a tagged cluster and wait for it to become `ACTIVE`.
//! 2. Resize it and change its tags.
//! 3. Try to change its engine (refused as not updatable).
//! 4. Attach a policy to it, then try to attach the same policy again
//!    (refused as already existing).
//! 5. Replace the policy without knowing its id, then delete everything.
//!
//! ```bash
//! cargo run --bin reconcile-demo -- --stabilization-delay 3 --log debug
//! cargo run --bin reconcile-demo -- --deny-tagging
//! ```

use clap::Parser;
use reconcile_framework::tracing::setup_tracing_with;
use reconcile_framework::{EngineConfig, ReconcileOutcome, ReconcileRequest, ResourceModel};
use reconcile_resources::control_plane::ControlPlaneConfig;
use reconcile_resources::lifecycle::{DriverConfig, ReconcileSystem};
use serde_json::json;
use std::error::Error;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};

#[derive(Parser, Debug)]
#[command(name = "reconcile-demo")]
#[command(about = "Drive a scripted resource lifecycle through the reconciliation engine", long_about = None)]
struct Cli {
    /// Milliseconds between progress checks
    #[arg(long, default_value_t = 20)]
    poll_interval_ms: u64,

    /// Describe calls a cluster spends in a transitional status
    #[arg(long, default_value_t = 2)]
    stabilization_delay: u32,

    /// Invocations allowed per operation before the driver gives up
    #[arg(long, default_value_t = 20)]
    max_invocations: u32,

    /// Answer TagResource/UntagResource with AccessDenied
    #[arg(long, default_value_t = false)]
    deny_tagging: bool,

    /// Engine configuration as a JSON file
    #[arg(long)]
    engine_config: Option<std::path::PathBuf>,

    /// Log filter, e.g. "info" or "reconcile_framework=debug"
    #[arg(long, default_value = "info")]
    log: String,
}

fn report(step: &str, outcome: &ReconcileOutcome) {
    match outcome {
        ReconcileOutcome::Success { model, warnings } => {
            info!(step, model = ?model, "Succeeded");
            for warning in warnings {
                warn!(step, category = %warning.category, message = %warning.message, "Warning");
            }
        }
        ReconcileOutcome::Failed(failure) => {
            warn!(step, category = %failure.category, message = %failure.message, "Failed")
        }
        ReconcileOutcome::InProgress { .. } => warn!(step, "Still in progress"),
    }
}

fn model_of(step: &str, outcome: &ReconcileOutcome) -> Result<ResourceModel, String> {
    outcome
        .model()
        .cloned()
        .ok_or_else(|| format!("{step} produced no model"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    setup_tracing_with(&cli.log);

    let engine_config = match &cli.engine_config {
        Some(path) => EngineConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => EngineConfig {
            max_stabilization_checks: Some(cli.max_invocations),
            ..EngineConfig::default()
        },
    };
    let mut plane = ControlPlaneConfig::default().with_stabilization_delay(cli.stabilization_delay);
    if cli.deny_tagging {
        plane = plane.deny("TagResource").deny("UntagResource");
    }
    let driver = DriverConfig {
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
        max_invocations: cli.max_invocations,
    };

    info!(?cli, "Starting reconcile demo");
    let system = ReconcileSystem::with_driver(plane, engine_config, driver);

    // --- Cluster ---
    let cluster = async {
        let desired = ResourceModel::new()
            .with("Name", "analytics")
            .with("Engine", "postgres")
            .with("NodeCount", 3)
            .with("Tags", json!({"team": "data"}));
        let created = system
            .driver
            .drive(&system.clusters, ReconcileRequest::create(desired))
            .await?;
        report("create cluster", &created);
        let current = model_of("create cluster", &created)?;

        let resized = current
            .clone()
            .with("NodeCount", 5)
            .with("Tags", json!({"team": "data", "env": "prod"}));
        let updated = system
            .driver
            .drive(&system.clusters, ReconcileRequest::update(current, resized))
            .await?;
        report("resize cluster", &updated);
        let current = model_of("resize cluster", &updated)?;

        let migrated = current.clone().with("Engine", "mysql");
        let refused = system
            .clusters
            .reconcile(ReconcileRequest::update(current.clone(), migrated))
            .await;
        report("change engine", &refused);

        Ok::<_, Box<dyn Error>>(current)
    }
    .instrument(info_span!("cluster_lifecycle"))
    .await?;

    // --- Policy ---
    let arn = cluster.get_str("Arn").unwrap_or_default().to_string();
    async {
        let policy = ResourceModel::new()
            .with("TargetId", arn.clone())
            .with("Content", r#"{"Effect":"Allow","Action":"read:*"}"#);
        let attached = system
            .driver
            .drive(&system.policies, ReconcileRequest::create(policy.clone()))
            .await?;
        report("attach policy", &attached);

        let duplicate = system.policies.reconcile(ReconcileRequest::create(policy.clone())).await;
        report("attach same policy again", &duplicate);

        // No PolicyId here: the engine finds it by the old content.
        let replacement = policy
            .clone()
            .with("Content", r#"{"Effect":"Allow","Action":"*"}"#);
        let replaced = system
            .driver
            .drive(&system.policies, ReconcileRequest::update(policy, replacement))
            .await?;
        report("replace policy", &replaced);

        let detached = system
            .driver
            .drive(
                &system.policies,
                ReconcileRequest::delete(model_of("replace policy", &replaced)?),
            )
            .await?;
        report("detach policy", &detached);
        Ok::<_, Box<dyn Error>>(())
    }
    .instrument(info_span!("policy_lifecycle"))
    .await?;

    // --- Teardown ---
    let deleted = system
        .driver
        .drive(&system.clusters, ReconcileRequest::delete(cluster))
        .instrument(info_span!("teardown"))
        .await?;
    report("delete cluster", &deleted);

    system.shutdown().await?;
    info!("Demo completed");
    Ok(())
}
