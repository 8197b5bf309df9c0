//! # Control Plane Actor
//!
//! The server half of the in-memory control plane. It owns every cluster,
//! policy and tag, and processes calls one at a time from its channel, so the
//! state needs no locks.
//!
//! ## Behaviour
//!
//! * **Clusters** are keyed by name. Create, update and delete put the cluster
//!   in a transitional status (`CREATING`, `UPDATING`, `DELETING`) for
//!   `stabilization_delay` describe calls; a deleting cluster disappears on the
//!   describe that finishes it.
//! * **Policies** get a server-assigned id and a revision that changes on every
//!   content change. Updates and deletes must name the current revision.
//! * **Tags** hang off ARNs and only exist while the cluster does.
//! * **Faults**: denied actions always answer `AccessDenied`; injected faults
//!   answer the next call of their action once.

use super::client::ControlPlaneClient;
use super::config::ControlPlaneConfig;
use super::message::{
    ApiError, ApiErrorCode, ApiRequest, ApiResponse, ClusterDescription, ClusterStatus,
    ControlMessage, PolicyDescription, Tags,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const MAX_TAGS_PER_RESOURCE: usize = 50;

struct ClusterRecord {
    description: ClusterDescription,
    /// Describe calls left before the current transition completes.
    remaining: u32,
}

pub struct ControlPlaneActor {
    receiver: mpsc::Receiver<ControlMessage>,
    config: ControlPlaneConfig,
    clusters: HashMap<String, ClusterRecord>,
    policies: BTreeMap<String, PolicyDescription>,
    tags: HashMap<String, Tags>,
    faults: HashMap<String, VecDeque<ApiError>>,
    next_id: u32,
}

impl ControlPlaneActor {
    /// Creates the actor and a client connected to it. The actor does nothing
    /// until [`run`](Self::run) is spawned.
    pub fn new(config: ControlPlaneConfig) -> (Self, ControlPlaneClient) {
        let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
        let actor = Self {
            receiver,
            config,
            clusters: HashMap::new(),
            policies: BTreeMap::new(),
            tags: HashMap::new(),
            faults: HashMap::new(),
            next_id: 1,
        };
        (actor, ControlPlaneClient::new(sender))
    }

    /// Processes messages until every client is dropped.
    pub async fn run(mut self) {
        info!(
            stabilization_delay = self.config.stabilization_delay,
            "Control plane started"
        );

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ControlMessage::Call {
                    request,
                    respond_to,
                } => {
                    let action = request.action();
                    debug!(action, ?request, "Call");
                    let result = self.handle(request);
                    match &result {
                        Ok(_) => debug!(action, "Ok"),
                        Err(e) => warn!(action, error = %e, "Rejected"),
                    }
                    let _ = respond_to.send(result);
                }
                ControlMessage::InjectFault {
                    action,
                    error,
                    respond_to,
                } => {
                    info!(%action, code = %error.code, "Fault queued");
                    self.faults.entry(action).or_default().push_back(error);
                    let _ = respond_to.send(());
                }
            }
        }

        info!(
            clusters = self.clusters.len(),
            policies = self.policies.len(),
            "Shutdown"
        );
    }

    fn handle(&mut self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let action = request.action();
        if let Some(fault) = self.faults.get_mut(action).and_then(VecDeque::pop_front) {
            return Err(fault);
        }
        if self.config.is_denied(action) {
            return Err(ApiError::new(
                ApiErrorCode::AccessDenied,
                format!("User is not authorized to perform: control-plane:{action}"),
            ));
        }

        match request {
            ApiRequest::CreateCluster {
                name,
                engine,
                node_count,
                tags,
            } => self.create_cluster(name, engine, node_count, tags),
            ApiRequest::DescribeCluster { name } => self.describe_cluster(&name),
            ApiRequest::UpdateCluster { name, node_count } => self.update_cluster(&name, node_count),
            ApiRequest::DeleteCluster { name } => self.delete_cluster(&name),
            ApiRequest::PutPolicy {
                target_id,
                content,
                policy_id,
                revision_id,
            } => self.put_policy(target_id, content, policy_id, revision_id),
            ApiRequest::GetPolicy { policy_id } => self
                .policies
                .get(&policy_id)
                .cloned()
                .map(ApiResponse::Policy)
                .ok_or_else(|| policy_not_found(&policy_id)),
            ApiRequest::ListPolicies {
                target_id,
                next_token,
            } => self.list_policies(&target_id, next_token.as_deref()),
            ApiRequest::DeletePolicy {
                policy_id,
                revision_id,
            } => self.delete_policy(&policy_id, &revision_id),
            ApiRequest::ListTagsForResource { arn } => {
                self.require_arn(&arn)?;
                Ok(ApiResponse::Tags(
                    self.tags.get(&arn).cloned().unwrap_or_default(),
                ))
            }
            ApiRequest::TagResource { arn, tags } => self.tag_resource(arn, tags),
            ApiRequest::UntagResource { arn, keys } => {
                self.require_arn(&arn)?;
                if let Some(existing) = self.tags.get_mut(&arn) {
                    for key in &keys {
                        existing.remove(key);
                    }
                }
                Ok(ApiResponse::Ack)
            }
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn transition_status(&self, status: ClusterStatus) -> ClusterStatus {
        if self.config.stabilization_delay == 0 {
            ClusterStatus::Active
        } else {
            status
        }
    }

    // --- Clusters ---

    fn create_cluster(
        &mut self,
        name: String,
        engine: String,
        node_count: u32,
        tags: Tags,
    ) -> Result<ApiResponse, ApiError> {
        if name.is_empty() {
            return Err(invalid("cluster name must not be empty"));
        }
        if node_count == 0 {
            return Err(invalid("node count must be at least 1"));
        }
        if self.clusters.contains_key(&name) {
            return Err(ApiError::new(
                ApiErrorCode::ResourceInUse,
                format!("Cluster {name} already exists"),
            ));
        }
        if self.clusters.len() >= self.config.max_clusters {
            return Err(ApiError::new(
                ApiErrorCode::LimitExceeded,
                format!("Account limit of {} clusters reached", self.config.max_clusters),
            ));
        }

        let description = ClusterDescription {
            arn: format!("arn:example:compute:cluster/{name}"),
            name: name.clone(),
            engine,
            node_count,
            status: self.transition_status(ClusterStatus::Creating),
        };
        self.tags.insert(description.arn.clone(), tags);
        self.clusters.insert(
            name,
            ClusterRecord {
                description: description.clone(),
                remaining: self.config.stabilization_delay,
            },
        );
        info!(arn = %description.arn, size = self.clusters.len(), "Created");
        Ok(ApiResponse::Cluster(description))
    }

    fn describe_cluster(&mut self, name: &str) -> Result<ApiResponse, ApiError> {
        let record = self
            .clusters
            .get_mut(name)
            .ok_or_else(|| cluster_not_found(name))?;

        if record.description.status.is_transitional() {
            record.remaining = record.remaining.saturating_sub(1);
            if record.remaining == 0 {
                if record.description.status == ClusterStatus::Deleting {
                    let arn = record.description.arn.clone();
                    self.clusters.remove(name);
                    self.tags.remove(&arn);
                    info!(%arn, size = self.clusters.len(), "Deleted");
                    return Err(cluster_not_found(name));
                }
                record.description.status = ClusterStatus::Active;
                info!(arn = %record.description.arn, "Active");
            }
        }
        Ok(ApiResponse::Cluster(record.description.clone()))
    }

    fn update_cluster(&mut self, name: &str, node_count: u32) -> Result<ApiResponse, ApiError> {
        if node_count == 0 {
            return Err(invalid("node count must be at least 1"));
        }
        let status = self.transition_status(ClusterStatus::Updating);
        let delay = self.config.stabilization_delay;
        let record = self
            .clusters
            .get_mut(name)
            .ok_or_else(|| cluster_not_found(name))?;

        if record.description.status != ClusterStatus::Active {
            return Err(invalid(format!(
                "Cluster {name} is {}, not ACTIVE",
                record.description.status
            )));
        }
        if record.description.node_count != node_count {
            record.description.node_count = node_count;
            record.description.status = status;
            record.remaining = delay;
            info!(arn = %record.description.arn, node_count, "Updated");
        }
        Ok(ApiResponse::Cluster(record.description.clone()))
    }

    fn delete_cluster(&mut self, name: &str) -> Result<ApiResponse, ApiError> {
        if self.config.stabilization_delay == 0 {
            let record = self
                .clusters
                .remove(name)
                .ok_or_else(|| cluster_not_found(name))?;
            self.tags.remove(&record.description.arn);
            info!(arn = %record.description.arn, size = self.clusters.len(), "Deleted");
            return Ok(ApiResponse::Ack);
        }

        let delay = self.config.stabilization_delay;
        let record = self
            .clusters
            .get_mut(name)
            .ok_or_else(|| cluster_not_found(name))?;
        if record.description.status != ClusterStatus::Deleting {
            record.description.status = ClusterStatus::Deleting;
            record.remaining = delay;
        }
        Ok(ApiResponse::Cluster(record.description.clone()))
    }

    // --- Policies ---

    fn put_policy(
        &mut self,
        target_id: String,
        content: String,
        policy_id: Option<String>,
        revision_id: Option<String>,
    ) -> Result<ApiResponse, ApiError> {
        if target_id.is_empty() {
            return Err(invalid("target id must not be empty"));
        }
        if content.trim().is_empty() {
            return Err(invalid("policy content must not be empty"));
        }

        let Some(policy_id) = policy_id else {
            let policy = PolicyDescription {
                policy_id: format!("pol-{}", self.next_id()),
                revision_id: format!("rev-{}", self.next_id()),
                target_id,
                content,
            };
            info!(policy_id = %policy.policy_id, target_id = %policy.target_id, "Attached");
            self.policies.insert(policy.policy_id.clone(), policy.clone());
            return Ok(ApiResponse::Policy(policy));
        };

        let current = self
            .policies
            .get(&policy_id)
            .ok_or_else(|| policy_not_found(&policy_id))?;
        if current.target_id != target_id {
            return Err(invalid(format!(
                "policy {policy_id} is attached to {}",
                current.target_id
            )));
        }
        check_revision(current, revision_id.as_deref())?;
        if current.content == content {
            return Ok(ApiResponse::Policy(current.clone()));
        }

        let mut updated = current.clone();
        updated.content = content;
        updated.revision_id = format!("rev-{}", self.next_id());
        info!(%policy_id, revision_id = %updated.revision_id, "Replaced");
        self.policies.insert(policy_id, updated.clone());
        Ok(ApiResponse::Policy(updated))
    }

    fn list_policies(
        &self,
        target_id: &str,
        next_token: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let offset = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| invalid(format!("invalid next token {token}")))?,
            None => 0,
        };
        let page_size = self.config.page_size.max(1);

        let matching: Vec<&PolicyDescription> = self
            .policies
            .values()
            .filter(|p| p.target_id == target_id)
            .collect();
        let policies = matching
            .iter()
            .skip(offset)
            .take(page_size)
            .map(|p| (*p).clone())
            .collect();
        let next_token =
            (offset + page_size < matching.len()).then(|| (offset + page_size).to_string());

        Ok(ApiResponse::PolicyPage {
            policies,
            next_token,
        })
    }

    fn delete_policy(&mut self, policy_id: &str, revision_id: &str) -> Result<ApiResponse, ApiError> {
        let current = self
            .policies
            .get(policy_id)
            .ok_or_else(|| policy_not_found(policy_id))?;
        check_revision(current, Some(revision_id))?;
        self.policies.remove(policy_id);
        info!(%policy_id, "Detached");
        Ok(ApiResponse::Ack)
    }

    // --- Tags ---

    fn require_arn(&self, arn: &str) -> Result<(), ApiError> {
        if self.clusters.values().any(|c| c.description.arn == arn) {
            Ok(())
        } else {
            Err(ApiError::new(
                ApiErrorCode::ResourceNotFound,
                format!("No resource with ARN {arn}"),
            ))
        }
    }

    fn tag_resource(&mut self, arn: String, tags: Tags) -> Result<ApiResponse, ApiError> {
        self.require_arn(&arn)?;
        let existing = self.tags.entry(arn).or_default();
        let added = tags.keys().filter(|k| !existing.contains_key(*k)).count();
        if existing.len() + added > MAX_TAGS_PER_RESOURCE {
            return Err(ApiError::new(
                ApiErrorCode::LimitExceeded,
                format!("A resource can carry at most {MAX_TAGS_PER_RESOURCE} tags"),
            ));
        }
        existing.extend(tags);
        Ok(ApiResponse::Ack)
    }
}

fn check_revision(current: &PolicyDescription, revision_id: Option<&str>) -> Result<(), ApiError> {
    if revision_id == Some(current.revision_id.as_str()) {
        return Ok(());
    }
    Err(ApiError::new(
        ApiErrorCode::ConcurrentModification,
        format!(
            "revision {} of policy {} is not current",
            revision_id.unwrap_or("<none>"),
            current.policy_id
        ),
    ))
}

fn invalid(message: impl Into<String>) -> ApiError {
    ApiError::new(ApiErrorCode::InvalidParameter, message)
}

fn cluster_not_found(name: &str) -> ApiError {
    ApiError::new(
        ApiErrorCode::ResourceNotFound,
        format!("Cluster {name} not found"),
    )
}

fn policy_not_found(policy_id: &str) -> ApiError {
    ApiError::new(
        ApiErrorCode::ResourceNotFound,
        format!("Policy {policy_id} not found"),
    )
}
