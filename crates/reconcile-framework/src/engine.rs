//! # Reconciliation Engine
//!
//! This module defines the [`ReconciliationEngine`], which turns one invocation
//! from an orchestrator into one normalized [`ReconcileOutcome`]. It is generic
//! over any [`ResourceHandler`] and owns the parts of reconciliation that do not
//! depend on the resource kind.
//!
//! ## Steps
//!
//! ```text
//! Start → ValidatingImmutability → ResolvingIdentity → Invoking → ReconcilingTags → Done
//!          (update only)            (content-addressed)              (taggable, create/update)
//! ```
//!
//! Each invocation runs the chain once, strictly in order, with no concurrency
//! inside. An invocation that carries a [`ContinuationState`] skips the first two
//! steps and re-enters at `Invoking` as a progress check: the guard and the
//! resolver only apply to the first invocation of a logical operation.
//!
//! Nothing is retried here. Throttling and internal errors come back as
//! `Failed` with a retryable category and the orchestrator decides.

use crate::classify::{classify, OutcomeCategory};
use crate::config::EngineConfig;
use crate::error::RemoteError;
use crate::handler::{Progress, ResourceHandler};
use crate::identity::{IdentityResolver, IdentityToken};
use crate::immutability;
use crate::model::{ResourceModel, Verb};
use crate::outcome::{ContinuationState, Failure, ReconcileOutcome, ReconcileRequest, Warning};
use crate::tags::{diff_with_reserved, TagSet, TagShape};
use tracing::{debug, info, info_span, warn, Instrument};

/// Early exit carrying the terminal outcome.
type Step<T> = Result<T, ReconcileOutcome>;

/// Drives one resource kind against one remote client.
///
/// # Usage Pattern
///
/// 1. **Create**: `ReconciliationEngine::new(handler, client)`.
/// 2. **Configure** (optional): `.with_config(EngineConfig { .. })`.
/// 3. **Invoke**: call [`reconcile`](Self::reconcile) once per orchestrator
///    invocation, feeding back any continuation it returns.
///
/// The engine keeps no state between invocations; it can be shared freely.
pub struct ReconciliationEngine<H: ResourceHandler> {
    handler: H,
    client: H::Client,
    config: EngineConfig,
}

impl<H: ResourceHandler> ReconciliationEngine<H> {
    pub fn new(handler: H, client: H::Client) -> Self {
        Self {
            handler,
            client,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn client(&self) -> &H::Client {
        &self.client
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one invocation.
    pub async fn reconcile(&self, request: ReconcileRequest) -> ReconcileOutcome {
        let span = info_span!(
            "reconcile",
            resource_type = %self.handler.schema().type_name,
            verb = %request.verb,
        );
        async move {
            debug!(desired = ?request.desired, resumed = request.continuation.is_some(), "Invocation");
            let outcome = match self.run(request).await {
                Ok(outcome) | Err(outcome) => outcome,
            };
            match &outcome {
                ReconcileOutcome::Success { warnings, .. } => {
                    info!(warnings = warnings.len(), "Succeeded")
                }
                ReconcileOutcome::Failed(failure) => {
                    warn!(category = %failure.category, message = %failure.message, "Failed")
                }
                ReconcileOutcome::InProgress { continuation, .. } => {
                    info!(checks = continuation.checks, "In progress")
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: ReconcileRequest) -> Step<ReconcileOutcome> {
        let ReconcileRequest {
            verb,
            desired,
            previous,
            continuation,
        } = request;

        if let Some(state) = continuation {
            return self.resume(verb, desired, state).await;
        }

        match verb {
            Verb::Create => self.create(desired).await,
            Verb::Read => self.read(desired).await,
            Verb::Update => self.update(previous, desired).await,
            Verb::Delete => self.delete(desired).await,
        }
    }

    // --- Verbs (first invocation) ---

    async fn create(&self, mut desired: ResourceModel) -> Step<ReconcileOutcome> {
        let desired_tags = self.desired_tags(&desired)?;

        if self.handler.schema().is_content_addressed() {
            if let Some(existing) = self.resolve(&desired).await? {
                warn!(id = %existing.id, "Identical content already exists");
                return Err(ReconcileOutcome::failed(
                    OutcomeCategory::AlreadyExists,
                    format!(
                        "{} with identical content already exists as {}",
                        self.handler.schema().type_name,
                        existing.id
                    ),
                ));
            }
        }

        info!("Invoking create");
        let progress = self
            .handler
            .create(&self.client, &desired)
            .await
            .map_err(|e| self.remote_failure(e))?;

        if let Progress::Done(model) | Progress::Pending { model, .. } = &progress {
            desired = desired.merged_with(model);
        }
        self.settle(Verb::Create, desired, desired_tags, progress, 0)
            .await
    }

    async fn read(&self, mut model: ResourceModel) -> Step<ReconcileOutcome> {
        let addressing = &self.handler.schema().addressing;
        if self.handler.schema().is_content_addressed()
            && IdentityToken::from_model(&model, addressing).is_none()
        {
            match self.resolve(&model).await? {
                Some(token) => token.apply_to(&mut model, addressing),
                None => return Err(self.not_found()),
            }
        }

        info!("Invoking read");
        let mut observed = self
            .handler
            .read(&self.client, &model)
            .await
            .map_err(|e| self.remote_failure(e))?;
        if let Some(token) = IdentityToken::from_model(&model, addressing) {
            if IdentityToken::from_model(&observed, addressing).is_none() {
                token.apply_to(&mut observed, addressing);
            }
        }

        let mut warnings = Vec::new();
        if let Some(field) = self.handler.schema().tags_field.clone() {
            match self.handler.list_tags(&self.client, &observed).await {
                Ok(tags) => {
                    let shape = model.get(&field).map(TagShape::of).unwrap_or_default();
                    observed.set(field, tags.to_value(shape));
                }
                Err(e) if classify(&e) == OutcomeCategory::TagPermissionDenied => {
                    warnings.push(self.tag_warning(&e));
                }
                Err(e) => return Err(self.remote_failure(e)),
            }
        }

        Ok(ReconcileOutcome::Success {
            model: Some(observed),
            warnings,
        })
    }

    async fn update(
        &self,
        previous: Option<ResourceModel>,
        mut desired: ResourceModel,
    ) -> Step<ReconcileOutcome> {
        let schema = self.handler.schema();

        let violations =
            immutability::violations(previous.as_ref(), &desired, &schema.immutable_fields);
        if !violations.is_empty() {
            warn!(?violations, "Create-only fields changed");
            return Err(ReconcileOutcome::Failed(Failure {
                category: OutcomeCategory::NotUpdatable,
                message: format!(
                    "cannot update create-only field(s) {} of {}",
                    violations.join(", "),
                    schema.type_name
                ),
                model: previous,
                error: None,
            }));
        }

        let desired_tags = self.desired_tags(&desired)?;

        if schema.is_content_addressed()
            && IdentityToken::from_model(&desired, &schema.addressing).is_none()
        {
            let known = previous
                .as_ref()
                .and_then(|p| IdentityToken::from_model(p, &schema.addressing));
            let token = match known {
                Some(token) => token,
                // The remote still holds the old content, so match on that.
                None => match self.resolve(previous.as_ref().unwrap_or(&desired)).await? {
                    Some(token) => token,
                    None => return Err(self.not_found()),
                },
            };
            debug!(id = %token.id, version = %token.version, "Forwarding identity");
            token.apply_to(&mut desired, &schema.addressing);
        }

        info!("Invoking update");
        let progress = self
            .handler
            .update(&self.client, previous.as_ref(), &desired)
            .await
            .map_err(|e| self.remote_failure(e))?;

        if let Progress::Done(model) | Progress::Pending { model, .. } = &progress {
            desired = desired.merged_with(model);
        }
        self.settle(Verb::Update, desired, desired_tags, progress, 0)
            .await
    }

    async fn delete(&self, mut model: ResourceModel) -> Step<ReconcileOutcome> {
        let addressing = &self.handler.schema().addressing;
        if self.handler.schema().is_content_addressed()
            && IdentityToken::from_model(&model, addressing).is_none()
        {
            match self.resolve(&model).await? {
                Some(token) => token.apply_to(&mut model, addressing),
                None => {
                    info!("Nothing to delete");
                    return Ok(ReconcileOutcome::gone());
                }
            }
        }

        info!("Invoking delete");
        match self.handler.delete(&self.client, &model).await {
            Ok(progress) => self.settle(Verb::Delete, model, None, progress, 0).await,
            Err(e) if classify(&e) == OutcomeCategory::NotFound => {
                info!("Already deleted");
                Ok(ReconcileOutcome::gone())
            }
            Err(e) => Err(self.remote_failure(e)),
        }
    }

    // --- Resumption ---

    async fn resume(
        &self,
        verb: Verb,
        desired: ResourceModel,
        state: ContinuationState,
    ) -> Step<ReconcileOutcome> {
        if state.verb != verb {
            return Err(ReconcileOutcome::failed(
                OutcomeCategory::InvalidRequest,
                format!(
                    "continuation belongs to a {} operation, not {}",
                    state.verb, verb
                ),
            ));
        }
        if let Some(max) = self.config.max_stabilization_checks {
            if state.checks >= max {
                return Err(ReconcileOutcome::failed(
                    OutcomeCategory::Unknown,
                    format!(
                        "{} did not stabilize after {} checks",
                        self.handler.schema().type_name,
                        state.checks
                    ),
                ));
            }
        }

        let addressing = &self.handler.schema().addressing;
        let mut known = state.model;
        if let Some(token) = &state.identity {
            if IdentityToken::from_model(&known, addressing).is_none() {
                token.apply_to(&mut known, addressing);
            }
        }

        info!(checks = state.checks, "Checking progress");
        let progress = match self
            .handler
            .check_progress(&self.client, verb, &known, &state.data)
            .await
        {
            Ok(progress) => progress,
            Err(e) if verb == Verb::Delete && classify(&e) == OutcomeCategory::NotFound => {
                info!("Delete completed");
                return Ok(ReconcileOutcome::gone());
            }
            Err(e) => return Err(self.remote_failure(e)),
        };

        let desired_tags = match verb {
            Verb::Create | Verb::Update => self.desired_tags(&desired)?,
            Verb::Read | Verb::Delete => None,
        };
        let mut base = desired.merged_with(&known);
        if let Progress::Done(model) | Progress::Pending { model, .. } = &progress {
            base = base.merged_with(model);
        }
        self.settle(verb, base, desired_tags, progress, state.checks + 1)
            .await
    }

    // --- Completion ---

    /// Turns handler progress into an outcome: pending operations become
    /// `InProgress`, finished creates and updates go on to tag reconciliation.
    async fn settle(
        &self,
        verb: Verb,
        model: ResourceModel,
        desired_tags: Option<TagSet>,
        progress: Progress,
        checks: u32,
    ) -> Step<ReconcileOutcome> {
        match progress {
            Progress::Pending { data, .. } => {
                let identity =
                    IdentityToken::from_model(&model, &self.handler.schema().addressing);
                Ok(ReconcileOutcome::InProgress {
                    model: model.clone(),
                    continuation: ContinuationState {
                        verb,
                        model,
                        identity,
                        checks,
                        data,
                    },
                })
            }
            Progress::Done(_) if verb == Verb::Delete => Ok(ReconcileOutcome::gone()),
            Progress::Done(_) => self.reconcile_tags(model, desired_tags).await,
        }
    }

    /// Brings remote tags in line with the desired set, reading the observed
    /// set fresh in this invocation.
    async fn reconcile_tags(
        &self,
        mut model: ResourceModel,
        desired_tags: Option<TagSet>,
    ) -> Step<ReconcileOutcome> {
        let (Some(field), Some(desired_tags)) =
            (self.handler.schema().tags_field.clone(), desired_tags)
        else {
            return Ok(ReconcileOutcome::success(model));
        };

        let observed = match self.handler.list_tags(&self.client, &model).await {
            Ok(observed) => observed,
            Err(e) if classify(&e) == OutcomeCategory::TagPermissionDenied => {
                return Ok(ReconcileOutcome::Success {
                    warnings: vec![self.tag_warning(&e)],
                    model: Some(model),
                });
            }
            Err(e) => return Err(self.remote_failure(e)),
        };
        let delta = diff_with_reserved(
            Some(&desired_tags),
            &observed,
            &self.config.reserved_tag_prefixes,
        );
        debug!(
            add = delta.to_add.len(),
            remove = delta.to_remove.len(),
            "Tag delta"
        );

        let mut applied = observed;
        let mut warnings = Vec::new();
        let mut fatal: Option<RemoteError> = None;

        // Remove and add are independent calls: one failing does not stop the other.
        let keys = delta.keys_to_untag();
        if !keys.is_empty() {
            match self.handler.untag(&self.client, &model, &keys).await {
                Ok(()) => {
                    for key in &keys {
                        applied.remove(key);
                    }
                }
                Err(e) => self.record_tag_error(e, &mut warnings, &mut fatal),
            }
        }
        if !delta.to_add.is_empty() {
            match self.handler.tag(&self.client, &model, &delta.to_add).await {
                Ok(()) => {
                    for (key, value) in delta.to_add.iter() {
                        applied.insert(key.clone(), value.clone());
                    }
                }
                Err(e) => self.record_tag_error(e, &mut warnings, &mut fatal),
            }
        }

        if let Some(e) = fatal {
            return Err(self.remote_failure(e));
        }

        let shape = model.get(&field).map(TagShape::of).unwrap_or_default();
        model.set(field, applied.to_value(shape));
        Ok(ReconcileOutcome::Success {
            model: Some(model),
            warnings,
        })
    }

    fn record_tag_error(
        &self,
        error: RemoteError,
        warnings: &mut Vec<Warning>,
        fatal: &mut Option<RemoteError>,
    ) {
        if classify(&error) == OutcomeCategory::TagPermissionDenied {
            warnings.push(self.tag_warning(&error));
        } else if fatal.is_none() {
            *fatal = Some(error);
        }
    }

    // --- Helpers ---

    async fn resolve(&self, model: &ResourceModel) -> Step<Option<IdentityToken>> {
        IdentityResolver::new(&self.handler, &self.client, self.config.max_list_pages)
            .resolve(model)
            .await
            .map_err(|e| self.remote_failure(e))
    }

    /// Parses the desired tag field. `None` means no tag intent.
    fn desired_tags(&self, desired: &ResourceModel) -> Step<Option<TagSet>> {
        let Some(field) = &self.handler.schema().tags_field else {
            return Ok(None);
        };
        match desired.get(field) {
            None => Ok(None),
            Some(value) => TagSet::from_value(value).map(Some).map_err(|e| {
                ReconcileOutcome::failed(OutcomeCategory::InvalidRequest, format!("{field}: {e}"))
            }),
        }
    }

    fn not_found(&self) -> ReconcileOutcome {
        ReconcileOutcome::failed(
            OutcomeCategory::NotFound,
            format!(
                "no {} with matching content was found",
                self.handler.schema().type_name
            ),
        )
    }

    fn tag_warning(&self, error: &RemoteError) -> Warning {
        warn!(error = %error, "Tagging not permitted; continuing without tags");
        Warning {
            category: OutcomeCategory::TagPermissionDenied,
            message: error.message.clone(),
        }
    }

    fn remote_failure(&self, error: RemoteError) -> ReconcileOutcome {
        let category = classify(&error);
        let message = match (&category, &error.request) {
            (OutcomeCategory::InvalidRequest, Some(request)) => {
                format!("{error} (request: {request})")
            }
            _ => error.to_string(),
        };
        warn!(category = %category, error = %error, "Remote call failed");
        ReconcileOutcome::Failed(Failure {
            category,
            message,
            model: None,
            error: Some(error),
        })
    }
}
