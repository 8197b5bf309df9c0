use async_trait::async_trait;
use reconcile_framework::mock::MockRemote;
use reconcile_framework::{
    ContinuationState, EngineConfig, IdentityToken, ListPage, ListedEntry, OutcomeCategory,
    Progress, ReconcileOutcome, ReconcileRequest, ReconciliationEngine, RemoteClient, RemoteError,
    ResourceHandler, ResourceModel, ResourceSchema, TagSet, Verb,
};
use serde_json::{json, Value};

// --- Wire shapes shared by the test kinds ---

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create(ResourceModel),
    Describe(String),
    Update(ResourceModel),
    Delete(String),
    List { parent: String, token: Option<String> },
    ListTags(String),
    Tag(String, TagSet),
    Untag(String, Vec<String>),
}

#[derive(Debug)]
enum Reply {
    Model(ResourceModel),
    Page(ListPage),
    Tags(TagSet),
    Done,
}

type Mock = MockRemote<Call, Reply>;

fn into_model(reply: Reply) -> ResourceModel {
    match reply {
        Reply::Model(model) => model,
        other => panic!("expected a model, got {other:?}"),
    }
}

fn progress_of(model: ResourceModel) -> Progress {
    let status = model.get_str("Status").map(str::to_string);
    match status.as_deref() {
        Some("CREATING" | "UPDATING" | "DELETING") => {
            Progress::pending(model, json!({ "status": status }))
        }
        _ => Progress::done(model),
    }
}

fn tags(pairs: &[(&str, &str)]) -> TagSet {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

// --- Widget: caller-keyed, taggable, asynchronous ---

struct Widgets {
    schema: ResourceSchema,
}

impl Widgets {
    fn new() -> Self {
        Self {
            schema: ResourceSchema::caller_keyed("Test::Widget", "Name")
                .with_immutable_fields(["Region"])
                .with_tags("Tags"),
        }
    }
}

fn name(model: &ResourceModel) -> String {
    model.get_str("Name").unwrap_or_default().to_string()
}

#[async_trait]
impl ResourceHandler for Widgets {
    type Client = Mock;

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    async fn create(&self, client: &Mock, desired: &ResourceModel) -> Result<Progress, RemoteError> {
        let reply = client.invoke(Call::Create(desired.clone())).await?;
        Ok(progress_of(into_model(reply)))
    }

    async fn read(&self, client: &Mock, model: &ResourceModel) -> Result<ResourceModel, RemoteError> {
        Ok(into_model(client.invoke(Call::Describe(name(model))).await?))
    }

    async fn update(
        &self,
        client: &Mock,
        _previous: Option<&ResourceModel>,
        desired: &ResourceModel,
    ) -> Result<Progress, RemoteError> {
        let reply = client.invoke(Call::Update(desired.clone())).await?;
        Ok(progress_of(into_model(reply)))
    }

    async fn delete(&self, client: &Mock, model: &ResourceModel) -> Result<Progress, RemoteError> {
        match client.invoke(Call::Delete(name(model))).await? {
            Reply::Model(observed) => Ok(progress_of(observed)),
            _ => Ok(Progress::done(model.clone())),
        }
    }

    async fn check_progress(
        &self,
        client: &Mock,
        _verb: Verb,
        model: &ResourceModel,
        _data: &Value,
    ) -> Result<Progress, RemoteError> {
        let reply = client.invoke(Call::Describe(name(model))).await?;
        Ok(progress_of(into_model(reply)))
    }

    async fn list_tags(&self, client: &Mock, model: &ResourceModel) -> Result<TagSet, RemoteError> {
        match client.invoke(Call::ListTags(name(model))).await? {
            Reply::Tags(tags) => Ok(tags),
            other => panic!("expected tags, got {other:?}"),
        }
    }

    async fn tag(&self, client: &Mock, model: &ResourceModel, tags: &TagSet) -> Result<(), RemoteError> {
        client.invoke(Call::Tag(name(model), tags.clone())).await.map(|_| ())
    }

    async fn untag(&self, client: &Mock, model: &ResourceModel, keys: &[String]) -> Result<(), RemoteError> {
        client
            .invoke(Call::Untag(name(model), keys.to_vec()))
            .await
            .map(|_| ())
    }
}

fn widget_engine() -> (ReconciliationEngine<Widgets>, Mock) {
    let mock = Mock::new();
    (ReconciliationEngine::new(Widgets::new(), mock.clone()), mock)
}

fn widget(region: &str) -> ResourceModel {
    ResourceModel::new()
        .with("Name", "w1")
        .with("Region", region)
        .with("Size", 2)
}

fn active(model: &ResourceModel) -> Reply {
    Reply::Model(
        model
            .clone()
            .with("Arn", "arn:widget/w1")
            .with("Status", "ACTIVE"),
    )
}

// --- Note: content-addressed, synchronous, not taggable ---

struct Notes {
    schema: ResourceSchema,
}

impl Notes {
    fn new() -> Self {
        Self {
            schema: ResourceSchema::content_addressed("Test::Note", "Parent", "Body", "NoteId", "Revision")
                .with_immutable_fields(["Parent"]),
        }
    }
}

fn note_id(model: &ResourceModel) -> String {
    model.get_str("NoteId").unwrap_or_default().to_string()
}

#[async_trait]
impl ResourceHandler for Notes {
    type Client = Mock;

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    async fn create(&self, client: &Mock, desired: &ResourceModel) -> Result<Progress, RemoteError> {
        let reply = client.invoke(Call::Create(desired.clone())).await?;
        Ok(Progress::done(into_model(reply)))
    }

    async fn read(&self, client: &Mock, model: &ResourceModel) -> Result<ResourceModel, RemoteError> {
        Ok(into_model(client.invoke(Call::Describe(note_id(model))).await?))
    }

    async fn update(
        &self,
        client: &Mock,
        _previous: Option<&ResourceModel>,
        desired: &ResourceModel,
    ) -> Result<Progress, RemoteError> {
        let reply = client.invoke(Call::Update(desired.clone())).await?;
        Ok(Progress::done(into_model(reply)))
    }

    async fn delete(&self, client: &Mock, model: &ResourceModel) -> Result<Progress, RemoteError> {
        client.invoke(Call::Delete(note_id(model))).await?;
        Ok(Progress::done(model.clone()))
    }

    async fn list_page(
        &self,
        client: &Mock,
        scope: &ResourceModel,
        next_token: Option<String>,
    ) -> Result<ListPage, RemoteError> {
        let parent = scope.get_str("Parent").unwrap_or_default().to_string();
        match client.invoke(Call::List { parent, token: next_token }).await? {
            Reply::Page(page) => Ok(page),
            other => panic!("expected a page, got {other:?}"),
        }
    }
}

fn note_engine() -> (ReconciliationEngine<Notes>, Mock) {
    let mock = Mock::new();
    (ReconciliationEngine::new(Notes::new(), mock.clone()), mock)
}

fn note(body: &str) -> ResourceModel {
    ResourceModel::new().with("Parent", "r-1").with("Body", body)
}

fn page(entries: &[(&str, &str, &str)], next: Option<&str>) -> Reply {
    Reply::Page(ListPage {
        entries: entries
            .iter()
            .map(|(body, id, rev)| ListedEntry {
                content: json!(body),
                token: IdentityToken::new(*id, *rev),
            })
            .collect(),
        next_token: next.map(str::to_string),
    })
}

// =============================================================================
// Caller-keyed lifecycle
// =============================================================================

#[tokio::test]
async fn test_create_merges_server_fields() {
    let (engine, mock) = widget_engine();
    // Null tags mean no tag intent, so no tag calls are made.
    let desired = widget("eu").with("Tags", Value::Null);
    mock.expect_call("create").return_ok(active(&widget("eu")));

    let outcome = engine.reconcile(ReconcileRequest::create(desired)).await;

    assert!(outcome.is_success(), "{outcome:?}");
    let model = outcome.model().unwrap();
    assert_eq!(model.get_str("Arn"), Some("arn:widget/w1"));
    assert_eq!(model.get_u64("Size"), Some(2));
    assert!(outcome.warnings().is_empty());
    mock.verify();
    assert_eq!(mock.calls().len(), 1);
}

#[tokio::test]
async fn test_long_running_create_resumes_until_active() {
    let (engine, mock) = widget_engine();
    let desired = widget("eu").with("Tags", json!({"env": "prod"}));

    mock.expect_call("create")
        .return_ok(Reply::Model(widget("eu").with("Status", "CREATING")));
    let first = engine.reconcile(ReconcileRequest::create(desired.clone())).await;
    assert!(first.is_in_progress());
    let state = first.continuation().unwrap().clone();
    assert_eq!(state.checks, 0);
    assert_eq!(state.verb, Verb::Create);

    mock.expect_call("still creating")
        .return_ok(Reply::Model(widget("eu").with("Status", "CREATING")));
    let second = engine
        .reconcile(ReconcileRequest::create(desired.clone()).with_continuation(state))
        .await;
    let state = second.continuation().unwrap().clone();
    assert_eq!(state.checks, 1);

    mock.expect_call("active").return_ok(active(&widget("eu")));
    mock.expect_call("list tags").return_ok(Reply::Tags(TagSet::new()));
    mock.expect_call("tag")
        .matching(|c| *c == Call::Tag("w1".into(), tags(&[("env", "prod")])))
        .return_ok(Reply::Done);
    let last = engine
        .reconcile(ReconcileRequest::create(desired).with_continuation(state))
        .await;

    assert!(last.is_success(), "{last:?}");
    let model = last.model().unwrap();
    assert_eq!(model.get("Tags"), Some(&json!({"env": "prod"})));
    assert_eq!(model.get_str("Status"), Some("ACTIVE"));
    mock.verify();

    let creates = mock
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Create(_)))
        .count();
    assert_eq!(creates, 1);
}

#[tokio::test]
async fn test_immutable_change_is_refused_without_remote_calls() {
    let (engine, mock) = widget_engine();
    let previous = widget("eu");

    let outcome = engine
        .reconcile(ReconcileRequest::update(previous.clone(), widget("us")))
        .await;

    assert_eq!(outcome.category(), Some(OutcomeCategory::NotUpdatable));
    assert!(outcome.message().unwrap().contains("Region"));
    assert_eq!(outcome.model(), Some(&previous));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_resumed_update_skips_immutability_guard() {
    let (engine, mock) = widget_engine();
    let state = ContinuationState {
        verb: Verb::Update,
        model: widget("us").with("Status", "UPDATING"),
        identity: None,
        checks: 0,
        data: json!({"status": "UPDATING"}),
    };
    mock.expect_call("describe")
        .matching(|c| *c == Call::Describe("w1".into()))
        .return_ok(active(&widget("us")));

    let outcome = engine
        .reconcile(ReconcileRequest::update(widget("eu"), widget("us")).with_continuation(state))
        .await;

    assert!(outcome.is_success(), "{outcome:?}");
    assert_eq!(mock.calls(), vec![Call::Describe("w1".into())]);
}

#[tokio::test]
async fn test_delete_not_found_is_success() {
    let (engine, mock) = widget_engine();
    mock.expect_call("delete")
        .return_err(RemoteError::not_found("Widget w1 not found"));

    let outcome = engine.reconcile(ReconcileRequest::delete(widget("eu"))).await;

    assert_eq!(outcome, ReconcileOutcome::gone());
    mock.verify();
}

#[tokio::test]
async fn test_delete_waits_until_gone() {
    let (engine, mock) = widget_engine();
    mock.expect_call("delete")
        .return_ok(Reply::Model(widget("eu").with("Status", "DELETING")));
    let first = engine.reconcile(ReconcileRequest::delete(widget("eu"))).await;
    let state = first.continuation().unwrap().clone();

    mock.expect_call("describe")
        .return_err(RemoteError::not_found("Widget w1 not found"));
    let outcome = engine
        .reconcile(ReconcileRequest::delete(widget("eu")).with_continuation(state))
        .await;

    assert_eq!(outcome, ReconcileOutcome::gone());
    mock.verify();
}

#[tokio::test]
async fn test_read_not_found_fails_with_not_found() {
    let (engine, mock) = widget_engine();
    mock.expect_call("describe")
        .return_err(RemoteError::not_found("Widget w1 not found"));

    let outcome = engine.reconcile(ReconcileRequest::read(widget("eu"))).await;

    assert_eq!(outcome.category(), Some(OutcomeCategory::NotFound));
    assert!(outcome.model().is_none());
}

#[tokio::test]
async fn test_read_reports_observed_tags() {
    let (engine, mock) = widget_engine();
    mock.expect_call("describe").return_ok(active(&widget("eu")));
    mock.expect_call("list tags")
        .return_ok(Reply::Tags(tags(&[("env", "prod")])));

    let outcome = engine.reconcile(ReconcileRequest::read(widget("eu"))).await;

    let model = outcome.model().unwrap();
    assert_eq!(model.get("Tags"), Some(&json!({"env": "prod"})));
    assert_eq!(model.get_str("Arn"), Some("arn:widget/w1"));
}

// =============================================================================
// Tag reconciliation
// =============================================================================

#[tokio::test]
async fn test_update_untags_then_tags_delta_only() {
    let (engine, mock) = widget_engine();
    let desired = widget("eu").with("Tags", json!({"env": "prod", "team": "core"}));

    mock.expect_call("update").return_ok(active(&widget("eu")));
    mock.expect_call("list tags")
        .return_ok(Reply::Tags(tags(&[("env", "dev"), ("owner", "ops")])));
    // env changes value: the add overwrites it, so only owner is untagged.
    mock.expect_call("untag")
        .matching(|c| *c == Call::Untag("w1".into(), vec!["owner".into()]))
        .return_ok(Reply::Done);
    mock.expect_call("tag")
        .matching(|c| *c == Call::Tag("w1".into(), tags(&[("env", "prod"), ("team", "core")])))
        .return_ok(Reply::Done);

    let outcome = engine
        .reconcile(ReconcileRequest::update(widget("eu"), desired))
        .await;

    assert!(outcome.is_success(), "{outcome:?}");
    assert_eq!(
        outcome.model().unwrap().get("Tags"),
        Some(&json!({"env": "prod", "team": "core"}))
    );
    mock.verify();
}

#[tokio::test]
async fn test_matching_tags_make_no_tag_calls() {
    let (engine, mock) = widget_engine();
    let desired = widget("eu").with("Tags", json!([{"Key": "env", "Value": "prod"}]));

    mock.expect_call("update").return_ok(active(&widget("eu")));
    mock.expect_call("list tags")
        .return_ok(Reply::Tags(tags(&[("env", "prod")])));

    let outcome = engine
        .reconcile(ReconcileRequest::update(widget("eu"), desired))
        .await;

    // Reported in the same shape the caller used.
    assert_eq!(
        outcome.model().unwrap().get("Tags"),
        Some(&json!([{"Key": "env", "Value": "prod"}]))
    );
    mock.verify();
}

#[tokio::test]
async fn test_tag_permission_denied_is_a_warning() {
    let (engine, mock) = widget_engine();
    let desired = widget("eu").with("Tags", json!({"env": "prod"}));

    mock.expect_call("create").return_ok(active(&widget("eu")));
    mock.expect_call("list tags").return_ok(Reply::Tags(TagSet::new()));
    mock.expect_call("tag").return_err(RemoteError::access_denied(
        "User is not authorized to perform: widgets:TagResource",
    ));

    let outcome = engine.reconcile(ReconcileRequest::create(desired)).await;

    assert!(outcome.is_success(), "{outcome:?}");
    let warnings = outcome.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].category, OutcomeCategory::TagPermissionDenied);
    // Nothing was applied, and the model says so.
    assert_eq!(outcome.model().unwrap().get("Tags"), Some(&json!({})));
}

#[tokio::test]
async fn test_denied_tag_listing_after_create_is_a_warning() {
    let (engine, mock) = widget_engine();
    let desired = widget("eu").with("Tags", json!({"env": "prod"}));

    mock.expect_call("create").return_ok(active(&widget("eu")));
    mock.expect_call("list tags").return_err(RemoteError::access_denied(
        "User is not authorized to perform: widgets:ListTagsForResource",
    ));

    let outcome = engine.reconcile(ReconcileRequest::create(desired)).await;

    assert!(outcome.is_success(), "{outcome:?}");
    assert_eq!(outcome.warnings().len(), 1);
    assert_eq!(
        outcome.warnings()[0].category,
        OutcomeCategory::TagPermissionDenied
    );
    let model = outcome.model().unwrap();
    assert_eq!(model.get_str("Arn"), Some("arn:widget/w1"));
    assert_eq!(model.get("Tags"), Some(&json!({"env": "prod"})));
    mock.verify();
}

#[tokio::test]
async fn test_untag_failure_does_not_stop_tagging() {
    let (engine, mock) = widget_engine();
    let desired = widget("eu").with("Tags", json!({"team": "core"}));

    mock.expect_call("update").return_ok(active(&widget("eu")));
    mock.expect_call("list tags")
        .return_ok(Reply::Tags(tags(&[("owner", "ops")])));
    mock.expect_call("untag")
        .return_err(RemoteError::service_failure("tag store unavailable"));
    mock.expect_call("tag").return_ok(Reply::Done);

    let outcome = engine
        .reconcile(ReconcileRequest::update(widget("eu"), desired))
        .await;

    assert_eq!(outcome.category(), Some(OutcomeCategory::InternalError));
    assert!(outcome.category().unwrap().is_retryable());
    mock.verify();
    assert!(mock.calls().iter().any(|c| matches!(c, Call::Tag(..))));
}

#[tokio::test]
async fn test_reserved_tags_are_kept() {
    let mock = Mock::new();
    let engine = ReconciliationEngine::new(Widgets::new(), mock.clone()).with_config(EngineConfig {
        reserved_tag_prefixes: vec!["system:".to_string()],
        ..EngineConfig::default()
    });
    let desired = widget("eu").with("Tags", json!({}));

    mock.expect_call("update").return_ok(active(&widget("eu")));
    mock.expect_call("list tags")
        .return_ok(Reply::Tags(tags(&[("system:stack", "s-1"), ("env", "dev")])));
    mock.expect_call("untag")
        .matching(|c| *c == Call::Untag("w1".into(), vec!["env".into()]))
        .return_ok(Reply::Done);

    let outcome = engine
        .reconcile(ReconcileRequest::update(widget("eu"), desired))
        .await;

    assert_eq!(
        outcome.model().unwrap().get("Tags"),
        Some(&json!({"system:stack": "s-1"}))
    );
    mock.verify();
}

#[tokio::test]
async fn test_malformed_tags_fail_before_any_call() {
    let (engine, mock) = widget_engine();
    let desired = widget("eu").with("Tags", "env=prod");

    let outcome = engine.reconcile(ReconcileRequest::create(desired)).await;

    assert_eq!(outcome.category(), Some(OutcomeCategory::InvalidRequest));
    assert!(mock.calls().is_empty());
}

// =============================================================================
// Error handling
// =============================================================================

#[tokio::test]
async fn test_throttling_is_reported_not_retried() {
    let (engine, mock) = widget_engine();
    mock.expect_call("create")
        .return_err(RemoteError::throttling("Rate exceeded"));

    let outcome = engine.reconcile(ReconcileRequest::create(widget("eu"))).await;

    assert_eq!(outcome.category(), Some(OutcomeCategory::Throttled));
    assert!(outcome.model().is_none());
    assert_eq!(mock.calls().len(), 1);
}

#[tokio::test]
async fn test_invalid_request_message_names_the_request() {
    let (engine, mock) = widget_engine();
    mock.expect_call("update").return_err(
        RemoteError::invalid_request("Size must be positive").with_request(&"UpdateWidget { size: 0 }"),
    );

    let outcome = engine
        .reconcile(ReconcileRequest::update(widget("eu"), widget("eu").with("Size", 0)))
        .await;

    assert_eq!(outcome.category(), Some(OutcomeCategory::InvalidRequest));
    let message = outcome.message().unwrap();
    assert!(message.contains("Size must be positive"));
    assert!(message.contains("UpdateWidget { size: 0 }"));
}

#[tokio::test]
async fn test_unrecognized_error_keeps_original() {
    let (engine, mock) = widget_engine();
    mock.expect_call("create")
        .return_err(RemoteError::unrecognized("WeirdFault", "boom"));

    let outcome = engine.reconcile(ReconcileRequest::create(widget("eu"))).await;

    let ReconcileOutcome::Failed(failure) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.category, OutcomeCategory::Unknown);
    assert_eq!(failure.error.unwrap().code, "WeirdFault");
}

#[tokio::test]
async fn test_stabilization_bound_stops_polling() {
    let mock = Mock::new();
    let engine = ReconciliationEngine::new(Widgets::new(), mock.clone()).with_config(EngineConfig {
        max_stabilization_checks: Some(2),
        ..EngineConfig::default()
    });
    let state = ContinuationState {
        verb: Verb::Create,
        model: widget("eu").with("Status", "CREATING"),
        identity: None,
        checks: 2,
        data: Value::Null,
    };

    let outcome = engine
        .reconcile(ReconcileRequest::create(widget("eu")).with_continuation(state))
        .await;

    assert_eq!(outcome.category(), Some(OutcomeCategory::Unknown));
    assert!(outcome.message().unwrap().contains("did not stabilize"));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_resume_restores_identity_from_continuation() {
    let (engine, mock) = note_engine();
    let state = ContinuationState {
        verb: Verb::Update,
        model: note("new body"),
        identity: Some(IdentityToken::new("n-4", "r-9")),
        checks: 0,
        data: Value::Null,
    };

    let outcome = engine
        .reconcile(
            ReconcileRequest::update(note("old body"), note("new body")).with_continuation(state),
        )
        .await;

    assert!(outcome.is_success(), "{outcome:?}");
    let model = outcome.model().unwrap();
    assert_eq!(model.get_str("NoteId"), Some("n-4"));
    assert_eq!(model.get_str("Revision"), Some("r-9"));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_continuation_from_another_verb_is_rejected() {
    let (engine, mock) = widget_engine();
    let state = ContinuationState {
        verb: Verb::Create,
        model: widget("eu"),
        identity: None,
        checks: 0,
        data: Value::Null,
    };

    let outcome = engine
        .reconcile(ReconcileRequest::delete(widget("eu")).with_continuation(state))
        .await;

    assert_eq!(outcome.category(), Some(OutcomeCategory::InvalidRequest));
    assert!(mock.calls().is_empty());
}

// =============================================================================
// Content-addressed lifecycle
// =============================================================================

#[tokio::test]
async fn test_create_refuses_duplicate_content() {
    let (engine, mock) = note_engine();
    mock.expect_call("list")
        .matching(|c| {
            *c == Call::List {
                parent: "r-1".into(),
                token: None,
            }
        })
        .return_ok(page(&[("allow all", "n-1", "rev-1")], None));

    let outcome = engine.reconcile(ReconcileRequest::create(note("allow all"))).await;

    assert_eq!(outcome.category(), Some(OutcomeCategory::AlreadyExists));
    assert!(outcome.message().unwrap().contains("n-1"));
    mock.verify();
    assert!(!mock.calls().iter().any(|c| matches!(c, Call::Create(_))));
}

#[tokio::test]
async fn test_create_walks_every_page_before_creating() {
    let (engine, mock) = note_engine();
    mock.expect_call("page 1")
        .return_ok(page(&[("deny all", "n-1", "rev-1")], Some("t2")));
    mock.expect_call("page 2")
        .matching(|c| matches!(c, Call::List { token: Some(t), .. } if t == "t2"))
        .return_ok(page(&[], None));
    mock.expect_call("create").return_ok(Reply::Model(
        note("allow all").with("NoteId", "n-9").with("Revision", "rev-1"),
    ));

    let outcome = engine.reconcile(ReconcileRequest::create(note("allow all"))).await;

    assert!(outcome.is_success(), "{outcome:?}");
    let model = outcome.model().unwrap();
    assert_eq!(model.get_str("NoteId"), Some("n-9"));
    assert_eq!(model.get_str("Body"), Some("allow all"));
    mock.verify();
}

#[tokio::test]
async fn test_resolver_stops_at_page_limit() {
    let mock = Mock::new();
    let engine = ReconciliationEngine::new(Notes::new(), mock.clone()).with_config(EngineConfig {
        max_list_pages: 1,
        ..EngineConfig::default()
    });
    mock.expect_call("page 1")
        .return_ok(page(&[("deny all", "n-1", "rev-1")], Some("t2")));
    mock.expect_call("create").return_ok(Reply::Model(
        note("allow all").with("NoteId", "n-9").with("Revision", "rev-1"),
    ));

    let outcome = engine.reconcile(ReconcileRequest::create(note("allow all"))).await;

    assert!(outcome.is_success());
    mock.verify();
}

#[tokio::test]
async fn test_update_recovers_missing_token_from_old_content() {
    let (engine, mock) = note_engine();
    mock.expect_call("list")
        .return_ok(page(&[("old body", "n-1", "rev-3")], None));
    mock.expect_call("update")
        .matching(|c| match c {
            Call::Update(m) => m.get_str("NoteId") == Some("n-1") && m.get_str("Revision") == Some("rev-3"),
            _ => false,
        })
        .return_ok(Reply::Model(
            note("new body").with("NoteId", "n-1").with("Revision", "rev-4"),
        ));

    let outcome = engine
        .reconcile(ReconcileRequest::update(note("old body"), note("new body")))
        .await;

    assert!(outcome.is_success(), "{outcome:?}");
    assert_eq!(outcome.model().unwrap().get_str("Revision"), Some("rev-4"));
    mock.verify();
}

#[tokio::test]
async fn test_update_forwards_last_observed_token() {
    let (engine, mock) = note_engine();
    let previous = note("old body").with("NoteId", "n-1").with("Revision", "rev-3");
    mock.expect_call("update")
        .matching(|c| matches!(c, Call::Update(m) if m.get_str("Revision") == Some("rev-3")))
        .return_ok(Reply::Model(
            note("new body").with("NoteId", "n-1").with("Revision", "rev-4"),
        ));

    let outcome = engine
        .reconcile(ReconcileRequest::update(previous, note("new body")))
        .await;

    assert!(outcome.is_success());
    mock.verify();
}

#[tokio::test]
async fn test_stale_revision_fails_without_reread() {
    let (engine, mock) = note_engine();
    let previous = note("old body").with("NoteId", "n-1").with("Revision", "rev-3");
    mock.expect_call("update")
        .return_err(RemoteError::concurrent_modification("revision rev-3 is stale"));

    let outcome = engine
        .reconcile(ReconcileRequest::update(previous, note("new body")))
        .await;

    assert_eq!(outcome.category(), Some(OutcomeCategory::InvalidRequest));
    assert_eq!(mock.calls().len(), 1);
}

#[tokio::test]
async fn test_update_of_missing_content_is_not_found() {
    let (engine, mock) = note_engine();
    mock.expect_call("list").return_ok(page(&[], None));

    let outcome = engine
        .reconcile(ReconcileRequest::update(note("old body"), note("new body")))
        .await;

    assert_eq!(outcome.category(), Some(OutcomeCategory::NotFound));
    mock.verify();
}

#[tokio::test]
async fn test_parent_change_is_not_updatable() {
    let (engine, mock) = note_engine();
    let desired = note("body").with("Parent", "r-2");

    let outcome = engine
        .reconcile(ReconcileRequest::update(note("body"), desired))
        .await;

    assert_eq!(outcome.category(), Some(OutcomeCategory::NotUpdatable));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_delete_without_match_is_success() {
    let (engine, mock) = note_engine();
    mock.expect_call("list").return_ok(page(&[], None));

    let outcome = engine.reconcile(ReconcileRequest::delete(note("gone"))).await;

    assert_eq!(outcome, ReconcileOutcome::gone());
    assert!(!mock.calls().iter().any(|c| matches!(c, Call::Delete(_))));
}

#[tokio::test]
async fn test_delete_resolves_then_deletes() {
    let (engine, mock) = note_engine();
    mock.expect_call("list")
        .return_ok(page(&[("body", "n-4", "rev-1")], None));
    mock.expect_call("delete")
        .matching(|c| *c == Call::Delete("n-4".into()))
        .return_ok(Reply::Done);

    let outcome = engine.reconcile(ReconcileRequest::delete(note("body"))).await;

    assert_eq!(outcome, ReconcileOutcome::gone());
    mock.verify();
}

#[tokio::test]
async fn test_read_resolves_identity_first() {
    let (engine, mock) = note_engine();
    mock.expect_call("list")
        .return_ok(page(&[("body", "n-4", "rev-2")], None));
    mock.expect_call("describe")
        .matching(|c| *c == Call::Describe("n-4".into()))
        .return_ok(Reply::Model(note("body").with("NoteId", "n-4").with("Revision", "rev-2")));

    let outcome = engine.reconcile(ReconcileRequest::read(note("body"))).await;

    assert_eq!(outcome.model().unwrap().get_str("NoteId"), Some("n-4"));
    mock.verify();
}

#[tokio::test]
async fn test_list_failure_is_classified() {
    let (engine, mock) = note_engine();
    mock.expect_call("list").return_err(RemoteError::access_denied(
        "not authorized to perform: notes:ListNotes",
    ));

    let outcome = engine.reconcile(ReconcileRequest::create(note("body"))).await;

    assert_eq!(outcome.category(), Some(OutcomeCategory::AccessDenied));
}
