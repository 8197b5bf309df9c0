//! # Mock Remote & Testing Guide
//!
//! [`MockRemote`] implements [`RemoteClient`] entirely in memory. Tests queue up
//! the calls they expect, in order, together with the response each call should
//! get. The engine then runs against the mock exactly as it would against a real
//! control plane.
//!
//! ## When to use the Mock vs an In-Memory Control Plane
//!
//! | Feature | MockRemote | In-memory control plane |
//! |---------|------------|-------------------------|
//! | **Determinism** | Exact call sequence | Whatever the actor does |
//! | **State** | None (scripted responses) | Real resources, revisions, tags |
//! | **Use Case** | Asserting which calls the engine makes | End-to-end lifecycle tests |
//! | **Error Injection** | Any error at any step (`return_err`) | Configured faults only |
//!
//! ## Example
//!
//! ```rust
//! use reconcile_framework::mock::MockRemote;
//! use reconcile_framework::{RemoteClient, RemoteError};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Call { Describe(String) }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockRemote::<Call, u32>::new();
//!     mock.expect_call("describe")
//!         .matching(|call| matches!(call, Call::Describe(name) if name == "web"))
//!         .return_ok(3);
//!     mock.expect_call("describe again")
//!         .return_err(RemoteError::throttling("Rate exceeded"));
//!
//!     assert_eq!(mock.invoke(Call::Describe("web".into())).await.unwrap(), 3);
//!     assert!(mock.invoke(Call::Describe("web".into())).await.is_err());
//!
//!     mock.verify();
//!     assert_eq!(mock.calls().len(), 2);
//! }
//! ```
//!
//! A call that arrives when no expectation is queued, or that fails the
//! expectation's matcher, panics with the offending request. That fails the
//! test at the exact call that went wrong.

use crate::client::RemoteClient;
use crate::error::RemoteError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Matcher<Req> = Box<dyn Fn(&Req) -> bool + Send + Sync>;

/// One queued call and its scripted response.
struct Expectation<Req, Resp> {
    label: String,
    matcher: Option<Matcher<Req>>,
    response: Result<Resp, RemoteError>,
}

struct State<Req, Resp> {
    expectations: VecDeque<Expectation<Req, Resp>>,
    calls: Vec<Req>,
}

/// A scripted [`RemoteClient`].
///
/// Cloning shares the queue, so a test can keep one handle for `verify()`
/// after handing the other to the engine.
pub struct MockRemote<Req, Resp> {
    state: Arc<Mutex<State<Req, Resp>>>,
}

impl<Req, Resp> Clone for MockRemote<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<Req, Resp> Default for MockRemote<Req, Resp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Resp> MockRemote<Req, Resp> {
    /// Creates a mock with no expectations.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                expectations: VecDeque::new(),
                calls: Vec::new(),
            })),
        }
    }

    /// Queues the next expected call. `label` shows up in panic messages.
    pub fn expect_call(&self, label: impl Into<String>) -> ExpectationBuilder<Req, Resp> {
        ExpectationBuilder {
            label: label.into(),
            matcher: None,
            state: Arc::clone(&self.state),
        }
    }

    /// Number of expectations not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lock().expectations.len()
    }

    /// Panics if any expectation was not consumed.
    pub fn verify(&self) {
        let state = self.lock();
        if !state.expectations.is_empty() {
            let labels: Vec<&str> = state.expectations.iter().map(|e| e.label.as_str()).collect();
            panic!(
                "Not all expectations were met. {} remaining: {:?}",
                labels.len(),
                labels
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<Req, Resp>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<Req: Clone, Resp> MockRemote<Req, Resp> {
    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<Req> {
        self.lock().calls.clone()
    }
}

#[async_trait]
impl<Req, Resp> RemoteClient for MockRemote<Req, Resp>
where
    Req: Send + Debug + 'static,
    Resp: Send + Debug + 'static,
{
    type Request = Req;
    type Response = Resp;

    async fn invoke(&self, request: Req) -> Result<Resp, RemoteError> {
        let mut state = self.lock();
        let Some(expectation) = state.expectations.pop_front() else {
            panic!("Unexpected call {request:?}: no expectations left");
        };
        if let Some(matcher) = &expectation.matcher {
            if !matcher(&request) {
                panic!(
                    "Call {request:?} does not match expectation '{}'",
                    expectation.label
                );
            }
        }
        state.calls.push(request);
        expectation.response
    }
}

/// Builder returned by [`MockRemote::expect_call`].
pub struct ExpectationBuilder<Req, Resp> {
    label: String,
    matcher: Option<Matcher<Req>>,
    state: Arc<Mutex<State<Req, Resp>>>,
}

impl<Req, Resp> ExpectationBuilder<Req, Resp> {
    /// Only accept a call for which `matcher` returns true.
    pub fn matching(mut self, matcher: impl Fn(&Req) -> bool + Send + Sync + 'static) -> Self {
        self.matcher = Some(Box::new(matcher));
        self
    }

    pub fn return_ok(self, response: Resp) {
        self.push(Ok(response));
    }

    pub fn return_err(self, error: RemoteError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Resp, RemoteError>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.expectations.push_back(Expectation {
            label: self.label,
            matcher: self.matcher,
            response,
        });
    }
}
