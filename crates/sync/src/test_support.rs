// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a scriptable in-memory [`CourseApi`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::api::{ApiFuture, CourseApi};

/// A REST call recorded by [`MockApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    FetchSyllabus(i64),
    Feedback(i64, String),
    Approve(i64),
}

#[derive(Default)]
struct MockInner {
    snapshot: Option<Value>,
    snapshot_error: Option<String>,
    snapshot_delay: Option<Duration>,
    submit_error: Option<String>,
    calls: Vec<ApiCall>,
}

/// In-memory [`CourseApi`] with scripted responses and a call log.
#[derive(Default)]
pub struct MockApi {
    inner: Mutex<MockInner>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_snapshot(&self, body: Option<Value>) {
        self.inner.lock().snapshot = body;
    }

    pub fn fail_snapshot(&self, message: &str) {
        self.inner.lock().snapshot_error = Some(message.to_owned());
    }

    /// Delay snapshot responses, to let push frames arrive first.
    pub fn delay_snapshot(&self, delay: Duration) {
        self.inner.lock().snapshot_delay = Some(delay);
    }

    /// Make feedback and approve calls fail with `message`.
    pub fn fail_submissions(&self, message: &str) {
        self.inner.lock().submit_error = Some(message.to_owned());
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.inner.lock().calls.clone()
    }

    fn record(&self, call: ApiCall) -> Option<String> {
        let mut inner = self.inner.lock();
        inner.calls.push(call);
        inner.submit_error.clone()
    }
}

impl CourseApi for MockApi {
    fn fetch_syllabus(&self, syllabus_id: i64) -> ApiFuture<'_, Option<Value>> {
        let (result, delay) = {
            let mut inner = self.inner.lock();
            inner.calls.push(ApiCall::FetchSyllabus(syllabus_id));
            let result = match inner.snapshot_error {
                Some(ref msg) => Err(anyhow::anyhow!("{msg}")),
                None => Ok(inner.snapshot.clone()),
            };
            (result, inner.snapshot_delay)
        };
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }

    fn submit_feedback(&self, syllabus_id: i64, feedback: &str) -> ApiFuture<'_, ()> {
        let error = self.record(ApiCall::Feedback(syllabus_id, feedback.to_owned()));
        Box::pin(async move {
            match error {
                Some(msg) => Err(anyhow::anyhow!("{msg}")),
                None => Ok(()),
            }
        })
    }

    fn approve_syllabus(&self, syllabus_id: i64) -> ApiFuture<'_, ()> {
        let error = self.record(ApiCall::Approve(syllabus_id));
        Box::pin(async move {
            match error {
                Some(msg) => Err(anyhow::anyhow!("{msg}")),
                None => Ok(()),
            }
        })
    }
}
