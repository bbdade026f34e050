// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST calls the sync core issues against the authoring API.

pub mod client;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

pub use client::CourseClient;

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// The three REST calls the sync core depends on.
///
/// Object-safe for use as `Arc<dyn CourseApi>`.
pub trait CourseApi: Send + Sync + 'static {
    /// Read the persisted syllabus. `Ok(None)` when it does not exist yet.
    fn fetch_syllabus(&self, syllabus_id: i64) -> ApiFuture<'_, Option<Value>>;

    /// Submit free-text feedback, triggering a syllabus regeneration.
    fn submit_feedback(&self, syllabus_id: i64, feedback: &str) -> ApiFuture<'_, ()>;

    /// Approve the syllabus, triggering content generation.
    fn approve_syllabus(&self, syllabus_id: i64) -> ApiFuture<'_, ()>;
}
