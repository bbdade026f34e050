// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot REST read of the persisted syllabus, raced against the push stream.

use std::sync::Arc;

use crate::api::CourseApi;
use crate::document::SyllabusDocument;
use crate::wire::document_from_payload;

/// How a snapshot read resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    Document(SyllabusDocument),
    /// Not generated yet (404, empty body, or no document keys).
    Absent,
    /// The read itself failed. Callers treat this like `Absent`.
    Failed(String),
}

pub struct SnapshotBootstrapper {
    api: Arc<dyn CourseApi>,
}

impl SnapshotBootstrapper {
    pub fn new(api: Arc<dyn CourseApi>) -> Self {
        Self { api }
    }

    pub async fn fetch_snapshot(&self, syllabus_id: i64) -> SnapshotOutcome {
        match self.api.fetch_syllabus(syllabus_id).await {
            Ok(Some(body)) => match document_from_payload(&body) {
                Some(doc) => SnapshotOutcome::Document(doc),
                None => SnapshotOutcome::Absent,
            },
            Ok(None) => SnapshotOutcome::Absent,
            Err(e) => SnapshotOutcome::Failed(format!("{e:#}")),
        }
    }
}
