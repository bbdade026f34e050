// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-lesson progress merged from content-generation frames.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::wire::{ContentFrame, FrameStatus};

/// Status of a single lesson's generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Started,
    Completed,
    Failed,
}

impl LessonStatus {
    fn from_frame(status: FrameStatus) -> Option<Self> {
        match status {
            FrameStatus::Started => Some(Self::Started),
            FrameStatus::Completed => Some(Self::Completed),
            FrameStatus::Failed => Some(Self::Failed),
            FrameStatus::Other => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonProgressEntry {
    pub identity: String,
    pub unit: String,
    pub lesson: String,
    pub lesson_id: String,
    pub status: LessonStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Epoch millis of the first frame seen for this identity. Never changes.
    pub first_seen_at: u64,
    pub updated_at: u64,
}

/// Composite merge key. Lesson ids are not unique across units, so the unit
/// and lesson names are part of the key.
pub fn identity_key(unit: &str, lesson: &str, lesson_id: &str) -> String {
    format!("{unit}::{lesson}::{lesson_id}")
}

/// Aggregate counts over the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCounts {
    pub total: usize,
    pub started: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Insertion-stable map of lesson progress for one run. Only grows.
#[derive(Debug, Clone, Default)]
pub struct ProgressIndex {
    entries: IndexMap<String, LessonProgressEntry>,
    payloads: IndexMap<String, Value>,
}

impl ProgressIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a content-generation frame observed at `now_ms`.
    ///
    /// Returns the identity the frame was merged under, or `None` when the
    /// frame's status is not one a lesson can take.
    pub fn merge(&mut self, frame: &ContentFrame, now_ms: u64) -> Option<String> {
        let status = LessonStatus::from_frame(frame.status)?;
        let identity = identity_key(&frame.unit, &frame.lesson, &frame.lesson_id);

        let entry = self.entries.entry(identity.clone()).or_insert_with(|| LessonProgressEntry {
            identity: identity.clone(),
            unit: frame.unit.clone(),
            lesson: frame.lesson.clone(),
            lesson_id: frame.lesson_id.clone(),
            status,
            message: String::new(),
            payload: None,
            first_seen_at: now_ms,
            updated_at: now_ms,
        });
        entry.status = status;
        entry.message = frame.message.clone();
        entry.updated_at = now_ms;
        if let Some(ref payload) = frame.payload {
            entry.payload = Some(payload.clone());
            if status == LessonStatus::Completed {
                self.payloads.insert(identity.clone(), payload.clone());
            }
        }
        Some(identity)
    }

    pub fn get(&self, identity: &str) -> Option<&LessonProgressEntry> {
        self.entries.get(identity)
    }

    /// Generated payload for a completed lesson.
    pub fn payload(&self, identity: &str) -> Option<&Value> {
        self.payloads.get(identity)
    }

    pub fn payloads(&self) -> &IndexMap<String, Value> {
        &self.payloads
    }

    /// Entries in display order, which is the order each identity was first merged.
    pub fn ordered(&self) -> Vec<LessonProgressEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn counts(&self) -> ProgressCounts {
        let mut counts = ProgressCounts { total: self.entries.len(), ..ProgressCounts::default() };
        for entry in self.entries.values() {
            match entry.status {
                LessonStatus::Started => counts.started += 1,
                LessonStatus::Completed => counts.completed += 1,
                LessonStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
