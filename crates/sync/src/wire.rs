// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push channel frame parsing.
//!
//! The server is inconsistent about field names (`Unit_name` vs `unit_name`,
//! `syllabus` vs `syllabus_json`, `lesson_id` vs `lesson.id`). Every variant
//! is resolved here into one canonical frame type; nothing past this module
//! looks at raw field names.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::SyllabusDocument;

/// Status carried by a progress frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    Started,
    Completed,
    Failed,
    #[serde(other)]
    Other,
}

impl FrameStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Other => "other",
        }
    }
}

/// Which sub-job a content frame reports on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentStage {
    PromptGeneration,
    ContentGeneration,
    Other(String),
}

impl ContentStage {
    fn from_wire(s: &str) -> Self {
        match s {
            "prompt_generation" => Self::PromptGeneration,
            "content_generation" => Self::ContentGeneration,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Canonical syllabus stream frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SyllabusFrame {
    pub status: Option<FrameStatus>,
    pub message: Option<String>,
    pub document: Option<SyllabusDocument>,
}

/// Canonical content stream frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentFrame {
    pub status: FrameStatus,
    pub stage: ContentStage,
    pub message: String,
    pub unit: String,
    pub lesson: String,
    pub lesson_id: String,
    pub payload: Option<Value>,
}

#[derive(Deserialize)]
struct RawSyllabusFrame {
    status: Option<FrameStatus>,
    message: Option<String>,
    syllabus_json: Option<Value>,
    syllabus: Option<Value>,
}

#[derive(Deserialize)]
struct RawLessonRef {
    id: Option<Value>,
}

#[derive(Deserialize)]
struct RawContentFrame {
    status: Option<FrameStatus>,
    #[serde(rename = "type")]
    stage: Option<String>,
    message: Option<String>,
    #[serde(rename = "Unit_name")]
    unit_name_legacy: Option<String>,
    unit_name: Option<String>,
    lesson_name: Option<String>,
    lesson_id: Option<Value>,
    lesson: Option<RawLessonRef>,
    data: Option<Value>,
}

/// Extract a document from whichever payload key the server used.
///
/// `syllabus_json` wins when both are present.
pub fn document_from_payload(value: &Value) -> Option<SyllabusDocument> {
    let raw: RawSyllabusFrame = serde_json::from_value(value.clone()).ok()?;
    document_from_keys(raw.syllabus_json, raw.syllabus)
}

fn document_from_keys(
    syllabus_json: Option<Value>,
    syllabus: Option<Value>,
) -> Option<SyllabusDocument> {
    [syllabus_json, syllabus]
        .into_iter()
        .flatten()
        .filter(|v| !v.is_null())
        .find_map(|v| SyllabusDocument::normalize(&v))
}

/// Parse a syllabus stream frame. Returns `None` for malformed frames.
pub fn parse_syllabus_frame(text: &str) -> Option<SyllabusFrame> {
    let raw: RawSyllabusFrame = serde_json::from_str(text).ok()?;
    let document = document_from_keys(raw.syllabus_json, raw.syllabus);
    if raw.status.is_none() && document.is_none() {
        return None;
    }
    Some(SyllabusFrame { status: raw.status, message: raw.message, document })
}

/// Parse a content stream frame. Returns `None` for malformed frames
/// (unparseable JSON or no `status`).
pub fn parse_content_frame(text: &str) -> Option<ContentFrame> {
    let raw: RawContentFrame = serde_json::from_str(text).ok()?;
    let status = raw.status?;

    let lesson_id = raw
        .lesson_id
        .as_ref()
        .and_then(scalar_to_string)
        .or_else(|| raw.lesson.as_ref()?.id.as_ref().and_then(scalar_to_string))
        .unwrap_or_default();

    Some(ContentFrame {
        status,
        stage: ContentStage::from_wire(raw.stage.as_deref().unwrap_or("")),
        message: raw.message.unwrap_or_default(),
        unit: raw.unit_name_legacy.or(raw.unit_name).unwrap_or_default(),
        lesson: raw.lesson_name.unwrap_or_default(),
        lesson_id,
        payload: raw.data.filter(|v| !v.is_null()),
    })
}

/// Render a string or number id as a string; anything else is absent.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
