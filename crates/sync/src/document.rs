// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized syllabus tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::wire::scalar_to_string;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusDocument {
    pub subject_name: String,
    pub subject_description: String,
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub unit_id: String,
    pub unit_name: String,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_id: String,
    pub lesson_name: String,
    pub lesson_description: String,
}

impl SyllabusDocument {
    /// Normalize a server payload into a document.
    ///
    /// Accepts an object, or a string holding a JSON object. Missing ids and
    /// names are filled positionally (1-based): `Unit {n}`, `Lesson {n}`.
    /// Returns `None` when the payload is not an object.
    pub fn normalize(value: &Value) -> Option<Self> {
        let parsed;
        let obj = match value {
            Value::Object(map) => map,
            Value::String(s) => {
                parsed = serde_json::from_str::<Value>(s).ok()?;
                parsed.as_object()?
            }
            _ => return None,
        };

        let units = obj
            .get("units")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().enumerate().map(|(i, u)| normalize_unit(i + 1, u)).collect())
            .unwrap_or_default();

        Some(Self {
            subject_name: text_field(obj, &["subject_name", "subjectName", "name"])
                .unwrap_or_default(),
            subject_description: text_field(obj, &["subject_description", "subjectDescription", "description"])
                .unwrap_or_default(),
            units,
        })
    }

    pub fn lesson_count(&self) -> usize {
        self.units.iter().map(|u| u.lessons.len()).sum()
    }
}

fn normalize_unit(position: usize, value: &Value) -> Unit {
    let empty = serde_json::Map::new();
    let obj = value.as_object().unwrap_or(&empty);

    let lessons = obj
        .get("lessons")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().enumerate().map(|(i, l)| normalize_lesson(i + 1, l)).collect())
        .unwrap_or_default();

    Unit {
        unit_id: id_field(obj, &["unit_id", "unitId", "id"]).unwrap_or_else(|| position.to_string()),
        unit_name: text_field(obj, &["unit_name", "Unit_name", "unitName", "name"])
            .unwrap_or_else(|| format!("Unit {position}")),
        lessons,
    }
}

fn normalize_lesson(position: usize, value: &Value) -> Lesson {
    let empty = serde_json::Map::new();
    let obj = value.as_object().unwrap_or(&empty);

    Lesson {
        lesson_id: id_field(obj, &["lesson_id", "lessonId", "id"])
            .unwrap_or_else(|| position.to_string()),
        lesson_name: text_field(obj, &["lesson_name", "lessonName", "name"])
            .unwrap_or_else(|| format!("Lesson {position}")),
        lesson_description: text_field(obj, &["lesson_description", "lessonDescription", "description"])
            .unwrap_or_default(),
    }
}

/// First non-empty string among `keys`.
fn text_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}

/// First string-or-number among `keys`.
fn id_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(scalar_to_string))
        .find(|s| !s.is_empty())
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
