// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::SyllabusDocument;

#[test]
fn full_payload_is_kept() -> anyhow::Result<()> {
    let doc = SyllabusDocument::normalize(&json!({
        "subject_name": "Physics",
        "subject_description": "Intro mechanics",
        "units": [{
            "unit_id": 7,
            "unit_name": "Motion",
            "lessons": [{ "lesson_id": "7.1", "lesson_name": "Velocity", "lesson_description": "dx/dt" }]
        }]
    }))
    .ok_or_else(|| anyhow::anyhow!("expected a document"))?;

    assert_eq!(doc.subject_name, "Physics");
    assert_eq!(doc.units[0].unit_id, "7");
    assert_eq!(doc.units[0].unit_name, "Motion");
    assert_eq!(doc.units[0].lessons[0].lesson_id, "7.1");
    assert_eq!(doc.units[0].lessons[0].lesson_description, "dx/dt");
    assert_eq!(doc.lesson_count(), 1);
    Ok(())
}

#[test]
fn missing_ids_and_names_get_positional_defaults() -> anyhow::Result<()> {
    let doc = SyllabusDocument::normalize(&json!({
        "units": [
            { "lessons": [{}, { "lesson_name": "  " }] },
            { "unit_name": "Second" }
        ]
    }))
    .ok_or_else(|| anyhow::anyhow!("expected a document"))?;

    assert_eq!(doc.subject_name, "");
    assert_eq!(doc.units[0].unit_id, "1");
    assert_eq!(doc.units[0].unit_name, "Unit 1");
    assert_eq!(doc.units[0].lessons[0].lesson_name, "Lesson 1");
    assert_eq!(doc.units[0].lessons[1].lesson_name, "Lesson 2");
    assert_eq!(doc.units[0].lessons[1].lesson_id, "2");
    assert_eq!(doc.units[1].unit_id, "2");
    assert_eq!(doc.units[1].unit_name, "Second");
    assert!(doc.units[1].lessons.is_empty());
    Ok(())
}

#[test]
fn normalization_is_deterministic() {
    let payload = json!({ "units": [{ "lessons": [{}, {}] }, {}] });
    assert_eq!(SyllabusDocument::normalize(&payload), SyllabusDocument::normalize(&payload));
}

#[test]
fn string_payload_is_parsed() -> anyhow::Result<()> {
    let payload = json!(r#"{"subject_name":"Chemistry","units":[]}"#);
    let doc = SyllabusDocument::normalize(&payload)
        .ok_or_else(|| anyhow::anyhow!("expected a document"))?;
    assert_eq!(doc.subject_name, "Chemistry");
    Ok(())
}

#[yare::parameterized(
    null = { json!(null) },
    number = { json!(42) },
    array = { json!([1, 2]) },
    garbage_string = { json!("not json") },
    string_array = { json!("[1,2]") },
)]
fn non_object_payloads_are_rejected(payload: serde_json::Value) {
    assert!(SyllabusDocument::normalize(&payload).is_none());
}

#[test]
fn camel_case_keys_are_accepted() -> anyhow::Result<()> {
    let doc = SyllabusDocument::normalize(&json!({
        "subjectName": "Art",
        "units": [{ "unitId": "u1", "unitName": "Color", "lessons": [{ "lessonId": 3, "lessonName": "Hue" }] }]
    }))
    .ok_or_else(|| anyhow::anyhow!("expected a document"))?;
    assert_eq!(doc.subject_name, "Art");
    assert_eq!(doc.units[0].unit_id, "u1");
    assert_eq!(doc.units[0].lessons[0].lesson_id, "3");
    assert_eq!(doc.units[0].lessons[0].lesson_name, "Hue");
    Ok(())
}
