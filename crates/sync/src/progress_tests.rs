// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;
use serde_json::json;

use super::{identity_key, LessonStatus, ProgressIndex};
use crate::wire::{ContentFrame, ContentStage, FrameStatus};

fn frame(unit: &str, lesson: &str, id: &str, status: FrameStatus, message: &str) -> ContentFrame {
    ContentFrame {
        status,
        stage: ContentStage::ContentGeneration,
        message: message.to_owned(),
        unit: unit.to_owned(),
        lesson: lesson.to_owned(),
        lesson_id: id.to_owned(),
        payload: None,
    }
}

#[test]
fn identity_key_allows_empty_lesson_id() {
    assert_eq!(identity_key("U1", "L1", ""), "U1::L1::");
    assert_eq!(identity_key("U1", "L1", "9"), "U1::L1::9");
}

#[test]
fn merging_same_frame_twice_is_idempotent() {
    let mut index = ProgressIndex::new();
    let f = frame("U1", "A", "1", FrameStatus::Started, "working");
    index.merge(&f, 1);
    let after_first = index.ordered();
    index.merge(&f, 1);
    assert_eq!(index.ordered(), after_first);
    assert_eq!(index.len(), 1);
}

#[test]
fn reapplying_later_keeps_first_seen() {
    let mut index = ProgressIndex::new();
    let f = frame("U1", "A", "1", FrameStatus::Started, "working");
    index.merge(&f, 1);
    index.merge(&f, 5);
    let entry = index.get("U1::A::1");
    assert_eq!(entry.map(|e| e.first_seen_at), Some(1));
    assert_eq!(entry.map(|e| e.updated_at), Some(5));
}

#[test]
fn display_order_is_first_seen() {
    let mut index = ProgressIndex::new();
    index.merge(&frame("U1", "A", "1", FrameStatus::Started, ""), 1);
    index.merge(&frame("U1", "B", "2", FrameStatus::Started, ""), 2);
    index.merge(&frame("U1", "A", "1", FrameStatus::Completed, "A done"), 3);

    let ordered = index.ordered();
    let names: Vec<_> = ordered.iter().map(|e| e.lesson.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(ordered[0].first_seen_at, 1);
    assert_eq!(ordered[0].status, LessonStatus::Completed);
    assert_eq!(ordered[0].message, "A done");
}

#[test]
fn display_order_ignores_clock_steps() {
    let mut index = ProgressIndex::new();
    index.merge(&frame("U1", "A", "1", FrameStatus::Started, ""), 500);
    // Wall clock stepped backwards between frames.
    index.merge(&frame("U1", "B", "2", FrameStatus::Started, ""), 100);

    let names: Vec<_> = index.ordered().into_iter().map(|e| e.lesson).collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[test]
fn same_lesson_id_in_different_units_stays_distinct() {
    let mut index = ProgressIndex::new();
    index.merge(&frame("Unit 1", "Intro", "1", FrameStatus::Started, ""), 1);
    index.merge(&frame("Unit 2", "Intro", "1", FrameStatus::Started, ""), 2);
    assert_eq!(index.len(), 2);
}

#[test]
fn completed_payload_lands_in_side_map() {
    let mut index = ProgressIndex::new();
    let mut f = frame("U1", "A", "1", FrameStatus::Completed, "done");
    f.payload = Some(json!({"content": "# Lesson A"}));
    let id = index.merge(&f, 1);

    assert_eq!(id.as_deref(), Some("U1::A::1"));
    assert_eq!(index.payload("U1::A::1"), Some(&json!({"content": "# Lesson A"})));
}

#[test]
fn started_payload_is_not_published() {
    let mut index = ProgressIndex::new();
    let mut f = frame("U1", "A", "1", FrameStatus::Started, "");
    f.payload = Some(json!({"draft": true}));
    index.merge(&f, 1);

    assert!(index.payload("U1::A::1").is_none());
    assert_eq!(index.get("U1::A::1").and_then(|e| e.payload.clone()), Some(json!({"draft": true})));
}

#[test]
fn unknown_status_is_not_merged() {
    let mut index = ProgressIndex::new();
    assert!(index.merge(&frame("U1", "A", "1", FrameStatus::Other, ""), 1).is_none());
    assert!(index.is_empty());
}

#[test]
fn counts_by_status() {
    let mut index = ProgressIndex::new();
    index.merge(&frame("U", "A", "1", FrameStatus::Completed, ""), 1);
    index.merge(&frame("U", "B", "2", FrameStatus::Started, ""), 2);
    index.merge(&frame("U", "C", "3", FrameStatus::Failed, ""), 3);
    let counts = index.counts();
    assert_eq!((counts.total, counts.started, counts.completed, counts.failed), (3, 1, 1, 1));
}

proptest! {
    #[test]
    fn index_never_shrinks_and_first_seen_is_stable(
        events in proptest::collection::vec((0u8..4, 0u8..3), 1..60)
    ) {
        let mut index = ProgressIndex::new();
        let mut first_seen = std::collections::HashMap::new();
        let mut prev_len = 0;
        for (t, (lesson, status)) in events.into_iter().enumerate() {
            let status = match status {
                0 => FrameStatus::Started,
                1 => FrameStatus::Completed,
                _ => FrameStatus::Failed,
            };
            let name = format!("L{lesson}");
            let id = index.merge(&frame("U", &name, "", status, ""), t as u64);
            if let Some(id) = id {
                first_seen.entry(id).or_insert(t as u64);
            }
            prop_assert!(index.len() >= prev_len);
            prev_len = index.len();
        }
        for entry in index.ordered() {
            prop_assert_eq!(Some(&entry.first_seen_at), first_seen.get(&entry.identity));
        }
        let ordered = index.ordered();
        for pair in ordered.windows(2) {
            prop_assert!(pair[0].first_seen_at <= pair[1].first_seen_at);
        }
    }
}
