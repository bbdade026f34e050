// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::CompletionDetector;
use crate::wire::{ContentFrame, ContentStage, FrameStatus};

fn detector() -> CompletionDetector {
    CompletionDetector::new("(?i)for all lessons").expect("default pattern compiles")
}

fn frame(status: FrameStatus, stage: ContentStage, message: &str) -> ContentFrame {
    ContentFrame {
        status,
        stage,
        message: message.to_owned(),
        unit: String::new(),
        lesson: String::new(),
        lesson_id: String::new(),
        payload: None,
    }
}

#[yare::parameterized(
    exact = { "Content generated for all lessons", true },
    upper = { "CONTENT GENERATED FOR ALL LESSONS", true },
    mixed = { "Done For All Lessons!", true },
    single_lesson = { "Lesson X done", false },
    partial = { "for all units", false },
    empty = { "", false },
)]
fn completion_message(message: &str, expected: bool) {
    let d = detector();
    let f = frame(FrameStatus::Completed, ContentStage::ContentGeneration, message);
    assert_eq!(d.is_job_complete(&f), expected);
}

#[test]
fn prompt_phase_completion_is_not_job_completion() {
    let d = detector();
    let f = frame(FrameStatus::Completed, ContentStage::PromptGeneration, "prompts for all lessons");
    assert!(!d.is_job_complete(&f));
}

#[test]
fn started_with_matching_message_is_not_completion() {
    let d = detector();
    let f = frame(FrameStatus::Started, ContentStage::ContentGeneration, "starting for all lessons");
    assert!(!d.is_job_complete(&f));
    assert!(!d.stops_waiting(&f));
}

#[yare::parameterized(
    content = { ContentStage::ContentGeneration },
    prompt = { ContentStage::PromptGeneration },
    other = { ContentStage::Other("images".to_owned()) },
)]
fn any_failure_stops_waiting(stage: ContentStage) {
    let d = detector();
    assert!(d.stops_waiting(&frame(FrameStatus::Failed, stage, "boom")));
}
