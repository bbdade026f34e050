// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-completion detection for content streams.
//!
//! The server sends no end-of-stream frame. The last content-generation
//! event of a job carries a message like "Content generated for all lessons",
//! and that message text is the only whole-job signal available.

use regex::Regex;

use crate::wire::{ContentFrame, ContentStage, FrameStatus};

#[derive(Debug, Clone)]
pub struct CompletionDetector {
    pattern: Regex,
}

impl CompletionDetector {
    pub fn new(pattern: &str) -> anyhow::Result<Self> {
        Ok(Self { pattern: Regex::new(pattern)? })
    }

    /// Whether `frame` marks the whole content job as finished.
    pub fn is_job_complete(&self, frame: &ContentFrame) -> bool {
        frame.status == FrameStatus::Completed
            && frame.stage == ContentStage::ContentGeneration
            && self.pattern.is_match(&frame.message)
    }

    /// Whether `frame` should stop the caller waiting. Any failure counts,
    /// even for a single lesson while others are still running.
    pub fn stops_waiting(&self, frame: &ContentFrame) -> bool {
        frame.status == FrameStatus::Failed || self.is_job_complete(frame)
    }
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;
