// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tomesync` command line: follow generation progress and print views as JSON lines.

use std::io::Write;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::SyncConfig;
use crate::controller::SyncView;
use crate::runtime::SyncRuntime;
use crate::session::SessionHandle;
use crate::stream::ConnectionState;

#[derive(Debug, Parser)]
#[command(name = "tomesync", version, about = "Follow AI textbook generation progress")]
pub struct Cli {
    #[command(flatten)]
    pub sync: SyncConfig,

    /// Log filter (e.g. `info`, `tomesync=debug`).
    #[arg(long, global = true, default_value = "info", env = "TOMESYNC_LOG_LEVEL")]
    pub log_level: String,

    /// Log format (`text` or `json`).
    #[arg(long, global = true, default_value = "text", env = "TOMESYNC_LOG_FORMAT")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow syllabus generation.
    WatchSyllabus {
        id: i64,
        /// Generation was just triggered; reconnect until the document arrives.
        #[arg(long)]
        expecting: bool,
    },
    /// Follow lesson content generation.
    WatchContent {
        id: i64,
        #[arg(long)]
        expecting: bool,
    },
    /// Submit feedback and follow the regeneration.
    Feedback { id: i64, text: String },
    /// Approve the syllabus and follow content generation.
    Approve { id: i64 },
}

/// Tracks when a watch has run its course.
#[derive(Debug, Default)]
pub struct WatchProgress {
    saw_streaming: bool,
    saw_connection: bool,
}

impl WatchProgress {
    /// Record `view` and report whether watching can stop.
    pub fn finished(&mut self, view: &SyncView) -> bool {
        if view.streaming {
            self.saw_streaming = true;
            return false;
        }
        if view.connection.is_live() {
            self.saw_connection = true;
        }
        if view.document.is_some() || self.saw_streaming {
            return true;
        }
        self.saw_connection && view.connection == ConnectionState::Closed
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let runtime = SyncRuntime::from_config(cli.sync)?;

    let handle = match cli.command {
        Command::WatchSyllabus { id, expecting } => runtime.watch_syllabus(id, expecting),
        Command::WatchContent { id, expecting } => runtime.watch_content(id, expecting),
        Command::Feedback { id, text } => {
            let handle = runtime.watch_syllabus(id, false);
            handle.send_feedback(&text).await?;
            info!(syllabus_id = id, "feedback accepted");
            handle
        }
        Command::Approve { id } => {
            let handle = runtime.watch_content(id, false);
            handle.approve().await?;
            info!(syllabus_id = id, "syllabus approved");
            handle
        }
    };

    follow(&handle).await?;
    handle.shutdown().await;
    runtime.shutdown();
    Ok(())
}

/// Print each published view until the watch finishes or Ctrl-C.
async fn follow(handle: &SessionHandle) -> anyhow::Result<()> {
    let mut views = handle.subscribe();
    let mut progress = WatchProgress::default();
    let mut stdout = std::io::stdout();

    loop {
        let view = views.borrow_and_update().clone();
        writeln!(stdout, "{}", serde_json::to_string(&view)?)?;
        if progress.finished(&view) {
            return Ok(());
        }
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
