// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use crate::api::{CourseApi, CourseClient};
use crate::completion::CompletionDetector;
use crate::config::SyncConfig;
use crate::controller::{ContentController, SyllabusController};
use crate::session::{spawn_session, SessionDeps, SessionHandle};
use crate::stream::connection::ConnectionRegistry;

/// Entry point for embedding the sync core: owns the connection registry and
/// REST client, and spawns one session per watched resource.
pub struct SyncRuntime {
    config: SyncConfig,
    registry: Arc<ConnectionRegistry>,
    api: Arc<dyn CourseApi>,
    detector: CompletionDetector,
}

impl SyncRuntime {
    pub fn new(config: SyncConfig, api: Arc<dyn CourseApi>) -> anyhow::Result<Self> {
        let detector = config.completion_detector()?;
        Ok(Self { config, registry: Arc::new(ConnectionRegistry::new()), api, detector })
    }

    /// Build a runtime talking to the configured HTTP API.
    pub fn from_config(config: SyncConfig) -> anyhow::Result<Self> {
        let api: Arc<dyn CourseApi> = Arc::new(CourseClient::new(&config)?);
        Self::new(config, api)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    fn deps(&self) -> SessionDeps {
        SessionDeps {
            registry: Arc::clone(&self.registry),
            api: Arc::clone(&self.api),
            ws_base: self.config.ws_base(),
            auth_token: self.config.auth_token.clone(),
        }
    }

    /// Follow syllabus generation for `syllabus_id`.
    ///
    /// Pass `expecting = true` right after creating the syllabus so a dropped
    /// connection is reopened until the document arrives.
    pub fn watch_syllabus(&self, syllabus_id: i64, expecting: bool) -> SessionHandle {
        let controller = SyllabusController::new(
            syllabus_id,
            expecting,
            self.config.retry_policy(),
            self.config.syllabus_reconnect,
        );
        spawn_session(controller, self.deps())
    }

    /// Follow lesson content generation for `syllabus_id`.
    pub fn watch_content(&self, syllabus_id: i64, expecting: bool) -> SessionHandle {
        let controller = ContentController::new(
            syllabus_id,
            expecting,
            self.config.retry_policy(),
            self.config.content_reconnect,
            self.detector.clone(),
        );
        spawn_session(controller, self.deps())
    }

    /// Close every push channel connection.
    pub fn shutdown(&self) {
        self.registry.close_all();
    }
}
