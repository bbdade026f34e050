// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the authoring API.

use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::{ApiFuture, CourseApi};
use crate::config::SyncConfig;

/// HTTP client wrapper for the authoring API.
pub struct CourseClient {
    base_url: String,
    auth_token: Option<String>,
    client: Client,
}

impl CourseClient {
    pub fn new(config: &SyncConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self { base_url: config.api_base(), auth_token: config.auth_token.clone(), client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// GET a syllabus. A 404 means "not generated yet".
    pub async fn get_syllabus(&self, syllabus_id: i64) -> anyhow::Result<Option<Value>> {
        let req = self.client.get(self.url(&format!("/syllabus/{syllabus_id}")));
        let resp = self.apply_auth(req).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = resp.error_for_status()?.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_slice(&bytes)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    /// POST JSON to an API endpoint, discarding any response body.
    pub async fn post_json(&self, path: &str, body: &Value) -> anyhow::Result<()> {
        let req = self.client.post(self.url(path)).json(body);
        self.apply_auth(req).send().await?.error_for_status()?;
        Ok(())
    }
}

impl CourseApi for CourseClient {
    fn fetch_syllabus(&self, syllabus_id: i64) -> ApiFuture<'_, Option<Value>> {
        Box::pin(self.get_syllabus(syllabus_id))
    }

    fn submit_feedback(&self, syllabus_id: i64, feedback: &str) -> ApiFuture<'_, ()> {
        let body = serde_json::json!({ "feedback": feedback });
        Box::pin(async move {
            self.post_json(&format!("/syllabus/{syllabus_id}/feedback"), &body).await
        })
    }

    fn approve_syllabus(&self, syllabus_id: i64) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            self.post_json(&format!("/syllabus/{syllabus_id}/approve"), &serde_json::json!({})).await
        })
    }
}
