//! Couch-compatible HTTP document writer.
//!
//! Documents land at `{url}/{bucket}/{id}`, design documents at
//! `{url}/{bucket}/_design/{name}` with the standard
//! `{"views": {name: {"map": ..., "reduce": ...}}}` body.

use async_trait::async_trait;
use serde_json::json;

use crate::config::DestinationConfig;
use crate::error::{Error, Result};
use crate::sink::DocumentWriter;
use crate::value::Document;
use crate::views::ViewDefinition;

/// HTTP writer for Couch-compatible document stores.
pub struct CouchWriter {
    config: DestinationConfig,
    client: reqwest::Client,
}

impl CouchWriter {
    /// Creates a new writer.
    #[must_use]
    pub fn new(config: DestinationConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn bucket_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.url.trim_end_matches('/'),
            self.config.bucket
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.username {
            Some(user) => request.basic_auth(user, self.config.password.as_deref()),
            None => request,
        }
    }
}

#[async_trait]
impl DocumentWriter for CouchWriter {
    fn writer_type(&self) -> &'static str {
        "couch"
    }

    async fn connect(&mut self) -> Result<()> {
        let response = self
            .authorized(self.client.get(self.bucket_url()))
            .send()
            .await
            .map_err(|e| Error::DestinationConnection(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::DestinationConnection(format!(
                "bucket '{}' not reachable: HTTP {}",
                self.config.bucket,
                response.status()
            )));
        }
        Ok(())
    }

    async fn put(&self, id: &str, document: &Document) -> Result<()> {
        let url = format!("{}/{}", self.bucket_url(), id);
        let response = self
            .authorized(self.client.put(&url))
            .json(document)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Loading(format!(
                "write of '{id}' rejected: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn put_view(&self, view: &ViewDefinition) -> Result<()> {
        let url = format!("{}/_design/{}", self.bucket_url(), view.design_doc);
        let mut views = serde_json::Map::new();
        views.insert(
            view.name.clone(),
            json!({ "map": view.map, "reduce": view.reduce }),
        );
        let body = json!({
            "language": "javascript",
            "views": views,
        });
        let response = self
            .authorized(self.client.put(&url))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::ViewSynthesis(format!(
                "design document '{}' rejected: HTTP {}",
                view.design_doc,
                response.status()
            )));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "couch_tests.rs"]
mod tests;
