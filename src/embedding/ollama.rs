//! Ollama `/api/embed` embedding provider.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{l2_normalize, EmbeddingProvider};
use crate::config::EmbeddingConfig;

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct OllamaEmbeddingProvider {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        anyhow::ensure!(config.dimensions > 0, "embedding.dimensions must be positive");
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/embed", config.url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "model": self.model, "input": text }))
            .send()
            .await
            .with_context(|| format!("embedding request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("embedding endpoint returned {status}: {}", body.trim());
        }

        let body: EmbedResponse = response
            .json()
            .await
            .context("invalid embedding response")?;
        let vector = body
            .embeddings
            .into_iter()
            .next()
            .context("embedding response contained no vectors")?;

        anyhow::ensure!(
            vector.len() == self.dimensions,
            "model {} returned {} dimensions, expected {}",
            self.model,
            vector.len(),
            self.dimensions
        );

        Ok(l2_normalize(&vector))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}
