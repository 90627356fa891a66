//! Semantic memory: facts embedded into a sqlite-vec index.
//!
//! [`MemoryStore`] is the async facade used by the memory worker and the CLI.
//! Embedding happens on the runtime; every SQLite call runs under
//! `spawn_blocking` against the shared connection.

pub mod forget;
pub mod search;
pub mod store;
pub mod tools;
pub mod types;

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::config::{EterniumConfig, MemoryConfig};
use crate::db::{self, OpenOptions};
use crate::embedding::EmbeddingProvider;
use types::QueryOutcome;

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}

pub struct MemoryStore {
    db: Arc<Mutex<Connection>>,
    embedder: Arc<dyn EmbeddingProvider>,
    threshold: f64,
    context_k: usize,
    candidate_k: usize,
}

impl MemoryStore {
    /// Open the configured database file for `embedder`'s model and dimension.
    pub fn open(config: &EterniumConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let conn = db::open_database(
            config.resolved_db_path(),
            &OpenOptions {
                model: embedder.model(),
                dimensions: embedder.dimensions(),
                drop_old: config.memory.drop_old,
            },
        )?;
        Ok(Self::with_connection(conn, embedder, &config.memory))
    }

    pub fn with_connection(
        conn: Connection,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &MemoryConfig,
    ) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            embedder,
            threshold: config.threshold,
            context_k: config.context_results,
            candidate_k: config.candidate_results,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Neighbour count for a query: small for context, wider when ids are wanted.
    pub fn default_k(&self, want_ids: bool) -> usize {
        if want_ids {
            self.candidate_k
        } else {
            self.context_k
        }
    }

    /// Embed and store `text`, returning its new id.
    pub async fn add(&self, text: &str) -> Result<String> {
        let embedding = self
            .embedder
            .embed(text)
            .await
            .context("embedding failed")?;

        let db = Arc::clone(&self.db);
        let content = text.to_string();
        let id = tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            store::insert_memory(&mut conn, &content, &embedding)
        })
        .await
        .context("db task failed")??;

        tracing::info!(id = %id, content_len = text.len(), "memory stored");
        Ok(id)
    }

    /// Retrieve the `k` nearest memories.
    ///
    /// Without ids the raw neighbours are returned as context. With ids only
    /// candidates scoring strictly below the threshold are kept, and a non-empty
    /// candidate set that is entirely rejected becomes [`QueryOutcome::NoneRelevant`].
    pub async fn query(&self, text: &str, k: usize, want_ids: bool) -> Result<QueryOutcome> {
        let embedding = self
            .embedder
            .embed(text)
            .await
            .context("embedding failed")?;

        let db = Arc::clone(&self.db);
        let candidates = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            search::nearest(&conn, &embedding, k)
        })
        .await
        .context("db task failed")??;

        let outcome = if want_ids {
            search::filter_relevant(candidates, self.threshold)
        } else {
            QueryOutcome::Matches(candidates)
        };

        tracing::debug!(
            k,
            want_ids,
            matched = outcome.matches().len(),
            "memory query"
        );
        Ok(outcome)
    }

    /// Remove the memory with this id. `false` if it did not exist.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let db = Arc::clone(&self.db);
        let id_owned = id.to_string();
        let removed = tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            forget::delete_memory(&mut conn, &id_owned)
        })
        .await
        .context("db task failed")??;

        tracing::info!(id = %id, removed, "memory delete");
        Ok(removed)
    }
}
