//! The memory worker's operations.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::types::QueryOutcome;
use super::MemoryStore;
use crate::adapters::AdapterError;
use crate::envelope::Envelope;
use crate::registry::BuildContext;
use crate::tool::{bind, OperationSpec, Toolset};

pub const ADD_TO_MEMORY: OperationSpec = OperationSpec::mutating(
    "add_to_memory",
    "Add a fact or note to long-term memory. Use when the user says 'remember' or 'take a note'.",
);
pub const QUERY_MEMORY: OperationSpec = OperationSpec::read(
    "query_memory",
    "Search long-term memory. With include_metadata=true returns ids, content and scores of relevant facts (needed before deleting).",
);
pub const DELETE_MEMORY_BY_ID: OperationSpec = OperationSpec::mutating(
    "delete_memory_by_id",
    "Delete one fact from long-term memory by the id found with query_memory.",
);

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddToMemoryParams {
    #[schemars(description = "The fact to remember, as a short sentence")]
    pub fact: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryMemoryParams {
    #[schemars(description = "Concise keywords to search for")]
    pub query: String,

    #[schemars(
        description = "Return ids and scores (for deletion) instead of plain text. Defaults to false."
    )]
    #[serde(default)]
    pub include_metadata: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteMemoryParams {
    #[schemars(description = "Id of the memory to delete")]
    pub doc_id: String,
}

/// Factory for the `memory` blueprint: opens the configured store.
pub fn toolset(ctx: &BuildContext) -> anyhow::Result<Toolset> {
    let store = MemoryStore::open(&ctx.config, Arc::clone(&ctx.embedder))?;
    Ok(toolset_for(Arc::new(store)))
}

pub fn toolset_for(store: Arc<MemoryStore>) -> Toolset {
    vec![
        bind(&store, ADD_TO_MEMORY, |store, p: AddToMemoryParams| async move {
            add_to_memory(&store, &p.fact).await
        }),
        bind(&store, QUERY_MEMORY, |store, p: QueryMemoryParams| async move {
            query_memory(&store, &p.query, p.include_metadata).await
        }),
        bind(&store, DELETE_MEMORY_BY_ID, |store, p: DeleteMemoryParams| async move {
            delete_memory_by_id(&store, &p.doc_id).await
        }),
    ]
}

async fn add_to_memory(store: &MemoryStore, fact: &str) -> Result<Envelope, AdapterError> {
    if fact.trim().is_empty() {
        return Err(AdapterError::invalid("fact must not be empty"));
    }
    let id = store.add(fact).await?;
    Ok(Envelope::record(json!({
        "message": "The information has been added to long-term memory.",
        "id": id,
    })))
}

async fn query_memory(
    store: &MemoryStore,
    query: &str,
    include_metadata: bool,
) -> Result<Envelope, AdapterError> {
    let k = store.default_k(include_metadata);
    let outcome = store.query(query, k, include_metadata).await?;

    Ok(match outcome {
        QueryOutcome::Matches(found) if include_metadata => Envelope::records(
            found
                .into_iter()
                .map(|c| json!({ "id": c.id, "content": c.content, "score": c.score }))
                .collect(),
        ),
        QueryOutcome::Matches(found) => Envelope::records(
            found
                .into_iter()
                .map(|c| Value::String(c.content))
                .collect(),
        ),
        QueryOutcome::NoneRelevant {
            candidates,
            best_score,
        } => Envelope::NoneRelevant {
            message: format!(
                "Potential matches found but none met the relevance threshold (best score {best_score}, threshold {}).",
                store.threshold()
            ),
            candidates,
        },
    })
}

async fn delete_memory_by_id(store: &MemoryStore, doc_id: &str) -> Result<Envelope, AdapterError> {
    if store.delete(doc_id).await? {
        Ok(Envelope::success(format!(
            "Successfully deleted memory with ID {doc_id}."
        )))
    } else {
        Err(AdapterError::NotFound(format!(
            "no memory with ID {doc_id}"
        )))
    }
}
