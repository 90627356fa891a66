use anyhow::Result;
use std::sync::Arc;

use crate::config::EterniumConfig;
use crate::memory::types::QueryOutcome;
use crate::memory::MemoryStore;

fn open_store(config: &EterniumConfig) -> Result<MemoryStore> {
    let provider = crate::embedding::create_provider(&config.embedding)?;
    MemoryStore::open(config, Arc::from(provider))
}

pub async fn add(config: &EterniumConfig, fact: &str) -> Result<()> {
    let store = open_store(config)?;
    let id = store.add(fact).await?;
    println!("Stored memory {id}");
    Ok(())
}

/// Search with relevance filtering and print scored candidates.
pub async fn search(config: &EterniumConfig, query: &str) -> Result<()> {
    let store = open_store(config)?;
    let outcome = store.query(query, store.default_k(true), true).await?;

    match outcome {
        QueryOutcome::Matches(matches) if matches.is_empty() => {
            println!("No memories stored yet.");
        }
        QueryOutcome::Matches(matches) => {
            println!("Found {} relevant memory(ies):\n", matches.len());
            for (i, m) in matches.iter().enumerate() {
                println!("  {}. {} (distance: {:.4})", i + 1, m.content, m.score);
                println!("     id: {}", m.id);
            }
        }
        QueryOutcome::NoneRelevant {
            candidates,
            best_score,
        } => {
            println!(
                "{candidates} candidate(s) found, but none met the relevance threshold {} (best distance {best_score:.4}).",
                store.threshold()
            );
        }
    }
    Ok(())
}

pub async fn forget(config: &EterniumConfig, id: &str) -> Result<()> {
    let store = open_store(config)?;
    if store.delete(id).await? {
        println!("Deleted memory {id}");
        Ok(())
    } else {
        anyhow::bail!("no memory with ID {id}")
    }
}
