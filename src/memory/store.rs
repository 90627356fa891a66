//! Write path: insert a memory and its embedding, then audit-log the creation.

use anyhow::{bail, Result};
use rusqlite::{params, Connection, Transaction};

use super::embedding_to_bytes;

/// Store `content` with its embedding and return the new id (UUID v7).
///
/// The row, the vector and the audit entry are written in one transaction.
pub fn insert_memory(conn: &mut Connection, content: &str, embedding: &[f32]) -> Result<String> {
    if content.trim().is_empty() {
        bail!("memory content must not be empty");
    }

    let tx = conn.transaction()?;
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    tx.execute(
        "INSERT INTO memories (id, content, created_at) VALUES (?1, ?2, ?3)",
        params![id, content, now],
    )?;
    tx.execute(
        "INSERT INTO memories_vec (id, embedding) VALUES (?1, ?2)",
        params![id, embedding_to_bytes(embedding)],
    )?;
    write_audit_log(&tx, "create", &id, None)?;

    tx.commit()?;
    Ok(id)
}

/// Append an entry to `memory_log`.
pub(crate) fn write_audit_log(
    tx: &Transaction,
    operation: &str,
    memory_id: &str,
    details: Option<&serde_json::Value>,
) -> Result<()> {
    tx.execute(
        "INSERT INTO memory_log (operation, memory_id, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            operation,
            memory_id,
            details.map(|d| d.to_string()),
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_memory_database, OpenOptions};

    fn conn() -> Connection {
        open_memory_database(&OpenOptions {
            model: "test",
            dimensions: 4,
            drop_old: false,
        })
        .unwrap()
    }

    #[test]
    fn insert_writes_row_vector_and_log() {
        let mut conn = conn();
        let id = insert_memory(&mut conn, "nas lives at 10.0.0.5", &[1.0, 0.0, 0.0, 0.0]).unwrap();

        let content: String = conn
            .query_row("SELECT content FROM memories WHERE id = ?1", [&id], |r| r.get(0))
            .unwrap();
        assert_eq!(content, "nas lives at 10.0.0.5");

        let vectors: i64 = conn
            .query_row("SELECT COUNT(*) FROM memories_vec WHERE id = ?1", [&id], |r| r.get(0))
            .unwrap();
        assert_eq!(vectors, 1);

        let op: String = conn
            .query_row("SELECT operation FROM memory_log WHERE memory_id = ?1", [&id], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(op, "create");
    }

    #[test]
    fn ids_are_unique() {
        let mut conn = conn();
        let a = insert_memory(&mut conn, "same text", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        let b = insert_memory(&mut conn, "same text", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_content_is_rejected() {
        let mut conn = conn();
        let err = insert_memory(&mut conn, "   ", &[1.0, 0.0, 0.0, 0.0]).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }
}
