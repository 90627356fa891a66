//! Identity-based deletion.

use anyhow::Result;
use rusqlite::{params, Connection};

use super::store::write_audit_log;

/// Delete the memory with exactly this id from the row and vector tables.
///
/// Returns `false` when no such memory exists, so a repeated delete reports failure.
pub fn delete_memory(conn: &mut Connection, memory_id: &str) -> Result<bool> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM memories_vec WHERE id = ?1", params![memory_id])?;
    let removed = tx.execute("DELETE FROM memories WHERE id = ?1", params![memory_id])?;

    if removed == 0 {
        tx.rollback()?;
        return Ok(false);
    }

    write_audit_log(&tx, "delete", memory_id, None)?;
    tx.commit()?;
    Ok(true)
}
