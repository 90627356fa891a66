pub mod schema;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;

static SQLITE_VEC_INIT: Once = Once::new();

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Options for opening the memory database.
#[derive(Debug, Clone)]
pub struct OpenOptions<'a> {
    /// Embedding model identifier recorded alongside the vectors.
    pub model: &'a str,
    /// Vector dimension of the `memories_vec` table.
    pub dimensions: usize,
    /// Wipe all tables before initializing.
    pub drop_old: bool,
}

/// Open (or create) the memory database at the given path, with sqlite-vec
/// loaded and schema initialized.
pub fn open_database(path: impl AsRef<Path>, options: &OpenOptions<'_>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    load_sqlite_vec();

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;

    prepare(&conn, options)?;

    tracing::info!(path = %path.display(), "memory database initialized");
    Ok(conn)
}

/// Open an in-memory database (tests and throwaway CLI runs).
pub fn open_memory_database(options: &OpenOptions<'_>) -> Result<Connection> {
    load_sqlite_vec();
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    prepare(&conn, options)?;
    Ok(conn)
}

fn prepare(conn: &Connection, options: &OpenOptions<'_>) -> Result<()> {
    if options.drop_old {
        tracing::warn!("drop_old is set, discarding stored memories");
        schema::drop_schema(conn).context("failed to drop old schema")?;
    }

    schema::init_schema(conn, options.dimensions).context("failed to initialize schema")?;
    check_embedding_model(conn, options).context("failed to record embedding model")?;
    Ok(())
}

/// Record the embedding model on first use; warn when it has since changed.
fn check_embedding_model(conn: &Connection, options: &OpenOptions<'_>) -> rusqlite::Result<()> {
    let current = format!("{}:{}", options.model, options.dimensions);
    match get_meta(conn, "embedding_model")? {
        Some(stored) if stored != current => {
            tracing::warn!(
                stored = %stored,
                configured = %current,
                "embedding model changed, stored vectors may not be comparable (set memory.drop_old to rebuild)"
            );
        }
        Some(_) => {}
        None => set_meta(conn, "embedding_model", &current)?,
    }
    Ok(())
}

pub fn get_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = ?1",
        [key],
        |row| row.get::<_, String>(0),
    )
    .optional()
}

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(model: &str) -> OpenOptions<'_> {
        OpenOptions {
            model,
            dimensions: 8,
            drop_old: false,
        }
    }

    #[test]
    fn records_embedding_model_on_first_open() {
        let conn = open_memory_database(&options("stub")).unwrap();
        assert_eq!(
            get_meta(&conn, "embedding_model").unwrap().as_deref(),
            Some("stub:8")
        );
        assert_eq!(
            get_meta(&conn, "schema_version").unwrap().as_deref(),
            Some("1")
        );
    }

    #[test]
    fn model_change_keeps_original_record() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("memory.db");
        drop(open_database(&path, &options("first")).unwrap());

        let conn = open_database(&path, &options("second")).unwrap();
        assert_eq!(
            get_meta(&conn, "embedding_model").unwrap().as_deref(),
            Some("first:8")
        );
    }

    #[test]
    fn drop_old_clears_memories() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("memory.db");
        {
            let conn = open_database(&path, &options("stub")).unwrap();
            conn.execute(
                "INSERT INTO memories (id, content, created_at) VALUES ('a', 'x', 'now')",
                [],
            )
            .unwrap();
        }

        let reopened = OpenOptions {
            drop_old: true,
            ..options("stub")
        };
        let conn = open_database(&path, &reopened).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
