use std::collections::HashSet;
use std::path::Path;

use rusqlite::{Connection, params};
use uuid::Uuid;

use cm_core::{RawEmbedding, Record};

use crate::error::{Result, StoreError};
use crate::schema;

/// Local mirror of the upstream `processed_messages` table.
///
/// Holds input records only. Cluster assignments are recomputed on every run
/// and never written here.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::InvalidData(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let result = stmt.query_row([key], |row| row.get(0)).ok();
        Ok(result)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Records ---

    /// Insert or replace records by id. A replaced record keeps its original
    /// position in load order. Records without an id get a fresh UUID.
    ///
    /// Returns the number of distinct ids written. When an id repeats within
    /// one batch the last occurrence wins.
    pub fn upsert_records(&self, records: &[Record], source: &str) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut written: HashSet<String> = HashSet::new();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO processed_messages
                    (id, trigger_text, thought_text, response_text,
                     trigger_embedding, thought_embedding, response_embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    trigger_text = excluded.trigger_text,
                    thought_text = excluded.thought_text,
                    response_text = excluded.response_text,
                    trigger_embedding = excluded.trigger_embedding,
                    thought_embedding = excluded.thought_embedding,
                    response_embedding = excluded.response_embedding,
                    imported_at = datetime('now')",
            )?;

            for record in records {
                let id = if record.id.trim().is_empty() {
                    let generated = Uuid::new_v4().to_string();
                    tracing::warn!("record without id imported as {generated}");
                    generated
                } else {
                    record.id.clone()
                };
                if written.contains(&id) {
                    tracing::warn!("duplicate record id {id} in batch, keeping the later one");
                }
                stmt.execute(params![
                    id,
                    record.trigger,
                    record.thought,
                    record.response,
                    encode_embedding(&record.trigger_embedding)?,
                    encode_embedding(&record.thought_embedding)?,
                    encode_embedding(&record.response_embedding)?,
                ])?;
                written.insert(id);
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('last_import_source', ?1)",
            [source],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('last_import_at', datetime('now'))",
            [],
        )?;
        tx.commit()?;

        tracing::info!("stored {} records from {source}", written.len());
        Ok(written.len())
    }

    /// All records in first-import order.
    pub fn load_records(&self) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, trigger_text, thought_text, response_text,
                    trigger_embedding, thought_embedding, response_embedding
             FROM processed_messages ORDER BY seq",
        )?;

        let rows: Vec<(String, Option<String>, Option<String>, Option<String>, String, String, String)> =
            stmt.query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(id, trigger, thought, response, te, the, re)| {
                Ok(Record {
                    trigger_embedding: decode_embedding(&id, &te)?,
                    thought_embedding: decode_embedding(&id, &the)?,
                    response_embedding: decode_embedding(&id, &re)?,
                    id,
                    trigger,
                    thought,
                    response,
                })
            })
            .collect()
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM processed_messages", [], |row| {
                row.get(0)
            })?;
        Ok(n as usize)
    }

    pub fn clear(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM processed_messages", [])?;
        tracing::info!("cleared {removed} records");
        Ok(removed)
    }

    /// Database size in bytes (page_count * page_size).
    pub fn db_size(&self) -> u64 {
        let pages: i64 = self
            .conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))
            .unwrap_or(0);
        let page_size: i64 = self
            .conn
            .query_row("PRAGMA page_size", [], |row| row.get(0))
            .unwrap_or(0);
        (pages * page_size).max(0) as u64
    }
}

fn encode_embedding(raw: &RawEmbedding) -> Result<String> {
    serde_json::to_string(raw)
        .map_err(|e| StoreError::InvalidData(format!("failed to encode embedding: {e}")))
}

fn decode_embedding(id: &str, text: &str) -> Result<RawEmbedding> {
    serde_json::from_str(text).map_err(|e| {
        StoreError::InvalidData(format!("corrupt embedding for record {id}: {e}"))
    })
}
