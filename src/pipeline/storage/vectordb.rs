use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, Transaction};

use super::StorageError;
use super::types::{cosine_similarity, ScoredChunk, TextChunk, VectorSearch, VectorStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vector_chunks (
    collection TEXT NOT NULL,
    chunk_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    section_title TEXT,
    char_offset INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (collection, chunk_id)
);
CREATE INDEX IF NOT EXISTS idx_vector_chunks_collection ON vector_chunks(collection);
";

fn lock_err<T>(_: std::sync::PoisonError<T>) -> StorageError {
    StorageError::VectorDb("Vector store lock poisoned".into())
}

fn check_lengths(chunks: &[TextChunk], embeddings: &[Vec<f32>]) -> Result<(), StorageError> {
    if chunks.len() != embeddings.len() {
        return Err(StorageError::VectorDb(
            "Chunk count does not match embedding count".into(),
        ));
    }
    Ok(())
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Sort by score descending and keep the best `top_k`.
fn rank(mut scored: Vec<ScoredChunk>, top_k: usize) -> Vec<ScoredChunk> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    scored
}

// ═══════════════════════════════════════════════════════════
// SQLite-backed collections
// ═══════════════════════════════════════════════════════════

/// One SQLite file holding every workspace collection.
#[derive(Clone)]
pub struct SqliteVectorDb {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVectorDb {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Delete every collection. Workspaces live in memory only, so rows left
    /// by a previous process can never be reached again.
    pub fn purge(&self) -> Result<usize, StorageError> {
        let removed = self
            .conn
            .lock()
            .map_err(lock_err)?
            .execute("DELETE FROM vector_chunks", [])?;
        Ok(removed)
    }

    /// Handle to a named collection. Creating it is free; rows appear on first store.
    pub fn collection(&self, name: &str) -> SqliteCollection {
        SqliteCollection {
            conn: Arc::clone(&self.conn),
            name: name.to_string(),
        }
    }
}

/// A named collection inside a [`SqliteVectorDb`].
pub struct SqliteCollection {
    conn: Arc<Mutex<Connection>>,
    name: String,
}

impl SqliteCollection {
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(lock_err)
    }

    fn insert_rows(
        &self,
        tx: &Transaction<'_>,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StorageError> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO vector_chunks
             (collection, chunk_id, chunk_index, content, section_title, char_offset, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            stmt.execute(params![
                self.name,
                chunk.id(),
                chunk.chunk_index as i64,
                chunk.content,
                chunk.section_title,
                chunk.char_offset as i64,
                encode_embedding(embedding),
                now,
            ])?;
        }
        Ok(())
    }
}

impl VectorStore for SqliteCollection {
    fn store_chunks(
        &self,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, StorageError> {
        check_lengths(chunks, embeddings)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        self.insert_rows(&tx, chunks, embeddings)?;
        tx.commit()?;

        tracing::debug!(collection = %self.name, count = chunks.len(), "Stored chunks");
        Ok(chunks.len())
    }

    fn replace_chunks(
        &self,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, StorageError> {
        check_lengths(chunks, embeddings)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM vector_chunks WHERE collection = ?1",
            params![self.name],
        )?;
        self.insert_rows(&tx, chunks, embeddings)?;
        tx.commit()?;

        tracing::debug!(
            collection = %self.name,
            removed,
            count = chunks.len(),
            "Replaced collection"
        );
        Ok(chunks.len())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let removed = self.conn()?.execute(
            "DELETE FROM vector_chunks WHERE collection = ?1",
            params![self.name],
        )?;
        tracing::debug!(collection = %self.name, removed, "Cleared collection");
        Ok(())
    }

    fn count(&self) -> Result<usize, StorageError> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM vector_chunks WHERE collection = ?1",
            params![self.name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl VectorSearch for SqliteCollection {
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT chunk_id, content, section_title, embedding
             FROM vector_chunks WHERE collection = ?1 ORDER BY chunk_index",
        )?;

        let scored = stmt
            .query_map(params![self.name], |row| {
                let embedding: Vec<u8> = row.get(3)?;
                Ok(ScoredChunk {
                    chunk_id: row.get(0)?,
                    content: row.get(1)?,
                    section_title: row.get(2)?,
                    score: cosine_similarity(query_embedding, &decode_embedding(&embedding)),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rank(scored, top_k))
    }
}

// ═══════════════════════════════════════════════════════════
// In-memory collection (tests, ephemeral workspaces)
// ═══════════════════════════════════════════════════════════

pub struct InMemoryVectorStore {
    entries: Mutex<Vec<StoredEntry>>,
}

struct StoredEntry {
    chunk_id: String,
    content: String,
    section_title: Option<String>,
    embedding: Vec<f32>,
}

impl StoredEntry {
    fn from_chunks<'a>(
        chunks: &'a [TextChunk],
        embeddings: &'a [Vec<f32>],
    ) -> impl Iterator<Item = StoredEntry> + 'a {
        chunks.iter().zip(embeddings).map(|(chunk, embedding)| StoredEntry {
            chunk_id: chunk.id(),
            content: chunk.content.clone(),
            section_title: chunk.section_title.clone(),
            embedding: embedding.clone(),
        })
    }
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStore for InMemoryVectorStore {
    fn store_chunks(
        &self,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, StorageError> {
        check_lengths(chunks, embeddings)?;

        let mut entries = self.entries.lock().map_err(lock_err)?;
        for entry in StoredEntry::from_chunks(chunks, embeddings) {
            entries.retain(|e| e.chunk_id != entry.chunk_id);
            entries.push(entry);
        }

        Ok(chunks.len())
    }

    fn replace_chunks(
        &self,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, StorageError> {
        check_lengths(chunks, embeddings)?;

        let replacement: Vec<StoredEntry> = StoredEntry::from_chunks(chunks, embeddings).collect();
        *self.entries.lock().map_err(lock_err)? = replacement;
        Ok(chunks.len())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries.lock().map_err(lock_err)?.clear();
        Ok(())
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.entries.lock().map_err(lock_err)?.len())
    }
}

impl VectorSearch for InMemoryVectorStore {
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, StorageError> {
        let entries = self.entries.lock().map_err(lock_err)?;
        let scored = entries
            .iter()
            .map(|e| ScoredChunk {
                chunk_id: e.chunk_id.clone(),
                content: e.content.clone(),
                section_title: e.section_title.clone(),
                score: cosine_similarity(query_embedding, &e.embedding),
            })
            .collect();

        Ok(rank(scored, top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_chunks(n: usize) -> Vec<TextChunk> {
        (0..n)
            .map(|i| TextChunk {
                content: format!("Chunk {i} content"),
                chunk_index: i,
                section_title: Some(format!("Section {i}")),
                char_offset: i * 100,
            })
            .collect()
    }

    /// Unit vectors along distinct axes so search order is predictable.
    fn axis_embeddings(n: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let mut v = vec![0.0; dim];
                v[i % dim] = 1.0;
                v
            })
            .collect()
    }

    fn exercise_store<S: VectorStore + VectorSearch>(store: &S) {
        assert_eq!(store.count().unwrap(), 0);

        let stored = store
            .store_chunks(&make_chunks(4), &axis_embeddings(4, 8))
            .unwrap();
        assert_eq!(stored, 4);
        assert_eq!(store.count().unwrap(), 4);

        let mut query = vec![0.0; 8];
        query[2] = 1.0;
        query[1] = 0.5;
        let results = store.search(&query, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk_id, "chunk_2");
        assert_eq!(results[1].chunk_id, "chunk_1");
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].section_title.as_deref(), Some("Section 2"));

        store.clear().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.search(&query, 3).unwrap().is_empty());
    }

    #[test]
    fn in_memory_store_search_and_clear() {
        exercise_store(&InMemoryVectorStore::new());
    }

    #[test]
    fn sqlite_store_search_and_clear() {
        let db = SqliteVectorDb::open_in_memory().unwrap();
        exercise_store(&db.collection("ws_test"));
    }

    #[test]
    fn sqlite_collections_are_isolated() {
        let db = SqliteVectorDb::open_in_memory().unwrap();
        let a = db.collection("a");
        let b = db.collection("b");

        a.store_chunks(&make_chunks(3), &axis_embeddings(3, 4)).unwrap();
        b.store_chunks(&make_chunks(1), &axis_embeddings(1, 4)).unwrap();

        a.clear().unwrap();
        assert_eq!(a.count().unwrap(), 0);
        assert_eq!(b.count().unwrap(), 1);
    }

    #[test]
    fn sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("vectors.db");

        {
            let db = SqliteVectorDb::open(&path).unwrap();
            db.collection("persist")
                .store_chunks(&make_chunks(2), &axis_embeddings(2, 4))
                .unwrap();
        }

        let db = SqliteVectorDb::open(&path).unwrap();
        assert_eq!(db.collection("persist").count().unwrap(), 2);
    }

    #[test]
    fn replace_swaps_whole_collection() {
        let memory = InMemoryVectorStore::new();
        let db = SqliteVectorDb::open_in_memory().unwrap();
        let sqlite = db.collection("ws_replace");

        for store in [&memory as &dyn VectorStore, &sqlite as &dyn VectorStore] {
            store.store_chunks(&make_chunks(4), &axis_embeddings(4, 8)).unwrap();
            let stored = store
                .replace_chunks(&make_chunks(2), &axis_embeddings(2, 8))
                .unwrap();
            assert_eq!(stored, 2);
            assert_eq!(store.count().unwrap(), 2);
        }
    }

    #[test]
    fn failed_replace_keeps_previous_contents() {
        let db = SqliteVectorDb::open_in_memory().unwrap();
        let collection = db.collection("ws_atomic");
        collection
            .store_chunks(&make_chunks(3), &axis_embeddings(3, 4))
            .unwrap();

        // Reject one row half-way through the insert
        db.conn
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_chunk BEFORE INSERT ON vector_chunks
                 WHEN NEW.content = 'Chunk 1 content'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let mut replacement = make_chunks(2);
        replacement[0].content = "new first chunk".into();
        let result = collection.replace_chunks(&replacement, &axis_embeddings(2, 4));
        assert!(matches!(result, Err(StorageError::Database(_))));

        assert_eq!(collection.count().unwrap(), 3);
        let results = collection.search(&[1.0, 0.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(results[0].content, "Chunk 0 content");

        let memory = InMemoryVectorStore::new();
        memory.store_chunks(&make_chunks(3), &axis_embeddings(3, 4)).unwrap();
        assert!(memory.replace_chunks(&make_chunks(2), &axis_embeddings(1, 4)).is_err());
        assert_eq!(memory.count().unwrap(), 3);
    }

    #[test]
    fn purge_drops_rows_left_by_a_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.db");

        {
            let db = SqliteVectorDb::open(&path).unwrap();
            db.collection("ws_old_a")
                .store_chunks(&make_chunks(2), &axis_embeddings(2, 4))
                .unwrap();
            db.collection("ws_old_b")
                .store_chunks(&make_chunks(1), &axis_embeddings(1, 4))
                .unwrap();
        }

        let db = SqliteVectorDb::open(&path).unwrap();
        assert_eq!(db.purge().unwrap(), 3);
        assert_eq!(db.collection("ws_old_a").count().unwrap(), 0);
        assert_eq!(db.collection("ws_old_b").count().unwrap(), 0);
    }

    #[test]
    fn restoring_same_chunk_id_replaces() {
        let store = InMemoryVectorStore::new();
        store.store_chunks(&make_chunks(2), &axis_embeddings(2, 4)).unwrap();
        store.store_chunks(&make_chunks(2), &axis_embeddings(2, 4)).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn mismatched_chunks_and_embeddings_errors() {
        let store = InMemoryVectorStore::new();
        let result = store.store_chunks(&make_chunks(3), &axis_embeddings(2, 4));
        assert!(matches!(result, Err(StorageError::VectorDb(_))));

        let db = SqliteVectorDb::open_in_memory().unwrap();
        let result = db.collection("x").store_chunks(&make_chunks(3), &axis_embeddings(2, 4));
        assert!(matches!(result, Err(StorageError::VectorDb(_))));
    }

    #[test]
    fn embedding_blob_round_trips() {
        let v = vec![0.25f32, -1.5, 3.0];
        assert_eq!(decode_embedding(&encode_embedding(&v)), v);
    }
}
