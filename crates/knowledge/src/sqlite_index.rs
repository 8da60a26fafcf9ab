//! SQLite-backed vector index for persisted knowledge bases.
//!
//! Embeddings are stored as little-endian `f32` blobs and scanned
//! brute-force at query time. A `meta` table records the embedding provider,
//! model, dimensionality and metric the index was built with, and opening
//! it with a different combination is refused.

use crate::types::{Chunk, KnowledgeBaseConfig, ScoredChunk};
use crate::vector_index::{check_dimensions, rank, Metric, VectorIndex};
use chrono::{DateTime, Utc};
use drugsearch_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// What an index was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSignature {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub metric: Metric,
}

impl IndexSignature {
    pub fn from_config(config: &KnowledgeBaseConfig) -> Self {
        Self {
            provider: config.embedding.provider.clone(),
            model: config.embedding.model.clone(),
            dimensions: config.embedding.dimensions,
            metric: config.metric,
        }
    }

    fn ensure_matches(&self, requested: &IndexSignature) -> AppResult<()> {
        if self.dimensions != requested.dimensions {
            return Err(AppError::DimensionMismatch {
                expected: self.dimensions,
                actual: requested.dimensions,
            });
        }

        if self != requested {
            return Err(AppError::Knowledge(format!(
                "Index was built with {}/{} ({}), configuration asks for {}/{} ({}). \
                 Re-learn with --reset to rebuild it.",
                self.provider,
                self.model,
                self.metric.as_str(),
                requested.provider,
                requested.model,
                requested.metric.as_str()
            )));
        }

        Ok(())
    }
}

/// Persisted vector index.
///
/// The connection sits behind a mutex so the index can live in a shared
/// pipeline; every call holds the lock for its whole statement or transaction.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    signature: IndexSignature,
}

impl std::fmt::Debug for SqliteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteIndex")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl SqliteIndex {
    /// Open or create the index at `db_path` for the given signature.
    pub fn open(db_path: &Path, signature: &IndexSignature) -> AppResult<Self> {
        if signature.dimensions == 0 {
            return Err(AppError::Config(
                "Index dimensions must be greater than 0".to_string(),
            ));
        }

        let conn = init_index(db_path)?;

        match read_signature(&conn)? {
            Some(stored) => stored.ensure_matches(signature)?,
            None => write_signature(&conn, signature)?,
        }

        Ok(Self {
            conn: Mutex::new(conn),
            signature: signature.clone(),
        })
    }

    /// Open an existing index with whatever signature it was built with.
    pub fn open_existing(db_path: &Path) -> AppResult<Self> {
        if !db_path.exists() {
            return Err(AppError::Knowledge(format!(
                "No index found at {:?}",
                db_path
            )));
        }

        let conn = init_index(db_path)?;
        let signature = read_signature(&conn)?.ok_or_else(|| {
            AppError::Knowledge(format!("Index at {:?} has no metadata", db_path))
        })?;

        Ok(Self {
            conn: Mutex::new(conn),
            signature,
        })
    }

    pub fn signature(&self) -> &IndexSignature {
        &self.signature
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("SQLite index lock poisoned".to_string()))
    }

    /// Replace every chunk of `document` with `entries` in one transaction.
    ///
    /// Chunks from an earlier learn of the same document are removed even when
    /// their text (and so their id) no longer appears, including pages a PDF
    /// has since lost.
    pub fn replace_document(
        &mut self,
        document: &str,
        entries: &[(Chunk, Vec<f32>)],
    ) -> AppResult<()> {
        let dimensions = self.dimensions();
        for (_, embedding) in entries {
            check_dimensions(dimensions, embedding)?;
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

        let removed = tx
            .execute("DELETE FROM chunks WHERE document = ?1", params![document])
            .map_err(|e| AppError::Knowledge(format!("Failed to remove old chunks: {}", e)))?;
        for (chunk, embedding) in entries {
            insert_chunk(&tx, document, chunk, embedding)?;
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit chunks: {}", e)))?;

        tracing::debug!(
            "Replaced {} chunks of '{}' with {}",
            removed,
            document,
            entries.len()
        );
        Ok(())
    }

    /// Record that a document was learned.
    pub fn record_source(
        &self,
        name: &str,
        pages: u32,
        size_bytes: u64,
        learned_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.lock()?
            .execute(
                "INSERT INTO sources (name, pages, size_bytes, learned_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(name) DO UPDATE SET
                     pages = excluded.pages,
                     size_bytes = excluded.size_bytes,
                     learned_at = excluded.learned_at",
                params![name, pages as i64, size_bytes as i64, learned_at.to_rfc3339()],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert source: {}", e)))?;
        Ok(())
    }

    /// Number of learned documents.
    pub fn document_count(&self) -> AppResult<u32> {
        count(&*self.lock()?, "SELECT COUNT(*) FROM sources")
    }

    /// Most recent learn time across all documents.
    pub fn last_learned_at(&self) -> AppResult<Option<DateTime<Utc>>> {
        let latest: Option<String> = self
            .lock()?
            .query_row("SELECT MAX(learned_at) FROM sources", [], |row| row.get(0))
            .map_err(|e| AppError::Knowledge(format!("Failed to read learn time: {}", e)))?;

        latest
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| AppError::Knowledge(format!("Invalid learn time '{}': {}", s, e)))
            })
            .transpose()
    }
}

impl VectorIndex for SqliteIndex {
    fn dimensions(&self) -> usize {
        self.signature.dimensions
    }

    fn metric(&self) -> Metric {
        self.signature.metric
    }

    fn upsert_chunk(&mut self, chunk: &Chunk, embedding: &[f32]) -> AppResult<()> {
        check_dimensions(self.dimensions(), embedding)?;
        insert_chunk(&*self.lock()?, &chunk.source, chunk, embedding)
    }

    fn upsert_chunks(&mut self, entries: &[(Chunk, Vec<f32>)]) -> AppResult<()> {
        let dimensions = self.dimensions();
        for (_, embedding) in entries {
            check_dimensions(dimensions, embedding)?;
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;
        for (chunk, embedding) in entries {
            insert_chunk(&tx, &chunk.source, chunk, embedding)?;
        }
        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit chunks: {}", e)))?;

        tracing::debug!("Upserted {} chunks", entries.len());
        Ok(())
    }

    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>> {
        check_dimensions(self.dimensions(), query_embedding)?;

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, source, position, text, embedding FROM chunks ORDER BY rowid")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let chunk = Chunk {
                    id: row.get(0)?,
                    source: row.get(1)?,
                    position: row.get::<_, i64>(2)? as u32,
                    text: row.get(3)?,
                };
                let bytes: Vec<u8> = row.get(4)?;
                Ok((chunk, bytes))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

        let mut candidates = Vec::new();
        for row in rows {
            let (chunk, bytes) =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk: {}", e)))?;
            let embedding = bytes_to_embedding(&bytes)?;
            check_dimensions(self.dimensions(), &embedding)?;
            candidates.push(ScoredChunk {
                score: self.signature.metric.score(query_embedding, &embedding),
                chunk,
            });
        }

        let results = rank(candidates, top_k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results)
    }

    fn stats(&self) -> AppResult<(u32, u32)> {
        let conn = self.lock()?;
        let sources_count = count(&conn, "SELECT COUNT(DISTINCT source) FROM chunks")?;
        let chunks_count = count(&conn, "SELECT COUNT(*) FROM chunks")?;
        Ok((sources_count, chunks_count))
    }

    fn reset(&mut self) -> AppResult<()> {
        self.lock()?
            .execute_batch("DELETE FROM chunks; DELETE FROM sources;")
            .map_err(|e| AppError::Knowledge(format!("Failed to reset index: {}", e)))?;

        tracing::info!("Reset knowledge base index");
        Ok(())
    }
}

/// Open the database and create tables.
fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Knowledge(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sources (
            name TEXT PRIMARY KEY,
            pages INTEGER NOT NULL,
            size_bytes INTEGER NOT NULL,
            learned_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            document TEXT NOT NULL,
            source TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document);
        "#,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

fn read_signature(conn: &Connection) -> AppResult<Option<IndexSignature>> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM meta")
        .map_err(|e| AppError::Knowledge(format!("Failed to read index metadata: {}", e)))?;
    let meta: HashMap<String, String> = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .and_then(|rows| rows.collect())
        .map_err(|e| AppError::Knowledge(format!("Failed to read index metadata: {}", e)))?;

    if meta.is_empty() {
        return Ok(None);
    }

    let field = |key: &str| {
        meta.get(key)
            .cloned()
            .ok_or_else(|| AppError::Knowledge(format!("Index metadata is missing '{}'", key)))
    };

    let dimensions = field("dimensions")?
        .parse::<usize>()
        .map_err(|e| AppError::Knowledge(format!("Invalid index dimensions: {}", e)))?;
    let metric_name = field("metric")?;
    let metric = Metric::parse(&metric_name)
        .ok_or_else(|| AppError::Knowledge(format!("Unknown index metric '{}'", metric_name)))?;

    Ok(Some(IndexSignature {
        provider: field("provider")?,
        model: field("model")?,
        dimensions,
        metric,
    }))
}

fn write_signature(conn: &Connection, signature: &IndexSignature) -> AppResult<()> {
    let dimensions = signature.dimensions.to_string();
    let entries = [
        ("provider", signature.provider.as_str()),
        ("model", signature.model.as_str()),
        ("dimensions", dimensions.as_str()),
        ("metric", signature.metric.as_str()),
    ];

    for (key, value) in entries {
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to write index metadata: {}", e)))?;
    }
    Ok(())
}

fn insert_chunk(
    conn: &Connection,
    document: &str,
    chunk: &Chunk,
    embedding: &[f32],
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO chunks (id, document, source, position, text, embedding)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
             document = excluded.document,
             source = excluded.source,
             position = excluded.position,
             text = excluded.text,
             embedding = excluded.embedding",
        params![
            chunk.id,
            document,
            chunk.source,
            chunk.position as i64,
            chunk.text,
            embedding_to_bytes(embedding),
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

    Ok(())
}

fn count(conn: &Connection, sql: &str) -> AppResult<u32> {
    conn.query_row(sql, [], |row| row.get::<_, i64>(0).map(|v| v as u32))
        .map_err(|e| AppError::Knowledge(format!("Failed to count rows: {}", e)))
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn signature(dimensions: usize) -> IndexSignature {
        IndexSignature {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions,
            metric: Metric::Cosine,
        }
    }

    fn chunk(id: &str, source: &str, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            source: source.to_string(),
            position: 0,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_insert_and_query() {
        let temp = TempDir::new().unwrap();
        let mut index = SqliteIndex::open(&temp.path().join("index.sqlite"), &signature(3)).unwrap();

        index
            .upsert_chunk(&chunk("chunk1", "a.txt", "test text"), &[1.0, 0.0, 0.0])
            .unwrap();
        index
            .upsert_chunk(&chunk("chunk2", "b.txt", "other"), &[0.0, 1.0, 0.0])
            .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "chunk1");
        assert_eq!(results[0].chunk.source, "a.txt");
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kb").join("index.sqlite");

        {
            let mut index = SqliteIndex::open(&path, &signature(2)).unwrap();
            index
                .upsert_chunks(&[(chunk("c1", "label.pdf_page_0", "dose"), vec![0.6, 0.8])])
                .unwrap();
            index.record_source("label.pdf", 1, 2048, Utc::now()).unwrap();
        }

        let index = SqliteIndex::open_existing(&path).unwrap();
        assert_eq!(index.signature(), &signature(2));
        assert_eq!(index.stats().unwrap(), (1, 1));
        assert_eq!(index.document_count().unwrap(), 1);
        assert!(index.last_learned_at().unwrap().is_some());

        let results = index.search(&[0.6, 0.8], 1).unwrap();
        assert_eq!(results[0].chunk.text, "dose");
    }

    #[test]
    fn test_reopen_with_other_dimensions_refused() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.sqlite");
        SqliteIndex::open(&path, &signature(384)).unwrap();

        assert!(matches!(
            SqliteIndex::open(&path, &signature(1536)),
            Err(AppError::DimensionMismatch {
                expected: 384,
                actual: 1536
            })
        ));
    }

    #[test]
    fn test_reopen_with_other_model_refused() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.sqlite");
        SqliteIndex::open(&path, &signature(4)).unwrap();

        let other = IndexSignature {
            model: "other-model".to_string(),
            ..signature(4)
        };
        assert!(matches!(
            SqliteIndex::open(&path, &other),
            Err(AppError::Knowledge(_))
        ));
    }

    #[test]
    fn test_upsert_keeps_one_row_per_id() {
        let temp = TempDir::new().unwrap();
        let mut index = SqliteIndex::open(&temp.path().join("index.sqlite"), &signature(2)).unwrap();

        index.upsert_chunk(&chunk("same", "a.txt", "v1"), &[1.0, 0.0]).unwrap();
        index.upsert_chunk(&chunk("same", "a.txt", "v2"), &[1.0, 0.0]).unwrap();

        assert_eq!(index.stats().unwrap(), (1, 1));
        assert_eq!(index.search(&[1.0, 0.0], 1).unwrap()[0].chunk.text, "v2");
    }

    #[test]
    fn test_wrong_length_rejected_before_write() {
        let temp = TempDir::new().unwrap();
        let mut index = SqliteIndex::open(&temp.path().join("index.sqlite"), &signature(3)).unwrap();

        let result = index.upsert_chunks(&[
            (chunk("ok", "a.txt", "ok"), vec![1.0, 0.0, 0.0]),
            (chunk("bad", "a.txt", "bad"), vec![1.0]),
        ]);
        assert!(matches!(result, Err(AppError::DimensionMismatch { .. })));
        assert_eq!(index.stats().unwrap(), (0, 0));
    }

    #[test]
    fn test_reset_clears_chunks() {
        let temp = TempDir::new().unwrap();
        let mut index = SqliteIndex::open(&temp.path().join("index.sqlite"), &signature(2)).unwrap();
        index.upsert_chunk(&chunk("a", "a.txt", "x"), &[1.0, 0.0]).unwrap();
        index.record_source("a.txt", 1, 1, Utc::now()).unwrap();

        index.reset().unwrap();
        assert_eq!(index.stats().unwrap(), (0, 0));
        assert_eq!(index.document_count().unwrap(), 0);
        assert!(index.last_learned_at().unwrap().is_none());
    }

    #[test]
    fn test_index_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteIndex>();

        let temp = TempDir::new().unwrap();
        let index: Box<dyn VectorIndex> =
            Box::new(SqliteIndex::open(&temp.path().join("index.sqlite"), &signature(2)).unwrap());
        let stats = std::thread::scope(|scope| scope.spawn(|| index.stats()).join().unwrap());
        assert_eq!(stats.unwrap(), (0, 0));
    }

    #[test]
    fn test_replace_document_drops_stale_chunks() {
        let temp = TempDir::new().unwrap();
        let mut index = SqliteIndex::open(&temp.path().join("index.sqlite"), &signature(2)).unwrap();

        index
            .replace_document(
                "label.pdf",
                &[
                    (chunk("p0", "label.pdf_page_0", "oral tablet"), vec![1.0, 0.0]),
                    (chunk("p1", "label.pdf_page_1", "storage"), vec![0.0, 1.0]),
                ],
            )
            .unwrap();
        index
            .replace_document("other.txt", &[(chunk("o", "other.txt", "other"), vec![0.6, 0.8])])
            .unwrap();

        // The document now has one page with different text
        index
            .replace_document(
                "label.pdf",
                &[(chunk("p0-new", "label.pdf_page_0", "injection"), vec![1.0, 0.0])],
            )
            .unwrap();

        let results = index.search(&[1.0, 0.0], 10).unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts.len(), 2);
        assert!(texts.contains(&"injection"));
        assert!(texts.contains(&"other"));
        assert!(!texts.contains(&"oral tablet"));
        assert!(!texts.contains(&"storage"));
    }

    #[test]
    fn test_replace_document_checks_dimensions_first() {
        let temp = TempDir::new().unwrap();
        let mut index = SqliteIndex::open(&temp.path().join("index.sqlite"), &signature(2)).unwrap();
        index
            .replace_document("a.txt", &[(chunk("a", "a.txt", "kept"), vec![1.0, 0.0])])
            .unwrap();

        let result = index.replace_document("a.txt", &[(chunk("b", "a.txt", "bad"), vec![1.0])]);
        assert!(matches!(result, Err(AppError::DimensionMismatch { .. })));
        assert_eq!(index.search(&[1.0, 0.0], 1).unwrap()[0].chunk.text, "kept");
    }

    #[test]
    fn test_open_existing_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(SqliteIndex::open_existing(&temp.path().join("nope.sqlite")).is_err());
    }

    #[test]
    fn test_embedding_bytes() {
        let bytes = embedding_to_bytes(&[1.5, -2.0]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), vec![1.5, -2.0]);
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());
    }
}
