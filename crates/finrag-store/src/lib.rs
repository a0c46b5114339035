//! finrag Storage Layer
//!
//! Persists chunk records and their embeddings, and answers nearest-neighbour
//! queries over them.
//!
//! # Architecture
//!
//! - SQLite for chunk text, metadata (JSON) and embeddings (BLOB), grouped
//!   into named collections
//! - In-memory HNSW index for cosine similarity search, rebuilt from SQLite
//!   on open
//! - Pluggable [`EmbeddingModel`](embedding::EmbeddingModel) used by the
//!   indexing and retrieval helpers
//!
//! # Examples
//!
//! ```no_run
//! use finrag_store::SqliteStore;
//!
//! let store = SqliteStore::open("finrag.db", "my_documents", 1536).unwrap();
//! println!("{} chunks stored", store.count().unwrap());
//! ```

#![warn(missing_docs)]

pub mod embedding;
pub mod openai;
pub mod vector_index;
mod indexing;
mod retrieval;

pub use embedding::{cosine_similarity, EmbeddingError, EmbeddingModel, MockEmbeddingModel};
pub use indexing::{index_records, IndexStats};
pub use openai::OpenAiEmbeddingModel;
pub use retrieval::{serialize_context, Retriever, DEFAULT_K};
pub use vector_index::{VectorIndex, VectorIndexError};

use finrag_domain::{ChunkMetadata, ChunkRecord, RetrievedChunk};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Default collection name
pub const DEFAULT_COLLECTION: &str = "my_documents";

/// Minimum candidate list size for HNSW queries
const MIN_EF_SEARCH: usize = 64;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Metadata could not be (de)serialized
    #[error("Metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Vector index error
    #[error("Vector index error: {0}")]
    Index(#[from] VectorIndexError),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// What [`SqliteStore::replace_sources`] changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Row ids of the inserted chunks
    pub ids: Vec<i64>,
    /// Sources that already had chunks
    pub sources_replaced: usize,
    /// Chunks deleted
    pub chunks_removed: usize,
}

/// SQLite-backed chunk store with an HNSW similarity index
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. The store can be moved between
/// threads but not shared; open one store per thread.
pub struct SqliteStore {
    conn: Connection,
    collection: String,
    collection_id: i64,
    dimension: usize,
    index: VectorIndex,
}

impl SqliteStore {
    /// Open (or create) a store and its collection
    ///
    /// Use `:memory:` for an in-memory database (useful for testing). An
    /// existing collection must have been created with the same dimension.
    pub fn open<P: AsRef<Path>>(path: P, collection: &str, dimension: usize) -> Result<Self, StoreError> {
        if dimension == 0 {
            return Err(StoreError::InvalidData("dimension must be greater than 0".to_string()));
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;

        conn.execute(
            "INSERT OR IGNORE INTO collections (name, dimension) VALUES (?1, ?2)",
            params![collection, dimension as i64],
        )?;
        let (collection_id, stored_dimension): (i64, i64) = conn.query_row(
            "SELECT id, dimension FROM collections WHERE name = ?1",
            params![collection],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        if stored_dimension != dimension as i64 {
            return Err(StoreError::InvalidData(format!(
                "collection '{}' stores {}-dimensional embeddings, not {}",
                collection, stored_dimension, dimension
            )));
        }

        let mut store = Self {
            conn,
            collection: collection.to_string(),
            collection_id,
            dimension,
            index: VectorIndex::new(dimension),
        };
        store.rebuild_index()?;
        info!(
            "Opened collection '{}' ({} chunks, dimension {})",
            store.collection,
            store.index.len(),
            dimension
        );
        Ok(store)
    }

    /// Collection name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embedding dimension of the collection
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Store records with their embeddings; returns the new row ids
    pub fn add_records(&mut self, records: &[ChunkRecord], embeddings: &[Vec<f32>]) -> Result<Vec<i64>, StoreError> {
        self.check_embeddings(records, embeddings)?;

        let tx = self.conn.transaction()?;
        let ids = insert_rows(&tx, self.collection_id, records, embeddings)?;
        tx.commit()?;

        for (id, embedding) in ids.iter().zip(embeddings) {
            self.index.add(*id, embedding)?;
        }
        debug!(collection = %self.collection, added = ids.len(), "stored chunks");
        Ok(ids)
    }

    /// Replace every source present in `records` with the given records
    ///
    /// Deletes and inserts commit in one transaction; on error the
    /// collection is left as it was.
    pub fn replace_sources(
        &mut self,
        records: &[ChunkRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<ReplaceOutcome, StoreError> {
        self.check_embeddings(records, embeddings)?;
        let sources: BTreeSet<&str> = records.iter().map(|r| r.metadata.source.as_str()).collect();

        let mut outcome = ReplaceOutcome::default();
        let tx = self.conn.transaction()?;
        {
            let mut delete = tx.prepare("DELETE FROM chunks WHERE collection_id = ?1 AND source = ?2")?;
            for source in &sources {
                let removed = delete.execute(params![self.collection_id, source])?;
                if removed > 0 {
                    outcome.sources_replaced += 1;
                    outcome.chunks_removed += removed;
                }
            }
        }
        outcome.ids = insert_rows(&tx, self.collection_id, records, embeddings)?;
        tx.commit()?;

        if outcome.chunks_removed > 0 {
            self.rebuild_index()?;
        } else {
            for (id, embedding) in outcome.ids.iter().zip(embeddings) {
                self.index.add(*id, embedding)?;
            }
        }
        debug!(
            collection = %self.collection,
            added = outcome.ids.len(),
            removed = outcome.chunks_removed,
            "replaced sources"
        );
        Ok(outcome)
    }

    /// Delete every chunk that came from `source`; returns how many were removed
    pub fn delete_source(&mut self, source: &str) -> Result<usize, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM chunks WHERE collection_id = ?1 AND source = ?2",
            params![self.collection_id, source],
        )?;
        if removed > 0 {
            self.rebuild_index()?;
        }
        Ok(removed)
    }

    /// Number of chunks in the collection
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE collection_id = ?1",
            params![self.collection_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Distinct sources with their chunk counts, sorted by source
    pub fn sources(&self) -> Result<Vec<(String, usize)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT source, COUNT(*) FROM chunks WHERE collection_id = ?1
             GROUP BY source ORDER BY source",
        )?;
        let rows = stmt
            .query_map(params![self.collection_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Remove every chunk in the collection; returns how many were removed
    pub fn clear(&mut self) -> Result<usize, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM chunks WHERE collection_id = ?1",
            params![self.collection_id],
        )?;
        self.index.clear();
        Ok(removed)
    }

    /// The `k` chunks most similar to `query_embedding`, best first
    pub fn similarity_search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<RetrievedChunk>, StoreError> {
        let hits = self.index.search(query_embedding, k, MIN_EF_SEARCH.max(k))?;

        let mut stmt = self
            .conn
            .prepare("SELECT content, metadata FROM chunks WHERE id = ?1 AND collection_id = ?2")?;
        let mut results = Vec::with_capacity(hits.len());
        for (id, score) in hits {
            let row = stmt
                .query_row(params![id, self.collection_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .optional()?;
            if let Some((content, metadata)) = row {
                let metadata: ChunkMetadata = serde_json::from_str(&metadata)?;
                results.push(RetrievedChunk {
                    content,
                    metadata,
                    score,
                });
            }
        }
        Ok(results)
    }

    fn check_embeddings(&self, records: &[ChunkRecord], embeddings: &[Vec<f32>]) -> Result<(), StoreError> {
        if records.len() != embeddings.len() {
            return Err(StoreError::InvalidData(format!(
                "{} records but {} embeddings",
                records.len(),
                embeddings.len()
            )));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimension) {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            }
            .into());
        }
        Ok(())
    }

    fn rebuild_index(&mut self) -> Result<(), StoreError> {
        self.index.clear();
        let mut stmt = self
            .conn
            .prepare("SELECT id, embedding FROM chunks WHERE collection_id = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map(params![self.collection_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (id, blob) in rows {
            let embedding = decode_embedding(&blob)?;
            self.index.add(id, &embedding)?;
        }
        Ok(())
    }
}

fn insert_rows(
    tx: &Transaction<'_>,
    collection_id: i64,
    records: &[ChunkRecord],
    embeddings: &[Vec<f32>],
) -> Result<Vec<i64>, StoreError> {
    let mut stmt = tx.prepare(
        "INSERT INTO chunks (collection_id, source, content, metadata, embedding)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let mut ids = Vec::with_capacity(records.len());
    for (record, embedding) in records.iter().zip(embeddings) {
        stmt.execute(params![
            collection_id,
            &record.metadata.source,
            &record.content,
            serde_json::to_string(&record.metadata)?,
            encode_embedding(embedding),
        ])?;
        ids.push(tx.last_insert_rowid());
    }
    Ok(ids)
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, StoreError> {
    if bytes.len() % 4 != 0 {
        return Err(StoreError::InvalidData(format!(
            "embedding blob of {} bytes is not a whole number of f32 values",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
