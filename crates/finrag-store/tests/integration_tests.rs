//! Integration tests for the chunk store
//!
//! These tests use on-disk SQLite files so that persistence across
//! reopening is exercised.

use finrag_domain::traits::ContextRetriever;
use finrag_domain::{ChunkMetadata, ChunkRecord};
use finrag_store::{
    index_records, serialize_context, EmbeddingError, EmbeddingModel, MockEmbeddingModel, Retriever, SqliteStore, StoreError,
    DEFAULT_COLLECTION, DEFAULT_K,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const DIM: usize = 256;

fn record(source: &str, index: usize, total: usize, content: &str) -> ChunkRecord {
    let name = source.rsplit('/').next().unwrap_or(source);
    ChunkRecord {
        content: content.to_string(),
        metadata: ChunkMetadata {
            source: source.to_string(),
            source_name: name.to_string(),
            document_chunk_index: index,
            total_chunks_in_document: total,
            file_format: format!(".{}", name.rsplit('.').next().unwrap_or("")),
            chunk_index: None,
        },
    }
}

fn corpus() -> Vec<ChunkRecord> {
    vec![
        record("/raw/report.pdf", 0, 3, "Annual Report\nNet revenue grew twelve percent to 4.2 billion"),
        record("/raw/report.pdf", 1, 3, "Annual Report\nOperating expenses were flat year over year"),
        record("/raw/report.pdf", 2, 3, "Annual Report\nThe board approved a dividend of 0.40 per share"),
        record("/raw/call.mp3", 0, 2, "[0.0s - 6.5s] Welcome to the earnings call"),
        record("/raw/call.mp3", 1, 2, "[6.5s - 14.0s] Guidance for next quarter assumes stable margins"),
    ]
}

/// Embeds the first `ok_calls` texts, then reports the service as down
struct FlakyModel {
    inner: MockEmbeddingModel,
    ok_calls: usize,
    calls: AtomicUsize,
}

impl FlakyModel {
    fn new(ok_calls: usize) -> Self {
        Self {
            inner: MockEmbeddingModel::new(DIM),
            ok_calls,
            calls: AtomicUsize::new(0),
        }
    }
}

impl EmbeddingModel for FlakyModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.ok_calls {
            return Err(EmbeddingError::Request("connection refused".to_string()));
        }
        self.inner.embed(text)
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "flaky"
    }
}

fn open(dir: &TempDir) -> SqliteStore {
    SqliteStore::open(dir.path().join("finrag.db"), DEFAULT_COLLECTION, DIM).unwrap()
}

#[test]
fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let model = MockEmbeddingModel::new(DIM);

    {
        let mut store = open(&dir);
        let stats = index_records(&mut store, &model, &corpus(), 2).unwrap();
        assert_eq!(stats.records_added, 5);
        assert_eq!(stats.sources_replaced, 0);
    }

    let store = open(&dir);
    assert_eq!(store.count().unwrap(), 5);
    assert_eq!(
        store.sources().unwrap(),
        vec![("/raw/call.mp3".to_string(), 2), ("/raw/report.pdf".to_string(), 3)]
    );

    // index was rebuilt from disk
    let query = model.embed("dividend per share").unwrap();
    let hits = store.similarity_search(&query, 1).unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].content.contains("dividend"));
}

#[test]
fn test_reingest_replaces_source() {
    let dir = TempDir::new().unwrap();
    let model = MockEmbeddingModel::new(DIM);
    let mut store = open(&dir);

    index_records(&mut store, &model, &corpus(), 16).unwrap();

    let updated = vec![record("/raw/report.pdf", 0, 1, "Annual Report\nRestated revenue figures")];
    let stats = index_records(&mut store, &model, &updated, 16).unwrap();

    assert_eq!(stats.sources_replaced, 1);
    assert_eq!(stats.chunks_removed, 3);
    assert_eq!(store.count().unwrap(), 3);

    let query = model.embed("dividend per share").unwrap();
    let hits = store.similarity_search(&query, 5).unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|h| !h.content.contains("dividend")));
}

#[test]
fn test_failed_embedding_keeps_existing_chunks() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    index_records(&mut store, &MockEmbeddingModel::new(DIM), &corpus(), 16).unwrap();

    // first batch embeds, second fails
    let rerun = corpus();
    let result = index_records(&mut store, &FlakyModel::new(2), &rerun, 2);

    assert!(matches!(result, Err(StoreError::Embedding(EmbeddingError::Request(_)))));
    assert_eq!(store.count().unwrap(), 5);
    assert_eq!(
        store.sources().unwrap(),
        vec![("/raw/call.mp3".to_string(), 2), ("/raw/report.pdf".to_string(), 3)]
    );

    let query = MockEmbeddingModel::new(DIM).embed("dividend per share").unwrap();
    assert_eq!(store.similarity_search(&query, 10).unwrap().len(), 5);
}

#[test]
fn test_replacing_several_sources_at_once() {
    let dir = TempDir::new().unwrap();
    let model = MockEmbeddingModel::new(DIM);
    let mut store = open(&dir);
    index_records(&mut store, &model, &corpus(), 16).unwrap();

    let stats = index_records(&mut store, &model, &corpus(), 16).unwrap();
    assert_eq!(stats.records_added, 5);
    assert_eq!(stats.sources_replaced, 2);
    assert_eq!(stats.chunks_removed, 5);
    assert_eq!(store.count().unwrap(), 5);

    let query = model.embed("Welcome to the earnings call").unwrap();
    let hits = store.similarity_search(&query, 10).unwrap();
    assert_eq!(hits.len(), 5);
    assert_eq!(hits[0].metadata.source_name, "call.mp3");
}

#[test]
fn test_collections_are_isolated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("finrag.db");
    let model = MockEmbeddingModel::new(DIM);

    let mut reports = SqliteStore::open(&path, "reports", DIM).unwrap();
    index_records(&mut reports, &model, &corpus()[..3], 16).unwrap();

    let mut calls = SqliteStore::open(&path, "calls", DIM).unwrap();
    index_records(&mut calls, &model, &corpus()[3..], 16).unwrap();

    assert_eq!(reports.count().unwrap(), 3);
    assert_eq!(calls.count().unwrap(), 2);

    assert_eq!(calls.clear().unwrap(), 2);
    assert_eq!(calls.count().unwrap(), 0);
    assert_eq!(reports.count().unwrap(), 3);
}

#[test]
fn test_dimension_is_fixed_per_collection() {
    let dir = TempDir::new().unwrap();
    drop(open(&dir));

    let reopened = SqliteStore::open(dir.path().join("finrag.db"), DEFAULT_COLLECTION, DIM * 2);
    assert!(matches!(reopened, Err(StoreError::InvalidData(_))));
}

#[test]
fn test_mismatched_embeddings_rejected() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let records = corpus();

    assert!(store.add_records(&records[..2], &[vec![0.0; DIM]]).is_err());
    assert!(matches!(
        store.add_records(&records[..1], &[vec![0.0; 3]]),
        Err(StoreError::Index(_))
    ));
    assert_eq!(store.count().unwrap(), 0);

    assert!(store.replace_sources(&records[..2], &[vec![0.0; DIM]]).is_err());
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn test_retriever_returns_top_k_with_metadata() {
    let dir = TempDir::new().unwrap();
    let model = MockEmbeddingModel::new(DIM);
    let mut store = open(&dir);
    index_records(&mut store, &model, &corpus(), 16).unwrap();

    let retriever = Retriever::new(store, model).unwrap();
    let hits = retriever.retrieve("What guidance was given for next quarter margins?", DEFAULT_K).unwrap();

    assert_eq!(hits.len(), DEFAULT_K);
    assert_eq!(hits[0].metadata.source_name, "call.mp3");
    assert_eq!(hits[0].metadata.document_chunk_index, 1);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));

    let context = serialize_context(&hits);
    assert!(context.starts_with("Source: {"));
    assert_eq!(context.matches("\nContent: ").count(), DEFAULT_K);
}

#[test]
fn test_empty_store_retrieves_nothing() {
    let dir = TempDir::new().unwrap();
    let retriever = Retriever::new(open(&dir), MockEmbeddingModel::new(DIM)).unwrap();

    assert!(retriever.retrieve("revenue", DEFAULT_K).unwrap().is_empty());
}
