//! Embedding and persisting a run's records

use crate::embedding::EmbeddingModel;
use crate::{SqliteStore, StoreError};
use finrag_domain::ChunkRecord;
use tracing::info;

/// What [`index_records`] changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Records embedded and stored
    pub records_added: usize,
    /// Sources whose earlier chunks were replaced
    pub sources_replaced: usize,
    /// Earlier chunks removed
    pub chunks_removed: usize,
}

/// Embed `records` in batches and store them
///
/// Re-ingesting a source replaces the chunks stored for it earlier, so
/// running ingestion twice over the same directory leaves one copy. Every
/// record is embedded before the store is touched; if embedding fails the
/// collection is unchanged.
pub fn index_records<E: EmbeddingModel + ?Sized>(
    store: &mut SqliteStore,
    model: &E,
    records: &[ChunkRecord],
    batch_size: usize,
) -> Result<IndexStats, StoreError> {
    let mut embeddings = Vec::with_capacity(records.len());
    for batch in records.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|r| r.content.clone()).collect();
        embeddings.extend(model.embed_batch(&texts)?);
        info!("Embedded {}/{} chunk(s)", embeddings.len(), records.len());
    }

    let outcome = store.replace_sources(records, &embeddings)?;
    info!(
        "Stored {} chunk(s) in '{}' ({} source(s) replaced)",
        outcome.ids.len(),
        store.collection(),
        outcome.sources_replaced
    );

    Ok(IndexStats {
        records_added: outcome.ids.len(),
        sources_replaced: outcome.sources_replaced,
        chunks_removed: outcome.chunks_removed,
    })
}
