//! Indexing pipeline
//!
//! Owns the Index Store write path: a paper's chunk set is computed,
//! embedded in one batched provider call, and only then persisted —
//! wholesale, inside one transaction — before the paper's `is_indexed`
//! flag flips. A crash mid-run therefore leaves either the previous
//! chunk set or the new one, and a paper is never marked indexed without
//! a committed chunk set behind it. Callers recover from a crash between
//! commit and flag flip by re-running the same delete-then-rebuild.

use crate::chunker::{chunk_pages, ChunkingConfig};
use crate::errors::IngestionError;
use crate::extract::{DocumentSource, PageExtractor};
use paperdex_common::config::SearchSettings;
use paperdex_common::db::models::Paper;
use paperdex_common::db::{NewChunk, Repository};
use paperdex_common::embeddings::{Embedder, TaskType};
use paperdex_common::metrics;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Indexing pipeline wiring the chunker, embedder, and repository
pub struct IndexingPipeline {
    repository: Repository,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn PageExtractor>,
}

impl IndexingPipeline {
    pub fn new(
        repository: Repository,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn PageExtractor>,
    ) -> Self {
        Self {
            repository,
            embedder,
            extractor,
        }
    }

    /// Embed a paper's title and abstract into its embedding columns.
    ///
    /// The title embedding is what the citation matcher searches against,
    /// so this runs before a paper can be cited.
    #[instrument(skip(self, paper), fields(paper_id = %paper.id))]
    pub async fn embed_metadata(&self, paper: &Paper) -> Result<(), IngestionError> {
        let mut texts = Vec::with_capacity(2);
        let mut has_title = false;
        let mut has_abstract = false;

        if !paper.title.trim().is_empty() {
            texts.push(paper.title.clone());
            has_title = true;
        }
        if !paper.abstract_text.trim().is_empty() {
            texts.push(paper.abstract_text.clone());
            has_abstract = true;
        }

        if texts.is_empty() {
            warn!("Paper has neither title nor abstract, nothing to embed");
            return Ok(());
        }

        let mut embeddings = self
            .embedder
            .embed(&texts, TaskType::Document)
            .await?
            .into_iter();

        let title_embedding = if has_title { embeddings.next() } else { None };
        let abstract_embedding = if has_abstract { embeddings.next() } else { None };

        self.repository
            .set_paper_embeddings(
                paper.id,
                title_embedding.as_deref(),
                abstract_embedding.as_deref(),
            )
            .await?;

        info!(has_title, has_abstract, "Stored metadata embeddings");
        Ok(())
    }

    /// Index one paper: extract, chunk, embed, persist, flip the flag.
    ///
    /// Unsupported or missing files are skipped with a warning and leave
    /// `is_indexed = false`; they never abort a caller's batch loop.
    /// Embedding failure aborts the run with prior persisted state
    /// untouched.
    #[instrument(skip(self, paper, settings), fields(paper_id = %paper.id))]
    pub async fn index_paper(
        &self,
        paper: &Paper,
        settings: &SearchSettings,
    ) -> Result<usize, IngestionError> {
        let started = Instant::now();

        let Some(file_path) = paper.file_path.as_deref() else {
            warn!("Paper has no file, skipping indexing");
            return Ok(0);
        };

        let path = Path::new(file_path);
        let Some(source) = DocumentSource::from_path(path) else {
            warn!(file = file_path, "Unsupported file type, skipping indexing");
            return Ok(0);
        };

        let pages = match self.extractor.extract_pages(source, path).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!(file = file_path, error = %e, "Extraction failed, skipping indexing");
                return Ok(0);
            }
        };

        let config = ChunkingConfig::from(settings);
        let chunks = chunk_pages(&pages, &config);
        if chunks.is_empty() {
            warn!(file = file_path, "Document produced no chunks, skipping indexing");
            return Ok(0);
        }

        info!(chunk_count = chunks.len(), "Embedding document chunks");

        // One batched call for the whole document; a provider failure here
        // aborts before anything is written
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts, TaskType::Document).await?;

        let new_chunks: Vec<NewChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| NewChunk {
                chunk_id: chunk.chunk_id,
                page: chunk.page,
                text: chunk.text,
                embedding,
            })
            .collect();

        let persisted = self
            .repository
            .replace_chunks(paper.id, &new_chunks, self.embedder.dimension())
            .await?;

        self.repository.mark_indexed(paper.id, true).await?;

        metrics::record_indexing(persisted, started.elapsed());
        info!(chunk_count = persisted, "Paper indexed");

        Ok(persisted)
    }

    /// Remove a paper's chunks and clear its indexed flag.
    ///
    /// Used by callers that detect a half-finished run (chunks committed
    /// but flag not flipped, or the inverse) before re-indexing.
    #[instrument(skip(self), fields(paper_id = %paper_id))]
    pub async fn deindex_paper(&self, paper_id: uuid::Uuid) -> Result<(), IngestionError> {
        self.repository
            .replace_chunks(paper_id, &[], self.embedder.dimension())
            .await?;
        self.repository.mark_indexed(paper_id, false).await?;
        Ok(())
    }
}
