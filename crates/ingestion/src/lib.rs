//! paperdex ingestion
//!
//! Turns an extracted document into a persisted, embedded chunk set:
//! 1. Resolve the document source (PDF or merged HTML)
//! 2. Chunk the extracted pages into page-attributed text units
//! 3. Embed all chunks in one batched provider call
//! 4. Replace the paper's chunk set wholesale and flip its indexed flag

pub mod chunker;
pub mod errors;
pub mod extract;
pub mod indexer;

pub use chunker::{chunk_pages, ChunkingConfig, TextChunk};
pub use errors::IngestionError;
pub use extract::{DocumentPage, DocumentSource, PageExtractor};
pub use indexer::IndexingPipeline;
