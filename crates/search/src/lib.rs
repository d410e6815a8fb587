//! paperdex search
//!
//! Retrieval over the indexed corpus:
//! - Hybrid search fusing full-text rank with vector similarity
//! - Literal keyword search as an independent fallback path
//! - Citation extraction and matching by title-embedding similarity
//! - Embedding-based tag extraction

pub mod citation;
pub mod retrieval;
pub mod tags;

pub use citation::{CitationMatcher, CitationOutcome};
pub use retrieval::{HybridSearchEngine, SearchMode, SearchOptions, SearchResult};
pub use tags::{TagExtractor, TagScore};
