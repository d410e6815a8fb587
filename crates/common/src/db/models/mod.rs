//! SeaORM entity models
//!
//! Database entities for the paperdex corpus

mod matched_citation;
mod paper;
mod paper_chunk;
mod tag;

pub use paper::{
    Entity as PaperEntity,
    Model as Paper,
    ActiveModel as PaperActiveModel,
    Column as PaperColumn,
};

pub use paper_chunk::{
    Entity as PaperChunkEntity,
    Model as PaperChunk,
    ActiveModel as PaperChunkActiveModel,
    Column as PaperChunkColumn,
};

pub use matched_citation::{
    Entity as MatchedCitationEntity,
    Model as MatchedCitation,
    ActiveModel as MatchedCitationActiveModel,
    Column as MatchedCitationColumn,
};

pub use tag::{
    Entity as TagEntity,
    Model as Tag,
    ActiveModel as TagActiveModel,
    Column as TagColumn,
};
