//! Matched citation entity
//!
//! One row per (source, matched) paper pair. Re-matching may only raise
//! the stored score; the unique constraint makes concurrent matchers
//! converge on the maximum of all writes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "matched_citations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Paper whose bibliography contained the citation
    pub source_paper_id: Uuid,

    /// Corpus paper the citation resolved to; NULL once that paper is
    /// deleted
    pub matched_paper_id: Option<Uuid>,

    /// Original citation text as extracted from the document
    #[sea_orm(column_type = "Text")]
    pub raw_citation: String,

    /// Match confidence in [0, 1]
    pub score: f64,

    pub matched_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::SourcePaperId",
        to = "super::paper::Column::Id",
        on_delete = "Cascade"
    )]
    SourcePaper,

    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::MatchedPaperId",
        to = "super::paper::Column::Id",
        on_delete = "SetNull"
    )]
    MatchedPaper,
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SourcePaper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
