//! Paper chunk entity
//!
//! Chunks are owned by their paper and are only ever replaced wholesale:
//! delete-all-then-recreate, never patched row by row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "paper_chunks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub paper_id: Uuid,

    /// 0-based position in document order, unique within a paper
    pub chunk_id: i32,

    /// 1-based page the chunk starts on; non-decreasing in `chunk_id`
    pub page: i32,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    /// pgvector embedding stored as text for SeaORM compatibility;
    /// vector operations go through raw SQL
    #[sea_orm(column_type = "Text", nullable)]
    pub embedding: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::PaperId",
        to = "super::paper::Column::Id",
        on_delete = "Cascade"
    )]
    Paper,
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Paper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parse the stored embedding to a vector
    pub fn parse_embedding(&self) -> Option<Vec<f32>> {
        self.embedding
            .as_deref()
            .and_then(crate::embeddings::parse_vector_literal)
    }
}
