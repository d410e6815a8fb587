//! Paper entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Ordered list of author names, stored as JSONB
    #[sea_orm(column_type = "JsonBinary")]
    pub authors: Json,

    #[sea_orm(column_type = "Text")]
    pub abstract_text: String,

    pub year: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub file_path: Option<String>,

    /// pgvector embedding of the title, stored as text for SeaORM
    /// compatibility; vector operations go through raw SQL
    #[sea_orm(column_type = "Text", nullable)]
    pub title_embedding: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub abstract_embedding: Option<String>,

    /// Set only after the paper's chunk set has been fully persisted
    pub is_indexed: bool,

    /// How many times this paper is cited by others in the corpus
    pub citation_count_cached: i32,

    /// How many of this paper's own references matched a corpus paper
    pub matched_count_cached: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::paper_chunk::Entity")]
    Chunks,

    #[sea_orm(has_many = "super::matched_citation::Entity")]
    CitationsFrom,
}

impl Related<super::paper_chunk::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chunks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Author names in document order
    pub fn author_list(&self) -> Vec<String> {
        serde_json::from_value(self.authors.clone()).unwrap_or_default()
    }

    /// Parse the stored title embedding to a vector
    pub fn parse_title_embedding(&self) -> Option<Vec<f32>> {
        self.title_embedding
            .as_deref()
            .and_then(crate::embeddings::parse_vector_literal)
    }

    /// Parse the stored abstract embedding to a vector
    pub fn parse_abstract_embedding(&self) -> Option<Vec<f32>> {
        self.abstract_embedding
            .as_deref()
            .and_then(crate::embeddings::parse_vector_literal)
    }
}
