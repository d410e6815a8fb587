//! Tag entity for embedding-based tag extraction

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Pre-computed embedding of the tag description (or name)
    #[sea_orm(column_type = "Text", nullable)]
    pub embedding: Option<String>,

    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parse the stored embedding to a vector
    pub fn parse_embedding(&self) -> Option<Vec<f32>> {
        self.embedding
            .as_deref()
            .and_then(crate::embeddings::parse_vector_literal)
    }
}
