//! Repository for database operations
//!
//! All pgvector work goes through raw `Statement`s with the embedding
//! bound as a `[f32,...]` literal and cast to `::vector`; everything else
//! uses the SeaORM entities.

use crate::db::models::*;
use crate::db::DbPool;
use crate::embeddings::to_vector_literal;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Chunk hit from corpus-wide vector search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkHit {
    pub paper_id: Uuid,
    pub title: String,
    pub authors: Vec<String>,
    pub page: i32,
    pub chunk_id: i32,
    pub text: String,
    pub score: f64,
}

/// Candidate row from lexical retrieval, carrying both ranking signals
#[derive(Debug, Clone)]
pub struct LexicalCandidate {
    pub paper_id: Uuid,
    pub title: String,
    pub authors: Vec<String>,
    pub page: i32,
    pub chunk_id: i32,
    pub text: String,
    pub lexical_rank: f64,
    pub vector_similarity: f64,
}

/// Chunk row for the keyword scan
#[derive(Debug, Clone)]
pub struct ScannedChunk {
    pub paper_id: Uuid,
    pub title: String,
    pub authors: Vec<String>,
    pub page: i32,
    pub chunk_id: i32,
    pub text: String,
}

/// In-paper nearest-neighbor hit
#[derive(Debug, Clone)]
pub struct NearChunk {
    pub id: Uuid,
    pub chunk_id: i32,
    pub page: i32,
    pub text: String,
    pub distance: f64,
}

/// Candidate paper from title-embedding similarity
#[derive(Debug, Clone)]
pub struct TitleCandidate {
    pub paper_id: Uuid,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub title_similarity: f64,
}

/// New chunk to persist, produced by the chunker + embedder
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub chunk_id: i32,
    pub page: i32,
    pub text: String,
    pub embedding: Vec<f32>,
}

fn decode_authors(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Paper Operations
    // ========================================================================

    /// Create a new paper record
    pub async fn create_paper(
        &self,
        title: String,
        authors: Vec<String>,
        abstract_text: String,
        year: Option<i32>,
        file_path: Option<String>,
    ) -> Result<Paper> {
        let now = chrono::Utc::now();

        let paper = PaperActiveModel {
            // v7 ids sort by insertion time, which the search tie-break
            // relies on
            id: Set(Uuid::now_v7()),
            title: Set(title),
            authors: Set(serde_json::json!(authors)),
            abstract_text: Set(abstract_text),
            year: Set(year),
            file_path: Set(file_path),
            title_embedding: Set(None),
            abstract_embedding: Set(None),
            is_indexed: Set(false),
            citation_count_cached: Set(0),
            matched_count_cached: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        paper.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find paper by ID
    pub async fn find_paper_by_id(&self, id: Uuid) -> Result<Option<Paper>> {
        PaperEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Delete paper by ID; chunks cascade, citations to it null out
    pub async fn delete_paper(&self, id: Uuid) -> Result<bool> {
        let result = PaperEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Store title/abstract embeddings for a paper
    pub async fn set_paper_embeddings(
        &self,
        paper_id: Uuid,
        title_embedding: Option<&[f32]>,
        abstract_embedding: Option<&[f32]>,
    ) -> Result<()> {
        if let Some(embedding) = title_embedding {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                "UPDATE papers SET title_embedding = $2::vector, updated_at = NOW() WHERE id = $1",
                vec![paper_id.into(), to_vector_literal(embedding).into()],
            );
            self.write_conn().execute(stmt).await?;
        }

        if let Some(embedding) = abstract_embedding {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                "UPDATE papers SET abstract_embedding = $2::vector, updated_at = NOW() WHERE id = $1",
                vec![paper_id.into(), to_vector_literal(embedding).into()],
            );
            self.write_conn().execute(stmt).await?;
        }

        Ok(())
    }

    /// Flip the indexed flag; called only after a chunk replacement commits
    pub async fn mark_indexed(&self, paper_id: Uuid, indexed: bool) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE papers SET is_indexed = $2, updated_at = NOW() WHERE id = $1",
            vec![paper_id.into(), indexed.into()],
        );
        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    // ========================================================================
    // Chunk Operations
    // ========================================================================

    /// Replace a paper's chunk set wholesale.
    ///
    /// Deletes all existing chunks and inserts the new set inside one
    /// transaction, so a failure leaves either the old set or the new one,
    /// never a mix. Embedding dimensions are validated before any write.
    pub async fn replace_chunks(
        &self,
        paper_id: Uuid,
        chunks: &[NewChunk],
        expected_dimension: usize,
    ) -> Result<usize> {
        for chunk in chunks {
            if chunk.embedding.len() != expected_dimension {
                return Err(AppError::DimensionMismatch {
                    expected: expected_dimension,
                    actual: chunk.embedding.len(),
                });
            }
        }

        let txn = self.write_conn().begin().await?;

        txn.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "DELETE FROM paper_chunks WHERE paper_id = $1",
            vec![paper_id.into()],
        ))
        .await?;

        for chunk in chunks {
            txn.execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                INSERT INTO paper_chunks (id, paper_id, chunk_id, page, text, embedding, created_at)
                VALUES ($1, $2, $3, $4, $5, $6::vector, NOW())
                "#,
                vec![
                    Uuid::new_v4().into(),
                    paper_id.into(),
                    chunk.chunk_id.into(),
                    chunk.page.into(),
                    chunk.text.clone().into(),
                    to_vector_literal(&chunk.embedding).into(),
                ],
            ))
            .await?;
        }

        txn.commit().await?;

        Ok(chunks.len())
    }

    /// Get all chunks for a paper in document order
    pub async fn chunks_by_paper(&self, paper_id: Uuid) -> Result<Vec<PaperChunk>> {
        PaperChunkEntity::find()
            .filter(PaperChunkColumn::PaperId.eq(paper_id))
            .order_by_asc(PaperChunkColumn::ChunkId)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Chunks on pages within `[page_lo, page_hi]` of one paper, ordered
    /// by (page, chunk_id)
    pub async fn chunks_in_page_window(
        &self,
        paper_id: Uuid,
        page_lo: i32,
        page_hi: i32,
    ) -> Result<Vec<PaperChunk>> {
        PaperChunkEntity::find()
            .filter(PaperChunkColumn::PaperId.eq(paper_id))
            .filter(PaperChunkColumn::Page.gte(page_lo))
            .filter(PaperChunkColumn::Page.lte(page_hi))
            .order_by_asc(PaperChunkColumn::Page)
            .order_by_asc(PaperChunkColumn::ChunkId)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Scan chunks in (paper_id, chunk_id) order for keyword search.
    ///
    /// The fixed order makes the `max_chunks_scan` cutoff and the
    /// first-snippet-per-paper rule reproducible.
    pub async fn scan_chunks(&self, limit: usize) -> Result<Vec<ScannedChunk>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT c.paper_id, p.title, p.authors, c.page, c.chunk_id, c.text
            FROM paper_chunks c
            JOIN papers p ON c.paper_id = p.id
            ORDER BY c.paper_id, c.chunk_id
            LIMIT $1
            "#,
            vec![(limit as i64).into()],
        );

        let rows = self.read_conn().query_all(stmt).await?;

        let chunks = rows
            .into_iter()
            .filter_map(|row| {
                Some(ScannedChunk {
                    paper_id: row.try_get_by_index::<Uuid>(0).ok()?,
                    title: row.try_get_by_index::<String>(1).ok()?,
                    authors: decode_authors(row.try_get_by_index::<serde_json::Value>(2).ok()?),
                    page: row.try_get_by_index::<i32>(3).ok()?,
                    chunk_id: row.try_get_by_index::<i32>(4).ok()?,
                    text: row.try_get_by_index::<String>(5).ok()?,
                })
            })
            .collect();

        Ok(chunks)
    }

    // ========================================================================
    // Search Queries
    // ========================================================================

    /// Lexical candidate retrieval for hybrid search.
    ///
    /// Ranks chunks by full-text relevance and computes the cosine
    /// similarity to the query embedding for every candidate in the same
    /// statement, so fusion needs no second round trip.
    pub async fn lexical_candidates(
        &self,
        query: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<LexicalCandidate>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                c.paper_id,
                p.title,
                p.authors,
                c.page,
                c.chunk_id,
                c.text,
                ts_rank_cd(to_tsvector('english', c.text), plainto_tsquery('english', $1))::float8 AS lexical_rank,
                CASE
                    WHEN c.embedding IS NULL THEN 0.0::float8
                    ELSE 1 - (c.embedding <=> $2::vector)
                END AS vector_similarity
            FROM paper_chunks c
            JOIN papers p ON c.paper_id = p.id
            WHERE to_tsvector('english', c.text) @@ plainto_tsquery('english', $1)
            ORDER BY lexical_rank DESC
            LIMIT $3
            "#,
            vec![
                query.into(),
                to_vector_literal(query_embedding).into(),
                (limit as i64).into(),
            ],
        );

        let rows = self.read_conn().query_all(stmt).await?;

        let candidates = rows
            .into_iter()
            .filter_map(|row| {
                Some(LexicalCandidate {
                    paper_id: row.try_get_by_index::<Uuid>(0).ok()?,
                    title: row.try_get_by_index::<String>(1).ok()?,
                    authors: decode_authors(row.try_get_by_index::<serde_json::Value>(2).ok()?),
                    page: row.try_get_by_index::<i32>(3).ok()?,
                    chunk_id: row.try_get_by_index::<i32>(4).ok()?,
                    text: row.try_get_by_index::<String>(5).ok()?,
                    lexical_rank: row.try_get_by_index::<f64>(6).ok()?,
                    vector_similarity: row.try_get_by_index::<f64>(7).ok()?,
                })
            })
            .collect();

        Ok(candidates)
    }

    /// Corpus-wide vector search, filtered by minimum cosine similarity
    pub async fn vector_search(
        &self,
        embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<ChunkHit>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                c.paper_id,
                p.title,
                p.authors,
                c.page,
                c.chunk_id,
                c.text,
                1 - (c.embedding <=> $1::vector) AS score
            FROM paper_chunks c
            JOIN papers p ON c.paper_id = p.id
            WHERE c.embedding IS NOT NULL
              AND 1 - (c.embedding <=> $1::vector) >= $2
            ORDER BY c.embedding <=> $1::vector
            LIMIT $3
            "#,
            vec![
                to_vector_literal(embedding).into(),
                (min_score as f64).into(),
                (limit as i64).into(),
            ],
        );

        let rows = self.read_conn().query_all(stmt).await?;

        let hits = rows
            .into_iter()
            .filter_map(|row| {
                Some(ChunkHit {
                    paper_id: row.try_get_by_index::<Uuid>(0).ok()?,
                    title: row.try_get_by_index::<String>(1).ok()?,
                    authors: decode_authors(row.try_get_by_index::<serde_json::Value>(2).ok()?),
                    page: row.try_get_by_index::<i32>(3).ok()?,
                    chunk_id: row.try_get_by_index::<i32>(4).ok()?,
                    text: row.try_get_by_index::<String>(5).ok()?,
                    score: row.try_get_by_index::<f64>(6).ok()?,
                })
            })
            .collect();

        Ok(hits)
    }

    /// Nearest chunks within a single paper, by cosine distance
    pub async fn near_chunks_in_paper(
        &self,
        paper_id: Uuid,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<NearChunk>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                c.id,
                c.chunk_id,
                c.page,
                c.text,
                (c.embedding <=> $2::vector) AS distance
            FROM paper_chunks c
            WHERE c.paper_id = $1
              AND c.embedding IS NOT NULL
            ORDER BY distance
            LIMIT $3
            "#,
            vec![
                paper_id.into(),
                to_vector_literal(embedding).into(),
                (limit as i64).into(),
            ],
        );

        let rows = self.read_conn().query_all(stmt).await?;

        let hits = rows
            .into_iter()
            .filter_map(|row| {
                Some(NearChunk {
                    id: row.try_get_by_index::<Uuid>(0).ok()?,
                    chunk_id: row.try_get_by_index::<i32>(1).ok()?,
                    page: row.try_get_by_index::<i32>(2).ok()?,
                    text: row.try_get_by_index::<String>(3).ok()?,
                    distance: row.try_get_by_index::<f64>(4).ok()?,
                })
            })
            .collect();

        Ok(hits)
    }

    // ========================================================================
    // Citation Operations
    // ========================================================================

    /// Most similar papers by title embedding, excluding the source paper
    pub async fn title_candidates(
        &self,
        exclude_paper: Uuid,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<TitleCandidate>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                p.id,
                p.title,
                p.authors,
                p.year,
                1 - (p.title_embedding <=> $2::vector) AS title_similarity
            FROM papers p
            WHERE p.id <> $1
              AND p.title_embedding IS NOT NULL
              AND p.title <> ''
            ORDER BY p.title_embedding <=> $2::vector
            LIMIT $3
            "#,
            vec![
                exclude_paper.into(),
                to_vector_literal(embedding).into(),
                (limit as i64).into(),
            ],
        );

        let rows = self.read_conn().query_all(stmt).await?;

        let candidates = rows
            .into_iter()
            .filter_map(|row| {
                Some(TitleCandidate {
                    paper_id: row.try_get_by_index::<Uuid>(0).ok()?,
                    title: row.try_get_by_index::<String>(1).ok()?,
                    authors: decode_authors(row.try_get_by_index::<serde_json::Value>(2).ok()?),
                    year: row.try_get_by_index::<Option<i32>>(3).ok()?,
                    title_similarity: row.try_get_by_index::<f64>(4).ok()?,
                })
            })
            .collect();

        Ok(candidates)
    }

    /// Upsert a matched citation.
    ///
    /// One row per (source, matched) pair; an existing row is updated only
    /// when the new score is strictly higher, so concurrent matchers
    /// converge on the maximum score without locking.
    pub async fn upsert_matched_citation(
        &self,
        source_paper_id: Uuid,
        matched_paper_id: Uuid,
        raw_citation: &str,
        score: f64,
    ) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO matched_citations
                (id, source_paper_id, matched_paper_id, raw_citation, score, matched_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (source_paper_id, matched_paper_id)
            DO UPDATE SET
                score = EXCLUDED.score,
                raw_citation = EXCLUDED.raw_citation,
                matched_at = EXCLUDED.matched_at
            WHERE matched_citations.score < EXCLUDED.score
            "#,
            vec![
                Uuid::new_v4().into(),
                source_paper_id.into(),
                matched_paper_id.into(),
                raw_citation.into(),
                score.into(),
            ],
        );

        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    /// All citation matches originating from a paper
    pub async fn citations_from_paper(&self, paper_id: Uuid) -> Result<Vec<MatchedCitation>> {
        MatchedCitationEntity::find()
            .filter(MatchedCitationColumn::SourcePaperId.eq(paper_id))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Recompute the cached incoming-citation count for a paper
    pub async fn refresh_citation_count(&self, paper_id: Uuid) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE papers
            SET citation_count_cached = (
                SELECT COUNT(*) FROM matched_citations WHERE matched_paper_id = papers.id
            )
            WHERE id = $1
            "#,
            vec![paper_id.into()],
        );
        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    /// Recompute the cached outgoing-match count for a source paper
    pub async fn refresh_matched_count(&self, paper_id: Uuid) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE papers
            SET matched_count_cached = (
                SELECT COUNT(*) FROM matched_citations WHERE source_paper_id = papers.id
            )
            WHERE id = $1
            "#,
            vec![paper_id.into()],
        );
        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    // ========================================================================
    // Tag Operations
    // ========================================================================

    /// Active tags that have embeddings, for tag extraction
    pub async fn active_tags_with_embeddings(&self) -> Result<Vec<Tag>> {
        TagEntity::find()
            .filter(TagColumn::IsActive.eq(true))
            .filter(TagColumn::Embedding.is_not_null())
            .order_by_asc(TagColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}
