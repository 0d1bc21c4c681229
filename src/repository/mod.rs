use crate::db::{DbConnection, DbPool};
use crate::domain::document::{EmbeddedDocument, StoredDocument, StoredEmbedding};
use crate::repository::errors::RepositoryResult;

pub mod document;
pub mod errors;
pub mod schema;

/// Read access to the persisted corpus.
pub trait DocumentReader {
    /// Embeddings of both jurisdictions, optionally restricted to one
    /// ontology id, ordered by jurisdiction then time bucket. Rows without an
    /// embedding are not returned.
    fn list_embeddings(
        &self,
        jurisdiction_a: &str,
        jurisdiction_b: &str,
        ontology_id: Option<&str>,
    ) -> RepositoryResult<Vec<StoredEmbedding>>;

    /// Distinct jurisdictions, sorted.
    fn list_jurisdictions(&self) -> RepositoryResult<Vec<String>>;

    fn get_document(&self, doc_id: &str) -> RepositoryResult<StoredDocument>;

    fn count_documents(&self) -> RepositoryResult<i64>;
}

pub trait DocumentWriter {
    /// Insert or overwrite every document keyed by `doc_id`. The batch commits
    /// as a unit.
    fn upsert_documents(&self, documents: &[EmbeddedDocument]) -> RepositoryResult<usize>;
}

/// Diesel-backed repository over the shared SQLite pool.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool,
}

impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(self.pool.get()?)
    }
}
