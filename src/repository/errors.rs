use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("database connection error: {0}")]
    ConnectionError(#[from] diesel::r2d2::PoolError),
    #[error("database query error: {0}")]
    QueryError(diesel::result::Error),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<diesel::result::Error> for RepositoryError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => RepositoryError::NotFound,
            other => RepositoryError::QueryError(other),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
