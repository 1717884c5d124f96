//! Repository error type.

use crate::db::DbError;
use crate::error::ErrorKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for generic entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Required argument missing or empty; raised before any store access.
    InvalidArgument(&'static str),
    /// Target row does not exist.
    NotFound { entity: &'static str, id: i64 },
    /// Filter references a column the entity does not map.
    UnknownField { entity: &'static str, field: String },
    /// Persisted row cannot be converted into an entity.
    InvalidData(String),
    /// Store transport or constraint failure.
    Db(DbError),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::UnknownField { .. } => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidData(_) | Self::Db(_) => ErrorKind::StoreFailure,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UnknownField { entity, field } => {
                write!(f, "unknown field `{field}` for {entity}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
