use crate::engine::{ChunkingError, ClauseBuildError};
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(value: E) -> Self {
        Error(Box::new(value.into()))
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("Could not build clause:\n{0}")]
    ClauseBuildError(#[from] ClauseBuildError),
    #[error("Could not chunk conditions:\n{0}")]
    ChunkingError(#[from] ChunkingError),
    #[error("Invalid request:\n{0}")]
    RequestError(#[from] RequestError),
    #[error("IO error:\n{0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error:\n{0}")]
    JsonError(#[from] serde_json::Error),
}

/// Problems with a request file that are only detectable after it was deserialized.
#[derive(Debug, Error)]
pub enum RequestError {
    UnknownDialect(String),
    UnknownTable(String),
    UnknownColumn { table: String, column: String },
}

impl Display for RequestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::UnknownDialect(name) => write!(
                f,
                "Unknown dialect '{name}'. Try one of: ansi, jet, sql-server, postgres"
            ),
            RequestError::UnknownTable(table) => {
                write!(f, "Table '{table}' is not described in the request")
            }
            RequestError::UnknownColumn { table, column } => {
                write!(f, "Table '{table}' has no column named '{column}'")
            }
        }
    }
}

impl Error {
    pub fn into_inner(self) -> ErrorKind {
        *self.0
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }
}
