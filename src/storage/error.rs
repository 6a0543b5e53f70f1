use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Record already exists for hash {0}")]
    Conflict(String),
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Index lock poisoned")]
    Poisoned,
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl IndexError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, IndexError::Conflict(_))
    }
}

impl From<redb::CommitError> for IndexError {
    fn from(e: redb::CommitError) -> Self {
        IndexError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for IndexError {
    fn from(e: redb::DatabaseError) -> Self {
        IndexError::RedbDatabase(Box::new(e))
    }
}

impl From<redb::Error> for IndexError {
    fn from(e: redb::Error) -> Self {
        IndexError::Redb(Box::new(e))
    }
}

impl From<redb::StorageError> for IndexError {
    fn from(e: redb::StorageError) -> Self {
        IndexError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for IndexError {
    fn from(e: redb::TableError) -> Self {
        IndexError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for IndexError {
    fn from(e: redb::TransactionError) -> Self {
        IndexError::Transaction(Box::new(e))
    }
}
