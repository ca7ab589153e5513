//! Store error types.

use relay_codec::{PackError, UnpackError};
use thiserror::Error;

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("encode error: {0}")]
    Pack(#[from] PackError),

    #[error("record {id} failed to decode: {source}")]
    Corrupt { id: String, source: UnpackError },

    #[error("bucket key of {len} bytes is not a 16-byte identifier")]
    BadKey { len: usize },
}
