pub mod document;
pub mod statement;

pub use document::{ingest_document, DocumentIngestOutcome, ExtractedDocument};
pub use statement::{
    ingest_statement, parse_statement, ColumnMapping, StatementIngestOutcome,
    StatementProfile, StatementRow,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("statement parse error: {0}")]
    Statement(#[from] statement::StatementError),
}
