pub mod db;
pub mod store;

pub use db::{
    create_db, get_document, get_transaction, insert_document, insert_transaction,
    transactions_for_document, unmatched_documents, unmatched_transactions, DbPool,
};
pub use store::SqliteStore;
