pub mod document;
pub mod money;
pub mod transaction;

pub use document::{Document, DocumentKind, NewDocument};
pub use money::Money;
pub use transaction::{
    BreakdownType, JobId, NewTransaction, ReconciliationStatus, Transaction,
};
