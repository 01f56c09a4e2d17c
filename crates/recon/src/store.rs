use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use ledgerlink_core::{
    Document, DocumentKind, NewDocument, NewTransaction, ReconciliationStatus, Transaction,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result of the atomic match commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Both records transitioned to matched in one indivisible step.
    Committed,
    /// One side was already claimed (or gone); nothing was written.
    /// Recoverable — the caller moves on to its next candidate.
    Conflict,
}

/// Persistence seam for the reconciliation engine. The contract for
/// `commit_match` is compare-and-set: verify both records are still
/// unmatched and flip them together, or change nothing and report
/// [`CommitOutcome::Conflict`].
#[async_trait]
pub trait ReconStore: Send + Sync {
    /// Unmatched, non-breakdown ledger lines.
    async fn unmatched_transactions(&self) -> Result<Vec<Transaction>, StoreError>;

    /// Unmatched documents, minus the excluded kinds.
    async fn unmatched_documents(
        &self,
        exclude_kinds: &[DocumentKind],
    ) -> Result<Vec<Document>, StoreError>;

    async fn commit_match(
        &self,
        transaction_id: i64,
        document_id: i64,
    ) -> Result<CommitOutcome, StoreError>;

    /// Whether breakdown rows already exist for this document — the
    /// exploder's idempotence guard.
    async fn has_breakdown_entries(&self, document_id: i64) -> Result<bool, StoreError>;

    /// Insert the planned breakdown rows; returns how many were written.
    async fn insert_breakdown_entries(
        &self,
        entries: &[NewTransaction],
    ) -> Result<usize, StoreError>;
}

// ── In-memory store ───────────────────────────────────────────────────────────

/// A `ReconStore` over plain vectors. Backs the engine's unit tests and
/// embedding without a database; the commit is atomic under one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    transactions: Vec<Transaction>,
    documents: Vec<Document>,
    next_transaction_id: i64,
    next_document_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transaction(&self, new: NewTransaction) -> i64 {
        let mut inner = self.lock();
        inner.next_transaction_id += 1;
        let id = inner.next_transaction_id;
        inner.transactions.push(Transaction {
            id,
            job_id: new.job_id,
            original_description: new.original_description,
            amount: new.amount,
            date: new.date,
            category: new.category,
            subcategory: new.subcategory,
            confidence_score: new.confidence_score,
            bank_account_id: new.bank_account_id,
            reconciliation_status: new.reconciliation_status,
            matched_document_id: new.matched_document_id,
            is_breakdown_entry: new.is_breakdown_entry,
            breakdown_type: new.breakdown_type,
            parent_transaction_id: new.parent_transaction_id,
            user_confirmed: new.user_confirmed,
        });
        id
    }

    pub fn add_document(&self, new: NewDocument) -> i64 {
        let mut inner = self.lock();
        inner.next_document_id += 1;
        let id = inner.next_document_id;
        inner.documents.push(Document {
            id,
            document_date: new.document_date,
            vendor_name: new.vendor_name,
            total_amount: new.total_amount,
            subtotal_amount: new.subtotal_amount,
            tax_amount: new.tax_amount,
            fee_amount: new.fee_amount,
            shipping_amount: new.shipping_amount,
            kind: new.kind,
            original_filename: new.original_filename,
            reconciliation_status: ReconciliationStatus::Unreconciled,
            matched_transaction_id: None,
        });
        id
    }

    pub fn transaction(&self, id: i64) -> Option<Transaction> {
        self.lock().transactions.iter().find(|t| t.id == id).cloned()
    }

    pub fn document(&self, id: i64) -> Option<Document> {
        self.lock().documents.iter().find(|d| d.id == id).cloned()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().transactions.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().expect("memory store mutex poisoned")
    }
}

#[async_trait]
impl ReconStore for MemoryStore {
    async fn unmatched_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .lock()
            .transactions
            .iter()
            .filter(|t| !t.is_matched() && !t.is_breakdown_entry)
            .cloned()
            .collect())
    }

    async fn unmatched_documents(
        &self,
        exclude_kinds: &[DocumentKind],
    ) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .lock()
            .documents
            .iter()
            .filter(|d| !d.is_matched() && !exclude_kinds.contains(&d.kind))
            .cloned()
            .collect())
    }

    async fn commit_match(
        &self,
        transaction_id: i64,
        document_id: i64,
    ) -> Result<CommitOutcome, StoreError> {
        let mut inner = self.lock();

        let tx_free = inner
            .transactions
            .iter()
            .find(|t| t.id == transaction_id)
            .is_some_and(|t| !t.is_matched());
        let doc_free = inner
            .documents
            .iter()
            .find(|d| d.id == document_id)
            .is_some_and(|d| !d.is_matched());

        if !tx_free || !doc_free {
            return Ok(CommitOutcome::Conflict);
        }

        for t in inner.transactions.iter_mut() {
            if t.id == transaction_id {
                t.matched_document_id = Some(document_id);
                t.reconciliation_status = ReconciliationStatus::Matched;
            }
        }
        for d in inner.documents.iter_mut() {
            if d.id == document_id {
                d.matched_transaction_id = Some(transaction_id);
                d.reconciliation_status = ReconciliationStatus::Matched;
            }
        }

        Ok(CommitOutcome::Committed)
    }

    async fn has_breakdown_entries(&self, document_id: i64) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .transactions
            .iter()
            .any(|t| t.is_breakdown_entry && t.matched_document_id == Some(document_id)))
    }

    async fn insert_breakdown_entries(
        &self,
        entries: &[NewTransaction],
    ) -> Result<usize, StoreError> {
        for entry in entries {
            self.add_transaction(entry.clone());
        }
        Ok(entries.len())
    }
}
