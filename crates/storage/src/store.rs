use async_trait::async_trait;
use ledgerlink_core::{Document, DocumentKind, NewTransaction, Transaction};
use ledgerlink_recon::{CommitOutcome, ReconStore, StoreError};

use crate::db::{self, DbPool};

/// SQLite-backed [`ReconStore`]. The commit is an optimistic
/// compare-and-set: both UPDATEs are guarded on the match fields still
/// being null, inside one database transaction, so a concurrently
/// claimed record rolls the whole commit back.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl ReconStore for SqliteStore {
    async fn unmatched_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        db::unmatched_transactions(&self.pool).await.map_err(backend)
    }

    async fn unmatched_documents(
        &self,
        exclude_kinds: &[DocumentKind],
    ) -> Result<Vec<Document>, StoreError> {
        let docs = db::unmatched_documents(&self.pool).await.map_err(backend)?;
        Ok(docs
            .into_iter()
            .filter(|d| !exclude_kinds.contains(&d.kind))
            .collect())
    }

    async fn commit_match(
        &self,
        transaction_id: i64,
        document_id: i64,
    ) -> Result<CommitOutcome, StoreError> {
        let mut db_tx = self.pool.begin().await.map_err(backend)?;

        let tx_claim = sqlx::query(
            "UPDATE transactions \
             SET matched_document_id = ?, reconciliation_status = 'matched' \
             WHERE id = ? \
               AND matched_document_id IS NULL \
               AND reconciliation_status = 'unreconciled'",
        )
        .bind(document_id)
        .bind(transaction_id)
        .execute(&mut *db_tx)
        .await
        .map_err(backend)?;

        if tx_claim.rows_affected() == 0 {
            db_tx.rollback().await.map_err(backend)?;
            return Ok(CommitOutcome::Conflict);
        }

        let doc_claim = sqlx::query(
            "UPDATE documents \
             SET matched_transaction_id = ?, reconciliation_status = 'matched' \
             WHERE id = ? \
               AND matched_transaction_id IS NULL \
               AND reconciliation_status = 'unreconciled'",
        )
        .bind(transaction_id)
        .bind(document_id)
        .execute(&mut *db_tx)
        .await
        .map_err(backend)?;

        if doc_claim.rows_affected() == 0 {
            db_tx.rollback().await.map_err(backend)?;
            return Ok(CommitOutcome::Conflict);
        }

        db_tx.commit().await.map_err(backend)?;
        Ok(CommitOutcome::Committed)
    }

    async fn has_breakdown_entries(&self, document_id: i64) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions \
             WHERE is_breakdown_entry = 1 AND matched_document_id = ?",
        )
        .bind(document_id)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(count > 0)
    }

    async fn insert_breakdown_entries(
        &self,
        entries: &[NewTransaction],
    ) -> Result<usize, StoreError> {
        for entry in entries {
            db::insert_transaction(&self.pool, entry)
                .await
                .map_err(backend)?;
        }
        Ok(entries.len())
    }
}
