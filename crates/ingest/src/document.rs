use std::collections::HashMap;

use chrono::NaiveDate;
use ledgerlink_core::{DocumentKind, Money, NewDocument};
use ledgerlink_recon::{PairScorer, ReconEngine, RunScope, RunSummary};
use ledgerlink_storage::{db, SqliteStore};
use serde::{Deserialize, Serialize};

use crate::IngestError;

/// What the external extraction pipeline hands over for one uploaded
/// file. The core fields are first-class; extractor-specific extras
/// arrive in a generic map keyed by field name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub kind: DocumentKind,
    pub original_filename: String,
    pub vendor_name: Option<String>,
    pub document_date: Option<NaiveDate>,
    pub total_amount: Option<Money>,
    pub subtotal_amount: Option<Money>,
    pub tax_amount: Option<Money>,
    pub fee_amount: Option<Money>,
    #[serde(default)]
    pub fields: HashMap<String, Money>,
}

impl ExtractedDocument {
    pub fn new(kind: DocumentKind, original_filename: impl Into<String>) -> Self {
        Self {
            kind,
            original_filename: original_filename.into(),
            vendor_name: None,
            document_date: None,
            total_amount: None,
            subtotal_amount: None,
            tax_amount: None,
            fee_amount: None,
            fields: HashMap::new(),
        }
    }

    /// Shipping never got a dedicated extractor; it rides in the
    /// generic field map.
    pub fn shipping_amount(&self) -> Option<Money> {
        self.fields.get("shipping").copied()
    }

    fn into_new_document(self) -> NewDocument {
        let shipping_amount = self.shipping_amount();
        NewDocument {
            document_date: self.document_date,
            vendor_name: self.vendor_name,
            total_amount: self.total_amount,
            subtotal_amount: self.subtotal_amount,
            tax_amount: self.tax_amount,
            fee_amount: self.fee_amount,
            shipping_amount,
            kind: self.kind,
            original_filename: self.original_filename,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DocumentIngestOutcome {
    pub document_id: i64,
    pub reconciliation: RunSummary,
}

/// The other ingestion route: persist an extracted document, then hand
/// it to the shared reconciliation engine. A failed reconciliation never
/// fails the intake.
pub async fn ingest_document<S: PairScorer>(
    store: &SqliteStore,
    engine: &ReconEngine<S>,
    extracted: ExtractedDocument,
) -> Result<DocumentIngestOutcome, IngestError> {
    let document_id = db::insert_document(store.pool(), &extracted.into_new_document()).await?;

    tracing::info!(document_id, "document ingested, reconciling");
    let reconciliation = engine.run(store, &RunScope::document_intake()).await;

    Ok(DocumentIngestOutcome {
        document_id,
        reconciliation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::{ingest_statement, StatementProfile};
    use chrono::NaiveDate;
    use ledgerlink_core::ReconciliationStatus;
    use ledgerlink_recon::ReconEngine;
    use ledgerlink_storage::db::create_db;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("ledger.db")).await.unwrap();
        (dir, SqliteStore::new(pool))
    }

    fn acme_receipt() -> ExtractedDocument {
        let mut extracted = ExtractedDocument::new(DocumentKind::Receipt, "acme.pdf");
        extracted.vendor_name = Some("Acme Supplies".to_string());
        extracted.document_date = Some(date(2024, 3, 12));
        extracted.total_amount = Some(Money::from_cents(4500));
        extracted.subtotal_amount = Some(Money::from_cents(4000));
        extracted.tax_amount = Some(Money::from_cents(500));
        extracted
    }

    #[test]
    fn shipping_rides_in_the_field_map() {
        let json = r#"{
            "kind": "receipt",
            "original_filename": "acme.pdf",
            "vendor_name": "Acme Supplies",
            "document_date": "2024-03-12",
            "total_amount": "45.00",
            "subtotal_amount": null,
            "tax_amount": null,
            "fee_amount": null,
            "fields": { "shipping": "7.00", "loyalty_points": "1.20" }
        }"#;
        let extracted: ExtractedDocument = serde_json::from_str(json).unwrap();
        assert_eq!(extracted.shipping_amount(), Some(Money::from_cents(700)));
        assert_eq!(extracted.total_amount, Some(Money::from_cents(4500)));

        let new = extracted.into_new_document();
        assert_eq!(new.shipping_amount, Some(Money::from_cents(700)));
    }

    #[test]
    fn missing_field_map_defaults_empty() {
        let json = r#"{
            "kind": "invoice",
            "original_filename": "inv.pdf",
            "vendor_name": null,
            "document_date": null,
            "total_amount": null,
            "subtotal_amount": null,
            "tax_amount": null,
            "fee_amount": null
        }"#;
        let extracted: ExtractedDocument = serde_json::from_str(json).unwrap();
        assert!(extracted.fields.is_empty());
        assert_eq!(extracted.shipping_amount(), None);
    }

    #[tokio::test]
    async fn receipt_intake_reconciles_existing_transaction() {
        let (_dir, store) = test_store().await;
        let engine = ReconEngine::default();

        // A statement import leaves an unreconciled ledger line behind.
        let csv = b"date,description,amount\n2024-03-10,Acme Supplies Invoice #123,-45.00\n";
        let imported = ingest_statement(
            &store,
            &engine,
            csv.as_ref(),
            &StatementProfile::default(),
            "march.csv",
            Some(1),
        )
        .await
        .unwrap();
        assert_eq!(imported.transactions_created, 1);
        assert_eq!(imported.reconciliation.matched, 0); // nothing to match yet

        // The corroborating receipt arrives later.
        let outcome = ingest_document(&store, &engine, acme_receipt()).await.unwrap();
        assert_eq!(outcome.reconciliation.matched, 1);
        assert_eq!(outcome.reconciliation.breakdown_entries, 2);

        let doc = db::get_document(store.pool(), outcome.document_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.reconciliation_status, ReconciliationStatus::Matched);

        // The statement document itself was never a match target.
        let statement = db::get_document(store.pool(), imported.statement_document_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            statement.reconciliation_status,
            ReconciliationStatus::Unreconciled
        );
    }

    #[tokio::test]
    async fn statement_rows_reconcile_against_waiting_documents() {
        let (_dir, store) = test_store().await;
        let engine = ReconEngine::default();

        // Receipt first, statement second — the statement call site
        // drives the same engine.
        ingest_document(&store, &engine, acme_receipt()).await.unwrap();

        let csv = b"date,description,amount\n2024-03-10,Acme Supplies Invoice #123,-45.00\n2024-03-11,UNRELATED VENDOR,-12.00\n";
        let outcome = ingest_statement(
            &store,
            &engine,
            csv.as_ref(),
            &StatementProfile::default(),
            "march.csv",
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome.transactions_created, 2);
        assert_eq!(outcome.reconciliation.matched, 1);
        assert_eq!(outcome.reconciliation.conflicts, 0);
    }

    #[tokio::test]
    async fn bank_statements_never_match_each_other() {
        let (_dir, store) = test_store().await;
        let engine = ReconEngine::default();

        let first = b"date,description,amount\n2024-03-10,TRANSFER,-45.00\n";
        ingest_statement(
            &store,
            &engine,
            first.as_ref(),
            &StatementProfile::default(),
            "jan.csv",
            None,
        )
        .await
        .unwrap();

        let second = b"date,description,amount\n2024-03-10,TRANSFER,-45.00\n";
        let outcome = ingest_statement(
            &store,
            &engine,
            second.as_ref(),
            &StatementProfile::default(),
            "feb.csv",
            None,
        )
        .await
        .unwrap();
        assert_eq!(outcome.reconciliation.matched, 0);
    }
}
