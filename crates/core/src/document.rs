use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;
use super::transaction::ReconciliationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    BankStatement,
    Invoice,
    Receipt,
    TaxDocument,
    Other,
}

impl DocumentKind {
    /// Whether a matched document of this kind gets exploded into
    /// itemized breakdown entries.
    pub fn is_itemizable(self) -> bool {
        matches!(self, DocumentKind::Invoice | DocumentKind::Receipt)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::BankStatement => write!(f, "bank_statement"),
            DocumentKind::Invoice => write!(f, "invoice"),
            DocumentKind::Receipt => write!(f, "receipt"),
            DocumentKind::TaxDocument => write!(f, "tax_document"),
            DocumentKind::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank_statement" => Ok(DocumentKind::BankStatement),
            "invoice" => Ok(DocumentKind::Invoice),
            "receipt" => Ok(DocumentKind::Receipt),
            "tax_document" => Ok(DocumentKind::TaxDocument),
            "other" => Ok(DocumentKind::Other),
            other => Err(format!("Unknown document kind: '{other}'")),
        }
    }
}

/// Metadata and extracted amounts for one uploaded source file.
/// Created by ingestion after extraction; match fields are mutated only
/// through the atomic commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub document_date: Option<NaiveDate>,
    pub vendor_name: Option<String>,
    pub total_amount: Option<Money>,
    pub subtotal_amount: Option<Money>,
    pub tax_amount: Option<Money>,
    pub fee_amount: Option<Money>,
    pub shipping_amount: Option<Money>,
    pub kind: DocumentKind,
    pub original_filename: String,
    pub reconciliation_status: ReconciliationStatus,
    pub matched_transaction_id: Option<i64>,
}

impl Document {
    pub fn is_matched(&self) -> bool {
        self.reconciliation_status == ReconciliationStatus::Matched
            || self.matched_transaction_id.is_some()
    }
}

/// Insert form of [`Document`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub document_date: Option<NaiveDate>,
    pub vendor_name: Option<String>,
    pub total_amount: Option<Money>,
    pub subtotal_amount: Option<Money>,
    pub tax_amount: Option<Money>,
    pub fee_amount: Option<Money>,
    pub shipping_amount: Option<Money>,
    pub kind: DocumentKind,
    pub original_filename: String,
}

impl NewDocument {
    pub fn new(kind: DocumentKind, original_filename: impl Into<String>) -> Self {
        NewDocument {
            document_date: None,
            vendor_name: None,
            total_amount: None,
            subtotal_amount: None,
            tax_amount: None,
            fee_amount: None,
            shipping_amount: None,
            kind,
            original_filename: original_filename.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn document_kind_roundtrip() {
        for kind in [
            DocumentKind::BankStatement,
            DocumentKind::Invoice,
            DocumentKind::Receipt,
            DocumentKind::TaxDocument,
            DocumentKind::Other,
        ] {
            assert_eq!(DocumentKind::from_str(&kind.to_string()).unwrap(), kind);
        }
        assert!(DocumentKind::from_str("statement").is_err());
    }

    #[test]
    fn only_invoices_and_receipts_itemize() {
        assert!(DocumentKind::Invoice.is_itemizable());
        assert!(DocumentKind::Receipt.is_itemizable());
        assert!(!DocumentKind::BankStatement.is_itemizable());
        assert!(!DocumentKind::TaxDocument.is_itemizable());
        assert!(!DocumentKind::Other.is_itemizable());
    }
}
