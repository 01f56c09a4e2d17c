use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::money::Money;

/// Identifies one ingestion batch. Every transaction created by a single
/// statement import or document intake shares a job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(JobId(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Unreconciled,
    Matched,
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationStatus::Unreconciled => write!(f, "unreconciled"),
            ReconciliationStatus::Matched => write!(f, "matched"),
        }
    }
}

impl std::str::FromStr for ReconciliationStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unreconciled" => Ok(ReconciliationStatus::Unreconciled),
            "matched" => Ok(ReconciliationStatus::Matched),
            other => Err(format!("Unknown reconciliation status: '{other}'")),
        }
    }
}

/// Which component of a matched document a breakdown entry itemizes.
/// A regular ledger line carries no breakdown type at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownType {
    Subtotal,
    Tax,
    Fee,
    Shipping,
}

impl BreakdownType {
    pub const ALL: [BreakdownType; 4] = [
        BreakdownType::Subtotal,
        BreakdownType::Tax,
        BreakdownType::Fee,
        BreakdownType::Shipping,
    ];

    /// Human-readable label used in synthesized descriptions.
    pub fn label(self) -> &'static str {
        match self {
            BreakdownType::Subtotal => "Subtotal",
            BreakdownType::Tax => "Tax",
            BreakdownType::Fee => "Fee",
            BreakdownType::Shipping => "Shipping",
        }
    }
}

impl fmt::Display for BreakdownType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakdownType::Subtotal => write!(f, "subtotal"),
            BreakdownType::Tax => write!(f, "tax"),
            BreakdownType::Fee => write!(f, "fee"),
            BreakdownType::Shipping => write!(f, "shipping"),
        }
    }
}

impl std::str::FromStr for BreakdownType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subtotal" => Ok(BreakdownType::Subtotal),
            "tax" => Ok(BreakdownType::Tax),
            "fee" => Ok(BreakdownType::Fee),
            "shipping" => Ok(BreakdownType::Shipping),
            other => Err(format!("Unknown breakdown type: '{other}'")),
        }
    }
}

/// A financial ledger line. Created by ingestion or by the breakdown
/// exploder; match fields are mutated only through the atomic commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub job_id: JobId,
    pub original_description: String,
    /// Signed: negative = outflow/debit.
    pub amount: Money,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub confidence_score: f32,
    pub bank_account_id: Option<i64>,
    pub reconciliation_status: ReconciliationStatus,
    pub matched_document_id: Option<i64>,
    pub is_breakdown_entry: bool,
    pub breakdown_type: Option<BreakdownType>,
    pub parent_transaction_id: Option<i64>,
    pub user_confirmed: bool,
}

impl Transaction {
    pub fn is_matched(&self) -> bool {
        self.reconciliation_status == ReconciliationStatus::Matched
            || self.matched_document_id.is_some()
    }
}

/// Insert form of [`Transaction`] — everything but the row id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub job_id: JobId,
    pub original_description: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub confidence_score: f32,
    pub bank_account_id: Option<i64>,
    pub reconciliation_status: ReconciliationStatus,
    pub matched_document_id: Option<i64>,
    pub is_breakdown_entry: bool,
    pub breakdown_type: Option<BreakdownType>,
    pub parent_transaction_id: Option<i64>,
    pub user_confirmed: bool,
}

impl NewTransaction {
    /// A plain unreconciled ledger line, as produced by statement import.
    pub fn ledger_line(
        job_id: JobId,
        description: impl Into<String>,
        amount: Money,
        date: NaiveDate,
    ) -> Self {
        NewTransaction {
            job_id,
            original_description: description.into(),
            amount,
            date,
            category: None,
            subcategory: None,
            confidence_score: 0.0,
            bank_account_id: None,
            reconciliation_status: ReconciliationStatus::Unreconciled,
            matched_document_id: None,
            is_breakdown_entry: false,
            breakdown_type: None,
            parent_transaction_id: None,
            user_confirmed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn reconciliation_status_roundtrip() {
        for status in [ReconciliationStatus::Unreconciled, ReconciliationStatus::Matched] {
            assert_eq!(
                ReconciliationStatus::from_str(&status.to_string()).unwrap(),
                status
            );
        }
        assert!(ReconciliationStatus::from_str("pending").is_err());
    }

    #[test]
    fn breakdown_type_roundtrip() {
        for bt in BreakdownType::ALL {
            assert_eq!(BreakdownType::from_str(&bt.to_string()).unwrap(), bt);
        }
        assert!(BreakdownType::from_str("none").is_err());
    }

    #[test]
    fn breakdown_labels_are_capitalized() {
        assert_eq!(BreakdownType::Subtotal.label(), "Subtotal");
        assert_eq!(BreakdownType::Shipping.label(), "Shipping");
    }

    #[test]
    fn job_id_roundtrip() {
        let id = JobId::new();
        assert_eq!(JobId::from_str(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn ledger_line_defaults_unreconciled() {
        let tx = NewTransaction::ledger_line(
            JobId::new(),
            "ACME SUPPLIES",
            Money::from_cents(-4500),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        );
        assert_eq!(tx.reconciliation_status, ReconciliationStatus::Unreconciled);
        assert!(tx.matched_document_id.is_none());
        assert!(!tx.is_breakdown_entry);
        assert!(tx.breakdown_type.is_none());
    }
}
