use chrono::NaiveDate;
use ledgerlink_core::{DocumentKind, JobId, Money, NewDocument, NewTransaction};
use ledgerlink_recon::{PairScorer, ReconEngine, RunScope, RunSummary};
use ledgerlink_storage::{db, SqliteStore};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::str::FromStr;
use thiserror::Error;

use crate::IngestError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub date_column: Option<usize>,
    pub description_column: Option<usize>,
    pub amount_column: Option<usize>,
    pub debit_column: Option<usize>,
    pub credit_column: Option<usize>,
    pub date_format: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date_column: Some(0),
            description_column: Some(1),
            amount_column: Some(2),
            debit_column: None,
            credit_column: None,
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

/// How one bank's CSV export maps onto ledger lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementProfile {
    pub name: String,
    pub mapping: ColumnMapping,
    pub has_header: bool,
    pub delimiter: String,
}

impl Default for StatementProfile {
    fn default() -> Self {
        Self {
            name: "Unnamed Profile".to_string(),
            mapping: ColumnMapping::default(),
            has_header: true,
            delimiter: ",".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatementRow {
    pub date: NaiveDate,
    pub description: String,
    /// Signed: negative = outflow.
    pub amount: Money,
}

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Invalid date format: {0}")]
    InvalidDate(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("No data rows")]
    NoDataRows,
}

pub fn parse_statement<R: Read>(
    data: R,
    profile: &StatementProfile,
) -> Result<Vec<StatementRow>, StatementError> {
    let delimiter = profile
        .delimiter
        .as_bytes()
        .first()
        .copied()
        .unwrap_or(b',');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(profile.has_header)
        .delimiter(delimiter)
        .from_reader(data);

    let mapping = &profile.mapping;
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        if record.is_empty() {
            continue;
        }

        let date = if let Some(col) = mapping.date_column {
            let field = record
                .get(col)
                .ok_or_else(|| StatementError::MissingColumn(format!("date_column {col}")))?;
            parse_date(field, &mapping.date_format)?
        } else {
            continue;
        };

        let description = if let Some(col) = mapping.description_column {
            record.get(col).unwrap_or_default().to_string()
        } else {
            String::new()
        };

        let amount = if let Some(col) = mapping.amount_column {
            parse_amount(record.get(col).unwrap_or_default())?
        } else if let (Some(d_col), Some(c_col)) = (mapping.debit_column, mapping.credit_column) {
            let debit = record
                .get(d_col)
                .filter(|s| !s.trim().is_empty())
                .map(parse_amount)
                .transpose()?;
            let credit = record
                .get(c_col)
                .filter(|s| !s.trim().is_empty())
                .map(parse_amount)
                .transpose()?;
            match (debit, credit) {
                // Debit columns list outflows as positive values.
                (Some(d), None) => Money::zero() - d,
                (None, Some(c)) => c,
                _ => Money::zero(),
            }
        } else {
            continue;
        };

        rows.push(StatementRow {
            date,
            description,
            amount,
        });
    }

    if rows.is_empty() {
        return Err(StatementError::NoDataRows);
    }

    Ok(rows)
}

fn parse_date(s: &str, format: &str) -> Result<NaiveDate, StatementError> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, format) {
        return Ok(date);
    }

    for fmt in &[
        "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y", "%Y-%m-%d",
    ] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(StatementError::InvalidDate(s.to_string()))
}

fn parse_amount(s: &str) -> Result<Money, StatementError> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let s = s.replace([',', '$', ' '], "");
    let mut dec = Decimal::from_str(&s).map_err(|_| StatementError::InvalidAmount(s.clone()))?;
    if negative {
        dec = -dec;
    }
    Ok(Money::from_decimal(dec))
}

#[derive(Debug, Clone, Copy)]
pub struct StatementIngestOutcome {
    pub job_id: JobId,
    pub statement_document_id: i64,
    pub transactions_created: usize,
    pub reconciliation: RunSummary,
}

/// One ingestion route: parse a CSV bank statement, register the file as
/// a document, insert one ledger line per row, then hand the batch to
/// the shared reconciliation engine. Reconciliation is best-effort; the
/// import itself is the only thing that can fail here.
pub async fn ingest_statement<S: PairScorer, R: Read>(
    store: &SqliteStore,
    engine: &ReconEngine<S>,
    data: R,
    profile: &StatementProfile,
    original_filename: &str,
    bank_account_id: Option<i64>,
) -> Result<StatementIngestOutcome, IngestError> {
    let rows = parse_statement(data, profile)?;

    let mut statement_doc = NewDocument::new(DocumentKind::BankStatement, original_filename);
    statement_doc.document_date = rows.iter().map(|r| r.date).max();
    let statement_document_id = db::insert_document(store.pool(), &statement_doc).await?;

    let job_id = JobId::new();
    let mut transactions_created = 0;
    for row in &rows {
        let mut new = NewTransaction::ledger_line(job_id, &row.description, row.amount, row.date);
        new.bank_account_id = bank_account_id;
        db::insert_transaction(store.pool(), &new).await?;
        transactions_created += 1;
    }

    tracing::info!(
        %job_id,
        statement_document_id,
        transactions_created,
        "statement imported, reconciling batch"
    );
    let reconciliation = engine
        .run(store, &RunScope::statement(statement_document_id))
        .await;

    Ok(StatementIngestOutcome {
        job_id,
        statement_document_id,
        transactions_created,
        reconciliation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn parse_amount_plain() {
        assert_eq!(parse_amount("123.45").unwrap(), Money::from_cents(12345));
    }

    #[test]
    fn parse_amount_with_dollar_sign_and_commas() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), Money::from_cents(123456));
    }

    #[test]
    fn parse_amount_negative() {
        assert_eq!(parse_amount("-50.00").unwrap(), Money::from_cents(-5000));
    }

    #[test]
    fn parse_amount_accounting_parens() {
        assert_eq!(parse_amount("(75.25)").unwrap(), Money::from_cents(-7525));
    }

    #[test]
    fn parse_amount_invalid() {
        assert!(parse_amount("not_a_number").is_err());
        assert!(parse_amount("").is_err());
    }

    // ── parse_date ────────────────────────────────────────────────────────────

    #[test]
    fn parse_date_iso() {
        let d = parse_date("2024-01-15", "%Y-%m-%d").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn parse_date_us_slash_fallback() {
        let d = parse_date("01/15/2024", "%Y-%m-%d").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn parse_date_invalid() {
        assert!(parse_date("not-a-date", "%Y-%m-%d").is_err());
    }

    // ── parse_statement ───────────────────────────────────────────────────────

    #[test]
    fn parse_statement_basic() {
        let data = b"date,description,amount\n2024-03-10,ACME SUPPLIES,-45.00\n2024-03-11,PAYROLL,2500.00\n";
        let rows = parse_statement(data.as_ref(), &StatementProfile::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, Money::from_cents(-4500));
        assert_eq!(rows[0].description, "ACME SUPPLIES");
        assert_eq!(rows[1].amount, Money::from_cents(250000));
    }

    #[test]
    fn parse_statement_debit_credit_columns() {
        let data = b"date,description,debit,credit\n2024-03-10,CHARGE,45.00,\n2024-03-11,DEPOSIT,,100.00\n";
        let profile = StatementProfile {
            mapping: ColumnMapping {
                date_column: Some(0),
                description_column: Some(1),
                amount_column: None,
                debit_column: Some(2),
                credit_column: Some(3),
                date_format: "%Y-%m-%d".to_string(),
            },
            ..StatementProfile::default()
        };
        let rows = parse_statement(data.as_ref(), &profile).unwrap();
        assert_eq!(rows[0].amount, Money::from_cents(-4500)); // debit = outflow
        assert_eq!(rows[1].amount, Money::from_cents(10000)); // credit = inflow
    }

    #[test]
    fn parse_statement_no_data_rows_errors() {
        let data = b"date,description,amount\n";
        assert!(matches!(
            parse_statement(data.as_ref(), &StatementProfile::default()),
            Err(StatementError::NoDataRows)
        ));
    }
}
