use chrono::NaiveDate;
use ledgerlink_core::{
    BreakdownType, Document, DocumentKind, JobId, Money, NewDocument, NewTransaction,
    ReconciliationStatus, Transaction,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_date TEXT,
            vendor_name TEXT,
            total_cents INTEGER,
            subtotal_cents INTEGER,
            tax_cents INTEGER,
            fee_cents INTEGER,
            shipping_cents INTEGER,
            file_type TEXT NOT NULL,
            original_filename TEXT NOT NULL,
            reconciliation_status TEXT NOT NULL DEFAULT 'unreconciled',
            matched_transaction_id INTEGER REFERENCES transactions(id),
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id TEXT NOT NULL,
            original_description TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            date TEXT NOT NULL,
            category TEXT,
            subcategory TEXT,
            confidence_score REAL NOT NULL DEFAULT 0,
            bank_account_id INTEGER,
            reconciliation_status TEXT NOT NULL DEFAULT 'unreconciled',
            matched_document_id INTEGER REFERENCES documents(id),
            is_breakdown_entry INTEGER NOT NULL DEFAULT 0,
            breakdown_type TEXT,
            parent_transaction_id INTEGER REFERENCES transactions(id),
            user_confirmed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

// ── Inserts ───────────────────────────────────────────────────────────────────

pub async fn insert_transaction(
    pool: &DbPool,
    new: &NewTransaction,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO transactions (
            job_id, original_description, amount_cents, date, category,
            subcategory, confidence_score, bank_account_id,
            reconciliation_status, matched_document_id, is_breakdown_entry,
            breakdown_type, parent_transaction_id, user_confirmed
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(new.job_id.to_string())
    .bind(&new.original_description)
    .bind(new.amount.to_cents())
    .bind(new.date.to_string())
    .bind(&new.category)
    .bind(&new.subcategory)
    .bind(new.confidence_score)
    .bind(new.bank_account_id)
    .bind(new.reconciliation_status.to_string())
    .bind(new.matched_document_id)
    .bind(new.is_breakdown_entry)
    .bind(new.breakdown_type.map(|b| b.to_string()))
    .bind(new.parent_transaction_id)
    .bind(new.user_confirmed)
    .fetch_one(pool)
    .await?;

    row.try_get("id")
}

pub async fn insert_document(pool: &DbPool, new: &NewDocument) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO documents (
            document_date, vendor_name, total_cents, subtotal_cents,
            tax_cents, fee_cents, shipping_cents, file_type, original_filename
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(new.document_date.map(|d| d.to_string()))
    .bind(&new.vendor_name)
    .bind(new.total_amount.map(Money::to_cents))
    .bind(new.subtotal_amount.map(Money::to_cents))
    .bind(new.tax_amount.map(Money::to_cents))
    .bind(new.fee_amount.map(Money::to_cents))
    .bind(new.shipping_amount.map(Money::to_cents))
    .bind(new.kind.to_string())
    .bind(&new.original_filename)
    .fetch_one(pool)
    .await?;

    row.try_get("id")
}

// ── Queries ───────────────────────────────────────────────────────────────────

const TRANSACTION_COLUMNS: &str = "id, job_id, original_description, amount_cents, date, \
     category, subcategory, confidence_score, bank_account_id, \
     reconciliation_status, matched_document_id, is_breakdown_entry, \
     breakdown_type, parent_transaction_id, user_confirmed";

const DOCUMENT_COLUMNS: &str = "id, document_date, vendor_name, total_cents, subtotal_cents, \
     tax_cents, fee_cents, shipping_cents, file_type, original_filename, \
     reconciliation_status, matched_transaction_id";

pub async fn get_transaction(
    pool: &DbPool,
    id: i64,
) -> Result<Option<Transaction>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(|r| transaction_from_row(&r)).transpose()
}

pub async fn get_document(pool: &DbPool, id: i64) -> Result<Option<Document>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(|r| document_from_row(&r)).transpose()
}

/// Unmatched, non-breakdown ledger lines, newest first.
pub async fn unmatched_transactions(pool: &DbPool) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions \
         WHERE matched_document_id IS NULL \
           AND reconciliation_status = 'unreconciled' \
           AND is_breakdown_entry = 0 \
         ORDER BY date DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;
    rows.iter().map(transaction_from_row).collect()
}

/// Unmatched documents, newest document date first (undated last).
pub async fn unmatched_documents(pool: &DbPool) -> Result<Vec<Document>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents \
         WHERE matched_transaction_id IS NULL \
           AND reconciliation_status = 'unreconciled' \
         ORDER BY document_date IS NULL, document_date DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;
    rows.iter().map(document_from_row).collect()
}

/// All ledger lines linked to a document: the matched parent plus any
/// breakdown entries.
pub async fn transactions_for_document(
    pool: &DbPool,
    document_id: i64,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions \
         WHERE matched_document_id = ? ORDER BY id"
    ))
    .bind(document_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(transaction_from_row).collect()
}

// ── Row mapping ───────────────────────────────────────────────────────────────

fn decode_err(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

fn parse_date(s: &str) -> Result<NaiveDate, sqlx::Error> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| decode_err(format!("invalid stored date '{s}': {e}")))
}

fn transaction_from_row(row: &SqliteRow) -> Result<Transaction, sqlx::Error> {
    let job_id: String = row.try_get("job_id")?;
    let date: String = row.try_get("date")?;
    let status: String = row.try_get("reconciliation_status")?;
    let breakdown_type: Option<String> = row.try_get("breakdown_type")?;

    Ok(Transaction {
        id: row.try_get("id")?,
        job_id: JobId::from_str(&job_id)
            .map_err(|e| decode_err(format!("invalid stored job id '{job_id}': {e}")))?,
        original_description: row.try_get("original_description")?,
        amount: Money::from_cents(row.try_get("amount_cents")?),
        date: parse_date(&date)?,
        category: row.try_get("category")?,
        subcategory: row.try_get("subcategory")?,
        confidence_score: row.try_get::<f64, _>("confidence_score")? as f32,
        bank_account_id: row.try_get("bank_account_id")?,
        reconciliation_status: status.parse::<ReconciliationStatus>().map_err(decode_err)?,
        matched_document_id: row.try_get("matched_document_id")?,
        is_breakdown_entry: row.try_get("is_breakdown_entry")?,
        breakdown_type: breakdown_type
            .map(|s| s.parse::<BreakdownType>())
            .transpose()
            .map_err(decode_err)?,
        parent_transaction_id: row.try_get("parent_transaction_id")?,
        user_confirmed: row.try_get("user_confirmed")?,
    })
}

fn document_from_row(row: &SqliteRow) -> Result<Document, sqlx::Error> {
    let document_date: Option<String> = row.try_get("document_date")?;
    let file_type: String = row.try_get("file_type")?;
    let status: String = row.try_get("reconciliation_status")?;

    Ok(Document {
        id: row.try_get("id")?,
        document_date: document_date.as_deref().map(parse_date).transpose()?,
        vendor_name: row.try_get("vendor_name")?,
        total_amount: row
            .try_get::<Option<i64>, _>("total_cents")?
            .map(Money::from_cents),
        subtotal_amount: row
            .try_get::<Option<i64>, _>("subtotal_cents")?
            .map(Money::from_cents),
        tax_amount: row
            .try_get::<Option<i64>, _>("tax_cents")?
            .map(Money::from_cents),
        fee_amount: row
            .try_get::<Option<i64>, _>("fee_cents")?
            .map(Money::from_cents),
        shipping_amount: row
            .try_get::<Option<i64>, _>("shipping_cents")?
            .map(Money::from_cents),
        kind: file_type.parse::<DocumentKind>().map_err(decode_err)?,
        original_filename: row.try_get("original_filename")?,
        reconciliation_status: status.parse::<ReconciliationStatus>().map_err(decode_err)?,
        matched_transaction_id: row.try_get("matched_transaction_id")?,
    })
}
