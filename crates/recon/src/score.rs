use ledgerlink_core::{Document, Money, Transaction};

use crate::config::MatchConfig;

/// Sentinel date distance for documents with no extracted date.
/// Large enough that no date window can admit the pair.
pub const MISSING_DATE_DIFF: i64 = 999;

/// Component scores for one eligible transaction/document pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairScore {
    pub amount_diff: Money,
    pub date_diff_days: i64,
    /// Description similarity in [0, 100].
    pub description: f64,
    /// Weighted total; compared against `MatchConfig::accept_threshold`.
    pub total: f64,
}

/// Scoring strategy for one transaction/document pair.
///
/// Injectable so the first-fit selector can be driven by a different
/// scorer (e.g. an optimal-assignment implementation) without touching
/// commit or breakdown logic.
pub trait PairScorer: Send + Sync {
    /// Returns `None` when the pair fails a hard eligibility gate.
    fn score(&self, tx: &Transaction, doc: &Document, config: &MatchConfig) -> Option<PairScore>;
}

/// The production scorer: hard amount/date gates, then a weighted sum of
/// amount closeness, date closeness, and description similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedScorer;

impl PairScorer for WeightedScorer {
    fn score(&self, tx: &Transaction, doc: &Document, config: &MatchConfig) -> Option<PairScore> {
        // A document without a usable total can never corroborate a
        // transaction.
        let total_amount = doc.total_amount?;
        let amount_diff = (tx.amount.abs() - total_amount).abs();
        if amount_diff >= config.amount_tolerance() {
            return None;
        }

        let date_diff_days = match doc.document_date {
            Some(date) => (tx.date - date).num_days().abs(),
            None => MISSING_DATE_DIFF,
        };
        if date_diff_days > config.date_window_days {
            return None;
        }

        let description =
            description_score(&tx.original_description, comparand(doc), config.min_token_len);

        let total = (100.0 - amount_diff.to_f64()) * config.amount_weight
            + (100.0 - date_diff_days as f64) * config.date_weight
            + description * config.description_weight;

        Some(PairScore {
            amount_diff,
            date_diff_days,
            description,
            total,
        })
    }
}

/// The document-side string the description is compared against: vendor
/// name when extraction produced one, the original filename otherwise.
fn comparand(doc: &Document) -> &str {
    match doc.vendor_name.as_deref() {
        Some(vendor) if !vendor.trim().is_empty() => vendor,
        _ => &doc.original_filename,
    }
}

/// Case-insensitive similarity in [0, 100]. Whole-string containment is
/// a perfect score; otherwise the fraction of tokens (longer than
/// `min_token_len`) with a containment partner on the other side.
fn description_score(description: &str, vendor: &str, min_token_len: usize) -> f64 {
    let a = description.to_lowercase();
    let b = vendor.to_lowercase();
    let a = a.trim();
    let b = b.trim();

    // `str::contains("")` is vacuously true; an empty comparand earns
    // nothing.
    if !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a)) {
        return 100.0;
    }

    let tokens_a: Vec<&str> = a
        .split_whitespace()
        .filter(|t| t.len() > min_token_len)
        .collect();
    let tokens_b: Vec<&str> = b
        .split_whitespace()
        .filter(|t| t.len() > min_token_len)
        .collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let matched = tokens_a
        .iter()
        .filter(|ta| tokens_b.iter().any(|tb| ta.contains(tb) || tb.contains(*ta)))
        .count();

    (matched as f64 / tokens_a.len().max(tokens_b.len()) as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ledgerlink_core::{
        DocumentKind, JobId, NewTransaction, ReconciliationStatus,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(desc: &str, cents: i64, on: NaiveDate) -> Transaction {
        let new = NewTransaction::ledger_line(JobId::new(), desc, Money::from_cents(cents), on);
        Transaction {
            id: 1,
            job_id: new.job_id,
            original_description: new.original_description,
            amount: new.amount,
            date: new.date,
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

    fn doc(vendor: Option<&str>, total_cents: Option<i64>, on: Option<NaiveDate>) -> Document {
        Document {
            id: 10,
            document_date: on,
            vendor_name: vendor.map(String::from),
            total_amount: total_cents.map(Money::from_cents),
            subtotal_amount: None,
            tax_amount: None,
            fee_amount: None,
            shipping_amount: None,
            kind: DocumentKind::Receipt,
            original_filename: "scan_0001.pdf".to_string(),
            reconciliation_status: ReconciliationStatus::Unreconciled,
            matched_transaction_id: None,
        }
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        // amount_diff = 0, date_diff = 0, description = 0
        // total = 50 + 30 + 0 = 80 — accepted at the boundary.
        let config = MatchConfig::default();
        let t = tx("zzzz qqqq", -4500, date(2024, 3, 10));
        let d = doc(Some("aaaa bbbb"), Some(4500), Some(date(2024, 3, 10)));
        let score = WeightedScorer.score(&t, &d, &config).unwrap();
        assert_eq!(score.description, 0.0);
        assert!(score.total >= config.accept_threshold);
    }

    #[test]
    fn amount_gate_rejects_two_cent_difference() {
        let config = MatchConfig::default();
        let t = tx("Acme Supplies", -4500, date(2024, 3, 10));
        let d = doc(Some("Acme Supplies"), Some(4502), Some(date(2024, 3, 10)));
        assert!(WeightedScorer.score(&t, &d, &config).is_none());
    }

    #[test]
    fn date_gate_rejects_eight_days() {
        let config = MatchConfig::default();
        let t = tx("Acme Supplies", -4500, date(2024, 3, 10));
        let d = doc(Some("Acme Supplies"), Some(4500), Some(date(2024, 3, 18)));
        assert!(WeightedScorer.score(&t, &d, &config).is_none());
    }

    #[test]
    fn date_gate_admits_seven_days() {
        let config = MatchConfig::default();
        let t = tx("Acme Supplies", -4500, date(2024, 3, 10));
        let d = doc(Some("Acme Supplies"), Some(4500), Some(date(2024, 3, 17)));
        assert!(WeightedScorer.score(&t, &d, &config).is_some());
    }

    #[test]
    fn missing_document_date_is_ineligible() {
        let config = MatchConfig::default();
        let t = tx("Acme Supplies", -4500, date(2024, 3, 10));
        let d = doc(Some("Acme Supplies"), Some(4500), None);
        assert!(WeightedScorer.score(&t, &d, &config).is_none());
    }

    #[test]
    fn missing_total_amount_is_ineligible() {
        let config = MatchConfig::default();
        let t = tx("Acme Supplies", -4500, date(2024, 3, 10));
        let d = doc(Some("Acme Supplies"), None, Some(date(2024, 3, 10)));
        assert!(WeightedScorer.score(&t, &d, &config).is_none());
    }

    #[test]
    fn substring_containment_scores_perfect_description() {
        // vendor name contained in the bank description
        let config = MatchConfig::default();
        let t = tx("Acme Supplies Invoice #123", -4500, date(2024, 3, 10));
        let d = doc(Some("Acme Supplies"), Some(4500), Some(date(2024, 3, 12)));
        let score = WeightedScorer.score(&t, &d, &config).unwrap();
        assert_eq!(score.description, 100.0);
        assert_eq!(score.date_diff_days, 2);
        // 50 + 29.4 + 20 = 99.4
        assert!((score.total - 99.4).abs() < 1e-9);
    }

    #[test]
    fn token_overlap_scores_partial() {
        let config = MatchConfig::default();
        let t = tx("PAYPAL ACMESUPPLIES LTD", -4500, date(2024, 3, 10));
        let d = doc(Some("Acme Widget Corporation"), Some(4500), Some(date(2024, 3, 10)));
        let score = WeightedScorer.score(&t, &d, &config).unwrap();
        // No whole-string containment, no token containment either way
        // except none; tokens: [paypal, acmesupplies] vs [acme, widget,
        // corporation] — "acmesupplies" contains "acme" → 1 / 3.
        assert!((score.description - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn short_tokens_are_ignored() {
        let config = MatchConfig::default();
        let t = tx("ABC LTD", -4500, date(2024, 3, 10));
        let d = doc(Some("XYZ INC"), Some(4500), Some(date(2024, 3, 10)));
        let score = WeightedScorer.score(&t, &d, &config).unwrap();
        // every token is <= 3 chars, so both token sets are empty
        assert_eq!(score.description, 0.0);
    }

    #[test]
    fn empty_vendor_falls_back_to_filename() {
        let config = MatchConfig::default();
        let t = tx("scan_0001.pdf charge", -4500, date(2024, 3, 10));
        let d = doc(Some("   "), Some(4500), Some(date(2024, 3, 10)));
        let score = WeightedScorer.score(&t, &d, &config).unwrap();
        assert_eq!(score.description, 100.0); // filename contained in description
    }
}
