use std::collections::HashSet;

use ledgerlink_core::{Document, DocumentKind, Transaction};

use crate::config::MatchConfig;
use crate::score::{PairScore, PairScorer};

/// Per-call-site matching boundaries. Each ingestion route builds one of
/// these; the engine itself is route-agnostic.
#[derive(Debug, Clone, Default)]
pub struct RunScope {
    /// The document that originated the batch being reconciled. It never
    /// matches its own rows.
    pub origin_document_id: Option<i64>,
    /// Document kinds this call site never matches against.
    pub exclude_kinds: Vec<DocumentKind>,
}

impl RunScope {
    /// Scope for reconciling rows imported from a bank statement:
    /// excludes the statement itself and every other bank statement.
    pub fn statement(origin_document_id: i64) -> Self {
        RunScope {
            origin_document_id: Some(origin_document_id),
            exclude_kinds: vec![DocumentKind::BankStatement],
        }
    }

    /// Scope for reconciling after a receipt/invoice was ingested.
    pub fn document_intake() -> Self {
        RunScope {
            origin_document_id: None,
            exclude_kinds: vec![DocumentKind::BankStatement],
        }
    }
}

/// An accepted pairing, not yet committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCandidate {
    pub transaction_id: i64,
    pub document_id: i64,
    pub score: PairScore,
}

/// First-fit selection: newest transactions first, each scanning
/// documents newest-first and taking the first pair that clears the
/// acceptance threshold. At most one candidate per transaction and per
/// document; in-run claims are tracked in an explicit set rather than by
/// re-reading the store mid-scan.
pub fn select_candidates<S: PairScorer>(
    scorer: &S,
    config: &MatchConfig,
    transactions: &[Transaction],
    documents: &[Document],
    scope: &RunScope,
) -> Vec<MatchCandidate> {
    let mut txs: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| !t.is_matched() && !t.is_breakdown_entry)
        .collect();
    txs.sort_by(|a, b| b.date.cmp(&a.date));

    let mut docs: Vec<&Document> = documents
        .iter()
        .filter(|d| !d.is_matched())
        .filter(|d| scope.origin_document_id != Some(d.id))
        .filter(|d| !scope.exclude_kinds.contains(&d.kind))
        .collect();
    // Undated documents can never pass the date gate; they sort last so
    // the scan order stays deterministic anyway.
    docs.sort_by(|a, b| b.document_date.cmp(&a.document_date));

    let mut claimed: HashSet<i64> = HashSet::new();
    let mut accepted = Vec::new();

    for tx in txs {
        for doc in &docs {
            if claimed.contains(&doc.id) {
                continue;
            }
            let Some(score) = scorer.score(tx, doc, config) else {
                continue;
            };
            if score.total >= config.accept_threshold {
                claimed.insert(doc.id);
                accepted.push(MatchCandidate {
                    transaction_id: tx.id,
                    document_id: doc.id,
                    score,
                });
                // First fit: stop scanning documents for this transaction.
                break;
            }
        }
    }

    accepted
}
