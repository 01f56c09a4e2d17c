use std::collections::HashMap;

use ledgerlink_core::{Document, Transaction};

use crate::breakdown::plan_breakdown;
use crate::config::MatchConfig;
use crate::score::{PairScorer, WeightedScorer};
use crate::select::{select_candidates, RunScope};
use crate::store::{CommitOutcome, ReconStore, StoreError};

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Accepted pairs produced by the selector.
    pub candidates: usize,
    /// Pairs committed this run.
    pub matched: usize,
    /// Pairs lost to a concurrent commit.
    pub conflicts: usize,
    /// Breakdown rows written this run.
    pub breakdown_entries: usize,
}

/// The one reconciliation engine every ingestion route invokes.
///
/// A run is a single sequential pass: load both unmatched pools, select
/// first-fit candidates, commit pair by pair, and explode itemizable
/// documents after each successful commit. Reconciliation is best-effort
/// and must never fail the ingestion that triggered it, so `run` returns
/// counters rather than a `Result` — every failure is logged, the pair in
/// question is dropped, and the pass keeps going.
pub struct ReconEngine<S = WeightedScorer> {
    config: MatchConfig,
    scorer: S,
}

impl ReconEngine<WeightedScorer> {
    pub fn new(config: MatchConfig) -> Self {
        ReconEngine {
            config,
            scorer: WeightedScorer,
        }
    }
}

impl Default for ReconEngine<WeightedScorer> {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

impl<S: PairScorer> ReconEngine<S> {
    pub fn with_scorer(config: MatchConfig, scorer: S) -> Self {
        ReconEngine { config, scorer }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub async fn run<T: ReconStore>(&self, store: &T, scope: &RunScope) -> RunSummary {
        let mut summary = RunSummary::default();

        let transactions = match store.unmatched_transactions().await {
            Ok(transactions) => transactions,
            Err(e) => {
                tracing::warn!("reconciliation skipped, transaction pool unavailable: {e}");
                return summary;
            }
        };
        let documents = match store.unmatched_documents(&scope.exclude_kinds).await {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!("reconciliation skipped, document pool unavailable: {e}");
                return summary;
            }
        };

        let candidates =
            select_candidates(&self.scorer, &self.config, &transactions, &documents, scope);
        summary.candidates = candidates.len();

        let tx_by_id: HashMap<i64, &Transaction> =
            transactions.iter().map(|t| (t.id, t)).collect();
        let doc_by_id: HashMap<i64, &Document> = documents.iter().map(|d| (d.id, d)).collect();

        for candidate in candidates {
            match store
                .commit_match(candidate.transaction_id, candidate.document_id)
                .await
            {
                Ok(CommitOutcome::Committed) => {
                    summary.matched += 1;
                    tracing::info!(
                        transaction_id = candidate.transaction_id,
                        document_id = candidate.document_id,
                        score = candidate.score.total,
                        "reconciled pair"
                    );

                    let (Some(parent), Some(document)) = (
                        tx_by_id.get(&candidate.transaction_id),
                        doc_by_id.get(&candidate.document_id),
                    ) else {
                        continue;
                    };
                    if document.kind.is_itemizable() {
                        match self.explode(store, document, parent).await {
                            Ok(written) => summary.breakdown_entries += written,
                            Err(e) => tracing::warn!(
                                document_id = document.id,
                                "breakdown insert failed, leaving match without detail: {e}"
                            ),
                        }
                    }
                }
                Ok(CommitOutcome::Conflict) => {
                    summary.conflicts += 1;
                    tracing::debug!(
                        transaction_id = candidate.transaction_id,
                        document_id = candidate.document_id,
                        "pair claimed by a concurrent run, skipping"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        transaction_id = candidate.transaction_id,
                        document_id = candidate.document_id,
                        "commit failed, skipping pair: {e}"
                    );
                }
            }
        }

        summary
    }

    async fn explode<T: ReconStore>(
        &self,
        store: &T,
        document: &Document,
        parent: &Transaction,
    ) -> Result<usize, StoreError> {
        if store.has_breakdown_entries(document.id).await? {
            return Ok(0);
        }
        let entries = plan_breakdown(document, parent);
        if entries.is_empty() {
            return Ok(0);
        }
        store.insert_breakdown_entries(&entries).await
    }
}
