pub mod breakdown;
pub mod config;
pub mod engine;
pub mod score;
pub mod select;
pub mod store;

pub use breakdown::plan_breakdown;
pub use config::{ConfigError, MatchConfig};
pub use engine::{ReconEngine, RunSummary};
pub use score::{PairScore, PairScorer, WeightedScorer};
pub use select::{select_candidates, MatchCandidate, RunScope};
pub use store::{CommitOutcome, MemoryStore, ReconStore, StoreError};
