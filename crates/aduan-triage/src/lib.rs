pub mod consent;
pub mod emergency;
pub mod engine;
pub mod knowledge;
pub mod offtopic;
pub mod scoring;
pub mod vault;

pub use engine::{Disposition, EngineConfig, SessionSummary, TriageEngine, TurnOutcome};
pub use scoring::IntentTier;
pub use vault::{start_eviction_task, SessionVault};
