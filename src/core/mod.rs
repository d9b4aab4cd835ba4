// Core algorithm exports
pub mod matcher;
pub mod reconciler;
pub mod scoring;
pub mod stage;

pub use matcher::{Matcher, RankingResult, QUALIFYING_THRESHOLD};
pub use reconciler::{reconcile, status_for_provider, Decision};
pub use scoring::{score_match, MatchWeights, GLOBAL_FOCUS};
pub use stage::stage_for_amount;
