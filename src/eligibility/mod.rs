pub mod checks;
pub mod matcher;
pub mod registry;

pub use checks::{ClauseDecision, EligibilityReport};
pub use matcher::{EligibilityMatcher, MatchSummary, RoleOutcome};
pub use registry::{RoleRegistry, StudentDirectory};
