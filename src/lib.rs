pub mod cli;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod portal;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use eligibility::{EligibilityMatcher, MatchSummary};
pub use error::{PlacementError, Result};
pub use portal::Portal;
pub use storage::Database;
