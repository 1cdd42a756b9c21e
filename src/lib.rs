//! Car Scout Library
//!
//! Turns scraped car listings into a ranked shortlist: normalize,
//! deduplicate across sort orders, score against weighted profiles, rank.

pub mod archive;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod logging;
pub mod normalize;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod scorer;
pub mod settings;
pub mod sorter;
pub mod storage;
pub mod types;

pub use error::{ConfigError, NotifyError};
pub use pipeline::{rank_all_profiles, rank_listings, rank_profile, RankedRun};
pub use settings::Settings;
pub use sorter::{RankOptions, DEFAULT_TOP_N};
pub use types::*;
