pub mod author;
pub mod config;
pub mod error;
pub mod types;

pub use author::{Author, MAX_AUTHOR_LEN};
pub use config::TrackerConfig;
pub use error::TrackerError;
pub use types::{format_timestamp, normalize_timestamp, now, parse_timestamp};
