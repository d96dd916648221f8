//! Text classifiers: match format, venue city, team names and toss.
//!
//! All classifiers are pure functions of their input plus the injected lookup
//! tables; none of them guess a value when the text is ambiguous.

pub mod format;
pub mod team;
pub mod toss;
pub mod venue;

pub use format::{classify_format, prediction_format};
pub use team::TeamDirectory;
pub use toss::{extract_toss, ExtractedToss};
pub use venue::StadiumDirectory;
