pub mod announcement;
pub mod record;
pub mod schedule;

pub use announcement::*;
pub use record::*;
pub use schedule::*;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Timestamps are stored as naive UTC. A missing one reads as "now".
pub(crate) fn utc(dt: Option<NaiveDateTime>) -> DateTime<Utc> {
    dt.map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or_else(Utc::now)
}
