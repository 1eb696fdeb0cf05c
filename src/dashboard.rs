//! Aggregate counts for the membership dashboard.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::access::ResourceAccess;
use crate::db::{count_announcements_since, count_records_between, count_schedules_from, count_users};
use crate::error::AppError;
use crate::models::Schedule;
use crate::store::{Filter, SqliteStore};

const RECENT_ANNOUNCEMENT_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardSummary {
    pub todays_schedules: Vec<Schedule>,
    pub upcoming_schedule_count: i64,
    pub recent_announcement_count: i64,
    pub member_count: i64,
    pub records_this_month: i64,
}

/// First day of `date`'s month and the first day of the following month.
pub fn month_bounds(date: NaiveDate) -> Result<(NaiveDate, NaiveDate), AppError> {
    let start = date
        .with_day(1)
        .ok_or_else(|| AppError::Internal(format!("No first day of month for {}", date)))?;
    let end = start
        .checked_add_months(Months::new(1))
        .ok_or_else(|| AppError::Internal(format!("Month after {} is out of range", start)))?;
    Ok((start, end))
}

#[instrument(skip(store))]
pub async fn summarize(
    store: &SqliteStore,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<DashboardSummary, AppError> {
    let pool = store.pool();
    let (month_start, next_month) = month_bounds(today)?;

    let todays_schedules = ResourceAccess::new(store)
        .list::<Schedule>(Filter::new().eq("date", today))
        .await?;

    Ok(DashboardSummary {
        todays_schedules,
        upcoming_schedule_count: count_schedules_from(pool, today).await?,
        recent_announcement_count: count_announcements_since(
            pool,
            now - Duration::days(RECENT_ANNOUNCEMENT_DAYS),
        )
        .await?,
        member_count: count_users(pool).await?,
        records_this_month: count_records_between(pool, month_start, next_month).await?,
    })
}
