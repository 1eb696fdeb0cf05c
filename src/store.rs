//! SQLite persistence for the user-authored resource kinds.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, instrument};

use crate::access::{Resource, ResourceKind};
use crate::error::AppError;
use crate::models::{
    Announcement, AnnouncementChanges, DbAnnouncement, DbRecord, DbSchedule, NewAnnouncement,
    NewRecord, NewSchedule, Record, RecordChanges, Schedule, ScheduleChanges, hhmm,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl SortKey {
    pub const fn new(column: &'static str, direction: SortDirection) -> Self {
        Self { column, direction }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Text(String),
    Date(NaiveDate),
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        FilterValue::Date(value)
    }
}

/// Conjunction of equality tests. Column names are compile-time constants,
/// only values are bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(&'static str, FilterValue)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: i64) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<FilterValue>) -> Self {
        self.clauses.push((column, value.into()));
        self
    }

    pub fn clauses(&self) -> &[(&'static str, FilterValue)] {
        &self.clauses
    }
}

#[rocket::async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync {
    async fn query(&self, filter: &Filter, order: &[SortKey]) -> Result<Vec<R>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<R>, AppError> {
        Ok(self.query(&Filter::by_id(id), &[]).await?.into_iter().next())
    }

    async fn insert(&self, row: R::New) -> Result<R, AppError>;

    /// Fails with `NotFound` when no row has `id`.
    async fn update_by_id(&self, id: i64, changes: R::Changes) -> Result<R, AppError>;

    /// Fails with `NotFound` when no row has `id`.
    async fn delete_by_id(&self, id: i64) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn fetch_rows<D, R>(
    pool: &SqlitePool,
    kind: ResourceKind,
    filter: &Filter,
    order: &[SortKey],
) -> Result<Vec<R>, AppError>
where
    D: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    R: TryFrom<D, Error = AppError>,
{
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM ");
    builder.push(kind.table());

    for (i, (column, value)) in filter.clauses().iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        builder.push(*column).push(" = ");
        match value {
            FilterValue::Int(v) => builder.push_bind(*v),
            FilterValue::Text(v) => builder.push_bind(v.clone()),
            FilterValue::Date(v) => builder.push_bind(*v),
        };
    }

    builder.push(" ORDER BY ");
    for key in order {
        builder
            .push(key.column)
            .push(" ")
            .push(key.direction.as_sql())
            .push(", ");
    }
    // Rows with equal sort keys keep insertion order relative to the last key.
    let tie_break = order
        .last()
        .map(|key| key.direction)
        .unwrap_or(SortDirection::Ascending);
    builder.push("id ").push(tie_break.as_sql());

    debug!(sql = %builder.sql(), "Running resource query");

    let rows = builder.build_query_as::<D>().fetch_all(pool).await?;
    rows.into_iter().map(R::try_from).collect()
}

fn missing(kind: ResourceKind, id: i64) -> AppError {
    AppError::NotFound(format!("{} {} does not exist", kind, id))
}

async fn delete_row(pool: &SqlitePool, kind: ResourceKind, id: i64) -> Result<(), AppError> {
    let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM ");
    builder.push(kind.table()).push(" WHERE id = ").push_bind(id);

    let result = builder.build().execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(missing(kind, id));
    }
    Ok(())
}

#[rocket::async_trait]
impl ResourceStore<Announcement> for SqliteStore {
    #[instrument(skip_all)]
    async fn query(&self, filter: &Filter, order: &[SortKey]) -> Result<Vec<Announcement>, AppError> {
        fetch_rows::<DbAnnouncement, Announcement>(&self.pool, ResourceKind::Announcement, filter, order)
            .await
    }

    #[instrument(skip_all)]
    async fn insert(&self, row: NewAnnouncement) -> Result<Announcement, AppError> {
        let db_row = sqlx::query_as::<_, DbAnnouncement>(
            r#"
            INSERT INTO announcements
                (title, content, author_id, author_name, priority, attachment_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&row.title)
        .bind(&row.content)
        .bind(row.author_id)
        .bind(&row.author_name)
        .bind(row.priority.as_str())
        .bind(&row.attachment_url)
        .bind(row.created_at)
        .bind(row.created_at)
        .fetch_one(&self.pool)
        .await?;

        Announcement::try_from(db_row)
    }

    #[instrument(skip(self, changes))]
    async fn update_by_id(
        &self,
        id: i64,
        changes: AnnouncementChanges,
    ) -> Result<Announcement, AppError> {
        let db_row = sqlx::query_as::<_, DbAnnouncement>(
            r#"
            UPDATE announcements
            SET title = ?, content = ?, author_name = ?, priority = ?, attachment_url = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(&changes.author_name)
        .bind(changes.priority.as_str())
        .bind(&changes.attachment_url)
        .bind(changes.updated_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        db_row
            .ok_or_else(|| missing(ResourceKind::Announcement, id))
            .and_then(Announcement::try_from)
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: i64) -> Result<(), AppError> {
        delete_row(&self.pool, ResourceKind::Announcement, id).await
    }
}

#[rocket::async_trait]
impl ResourceStore<Schedule> for SqliteStore {
    #[instrument(skip_all)]
    async fn query(&self, filter: &Filter, order: &[SortKey]) -> Result<Vec<Schedule>, AppError> {
        fetch_rows::<DbSchedule, Schedule>(&self.pool, ResourceKind::Schedule, filter, order).await
    }

    #[instrument(skip_all)]
    async fn insert(&self, row: NewSchedule) -> Result<Schedule, AppError> {
        let db_row = sqlx::query_as::<_, DbSchedule>(
            r#"
            INSERT INTO schedules
                (title, description, date, start_time, end_time, location, schedule_type, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&row.title)
        .bind(&row.description)
        .bind(row.date)
        .bind(hhmm::format(&row.start_time))
        .bind(hhmm::format(&row.end_time))
        .bind(&row.location)
        .bind(row.schedule_type.as_str())
        .bind(row.created_by)
        .bind(row.created_at)
        .fetch_one(&self.pool)
        .await?;

        Schedule::try_from(db_row)
    }

    #[instrument(skip(self, changes))]
    async fn update_by_id(&self, id: i64, changes: ScheduleChanges) -> Result<Schedule, AppError> {
        let db_row = sqlx::query_as::<_, DbSchedule>(
            r#"
            UPDATE schedules
            SET title = ?, description = ?, date = ?, start_time = ?, end_time = ?,
                location = ?, schedule_type = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.date)
        .bind(hhmm::format(&changes.start_time))
        .bind(hhmm::format(&changes.end_time))
        .bind(&changes.location)
        .bind(changes.schedule_type.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        db_row
            .ok_or_else(|| missing(ResourceKind::Schedule, id))
            .and_then(Schedule::try_from)
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: i64) -> Result<(), AppError> {
        delete_row(&self.pool, ResourceKind::Schedule, id).await
    }
}

#[rocket::async_trait]
impl ResourceStore<Record> for SqliteStore {
    #[instrument(skip_all)]
    async fn query(&self, filter: &Filter, order: &[SortKey]) -> Result<Vec<Record>, AppError> {
        fetch_rows::<DbRecord, Record>(&self.pool, ResourceKind::Record, filter, order).await
    }

    #[instrument(skip_all)]
    async fn insert(&self, row: NewRecord) -> Result<Record, AppError> {
        let db_row = sqlx::query_as::<_, DbRecord>(
            r#"
            INSERT INTO records
                (student_id, student_name, event, record_value, unit, date, location,
                 competition_name, notes, is_personal_best, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&row.student_id)
        .bind(&row.student_name)
        .bind(row.event.as_str())
        .bind(&row.record_value)
        .bind(row.unit.as_str())
        .bind(row.date)
        .bind(&row.location)
        .bind(&row.competition_name)
        .bind(&row.notes)
        .bind(row.is_personal_best)
        .bind(row.created_at)
        .fetch_one(&self.pool)
        .await?;

        Record::try_from(db_row)
    }

    #[instrument(skip(self, changes))]
    async fn update_by_id(&self, id: i64, changes: RecordChanges) -> Result<Record, AppError> {
        let db_row = sqlx::query_as::<_, DbRecord>(
            r#"
            UPDATE records
            SET event = ?, record_value = ?, unit = ?, date = ?, location = ?,
                competition_name = ?, notes = ?, is_personal_best = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(changes.event.as_str())
        .bind(&changes.record_value)
        .bind(changes.unit.as_str())
        .bind(changes.date)
        .bind(&changes.location)
        .bind(&changes.competition_name)
        .bind(&changes.notes)
        .bind(changes.is_personal_best)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        db_row
            .ok_or_else(|| missing(ResourceKind::Record, id))
            .and_then(Record::try_from)
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: i64) -> Result<(), AppError> {
        delete_row(&self.pool, ResourceKind::Record, id).await
    }
}
