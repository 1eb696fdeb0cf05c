use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;
use validator::Validate;

use crate::access::{Actor, Owner, Resource, ResourceKind};
use crate::error::AppError;
use crate::validation::not_blank;

use super::utc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    #[default]
    Practice,
    Competition,
    Meeting,
    Other,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleType::Practice => "practice",
            ScheduleType::Competition => "competition",
            ScheduleType::Meeting => "meeting",
            ScheduleType::Other => "other",
        }
    }
}

impl FromStr for ScheduleType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "practice" => Ok(ScheduleType::Practice),
            "competition" => Ok(ScheduleType::Competition),
            "meeting" => Ok(ScheduleType::Meeting),
            "other" => Ok(ScheduleType::Other),
            _ => Err(AppError::Validation(format!("Unknown schedule type: {}", s))),
        }
    }
}

/// Times of day travel as "HH:MM". Seconds are accepted on input and dropped.
pub mod hhmm {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%H:%M";

    pub fn format(time: &NaiveTime) -> String {
        time.format(FORMAT).to_string()
    }

    pub fn parse(value: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(value, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .ok()
            .and_then(|t| t.with_second(0))
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid time of day '{}', expected HH:MM", raw)))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, de::Error};

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    D::Error::custom(format!("invalid time of day '{}', expected HH:MM", raw))
                }),
                None => Ok(None),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub location: String,
    #[serde(rename = "type")]
    pub schedule_type: ScheduleType,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbSchedule {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub schedule_type: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
}

fn stored_time(id: Option<i64>, value: Option<String>) -> Result<NaiveTime, AppError> {
    let raw = value.unwrap_or_default();
    hhmm::parse(&raw).ok_or_else(|| {
        AppError::Internal(format!(
            "Schedule {} has an unreadable time '{}'",
            id.unwrap_or_default(),
            raw
        ))
    })
}

impl TryFrom<DbSchedule> for Schedule {
    type Error = AppError;

    fn try_from(db: DbSchedule) -> Result<Self, Self::Error> {
        let date = db.date.ok_or_else(|| {
            AppError::Internal(format!("Schedule {} has no date", db.id.unwrap_or_default()))
        })?;
        let start_time = stored_time(db.id, db.start_time)?;
        let end_time = stored_time(db.id, db.end_time)?;
        let schedule_type = db
            .schedule_type
            .as_deref()
            .map(ScheduleType::from_str)
            .transpose()
            .map_err(|e| AppError::Internal(format!("Stored schedule is corrupt: {}", e)))?
            .unwrap_or_default();

        Ok(Self {
            id: db.id.unwrap_or_default(),
            title: db.title.unwrap_or_default(),
            description: db.description.unwrap_or_default(),
            date,
            start_time,
            end_time,
            location: db.location.unwrap_or_default(),
            schedule_type,
            created_by: db.created_by.unwrap_or_default(),
            created_at: utc(db.created_at),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SchedulePayload {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[validate(custom(function = "not_blank"))]
    pub location: String,
    #[serde(default, rename = "type")]
    pub schedule_type: ScheduleType,
    /// Accepted for client compatibility, always replaced by the acting user.
    #[serde(default)]
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SchedulePatch {
    #[validate(custom(function = "not_blank"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "hhmm::option::deserialize")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "hhmm::option::deserialize")]
    pub end_time: Option<NaiveTime>,
    #[validate(custom(function = "not_blank"))]
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub schedule_type: Option<ScheduleType>,
}

impl From<SchedulePayload> for SchedulePatch {
    fn from(payload: SchedulePayload) -> Self {
        Self {
            title: Some(payload.title),
            description: Some(payload.description),
            date: Some(payload.date),
            start_time: Some(payload.start_time),
            end_time: Some(payload.end_time),
            location: Some(payload.location),
            schedule_type: Some(payload.schedule_type),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: String,
    pub schedule_type: ScheduleType,
    pub created_by: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct ScheduleChanges {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: String,
    pub schedule_type: ScheduleType,
}

/// Inverted ranges are rejected. A zero-length slot is allowed but logged.
pub fn check_time_range(start: NaiveTime, end: NaiveTime) -> Result<(), AppError> {
    if end < start {
        return Err(AppError::Validation(format!(
            "end_time {} is before start_time {}",
            hhmm::format(&end),
            hhmm::format(&start)
        )));
    }
    if end == start {
        warn!(start = %hhmm::format(&start), "Schedule starts and ends at the same time");
    }
    Ok(())
}

impl Resource for Schedule {
    const KIND: ResourceKind = ResourceKind::Schedule;

    type Payload = SchedulePayload;
    type Patch = SchedulePatch;
    type New = NewSchedule;
    type Changes = ScheduleChanges;

    fn id(&self) -> i64 {
        self.id
    }

    fn owner(&self) -> Owner<'_> {
        Owner::User(self.created_by)
    }

    fn prepare_new(
        payload: SchedulePayload,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> Result<NewSchedule, AppError> {
        check_time_range(payload.start_time, payload.end_time)?;

        if let Some(claimed) = payload.created_by.filter(|claimed| *claimed != actor.id) {
            warn!(claimed_creator = %claimed, actor_id = %actor.id, "Discarding caller-supplied creator");
        }

        Ok(NewSchedule {
            title: payload.title.trim().to_string(),
            description: payload.description,
            date: payload.date,
            start_time: payload.start_time,
            end_time: payload.end_time,
            location: payload.location.trim().to_string(),
            schedule_type: payload.schedule_type,
            created_by: actor.id,
            created_at: now,
        })
    }

    fn prepare_changes(
        &self,
        patch: SchedulePatch,
        _actor: &Actor,
        _now: NaiveDateTime,
    ) -> Result<ScheduleChanges, AppError> {
        let start_time = patch.start_time.unwrap_or(self.start_time);
        let end_time = patch.end_time.unwrap_or(self.end_time);
        check_time_range(start_time, end_time)?;

        Ok(ScheduleChanges {
            title: patch
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| self.title.clone()),
            description: patch
                .description
                .unwrap_or_else(|| self.description.clone()),
            date: patch.date.unwrap_or(self.date),
            start_time,
            end_time,
            location: patch
                .location
                .map(|l| l.trim().to_string())
                .unwrap_or_else(|| self.location.clone()),
            schedule_type: patch.schedule_type.unwrap_or(self.schedule_type),
        })
    }
}
