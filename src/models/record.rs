use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use validator::Validate;

use crate::access::{Actor, Owner, Resource, ResourceKind};
use crate::error::AppError;
use crate::validation::{normalize_optional, not_blank};

use super::utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum TrackEvent {
    Sprint100,
    Sprint200,
    Sprint400,
    Run800,
    Run1500,
    Run3000,
    Run5000,
    Hurdles110,
    Hurdles400,
    Steeplechase3000,
    HighJump,
    PoleVault,
    LongJump,
    TripleJump,
    ShotPut,
    HammerThrow,
    JavelinThrow,
    DiscusThrow,
}

// (event, canonical code, label used by the club's paper sheets)
const EVENT_CATALOGUE: &[(TrackEvent, &str, &str)] = &[
    (TrackEvent::Sprint100, "100m", "100m"),
    (TrackEvent::Sprint200, "200m", "200m"),
    (TrackEvent::Sprint400, "400m", "400m"),
    (TrackEvent::Run800, "800m", "800m"),
    (TrackEvent::Run1500, "1500m", "1500m"),
    (TrackEvent::Run3000, "3000m", "3000m"),
    (TrackEvent::Run5000, "5000m", "5000m"),
    (TrackEvent::Hurdles110, "110mH", "110mH"),
    (TrackEvent::Hurdles400, "400mH", "400mH"),
    (TrackEvent::Steeplechase3000, "3000mSC", "3000mSC"),
    (TrackEvent::HighJump, "high_jump", "走高跳"),
    (TrackEvent::PoleVault, "pole_vault", "棒高跳"),
    (TrackEvent::LongJump, "long_jump", "走幅跳"),
    (TrackEvent::TripleJump, "triple_jump", "三段跳"),
    (TrackEvent::ShotPut, "shot_put", "砲丸投"),
    (TrackEvent::HammerThrow, "hammer_throw", "ハンマー投"),
    (TrackEvent::JavelinThrow, "javelin_throw", "やり投"),
    (TrackEvent::DiscusThrow, "discus_throw", "円盤投"),
];

impl TrackEvent {
    pub fn as_str(&self) -> &'static str {
        EVENT_CATALOGUE
            .iter()
            .find(|(event, _, _)| event == self)
            .map(|(_, code, _)| *code)
            .unwrap_or_default()
    }

    /// Jumps and throws are measured; everything else is timed.
    pub fn is_field_event(&self) -> bool {
        matches!(
            self,
            TrackEvent::HighJump
                | TrackEvent::PoleVault
                | TrackEvent::LongJump
                | TrackEvent::TripleJump
                | TrackEvent::ShotPut
                | TrackEvent::HammerThrow
                | TrackEvent::JavelinThrow
                | TrackEvent::DiscusThrow
        )
    }
}

impl FromStr for TrackEvent {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EVENT_CATALOGUE
            .iter()
            .find(|(_, code, label)| *code == s || *label == s)
            .map(|(event, _, _)| *event)
            .ok_or_else(|| AppError::Validation(format!("Unknown event: {}", s)))
    }
}

impl TryFrom<String> for TrackEvent {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TrackEvent> for &'static str {
    fn from(event: TrackEvent) -> Self {
        event.as_str()
    }
}

impl fmt::Display for TrackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Seconds,
    Meters,
    Minutes,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Seconds => "seconds",
            Unit::Meters => "meters",
            Unit::Minutes => "minutes",
        }
    }
}

impl FromStr for Unit {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seconds" => Ok(Unit::Seconds),
            "meters" => Ok(Unit::Meters),
            "minutes" => Ok(Unit::Minutes),
            _ => Err(AppError::Validation(format!("Unknown unit: {}", s))),
        }
    }
}

/// Field events are normally measured in meters and running events timed.
/// Marks are free text ("10.95w", "2:05.30"), so a mismatch is only logged.
pub fn is_usual_unit(event: TrackEvent, unit: Unit) -> bool {
    event.is_field_event() == (unit == Unit::Meters)
}

fn note_unusual_unit(event: TrackEvent, unit: Unit) {
    if !is_usual_unit(event, unit) {
        warn!(event = %event, unit = unit.as_str(), "Record stored with an unusual unit for its event");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: i64,
    pub student_id: String,
    pub student_name: String, // Snapshot taken when the result was logged
    pub event: TrackEvent,
    pub record_value: String,
    pub unit: Unit,
    pub date: NaiveDate,
    pub location: String,
    pub competition_name: Option<String>,
    pub notes: Option<String>,
    pub is_personal_best: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbRecord {
    pub id: Option<i64>,
    pub student_id: Option<String>,
    pub student_name: Option<String>,
    pub event: Option<String>,
    pub record_value: Option<String>,
    pub unit: Option<String>,
    pub date: Option<NaiveDate>,
    pub location: Option<String>,
    pub competition_name: Option<String>,
    pub notes: Option<String>,
    pub is_personal_best: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
}

impl TryFrom<DbRecord> for Record {
    type Error = AppError;

    fn try_from(db: DbRecord) -> Result<Self, Self::Error> {
        let id = db.id.unwrap_or_default();
        let corrupt = |what: &str| AppError::Internal(format!("Record {} has {}", id, what));

        let event = db
            .event
            .as_deref()
            .ok_or_else(|| corrupt("no event"))?
            .parse::<TrackEvent>()
            .map_err(|_| corrupt("an unknown event"))?;
        let unit = db
            .unit
            .as_deref()
            .ok_or_else(|| corrupt("no unit"))?
            .parse::<Unit>()
            .map_err(|_| corrupt("an unknown unit"))?;
        let date = db.date.ok_or_else(|| corrupt("no date"))?;

        Ok(Self {
            id,
            student_id: db.student_id.unwrap_or_default(),
            student_name: db.student_name.unwrap_or_default(),
            event,
            record_value: db.record_value.unwrap_or_default(),
            unit,
            date,
            location: db.location.unwrap_or_default(),
            competition_name: db.competition_name,
            notes: db.notes,
            is_personal_best: db.is_personal_best.unwrap_or_default(),
            created_at: utc(db.created_at),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordPayload {
    pub event: TrackEvent,
    #[validate(custom(function = "not_blank"))]
    pub record_value: String,
    pub unit: Unit,
    pub date: NaiveDate,
    #[serde(default)]
    pub location: String,
    pub competition_name: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_personal_best: bool,
    /// Accepted for client compatibility, always replaced by the acting user.
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub student_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RecordPatch {
    pub event: Option<TrackEvent>,
    #[validate(custom(function = "not_blank"))]
    pub record_value: Option<String>,
    pub unit: Option<Unit>,
    pub date: Option<NaiveDate>,
    pub location: Option<String>,
    /// An empty string clears the competition name.
    pub competition_name: Option<String>,
    /// An empty string clears the notes.
    pub notes: Option<String>,
    pub is_personal_best: Option<bool>,
}

impl From<RecordPayload> for RecordPatch {
    fn from(payload: RecordPayload) -> Self {
        Self {
            event: Some(payload.event),
            record_value: Some(payload.record_value),
            unit: Some(payload.unit),
            date: Some(payload.date),
            location: Some(payload.location),
            competition_name: Some(payload.competition_name.unwrap_or_default()),
            notes: Some(payload.notes.unwrap_or_default()),
            is_personal_best: Some(payload.is_personal_best),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewRecord {
    pub student_id: String,
    pub student_name: String,
    pub event: TrackEvent,
    pub record_value: String,
    pub unit: Unit,
    pub date: NaiveDate,
    pub location: String,
    pub competition_name: Option<String>,
    pub notes: Option<String>,
    pub is_personal_best: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct RecordChanges {
    pub event: TrackEvent,
    pub record_value: String,
    pub unit: Unit,
    pub date: NaiveDate,
    pub location: String,
    pub competition_name: Option<String>,
    pub notes: Option<String>,
    pub is_personal_best: bool,
}

impl Resource for Record {
    const KIND: ResourceKind = ResourceKind::Record;

    type Payload = RecordPayload;
    type Patch = RecordPatch;
    type New = NewRecord;
    type Changes = RecordChanges;

    fn id(&self) -> i64 {
        self.id
    }

    fn owner(&self) -> Owner<'_> {
        Owner::Student(&self.student_id)
    }

    fn prepare_new(
        payload: RecordPayload,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> Result<NewRecord, AppError> {
        let record_value = payload.record_value.trim().to_string();
        note_unusual_unit(payload.event, payload.unit);

        let spoofed = payload
            .student_id
            .as_deref()
            .is_some_and(|claimed| claimed != actor.student_id)
            || payload
                .student_name
                .as_deref()
                .is_some_and(|claimed| claimed != actor.name);
        if spoofed {
            warn!(actor_id = %actor.id, "Discarding caller-supplied student identity");
        }

        Ok(NewRecord {
            student_id: actor.student_id.clone(),
            student_name: actor.name.clone(),
            event: payload.event,
            record_value,
            unit: payload.unit,
            date: payload.date,
            location: payload.location.trim().to_string(),
            competition_name: normalize_optional(payload.competition_name),
            notes: normalize_optional(payload.notes),
            is_personal_best: payload.is_personal_best,
            created_at: now,
        })
    }

    fn prepare_changes(
        &self,
        patch: RecordPatch,
        _actor: &Actor,
        _now: NaiveDateTime,
    ) -> Result<RecordChanges, AppError> {
        let event = patch.event.unwrap_or(self.event);
        let unit = patch.unit.unwrap_or(self.unit);
        let record_value = patch
            .record_value
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| self.record_value.clone());
        note_unusual_unit(event, unit);

        Ok(RecordChanges {
            event,
            record_value,
            unit,
            date: patch.date.unwrap_or(self.date),
            location: patch
                .location
                .map(|l| l.trim().to_string())
                .unwrap_or_else(|| self.location.clone()),
            competition_name: match patch.competition_name {
                Some(name) => normalize_optional(Some(name)),
                None => self.competition_name.clone(),
            },
            notes: match patch.notes {
                Some(notes) => normalize_optional(Some(notes)),
                None => self.notes.clone(),
            },
            is_personal_best: patch.is_personal_best.unwrap_or(self.is_personal_best),
        })
    }
}
