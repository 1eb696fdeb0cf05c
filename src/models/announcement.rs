use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;
use validator::Validate;

use crate::access::{Actor, Owner, Resource, ResourceKind};
use crate::error::AppError;
use crate::validation::{normalize_optional, not_blank, url_or_empty};

use super::utc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(AppError::Validation(format!("Unknown priority: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub author_name: String, // Snapshot of the author's name as of the last write
    pub priority: Priority,
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbAnnouncement {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub author_id: Option<i64>,
    pub author_name: Option<String>,
    pub priority: Option<String>,
    pub attachment_url: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl TryFrom<DbAnnouncement> for Announcement {
    type Error = AppError;

    fn try_from(db: DbAnnouncement) -> Result<Self, Self::Error> {
        let priority = db
            .priority
            .as_deref()
            .map(Priority::from_str)
            .transpose()
            .map_err(|e| AppError::Internal(format!("Stored announcement is corrupt: {}", e)))?
            .unwrap_or_default();

        Ok(Self {
            id: db.id.unwrap_or_default(),
            title: db.title.unwrap_or_default(),
            content: db.content.unwrap_or_default(),
            author_id: db.author_id.unwrap_or_default(),
            author_name: db.author_name.unwrap_or_default(),
            priority,
            attachment_url: db.attachment_url,
            created_at: utc(db.created_at),
            updated_at: utc(db.updated_at),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnnouncementPayload {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub content: String,
    #[serde(default)]
    pub priority: Priority,
    #[validate(custom(function = "url_or_empty"))]
    pub attachment_url: Option<String>,
    /// Accepted for client compatibility, always replaced by the acting user.
    #[serde(default)]
    pub author_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AnnouncementPatch {
    #[validate(custom(function = "not_blank"))]
    pub title: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub content: Option<String>,
    pub priority: Option<Priority>,
    /// An empty string removes the attachment.
    #[validate(custom(function = "url_or_empty"))]
    pub attachment_url: Option<String>,
}

impl From<AnnouncementPayload> for AnnouncementPatch {
    fn from(payload: AnnouncementPayload) -> Self {
        Self {
            title: Some(payload.title),
            content: Some(payload.content),
            priority: Some(payload.priority),
            attachment_url: Some(payload.attachment_url.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAnnouncement {
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub author_name: String,
    pub priority: Priority,
    pub attachment_url: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct AnnouncementChanges {
    pub title: String,
    pub content: String,
    pub author_name: String,
    pub priority: Priority,
    pub attachment_url: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl Resource for Announcement {
    const KIND: ResourceKind = ResourceKind::Announcement;

    type Payload = AnnouncementPayload;
    type Patch = AnnouncementPatch;
    type New = NewAnnouncement;
    type Changes = AnnouncementChanges;

    fn id(&self) -> i64 {
        self.id
    }

    fn owner(&self) -> Owner<'_> {
        Owner::User(self.author_id)
    }

    fn prepare_new(
        payload: AnnouncementPayload,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> Result<NewAnnouncement, AppError> {
        if let Some(claimed) = payload.author_id.filter(|claimed| *claimed != actor.id) {
            warn!(claimed_author = %claimed, actor_id = %actor.id, "Discarding caller-supplied author");
        }

        Ok(NewAnnouncement {
            title: payload.title.trim().to_string(),
            content: payload.content,
            author_id: actor.id,
            author_name: actor.name.clone(),
            priority: payload.priority,
            attachment_url: normalize_optional(payload.attachment_url),
            created_at: now,
        })
    }

    fn prepare_changes(
        &self,
        patch: AnnouncementPatch,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> Result<AnnouncementChanges, AppError> {
        let attachment_url = match patch.attachment_url {
            Some(url) => normalize_optional(Some(url)),
            None => self.attachment_url.clone(),
        };

        Ok(AnnouncementChanges {
            title: patch
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| self.title.clone()),
            content: patch.content.unwrap_or_else(|| self.content.clone()),
            author_name: actor.name.clone(),
            priority: patch.priority.unwrap_or(self.priority),
            attachment_url,
            updated_at: now,
        })
    }
}
