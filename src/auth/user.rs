use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::access::Actor;
use crate::error::AppError;
use crate::validation::not_blank;

use super::{Permission, Role};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub student_id: String,
    pub name: String,
    pub grade: i64,
    pub class_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUser {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub student_id: Option<String>,
    pub name: Option<String>,
    pub grade: Option<i64>,
    pub class_name: Option<String>,
    pub role: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(user: DbUser) -> Result<Self, Self::Error> {
        let role = user.role.unwrap_or_default();
        let role = role
            .parse::<Role>()
            .map_err(|e| AppError::Internal(format!("Stored user has invalid role: {}", e)))?;

        Ok(Self {
            id: user.id.unwrap_or_default(),
            email: user.email.unwrap_or_default(),
            student_id: user.student_id.unwrap_or_default(),
            name: user.name.unwrap_or_default(),
            grade: user.grade.unwrap_or_default(),
            class_name: user.class_name.unwrap_or_default(),
            role,
            created_at: user
                .created_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
        })
    }
}

/// A member being registered by a coach or admin.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMember {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(custom(function = "not_blank"))]
    pub student_id: String,
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(range(min = 1, max = 6, message = "Grade must be between 1 and 6"))]
    pub grade: i64,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub role: Role,
}

impl NewMember {
    /// Emails compare case-insensitively; everything else is trimmed.
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_lowercase(),
            student_id: self.student_id.trim().to_string(),
            name: self.name.trim().to_string(),
            class_name: self.class_name.trim().to_string(),
            ..self
        }
    }
}

impl User {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), AppError> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.id,
                role = %self.role.as_str(),
                permission = ?permission,
                "Permission denied"
            );
            Err(AppError::Authorization(format!(
                "role '{}' lacks {:?}",
                self.role, permission
            )))
        }
    }

    pub fn require_all_permissions(&self, permissions: &[Permission]) -> Result<(), AppError> {
        for permission in permissions {
            self.require_permission(*permission)?;
        }
        Ok(())
    }

    /// The identity the resource access layer authorizes against.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            name: self.name.clone(),
            student_id: self.student_id.clone(),
            role: self.role,
        }
    }
}
