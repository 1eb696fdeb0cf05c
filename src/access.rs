//! Resource access layer.
//!
//! Every create, update and delete on an announcement, schedule or record goes
//! through [`ResourceAccess`], which consults the per-kind [`AccessPolicy`]
//! before touching the store. The layer keeps no state between calls.

use chrono::{NaiveDateTime, Utc};
use std::fmt;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::auth::{Permission, Role};
use crate::error::AppError;
use crate::store::{Filter, ResourceStore, SortDirection, SortKey};

/// The authenticated identity performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub student_id: String,
    pub role: Role,
}

impl Actor {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    pub fn owns(&self, owner: Owner<'_>) -> bool {
        match owner {
            Owner::User(id) => self.id == id,
            Owner::Student(student_id) => self.student_id == student_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Announcement,
    Schedule,
    Record,
}

/// Column that identifies who may mutate a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerField {
    AuthorId,
    CreatedBy,
    StudentId,
}

impl OwnerField {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerField::AuthorId => "author_id",
            OwnerField::CreatedBy => "created_by",
            OwnerField::StudentId => "student_id",
        }
    }
}

/// Owner value read off a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner<'a> {
    User(i64),
    Student(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    pub owner_field: OwnerField,
    pub create: Permission,
    /// `None` means ownership alone is enough to update or delete.
    pub mutate: Option<Permission>,
}

const ANNOUNCEMENT_ORDER: &[SortKey] = &[SortKey::new("created_at", SortDirection::Descending)];

const SCHEDULE_ORDER: &[SortKey] = &[
    SortKey::new("date", SortDirection::Ascending),
    SortKey::new("start_time", SortDirection::Ascending),
];

const RECORD_ORDER: &[SortKey] = &[SortKey::new("date", SortDirection::Descending)];

impl ResourceKind {
    pub const fn policy(self) -> AccessPolicy {
        match self {
            ResourceKind::Announcement => AccessPolicy {
                owner_field: OwnerField::AuthorId,
                create: Permission::PostAnnouncements,
                mutate: Some(Permission::PostAnnouncements),
            },
            ResourceKind::Schedule => AccessPolicy {
                owner_field: OwnerField::CreatedBy,
                create: Permission::ManageSchedules,
                mutate: Some(Permission::ManageSchedules),
            },
            ResourceKind::Record => AccessPolicy {
                owner_field: OwnerField::StudentId,
                create: Permission::LogRecords,
                mutate: None,
            },
        }
    }

    pub const fn default_order(self) -> &'static [SortKey] {
        match self {
            ResourceKind::Announcement => ANNOUNCEMENT_ORDER,
            ResourceKind::Schedule => SCHEDULE_ORDER,
            ResourceKind::Record => RECORD_ORDER,
        }
    }

    pub const fn table(self) -> &'static str {
        match self {
            ResourceKind::Announcement => "announcements",
            ResourceKind::Schedule => "schedules",
            ResourceKind::Record => "records",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Announcement => "announcement",
            ResourceKind::Schedule => "schedule",
            ResourceKind::Record => "record",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-authored row kind managed through [`ResourceAccess`].
///
/// `Payload` is the create input and `Patch` the update input. Both are
/// checked field-by-field with `validator` before `prepare_new` /
/// `prepare_changes` apply the cross-field rules and stamp server-owned
/// columns. Neither `New` nor `Changes` can carry an id, and `Changes`
/// carries no owner or creation timestamp, so an update cannot rewrite them.
pub trait Resource: Sized + Send + Sync {
    const KIND: ResourceKind;

    type Payload: Validate + Send;
    type Patch: Validate + Send;
    type New: Send;
    type Changes: Send;

    fn id(&self) -> i64;

    fn owner(&self) -> Owner<'_>;

    fn prepare_new(
        payload: Self::Payload,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> Result<Self::New, AppError>;

    fn prepare_changes(
        &self,
        patch: Self::Patch,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> Result<Self::Changes, AppError>;
}

pub fn authorize_create(kind: ResourceKind, actor: &Actor) -> Result<(), AppError> {
    let policy = kind.policy();
    if actor.has_permission(policy.create) {
        return Ok(());
    }

    warn!(
        kind = %kind,
        actor_id = %actor.id,
        role = %actor.role,
        "Create denied by role"
    );
    Err(AppError::Authorization(format!(
        "role '{}' may not create {}s",
        actor.role, kind
    )))
}

pub fn authorize_mutation<R: Resource>(row: &R, actor: &Actor) -> Result<(), AppError> {
    let policy = R::KIND.policy();

    if !actor.owns(row.owner()) {
        warn!(
            kind = %R::KIND,
            id = %row.id(),
            actor_id = %actor.id,
            owner_field = policy.owner_field.as_str(),
            "Mutation denied: actor is not the owner"
        );
        return Err(AppError::Authorization(format!(
            "only the owner may modify {} {}",
            R::KIND,
            row.id()
        )));
    }

    if let Some(permission) = policy.mutate {
        if !actor.has_permission(permission) {
            warn!(
                kind = %R::KIND,
                id = %row.id(),
                actor_id = %actor.id,
                role = %actor.role,
                "Mutation denied by role"
            );
            return Err(AppError::Authorization(format!(
                "role '{}' may not modify {}s",
                actor.role,
                R::KIND
            )));
        }
    }

    Ok(())
}

pub struct ResourceAccess<'a, S> {
    store: &'a S,
}

impl<'a, S> ResourceAccess<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    #[instrument(skip_all, fields(kind = %R::KIND))]
    pub async fn list<R>(&self, filter: Filter) -> Result<Vec<R>, AppError>
    where
        R: Resource,
        S: ResourceStore<R>,
    {
        self.store.query(&filter, R::KIND.default_order()).await
    }

    #[instrument(skip(self), fields(kind = %R::KIND))]
    pub async fn get<R>(&self, id: i64) -> Result<R, AppError>
    where
        R: Resource,
        S: ResourceStore<R>,
    {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} does not exist", R::KIND, id)))
    }

    #[instrument(skip_all, fields(kind = %R::KIND, actor_id = %actor.id))]
    pub async fn create<R>(&self, payload: R::Payload, actor: &Actor) -> Result<R, AppError>
    where
        R: Resource,
        S: ResourceStore<R>,
    {
        authorize_create(R::KIND, actor)?;
        payload.validate()?;

        let row = R::prepare_new(payload, actor, Utc::now().naive_utc())?;
        let created = self.store.insert(row).await?;

        info!(id = %created.id(), "Created {}", R::KIND);
        Ok(created)
    }

    /// Loads row `id` and checks that `actor` may update or delete it.
    pub async fn check_mutation<R>(&self, id: i64, actor: &Actor) -> Result<R, AppError>
    where
        R: Resource,
        S: ResourceStore<R>,
    {
        let existing = self.get::<R>(id).await?;
        authorize_mutation(&existing, actor)?;
        Ok(existing)
    }

    #[instrument(skip(self, patch, actor), fields(kind = %R::KIND, actor_id = %actor.id))]
    pub async fn update<R>(&self, id: i64, patch: R::Patch, actor: &Actor) -> Result<R, AppError>
    where
        R: Resource,
        S: ResourceStore<R>,
    {
        let existing = self.check_mutation::<R>(id, actor).await?;
        patch.validate()?;

        let changes = existing.prepare_changes(patch, actor, Utc::now().naive_utc())?;
        let updated = self.store.update_by_id(id, changes).await?;

        info!("Updated {}", R::KIND);
        Ok(updated)
    }

    #[instrument(skip(self, actor), fields(kind = %R::KIND, actor_id = %actor.id))]
    pub async fn delete<R>(&self, id: i64, actor: &Actor) -> Result<(), AppError>
    where
        R: Resource,
        S: ResourceStore<R>,
    {
        self.check_mutation::<R>(id, actor).await?;

        self.store.delete_by_id(id).await?;

        info!("Deleted {}", R::KIND);
        Ok(())
    }
}
