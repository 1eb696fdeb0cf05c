use rocket::FromForm;
use rocket::State;
use rocket::response::status::{Created, NoContent};
use rocket::serde::json::Json;

use crate::access::ResourceAccess;
use crate::auth::{Permission, User};
use crate::error::AppError;
use crate::models::{Announcement, AnnouncementPatch, AnnouncementPayload, Priority};
use crate::store::{Filter, SqliteStore};

use super::{Body, create_body, update_body};

#[derive(FromForm)]
pub struct AnnouncementQuery {
    priority: Option<String>,
}

impl AnnouncementQuery {
    fn filter(&self) -> Result<Filter, AppError> {
        let mut filter = Filter::new();
        if let Some(priority) = &self.priority {
            filter = filter.eq("priority", priority.parse::<Priority>()?.as_str());
        }
        Ok(filter)
    }
}

#[get("/announcements?<query..>")]
pub async fn api_list_announcements(
    query: AnnouncementQuery,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Json<Vec<Announcement>>, AppError> {
    user.require_permission(Permission::ViewClubContent)?;

    let access = ResourceAccess::new(store.inner());
    Ok(Json(access.list(query.filter()?).await?))
}

#[get("/announcements/<id>")]
pub async fn api_get_announcement(
    id: i64,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Json<Announcement>, AppError> {
    user.require_permission(Permission::ViewClubContent)?;

    let access = ResourceAccess::new(store.inner());
    Ok(Json(access.get(id).await?))
}

#[post("/announcements", data = "<payload>")]
pub async fn api_create_announcement(
    payload: Body<'_, AnnouncementPayload>,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Created<Json<Announcement>>, AppError> {
    let actor = user.actor();
    let payload = create_body::<Announcement>(&actor, payload)?;

    let access = ResourceAccess::new(store.inner());
    let created: Announcement = access.create(payload, &actor).await?;

    Ok(Created::new(format!("/api/announcements/{}", created.id)).body(Json(created)))
}

#[put("/announcements/<id>", data = "<payload>")]
pub async fn api_replace_announcement(
    id: i64,
    payload: Body<'_, AnnouncementPayload>,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Json<Announcement>, AppError> {
    let actor = user.actor();
    let access = ResourceAccess::new(store.inner());
    let payload = update_body::<Announcement, _>(&access, id, &actor, payload).await?;

    let patch = AnnouncementPatch::from(payload);
    Ok(Json(access.update(id, patch, &actor).await?))
}

#[patch("/announcements/<id>", data = "<patch>")]
pub async fn api_patch_announcement(
    id: i64,
    patch: Body<'_, AnnouncementPatch>,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Json<Announcement>, AppError> {
    let actor = user.actor();
    let access = ResourceAccess::new(store.inner());
    let patch = update_body::<Announcement, _>(&access, id, &actor, patch).await?;

    Ok(Json(access.update(id, patch, &actor).await?))
}

#[delete("/announcements/<id>")]
pub async fn api_delete_announcement(
    id: i64,
    user: User,
    store: &State<SqliteStore>,
) -> Result<NoContent, AppError> {
    let access = ResourceAccess::new(store.inner());
    access.delete::<Announcement>(id, &user.actor()).await?;
    Ok(NoContent)
}
