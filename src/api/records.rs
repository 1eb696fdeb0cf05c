use rocket::FromForm;
use rocket::State;
use rocket::response::status::{Created, NoContent};
use rocket::serde::json::Json;

use crate::access::ResourceAccess;
use crate::auth::{Permission, User};
use crate::error::AppError;
use crate::models::{Record, RecordPatch, RecordPayload, TrackEvent};
use crate::store::{Filter, SqliteStore};

use super::{Body, create_body, update_body};

#[derive(FromForm)]
pub struct RecordQuery {
    event: Option<String>,
    student_id: Option<String>,
}

impl RecordQuery {
    fn filter(&self) -> Result<Filter, AppError> {
        let mut filter = Filter::new();
        if let Some(event) = &self.event {
            // Aliases resolve to the stored code.
            filter = filter.eq("event", event.parse::<TrackEvent>()?.as_str());
        }
        if let Some(student_id) = &self.student_id {
            filter = filter.eq("student_id", student_id.trim());
        }
        Ok(filter)
    }
}

#[get("/records?<query..>")]
pub async fn api_list_records(
    query: RecordQuery,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Json<Vec<Record>>, AppError> {
    user.require_permission(Permission::ViewClubContent)?;

    let access = ResourceAccess::new(store.inner());
    Ok(Json(access.list(query.filter()?).await?))
}

#[get("/records/<id>")]
pub async fn api_get_record(
    id: i64,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Json<Record>, AppError> {
    user.require_permission(Permission::ViewClubContent)?;

    let access = ResourceAccess::new(store.inner());
    Ok(Json(access.get(id).await?))
}

#[post("/records", data = "<payload>")]
pub async fn api_create_record(
    payload: Body<'_, RecordPayload>,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Created<Json<Record>>, AppError> {
    let actor = user.actor();
    let payload = create_body::<Record>(&actor, payload)?;

    let access = ResourceAccess::new(store.inner());
    let created: Record = access.create(payload, &actor).await?;

    Ok(Created::new(format!("/api/records/{}", created.id)).body(Json(created)))
}

#[put("/records/<id>", data = "<payload>")]
pub async fn api_replace_record(
    id: i64,
    payload: Body<'_, RecordPayload>,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Json<Record>, AppError> {
    let actor = user.actor();
    let access = ResourceAccess::new(store.inner());
    let payload = update_body::<Record, _>(&access, id, &actor, payload).await?;

    let patch = RecordPatch::from(payload);
    Ok(Json(access.update(id, patch, &actor).await?))
}

#[patch("/records/<id>", data = "<patch>")]
pub async fn api_patch_record(
    id: i64,
    patch: Body<'_, RecordPatch>,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Json<Record>, AppError> {
    let actor = user.actor();
    let access = ResourceAccess::new(store.inner());
    let patch = update_body::<Record, _>(&access, id, &actor, patch).await?;

    Ok(Json(access.update(id, patch, &actor).await?))
}

#[delete("/records/<id>")]
pub async fn api_delete_record(
    id: i64,
    user: User,
    store: &State<SqliteStore>,
) -> Result<NoContent, AppError> {
    let access = ResourceAccess::new(store.inner());
    access.delete::<Record>(id, &user.actor()).await?;
    Ok(NoContent)
}
