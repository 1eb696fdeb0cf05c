use chrono::NaiveDate;
use rocket::FromForm;
use rocket::State;
use rocket::response::status::{Created, NoContent};
use rocket::serde::json::Json;

use crate::access::ResourceAccess;
use crate::auth::{Permission, User};
use crate::error::AppError;
use crate::models::{Schedule, SchedulePatch, SchedulePayload, ScheduleType};
use crate::store::{Filter, SqliteStore};

use super::{Body, create_body, update_body};

#[derive(FromForm)]
pub struct ScheduleQuery {
    #[field(name = "type")]
    schedule_type: Option<String>,
    date: Option<String>,
}

impl ScheduleQuery {
    fn filter(&self) -> Result<Filter, AppError> {
        let mut filter = Filter::new();
        if let Some(schedule_type) = &self.schedule_type {
            filter = filter.eq(
                "schedule_type",
                schedule_type.parse::<ScheduleType>()?.as_str(),
            );
        }
        if let Some(date) = &self.date {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", date))
            })?;
            filter = filter.eq("date", date);
        }
        Ok(filter)
    }
}

#[get("/schedules?<query..>")]
pub async fn api_list_schedules(
    query: ScheduleQuery,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    user.require_permission(Permission::ViewClubContent)?;

    let access = ResourceAccess::new(store.inner());
    Ok(Json(access.list(query.filter()?).await?))
}

#[get("/schedules/<id>")]
pub async fn api_get_schedule(
    id: i64,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Json<Schedule>, AppError> {
    user.require_permission(Permission::ViewClubContent)?;

    let access = ResourceAccess::new(store.inner());
    Ok(Json(access.get(id).await?))
}

#[post("/schedules", data = "<payload>")]
pub async fn api_create_schedule(
    payload: Body<'_, SchedulePayload>,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Created<Json<Schedule>>, AppError> {
    let actor = user.actor();
    let payload = create_body::<Schedule>(&actor, payload)?;

    let access = ResourceAccess::new(store.inner());
    let created: Schedule = access.create(payload, &actor).await?;

    Ok(Created::new(format!("/api/schedules/{}", created.id)).body(Json(created)))
}

#[put("/schedules/<id>", data = "<payload>")]
pub async fn api_replace_schedule(
    id: i64,
    payload: Body<'_, SchedulePayload>,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Json<Schedule>, AppError> {
    let actor = user.actor();
    let access = ResourceAccess::new(store.inner());
    let payload = update_body::<Schedule, _>(&access, id, &actor, payload).await?;

    let patch = SchedulePatch::from(payload);
    Ok(Json(access.update(id, patch, &actor).await?))
}

#[patch("/schedules/<id>", data = "<patch>")]
pub async fn api_patch_schedule(
    id: i64,
    patch: Body<'_, SchedulePatch>,
    user: User,
    store: &State<SqliteStore>,
) -> Result<Json<Schedule>, AppError> {
    let actor = user.actor();
    let access = ResourceAccess::new(store.inner());
    let patch = update_body::<Schedule, _>(&access, id, &actor, patch).await?;

    Ok(Json(access.update(id, patch, &actor).await?))
}

#[delete("/schedules/<id>")]
pub async fn api_delete_schedule(
    id: i64,
    user: User,
    store: &State<SqliteStore>,
) -> Result<NoContent, AppError> {
    let access = ResourceAccess::new(store.inner());
    access.delete::<Schedule>(id, &user.actor()).await?;
    Ok(NoContent)
}
