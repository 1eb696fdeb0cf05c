pub mod account;
pub mod announcements;
pub mod dashboard;
pub mod records;
pub mod schedules;

use rocket::Route;
use rocket::serde::json::{self, Json};

use crate::access::{Actor, Resource, ResourceAccess, authorize_create};
use crate::error::AppError;
use crate::store::{ResourceStore, SqliteStore};

/// A JSON body whose parse failure is reported by the handler, after the
/// authorization checks that must come first.
pub type Body<'r, T> = Result<Json<T>, json::Error<'r>>;

pub fn routes() -> Vec<Route> {
    routes![
        health,
        account::api_login,
        account::api_logout,
        account::api_me,
        account::api_register,
        account::api_members,
        dashboard::api_dashboard,
        announcements::api_list_announcements,
        announcements::api_get_announcement,
        announcements::api_create_announcement,
        announcements::api_replace_announcement,
        announcements::api_patch_announcement,
        announcements::api_delete_announcement,
        schedules::api_list_schedules,
        schedules::api_get_schedule,
        schedules::api_create_schedule,
        schedules::api_replace_schedule,
        schedules::api_patch_schedule,
        schedules::api_delete_schedule,
        records::api_list_records,
        records::api_get_record,
        records::api_create_record,
        records::api_replace_record,
        records::api_patch_record,
        records::api_delete_record,
    ]
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

/// Unwraps a create body once the actor is known to be allowed to create `R`.
pub(crate) fn create_body<R: Resource>(
    actor: &Actor,
    body: Body<'_, R::Payload>,
) -> Result<R::Payload, AppError> {
    authorize_create(R::KIND, actor)?;
    Ok(body?.into_inner())
}

/// Unwraps an update body. A malformed body on a missing or foreign row
/// reports the missing row or the denial, not the parse failure.
pub(crate) async fn update_body<R, T>(
    access: &ResourceAccess<'_, SqliteStore>,
    id: i64,
    actor: &Actor,
    body: Body<'_, T>,
) -> Result<T, AppError>
where
    R: Resource,
    SqliteStore: ResourceStore<R>,
{
    match body {
        Ok(json) => Ok(json.into_inner()),
        Err(err) => {
            access.check_mutation::<R>(id, actor).await?;
            Err(err.into())
        }
    }
}
