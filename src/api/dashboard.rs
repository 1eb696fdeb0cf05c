use chrono::{Local, Utc};
use rocket::State;
use rocket::serde::json::Json;

use crate::auth::{Permission, User};
use crate::dashboard::{DashboardSummary, summarize};
use crate::error::AppError;
use crate::store::SqliteStore;

#[get("/dashboard")]
pub async fn api_dashboard(
    user: User,
    store: &State<SqliteStore>,
) -> Result<Json<DashboardSummary>, AppError> {
    user.require_permission(Permission::ViewClubContent)?;
    tracing::debug!(user_id = %user.id, "Building dashboard");

    // "Today" is the club's calendar day, i.e. the server's local date.
    let today = Local::now().date_naive();
    Ok(Json(summarize(store.inner(), today, Utc::now().naive_utc()).await?))
}
