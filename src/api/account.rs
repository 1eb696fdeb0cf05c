use chrono::Utc;
use rocket::State;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::response::status::Created;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{NewMember, Permission, Role, SESSION_COOKIE, User, UserSession};
use crate::db::{
    authenticate_user, create_user, create_user_session, get_all_users, invalidate_session,
};
use crate::env::Settings;
use crate::error::AppError;
use crate::validation::not_blank;

use super::Body;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "not_blank"))]
    email: String,
    #[validate(custom(function = "not_blank"))]
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<User>,
    pub error: Option<String>,
}

/// The current user together with what the client may offer them.
#[derive(Serialize, Deserialize, Debug)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub can_post_announcements: bool,
    pub can_manage_schedules: bool,
    pub can_view_members: bool,
    pub can_register_members: bool,
}

impl From<User> for MeResponse {
    fn from(user: User) -> Self {
        Self {
            can_post_announcements: user.has_permission(Permission::PostAnnouncements),
            can_manage_schedules: user.has_permission(Permission::ManageSchedules),
            can_view_members: user.has_permission(Permission::ViewAllMembers),
            can_register_members: user.has_permission(Permission::RegisterMembers),
            user,
        }
    }
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Body<'_, LoginRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    settings: &State<Settings>,
) -> Result<Json<LoginResponse>, AppError> {
    let login = login?.into_inner();
    login.validate()?;

    let Some(user) = authenticate_user(db, &login.email, &login.password).await? else {
        warn!("Login rejected");
        return Ok(Json(LoginResponse {
            success: false,
            user: None,
            error: Some("Invalid email or password".to_string()),
        }));
    };

    let token = UserSession::generate_token();
    let expires_at = Utc::now() + chrono::Duration::hours(settings.session_ttl_hours);
    create_user_session(db, user.id, &token, expires_at.naive_utc()).await?;

    cookies.add_private(
        Cookie::build((SESSION_COOKIE, token))
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(rocket::time::Duration::hours(settings.session_ttl_hours)),
    );

    info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse {
        success: true,
        user: Some(user),
        error: None,
    }))
}

#[post("/logout")]
pub async fn api_logout(cookies: &CookieJar<'_>, db: &State<Pool<Sqlite>>) -> rocket::http::Status {
    let token = cookies
        .get_private(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());

    if let Some(token) = token {
        if let Err(err) = invalidate_session(db, &token).await {
            err.log_and_record("Invalidating session on logout");
        }
    }

    cookies.remove_private(Cookie::build(SESSION_COOKIE));

    rocket::http::Status::NoContent
}

#[get("/me")]
pub async fn api_me(user: User) -> Result<Json<MeResponse>, AppError> {
    user.require_permission(Permission::ViewOwnProfile)?;
    Ok(Json(MeResponse::from(user)))
}

#[post("/register", data = "<registration>")]
pub async fn api_register(
    registration: Body<'_, NewMember>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Created<Json<User>>, AppError> {
    user.require_permission(Permission::RegisterMembers)?;

    let member = registration?.into_inner().normalized();
    if member.role == Role::Admin {
        user.require_all_permissions(&[Permission::RegisterMembers, Permission::RegisterAdmins])?;
    }
    member.validate()?;

    let created = create_user(db, &member).await?;

    info!(registered_by = %user.id, user_id = %created.id, "Registered member");
    Ok(Created::new("/api/members").body(Json(created)))
}

#[get("/members")]
pub async fn api_members(user: User, db: &State<Pool<Sqlite>>) -> Result<Json<Vec<User>>, AppError> {
    user.require_permission(Permission::ViewAllMembers)?;

    Ok(Json(get_all_users(db).await?))
}
