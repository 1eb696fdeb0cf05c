use crate::{
    auth::{DbUser, DbUserSession, NewMember, Role, User, UserSession},
    env::BootstrapAdmin,
    error::AppError,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};

#[cfg(not(test))]
const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const BCRYPT_COST: u32 = 4;

const USER_COLUMNS: &str = "id, email, student_id, name, grade, class_name, role, created_at";

#[instrument(skip(pool))]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(user) => User::try_from(user),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

/// Returns the user when the email and password match, `None` otherwise.
#[instrument(skip_all)]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");
    let row = sqlx::query_as::<_, (i64, String)>("SELECT id, password FROM users WHERE email = ?")
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;

    let Some((id, hash)) = row else {
        return Ok(None);
    };

    match bcrypt::verify(password, &hash) {
        Ok(true) => get_user(pool, id).await.map(Some),
        Ok(false) => Ok(None),
        Err(err) => {
            warn!(user_id = %id, error = %err, "Stored password hash could not be verified");
            Ok(None)
        }
    }
}

#[instrument(skip_all, fields(student_id = %member.student_id, role = %member.role))]
pub async fn create_user(pool: &Pool<Sqlite>, member: &NewMember) -> Result<User, AppError> {
    info!("Creating new user");

    let existing = sqlx::query_as::<_, (String, String)>(
        "SELECT email, student_id FROM users WHERE email = ? OR student_id = ?",
    )
    .bind(&member.email)
    .bind(&member.student_id)
    .fetch_optional(pool)
    .await?;

    if let Some((email, _)) = existing {
        let message = if email == member.email {
            format!("Email '{}' is already registered", member.email)
        } else {
            format!("Student ID '{}' is already registered", member.student_id)
        };
        return Err(AppError::Conflict(message));
    }

    let hashed_password = bcrypt::hash(&member.password, BCRYPT_COST)?;

    let inserted = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        INSERT INTO users (email, password, student_id, name, grade, class_name, role)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(&member.email)
    .bind(hashed_password)
    .bind(&member.student_id)
    .bind(&member.name)
    .bind(member.grade)
    .bind(&member.class_name)
    .bind(member.role.as_str())
    .fetch_one(pool)
    .await
    .map_err(AppError::from);

    match inserted {
        Ok(row) => User::try_from(row),
        // Lost a race with a concurrent registration.
        Err(err) if err.is_unique_violation() => Err(AppError::Conflict(
            "Email or student ID is already registered".to_string(),
        )),
        Err(err) => Err(err),
    }
}

#[instrument(skip(pool))]
pub async fn get_all_users(pool: &Pool<Sqlite>) -> Result<Vec<User>, AppError> {
    let rows = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users ORDER BY grade ASC, name ASC, id ASC",
        USER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(User::try_from).collect()
}

#[instrument(skip(pool))]
pub async fn count_users(pool: &Pool<Sqlite>) -> Result<i64, AppError> {
    let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Seeds the first admin on an empty database. Returns the created user, if any.
#[instrument(skip_all)]
pub async fn ensure_bootstrap_admin(
    pool: &Pool<Sqlite>,
    bootstrap: Option<&BootstrapAdmin>,
) -> Result<Option<User>, AppError> {
    if count_users(pool).await? > 0 {
        return Ok(None);
    }

    let Some(bootstrap) = bootstrap else {
        warn!("No users exist and no bootstrap admin is configured; nobody can register members");
        return Ok(None);
    };

    let admin = NewMember {
        email: bootstrap.email.clone(),
        password: bootstrap.password.clone(),
        student_id: "ADMIN".to_string(),
        name: bootstrap.name.clone(),
        grade: 1,
        class_name: String::new(),
        role: Role::Admin,
    }
    .normalized();

    let user = create_user(pool, &admin).await?;
    info!(user_id = %user.id, "Created bootstrap admin");
    Ok(Some(user))
}

#[instrument(skip(pool, token))]
pub async fn create_user_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    token: &str,
    expires_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Creating user session");

    let res = sqlx::query(
        "INSERT INTO user_sessions (user_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(token)
    .bind(Utc::now().naive_utc())
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn get_session_by_token(pool: &Pool<Sqlite>, token: &str) -> Result<UserSession, AppError> {
    info!("Getting session by token");

    let session = sqlx::query_as::<_, DbUserSession>(
        "SELECT id, user_id, expires_at FROM user_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match session {
        Some(session) => Ok(UserSession::from(session)),
        _ => Err(AppError::Authentication(
            "Invalid session token".to_string(),
        )),
    }
}

#[instrument(skip(pool, token))]
pub async fn invalidate_session(pool: &Pool<Sqlite>, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    sqlx::query("DELETE FROM user_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn clean_expired_sessions(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
    info!("Cleaning expired sessions");

    let now = Utc::now().naive_utc();

    let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[instrument(skip(pool))]
pub async fn count_schedules_from(pool: &Pool<Sqlite>, from: NaiveDate) -> Result<i64, AppError> {
    let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM schedules WHERE date >= ?")
        .bind(from)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[instrument(skip(pool))]
pub async fn count_announcements_since(
    pool: &Pool<Sqlite>,
    since: NaiveDateTime,
) -> Result<i64, AppError> {
    let (count,) =
        sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM announcements WHERE created_at >= ?")
            .bind(since)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Counts records dated in `[from, until)`.
#[instrument(skip(pool))]
pub async fn count_records_between(
    pool: &Pool<Sqlite>,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<i64, AppError> {
    let (count,) =
        sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM records WHERE date >= ? AND date < ?")
            .bind(from)
            .bind(until)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
