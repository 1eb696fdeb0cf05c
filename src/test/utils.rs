#[cfg(test)]
pub mod test_db {
    use crate::access::Actor;
    use crate::auth::{NewMember, Role, User};
    use crate::db::create_user;
    use crate::error::AppError;
    use crate::store::SqliteStore;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};
    use std::collections::HashMap;
    use std::sync::Once;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    pub fn init_test_tracing() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
                .with_test_writer()
                .try_init();
        });
    }

    pub fn email_for(student_id: &str) -> String {
        format!("{}@example.com", student_id.to_lowercase())
    }

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<NewMember>,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn student(self, student_id: &str, name: &str) -> Self {
            self.member(student_id, name, Role::Student, 1)
        }

        pub fn coach(self, student_id: &str, name: &str) -> Self {
            self.member(student_id, name, Role::Coach, 1)
        }

        pub fn admin(self, student_id: &str, name: &str) -> Self {
            self.member(student_id, name, Role::Admin, 1)
        }

        pub fn member(mut self, student_id: &str, name: &str, role: Role, grade: i64) -> Self {
            self.users.push(NewMember {
                email: email_for(student_id),
                password: STANDARD_PASSWORD.to_string(),
                student_id: student_id.to_string(),
                name: name.to_string(),
                grade,
                class_name: "A".to_string(),
                role,
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            init_test_tracing();

            // One connection, kept forever: every connection to sqlite::memory:
            // would otherwise open its own empty database.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            let mut users = HashMap::new();
            for member in &self.users {
                let user = create_user(&pool, member).await?;
                users.insert(member.student_id.clone(), user);
            }

            Ok(TestDb { pool, users })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub users: HashMap<String, User>,
    }

    impl TestDb {
        pub fn user(&self, student_id: &str) -> &User {
            self.users
                .get(student_id)
                .unwrap_or_else(|| panic!("No test user with student_id {}", student_id))
        }

        pub fn user_id(&self, student_id: &str) -> i64 {
            self.user(student_id).id
        }

        pub fn actor(&self, student_id: &str) -> Actor {
            self.user(student_id).actor()
        }

        pub fn store(&self) -> SqliteStore {
            SqliteStore::new(self.pool.clone())
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::test_db::{STANDARD_PASSWORD, TestDb, TestDbBuilder, email_for};
    use crate::env::Settings;
    use crate::init_rocket;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;

    /// Two students, two coaches and an admin.
    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .student("S1001", "Aoi Tanaka")
            .student("S1002", "Ren Suzuki")
            .coach("C2001", "Coach Sato")
            .coach("C2002", "Coach Ito")
            .admin("A3001", "Admin Kato")
            .build()
            .await
            .expect("Failed to build test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let rocket = init_rocket(test_db.pool.clone(), Settings::default());
        let client = Client::tracked(rocket)
            .await
            .expect("Failed to build rocket client");
        (client, test_db)
    }

    /// Logs in through the API; the tracked client keeps the session cookie.
    pub async fn login_test_user(client: &Client, student_id: &str) {
        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": email_for(student_id),
                    "password": STANDARD_PASSWORD,
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body: serde_json::Value = response.into_json().await.expect("login response body");
        assert_eq!(body["success"], true, "login failed for {}", student_id);
    }
}
