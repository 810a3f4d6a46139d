use std::env;

use anyhow::{anyhow, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::PgConnection;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use workforce::auth::jwt::JwtService;
use workforce::config::{AppConfig, ProviderConfig};
use workforce::db::{self, PgPool};
use workforce::integrations::Integrations;
use workforce::routes;
use workforce::state::AppState;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const TEAM_EMAIL: &str = "lead@team.example";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    /// Builds the app against `TEST_DATABASE_URL` with every adapter mocked.
    pub async fn new() -> Result<Self> {
        Self::with_integrations(Integrations::mock()).await
    }

    #[allow(dead_code)]
    pub async fn with_integrations(integrations: Integrations) -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url,
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            cors_allowed_origin: None,
            payroll: ProviderConfig::mock(),
            background_check: ProviderConfig::mock(),
            background_check_package: "tasker_standard".to_string(),
            time_tracking: ProviderConfig::mock(),
            ai: ProviderConfig::mock(),
            ai_model: "test-model".to_string(),
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool, config, jwt, integrations);
        let router = routes::create_router(state.clone());

        Ok(Self { state, router })
    }

    pub async fn cleanup(&self) -> Result<()> {
        self.with_conn(|conn| truncate_all(conn)).await
    }

    pub fn team_token(&self) -> Result<String> {
        self.state
            .jwt
            .generate_token("team-lead", TEAM_EMAIL, "Team Lead", "team")
    }

    pub fn worker_token(&self, email: &str) -> Result<String> {
        self.state
            .jwt
            .generate_token(&format!("worker-{email}"), email, "Worker", "worker")
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, path, Some(serde_json::to_vec(payload)?), token)
            .await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<(StatusCode, Value)> {
        self.send(Method::PATCH, path, Some(serde_json::to_vec(payload)?), token)
            .await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, path, None, token).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, path, None, token).await
    }

    /// Creates an ONBOARDING contractor through the API and returns its id.
    #[allow(dead_code)]
    pub async fn create_contractor(&self, email: &str, hourly_rate: f64) -> Result<String> {
        let token = self.team_token()?;
        let (status, body) = self
            .post_json(
                "/api/contractors",
                &serde_json::json!({
                    "firstName": "Grace",
                    "lastName": "Hopper",
                    "email": email,
                    "country": "United States",
                    "hourlyRate": hourly_rate,
                    "skills": ["annotation"]
                }),
                Some(&token),
            )
            .await?;
        if status != StatusCode::CREATED {
            return Err(anyhow!("contractor create failed ({status}): {body}"));
        }
        Ok(str_field(&body, "id").to_string())
    }

    #[allow(dead_code)]
    pub async fn create_project(&self, code: &str, budget: Option<f64>) -> Result<String> {
        let token = self.team_token()?;
        let (status, body) = self
            .post_json(
                "/api/projects",
                &serde_json::json!({
                    "name": format!("Project {code}"),
                    "code": code,
                    "client": "Acme Labs",
                    "budget": budget
                }),
                Some(&token),
            )
            .await?;
        if status != StatusCode::CREATED {
            return Err(anyhow!("project create failed ({status}): {body}"));
        }
        Ok(str_field(&body, "id").to_string())
    }

    #[allow(dead_code)]
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        token: Option<&str>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(path);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(body.map(Body::from).unwrap_or_else(Body::empty))?;
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response");

        let status = response.status();
        let bytes = body_to_vec(response.into_body()).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| {
                format!(
                    "response was not JSON ({status}): {}",
                    String::from_utf8_lossy(&bytes)
                )
            })?
        };
        Ok((status, value))
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

/// Reads a string field, failing the test with the whole body when absent.
#[allow(dead_code)]
pub fn str_field<'a>(value: &'a Value, field: &str) -> &'a str {
    value[field]
        .as_str()
        .unwrap_or_else(|| panic!("missing string field {field} in {value}"))
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        db::run_migrations(&pool)?;
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE payment_time_entries, payments, time_entries, project_assignments, \
         projects, documents, contractor_notes, contractors, application_notes, applications, \
         jobs RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
