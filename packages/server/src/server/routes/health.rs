use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use sqlx::PgPool;

use crate::kernel::ServerDeps;
use crate::server::app::AppState;

const STORE_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: StoreHealth,
    pub workers: WorkerHealth,
}

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    /// `ok`, `error` or `disabled` (in-memory stores)
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_connections: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct WorkerHealth {
    pub dispatch: usize,
    pub validation: usize,
    pub reconcile: usize,
    pub template_recheck_secs: i64,
}

impl From<&ServerDeps> for WorkerHealth {
    fn from(deps: &ServerDeps) -> Self {
        Self {
            dispatch: deps.dispatch_pool.size(),
            validation: deps.validation_pool.size(),
            reconcile: deps.reconcile_pool.size(),
            template_recheck_secs: deps.template_recheck.num_seconds(),
        }
    }
}

async fn probe_store(pool: Option<&PgPool>) -> StoreHealth {
    let Some(pool) = pool else {
        return StoreHealth {
            status: "disabled",
            error: None,
            connections: None,
            idle_connections: None,
        };
    };

    let error = match tokio::time::timeout(
        STORE_PROBE_TIMEOUT,
        sqlx::query("SELECT 1").execute(pool),
    )
    .await
    {
        Ok(Ok(_)) => None,
        Ok(Err(e)) => Some(format!("Query failed: {}", e)),
        Err(_) => Some(format!(
            "Query timeout (>{}s)",
            STORE_PROBE_TIMEOUT.as_secs()
        )),
    };

    StoreHealth {
        status: if error.is_none() { "ok" } else { "error" },
        error,
        connections: Some(pool.size()),
        idle_connections: Some(pool.num_idle()),
    }
}

/// Liveness plus a store probe.
///
/// 503 when the database does not answer; the worker section echoes the
/// configured pool sizes so a misconfigured deployment shows up here.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = probe_store(state.db_pool.as_ref()).await;
    let (code, status) = if database.status == "error" {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            workers: WorkerHealth::from(state.deps.as_ref()),
        }),
    )
}
