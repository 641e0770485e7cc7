//! HTTP router and server wiring.
//!
//! The router is built separately from the server so tests can drive it over
//! in-memory stores; `new` wires the Postgres stores, the id generator, the
//! session caches, and the tower layers, then serves until ctrl-c.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

use crate::bootstrap;
use crate::cli::globals::GlobalArgs;
use crate::domain::storage::{PgAccountStore, PgBindingStore, PgCredentialStore};
use crate::domain::{AccountService, AccountStore};
use crate::idgen::IdWorker;
use crate::session::{SessionConfig, SessionManager};

pub mod handlers;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// All routes, without any state attached.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::health::health))
        .route("/accounts", post(handlers::accounts::create))
        .route(
            "/sessions",
            post(handlers::sessions::login).delete(handlers::sessions::logout),
        )
        .route("/sessions/me", get(handlers::sessions::me))
        .route("/registry/emails", post(handlers::registry::email_occupied))
        .route("/registry/names", post(handlers::registry::name_occupied))
        .route(
            "/registry/email_register_tokens",
            post(handlers::registry::acquire_register_token),
        )
}

/// Start the server.
///
/// # Errors
/// Returns an error when the database, schema, id generator, or listener
/// cannot be set up. Once serving, only ctrl-c stops it.
pub async fn new(
    port: u16,
    dsn: String,
    worker_id: u64,
    datacenter_id: u64,
    globals: &GlobalArgs,
) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    apply_schema(&pool).await?;

    // Bad worker/datacenter ids abort startup; issuing ids from a
    // misconfigured instance could collide with another one.
    let id_worker = Arc::new(
        IdWorker::new(worker_id, datacenter_id).context("Failed to configure the id generator")?,
    );

    let accounts: Arc<dyn AccountStore> = Arc::new(PgAccountStore::new(pool.clone()));
    let service = Arc::new(AccountService::new(
        id_worker,
        Arc::clone(&accounts),
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(PgBindingStore::new(pool.clone())),
    ));

    bootstrap::create_initial_account(&service, &globals.admin_secret).await?;

    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&service),
        SessionConfig::default(),
    ));
    let sweepers = sessions.spawn_sweepers();

    let app = router().layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(Arc::clone(&accounts)))
            .layer(Extension(Arc::clone(&service)))
            .layer(Extension(Arc::clone(&sessions)))
            .layer(Extension(pool)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    sweepers.shutdown().await;

    Ok(())
}

/// Apply the schema at startup. Every statement is `IF NOT EXISTS`, so this
/// is idempotent across restarts.
async fn apply_schema(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .context("Failed to apply database schema")?;
    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
