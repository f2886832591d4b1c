#![cfg(feature = "web")]

//! Application state, routing and the server loop.

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    middleware,
    routing::{delete, get, post},
};
use axum_extra::extract::cookie::Key;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};

use crate::access::{SessionStore, resolve_session};
use crate::api;
use crate::charts::ChartRegistry;
use crate::config::{Config, MIN_SECRET_LEN};
use crate::datasets::DatasetRegistry;
use crate::error::{AppError, AppResult};
use crate::login;
use crate::pages::{self, Pages};
use crate::storage::FileStore;
use crate::users::UserDirectory;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Handles shared by every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    pub users: UserDirectory,
    pub datasets: DatasetRegistry,
    pub charts: ChartRegistry,
    pub sessions: SessionStore,
    pub pages: Arc<Pages>,
    key: Key,
}

impl AppState {
    /// Wire the registries around an open pool
    ///
    /// # Errors
    /// * `Internal` - the session secret is too short or a template is broken
    pub fn new(config: Config, pool: SqlitePool) -> AppResult<Self> {
        if config.session.secret.len() < MIN_SECRET_LEN {
            return Err(AppError::Internal(format!(
                "session secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        let key = Key::derive_from(&config.session.secret);

        let store = FileStore::new(config.uploads.dir.clone());
        let datasets = DatasetRegistry::new(pool.clone(), store.clone(), config.uploads.clone());

        Ok(Self {
            users: UserDirectory::new(pool.clone(), store),
            charts: ChartRegistry::new(pool.clone(), datasets.clone()),
            datasets,
            sessions: SessionStore::new(pool.clone()),
            pages: Arc::new(Pages::new()?),
            config: Arc::new(config),
            pool,
            key,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

/// Build the full router
///
/// Session resolution runs for every route; the handlers' extractors decide
/// whether an anonymous caller is redirected, refused, or let through.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.uploads.max_bytes + MULTIPART_OVERHEAD;

    Router::new()
        // Pages
        .route("/", get(login::landing))
        .route("/login", get(login::login_page).post(login::handle_login))
        .route("/signup", get(login::signup_page).post(login::handle_signup))
        .route("/logout", get(login::handle_logout))
        .route("/profile", get(login::profile_page).post(login::handle_profile))
        .route(
            "/change-password",
            get(login::change_password_page).post(login::handle_change_password),
        )
        .route("/shared/:token", get(pages::shared_chart))
        // JSON API
        .route("/dashboard", get(api::dashboard))
        .route("/datasets", get(api::list_datasets))
        .route(
            "/upload",
            post(api::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/download-dataset/:id", get(api::download_dataset))
        .route("/delete-dataset/:id", delete(api::delete_dataset))
        .route("/save-chart", post(api::save_chart))
        .route("/charts", get(api::list_charts))
        .route("/get-chart/:id", get(api::get_chart))
        .route("/delete-chart/:id", delete(api::delete_chart))
        .route("/share-chart/:id", post(api::share_chart))
        .route("/unshare-chart/:id", post(api::unshare_chart))
        .route("/health", get(api::health))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_session))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Connect, migrate and serve until Ctrl-C
///
/// # Arguments
/// * `config` - Validated configuration
///
/// # Returns
/// * `anyhow::Result<()>` - Error if the database, upload folder or listener
///   cannot be set up
pub async fn run(config: Config) -> anyhow::Result<()> {
    let pool = crate::db::connect(&config.database).await?;

    FileStore::new(config.uploads.dir.clone()).ensure_root().await?;
    info!(dir = %config.uploads.dir.display(), "upload folder ready");

    let address = config.bind_address();
    let state = AppState::new(config, pool)?;
    let app = router(state);

    let listener = TcpListener::bind(&address).await?;
    info!("Listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
