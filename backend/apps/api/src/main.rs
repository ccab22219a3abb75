//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request errors are `lucia::AuthError`.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router, http,
    http::{Method, header},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use lucia::{
    AuthService, CurrentSession, GitHubProvider, GoogleProvider, LuciaConfig, LuciaState,
    MemorySessionStore, MemoryUserStore, PgLuciaStore, ProviderCredentials, SessionStore,
    UserStore, lucia_router, presentation::dto::SessionResponse, require_auth, resolve_session,
};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,lucia=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Login configuration
    let config = if cfg!(debug_assertions) {
        LuciaConfig::development()
    } else {
        LuciaConfig::default()
    };
    let config = LuciaConfig {
        login_redirect: env::var("LOGIN_REDIRECT").unwrap_or(config.login_redirect),
        ..config
    };

    let cors = cors_layer();

    let app = match env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;

            tracing::info!("Connected to database");

            // Run migrations
            sqlx::migrate!("../../../database/migrations")
                .run(&pool)
                .await?;

            tracing::info!("Migrations completed");

            let store = Arc::new(PgLuciaStore::new(pool));

            // Startup cleanup: errors here should not prevent server startup
            match store.cleanup_expired().await {
                Ok(sessions) => {
                    tracing::info!(sessions_deleted = sessions, "Session cleanup completed");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Session cleanup failed, continuing anyway");
                }
            }

            let service = register_providers(AuthService::new(store.clone(), store))?;
            build_app(service, config)?
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, sessions and users are kept in memory");

            let service = register_providers(AuthService::new(
                Arc::new(MemoryUserStore::new()),
                Arc::new(MemorySessionStore::new()),
            ))?;
            build_app(service, config)?
        }
    };

    let app = app.layer(TraceLayer::new_for_http()).layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 31113));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Register every provider whose credentials are present in the environment
fn register_providers<U, S>(mut service: AuthService<U, S>) -> anyhow::Result<AuthService<U, S>>
where
    U: UserStore,
    S: SessionStore,
{
    if let Some(credentials) = ProviderCredentials::from_env_optional("GOOGLE")? {
        service = service.with_provider("google", Arc::new(GoogleProvider::new(credentials)));
        tracing::info!("Google login enabled");
    }
    if let Some(credentials) = ProviderCredentials::from_env_optional("GITHUB")? {
        service = service.with_provider("github", Arc::new(GitHubProvider::new(credentials)));
        tracing::info!("GitHub login enabled");
    }
    if service.provider_names().is_empty() {
        tracing::warn!("No OAuth provider configured; set GOOGLE_* or GITHUB_* credentials");
    }
    Ok(service)
}

fn build_app<U, S>(service: AuthService<U, S>, config: LuciaConfig) -> anyhow::Result<Router>
where
    U: UserStore + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    let state = LuciaState::new(service, config)?;

    let protected = Router::new()
        .route("/api/profile", get(profile))
        .route_layer(from_fn(require_auth));

    Ok(Router::new()
        .route("/", get(home))
        .merge(protected)
        .merge(lucia_router(state.clone()))
        .layer(from_fn_with_state(state, resolve_session::<U, S>)))
}

fn cors_layer() -> CorsLayer {
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_credentials(true)
}

/// GET /
async fn home(session: Option<CurrentSession>) -> String {
    match session {
        Some(CurrentSession(session)) => {
            format!("Welcome back, user {}!", session.user_id)
        }
        None => "Welcome to the public area!".to_string(),
    }
}

/// GET /api/profile
async fn profile(CurrentSession(session): CurrentSession) -> Json<SessionResponse> {
    Json(SessionResponse::from(session))
}
