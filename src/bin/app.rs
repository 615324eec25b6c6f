use adapter::{database::connect_database_with, memory::InMemoryStore};
use anyhow::{Context, Result};
use api::route::routes;
use axum::Router;
use kernel::model::{auth::CreateToken, role::Role, user::event::CreateUser};
use kernel::repository::{auth::AuthRepository, user::UserRepository};
use registry::AppRegistry;
use shared::config::{AppConfig, StorageKind};
use shared::env::{which, Environment};
use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};
use tokio::net::TcpListener;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_logger()?;
    bootstrap().await
}

fn init_logger() -> Result<()> {
    let log_level = match which() {
        Environment::Development => "debug",
        Environment::Production => "info",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into());

    let subscriber = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(subscriber)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_headers(cors::Any)
        .allow_methods(cors::Any)
        .allow_origin(cors::Any)
}

async fn bootstrap() -> Result<()> {
    let app_config = AppConfig::new()?;
    let registry = match app_config.storage {
        StorageKind::Postgres => {
            let pool = connect_database_with(&app_config.database);
            pool.migrate()
                .await
                .context("failed to apply database migrations")?;
            AppRegistry::new(pool, app_config.rsvp)
        }
        StorageKind::Memory => {
            tracing::warn!("using in-memory storage, data is lost on shutdown");
            let store = Arc::new(InMemoryStore::new());
            seed_local_users(&store).await?;
            AppRegistry::in_memory(store)
        }
    };

    let app = Router::new()
        .merge(routes())
        .layer(cors())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(registry);

    let addr = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), app_config.server.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app)
        .await
        .context("Unexpected error happened in server")
        .inspect_err(|e| {
            tracing::error!(
                error.cause_chain = ?e,error.message = %e, "Unexpected error"
            )
        })
}

// インメモリ起動時は認証基盤がないため、動作確認用のユーザーとトークンを用意する
async fn seed_local_users(store: &InMemoryStore) -> Result<()> {
    for (name, role) in [("admin", Role::Admin), ("guest", Role::User)] {
        let user = UserRepository::create(
            store,
            CreateUser::new(name.into(), format!("{name}@localhost"), role),
        )
        .await?;
        let token = store.create_token(CreateToken::new(user.user_id)).await?;
        tracing::info!(user_name = name, access_token = %token.0, "seeded local user");
    }
    Ok(())
}
