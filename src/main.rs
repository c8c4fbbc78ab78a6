//! guess-game-back binary entrypoint wiring the HTTP surface, the remote game client and the answer store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use guess_game_back::{
    client::{GameClient, HttpGameApi},
    config::AppConfig,
    dao::{
        answer_store::{AnswerStore, InMemoryAnswerStore},
        storage::StorageError,
    },
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let api = HttpGameApi::new(config.game_api()).context("building game API client")?;
    let client = GameClient::new(Arc::new(api), config.retry_policy());
    let app_state = AppState::new(config, client);

    spawn_storage_supervisor(app_state.clone());
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the answer store backend from `STORAGE_BACKEND` and supervise it in the background.
fn spawn_storage_supervisor(state: SharedState) {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| default_backend().into());

    match backend.to_ascii_lowercase().as_str() {
        #[cfg(feature = "mongo-store")]
        "mongo" | "mongodb" => {
            let uri =
                env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
            let db_name = env::var("MONGO_DB").ok();
            info!("using MongoDB answer store");
            tokio::spawn(storage_supervisor::run(state, move || {
                connect_mongo(uri.clone(), db_name.clone())
            }));
        }
        #[cfg(feature = "couch-store")]
        "couch" | "couchdb" => {
            info!("using CouchDB answer store");
            tokio::spawn(storage_supervisor::run(state, connect_couch));
        }
        other => {
            if other != "memory" {
                warn!(backend = other, "unknown storage backend; falling back to memory");
            }
            info!("using in-memory answer store; learned answers are lost on exit");
            let store = InMemoryAnswerStore::new();
            tokio::spawn(storage_supervisor::run(state, move || {
                let store = store.clone();
                async move { Ok(Arc::new(store) as Arc<dyn AnswerStore>) }
            }));
        }
    }
}

fn default_backend() -> &'static str {
    if cfg!(feature = "mongo-store") {
        "mongo"
    } else if cfg!(feature = "couch-store") {
        "couch"
    } else {
        "memory"
    }
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo(
    uri: String,
    db_name: Option<String>,
) -> Result<Arc<dyn AnswerStore>, StorageError> {
    use guess_game_back::dao::answer_store::mongodb::{MongoAnswerStore, connect, ensure_indexes};

    let manager = connect(&uri, db_name.as_deref()).await?;
    ensure_indexes(&manager.database().await).await?;
    Ok(Arc::new(MongoAnswerStore::new(manager)))
}

#[cfg(feature = "couch-store")]
async fn connect_couch() -> Result<Arc<dyn AnswerStore>, StorageError> {
    use guess_game_back::dao::answer_store::couchdb::{CouchAnswerStore, CouchConfig};

    let config = CouchConfig::from_env()?;
    let store = CouchAnswerStore::connect(config).await?;
    Ok(Arc::new(store))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
