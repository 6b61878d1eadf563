mod content;
mod decks;
mod dev_keyring;
mod wallet;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};
use dg_api_types::{ChainInfoResponse, ClientError};
use dg_chain_client::InjectedProvider;
use dg_chain_rpc::{RpcInjectedProvider, WsConnector};
use dg_content::HttpFetcher;
use dg_wallet_core::{ClientConfig, WalletManager};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::dev_keyring::DevKeyring;

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);
pub(crate) type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) manager: Arc<WalletManager>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ClientConfig::from_env()?;
    let store = config.open_store()?;
    let injected: Option<Arc<dyn InjectedProvider>> = config
        .provider_url
        .clone()
        .map(|url| Arc::new(RpcInjectedProvider::new(url)) as Arc<dyn InjectedProvider>);

    let manager = WalletManager::new(
        config.clone(),
        Arc::new(WsConnector::new(config.ledger_url.clone())),
        Arc::new(DevKeyring::from_env()?),
        injected,
        Arc::new(HttpFetcher::default()),
        store,
    )?;

    if let Err(err) = manager.restore().await {
        warn!("could not restore previous wallet session: {}", err);
    }

    let state = AppState {
        manager: Arc::new(manager),
    };

    let addr = config.bind_addr;
    info!("deck-service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

pub(crate) fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/chain", get(chain))
        .route("/wallet/connect", post(wallet::connect))
        .route("/wallet/select", post(wallet::select))
        .route("/wallet/disconnect", post(wallet::disconnect))
        .route("/decks", get(decks::list))
        .route("/decks/owned", get(decks::owned))
        .route("/decks/cache", delete(decks::clear_cache))
        .route("/decks/{id}", get(decks::single))
        .route("/content/{id}/open", post(content::open))
        .route("/content/{id}/claim", post(content::claim))
        .route("/content/{id}/purchase", post(content::purchase))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "deck-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "deck-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn chain(State(state): State<AppState>) -> ApiResult<ChainInfoResponse> {
    let info = state.manager.chain_info().await.map_err(client_error)?;
    Ok(Json(info))
}

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub(crate) fn bad_request(message: &str) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, message)
}

pub(crate) fn unauthorized(message: &str) -> ApiError {
    error_response(StatusCode::UNAUTHORIZED, message)
}

pub(crate) fn forbidden(message: &str) -> ApiError {
    error_response(StatusCode::FORBIDDEN, message)
}

pub(crate) fn client_error(err: ClientError) -> ApiError {
    let status = match &err {
        ClientError::NotConnected(_) => StatusCode::UNAUTHORIZED,
        ClientError::UnsupportedOperation(_) | ClientError::Encoding(_) => StatusCode::BAD_REQUEST,
        ClientError::NotOwned { .. } => StatusCode::FORBIDDEN,
        ClientError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
        ClientError::Dispatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!("request failed: {}", err);
    }
    error_response(status, err.to_string())
}

#[cfg(test)]
pub(crate) mod testing;
