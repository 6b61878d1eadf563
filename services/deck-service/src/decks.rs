use axum::{
    Json,
    extract::{Path, Query, State},
};
use dg_api_types::{Address, ContentId, Deck};
use serde::{Deserialize, Serialize};

use crate::{ApiResult, AppState, bad_request, client_error, unauthorized};

#[derive(Debug, Deserialize)]
pub(crate) struct DeckListQuery {
    pub(crate) use_cache: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnedDecksQuery {
    pub(crate) owner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClearCacheQuery {
    pub(crate) scope: Option<String>,
    pub(crate) all: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeckListResponse {
    pub(crate) decks: Vec<Deck>,
    pub(crate) scope: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClearCacheResponse {
    pub(crate) cleared: String,
}

pub(crate) async fn list(
    State(state): State<AppState>,
    Query(query): Query<DeckListQuery>,
) -> ApiResult<DeckListResponse> {
    let loader = state.manager.content_loader().await.map_err(client_error)?;
    let scope = state.manager.wallet_scope().await;
    let decks = loader
        .load_all_decks(query.use_cache.unwrap_or(true), scope.as_deref())
        .await;
    Ok(Json(DeckListResponse { decks, scope }))
}

pub(crate) async fn owned(
    State(state): State<AppState>,
    Query(query): Query<OwnedDecksQuery>,
) -> ApiResult<DeckListResponse> {
    let signer = state.manager.signer().await.map(|signer| signer.address());
    let owner = match query.owner.as_deref().map(str::trim).filter(|owner| !owner.is_empty()) {
        Some(raw) => raw
            .parse::<Address>()
            .map_err(|_| bad_request("owner must be a 20-byte hex address"))?,
        None => signer.ok_or_else(|| unauthorized("connect a wallet or pass ?owner="))?,
    };

    // Only the session wallet gets its own cache entry; other owners read
    // the global listing.
    let scope = if signer == Some(owner) {
        state.manager.wallet_scope().await
    } else {
        None
    };
    let loader = state.manager.content_loader().await.map_err(client_error)?;
    let decks = loader.load_owned_decks(owner, scope.as_deref()).await;
    Ok(Json(DeckListResponse { decks, scope }))
}

pub(crate) async fn single(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Deck> {
    let loader = state.manager.content_loader().await.map_err(client_error)?;
    let deck = loader.load_deck(ContentId(id)).await.map_err(client_error)?;
    Ok(Json(deck))
}

pub(crate) async fn clear_cache(
    State(state): State<AppState>,
    Query(query): Query<ClearCacheQuery>,
) -> ApiResult<ClearCacheResponse> {
    let loader = state.manager.content_loader().await.map_err(client_error)?;
    if query.all.unwrap_or(false) {
        loader.clear_deck_cache(None).await;
        return Ok(Json(ClearCacheResponse {
            cleared: "all".to_owned(),
        }));
    }

    let scope = match query.scope {
        Some(scope) if !scope.trim().is_empty() => scope,
        _ => state
            .manager
            .wallet_scope()
            .await
            .ok_or_else(|| bad_request("pass ?scope=, ?all=true, or connect a wallet"))?,
    };
    loader.clear_deck_cache(Some(&scope)).await;
    Ok(Json(ClearCacheResponse { cleared: scope }))
}
