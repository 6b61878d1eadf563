use axum::{
    Json,
    extract::{Path, State},
};
use dg_api_types::{
    Address, AddressExt, ContentId, OpenPackageRequest, PackageAssets, PurchaseRequest,
    TransactionOutcome,
};
use dg_chain_client::PendingTransaction;
use std::time::Duration;
use tracing::{info, warn};

use crate::{ApiError, ApiResult, AppState, client_error, forbidden, unauthorized};

const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);

/// The content key is read as the session signer, so the ownership check
/// must run for that same address. An explicit owner may only restate it.
async fn session_owner(state: &AppState, owner: Option<Address>) -> Result<Address, ApiError> {
    let signer = state
        .manager
        .signer()
        .await
        .map(|signer| signer.address())
        .ok_or_else(|| unauthorized("connect a wallet to open content"))?;
    match owner {
        Some(owner) if owner != signer => Err(forbidden(&format!(
            "owner {} is not the connected signer {}",
            owner.to_hex(),
            signer.to_hex()
        ))),
        _ => Ok(signer),
    }
}

/// Waits for inclusion. A transaction still pending after the timeout is
/// reported by hash alone.
async fn settle(pending: PendingTransaction) -> ApiResult<TransactionOutcome> {
    match tokio::time::timeout(CONFIRMATION_TIMEOUT, pending.wait()).await {
        Ok(outcome) => Ok(Json(outcome.map_err(client_error)?)),
        Err(_) => {
            warn!("transaction {} not confirmed yet", pending.hash());
            Ok(Json(TransactionOutcome {
                hash: pending.hash().to_owned(),
                block_hash: None,
                approximate: pending.is_approximate(),
            }))
        }
    }
}

pub(crate) async fn open(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<OpenPackageRequest>,
) -> ApiResult<PackageAssets> {
    let owner = session_owner(&state, request.owner).await?;
    let loader = state.manager.content_loader().await.map_err(client_error)?;
    let assets = loader
        .open_package(ContentId(id), owner)
        .await
        .map_err(client_error)?;
    Ok(Json(assets))
}

pub(crate) async fn claim(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<TransactionOutcome> {
    let gateway = state.manager.gateway().await.map_err(client_error)?;
    let pending = gateway.claim(ContentId(id)).await.map_err(client_error)?;
    info!("claim of deck {} submitted as {}", id, pending.hash());
    settle(pending).await
}

pub(crate) async fn purchase(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<PurchaseRequest>,
) -> ApiResult<TransactionOutcome> {
    let content_id = ContentId(id);
    let gateway = state.manager.gateway().await.map_err(client_error)?;
    let value = match request.value {
        Some(value) => value,
        None => gateway.content_price(content_id).await.map_err(client_error)?,
    };

    let pending = match request.referrer {
        Some(referrer) => gateway
            .purchase_with_referral(content_id, referrer, value)
            .await
            .map_err(client_error)?,
        None => gateway
            .purchase(content_id, value)
            .await
            .map_err(client_error)?,
    };
    info!("purchase of deck {} for {} submitted as {}", id, value, pending.hash());
    settle(pending).await
}
