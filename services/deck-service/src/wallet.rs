use axum::{Json, extract::State};
use dg_api_types::{WalletConnectResponse, WalletDisconnectResponse, WalletSelectRequest};

use crate::{ApiResult, AppState, bad_request, client_error};

pub(crate) async fn connect(State(state): State<AppState>) -> ApiResult<WalletConnectResponse> {
    let response = state.manager.connect().await.map_err(client_error)?;
    Ok(Json(response))
}

pub(crate) async fn select(
    State(state): State<AppState>,
    Json(request): Json<WalletSelectRequest>,
) -> ApiResult<WalletConnectResponse> {
    if request.address.trim().is_empty() {
        return Err(bad_request("address is required"));
    }
    let response = state
        .manager
        .select_account(request.address.trim())
        .await
        .map_err(client_error)?;
    Ok(Json(response))
}

pub(crate) async fn disconnect(State(state): State<AppState>) -> Json<WalletDisconnectResponse> {
    Json(state.manager.disconnect().await)
}
