use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::info;

use crate::chain::is_address;
use crate::error::{AppError, AppResult};

use super::MonitorContext;

#[derive(Debug, Deserialize)]
pub struct SessionAccountRequest {
    pub account: Option<String>,
}

/// key: renewal-session -> connected wallet refresh from the hosting app
pub async fn update_session_account(
    Extension(context): Extension<Arc<watch::Sender<MonitorContext>>>,
    Json(payload): Json<SessionAccountRequest>,
) -> AppResult<StatusCode> {
    let account = payload
        .account
        .map(|account| account.trim().to_string())
        .filter(|account| !account.is_empty());
    if let Some(account) = &account {
        if !is_address(account) {
            return Err(AppError::BadRequest(format!(
                "account {account} is not a wallet address"
            )));
        }
    }

    info!(connected = account.is_some(), "renewal session account updated");
    context.send_modify(|context| context.identity = account);
    Ok(StatusCode::NO_CONTENT)
}
