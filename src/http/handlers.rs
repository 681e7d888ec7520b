//! Operator endpoints: labelled withdrawals and status.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use alloy::primitives::Address;

use crate::blockchain::{BlockchainError, NativeAmount};
use crate::context::AgentContext;
use crate::heartbeat::StatusSnapshot;
use crate::issuer::{WithdrawRequest, WithdrawStrategy};

/// Status label reported while the agent is serving.
pub const SERVING_STATUS: &str = "HUNTING";

/// `{ "error": "..." }` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<BlockchainError> for ApiError {
    fn from(err: BlockchainError) -> Self {
        match err {
            BlockchainError::InvalidAmount(_) => ApiError::bad_request(err.to_string()),
            other => ApiError::internal(other.to_string()),
        }
    }
}

/// Amount as sent by operators: a decimal string or a whole number.
///
/// JSON floats are refused so no value passes through binary floating point.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Decimal(String),
    Whole(u64),
}

impl AmountInput {
    fn parse(&self) -> Result<NativeAmount, BlockchainError> {
        match self {
            AmountInput::Decimal(s) => s.parse(),
            AmountInput::Whole(n) => Ok(NativeAmount::from_whole(*n)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawBody {
    #[serde(alias = "amountETH")]
    pub amount_in_native_units: AmountInput,
    #[serde(default)]
    pub destination: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResponse {
    pub success: bool,
    pub transaction_hash: String,
    pub nonce: u64,
    pub strategy: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub snapshot: StatusSnapshot,
    pub watcher: &'static str,
}

fn parse_destination(raw: Option<&str>) -> Result<Option<Address>, ApiError> {
    let Some(raw) = raw.map(|s| s.trim().trim_matches(['"', '\'']).trim()) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<Address>()
        .map(Some)
        .map_err(|e| ApiError::bad_request(format!("Invalid destination '{}': {}", raw, e)))
}

/// `POST /withdraw/{strategy}`
pub async fn withdraw(
    State(ctx): State<AgentContext>,
    Path(label): Path<String>,
    body: Result<Json<WithdrawBody>, JsonRejection>,
) -> Result<Json<WithdrawResponse>, ApiError> {
    let strategy: WithdrawStrategy = label
        .parse()
        .map_err(|e: crate::issuer::UnknownStrategy| ApiError::not_found(e.to_string()))?;

    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let amount = body.amount_in_native_units.parse()?;
    let destination = parse_destination(body.destination.as_deref())?;

    let request = WithdrawRequest {
        strategy,
        amount,
        destination,
    };

    match ctx.issuer.withdraw(&request).await {
        Ok(tx) => Ok(Json(WithdrawResponse {
            success: true,
            transaction_hash: tx.hash.to_string(),
            nonce: tx.nonce,
            strategy: strategy.as_str(),
        })),
        Err(e) => {
            tracing::error!(strategy = %strategy, error = %e, "Withdrawal failed");
            Err(e.into())
        }
    }
}

/// `GET /status`
pub async fn status(State(ctx): State<AgentContext>) -> Json<StatusResponse> {
    let snapshot = ctx.reporter.sample().await;
    Json(StatusResponse {
        status: SERVING_STATUS,
        snapshot,
        watcher: ctx.watcher_state().as_str(),
    })
}
