use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Bitcoin Core error codes the gateway branches on, from `rpc/protocol.h`.
/// Anything else is `Other` and keeps its numeric code in [`ApiError::Rpc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorKind {
    WalletNotFound,
    WalletAlreadyLoaded,
    InvalidAddressOrKey,
    InvalidParameter,
    MethodNotFound,
    Other,
}

impl RpcErrorKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            -18 => Self::WalletNotFound,
            -35 => Self::WalletAlreadyLoaded,
            -5 => Self::InvalidAddressOrKey,
            -8 => Self::InvalidParameter,
            -32601 => Self::MethodNotFound,
            _ => Self::Other,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Transport(String),
    Protocol(String),
    Rpc {
        kind: RpcErrorKind,
        code: i64,
        message: String,
    },
    ConfirmationRequired,
    AlreadyConfirmed(String),
    InsufficientFunds,
    WalletBootstrapFailed(String),
    BadRequest(String),
    InvalidConfig(String),
}

pub const RESET_WARNING: &str =
    "This will invalidate all blocks and reset the chain to genesis. Your wallet will lose all coins.";

impl ApiError {
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            kind: RpcErrorKind::from_code(code),
            code,
            message: message.into(),
        }
    }

    /// The node-reported kind, if this error came back in a JSON-RPC envelope.
    pub fn rpc_kind(&self) -> Option<RpcErrorKind> {
        match self {
            Self::Rpc { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_rpc_kind(&self, expected: RpcErrorKind) -> bool {
        self.rpc_kind() == Some(expected)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "Bitcoin RPC unreachable: {}", msg),
            Self::Protocol(msg) => write!(f, "Malformed RPC response: {}", msg),
            Self::Rpc { message, .. } => write!(f, "{}", message),
            Self::ConfirmationRequired => write!(
                f,
                "Confirmation required. Send {{ \"confirm\": \"RESET\" }} to proceed."
            ),
            Self::AlreadyConfirmed(txid) => write!(
                f,
                "Transaction {} already confirmed, cannot cancel",
                txid
            ),
            Self::InsufficientFunds => write!(f, "Insufficient funds to cover cancellation fee"),
            Self::WalletBootstrapFailed(msg) => {
                write!(f, "Could not create or load wallet: {}", msg)
            }
            Self::BadRequest(msg) => write!(f, "{}", msg),
            Self::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Transport(_) | Self::Protocol(_) => StatusCode::BAD_GATEWAY,
            Self::Rpc {
                kind: RpcErrorKind::MethodNotFound,
                ..
            } => StatusCode::NOT_FOUND,
            Self::ConfirmationRequired | Self::InsufficientFunds | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::AlreadyConfirmed(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let warning = match self {
            Self::ConfirmationRequired => Some(RESET_WARNING),
            _ => None,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                warning,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_codes_map_to_kinds() {
        assert_eq!(RpcErrorKind::from_code(-18), RpcErrorKind::WalletNotFound);
        assert_eq!(RpcErrorKind::from_code(-5), RpcErrorKind::InvalidAddressOrKey);
        assert_eq!(RpcErrorKind::from_code(-8), RpcErrorKind::InvalidParameter);
        assert_eq!(RpcErrorKind::from_code(-35), RpcErrorKind::WalletAlreadyLoaded);
        assert_eq!(RpcErrorKind::from_code(-26), RpcErrorKind::Other);
        assert_eq!(RpcErrorKind::from_code(-1), RpcErrorKind::Other);
    }

    #[test]
    fn rpc_error_displays_node_message() {
        let err = ApiError::rpc(-18, "Requested wallet does not exist or is not loaded");
        assert_eq!(
            err.to_string(),
            "Requested wallet does not exist or is not loaded"
        );
        assert!(err.is_rpc_kind(RpcErrorKind::WalletNotFound));
    }

    #[test]
    fn policy_errors_are_client_errors() {
        assert_eq!(
            ApiError::ConfirmationRequired.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::AlreadyConfirmed("ab".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Transport("refused".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
