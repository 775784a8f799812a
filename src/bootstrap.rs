use crate::error::{ApiError, ApiResult, RpcErrorKind};
use crate::rpc::{Endpoint, RpcClient};
use serde_json::json;
use tracing::{info, warn};

const MINING_LABEL: &str = "mining";
const ADDRESS_TYPE: &str = "bech32";

/// Ways to make the configured wallet available, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalletRecovery {
    Create,
    Load,
}

impl WalletRecovery {
    const ORDER: [WalletRecovery; 2] = [WalletRecovery::Create, WalletRecovery::Load];

    fn method(self) -> &'static str {
        match self {
            Self::Create => "createwallet",
            Self::Load => "loadwallet",
        }
    }

    async fn apply(self, rpc: &RpcClient) -> ApiResult<()> {
        match rpc
            .call(self.method(), vec![json!(rpc.wallet_name())], Endpoint::Node)
            .await
        {
            Ok(_) => Ok(()),
            // Another request loaded it in the meantime.
            Err(e) if self == Self::Load && e.is_rpc_kind(RpcErrorKind::WalletAlreadyLoaded) => {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

async fn derive_address(rpc: &RpcClient, label: &str) -> ApiResult<String> {
    rpc.call_as(
        "getnewaddress",
        vec![json!(label), json!(ADDRESS_TYPE)],
        Endpoint::Wallet,
    )
    .await
}

/// Returns `explicit` untouched, or a fresh address from the configured wallet.
///
/// A missing wallet is created, or loaded if creation fails, before deriving again.
/// Any other failure is returned as-is.
pub async fn ensure_mining_address(rpc: &RpcClient, explicit: Option<String>) -> ApiResult<String> {
    if let Some(address) = explicit.filter(|a| !a.trim().is_empty()) {
        return Ok(address);
    }

    let mut last_error = match derive_address(rpc, MINING_LABEL).await {
        Ok(address) => return Ok(address),
        Err(e) if e.is_rpc_kind(RpcErrorKind::WalletNotFound) => e,
        Err(e) => return Err(e),
    };

    for recovery in WalletRecovery::ORDER {
        let attempt = async {
            recovery.apply(rpc).await?;
            derive_address(rpc, MINING_LABEL).await
        };

        match attempt.await {
            Ok(address) => {
                info!("Wallet '{}' ready after {}", rpc.wallet_name(), recovery.method());
                return Ok(address);
            }
            Err(e) => {
                warn!("{} for '{}' failed: {}", recovery.method(), rpc.wallet_name(), e);
                last_error = e;
            }
        }
    }

    Err(ApiError::WalletBootstrapFailed(last_error.to_string()))
}
