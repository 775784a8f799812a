//! Regtest "reset" by invalidating block 1, and its undo.
//!
//! Nothing is stored here. Every call reads the current state back from the node.

use crate::error::{ApiError, ApiResult, RpcErrorKind};
use crate::rpc::{Endpoint, RpcClient};
use serde::Deserialize;
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

pub const RESET_CONFIRMATION: &str = "RESET";

const INVALID_TIP_STATUS: &str = "invalid";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    AlreadyAtGenesis,
    Invalidated {
        previous_height: u64,
        invalidated_hash: String,
        new_wallet: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconsiderOutcome {
    Restored { height: u64, reconsidered: Vec<String> },
    NothingToReconsider,
}

#[derive(Deserialize)]
struct ChainTip {
    hash: String,
    status: String,
}

async fn block_count(rpc: &RpcClient) -> ApiResult<u64> {
    rpc.call_as("getblockcount", vec![], Endpoint::Node).await
}

async fn first_block_hash(rpc: &RpcClient) -> ApiResult<String> {
    rpc.call_as("getblockhash", vec![json!(1)], Endpoint::Node)
        .await
}

fn session_wallet_name(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{}_{}", prefix, millis)
}

/// Invalidates block 1 and so every block after it.
///
/// `confirm` must be exactly [`RESET_CONFIRMATION`]; otherwise nothing is sent to the node.
pub async fn reset_chain(
    rpc: &RpcClient,
    wallet_prefix: &str,
    confirm: Option<&str>,
) -> ApiResult<ResetOutcome> {
    if confirm != Some(RESET_CONFIRMATION) {
        return Err(ApiError::ConfirmationRequired);
    }

    let previous_height = block_count(rpc).await?;
    if previous_height == 0 {
        return Ok(ResetOutcome::AlreadyAtGenesis);
    }

    let invalidated_hash = first_block_hash(rpc).await?;
    rpc.call("invalidateblock", vec![json!(invalidated_hash)], Endpoint::Node)
        .await?;
    info!(
        "Invalidated block {} and {} descendants",
        invalidated_hash,
        previous_height - 1
    );

    // A fresh wallet for the next session; the reset stands even if this fails.
    let wallet_name = session_wallet_name(wallet_prefix);
    let new_wallet = match rpc
        .call("createwallet", vec![json!(wallet_name)], Endpoint::Node)
        .await
    {
        Ok(_) => Some(wallet_name),
        Err(e) => {
            warn!("Could not create new wallet {}: {}", wallet_name, e);
            None
        }
    };

    Ok(ResetOutcome::Invalidated {
        previous_height,
        invalidated_hash,
        new_wallet,
    })
}

/// Undoes [`reset_chain`] by reconsidering the invalidated branch.
///
/// Invalid chain tips are preferred, because after a reset height 1 is no longer
/// on the active chain. Without any, the block at height 1 is used. If that
/// height does not exist either, the outcome is `NothingToReconsider`, not an error.
pub async fn reconsider_chain(rpc: &RpcClient) -> ApiResult<ReconsiderOutcome> {
    let tips: Vec<ChainTip> = rpc.call_as("getchaintips", vec![], Endpoint::Node).await?;
    let mut candidates: Vec<String> = tips
        .into_iter()
        .filter(|tip| tip.status == INVALID_TIP_STATUS)
        .map(|tip| tip.hash)
        .collect();

    if candidates.is_empty() {
        match first_block_hash(rpc).await {
            Ok(hash) => candidates.push(hash),
            Err(e) if e.is_rpc_kind(RpcErrorKind::InvalidParameter) => {
                return Ok(ReconsiderOutcome::NothingToReconsider)
            }
            Err(e) => return Err(e),
        }
    }

    for hash in &candidates {
        rpc.call("reconsiderblock", vec![json!(hash)], Endpoint::Node)
            .await?;
    }

    let height = block_count(rpc).await?;
    info!("Reconsidered {} block(s), height now {}", candidates.len(), height);

    Ok(ReconsiderOutcome::Restored {
        height,
        reconsidered: candidates,
    })
}
