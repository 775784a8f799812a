//! Replace-by-fee cancellation: double-spend a pending wallet transaction back
//! to a fresh wallet address at a higher fee rate.

use crate::error::{ApiError, ApiResult, RpcErrorKind};
use crate::rpc::{Endpoint, RpcClient};
use bitcoin::{Amount, SignedAmount, Txid};
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::{debug, info};

/// Outputs at or below this are rejected by relay policy.
pub const DUST_THRESHOLD_SAT: u64 = 546;

const FEE_RATE_INCREMENT: f64 = 10.0;
const MIN_FEE_RATE: u64 = 2;

// P2WPKH input, P2WPKH output, version/locktime/counts.
const INPUT_VBYTES: u64 = 68;
const OUTPUT_VBYTES: u64 = 31;
const OVERHEAD_VBYTES: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct CancellationPlan {
    /// sat/vB paid by the transaction being replaced.
    pub original_fee_rate: f64,
    pub new_fee_rate: u64,
    pub estimated_vsize: u64,
    pub estimated_fee: Amount,
    pub output_amount: Amount,
}

#[derive(Debug, Clone)]
pub struct CancelSummary {
    pub replacement_txid: String,
    pub cancel_address: String,
    pub original_fee_rate: f64,
    pub new_fee_rate: u64,
    pub new_fee: f64,
    pub amount_recovered: Amount,
}

#[derive(Deserialize)]
struct WalletTransaction {
    #[serde(default)]
    fee: Option<f64>,
    #[serde(default)]
    confirmations: i64,
    hex: String,
}

#[derive(Deserialize)]
struct DecodedTransaction {
    vsize: u64,
    vin: Vec<TxInput>,
    vout: Vec<TxOutput>,
}

#[derive(Deserialize)]
struct TxInput {
    txid: Option<String>,
    vout: Option<u32>,
}

#[derive(Deserialize)]
struct TxOutput {
    value: f64,
}

#[derive(Deserialize)]
struct BumpFeeResult {
    txid: String,
    fee: f64,
}

/// Fee rate for the replacement: at least 10 sat/vB above the original,
/// double it for very cheap originals, and never below 2 sat/vB.
pub fn replacement_fee_rate(original_fee_rate: f64) -> u64 {
    let bumped = (original_fee_rate + FEE_RATE_INCREMENT).ceil();
    let doubled = (original_fee_rate * 2.0).ceil();
    (bumped.max(doubled) as u64).max(MIN_FEE_RATE)
}

/// Rough vsize of a one-output P2WPKH spend of `input_count` inputs.
///
/// Heuristic only, mixed or legacy inputs will differ. Must not undershoot.
pub fn estimate_replacement_vsize(input_count: usize) -> u64 {
    INPUT_VBYTES * input_count as u64 + OUTPUT_VBYTES + OVERHEAD_VBYTES
}

pub fn plan_replacement(
    fee_paid: Amount,
    original_vsize: u64,
    input_count: usize,
    total_input_value: Amount,
) -> ApiResult<CancellationPlan> {
    if original_vsize == 0 {
        return Err(ApiError::Protocol("decoded transaction has zero vsize".to_string()));
    }

    let original_fee_rate = fee_paid.to_sat() as f64 / original_vsize as f64;
    let new_fee_rate = replacement_fee_rate(original_fee_rate);
    let estimated_vsize = estimate_replacement_vsize(input_count);
    let estimated_fee = Amount::from_sat(estimated_vsize.saturating_mul(new_fee_rate));

    let output_amount = total_input_value
        .checked_sub(estimated_fee)
        .filter(|amount| amount.to_sat() > DUST_THRESHOLD_SAT)
        .ok_or(ApiError::InsufficientFunds)?;

    Ok(CancellationPlan {
        original_fee_rate,
        new_fee_rate,
        estimated_vsize,
        estimated_fee,
        output_amount,
    })
}

fn btc(value: f64) -> ApiResult<Amount> {
    Amount::from_btc(value).map_err(|e| ApiError::Protocol(format!("bad amount {}: {}", value, e)))
}

async fn decode(rpc: &RpcClient, hex: &str) -> ApiResult<DecodedTransaction> {
    rpc.call_as("decoderawtransaction", vec![json!(hex)], Endpoint::Node)
        .await
}

fn output_value(tx: &DecodedTransaction, txid: &str, vout: u32) -> ApiResult<Amount> {
    let output = tx
        .vout
        .get(vout as usize)
        .ok_or_else(|| ApiError::Protocol(format!("output {}:{} does not exist", txid, vout)))?;
    btc(output.value)
}

async fn wallet_prevout_value(rpc: &RpcClient, txid: &str, vout: u32) -> ApiResult<Amount> {
    let prev: WalletTransaction = rpc
        .call_as(
            "gettransaction",
            vec![json!(txid), json!(true), json!(true)],
            Endpoint::Wallet,
        )
        .await?;
    let decoded = decode(rpc, &prev.hex).await?;
    output_value(&decoded, txid, vout)
}

async fn node_prevout_value(rpc: &RpcClient, txid: &str, vout: u32) -> ApiResult<Amount> {
    let prev: DecodedTransaction = rpc
        .call_as("getrawtransaction", vec![json!(txid), json!(true)], Endpoint::Node)
        .await?;
    output_value(&prev, txid, vout)
}

async fn input_value(rpc: &RpcClient, input: &TxInput) -> ApiResult<Amount> {
    let (txid, vout) = match (&input.txid, input.vout) {
        (Some(txid), Some(vout)) => (txid.as_str(), vout),
        _ => {
            return Err(ApiError::Protocol(
                "transaction input without a previous outpoint".to_string(),
            ))
        }
    };

    match wallet_prevout_value(rpc, txid, vout).await {
        Err(e) if e.is_rpc_kind(RpcErrorKind::InvalidAddressOrKey) => {
            debug!("{} is not a wallet transaction, asking the node", txid);
            node_prevout_value(rpc, txid, vout).await
        }
        result => result,
    }
}

pub async fn cancel_transaction(rpc: &RpcClient, txid: &str) -> ApiResult<CancelSummary> {
    Txid::from_str(txid).map_err(|e| ApiError::BadRequest(format!("Invalid txid '{}': {}", txid, e)))?;

    let tx: WalletTransaction = rpc
        .call_as(
            "gettransaction",
            vec![json!(txid), json!(true), json!(true)],
            Endpoint::Wallet,
        )
        .await?;

    if tx.confirmations > 0 {
        return Err(ApiError::AlreadyConfirmed(txid.to_string()));
    }

    let fee = tx.fee.ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Transaction {} was not sent by this wallet, nothing to cancel",
            txid
        ))
    })?;
    let fee_paid = SignedAmount::from_btc(fee)
        .map_err(|e| ApiError::Protocol(format!("bad fee {}: {}", fee, e)))?;
    let fee_paid = Amount::from_sat(fee_paid.to_sat().unsigned_abs());

    let cancel_address: String = rpc
        .call_as(
            "getnewaddress",
            vec![json!("cancel"), json!("bech32")],
            Endpoint::Wallet,
        )
        .await?;

    let decoded = decode(rpc, &tx.hex).await?;

    let mut total_input_value = Amount::ZERO;
    for input in &decoded.vin {
        let value = input_value(rpc, input).await?;
        total_input_value = total_input_value
            .checked_add(value)
            .ok_or_else(|| ApiError::Protocol("input value overflow".to_string()))?;
    }

    let plan = plan_replacement(fee_paid, decoded.vsize, decoded.vin.len(), total_input_value)?;

    debug!(
        "Cancel plan for {}: {:.2} -> {} sat/vB, ~{} vB, output {}",
        txid, plan.original_fee_rate, plan.new_fee_rate, plan.estimated_vsize, plan.output_amount
    );

    let mut output = serde_json::Map::new();
    output.insert(cancel_address.clone(), json!(plan.output_amount.to_btc()));
    let options = json!({
        "fee_rate": plan.new_fee_rate,
        "outputs": [Value::Object(output)],
    });

    let bumped: BumpFeeResult = rpc
        .call_as("bumpfee", vec![json!(txid), options], Endpoint::Wallet)
        .await?;

    info!(
        "Cancelled {} with replacement {} ({} sat/vB, {} back to {})",
        txid, bumped.txid, plan.new_fee_rate, plan.output_amount, cancel_address
    );

    Ok(CancelSummary {
        replacement_txid: bumped.txid,
        cancel_address,
        original_fee_rate: plan.original_fee_rate,
        new_fee_rate: plan.new_fee_rate,
        new_fee: bumped.fee,
        amount_recovered: plan.output_amount,
    })
}
