use crate::bootstrap::ensure_mining_address;
use crate::cancel::cancel_transaction;
use crate::chain::{reconsider_chain, reset_chain, ReconsiderOutcome, ResetOutcome};
use crate::error::{ApiError, ApiResult};
use crate::models::*;
use crate::rpc::Endpoint;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{error, info};

async fn forward(
    state: &AppState,
    method: &str,
    params: Vec<Value>,
    endpoint: Endpoint,
) -> ApiResult<Json<Value>> {
    state.rpc.call(method, params, endpoint).await.map(Json)
}

pub async fn health_check(State(state): State<AppState>) -> Response {
    match state.rpc.call("getblockchaininfo", vec![], Endpoint::Node).await {
        Ok(info) => Json(HealthResponse {
            status: "ok",
            chain: info["chain"].clone(),
            blocks: info["blocks"].clone(),
        })
        .into_response(),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn blockchain_info(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    forward(&state, "getblockchaininfo", vec![], Endpoint::Node).await
}

pub async fn network_info(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    forward(&state, "getnetworkinfo", vec![], Endpoint::Node).await
}

pub async fn mining_info(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    forward(&state, "getmininginfo", vec![], Endpoint::Node).await
}

pub async fn mempool_info(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    forward(&state, "getmempoolinfo", vec![], Endpoint::Node).await
}

pub async fn raw_mempool(
    State(state): State<AppState>,
    Query(query): Query<VerboseQuery>,
) -> ApiResult<Json<Value>> {
    forward(&state, "getrawmempool", vec![json!(query.verbose)], Endpoint::Node).await
}

pub async fn mine(
    State(state): State<AppState>,
    payload: Option<Json<MineRequest>>,
) -> ApiResult<Json<MineResponse>> {
    let payload = payload.map(|Json(body)| body).unwrap_or_default();
    let address = ensure_mining_address(&state.rpc, payload.address).await?;

    let hashes: Vec<String> = state
        .rpc
        .call_as(
            "generatetoaddress",
            vec![json!(payload.blocks), json!(address)],
            Endpoint::Node,
        )
        .await?;

    info!("Mined {} block(s) to {}", hashes.len(), address);

    Ok(Json(MineResponse {
        success: true,
        blocks: hashes.len(),
        hashes,
        address,
    }))
}

pub async fn wallet_info(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    forward(&state, "getwalletinfo", vec![], Endpoint::Wallet).await
}

pub async fn wallet_balance(State(state): State<AppState>) -> ApiResult<Json<BalanceResponse>> {
    let balances = state.rpc.call("getbalances", vec![], Endpoint::Wallet).await?;
    let mine = &balances["mine"];

    Ok(Json(BalanceResponse {
        confirmed: mine["trusted"].as_f64().unwrap_or(0.0),
        unconfirmed: mine["untrusted_pending"].as_f64().unwrap_or(0.0),
    }))
}

pub async fn list_wallets(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    forward(&state, "listwallets", vec![], Endpoint::Node).await
}

pub async fn create_wallet(
    State(state): State<AppState>,
    Json(payload): Json<CreateWalletRequest>,
) -> ApiResult<Json<Value>> {
    let params = vec![
        json!(payload.name),
        json!(payload.disable_private_keys),
        json!(payload.blank),
        json!(payload.passphrase),
        json!(payload.avoid_reuse),
        json!(payload.descriptors),
    ];
    forward(&state, "createwallet", params, Endpoint::Node).await
}

pub async fn load_wallet(
    State(state): State<AppState>,
    Json(payload): Json<LoadWalletRequest>,
) -> ApiResult<Json<Value>> {
    forward(&state, "loadwallet", vec![json!(payload.name)], Endpoint::Node).await
}

pub async fn new_address(
    State(state): State<AppState>,
    Json(payload): Json<NewAddressRequest>,
) -> ApiResult<Json<AddressResponse>> {
    let address = state
        .rpc
        .call(
            "getnewaddress",
            vec![json!(payload.label), json!(payload.address_type)],
            Endpoint::Wallet,
        )
        .await?;
    Ok(Json(AddressResponse { address }))
}

pub async fn list_addresses(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    forward(
        &state,
        "listreceivedbyaddress",
        vec![json!(0), json!(true)],
        Endpoint::Wallet,
    )
    .await
}

pub async fn send(
    State(state): State<AppState>,
    Json(payload): Json<SendRequest>,
) -> ApiResult<Json<TxidResponse>> {
    // Explicit fee_rate instead of conf_target: regtest has no fee estimates.
    let params = vec![
        json!(payload.address),
        json!(payload.amount),
        json!(payload.comment),
        json!(payload.comment_to),
        json!(payload.subtract_fee),
        json!(payload.replaceable),
        Value::Null,
        json!("unset"),
        json!(false),
        json!(payload.fee_rate),
    ];
    let txid = state.rpc.call("sendtoaddress", params, Endpoint::Wallet).await?;
    Ok(Json(TxidResponse { txid }))
}

pub async fn send_many(
    State(state): State<AppState>,
    Json(payload): Json<SendManyRequest>,
) -> ApiResult<Json<TxidResponse>> {
    let params = vec![
        json!(""),
        payload.amounts,
        json!(1),
        json!(payload.comment),
        json!(payload.subtract_fee_from),
        json!(payload.replaceable),
        Value::Null,
        json!("unset"),
        json!(payload.fee_rate),
    ];
    let txid = state.rpc.call("sendmany", params, Endpoint::Wallet).await?;
    Ok(Json(TxidResponse { txid }))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> ApiResult<Json<Value>> {
    let params = vec![
        json!("*"),
        json!(query.count.unwrap_or(20)),
        json!(query.skip.unwrap_or(0)),
        json!(true),
    ];
    forward(&state, "listtransactions", params, Endpoint::Wallet).await
}

pub async fn list_unspent(
    State(state): State<AppState>,
    Query(query): Query<UtxoQuery>,
) -> ApiResult<Json<Value>> {
    let params = vec![
        json!(query.minconf.unwrap_or(0)),
        json!(query.maxconf.unwrap_or(9_999_999)),
    ];
    forward(&state, "listunspent", params, Endpoint::Wallet).await
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(txid): Path<String>,
) -> ApiResult<Json<Value>> {
    forward(
        &state,
        "gettransaction",
        vec![json!(txid), json!(true), json!(true)],
        Endpoint::Wallet,
    )
    .await
}

pub async fn get_raw_transaction(
    State(state): State<AppState>,
    Path(txid): Path<String>,
    Query(query): Query<VerboseQuery>,
) -> ApiResult<Json<RawTransactionResponse>> {
    let raw = state
        .rpc
        .call(
            "getrawtransaction",
            vec![json!(txid), json!(query.verbose)],
            Endpoint::Node,
        )
        .await?;
    Ok(Json(RawTransactionResponse { raw }))
}

pub async fn decode_transaction(
    State(state): State<AppState>,
    Json(payload): Json<HexRequest>,
) -> ApiResult<Json<Value>> {
    forward(&state, "decoderawtransaction", vec![json!(payload.hex)], Endpoint::Node).await
}

pub async fn bump_fee(
    State(state): State<AppState>,
    Json(payload): Json<BumpFeeRequest>,
) -> ApiResult<Json<Value>> {
    forward(
        &state,
        "bumpfee",
        vec![json!(payload.txid), payload.options],
        Endpoint::Wallet,
    )
    .await
}

pub async fn cancel(
    State(state): State<AppState>,
    Json(payload): Json<TxidRequest>,
) -> ApiResult<Json<CancelResponse>> {
    let summary = cancel_transaction(&state.rpc, &payload.txid).await?;

    Ok(Json(CancelResponse {
        success: true,
        original_txid: payload.txid,
        replacement_txid: summary.replacement_txid,
        cancel_address: summary.cancel_address,
        original_fee_rate: (summary.original_fee_rate * 100.0).round() / 100.0,
        new_fee_rate: summary.new_fee_rate,
        new_fee: summary.new_fee,
        amount_recovered: summary.amount_recovered.to_btc(),
    }))
}

pub async fn block_by_hash(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Query(query): Query<BlockQuery>,
) -> ApiResult<Json<Value>> {
    let verbosity = query.verbosity.unwrap_or(1);
    forward(&state, "getblock", vec![json!(hash), json!(verbosity)], Endpoint::Node).await
}

pub async fn block_by_height(
    State(state): State<AppState>,
    Path(height): Path<u64>,
) -> ApiResult<Json<Value>> {
    let hash = state
        .rpc
        .call("getblockhash", vec![json!(height)], Endpoint::Node)
        .await?;
    forward(&state, "getblock", vec![hash, json!(1)], Endpoint::Node).await
}

pub async fn best_block(State(state): State<AppState>) -> ApiResult<Json<HashResponse>> {
    let hash = state.rpc.call("getbestblockhash", vec![], Endpoint::Node).await?;
    Ok(Json(HashResponse { hash }))
}

pub async fn estimate_smart_fee(
    State(state): State<AppState>,
    Path(blocks): Path<u32>,
) -> ApiResult<Json<Value>> {
    forward(&state, "estimatesmartfee", vec![json!(blocks)], Endpoint::Node).await
}

pub async fn validate_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<Value>> {
    forward(&state, "validateaddress", vec![json!(address)], Endpoint::Node).await
}

fn build_params(payload: BuildTransactionRequest) -> Vec<Value> {
    vec![
        payload.inputs,
        payload.outputs,
        json!(payload.locktime),
        json!(payload.replaceable),
    ]
}

pub async fn create_raw_transaction(
    State(state): State<AppState>,
    Json(payload): Json<BuildTransactionRequest>,
) -> ApiResult<Json<HexResponse>> {
    let hex = state
        .rpc
        .call("createrawtransaction", build_params(payload), Endpoint::Node)
        .await?;
    Ok(Json(HexResponse { hex }))
}

pub async fn fund_raw_transaction(
    State(state): State<AppState>,
    Json(payload): Json<FundRequest>,
) -> ApiResult<Json<Value>> {
    forward(
        &state,
        "fundrawtransaction",
        vec![json!(payload.hex), payload.options],
        Endpoint::Node,
    )
    .await
}

pub async fn sign_raw_transaction(
    State(state): State<AppState>,
    Json(payload): Json<HexRequest>,
) -> ApiResult<Json<Value>> {
    forward(
        &state,
        "signrawtransactionwithwallet",
        vec![json!(payload.hex)],
        Endpoint::Wallet,
    )
    .await
}

pub async fn send_raw_transaction(
    State(state): State<AppState>,
    Json(payload): Json<SendRawRequest>,
) -> ApiResult<Json<TxidResponse>> {
    let mut params = vec![json!(payload.hex)];
    params.extend(payload.max_fee_rate);
    let txid = state
        .rpc
        .call("sendrawtransaction", params, Endpoint::Node)
        .await?;
    Ok(Json(TxidResponse { txid }))
}

pub async fn test_mempool_accept(
    State(state): State<AppState>,
    Json(payload): Json<TestMempoolAcceptRequest>,
) -> ApiResult<Json<Value>> {
    let mut params = vec![payload.rawtxs];
    params.extend(payload.max_fee_rate);
    forward(&state, "testmempoolaccept", params, Endpoint::Node).await
}

pub async fn create_psbt(
    State(state): State<AppState>,
    Json(payload): Json<BuildTransactionRequest>,
) -> ApiResult<Json<PsbtResponse>> {
    let psbt = state
        .rpc
        .call("createpsbt", build_params(payload), Endpoint::Node)
        .await?;
    Ok(Json(PsbtResponse { psbt }))
}

pub async fn decode_psbt(
    State(state): State<AppState>,
    Json(payload): Json<PsbtRequest>,
) -> ApiResult<Json<Value>> {
    forward(&state, "decodepsbt", vec![json!(payload.psbt)], Endpoint::Node).await
}

pub async fn analyze_psbt(
    State(state): State<AppState>,
    Json(payload): Json<PsbtRequest>,
) -> ApiResult<Json<Value>> {
    forward(&state, "analyzepsbt", vec![json!(payload.psbt)], Endpoint::Node).await
}

pub async fn process_psbt(
    State(state): State<AppState>,
    Json(payload): Json<PsbtRequest>,
) -> ApiResult<Json<Value>> {
    forward(&state, "walletprocesspsbt", vec![json!(payload.psbt)], Endpoint::Wallet).await
}

pub async fn finalize_psbt(
    State(state): State<AppState>,
    Json(payload): Json<PsbtRequest>,
) -> ApiResult<Json<Value>> {
    forward(&state, "finalizepsbt", vec![json!(payload.psbt)], Endpoint::Node).await
}

pub async fn import_address(
    State(state): State<AppState>,
    Json(payload): Json<ImportAddressRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    state
        .rpc
        .call(
            "importaddress",
            vec![json!(payload.address), json!(payload.label), json!(payload.rescan)],
            Endpoint::Wallet,
        )
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn import_private_key(
    State(state): State<AppState>,
    Json(payload): Json<ImportPrivKeyRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    state
        .rpc
        .call(
            "importprivkey",
            vec![json!(payload.privkey), json!(payload.label), json!(payload.rescan)],
            Endpoint::Wallet,
        )
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn dump_private_key(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<PrivKeyResponse>> {
    let privkey = state
        .rpc
        .call("dumpprivkey", vec![json!(address)], Endpoint::Wallet)
        .await?;
    Ok(Json(PrivKeyResponse { privkey }))
}

pub async fn address_info(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<Value>> {
    forward(&state, "getaddressinfo", vec![json!(address)], Endpoint::Wallet).await
}

pub async fn peer_info(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    forward(&state, "getpeerinfo", vec![], Endpoint::Node).await
}

pub async fn add_node(
    State(state): State<AppState>,
    Json(payload): Json<AddNodeRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    state
        .rpc
        .call(
            "addnode",
            vec![json!(payload.node), json!(payload.command)],
            Endpoint::Node,
        )
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn disconnect_node(
    State(state): State<AppState>,
    Json(payload): Json<DisconnectNodeRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let params = match (payload.node_id, payload.address) {
        (Some(node_id), _) => vec![json!(""), json!(node_id)],
        (None, Some(address)) => vec![json!(address)],
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Either address or nodeId is required".to_string(),
            ))
        }
    };
    state.rpc.call("disconnectnode", params, Endpoint::Node).await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn reset(
    State(state): State<AppState>,
    payload: Option<Json<ResetRequest>>,
) -> ApiResult<Json<ResetResponse>> {
    let confirm = payload.and_then(|Json(body)| body.confirm);
    let outcome = reset_chain(&state.rpc, &state.config.rpc.wallet, confirm.as_deref()).await?;

    let response = match outcome {
        ResetOutcome::AlreadyAtGenesis => ResetResponse {
            success: true,
            message: "Chain is already at genesis block.".to_string(),
            note: None,
            previous_height: None,
            invalidated_hash: None,
            new_wallet: None,
        },
        ResetOutcome::Invalidated {
            previous_height,
            invalidated_hash,
            new_wallet,
        } => ResetResponse {
            success: true,
            message: format!(
                "Chain reset! Invalidated {} blocks. Chain is now at height 0.",
                previous_height
            ),
            note: Some("Mine new blocks to rebuild the chain."),
            previous_height: Some(previous_height),
            invalidated_hash: Some(invalidated_hash),
            new_wallet,
        },
    };

    Ok(Json(response))
}

pub async fn reconsider(State(state): State<AppState>) -> ApiResult<Json<ReconsiderResponse>> {
    let response = match reconsider_chain(&state.rpc).await? {
        ReconsiderOutcome::Restored {
            height,
            reconsidered,
        } => ReconsiderResponse {
            success: true,
            message: format!("Chain restored! Current height: {}", height),
            height: Some(height),
            reconsidered,
        },
        ReconsiderOutcome::NothingToReconsider => ReconsiderResponse {
            success: false,
            message: "No invalidated blocks to reconsider, or chain is already at genesis."
                .to_string(),
            height: None,
            reconsidered: Vec::new(),
        },
    };

    Ok(Json(response))
}

pub async fn rpc_passthrough(
    State(state): State<AppState>,
    Json(payload): Json<RpcPassthroughRequest>,
) -> ApiResult<Json<RpcResultResponse>> {
    let endpoint = if payload.wallet {
        Endpoint::Wallet
    } else {
        Endpoint::Node
    };
    let result = state
        .rpc
        .call(&payload.method, payload.params, endpoint)
        .await?;
    Ok(Json(RpcResultResponse { result }))
}
