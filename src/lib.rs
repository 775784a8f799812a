pub mod bootstrap;
pub mod cancel;
pub mod chain;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod rpc;
pub mod state;

#[cfg(test)]
mod testing;

use axum::{
    routing::{get, post},
    Router,
};
use state::AppState;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let frontend_dir = state.config.frontend_dir.clone();
    let spa = ServeDir::new(&frontend_dir)
        .fallback(ServeFile::new(frontend_dir.join("index.html")));

    let api = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/blockchain/info", get(handlers::blockchain_info))
        .route("/api/network/info", get(handlers::network_info))
        .route("/api/mining/info", get(handlers::mining_info))
        .route("/api/mempool/info", get(handlers::mempool_info))
        .route("/api/mempool/raw", get(handlers::raw_mempool))
        .route("/api/mine", post(handlers::mine))
        .route("/api/wallet/info", get(handlers::wallet_info))
        .route("/api/wallet/balance", get(handlers::wallet_balance))
        .route("/api/wallet/list", get(handlers::list_wallets))
        .route("/api/wallet/create", post(handlers::create_wallet))
        .route("/api/wallet/load", post(handlers::load_wallet))
        .route("/api/wallet/newaddress", post(handlers::new_address))
        .route("/api/wallet/addresses", get(handlers::list_addresses))
        .route("/api/wallet/send", post(handlers::send))
        .route("/api/wallet/sendmany", post(handlers::send_many))
        .route("/api/wallet/transactions", get(handlers::list_transactions))
        .route("/api/wallet/utxos", get(handlers::list_unspent))
        .route("/api/wallet/importaddress", post(handlers::import_address))
        .route("/api/wallet/importprivkey", post(handlers::import_private_key))
        .route(
            "/api/wallet/dumpprivkey/:address",
            get(handlers::dump_private_key),
        )
        .route(
            "/api/wallet/addressinfo/:address",
            get(handlers::address_info),
        )
        .route("/api/transaction/decode", post(handlers::decode_transaction))
        .route("/api/transaction/bumpfee", post(handlers::bump_fee))
        .route("/api/transaction/cancel", post(handlers::cancel))
        .route("/api/transaction/create", post(handlers::create_raw_transaction))
        .route("/api/transaction/fund", post(handlers::fund_raw_transaction))
        .route("/api/transaction/sign", post(handlers::sign_raw_transaction))
        .route("/api/transaction/send", post(handlers::send_raw_transaction))
        .route(
            "/api/transaction/testmempoolaccept",
            post(handlers::test_mempool_accept),
        )
        .route("/api/transaction/:txid", get(handlers::get_transaction))
        .route("/api/transaction/:txid/raw", get(handlers::get_raw_transaction))
        .route("/api/block/best", get(handlers::best_block))
        .route("/api/block/height/:height", get(handlers::block_by_height))
        .route("/api/block/:hash", get(handlers::block_by_hash))
        .route(
            "/api/estimatesmartfee/:blocks",
            get(handlers::estimate_smart_fee),
        )
        .route(
            "/api/validateaddress/:address",
            get(handlers::validate_address),
        )
        .route("/api/psbt/create", post(handlers::create_psbt))
        .route("/api/psbt/decode", post(handlers::decode_psbt))
        .route("/api/psbt/analyze", post(handlers::analyze_psbt))
        .route("/api/psbt/process", post(handlers::process_psbt))
        .route("/api/psbt/finalize", post(handlers::finalize_psbt))
        .route("/api/network/peers", get(handlers::peer_info))
        .route("/api/network/addnode", post(handlers::add_node))
        .route("/api/network/disconnectnode", post(handlers::disconnect_node))
        .route("/api/chain/reset", post(handlers::reset))
        .route("/api/chain/reconsider", post(handlers::reconsider))
        .route("/api/rpc", post(handlers::rpc_passthrough))
        .with_state(state);

    Router::new()
        .merge(api)
        .fallback_service(spa)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
