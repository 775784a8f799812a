use regtest_gateway::build_router;
use regtest_gateway::config::Config;
use regtest_gateway::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    initialize_tracing();

    let config = Config::from_env()?;
    let listen_address = config.listen_address();
    let rpc_target = config.rpc.base_url();
    let wallet = config.rpc.wallet.clone();

    let state = AppState::new(config)?;
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&listen_address).await?;

    log_api_endpoints();
    info!("Connecting to Bitcoin RPC at {} (wallet '{}')", rpc_target, wallet);
    info!("Bitcoin Regtest Dashboard API listening on http://{}", listen_address);

    axum::serve(listener, app).await?;

    Ok(())
}

fn initialize_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("regtest_gateway=info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn log_api_endpoints() {
    info!("API endpoints:");
    info!("  GET  /api/health");
    info!("  POST /api/mine");
    info!("  POST /api/transaction/cancel");
    info!("  POST /api/chain/reset");
    info!("  POST /api/chain/reconsider");
    info!("  POST /api/rpc");
    info!("  ... plus node, wallet, transaction, block and PSBT pass-throughs under /api");
}
