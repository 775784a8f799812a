#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use regtest_gateway::build_router;
use regtest_gateway::config::Config;
use regtest_gateway::state::AppState;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const RPC_USER: &str = "user";
pub const RPC_PASS: &str = "pass";
pub const WALLET: &str = "regtest_wallet";
// base64("user:pass")
const EXPECTED_AUTH: &str = "Basic dXNlcjpwYXNz";
pub const INDEX_HTML: &str = "<!doctype html><title>Regtest Dashboard</title>";

#[derive(Debug, Clone)]
pub struct NodeCall {
    pub path: String,
    pub method: String,
    pub params: Value,
}

/// In-memory stand-in for bitcoind: a block height, an invalidation flag,
/// wallets and a handful of canned transactions.
#[derive(Default)]
pub struct FakeNode {
    pub height: u64,
    pub invalidated: bool,
    pub wallets_on_disk: HashSet<String>,
    pub wallets_loaded: HashSet<String>,
    pub wallet_transactions: HashMap<String, Value>,
    pub node_transactions: HashMap<String, Value>,
    pub decoded: HashMap<String, Value>,
    pub bump_result: Value,
    pub calls: Vec<NodeCall>,
    addresses_issued: u32,
}

pub type SharedNode = Arc<Mutex<FakeNode>>;

fn block_hash(height: u64) -> String {
    format!("{:064x}", height + 0xb10c)
}

type RpcOutcome = Result<Value, (i64, String)>;

fn rpc_error(code: i64, message: &str) -> RpcOutcome {
    Err((code, message.to_string()))
}

impl FakeNode {
    pub fn with_loaded_wallet(height: u64) -> Self {
        let mut node = Self {
            height,
            ..Self::default()
        };
        node.wallets_on_disk.insert(WALLET.to_string());
        node.wallets_loaded.insert(WALLET.to_string());
        node
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls.iter().map(|c| c.method.clone()).collect()
    }

    fn active_height(&self) -> u64 {
        if self.invalidated {
            0
        } else {
            self.height
        }
    }

    fn dispatch(&mut self, wallet: Option<&str>, method: &str, params: &Value) -> RpcOutcome {
        if let Some(name) = wallet {
            if !self.wallets_loaded.contains(name) {
                return rpc_error(-18, "Requested wallet does not exist or is not loaded");
            }
        }

        match method {
            "getblockchaininfo" => Ok(json!({ "chain": "regtest", "blocks": self.active_height() })),
            "getblockcount" => Ok(json!(self.active_height())),
            "getblockhash" => {
                let height = params[0].as_u64().unwrap_or(u64::MAX);
                if height > self.active_height() {
                    rpc_error(-8, "Block height out of range")
                } else {
                    Ok(json!(block_hash(height)))
                }
            }
            "invalidateblock" => {
                self.invalidated = true;
                Ok(Value::Null)
            }
            "reconsiderblock" => {
                self.invalidated = false;
                Ok(Value::Null)
            }
            "getchaintips" => {
                if self.invalidated {
                    Ok(json!([
                        { "height": 0, "hash": block_hash(0), "branchlen": 0, "status": "active" },
                        { "height": self.height, "hash": block_hash(self.height), "branchlen": self.height, "status": "invalid" }
                    ]))
                } else {
                    Ok(json!([
                        { "height": self.height, "hash": block_hash(self.height), "branchlen": 0, "status": "active" }
                    ]))
                }
            }
            "generatetoaddress" => {
                let count = params[0].as_u64().unwrap_or(0);
                let start = self.height;
                self.height += count;
                Ok(json!((start + 1..=self.height).map(block_hash).collect::<Vec<_>>()))
            }
            "createwallet" => {
                let name = params[0].as_str().unwrap_or_default().to_string();
                if self.wallets_on_disk.contains(&name) {
                    return rpc_error(-4, "Wallet file verification failed. Database already exists.");
                }
                self.wallets_on_disk.insert(name.clone());
                self.wallets_loaded.insert(name.clone());
                Ok(json!({ "name": name, "warning": "" }))
            }
            "loadwallet" => {
                let name = params[0].as_str().unwrap_or_default().to_string();
                if !self.wallets_on_disk.contains(&name) {
                    return rpc_error(-18, "Wallet file not found.");
                }
                if !self.wallets_loaded.insert(name.clone()) {
                    return rpc_error(-35, "Wallet is already loaded.");
                }
                Ok(json!({ "name": name, "warning": "" }))
            }
            "getnewaddress" => {
                self.addresses_issued += 1;
                Ok(json!(format!("bcrt1qfake{:04}", self.addresses_issued)))
            }
            "getbalances" => Ok(json!({
                "mine": { "trusted": 12.5, "untrusted_pending": 0.25, "immature": 0.0 }
            })),
            "gettransaction" => {
                let txid = params[0].as_str().unwrap_or_default();
                self.wallet_transactions
                    .get(txid)
                    .cloned()
                    .ok_or((-5, "Invalid or non-wallet transaction id".to_string()))
            }
            "getrawtransaction" => {
                let txid = params[0].as_str().unwrap_or_default();
                self.node_transactions
                    .get(txid)
                    .cloned()
                    .ok_or((-5, "No such mempool or blockchain transaction".to_string()))
            }
            "decoderawtransaction" => {
                let hex = params[0].as_str().unwrap_or_default();
                self.decoded
                    .get(hex)
                    .cloned()
                    .ok_or((-22, "TX decode failed".to_string()))
            }
            "bumpfee" => Ok(self.bump_result.clone()),
            "getrawmempool" => {
                if params[0].as_bool().unwrap_or(false) {
                    Ok(json!({}))
                } else {
                    Ok(json!([]))
                }
            }
            "listtransactions" => Ok(json!([])),
            _ => rpc_error(-32601, "Method not found"),
        }
    }
}

async fn handle_rpc(
    State(node): State<SharedNode>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == EXPECTED_AUTH)
        .unwrap_or(false);
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let path = uri.path().to_string();
    let wallet = path.strip_prefix("/wallet/").map(str::to_string);
    let method = body["method"].as_str().unwrap_or_default().to_string();
    let params = body["params"].clone();
    let id = body["id"].clone();

    let outcome = {
        let mut node = node.lock().unwrap();
        node.calls.push(NodeCall {
            path,
            method: method.clone(),
            params: params.clone(),
        });
        node.dispatch(wallet.as_deref(), &method, &params)
    };

    match outcome {
        Ok(result) => Json(json!({ "result": result, "error": null, "id": id })).into_response(),
        Err((code, message)) => {
            let status = if code == -32601 {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (
                status,
                Json(json!({
                    "result": null,
                    "error": { "code": code, "message": message },
                    "id": id
                })),
            )
                .into_response()
        }
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server crashed");
    });
    addr
}

pub async fn spawn_fake_node(node: FakeNode) -> (SocketAddr, SharedNode) {
    let shared = Arc::new(Mutex::new(node));
    let app = Router::new()
        .route("/", post(handle_rpc))
        .route("/wallet/:name", post(handle_rpc))
        .with_state(shared.clone());
    (serve(app).await, shared)
}

pub fn gateway_config(node_addr: SocketAddr, password: &str, frontend_dir: PathBuf) -> Config {
    let port = node_addr.port().to_string();
    let frontend = frontend_dir.to_string_lossy().to_string();
    Config::from_lookup(|key| match key {
        "BITCOIN_RPC_HOST" => Some("127.0.0.1".to_string()),
        "BITCOIN_RPC_PORT" => Some(port.clone()),
        "BITCOIN_RPC_USER" => Some(RPC_USER.to_string()),
        "BITCOIN_RPC_PASS" => Some(password.to_string()),
        "BITCOIN_RPC_WALLET" => Some(WALLET.to_string()),
        "BITCOIN_RPC_TIMEOUT_SECS" => Some("5".to_string()),
        "FRONTEND_DIR" => Some(frontend.clone()),
        _ => None,
    })
    .expect("valid test config")
}

pub async fn spawn_gateway(config: Config) -> String {
    let state = AppState::new(config).expect("gateway state");
    let addr = serve(build_router(state)).await;
    format!("http://{}", addr)
}

pub struct TestContext {
    pub client: reqwest::Client,
    pub base_url: String,
    pub node: SharedNode,
}

impl TestContext {
    pub async fn start(node: FakeNode) -> Self {
        let (node_addr, node) = spawn_fake_node(node).await;
        let frontend_dir = std::env::temp_dir().join(format!(
            "regtest-gateway-frontend-{}-{}",
            std::process::id(),
            node_addr.port()
        ));
        std::fs::create_dir_all(&frontend_dir).expect("frontend dir");
        std::fs::write(frontend_dir.join("index.html"), INDEX_HTML).expect("index.html");
        let base_url = spawn_gateway(gateway_config(node_addr, RPC_PASS, frontend_dir)).await;

        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            base_url,
            node,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn node_methods(&self) -> Vec<String> {
        self.node.lock().unwrap().methods()
    }

    pub fn node_calls(&self) -> Vec<NodeCall> {
        self.node.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.node.lock().unwrap().calls.clear();
    }
}
