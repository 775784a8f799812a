use crate::config::Config;
use crate::error::ApiResult;
use crate::rpc::{HttpTransport, RpcClient, RpcTransport};
use std::sync::Arc;

/// Everything a handler needs. Read-only after startup, so cloning per request is fine.
#[derive(Clone)]
pub struct AppState {
    pub rpc: RpcClient,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> ApiResult<Self> {
        let transport = HttpTransport::new(&config.rpc)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            rpc: RpcClient::new(transport, config.rpc.wallet.clone()),
            config: Arc::new(config),
        }
    }
}
