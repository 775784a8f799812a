use crate::error::{ApiError, ApiResult};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_RPC_HOST: &str = "bitcoin";
const DEFAULT_RPC_PORT: u16 = 18443;
const DEFAULT_RPC_USER: &str = "umbrel";
const DEFAULT_RPC_PASS: &str = "moneyprintergobrrr";
const DEFAULT_RPC_WALLET: &str = "regtest_wallet";
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_FRONTEND_DIR: &str = "/app/frontend";

/// Connection settings for the upstream node. Defaults only make sense on regtest.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub wallet: String,
    pub timeout: Duration,
}

impl RpcConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc: RpcConfig,
    pub bind_address: String,
    pub port: u16,
    pub frontend_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let rpc = RpcConfig {
            host: string_or("BITCOIN_RPC_HOST", DEFAULT_RPC_HOST),
            port: parse_or(&lookup, "BITCOIN_RPC_PORT", DEFAULT_RPC_PORT)?,
            user: string_or("BITCOIN_RPC_USER", DEFAULT_RPC_USER),
            password: string_or("BITCOIN_RPC_PASS", DEFAULT_RPC_PASS),
            wallet: string_or("BITCOIN_RPC_WALLET", DEFAULT_RPC_WALLET),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "BITCOIN_RPC_TIMEOUT_SECS",
                DEFAULT_RPC_TIMEOUT_SECS,
            )?),
        };

        if rpc.timeout.is_zero() {
            return Err(ApiError::InvalidConfig(
                "BITCOIN_RPC_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }

        if rpc.wallet.is_empty() {
            return Err(ApiError::InvalidConfig(
                "BITCOIN_RPC_WALLET must not be empty".to_string(),
            ));
        }

        Ok(Self {
            rpc,
            bind_address: string_or("BIND_ADDRESS", DEFAULT_BIND_ADDRESS),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            frontend_dir: PathBuf::from(string_or("FRONTEND_DIR", DEFAULT_FRONTEND_DIR)),
        })
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> ApiResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ApiError::InvalidConfig(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}
