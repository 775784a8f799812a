use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Display;
use std::str::FromStr;

/// Browser forms post numbers as strings; accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Plain(T),
    Text(String),
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Lenient::<T>::deserialize(deserializer)? {
        Lenient::Plain(value) => Ok(value),
        Lenient::Text(text) => text.trim().parse().map_err(de::Error::custom),
    }
}

fn one_block() -> u64 {
    1
}

fn one_sat_per_vbyte() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

fn empty_object() -> Value {
    json!({})
}

fn bech32() -> String {
    "bech32".to_string()
}

fn add_command() -> String {
    "add".to_string()
}

#[derive(Deserialize)]
pub struct MineRequest {
    #[serde(default = "one_block", deserialize_with = "lenient")]
    pub blocks: u64,
    #[serde(default)]
    pub address: Option<String>,
}

impl Default for MineRequest {
    fn default() -> Self {
        Self {
            blocks: one_block(),
            address: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletRequest {
    pub name: String,
    #[serde(default)]
    pub disable_private_keys: bool,
    #[serde(default)]
    pub blank: bool,
    #[serde(default)]
    pub passphrase: String,
    #[serde(default)]
    pub avoid_reuse: bool,
    #[serde(default = "yes")]
    pub descriptors: bool,
}

#[derive(Deserialize)]
pub struct LoadWalletRequest {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddressRequest {
    #[serde(default)]
    pub label: String,
    #[serde(default = "bech32")]
    pub address_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub address: String,
    #[serde(deserialize_with = "lenient")]
    pub amount: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub comment_to: String,
    #[serde(default)]
    pub subtract_fee: bool,
    #[serde(default = "yes")]
    pub replaceable: bool,
    #[serde(default = "one_sat_per_vbyte", deserialize_with = "lenient")]
    pub fee_rate: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendManyRequest {
    pub amounts: Value,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub subtract_fee_from: Vec<String>,
    #[serde(default = "yes")]
    pub replaceable: bool,
    #[serde(default = "one_sat_per_vbyte", deserialize_with = "lenient")]
    pub fee_rate: f64,
}

#[derive(Deserialize)]
pub struct TxidRequest {
    pub txid: String,
}

#[derive(Deserialize)]
pub struct BumpFeeRequest {
    pub txid: String,
    #[serde(default = "empty_object")]
    pub options: Value,
}

#[derive(Deserialize)]
pub struct HexRequest {
    pub hex: String,
}

#[derive(Deserialize)]
pub struct FundRequest {
    pub hex: String,
    #[serde(default = "empty_object")]
    pub options: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRawRequest {
    pub hex: String,
    #[serde(default)]
    pub max_fee_rate: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMempoolAcceptRequest {
    pub rawtxs: Value,
    #[serde(default)]
    pub max_fee_rate: Option<Value>,
}

/// Body shared by `createrawtransaction` and `createpsbt`.
#[derive(Deserialize)]
pub struct BuildTransactionRequest {
    pub inputs: Value,
    pub outputs: Value,
    #[serde(default)]
    pub locktime: u32,
    #[serde(default = "yes")]
    pub replaceable: bool,
}

#[derive(Deserialize)]
pub struct PsbtRequest {
    pub psbt: String,
}

#[derive(Deserialize)]
pub struct ImportAddressRequest {
    pub address: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub rescan: bool,
}

#[derive(Deserialize)]
pub struct ImportPrivKeyRequest {
    pub privkey: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub rescan: bool,
}

#[derive(Deserialize)]
pub struct AddNodeRequest {
    pub node: String,
    #[serde(default = "add_command")]
    pub command: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectNodeRequest {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub node_id: Option<u64>,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: Option<String>,
}

#[derive(Deserialize)]
pub struct RpcPassthroughRequest {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default)]
    pub wallet: bool,
}

/// Only the literal `true` switches a flag on; `1`, `yes` or garbage read as false.
fn query_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw == "true")
}

/// Unparseable or zero numbers fall back to the route default.
fn query_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default + PartialEq,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().parse().ok().filter(|n: &T| *n != T::default()))
}

#[derive(Deserialize)]
pub struct VerboseQuery {
    #[serde(default, deserialize_with = "query_flag")]
    pub verbose: bool,
}

#[derive(Deserialize)]
pub struct TransactionsQuery {
    #[serde(default, deserialize_with = "query_number")]
    pub count: Option<u32>,
    #[serde(default, deserialize_with = "query_number")]
    pub skip: Option<u32>,
}

#[derive(Deserialize)]
pub struct UtxoQuery {
    #[serde(default, deserialize_with = "query_number")]
    pub minconf: Option<u32>,
    #[serde(default, deserialize_with = "query_number")]
    pub maxconf: Option<u32>,
}

#[derive(Deserialize)]
pub struct BlockQuery {
    #[serde(default, deserialize_with = "query_number")]
    pub verbosity: Option<u8>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub chain: Value,
    pub blocks: Value,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub success: bool,
    pub blocks: usize,
    pub hashes: Vec<String>,
    pub address: String,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub confirmed: f64,
    pub unconfirmed: f64,
}

#[derive(Serialize)]
pub struct AddressResponse {
    pub address: Value,
}

#[derive(Serialize)]
pub struct TxidResponse {
    pub txid: Value,
}

#[derive(Serialize)]
pub struct RawTransactionResponse {
    pub raw: Value,
}

#[derive(Serialize)]
pub struct HexResponse {
    pub hex: Value,
}

#[derive(Serialize)]
pub struct HashResponse {
    pub hash: Value,
}

#[derive(Serialize)]
pub struct PsbtResponse {
    pub psbt: Value,
}

#[derive(Serialize)]
pub struct PrivKeyResponse {
    pub privkey: Value,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize)]
pub struct RpcResultResponse {
    pub result: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub success: bool,
    pub original_txid: String,
    pub replacement_txid: String,
    pub cancel_address: String,
    pub original_fee_rate: f64,
    pub new_fee_rate: u64,
    pub new_fee: f64,
    pub amount_recovered: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidated_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_wallet: Option<String>,
}

#[derive(Serialize)]
pub struct ReconsiderResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reconsidered: Vec<String>,
}
