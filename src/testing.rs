use crate::error::{ApiError, ApiResult};
use crate::rpc::RpcTransport;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub enum Reply {
    Result(Value),
    Error(i64, String),
    Transport(String),
    Raw(String),
}

impl Reply {
    pub fn result(value: Value) -> Self {
        Self::Result(value)
    }

    pub fn error(code: i64, message: &str) -> Self {
        Self::Error(code, message.to_string())
    }

    pub fn transport(message: &str) -> Self {
        Self::Transport(message.to_string())
    }

    pub fn raw(body: &str) -> Self {
        Self::Raw(body.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub method: String,
    pub body: Value,
}

/// Answers calls from a fixed queue of replies and records what was asked.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn post(&self, path: &str, body: String) -> ApiResult<String> {
        let body: Value = serde_json::from_str(&body).unwrap();
        let method = body["method"].as_str().unwrap_or_default().to_string();
        let id = body["id"].clone();
        self.calls.lock().unwrap().push(RecordedCall {
            path: path.to_string(),
            method: method.clone(),
            body,
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected RPC call: {}", method));

        match reply {
            Reply::Result(result) => Ok(json!({ "result": result, "error": null, "id": id }).to_string()),
            Reply::Error(code, message) => Ok(json!({
                "result": null,
                "error": { "code": code, "message": message },
                "id": id
            })
            .to_string()),
            Reply::Transport(message) => Err(ApiError::Transport(message)),
            Reply::Raw(body) => Ok(body),
        }
    }
}
