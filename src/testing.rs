use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::dispatch::{DispatchError, PreparedRequest, Reply, Transport};

/// In-memory transport replaying canned replies per path (query ignored)
/// and recording every request it sees.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<HashMap<String, VecDeque<Result<Reply, DispatchError>>>>,
    requests: Mutex<Vec<PreparedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, path: &str, reply: Result<Reply, DispatchError>) {
        self.script
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn push_json(&self, path: &str, body: Value) {
        self.push(path, Ok(Reply::json_ok(&body)));
    }

    pub fn push_bytes(&self, path: &str, bytes: &[u8]) {
        self.push(
            path,
            Ok(Reply {
                status: 200,
                body: bytes.to_vec(),
            }),
        );
    }

    pub fn push_status(&self, path: &str, status: u16) {
        self.push(
            path,
            Ok(Reply {
                status,
                body: Vec::new(),
            }),
        );
    }

    pub fn push_error(&self, path: &str, detail: &str) {
        self.push(path, Err(DispatchError::Transport(detail.to_string())));
    }

    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.path)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<Reply, DispatchError> {
        let key = request
            .path
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(DispatchError::Transport(format!("no reply scripted for {}", key))))
    }
}
