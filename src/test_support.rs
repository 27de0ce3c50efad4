//! In-memory backend for unit tests.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::api::{ApiClient, ApiTransport, RawResponse};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub token: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone)]
enum Route {
    Reply(RawResponse),
    Unreachable(String),
}

/// Routes `"METHOD /path"` to a fixed reply and records every request.
/// Unrouted requests behave like an unreachable backend.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.routes.lock().unwrap().insert(
            format!("{method} {path}"),
            Route::Reply(RawResponse {
                status,
                body: body.to_string(),
            }),
        );
        self
    }

    pub fn reply_json(self, method: &str, path: &str, status: u16, body: Value) -> Self {
        self.reply(method, path, status, &body.to_string())
    }

    pub fn unreachable(self, method: &str, path: &str, message: &str) -> Self {
        self.routes.lock().unwrap().insert(
            format!("{method} {path}"),
            Route::Unreachable(message.to_string()),
        );
        self
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(Arc::new(self.clone()))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<RawResponse, String> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            path: path.to_string(),
            token: token.map(String::from),
            body: body.cloned(),
        });
        let route = self
            .routes
            .lock()
            .unwrap()
            .get(&format!("{method} {path}"))
            .cloned();
        match route {
            Some(Route::Reply(resp)) => Ok(resp),
            Some(Route::Unreachable(message)) => Err(message),
            None => Err(format!("no route for {method} {path}")),
        }
    }

    fn description(&self) -> String {
        "scripted".to_string()
    }
}
