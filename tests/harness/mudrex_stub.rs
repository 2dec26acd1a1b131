//! Minimal Mudrex futures API served by axum on a random local port.

use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Secret the stub rejects with 401.
pub const BAD_SECRET: &str = "revoked-secret-000";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub auth: Option<String>,
    pub body: Value,
}

struct State {
    balance: String,
    requests: Vec<RecordedRequest>,
    positions: Vec<Value>,
    next_order: u32,
}

#[derive(Clone)]
pub struct MudrexStub {
    state: Arc<Mutex<State>>,
}

impl MudrexStub {
    /// Start the stub and return it with its base URL.
    pub async fn start(balance: &str) -> (Self, String) {
        let stub = Self {
            state: Arc::new(Mutex::new(State {
                balance: balance.to_string(),
                requests: Vec::new(),
                positions: Vec::new(),
                next_order: 1,
            })),
        };

        let router = Router::new().fallback({
            let stub = stub.clone();
            move |method: Method, uri: Uri, headers: HeaderMap, body: String| {
                let stub = stub.clone();
                async move { stub.handle(method, &uri, &headers, &body) }
            }
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        (stub, format!("http://{addr}/fapi/v1"))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Requests whose path ends with `suffix`.
    pub fn requests_to(&self, suffix: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.ends_with(suffix))
            .collect()
    }

    pub fn positions(&self) -> Vec<Value> {
        self.state.lock().unwrap().positions.clone()
    }

    fn handle(
        &self,
        method: Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: &str,
    ) -> (StatusCode, Json<Value>) {
        let auth = headers
            .get("X-Authentication")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let path = uri
            .path()
            .strip_prefix("/fapi/v1")
            .unwrap_or(uri.path())
            .to_string();
        let body: Value = serde_json::from_str(body).unwrap_or(Value::Null);

        let mut state = self.state.lock().unwrap();
        state.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            auth: auth.clone(),
            body: body.clone(),
        });

        if auth.as_deref() == Some(BAD_SECRET) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"success": false, "errors": [{"code": 401, "text": "invalid api secret"}]})),
            );
        }

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let ok = |data: Value| (StatusCode::OK, Json(json!({"success": true, "data": data})));

        match (method.as_str(), segments.as_slice()) {
            ("GET", ["futures", "funds"]) => ok(json!({"balance": state.balance})),
            ("GET", ["futures", "positions"]) => ok(Value::Array(state.positions.clone())),
            ("GET", ["futures", "XRPUSDT"]) => ok(json!({
                "symbol": "XRPUSDT",
                "quantity_step": "0.1",
                "min_contract": "1",
                "max_contract": "100000",
                "price": "2"
            })),
            ("GET", ["futures", _]) => (
                StatusCode::NOT_FOUND,
                Json(json!({"success": false, "errors": [{"code": 404, "text": "asset not found"}]})),
            ),
            ("POST", ["futures", _, "leverage"]) => ok(json!({})),
            ("POST", ["futures", symbol, "order"]) => {
                let order_id = format!("ORD-{}", state.next_order);
                state.next_order += 1;
                let position = json!({
                    "position_id": format!("POS-{symbol}"),
                    "symbol": symbol,
                    "side": body["order_type"],
                    "quantity": body["quantity"],
                });
                state.positions.push(position);
                ok(json!({"order_id": order_id}))
            }
            ("POST", ["futures", "positions", _, "riskorder"]) => ok(json!({})),
            ("POST", ["futures", "positions", id, "close"]) => {
                let id = (*id).to_string();
                state.positions.retain(|p| p["position_id"] != id.as_str());
                ok(json!({}))
            }
            ("POST", ["futures", "positions", _, "close", "partial"]) => ok(json!({})),
            _ => (
                StatusCode::NOT_FOUND,
                Json(json!({"success": false, "errors": [{"text": "no such route"}]})),
            ),
        }
    }
}
