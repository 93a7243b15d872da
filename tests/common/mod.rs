#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Canned reply of the stub API.
#[derive(Clone, Debug)]
pub enum Reply {
    Json(Value),
    Status(u16),
    Raw(&'static str),
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json(body) => Json(body).into_response(),
            Reply::Status(code) => StatusCode::from_u16(code)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                .into_response(),
            Reply::Raw(body) => ([("content-type", "application/json")], body).into_response(),
        }
    }
}

#[derive(Default)]
pub struct StubState {
    pub nodes: Mutex<Option<Reply>>,
    pub overview: Mutex<VecDeque<Reply>>,
    /// Replies for `/api/charts`; the last one repeats once the queue is down to it.
    pub charts: Mutex<VecDeque<Reply>>,
    pub chart_queries: Mutex<Vec<HashMap<String, String>>>,
}

fn next_reply(queue: &Mutex<VecDeque<Reply>>) -> Reply {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front().unwrap()
    } else {
        queue.front().cloned().unwrap_or(Reply::Status(404))
    }
}

async fn nodes(State(state): State<Arc<StubState>>) -> Reply {
    state.nodes.lock().unwrap().clone().unwrap_or(Reply::Status(404))
}

async fn overview(State(state): State<Arc<StubState>>) -> Reply {
    next_reply(&state.overview)
}

async fn charts(
    State(state): State<Arc<StubState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    state.chart_queries.lock().unwrap().push(query);
    next_reply(&state.charts)
}

pub struct StubApi {
    pub url: String,
    pub state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl StubApi {
    pub async fn start(state: StubState) -> std::io::Result<Self> {
        let state = Arc::new(state);
        let app = Router::new()
            .route("/api/nodes", get(nodes))
            .route("/api/overview", get(overview))
            .route("/api/charts", get(charts))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self { url, state, handle })
    }

    pub fn set_charts(&self, replies: Vec<Reply>) {
        *self.state.charts.lock().unwrap() = replies.into();
    }
}

impl Drop for StubApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn samples(times: &[&str], value: f64) -> Value {
    Value::Array(
        times
            .iter()
            .map(|t| json!({"time": t, "value": value}))
            .collect(),
    )
}

/// Charts body with every fixed family on `times` plus the given sensors.
pub fn charts_body(times: &[&str], sensors: &[&str]) -> Value {
    let speed: Vec<Value> = times
        .iter()
        .map(|t| json!({"time": t, "rx": 2048, "tx": 1024}))
        .collect();
    let load: Vec<Value> = times
        .iter()
        .map(|t| json!({"time": t, "load1": 0.5, "load5": 0.4, "load15": 0.3}))
        .collect();
    let temperature: serde_json::Map<String, Value> = sensors
        .iter()
        .map(|name| (name.to_string(), samples(times, 45.0)))
        .collect();
    json!({
        "cpu": samples(times, 12.5),
        "memory": samples(times, 50.0),
        "swap": samples(times, 0.0),
        "disk_speed": speed.clone(),
        "net_speed": speed,
        "load": load,
        "temperature": temperature,
    })
}
