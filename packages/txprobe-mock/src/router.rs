//! Matchit routing configuration.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use hyper::{body::Bytes, Request, Response};
use matchit::Router as MatchitRouter;
use txprobe_core::sim::{SimulatedSession, SimulatedWarehouse};

use crate::config::MockConfig;
use crate::handlers;

/// Query result held back until the client has polled enough times.
#[derive(Debug, Clone)]
pub struct PendingResult {
    /// Token of the session that issued the query
    pub token: String,
    /// Polls left before the result is released
    pub remaining_polls: u32,
    /// Serialized final response body
    pub body: Vec<u8>,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Simulated warehouse all sessions run against
    pub warehouse: SimulatedWarehouse,
    /// Endpoint configuration
    pub config: Arc<MockConfig>,
    /// Session token to simulated session
    pub sessions: Arc<Mutex<HashMap<String, Arc<SimulatedSession>>>>,
    /// Query id to held-back result
    pub pending: Arc<Mutex<HashMap<String, PendingResult>>>,
}

impl AppState {
    pub fn new(warehouse: SimulatedWarehouse, config: MockConfig) -> Self {
        Self {
            warehouse,
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// HTTP request router.
pub struct Router {
    inner: MatchitRouter<RouteHandler>,
    state: AppState,
}

impl Router {
    /// Creates a new router with the login and query routes.
    pub fn new(state: AppState) -> Self {
        let mut router = MatchitRouter::new();

        router
            .insert("/session/v1/login-request", RouteHandler::Login)
            .expect("Failed to insert login route");
        router
            .insert("/queries/v1/query-request", RouteHandler::Query)
            .expect("Failed to insert query route");
        router
            .insert("/queries/{query_id}/result", RouteHandler::QueryResult)
            .expect("Failed to insert query result route");

        Self {
            inner: router,
            state,
        }
    }

    /// Returns the shared state (the simulated warehouse, for inspection).
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Routes an incoming request to the appropriate handler.
    pub async fn route(
        &self,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Bytes>, RouterError> {
        let path = req.uri().path().to_string();

        match self.inner.at(&path) {
            Ok(matched) => {
                let handler = matched.value;
                handler
                    .handle(req, matched.params, self.state.clone())
                    .await
            }
            Err(_) => Err(RouterError::NotFound(format!("No route found for {}", path))),
        }
    }
}

/// Route handler function.
enum RouteHandler {
    Login,
    Query,
    QueryResult,
}

impl RouteHandler {
    /// Handles a request with the given route parameters.
    async fn handle(
        &self,
        req: Request<hyper::body::Incoming>,
        params: matchit::Params<'_, '_>,
        state: AppState,
    ) -> Result<Response<Bytes>, RouterError> {
        match self {
            RouteHandler::Login if req.method() == hyper::Method::POST => {
                handlers::login(req, state).await
            }
            RouteHandler::Query if req.method() == hyper::Method::POST => {
                handlers::query(req, state).await
            }
            RouteHandler::QueryResult if req.method() == hyper::Method::GET => {
                let query_id = params.get("query_id").unwrap_or_default().to_string();
                handlers::query_result(req, &query_id, state).await
            }
            _ => Err(RouterError::MethodNotAllowed),
        }
    }
}

/// Router error type.
#[derive(Debug)]
pub enum RouterError {
    MethodNotAllowed,
    InternalError(String),
    Timeout,
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::MethodNotAllowed => write!(f, "Method Not Allowed"),
            RouterError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
            RouterError::Timeout => write!(f, "Request Timeout"),
            RouterError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            RouterError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            RouterError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
        }
    }
}

impl std::error::Error for RouterError {}

impl From<RouterError> for Response<Bytes> {
    fn from(err: RouterError) -> Self {
        let (status, code, message): (u16, &str, String) = match &err {
            RouterError::MethodNotAllowed => (405, "405", "Method Not Allowed".to_string()),
            RouterError::InternalError(msg) => (500, "500", msg.clone()),
            RouterError::Timeout => (408, "408", "Request Timeout".to_string()),
            RouterError::BadRequest(msg) => (400, "400", msg.clone()),
            RouterError::NotFound(msg) => (404, "404", msg.clone()),
            RouterError::Unauthorized(msg) => (401, handlers::codes::SESSION_GONE, msg.clone()),
        };

        let body = handlers::failure(code, message, serde_json::Value::Null);
        let json = serde_json::to_vec(&body).unwrap_or_else(|e| {
            format!(
                "{{\"success\":false,\"code\":\"500\",\"message\":\"Failed to serialize error: {}\",\"data\":null}}",
                e
            )
            .into_bytes()
        });

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Bytes::from(json))
            .unwrap_or_else(|_| Response::new(Bytes::from_static(b"Internal Server Error")))
    }
}
