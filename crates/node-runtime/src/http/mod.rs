//! # HTTP transport
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | POST | `/p2p` | `PeerMessage` | `PeerReply` |
//! | GET | `/chain` | - | `[Block]` |
//! | GET | `/chain/:index` | - | `Block` or 404 |
//! | GET | `/validators` | - | `[ValidatorStats]` |
//! | GET | `/status` | - | `NodeStatus` |
//! | GET | `/metrics` | - | Prometheus text |
//! | POST | `/transactions` | `Transaction` | `{hash}` or 400 |

use crate::adapters::network::P2P_PATH;
use crate::container::NodeContainer;
use crate::handlers::{self, query, NodeStatus, SubmitReceipt};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ql_03_validator_registry::ValidatorStats;
use ql_05_peer_sync::{PeerMessage, PeerReply};
use serde_json::json;
use shared_types::{Block, Transaction};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

type AppState = Arc<NodeContainer>;

pub fn router(node: Arc<NodeContainer>) -> Router {
    Router::new()
        .route(P2P_PATH, post(p2p))
        .route("/chain", get(chain))
        .route("/chain/:index", get(block))
        .route("/validators", get(validators))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .route("/transactions", post(submit_transaction))
        .layer(TraceLayer::new_for_http())
        .with_state(node)
}

async fn p2p(State(node): State<AppState>, Json(message): Json<PeerMessage>) -> Json<PeerReply> {
    Json(handlers::dispatch(&node, message).await)
}

async fn chain(State(node): State<AppState>) -> Json<Vec<Block>> {
    Json(query::chain(&node))
}

async fn block(State(node): State<AppState>, Path(index): Path<u64>) -> Response {
    match query::block(&node, index) {
        Some(block) => Json(block).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no block at index {index}") })),
        )
            .into_response(),
    }
}

async fn validators(State(node): State<AppState>) -> Json<Vec<ValidatorStats>> {
    Json(query::validator_stats(&node))
}

async fn status(State(node): State<AppState>) -> Json<NodeStatus> {
    Json(query::status(&node))
}

async fn metrics() -> Response {
    match ql_telemetry::encode_metrics() {
        Ok(body) => (
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn submit_transaction(
    State(node): State<AppState>,
    Json(tx): Json<Transaction>,
) -> Result<Json<SubmitReceipt>, (StatusCode, Json<serde_json::Value>)> {
    query::submit(&node, tx)
        .map(Json)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::NodeConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn make_node(dir: &std::path::Path) -> Arc<NodeContainer> {
        let mut config = NodeConfig::for_node("N1");
        config.node.data_dir = dir.to_path_buf();
        config.mempool.known_accounts = [shared_types::NodeId::new("alice")].into_iter().collect();
        Arc::new(NodeContainer::build(config).unwrap())
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_chain_and_missing_block() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(make_node(dir.path()));

        let response = app
            .clone()
            .oneshot(Request::get("/chain").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let chain = body_json(response).await;
        assert_eq!(chain.as_array().unwrap().len(), 1);
        assert_eq!(chain[0]["validator"], "genesis");

        let response = app
            .oneshot(Request::get("/chain/7").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_chain_message() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(make_node(dir.path()));

        let response = app
            .oneshot(post_json("/p2p", json!({ "type": "GET_CHAIN" })))
            .await
            .unwrap();
        let reply = body_json(response).await;
        assert_eq!(reply["type"], "CHAIN");
        assert_eq!(reply["blocks"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_node_ping_registers_sender() {
        let dir = tempfile::tempdir().unwrap();
        let node = make_node(dir.path());
        let app = router(node.clone());

        let ping = json!({
            "type": "NODE_PING",
            "node": { "id": "N4", "location": "127.0.0.1:7004" }
        });
        let reply = body_json(app.oneshot(post_json("/p2p", ping)).await.unwrap()).await;

        assert_eq!(reply["type"], "ACK");
        use ql_03_validator_registry::RegistryApi;
        assert!(node.registry.get(&shared_types::NodeId::new("N4")).is_some());
    }

    #[tokio::test]
    async fn test_transaction_submission() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(make_node(dir.path()));

        let accepted = json!({ "sender": "alice", "recipient": "bob", "amount": 2.5, "timestamp": 9 });
        let response = app
            .clone()
            .oneshot(post_json("/transactions", accepted))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["hash"].as_str().unwrap().len(), 64);

        let unknown = json!({ "sender": "mallory", "recipient": "bob", "amount": 1.0, "timestamp": 9 });
        let response = app.oneshot(post_json("/transactions", unknown)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_message_type_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(make_node(dir.path()));

        let response = app
            .oneshot(post_json("/p2p", json!({ "type": "FORGE_BLOCK" })))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
