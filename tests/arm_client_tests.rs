//! # ARM Client Integration Tests
//!
//! Runs the ARM lookup client against a local axum server standing in for
//! the Azure Resource Manager collection endpoint.

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use cosmos_mongo_acctest::config::HarnessConfig;
use cosmos_mongo_acctest::constants::MONGO_COLLECTION_API_VERSION;
use cosmos_mongo_acctest::harness::{ExistenceChecker, HarnessError};
use cosmos_mongo_acctest::model::{IndexDescriptor, LifecycleState, ResourceKey, ResourceState};
use cosmos_mongo_acctest::provider::{
    AzureCollectionClient, BackendError, CollectionClient, LookupOutcome,
};
use cosmos_mongo_acctest::render::collection_address;
use cosmos_mongo_acctest::runtime;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SUBSCRIPTION: &str = "11111111-2222-3333-4444-555555555555";

async fn get_collection(
    Path((subscription, rg, account, database, name)): Path<(String, String, String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer test-token");
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if query.get("api-version").map(String::as_str) != Some(MONGO_COLLECTION_API_VERSION) {
        return (StatusCode::BAD_REQUEST, "missing api-version").into_response();
    }

    match name.as_str() {
        "present" => Json(json!({
            "id": format!(
                "/subscriptions/{subscription}/resourceGroups/{rg}/providers/Microsoft.DocumentDB/databaseAccounts/{account}/mongodbDatabases/{database}/collections/{name}"
            ),
            "name": name,
            "properties": {
                "resource": {
                    "id": name,
                    "shardKey": {"seven": "Hash"},
                    "indexes": [
                        {"key": {"keys": ["_id"]}},
                        {"key": {"keys": ["_ts"]}, "options": {"expireAfterSeconds": 707}},
                        {"key": {"keys": ["seven"]}},
                        {"key": {"keys": ["day"]}, "options": {"unique": false}}
                    ]
                }
            }
        }))
        .into_response(),
        "throttled" => (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"code": "NotFound", "message": "Resource not found"})),
        )
            .into_response(),
    }
}

async fn start_mock_arm() -> SocketAddr {
    let app = Router::new().route(
        "/subscriptions/{subscription}/resourceGroups/{rg}/providers/Microsoft.DocumentDB/databaseAccounts/{account}/mongodbDatabases/{database}/collections/{name}",
        get(get_collection),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn mock_client() -> AzureCollectionClient {
    runtime::install_crypto_provider();
    let addr = start_mock_arm().await;
    let config = HarnessConfig {
        subscription_id: Some(SUBSCRIPTION.to_string()),
        arm_endpoint: format!("http://{addr}"),
        mock_auth: true,
        ..HarnessConfig::default()
    };
    AzureCollectionClient::new(&config).unwrap()
}

fn key(name: &str) -> ResourceKey {
    ResourceKey::new("acctestRG-1", "acctest-1", "acctest-1", name)
}

#[tokio::test]
async fn test_lookup_maps_found_collection() {
    let client = mock_client().await;

    let outcome = client.get_mongo_collection(&key("present")).await.unwrap();

    let LookupOutcome::Found(attributes) = outcome else {
        panic!("expected collection to be found");
    };
    assert_eq!(attributes.key, key("present"));
    assert_eq!(attributes.default_ttl_seconds, Some(707));
    assert_eq!(attributes.shard_key.as_deref(), Some("seven"));
    assert_eq!(
        attributes.normalized_indexes(),
        vec![
            IndexDescriptor::with_unique("day", false),
            IndexDescriptor::with_unique("seven", false),
        ]
    );
}

#[tokio::test]
async fn test_lookup_not_found() {
    let client = mock_client().await;

    let outcome = client.get_mongo_collection(&key("gone")).await.unwrap();

    assert!(matches!(outcome, LookupOutcome::NotFound));
}

#[tokio::test]
async fn test_lookup_throttled_is_transient() {
    let client = mock_client().await;

    let err = client.get_mongo_collection(&key("throttled")).await.unwrap_err();

    match &err {
        BackendError::Http { status, body } => {
            assert_eq!(*status, 429);
            assert_eq!(body, "slow down");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_checker_reports_transport_failure() {
    let client = mock_client().await;
    let checker = ExistenceChecker::new(
        Arc::new(client),
        Duration::from_secs(5),
        CancellationToken::new(),
    );
    let address = collection_address();
    let state = LifecycleState::new(vec![ResourceState::from_values(
        address.clone(),
        &json!({
            "name": "throttled",
            "resource_group_name": "acctestRG-1",
            "account_name": "acctest-1",
            "database_name": "acctest-1",
        }),
    )]);

    let err = checker.check(&state, &address).await.unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Transport {
            source: BackendError::Http { status: 429, .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_checker_confirms_present_collection() {
    let client = mock_client().await;
    let checker = ExistenceChecker::new(
        Arc::new(client),
        Duration::from_secs(5),
        CancellationToken::new(),
    );

    let outcome = checker.lookup(&key("present")).await.unwrap();

    assert!(matches!(outcome, LookupOutcome::Found(_)));
}
