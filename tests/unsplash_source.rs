use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use photo_gallery::error::FetchError;
use photo_gallery::tasks::fetcher::{PhotoSource, UnsplashSource};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Endpoint {
    seen: Arc<Mutex<Vec<HashMap<String, String>>>>,
    versions: Arc<Mutex<Vec<String>>>,
}

async fn photos(
    State(endpoint): State<Endpoint>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Some(version) = headers.get("accept-version").and_then(|v| v.to_str().ok()) {
        endpoint.versions.lock().unwrap().push(version.to_string());
    }
    endpoint.seen.lock().unwrap().push(params.clone());

    if params.get("client_id").map(String::as_str) != Some("test-key") {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let per_page: u32 = params
        .get("per_page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);
    match page {
        7 => (StatusCode::OK, "{\"not\": \"an array\"}").into_response(),
        9 => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        11 => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            axum::Json(Vec::<serde_json::Value>::new()).into_response()
        }
        _ => {
            let items: Vec<serde_json::Value> = (0..per_page)
                .map(|i| {
                    serde_json::json!({
                        "id": format!("{page}-{i}"),
                        "alt_description": if i == 0 { serde_json::Value::Null } else { format!("photo {i}").into() },
                        "urls": {
                            "raw": "ignored",
                            "small": format!("http://cdn/{page}/{i}/small"),
                            "regular": format!("http://cdn/{page}/{i}/regular"),
                            "full": format!("http://cdn/{page}/{i}/full"),
                        }
                    })
                })
                .collect();
            axum::Json(items).into_response()
        }
    }
}

async fn serve(endpoint: Endpoint) -> SocketAddr {
    let app = Router::new()
        .route("/photos", get(photos))
        .with_state(endpoint);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn requests_page_with_credential() {
    let endpoint = Endpoint::default();
    let addr = serve(endpoint.clone()).await;
    let source = UnsplashSource::new(&format!("http://{addr}/"), Some("test-key".into()), None)
        .unwrap();

    let photos = source.fetch_page(2, 10).await.unwrap();
    assert_eq!(photos.len(), 10);
    assert_eq!(photos[0].alt_description, None);
    assert_eq!(photos[1].alt_description.as_deref(), Some("photo 1"));
    assert_eq!(photos[3].urls.small, "http://cdn/2/3/small");
    assert_eq!(photos[3].urls.full, "http://cdn/2/3/full");

    let seen = endpoint.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["page"], "2");
    assert_eq!(seen[0]["per_page"], "10");
    assert_eq!(seen[0]["client_id"], "test-key");
    assert_eq!(endpoint.versions.lock().unwrap().as_slice(), ["v1"]);
}

#[tokio::test]
async fn non_success_status_is_a_failure() {
    let addr = serve(Endpoint::default()).await;
    let source =
        UnsplashSource::new(&format!("http://{addr}"), Some("test-key".into()), None).unwrap();

    match source.fetch_page(9, 10).await {
        Err(FetchError::Status { status, page }) => {
            assert_eq!(status, reqwest::StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(page, 9);
        }
        other => panic!("expected status failure, got {other:?}"),
    }

    let wrong_key =
        UnsplashSource::new(&format!("http://{addr}"), Some("nope".into()), None).unwrap();
    assert!(matches!(
        wrong_key.fetch_page(1, 10).await,
        Err(FetchError::Status { status, .. }) if status == reqwest::StatusCode::UNAUTHORIZED
    ));
}

#[tokio::test]
async fn malformed_body_is_a_decode_failure() {
    let addr = serve(Endpoint::default()).await;
    let source =
        UnsplashSource::new(&format!("http://{addr}"), Some("test-key".into()), None).unwrap();
    assert!(matches!(
        source.fetch_page(7, 10).await,
        Err(FetchError::Decode(_))
    ));
}

#[tokio::test]
async fn missing_key_never_hits_the_network() {
    let endpoint = Endpoint::default();
    let addr = serve(endpoint.clone()).await;
    let source = UnsplashSource::new(&format!("http://{addr}"), None, None).unwrap();
    assert!(matches!(
        source.fetch_page(1, 10).await,
        Err(FetchError::MissingCredential)
    ));
    assert!(endpoint.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let source =
        UnsplashSource::new(&format!("http://{addr}"), Some("test-key".into()), None).unwrap();
    assert!(matches!(
        source.fetch_page(1, 10).await,
        Err(FetchError::Transport(_))
    ));
}

#[tokio::test]
async fn slow_endpoint_hits_request_timeout() {
    let addr = serve(Endpoint::default()).await;
    let source = UnsplashSource::new(
        &format!("http://{addr}"),
        Some("test-key".into()),
        Some(Duration::from_millis(100)),
    )
    .unwrap();

    let started = std::time::Instant::now();
    match source.fetch_page(11, 10).await {
        Err(FetchError::Transport(err)) => assert!(err.is_timeout(), "not a timeout: {err}"),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(2));
}
