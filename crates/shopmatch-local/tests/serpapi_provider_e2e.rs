use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use shopmatch_core::{Error, ProductSearchProvider, ResultKind, SearchQuery};
use shopmatch_local::search::{DomainFallback, SerpApiProvider};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Fixture {
    calls: Mutex<Vec<HashMap<String, String>>>,
}

async fn search(
    State(fx): State<Arc<Fixture>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    fx.calls.lock().unwrap().push(params.clone());
    let q = params.get("q").cloned().unwrap_or_default();
    if q.contains("slow") {
        tokio::time::sleep(Duration::from_millis(1_500)).await;
    }
    if q.contains("boom") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    if q.contains("empty") || q.contains("site:ikea.si") {
        return Json(serde_json::json!({ "organic_results": [] })).into_response();
    }
    Json(serde_json::json!({
        "organic_results": [
            {"title": "Stol Oslo", "link": "https://www.ikea.com/si/sl/p/oslo-stol-123456789/", "snippet": "Bež žamet"},
            {"title": "Dropped", "link": ""}
        ],
        "shopping_results": [
            {"title": "Stol Oslo", "product_link": "https://shop.si/p/oslo", "price": "89 €", "source": "Shop"}
        ]
    }))
    .into_response()
}

async fn serve() -> (SocketAddr, Arc<Fixture>) {
    let fx = Arc::new(Fixture::default());
    let app = Router::new()
        .route("/search.json", get(search))
        .with_state(fx.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, fx)
}

fn provider(addr: SocketAddr) -> SerpApiProvider {
    SerpApiProvider::new(reqwest::Client::new(), "test-key")
        .with_endpoint(format!("http://{addr}/search.json"))
}

fn query(text: &str) -> SearchQuery {
    SearchQuery {
        query: text.to_string(),
        max_results: Some(10),
        language: Some("sl".to_string()),
        country: Some("si".to_string()),
        timeout_ms: Some(300),
    }
}

#[tokio::test]
async fn parses_sections_and_drops_empty_links() {
    let (addr, fx) = serve().await;
    let resp = provider(addr).search(&query("jedilni stol")).await.unwrap();
    assert_eq!(resp.provider, "serpapi");
    assert_eq!(resp.attempts, 1);
    assert_eq!(resp.results.len(), 2);
    assert_eq!(resp.results[0].section, ResultKind::Organic);
    assert_eq!(resp.results[1].section, ResultKind::Shopping);
    assert_eq!(resp.results[1].link, "https://shop.si/p/oslo");

    let calls = fx.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let c = &calls[0];
    assert_eq!(c.get("engine").map(String::as_str), Some("google"));
    assert_eq!(c.get("api_key").map(String::as_str), Some("test-key"));
    assert_eq!(c.get("hl").map(String::as_str), Some("sl"));
    assert_eq!(c.get("gl").map(String::as_str), Some("si"));
    assert_eq!(c.get("num").map(String::as_str), Some("10"));
}

#[tokio::test]
async fn slow_provider_is_a_timeout_not_a_generic_error() {
    let (addr, _fx) = serve().await;
    let err = provider(addr)
        .search(&query("slow stol"))
        .await
        .unwrap_err();
    assert_eq!(err, Error::Timeout { timeout_ms: 300 });
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn http_error_is_a_provider_error() {
    let (addr, _fx) = serve().await;
    let err = provider(addr)
        .search(&query("boom stol"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider(ref m) if m.contains("500")), "{err:?}");
}

#[tokio::test]
async fn empty_scoped_query_falls_back_to_alternate_domain_once() {
    let (addr, fx) = serve().await;
    let resp = provider(addr)
        .search(&query("jedilni stol site:ikea.si"))
        .await
        .unwrap();
    assert_eq!(resp.attempts, 2);
    assert_eq!(resp.effective_query, "jedilni stol site:ikea.com/si");
    assert_eq!(resp.results.len(), 2);

    let calls = fx.calls.lock().unwrap();
    let sent: Vec<&str> = calls
        .iter()
        .map(|c| c.get("q").map(String::as_str).unwrap_or(""))
        .collect();
    assert_eq!(
        sent,
        vec!["jedilni stol site:ikea.si", "jedilni stol site:ikea.com/si"]
    );
}

#[tokio::test]
async fn fallback_never_makes_more_than_one_extra_call() {
    let (addr, fx) = serve().await;
    let resp = provider(addr)
        .search(&query("empty stol site:ikea.si"))
        .await
        .unwrap();
    assert!(resp.results.is_empty());
    assert_eq!(resp.attempts, 2);
    assert_eq!(fx.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn unscoped_empty_query_does_not_retry() {
    let (addr, fx) = serve().await;
    let resp = provider(addr).search(&query("empty stol")).await.unwrap();
    assert!(resp.results.is_empty());
    assert_eq!(resp.attempts, 1);
    assert_eq!(fx.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn custom_fallback_table_replaces_the_default() {
    let (addr, fx) = serve().await;
    let p = provider(addr).with_fallbacks(vec![DomainFallback::new("empty.si", "full.si")]);

    // The default ikea rule is gone: an empty ikea.si result is final.
    let resp = p.search(&query("stol site:ikea.si")).await.unwrap();
    assert_eq!(resp.attempts, 1);
    assert!(resp.results.is_empty());

    let resp = p.search(&query("stol site:www.empty.si")).await.unwrap();
    assert_eq!(resp.attempts, 2);
    assert_eq!(resp.effective_query, "stol site:full.si");
    assert_eq!(resp.results.len(), 2);
    assert_eq!(fx.calls.lock().unwrap().len(), 3);
}
