use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use search_core::{build_artifacts, ArtifactPaths, Document, IndexConfig, PageRankConfig};
use serde_json::Value;
use server::{build_app, AppOptions, DEFAULT_TOP_K, MAX_TOP_K};
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

fn tiny_corpus() -> Vec<Document> {
    vec![
        Document::new("https://rust.test/", "Rust", "Rust is great. rust systems programming.", vec!["https://learn.test/".into()]),
        Document::new("https://learn.test/", "Learning", "Learning rust step by step.", vec!["https://rust.test/".into(), "https://other.test/".into()]),
        Document::new("https://other.test/", "Gardening", "Tomatoes need sun.", vec!["https://rust.test/".into()]),
    ]
}

fn build_tiny_index(dir: &Path, docs: &[Document]) {
    let report = build_artifacts(docs, &IndexConfig::default(), &PageRankConfig::default()).unwrap();
    report.artifacts.save(&ArtifactPaths::new(dir)).unwrap();
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let docs = tiny_corpus();
    build_tiny_index(dir.path(), &docs);
    let app = build_app(AppOptions::new(dir.path())).unwrap();

    let (status, json) = get(app, "/search?q=rust&top_k=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["query"], "rust");
    assert!(json["time"].as_f64().unwrap() >= 0.0);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["doc_id"], docs[0].doc_id.as_str());
    assert_eq!(arr[1]["doc_id"], docs[1].doc_id.as_str());
    for hit in arr {
        for key in ["url", "title", "score", "bm25", "pagerank"] {
            assert!(!hit[key].is_null(), "missing {key}");
        }
    }
}

#[tokio::test]
async fn missing_or_blank_query_is_empty() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &tiny_corpus());
    let app = build_app(AppOptions::new(dir.path())).unwrap();

    let (status, json) = get(app.clone(), "/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "query": "", "results": [] }));

    let (_, json) = get(app.clone(), "/search?q=%20%20").await;
    assert_eq!(json, serde_json::json!({ "query": "", "results": [] }));

    let (_, json) = get(app, "/search?q=zzzznotaterm").await;
    assert_eq!(json["results"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn top_k_is_clamped() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &tiny_corpus());
    let app = build_app(AppOptions::new(dir.path())).unwrap();
    let (_, json) = get(app, "/search?q=rust&top_k=0").await;
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
}

fn wide_corpus(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| Document::new(format!("https://wide.test/{i}"), format!("Page {i}"), "rust everywhere", vec![]))
        .collect()
}

async fn hit_count(app: Router, uri: &str) -> usize {
    let (status, json) = get(app, uri).await;
    assert_eq!(status, StatusCode::OK, "{uri}");
    json["results"].as_array().unwrap().len()
}

#[tokio::test]
async fn top_k_is_capped_at_the_maximum() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &wide_corpus(MAX_TOP_K + 20));
    let app = build_app(AppOptions::new(dir.path())).unwrap();

    assert_eq!(hit_count(app.clone(), "/search?q=rust&top_k=1000").await, MAX_TOP_K);
    assert_eq!(hit_count(app.clone(), "/search?q=rust&top_k=100").await, MAX_TOP_K);
    assert_eq!(hit_count(app, "/search?q=rust&top_k=7").await, 7);
}

#[tokio::test]
async fn unusable_top_k_falls_back_to_default() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &wide_corpus(MAX_TOP_K + 20));
    let app = build_app(AppOptions::new(dir.path())).unwrap();

    assert_eq!(hit_count(app.clone(), "/search?q=rust").await, DEFAULT_TOP_K);
    assert_eq!(hit_count(app.clone(), "/search?q=rust&top_k=").await, DEFAULT_TOP_K);
    assert_eq!(hit_count(app.clone(), "/search?q=rust&top_k=abc").await, DEFAULT_TOP_K);
    assert_eq!(hit_count(app, "/search?q=rust&top_k=-3").await, DEFAULT_TOP_K);
}

#[tokio::test]
async fn doc_lookup_and_not_found() {
    let dir = tempdir().unwrap();
    let docs = tiny_corpus();
    build_tiny_index(dir.path(), &docs);
    let app = build_app(AppOptions::new(dir.path())).unwrap();

    let (status, json) = get(app.clone(), &format!("/doc/{}", docs[2].doc_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["url"], "https://other.test/");

    let (status, _) = get(app, "/doc/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn startup_fails_without_artifacts() {
    let dir = tempdir().unwrap();
    let err = build_app(AppOptions::new(dir.path())).unwrap_err();
    assert!(format!("{err:#}").contains("missing index artifact"));
}

#[tokio::test]
async fn reload_requires_token_and_swaps_artifacts() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &tiny_corpus());
    let mut options = AppOptions::new(dir.path());
    options.admin_token = Some("secret".into());
    let app = build_app(options).unwrap();

    let (status, _) = get(app.clone(), "/search?q=orchids").await;
    assert_eq!(status, StatusCode::OK);

    let denied = Request::post("/admin/reload").header("X-ADMIN-TOKEN", "wrong").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(denied).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let mut docs = tiny_corpus();
    docs.push(Document::new("https://flowers.test/", "Orchids", "Orchids like shade.", vec![]));
    build_tiny_index(dir.path(), &docs);

    let allowed = Request::post("/admin/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, json) = send(app.clone(), allowed).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_docs"], 4);

    let (_, json) = get(app, "/search?q=orchids").await;
    assert_eq!(json["results"][0]["doc_id"], docs[3].doc_id.as_str());
}
