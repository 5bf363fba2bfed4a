// Router tests driven through tower's oneshot

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use top250::api::router;
use top250::collector::Collector;
use top250::error::FetchError;
use top250::fetcher::PageFetcher;
use top250::state::AppState;
use top250::store::RecordStore;
use top250::types::Record;
use tower::ServiceExt;

struct CannedFetcher {
    html: Option<String>,
}

#[async_trait]
impl PageFetcher for CannedFetcher {
    async fn fetch_page(&self, _offset: usize) -> Result<String, FetchError> {
        self.html.clone().ok_or(FetchError::Status(reqwest::StatusCode::FORBIDDEN))
    }
}

const PAGE: &str = r#"<ol>
<li><div class="item"><em>1</em><span class="title">肖申克的救赎</span>
<div class="bd"><p>导演: 弗兰克·德拉邦特 Frank Darabont   主演: 蒂姆·罗宾斯 Tim Robbins /...<br>1994 / 美国 / 犯罪 剧情</p>
<div class="star"><span class="rating_num">9.7</span><span>3169343人评价</span></div></div></div></li>
<li><div class="item"><em>2</em><span class="title">霸王别姬</span>
<div class="bd"><p>导演: 陈凯歌 Kaige Chen   主演: 张国荣 Leslie Cheung<br>1993 / 中国大陆 中国香港 / 剧情 爱情 同性</p>
<div class="star"><span class="rating_num">9.6</span><span>2334521人评价</span></div></div></div></li>
</ol>"#;

fn app_state(temp_dir: &TempDir, html: Option<&str>) -> Arc<AppState> {
    let fetcher = Arc::new(CannedFetcher { html: html.map(str::to_string) });
    let collector = Collector::new(fetcher, vec![0]).with_delay(Duration::ZERO, Duration::ZERO);
    Arc::new(AppState::new(collector, RecordStore::new(temp_dir.path().join("douban_top250.csv"))))
}

fn records(n: usize) -> Vec<Record> {
    (1..=n)
        .map(|i| Record { rank: i.to_string(), title: format!("Film {}", i), rating: format!("{:.1}", 9.0 - i as f64 / 10.0), ..Default::default() })
        .collect()
}

async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = router(state).oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let (status, body) = get_json(app_state(&temp_dir, None), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_movies_pagination() {
    let temp_dir = TempDir::new().unwrap();
    let state = app_state(&temp_dir, None);
    state.replace(records(30));

    let (_, body) = get_json(state.clone(), "/api/movies?page=2&per_page=25").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 30);
    assert_eq!(body["page"], 2);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
    assert_eq!(body["data"][0]["rank"], "26");

    let (_, body) = get_json(state, "/api/movies?page=oops").await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 25);
}

#[tokio::test]
async fn test_search_requires_keyword() {
    let temp_dir = TempDir::new().unwrap();
    let (status, body) = get_json(app_state(&temp_dir, None), "/api/search?keyword=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "请输入搜索关键词");
}

#[tokio::test]
async fn test_statistics_on_empty_set() {
    let temp_dir = TempDir::new().unwrap();
    let (_, body) = get_json(app_state(&temp_dir, None), "/api/statistics").await;

    let basic = &body["data"]["basic"];
    assert_eq!(basic["total_movies"], 0);
    assert_eq!(basic["avg_rating"], 0.0);
    assert_eq!(basic["avg_rating_people"], 0);
    assert_eq!(body["data"]["rating_distribution"]["9.0-10.0"], 0);
    assert!(body["data"]["top_genres"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_top_movies_limit() {
    let temp_dir = TempDir::new().unwrap();
    let state = app_state(&temp_dir, None);
    state.replace(records(15));

    let (_, body) = get_json(state, "/api/top-movies?top=3").await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data[0]["title"], "Film 1");
}

#[tokio::test]
async fn test_scrape_then_query() {
    let temp_dir = TempDir::new().unwrap();
    let state = app_state(&temp_dir, Some(PAGE));

    let response = router(state.clone())
        .oneshot(Request::builder().method("POST").uri("/api/scrape").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["message"], "成功爬取 2 部电影数据");

    let (_, body) = get_json(state.clone(), "/api/data-status").await;
    assert_eq!(body["has_data"], true);
    assert_eq!(body["movie_count"], 2);

    let (_, body) = get_json(state.clone(), "/api/search?keyword=leslie").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["title"], "霸王别姬");

    let (_, body) = get_json(state.clone(), "/api/statistics").await;
    let countries = body["data"]["top_countries"].as_object().unwrap();
    let labels: Vec<&str> = countries.keys().map(String::as_str).collect();
    assert_eq!(labels, vec!["美国", "中国大陆", "中国香港"]);
    assert_eq!(body["data"]["top_genres"]["剧情"], 2);

    let (_, body) = get_json(state, "/api/scrape-status").await;
    assert_eq!(body["data"]["running"], false);
    assert_eq!(body["data"]["records_collected"], 2);
}

#[tokio::test]
async fn test_failed_scrape_response() {
    let temp_dir = TempDir::new().unwrap();
    let response = router(app_state(&temp_dir, None))
        .oneshot(Request::builder().method("POST").uri("/api/scrape").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "爬取失败，请稍后重试");
}

#[tokio::test]
async fn test_download_csv() {
    let temp_dir = TempDir::new().unwrap();
    let state = app_state(&temp_dir, None);

    let (status, body) = get_json(state.clone(), "/api/download-csv").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "CSV文件不存在，请先爬取数据");

    state.store().save(&records(2)).await.unwrap();
    let response = router(state).oneshot(Request::builder().uri("/api/download-csv").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().contains("douban_top250_"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBFrank,title,"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let temp_dir = TempDir::new().unwrap();
    let response = router(app_state(&temp_dir, None)).oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
