use std::path::PathBuf;
use std::sync::Arc;

use metrics::counter;
use serde::Deserialize;
use serde_json::{json, Value};
use shuttle_axum::axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::config::categories::CONSCIOUSNESS_CATEGORY_ID;
use crate::config::AppConfig;
use crate::digest::{self, CategoryPayload};
use crate::error::PublishError;
use crate::service::DigestService;

pub const SERVICE_NAME: &str = "news-intel-digest";
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DigestService>,
    pub digest_file: Arc<PathBuf>,
    admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(service: Arc<DigestService>, digest_file: PathBuf, admin_token: Option<String>) -> Self {
        Self {
            service,
            digest_file: Arc::new(digest_file),
            admin_token: admin_token.map(Arc::from),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let service = Arc::new(DigestService::from_config(cfg)?);
        Ok(Self::new(service, cfg.digest_file.clone(), cfg.admin_token.clone()))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_page))
        .route("/health", get(health))
        .route("/api/category/{id}", get(category))
        .route("/api/consciousness", get(consciousness))
        .route("/api/admin/publish-home", post(publish_home))
        .fallback_service(ServeDir::new("public"))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct Flags {
    refresh: Option<String>,
    live: Option<String>,
}

impl Flags {
    fn refresh(&self) -> bool {
        self.refresh.as_deref() == Some("1")
    }
    fn live(&self) -> bool {
        self.live.as_deref() == Some("1")
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "category_not_found" })),
    )
        .into_response()
}

async fn category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(flags): Query<Flags>,
) -> Response {
    match state.service.get_category(&id, flags.refresh()).await {
        Some(payload) => Json(payload).into_response(),
        None => not_found(),
    }
}

async fn consciousness(State(state): State<AppState>, Query(flags): Query<Flags>) -> Response {
    match state
        .service
        .get_category(CONSCIOUSNESS_CATEGORY_ID, flags.refresh())
        .await
    {
        Some(payload) => Json(payload).into_response(),
        None => not_found(),
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "ok": true,
        "service": SERVICE_NAME,
        "now": digest::now_rfc3339(),
    }))
}

/// Snapshot when one is published, live categories otherwise. `refresh=1` implies live.
async fn home_page(State(state): State<AppState>, Query(flags): Query<Flags>) -> Html<String> {
    if !flags.live() && !flags.refresh() {
        match digest::load_snapshot((*state.digest_file).clone()).await {
            Ok(Some(d)) => return Html(render_page(&d.categories, &d.generated_at)),
            Ok(None) => {}
            Err(e) => warn!(target: "api", error = %e, "unreadable home snapshot, serving live"),
        }
    }
    let categories = state.service.home_categories(flags.refresh()).await;
    Html(render_page(&categories, &digest::now_rfc3339()))
}

fn authorize(expected: Option<&str>, headers: &HeaderMap) -> Result<(), PublishError> {
    let expected = expected.ok_or(PublishError::TokenNotConfigured)?;
    let given = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();
    if given.is_empty() || given != expected {
        return Err(PublishError::Unauthorized);
    }
    Ok(())
}

async fn publish(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<digest::Digest, PublishError> {
    authorize(state.admin_token.as_deref(), headers)?;
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| PublishError::InvalidPayload(format!("body is not JSON: {e}")))?;
    let d = digest::validate_publish_payload(&value)?;
    digest::store_snapshot((*state.digest_file).clone(), d).await
}

async fn publish_home(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    match publish(&state, &headers, &body).await {
        Ok(d) => {
            counter!("publish_total", "outcome" => "ok").increment(1);
            info!(target: "api", categories = d.categories.len(), generated_at = %d.generated_at, "home digest published");
            Json(json!({
                "ok": true,
                "categories": d.categories.len(),
                "generatedAt": d.generated_at,
            }))
            .into_response()
        }
        Err(e) => {
            let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            counter!("publish_total", "outcome" => "rejected").increment(1);
            warn!(target: "api", status = status.as_u16(), error = %e, "publish rejected");
            (status, Json(json!({ "ok": false, "error": e.to_string() }))).into_response()
        }
    }
}

fn esc(s: &str) -> std::borrow::Cow<'_, str> {
    html_escape::encode_text(s)
}

fn attr(s: &str) -> std::borrow::Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(s)
}

/// Only http(s) links are clickable; anything else (`javascript:`, `data:`) becomes `#`.
fn safe_href(link: &str) -> std::borrow::Cow<'_, str> {
    match url::Url::parse(link.trim()) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => attr(link),
        _ => std::borrow::Cow::Borrowed("#"),
    }
}

/// Server-rendered digest page.
pub fn render_page(categories: &[CategoryPayload], generated_at: &str) -> String {
    let mut out = String::with_capacity(16 * 1024);
    out.push_str(
        "<!doctype html>\n<html lang=\"zh-CN\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<title>AI 与科学资讯速览</title>\n<link rel=\"stylesheet\" href=\"/styles.css\">\n</head>\n<body>\n",
    );
    out.push_str("<header><h1>AI 与科学资讯速览</h1>");
    out.push_str(&format!(
        "<p class=\"generated\">更新时间 <time datetime=\"{0}\">{1}</time></p></header>\n<main>\n",
        attr(generated_at),
        esc(generated_at)
    ));

    for cat in categories {
        out.push_str(&format!(
            "<section class=\"category\" id=\"{}\">\n<h2>{} <small>{}</small></h2>\n",
            attr(&cat.id),
            esc(&cat.zh_name),
            esc(&cat.name)
        ));
        if !cat.zh_description.is_empty() {
            out.push_str(&format!("<p class=\"desc\">{}</p>\n", esc(&cat.zh_description)));
        }
        if cat.items.is_empty() {
            out.push_str("<p class=\"empty\">暂无内容</p>\n</section>\n");
            continue;
        }
        out.push_str("<ol>\n");
        for it in &cat.items {
            let class = if it.error { " class=\"error\"" } else { "" };
            out.push_str(&format!(
                "<li{class}><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a>",
                safe_href(&it.link),
                esc(it.display_title())
            ));
            if !it.title_zh.is_empty() && it.title_zh != it.title {
                out.push_str(&format!("<div class=\"orig\">{}</div>", esc(&it.title)));
            }
            let mut meta = vec![esc(&it.source).into_owned()];
            if !it.published_at.is_empty() {
                meta.push(esc(&it.published_at).into_owned());
            }
            if !it.topic.is_empty() {
                meta.push(esc(&it.topic).into_owned());
            }
            out.push_str(&format!("<div class=\"meta\">{}</div>", meta.join(" · ")));
            if !it.summary.is_empty() {
                out.push_str(&format!("<p class=\"summary\">{}</p>", esc(&it.summary)));
            }
            out.push_str("</li>\n");
        }
        out.push_str("</ol>\n</section>\n");
    }

    out.push_str("</main>\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedItem, RawEntry};

    #[test]
    fn page_escapes_untrusted_text() {
        let mut it = FeedItem::from_entry(
            RawEntry {
                title: "x".into(),
                link: "https://e.example/?a=1&b=\"2\"".into(),
                ..Default::default()
            },
            "S",
            None,
        );
        it.title = "<script>alert(1)</script>".into();
        it.title_zh = "标题 <b>".into();
        it.summary = "摘要 & 更多".into();
        let cat = CategoryPayload {
            id: "media".into(),
            name: "Media".into(),
            zh_name: "媒体".into(),
            description: String::new(),
            zh_description: String::new(),
            updated_at: 0,
            items: vec![it],
        };
        let html = render_page(&[cat], "2025-06-10T00:00:00Z");
        assert!(!html.contains("<script>"));
        assert!(html.contains("标题 &lt;b&gt;"));
        assert!(html.contains("摘要 &amp; 更多"));
        assert!(html.contains("&quot;2&quot;"));
    }

    #[test]
    fn page_links_only_http_schemes() {
        let links = [
            "javascript:alert(1)",
            " JavaScript:alert(2)",
            "data:text/html;base64,PHNjcmlwdD4=",
            "https://ok.example/a",
        ];
        let items = links
            .iter()
            .map(|l| {
                FeedItem::from_entry(
                    RawEntry {
                        title: "t".into(),
                        link: (*l).into(),
                        ..Default::default()
                    },
                    "S",
                    None,
                )
            })
            .collect();
        let cat = CategoryPayload {
            id: "media".into(),
            name: "Media".into(),
            zh_name: "媒体".into(),
            description: String::new(),
            zh_description: String::new(),
            updated_at: 0,
            items,
        };
        let html = render_page(&[cat], "2025-06-10T00:00:00Z");
        assert!(!html.to_lowercase().contains("javascript:"));
        assert!(!html.contains("data:text"));
        assert_eq!(html.matches("<a href=\"#\"").count(), 3);
        assert!(html.contains("<a href=\"https://ok.example/a\""));
    }

    #[test]
    fn authorize_rules() {
        let mut h = HeaderMap::new();
        assert!(matches!(authorize(None, &h), Err(PublishError::TokenNotConfigured)));
        assert!(matches!(authorize(Some("s3cret"), &h), Err(PublishError::Unauthorized)));
        h.insert(ADMIN_TOKEN_HEADER, "wrong".parse().unwrap());
        assert!(matches!(authorize(Some("s3cret"), &h), Err(PublishError::Unauthorized)));
        h.insert(ADMIN_TOKEN_HEADER, "s3cret".parse().unwrap());
        assert!(authorize(Some("s3cret"), &h).is_ok());
    }
}
