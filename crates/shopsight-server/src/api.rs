//! HTTP surface: one health probe and one extraction endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use shopsight_core::{normalize_store_url, FaqModel, InsightStore};
use shopsight_scrape::{ScrapeConfig, Scraper};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InsightStore>,
    pub faq_model: Option<Arc<dyn FaqModel>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/v1/insights", post(extract_insights))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct InsightRequest {
    website_url: String,
}

fn error_body(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Run a full extraction for the submitted storefront and persist the
/// result. An address that does not parse is a 400; a site with no
/// readable catalog, whether unreachable or simply not a storefront,
/// is reported 404.
async fn extract_insights(
    State(state): State<AppState>,
    Json(request): Json<InsightRequest>,
) -> Response {
    let base = match normalize_store_url(&request.website_url) {
        Ok(base) => base,
        Err(err) => return error_body(StatusCode::BAD_REQUEST, err.to_string()),
    };

    let config = ScrapeConfig {
        faq_model: state.faq_model.clone(),
    };
    let scraper = match Scraper::with_config(&base, config) {
        Ok(scraper) => scraper,
        Err(err) => {
            error!(%base, %err, "failed to build scraper");
            return error_body(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
        }
    };

    info!(store = %base, "extraction requested");
    let insights = scraper.run().await;

    if insights.product_catalog.is_empty() {
        return error_body(
            StatusCode::NOT_FOUND,
            format!("no product catalog readable at {base}: the site is unreachable or not a storefront"),
        );
    }

    if let Err(err) = state.store.upsert(&insights).await {
        error!(store = %base, %err, "failed to persist insights");
        return error_body(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
    }

    info!(
        store = %base,
        products = insights.product_catalog.len(),
        faqs = insights.faqs.len(),
        "extraction complete"
    );
    (StatusCode::OK, Json(insights)).into_response()
}
