use crate::faq::FaqExtractor;
use crate::fetch::Fetcher;
use crate::{catalog, contact, content, hero, links};
use shopsight_core::{normalize_store_url, BrandInsights, FaqModel, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Per-run configuration. The default runs the heuristic FAQ chain;
/// supplying a model switches the whole FAQ pipeline to the
/// model-assisted strategy.
#[derive(Default)]
pub struct ScrapeConfig {
    pub faq_model: Option<Arc<dyn FaqModel>>,
}

/// One extraction run against one storefront. Owns its pooled client
/// exclusively; the client is released when the run returns, on every
/// exit path.
pub struct Scraper {
    base: String,
    fetcher: Fetcher,
    faqs: FaqExtractor,
}

impl Scraper {
    pub fn new(url: &str) -> Result<Self> {
        Self::with_config(url, ScrapeConfig::default())
    }

    pub fn with_config(url: &str, config: ScrapeConfig) -> Result<Self> {
        let base = normalize_store_url(url)?;
        let fetcher = Fetcher::new()?;
        let faqs = match config.faq_model {
            Some(model) => FaqExtractor::model_assisted(model),
            None => FaqExtractor::heuristic(),
        };
        Ok(Self { base, fetcher, faqs })
    }

    /// Run the full extraction: catalog first (the reliable feed),
    /// then homepage heuristics. Any single stage failing degrades
    /// that stage's output and nothing else.
    pub async fn run(self) -> BrandInsights {
        let mut insights = BrandInsights::new(self.base.clone());

        insights.product_catalog = catalog::read_catalog(&self.fetcher, &self.base).await;
        info!(
            store = %self.base,
            products = insights.product_catalog.len(),
            "catalog read complete"
        );

        match self.fetcher.page(&self.base).await {
            Some(html) => {
                let homepage_links = links::link_candidates(&html, &self.base);
                insights.social_handles = contact::extract_social_handles(&homepage_links);

                let text = content::document_text(&html);
                insights.contact_details.emails = contact::extract_emails(&text);
                insights.contact_details.phone_numbers = contact::extract_phones(&text);

                links::resolve_links_and_policies(
                    &self.fetcher,
                    &homepage_links,
                    &self.faqs,
                    &mut insights,
                )
                .await;

                insights.hero_products = hero::hero_product_handles(&html);
            }
            None => warn!(store = %self.base, "homepage unreachable, catalog-only record"),
        }

        insights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, routing::post, Json, Router};
    use shopsight_core::FaqPair;
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn homepage() -> &'static str {
        r#"
        <html><body>
          <header>
            <a href="https://instagram.com/first_handle">Instagram</a>
            <a href="https://instagram.com/second_handle">Instagram backup</a>
            <a href="https://tiktok.com/@brand">TikTok</a>
          </header>
          <main>
            <p>Questions? Email care@example-brand.com or call +1 (555) 010-2030.</p>
            <p>Short code 123456789 is not a phone number.</p>
            <a href="/products/classic-tee">Classic Tee</a>
            <a href="/products/classic-tee?variant=7">Classic Tee variant</a>
            <a href="/products/mug">Mug</a>
          </main>
          <footer>
            <a href="/pages/privacy">Privacy Policy</a>
            <a href="/pages/faq">FAQ</a>
            <a href="/pages/about">About us</a>
            <a href="/pages/contact">Contact</a>
          </footer>
        </body></html>
        "#
    }

    fn storefront_app() -> Router {
        let products = serde_json::json!({
            "products": [
                {
                    "id": 11, "title": "Classic Tee", "vendor": "Example Brand",
                    "product_type": "Apparel", "handle": "classic-tee",
                    "created_at": "2024-02-01T00:00:00Z",
                    "variants": [{"price": "25.00", "sku": "TEE-1"}],
                    "images": [{"src": "https://cdn.example.com/tee.jpg"}]
                },
                {
                    "id": 12, "title": "Mug", "vendor": "Example Brand",
                    "product_type": "Kitchen", "handle": "mug"
                }
            ]
        })
        .to_string();

        Router::new()
            .route("/", get(|| async { axum::response::Html(homepage()) }))
            .route("/products.json", get(move || async move { products }))
            .route(
                "/pages/privacy",
                get(|| async {
                    axum::response::Html(
                        "<html><body><main><p>We respect your privacy.</p></main></body></html>",
                    )
                }),
            )
            .route(
                "/pages/about",
                get(|| async {
                    axum::response::Html(
                        "<html><body><main><p>Founded in a garage.</p></main></body></html>",
                    )
                }),
            )
            .route(
                "/pages/faq",
                get(|| async {
                    axum::response::Html(
                        r#"<html><body><main>
                        <details><summary>Do you ship abroad?</summary><p>Yes.</p></details>
                        <details><summary>Can I return items?</summary><p>Within 30 days.</p></details>
                        <details><summary>Where is my order?</summary><p>See tracking.</p></details>
                        </main></body></html>"#,
                    )
                }),
            )
    }

    #[tokio::test]
    async fn full_run_assembles_the_insight_record() {
        let addr = serve(storefront_app()).await;
        let base = format!("http://{addr}");

        let insights = Scraper::new(&base).unwrap().run().await;

        assert_eq!(insights.store_url, base);
        assert_eq!(insights.product_catalog.len(), 2);
        assert_eq!(insights.product_catalog[0].price, 25.0);
        assert_eq!(insights.product_catalog[1].price, 0.0);

        // Policy classified with both address and content.
        let privacy = &insights.policies["Privacy Policy"];
        assert_eq!(privacy.url.as_deref(), Some(&*format!("{base}/pages/privacy")));
        assert!(privacy.content.as_deref().unwrap().contains("respect your privacy"));

        // FAQ accordion parsed; link recorded regardless of outcome.
        assert_eq!(insights.faqs.len(), 3);
        assert_eq!(insights.important_links["FAQs"], format!("{base}/pages/faq"));

        // About Us became the brand narrative.
        assert!(insights.brand_context.as_deref().unwrap().contains("garage"));
        assert_eq!(insights.important_links["About Us"], format!("{base}/pages/about"));
        assert_eq!(insights.important_links["Contact Us"], format!("{base}/pages/contact"));

        // Second Instagram link wins; one entry per network.
        assert_eq!(
            insights.social_handles["instagram"],
            "https://instagram.com/second_handle"
        );
        assert!(insights.social_handles.contains_key("tiktok"));

        assert_eq!(insights.contact_details.emails, vec!["care@example-brand.com"]);
        assert_eq!(insights.contact_details.phone_numbers, vec!["15550102030"]);

        assert_eq!(insights.hero_products, vec!["classic-tee", "mug"]);
        assert_eq!(insights.brand_name(), "Example Brand");
    }

    #[tokio::test]
    async fn rerunning_an_unchanged_fixture_is_idempotent() {
        let addr = serve(storefront_app()).await;
        let base = format!("http://{addr}");

        let first = Scraper::new(&base).unwrap().run().await;
        let second = Scraper::new(&base).unwrap().run().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_feed_still_yields_homepage_extractions() {
        // No /products.json route: the feed read degrades to empty
        // while hero products and social handles still populate.
        let app = Router::new().route("/", get(|| async { axum::response::Html(homepage()) }));
        let addr = serve(app).await;

        let insights = Scraper::new(&format!("http://{addr}")).unwrap().run().await;
        assert!(insights.product_catalog.is_empty());
        assert_eq!(insights.hero_products, vec!["classic-tee", "mug"]);
        assert!(insights.social_handles.contains_key("instagram"));
    }

    #[tokio::test]
    async fn unreachable_storefront_yields_an_empty_record() {
        let insights = Scraper::new("http://127.0.0.1:1").unwrap().run().await;
        assert!(insights.product_catalog.is_empty());
        assert!(insights.hero_products.is_empty());
        assert!(insights.faqs.is_empty());
        assert!(insights.brand_context.is_none());
    }

    #[tokio::test]
    async fn model_assisted_run_extracts_pairs_from_model_reply() {
        let model_app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                Json(serde_json::json!({
                    "choices": [{"message": {
                        "role": "assistant",
                        "content": "[{\"question\": \"Model Q?\", \"answer\": \"Model A\"}]"
                    }}]
                }))
            }),
        );
        let model_addr = serve(model_app).await;
        let addr = serve(storefront_app()).await;

        let model = crate::model::OpenAiCompatModel::new(
            reqwest::Client::new(),
            format!("http://{model_addr}"),
            None,
            "test-model".to_string(),
        );
        let config = ScrapeConfig {
            faq_model: Some(Arc::new(model)),
        };
        let insights = Scraper::with_config(&format!("http://{addr}"), config)
            .unwrap()
            .run()
            .await;

        // The model pipeline replaces the heuristic chain entirely:
        // the accordion markup on the fixture page is not consulted.
        assert_eq!(
            insights.faqs,
            vec![FaqPair {
                question: "Model Q?".to_string(),
                answer: "Model A".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn malformed_model_reply_degrades_to_no_faqs() {
        let model_app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                Json(serde_json::json!({
                    "choices": [{"message": {
                        "role": "assistant",
                        "content": "Sorry, I could not find anything useful."
                    }}]
                }))
            }),
        );
        let model_addr = serve(model_app).await;
        let addr = serve(storefront_app()).await;

        let model = crate::model::OpenAiCompatModel::new(
            reqwest::Client::new(),
            format!("http://{model_addr}"),
            None,
            "test-model".to_string(),
        );
        let config = ScrapeConfig {
            faq_model: Some(Arc::new(model)),
        };
        let insights = Scraper::with_config(&format!("http://{addr}"), config)
            .unwrap()
            .run()
            .await;

        // The run still completes with every other field intact.
        assert!(insights.faqs.is_empty());
        assert_eq!(insights.product_catalog.len(), 2);
        assert!(insights.policies.contains_key("Privacy Policy"));
    }
}
