use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("http status {0}")]
    Status(u16),
    #[error("parse failed: {0}")]
    Parse(String),
    #[error("model failed: {0}")]
    Model(String),
    #[error("store failed: {0}")]
    Store(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Normalize a storefront address: default to https when the scheme is
/// missing, trim any trailing slash.
pub fn normalize_store_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty address".to_string()));
    }
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = url::Url::parse(&with_scheme).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    if parsed.host_str().is_none() {
        return Err(Error::InvalidUrl(format!("no host in {with_scheme}")));
    }
    Ok(with_scheme.trim_end_matches('/').to_string())
}

/// One catalog entry, normalized from the storefront's product feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub vendor: String,
    pub product_type: String,
    /// URL-safe slug for the product page.
    pub handle: String,
    pub created_at: String,
    /// First-variant price; 0.0 when the entry has no variants.
    pub price: f64,
    pub sku: Option<String>,
    pub image_url: Option<String>,
}

/// A policy page. Content requires an address, but an address can
/// resolve while its content fetch fails, so the fields are
/// independently optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Policy {
    pub url: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactDetails {
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaqPair {
    pub question: String,
    pub answer: String,
}

/// Aggregate result of one extraction run. Built incrementally by the
/// scraper, immutable once the run returns. `store_url` is always an
/// absolute address with no trailing slash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrandInsights {
    pub store_url: String,
    pub product_catalog: Vec<Product>,
    pub hero_products: Vec<String>,
    pub policies: BTreeMap<String, Policy>,
    pub faqs: Vec<FaqPair>,
    pub social_handles: BTreeMap<String, String>,
    pub contact_details: ContactDetails,
    pub brand_context: Option<String>,
    pub important_links: BTreeMap<String, String>,
}

impl BrandInsights {
    pub fn new(store_url: String) -> Self {
        Self {
            store_url,
            product_catalog: Vec::new(),
            hero_products: Vec::new(),
            policies: BTreeMap::new(),
            faqs: Vec::new(),
            social_handles: BTreeMap::new(),
            contact_details: ContactDetails::default(),
            brand_context: None,
            important_links: BTreeMap::new(),
        }
    }

    /// Display name for the brand: first product's vendor, if any.
    pub fn brand_name(&self) -> &str {
        self.product_catalog
            .first()
            .map(|p| p.vendor.as_str())
            .unwrap_or("Unknown")
    }
}

/// Text-generation capability backing the model-assisted FAQ strategy.
#[async_trait::async_trait]
pub trait FaqModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Persistence boundary: upsert keyed by storefront address; the
/// brand's product set is replaced wholesale on every re-run.
#[async_trait::async_trait]
pub trait InsightStore: Send + Sync {
    async fn upsert(&self, insights: &BrandInsights) -> Result<()>;
}
