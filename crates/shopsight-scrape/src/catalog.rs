use crate::fetch::Fetcher;
use serde::Deserialize;
use shopsight_core::Product;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    products: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct FeedProduct {
    id: Option<i64>,
    title: Option<String>,
    #[serde(default)]
    vendor: Option<String>,
    #[serde(default)]
    product_type: Option<String>,
    handle: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    variants: Vec<FeedVariant>,
    #[serde(default)]
    images: Vec<FeedImage>,
}

#[derive(Debug, Default, Deserialize)]
struct FeedVariant {
    #[serde(default)]
    price: Option<PriceField>,
    #[serde(default)]
    sku: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FeedImage {
    #[serde(default)]
    src: Option<String>,
}

// Storefront feeds serialize prices as decimal strings; tolerate bare
// numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceField {
    Text(String),
    Number(f64),
}

impl PriceField {
    fn as_f64(&self) -> Option<f64> {
        match self {
            PriceField::Text(s) => s.trim().parse::<f64>().ok(),
            PriceField::Number(n) => Some(*n),
        }
    }
}

impl FeedProduct {
    fn into_product(self) -> Option<Product> {
        let price = match self.variants.first() {
            None => 0.0,
            Some(v) => match &v.price {
                None => 0.0,
                // A variant price that fails to parse marks the entry
                // malformed; 0.0 is reserved for the variant-less case.
                Some(p) => p.as_f64()?,
            },
        };
        if !price.is_finite() || price < 0.0 {
            return None;
        }
        Some(Product {
            id: self.id?,
            title: self.title?,
            vendor: self.vendor.unwrap_or_default(),
            product_type: self.product_type.unwrap_or_default(),
            handle: self.handle?,
            created_at: self.created_at.unwrap_or_default(),
            price,
            sku: self.variants.into_iter().next().and_then(|v| v.sku),
            image_url: self.images.into_iter().next().and_then(|i| i.src),
        })
    }
}

/// Read the storefront's structured product feed at
/// `{base}/products.json`. A feed-level failure (unreachable,
/// non-JSON) yields an empty catalog, never an error; malformed
/// entries are skipped one by one.
pub async fn read_catalog(fetcher: &Fetcher, base: &str) -> Vec<Product> {
    let url = format!("{base}/products.json");
    let value = match fetcher.get_json(&url).await {
        Ok(v) => v,
        Err(e) => {
            warn!(url, error = %e, "product feed unavailable");
            return Vec::new();
        }
    };
    let feed: Feed = match serde_json::from_value(value) {
        Ok(f) => f,
        Err(e) => {
            warn!(url, error = %e, "product feed has unexpected shape");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for raw in feed.products {
        match serde_json::from_value::<FeedProduct>(raw) {
            Ok(entry) => match entry.into_product() {
                Some(product) => out.push(product),
                None => debug!("skipping catalog entry with missing or malformed fields"),
            },
            Err(e) => debug!(error = %e, "skipping undecodable catalog entry"),
        }
    }
    out
}
