use html_scraper::{Html, Selector};
use std::collections::BTreeSet;

/// Approximate the storefront's featured products: links under main
/// or section elements whose path contains `/products/`. The handle
/// is the path segment after `/products/`, query string stripped.
/// Returns a deduplicated, sorted set of handles.
pub fn hero_product_handles(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let sel = match Selector::parse("main a, section a") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut handles = BTreeSet::new();
    for a in doc.select(&sel) {
        let href = a.value().attr("href").unwrap_or("");
        let Some((_, tail)) = href.split_once("/products/") else {
            continue;
        };
        let handle = tail.split('?').next().unwrap_or("").trim_end_matches('/');
        if !handle.is_empty() {
            handles.insert(handle.to_string());
        }
    }
    handles.into_iter().collect()
}
