use crate::content;
use crate::faq::FaqExtractor;
use crate::fetch::Fetcher;
use html_scraper::{Html, Selector};
use once_cell::sync::Lazy;
use regex::Regex;
use shopsight_core::{BrandInsights, Policy};
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Clone)]
pub struct LinkCandidate {
    pub url: String,
    pub text: String,
}

/// Extract (deduped) absolute links from HTML with their visible text.
///
/// - Resolves relative links against `base_url`.
/// - Drops fragments.
/// - Skips javascript:/mailto: pseudo-links.
/// - Dedupes identical (address, text) pairs only. An icon anchor and
///   a text anchor to the same page both survive, so label resolution
///   still sees the keyword-bearing text.
pub fn link_candidates(html: &str, base_url: &str) -> Vec<LinkCandidate> {
    let base = url::Url::parse(base_url).ok();
    let doc = Html::parse_document(html);
    let sel = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut seen = BTreeSet::<(String, String)>::new();
    let mut out: Vec<LinkCandidate> = Vec::new();
    for el in doc.select(&sel) {
        let href = match el.value().attr("href") {
            Some(h) => h.trim(),
            None => continue,
        };
        if href.is_empty() {
            continue;
        }
        let href_lc = href.to_ascii_lowercase();
        if href_lc.starts_with("javascript:") || href_lc.starts_with("mailto:") {
            continue;
        }

        let abs = if let Ok(u) = url::Url::parse(href) {
            u
        } else if let Some(b) = &base {
            match b.join(href) {
                Ok(u) => u,
                Err(_) => continue,
            }
        } else {
            continue;
        };

        let mut u = abs;
        u.set_fragment(None);
        let url = u.to_string();

        let text = el
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !seen.insert((url.clone(), text.clone())) {
            continue;
        }
        out.push(LinkCandidate { url, text });
    }

    out
}

/// Fixed vocabulary mapping a keyword in visible link text to a page
/// label. The keyword must match word-bounded and case-insensitive;
/// absence of a match skips that label entirely.
static PAGE_LABELS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("privacy", "Privacy Policy"),
        ("refund", "Refund Policy"),
        ("return", "Return Policy"),
        ("terms", "Terms of Service"),
        ("shipping", "Shipping Policy"),
        ("faq", "FAQs"),
        ("contact", "Contact Us"),
        ("about", "About Us"),
        ("track", "Order Tracking"),
        ("blog", "Blogs"),
    ]
    .into_iter()
    .map(|(kw, label)| {
        let re = Regex::new(&format!(r"(?i)\b{kw}\b")).expect("static vocabulary regex");
        (re, label)
    })
    .collect()
});

/// For each label in the vocabulary, pick the first homepage link
/// whose visible text matches the label's keyword.
pub fn resolve_labels(links: &[LinkCandidate]) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();
    for (re, label) in PAGE_LABELS.iter() {
        if let Some(hit) = links.iter().find(|l| re.is_match(&l.text)) {
            out.push((*label, hit.url.clone()));
        }
    }
    out
}

/// Resolve labelled pages from the homepage links and classify each:
/// About Us becomes the brand narrative, Policy/Service labels become
/// policy entries, FAQs dispatches to the FAQ extractor, and the rest
/// are recorded as reference links. Classification happens before FAQ
/// dispatch so no label is double-counted.
pub async fn resolve_links_and_policies(
    fetcher: &Fetcher,
    links: &[LinkCandidate],
    faqs: &FaqExtractor,
    insights: &mut BrandInsights,
) {
    for (label, url) in resolve_labels(links) {
        info!(label, url, "resolved page link");
        match label {
            "About Us" => {
                insights.brand_context = content::extract_body(fetcher, &url).await;
                insights.important_links.insert(label.to_string(), url);
            }
            l if l.contains("Policy") || l.contains("Service") => {
                let body = content::extract_body(fetcher, &url).await;
                insights.policies.insert(
                    label.to_string(),
                    Policy {
                        url: Some(url),
                        content: body,
                    },
                );
            }
            "FAQs" => {
                insights.faqs = faqs.extract(fetcher, &insights.store_url, &url).await;
                insights.important_links.insert(label.to_string(), url);
            }
            _ => {
                insights.important_links.insert(label.to_string(), url);
            }
        }
    }
}
