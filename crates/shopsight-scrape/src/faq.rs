use crate::content;
use crate::fetch::Fetcher;
use html_scraper::{ElementRef, Html, Selector};
use once_cell::sync::Lazy;
use regex::Regex;
use shopsight_core::{FaqModel, FaqPair};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Question used when only the whole-page fallback produced content.
pub const FALLBACK_QUESTION: &str = "General FAQ Page Content";

/// Upper bound on follow-up fetches for the linked-question strategy,
/// so one pathological FAQ index cannot stall a run.
const MAX_QUESTION_LINKS: usize = 20;

const MAX_MODEL_MARKUP_CHARS: usize = 60_000;

pub struct FaqContext<'a> {
    pub fetcher: &'a Fetcher,
    /// Storefront base address, used to resolve relative links.
    pub base: &'a str,
    /// The already-fetched FAQ page markup.
    pub html: &'a str,
}

/// One strategy in the ordered fallback chain. Yielding zero pairs is
/// the exact and only trigger for trying the next strategy.
#[async_trait::async_trait]
pub trait FaqStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn extract(&self, ctx: &FaqContext<'_>) -> Vec<FaqPair>;
}

/// Ordered chain of FAQ strategies. The first strategy to produce at
/// least one pair wins.
pub struct FaqExtractor {
    strategies: Vec<Box<dyn FaqStrategy>>,
}

impl FaqExtractor {
    /// The heuristic chain: accordion parsing, then linked question
    /// pages, then the whole-page fallback.
    pub fn heuristic() -> Self {
        Self {
            strategies: vec![
                Box::new(AccordionStrategy),
                Box::new(LinkedQuestionStrategy),
                Box::new(PageBodyFallbackStrategy),
            ],
        }
    }

    /// The model-assisted pipeline: a drop-in replacement for the
    /// heuristic chain, not a fourth fallback after it.
    pub fn model_assisted(model: Arc<dyn FaqModel>) -> Self {
        Self {
            strategies: vec![Box::new(ModelStrategy { model })],
        }
    }

    pub async fn extract(&self, fetcher: &Fetcher, base: &str, url: &str) -> Vec<FaqPair> {
        let Some(html) = fetcher.page(url).await else {
            return Vec::new();
        };
        self.extract_from_html(fetcher, base, &html).await
    }

    pub async fn extract_from_html(
        &self,
        fetcher: &Fetcher,
        base: &str,
        html: &str,
    ) -> Vec<FaqPair> {
        let ctx = FaqContext { fetcher, base, html };
        for strategy in &self.strategies {
            let pairs = strategy.extract(&ctx).await;
            if !pairs.is_empty() {
                info!(strategy = strategy.name(), pairs = pairs.len(), "faq strategy accepted");
                return pairs;
            }
            debug!(strategy = strategy.name(), "faq strategy yielded nothing");
        }
        Vec::new()
    }
}

fn norm_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn class_lc(el: &ElementRef) -> String {
    el.value().attr("class").unwrap_or("").to_ascii_lowercase()
}

fn has_answer_class(el: &ElementRef) -> bool {
    let class = class_lc(el);
    ["content", "answer", "body", "panel"]
        .iter()
        .any(|k| class.contains(k))
}

// First following sibling that is a div or p element.
fn next_sibling_block<'a>(el: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    let mut node = el.next_sibling();
    while let Some(n) = node {
        if let Some(e) = ElementRef::wrap(n) {
            if matches!(e.value().name(), "div" | "p") {
                return Some(e);
            }
        }
        node = n.next_sibling();
    }
    None
}

/// Accordion parsing: semantic disclosure elements plus containers
/// whose class mentions faq/accordion/item. Within each, the question
/// is the first heading/emphasis/summary element (or anything with an
/// interactive button role) and the answer is an explicitly classed
/// block, falling back to the question's next sibling block.
pub fn accordion_pairs(html: &str) -> Vec<FaqPair> {
    let doc = Html::parse_document(html);
    let containers = match Selector::parse(
        r#"details, div[class*="faq"], div[class*="accordion"], div[class*="item"]"#,
    ) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let questions = match Selector::parse("summary, h2, h3, h4, strong, b") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let buttons = match Selector::parse(r#"[role="button"]"#) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let classed_blocks = match Selector::parse("div[class], p[class]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut out = Vec::new();
    for item in doc.select(&containers) {
        let question_el = item
            .select(&questions)
            .next()
            .or_else(|| item.select(&buttons).next());
        let Some(question_el) = question_el else {
            continue;
        };

        let answer_el = item
            .select(&classed_blocks)
            .find(has_answer_class)
            .or_else(|| next_sibling_block(&question_el));
        let Some(answer_el) = answer_el else {
            continue;
        };

        let question = norm_ws(&question_el.text().collect::<Vec<_>>().join(" "));
        let answer = content::flatten_element(&answer_el);
        if !question.is_empty()
            && !answer.is_empty()
            && !question.to_lowercase().contains("your-question-here")
        {
            out.push(FaqPair { question, answer });
        }
    }
    out
}

static QUESTION_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(faq|question|/a/)").expect("static regex"));

/// Collect candidate question links from the page's main content
/// region: addresses carrying an faq/question/locale-path marker, or,
/// failing that, any link whose visible text asks a question.
pub fn question_links(html: &str, base: &str) -> Vec<(String, String)> {
    let doc = Html::parse_document(html);
    let scope = match (Selector::parse("main"), Selector::parse("body")) {
        (Ok(main), Ok(body)) => doc
            .select(&main)
            .next()
            .or_else(|| doc.select(&body).next()),
        _ => None,
    };
    let Some(scope) = scope else {
        return Vec::new();
    };
    let anchors = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let base = match url::Url::parse(base) {
        Ok(u) => u,
        Err(_) => return Vec::new(),
    };

    let all: Vec<ElementRef> = scope.select(&anchors).collect();
    let mut hits: Vec<&ElementRef> = all
        .iter()
        .filter(|a| QUESTION_HREF.is_match(a.value().attr("href").unwrap_or("")))
        .collect();
    if hits.is_empty() {
        // Broaden: links whose visible text contains a question mark.
        hits = all
            .iter()
            .filter(|a| a.text().collect::<String>().contains('?'))
            .collect();
    }

    let mut out = Vec::new();
    for a in hits {
        if out.len() >= MAX_QUESTION_LINKS {
            break;
        }
        let text = norm_ws(&a.text().collect::<Vec<_>>().join(" "));
        if text.chars().count() <= 5 {
            continue;
        }
        let href = a.value().attr("href").unwrap_or("");
        let Ok(abs) = base.join(href) else {
            continue;
        };
        out.push((text, abs.to_string()));
    }
    out
}

struct AccordionStrategy;

#[async_trait::async_trait]
impl FaqStrategy for AccordionStrategy {
    fn name(&self) -> &'static str {
        "accordion"
    }

    async fn extract(&self, ctx: &FaqContext<'_>) -> Vec<FaqPair> {
        accordion_pairs(ctx.html)
    }
}

struct LinkedQuestionStrategy;

#[async_trait::async_trait]
impl FaqStrategy for LinkedQuestionStrategy {
    fn name(&self) -> &'static str {
        "linked-question"
    }

    async fn extract(&self, ctx: &FaqContext<'_>) -> Vec<FaqPair> {
        let candidates = question_links(ctx.html, ctx.base);
        let mut out = Vec::new();
        for (question, url) in candidates {
            debug!(url, "following linked question");
            if let Some(answer) = content::extract_body(ctx.fetcher, &url).await {
                if !answer.is_empty() {
                    out.push(FaqPair { question, answer });
                }
            }
        }
        out
    }
}

struct PageBodyFallbackStrategy;

#[async_trait::async_trait]
impl FaqStrategy for PageBodyFallbackStrategy {
    fn name(&self) -> &'static str {
        "page-body-fallback"
    }

    async fn extract(&self, ctx: &FaqContext<'_>) -> Vec<FaqPair> {
        match content::main_content_text(ctx.html) {
            Some(body) => vec![FaqPair {
                question: FALLBACK_QUESTION.to_string(),
                answer: body,
            }],
            None => Vec::new(),
        }
    }
}

const EXTRACTION_PROMPT: &str = "You extract FAQ entries from raw storefront HTML. \
Respond with a JSON array of objects, each {\"question\": \"...\", \"answer\": \"...\"}. \
If the page contains no question/answer pairs, respond with exactly []. \
Output JSON only, with no surrounding prose.";

static NOISE_MARKUP: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["script", "style", "nav", "header", "footer"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b.*?</{tag}>")).expect("static noise regex")
        })
        .collect()
});

/// Strip noise subtrees (scripts, styles, navigation chrome) from raw
/// markup and bound its size before handing it to the model.
pub fn sanitize_markup(html: &str) -> String {
    let mut out = html.to_string();
    for re in NOISE_MARKUP.iter() {
        out = re.replace_all(&out, "").into_owned();
    }
    if out.len() > MAX_MODEL_MARKUP_CHARS {
        let mut end = MAX_MODEL_MARKUP_CHARS;
        while !out.is_char_boundary(end) {
            end -= 1;
        }
        out.truncate(end);
    }
    out
}

fn strip_code_fence(s: &str) -> &str {
    let t = s.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parse the model's reply. Anything other than a JSON array of
/// question/answer objects counts as zero pairs for this run.
pub fn parse_model_pairs(raw: &str) -> Vec<FaqPair> {
    let cleaned = strip_code_fence(raw);
    let value: serde_json::Value = match serde_json::from_str(cleaned) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "model reply was not JSON");
            return Vec::new();
        }
    };
    let serde_json::Value::Array(items) = value else {
        warn!("model reply was JSON but not an array");
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| {
            let question = item.get("question")?.as_str()?.trim().to_string();
            let answer = item.get("answer")?.as_str()?.trim().to_string();
            (!question.is_empty() && !answer.is_empty()).then_some(FaqPair { question, answer })
        })
        .collect()
}

struct ModelStrategy {
    model: Arc<dyn FaqModel>,
}

#[async_trait::async_trait]
impl FaqStrategy for ModelStrategy {
    fn name(&self) -> &'static str {
        "model-assisted"
    }

    async fn extract(&self, ctx: &FaqContext<'_>) -> Vec<FaqPair> {
        let markup = sanitize_markup(ctx.html);
        match self.model.complete(EXTRACTION_PROMPT, &markup).await {
            Ok(reply) => parse_model_pairs(&reply),
            Err(e) => {
                warn!(error = %e, "model-assisted faq extraction degraded to empty");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    const DETAILS_PAGE: &str = r#"
    <html><body><main>
      <details><summary>Do you ship abroad?</summary><p>Yes, worldwide.</p></details>
      <details><summary>Can I return items?</summary><p>Within 30 days.</p></details>
      <details><summary>Where is my order?</summary><p>Check the tracking mail.</p></details>
    </main></body></html>
    "#;

    #[test]
    fn details_accordion_yields_one_pair_per_item() {
        let pairs = accordion_pairs(DETAILS_PAGE);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].question, "Do you ship abroad?");
        assert_eq!(pairs[0].answer, "Yes, worldwide.");
    }

    #[test]
    fn classed_accordion_prefers_explicit_answer_blocks() {
        let html = r#"
        <div class="faq-item">
          <h3>What payments do you accept?</h3>
          <div class="mood">ignored</div>
          <div class="answer-content">Cards and PayPal.</div>
        </div>
        "#;
        let pairs = accordion_pairs(html);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].answer, "Cards and PayPal.");
    }

    #[test]
    fn button_role_can_carry_the_question() {
        let html = r#"
        <div class="accordion">
          <span role="button">Is gift wrap available?</span>
          <div>Yes, at checkout.</div>
        </div>
        "#;
        let pairs = accordion_pairs(html);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "Is gift wrap available?");
    }

    #[test]
    fn template_placeholder_questions_are_rejected() {
        let html = r#"
        <div class="faq">
          <h3>your-question-here</h3>
          <p>template answer</p>
        </div>
        "#;
        assert!(accordion_pairs(html).is_empty());
    }

    #[test]
    fn question_links_prefer_marked_hrefs() {
        let html = r#"
        <main>
          <a href="/a/shipping-times">How long does shipping take?</a>
          <a href="/pages/faq-returns">Returns question page</a>
          <a href="/pages/unrelated">Why choose us?</a>
        </main>
        "#;
        let links = question_links(html, "https://example.com");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].1, "https://example.com/a/shipping-times");
    }

    #[test]
    fn question_links_broaden_to_question_marks_when_unmarked() {
        let html = r#"
        <main>
          <a href="/pages/one">Do you price match?</a>
          <a href="/pages/two">Boring link</a>
          <a href="/pages/short">?</a>
        </main>
        "#;
        let links = question_links(html, "https://example.com");
        // The bare "?" is below the length filter.
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].0, "Do you price match?");
    }

    #[tokio::test]
    async fn accordion_wins_over_linked_questions_when_both_exist() {
        let html = r#"
        <html><body><main>
          <details><summary>Accordion question?</summary><p>Accordion answer.</p></details>
          <a href="/a/other">Linked question page?</a>
        </main></body></html>
        "#;
        let fetcher = Fetcher::new().unwrap();
        let pairs = FaqExtractor::heuristic()
            .extract_from_html(&fetcher, "https://example.com", html)
            .await;
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "Accordion question?");
    }

    #[tokio::test]
    async fn linked_question_pages_supply_answers() {
        let app = Router::new().route(
            "/a/shipping",
            get(|| async { "<html><body><main><p>Usually 3 days.</p></main></body></html>" }),
        );
        let addr = serve(app).await;
        let html = r#"
        <main>
          <a href="/a/shipping">How fast is shipping?</a>
        </main>
        "#;
        let fetcher = Fetcher::new().unwrap();
        let pairs = FaqExtractor::heuristic()
            .extract_from_html(&fetcher, &format!("http://{addr}"), html)
            .await;
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "How fast is shipping?");
        assert_eq!(pairs[0].answer, "Usually 3 days.");
    }

    #[tokio::test]
    async fn fallback_produces_exactly_one_synthetic_pair() {
        let html = r#"
        <html><body><main>
          <p>All about our shop, but nothing structured.</p>
        </main></body></html>
        "#;
        let fetcher = Fetcher::new().unwrap();
        let pairs = FaqExtractor::heuristic()
            .extract_from_html(&fetcher, "https://example.com", html)
            .await;
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, FALLBACK_QUESTION);
        assert!(pairs[0].answer.contains("nothing structured"));
    }

    #[test]
    fn model_reply_parsing_accepts_arrays_only() {
        let good = r#"[{"question": "Q1?", "answer": "A1"}, {"question": "", "answer": "dropped"}]"#;
        let pairs = parse_model_pairs(good);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "Q1?");

        assert!(parse_model_pairs("I could not find any FAQs, sorry!").is_empty());
        assert!(parse_model_pairs(r#"{"question": "Q", "answer": "A"}"#).is_empty());
        assert_eq!(parse_model_pairs("[]").len(), 0);
    }

    #[test]
    fn model_reply_parsing_tolerates_code_fences() {
        let fenced = "```json\n[{\"question\": \"Q?\", \"answer\": \"A\"}]\n```";
        assert_eq!(parse_model_pairs(fenced).len(), 1);
    }

    #[test]
    fn sanitize_strips_noise_subtrees() {
        let html = r#"
        <html><head><script>let a = 1;</script><style>p{}</style></head>
        <body><nav><a href="/">Home</a></nav>
        <main><p>Keep this.</p></main>
        <footer>contact stuff</footer></body></html>
        "#;
        let out = sanitize_markup(html);
        assert!(out.contains("Keep this."));
        assert!(!out.contains("let a = 1;"));
        assert!(!out.contains("Home"));
        assert!(!out.contains("contact stuff"));
    }
}
