use crate::fetch::Fetcher;
use html_scraper::{ElementRef, Html, Selector};
use once_cell::sync::Lazy;
use regex::Regex;

static EXCESS_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex"));

fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "section"
            | "article"
            | "main"
            | "header"
            | "footer"
            | "aside"
            | "blockquote"
            | "pre"
            | "ul"
            | "ol"
            | "li"
            | "dl"
            | "dt"
            | "dd"
            | "table"
            | "tr"
            | "figure"
            | "figcaption"
            | "details"
            | "summary"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "br"
            | "hr"
    )
}

fn collect_text(element: &ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            let name = el.value().name();
            if matches!(name, "script" | "style" | "noscript" | "template") {
                continue;
            }
            let block = is_block(name);
            if block && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            collect_text(&el, out);
            if block && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
        } else if let Some(text) = child.value().as_text() {
            let t = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !t.is_empty() {
                if !out.is_empty() && !out.ends_with('\n') && !out.ends_with(' ') {
                    out.push(' ');
                }
                out.push_str(&t);
            }
        }
    }
}

/// Flatten an element subtree to text: one logical break per
/// block-level element, runs of three or more newlines collapsed to a
/// single blank line.
pub fn flatten_element(element: &ElementRef) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    let collapsed = EXCESS_BLANK_LINES.replace_all(&out, "\n\n");
    collapsed.trim().to_string()
}

/// Text of the page's primary content region: the first `<main>`
/// element. `None` when the page has no such region or it is empty.
pub fn main_content_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = match Selector::parse("main") {
        Ok(s) => s,
        Err(_) => return None,
    };
    let main = doc.select(&sel).next()?;
    let text = flatten_element(&main);
    (!text.is_empty()).then_some(text)
}

/// Whole-document text, flattened the same way. Used for contact
/// scanning over the homepage.
pub fn document_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    flatten_element(&doc.root_element())
}

/// Fetch an address and extract its main-content text. Absent when
/// the fetch fails or the page has no recognizable content region.
pub async fn extract_body(fetcher: &Fetcher, url: &str) -> Option<String> {
    let html = fetcher.page(url).await?;
    main_content_text(&html)
}
