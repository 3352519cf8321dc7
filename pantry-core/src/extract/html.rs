//! HTML helpers shared by the structured extractors and the AI page path.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node, Selector};

/// og:image with `property` before `content`.
static OG_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*property\s*=\s*["']og:image["'][^>]*content\s*=\s*["']([^"']+)["'][^>]*>"#)
        .expect("Invalid og:image regex")
});

/// og:image with `content` before `property`.
static OG_IMAGE_REVERSED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*content\s*=\s*["']([^"']+)["'][^>]*property\s*=\s*["']og:image["'][^>]*>"#)
        .expect("Invalid og:image regex")
});

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Invalid HTML tag regex"));

static NUMERIC_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("Invalid numeric entity regex")
});

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("Invalid body selector"));

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];

/// Find the og:image URL without building a DOM.
pub fn og_image(html: &str) -> Option<String> {
    OG_IMAGE
        .captures(html)
        .or_else(|| OG_IMAGE_REVERSED.captures(html))
        .and_then(|cap| cap.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|s| !s.is_empty())
}

/// Friendly publisher name from a URL: "https://www.seriouseats.com/x" -> "Seriouseats.com".
pub fn source_name(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let name = host.strip_prefix("www.").unwrap_or(host);
    let mut chars = name.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
}

/// Visible text of the document body, one block per line, whitespace collapsed.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = match document.select(&BODY).next() {
        Some(body) => *body,
        None => document.tree.root(),
    };

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for node in root.descendants() {
        match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
                });
                if hidden {
                    continue;
                }
                for word in text.split_whitespace() {
                    if !current.is_empty() {
                        current.push(' ');
                    }
                    current.push_str(word);
                }
            }
            Node::Element(el) if is_block(el.name()) => {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
            }
            _ => {}
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.join("\n")
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "li"
            | "br"
            | "tr"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "ul"
            | "ol"
            | "table"
    )
}

/// Strip tags, decode entities and collapse whitespace in a text fragment.
pub fn clean_text(s: &str) -> String {
    let without_tags = if s.contains('<') {
        HTML_TAG.replace_all(s, " ")
    } else {
        s.into()
    };
    decode_entities(&without_tags)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode the handful of named entities that show up in recipe markup, plus numeric ones.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let numeric = NUMERIC_ENTITY.replace_all(s, |caps: &regex::Captures| {
        let code = &caps[1];
        let value = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    numeric
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&frac12;", "½")
        .replace("&frac14;", "¼")
        .replace("&frac34;", "¾")
        .replace("&deg;", "°")
        .replace("&amp;", "&")
}
