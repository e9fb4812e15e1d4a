//! Last-resort direct retrieval.
//!
//! Fetches the page itself with a browser-like user agent and reduces the
//! HTML to plain text with regex passes. This path absorbs its own
//! failures: when the fetch or reduction fails it returns a synthetic
//! placeholder describing the URL, never an error — it is the path jobs
//! land on when the provider is gone, so it must not fail them further.

use regex::Regex;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;

use crate::config::FallbackConfig;

pub struct FallbackFetcher {
    client: reqwest::Client,
    max_chars: usize,
}

impl FallbackFetcher {
    pub fn new(config: &FallbackConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            max_chars: config.max_chars,
        })
    }

    /// Fetches the URL and returns a provider-shaped payload so the result
    /// flows through content extraction like any other acquisition.
    pub async fn fetch(&self, url: &str) -> Value {
        match self.try_fetch(url).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(url, error = %e, "direct fetch failed, using placeholder");
                json!({ "results": [{ "content": placeholder(url) }] })
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> anyhow::Result<Value> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let html = response.text().await?;

        let title = extract_title(&html);
        let text = html_to_text(&html, self.max_chars);
        if text.is_empty() {
            anyhow::bail!("page yielded no text content");
        }

        let mut item = serde_json::Map::new();
        item.insert("content".to_string(), Value::String(text));
        if let Some(title) = title {
            item.insert("title".to_string(), Value::String(title));
        }
        Ok(json!({ "results": [item] }))
    }
}

fn placeholder(url: &str) -> String {
    format!(
        "Documentation page at {}. The page content could not be retrieved directly; \
         this is a placeholder describing the source location only.",
        url
    )
}

/// Reduces an HTML document to plain text: strips script/style/nav-like
/// blocks, prefers a main-content region when one is identifiable, drops
/// the remaining tags, decodes common entities, collapses whitespace, and
/// truncates to `max_chars`.
pub fn html_to_text(html: &str, max_chars: usize) -> String {
    // The regex crate has no backreferences, so each block tag gets its own
    // open..close pattern.
    let mut stripped = html.to_string();
    for tag in ["script", "style", "nav", "header", "footer", "aside"] {
        let block = Regex::new(&format!(r"(?is)<{tag}[^>]*>.*?</{tag}>")).unwrap();
        stripped = block.replace_all(&stripped, " ").to_string();
    }

    // Prefer a structurally identifiable main-content region.
    let body = ["main", "article"]
        .iter()
        .find_map(|tag| {
            let region = Regex::new(&format!(r"(?is)<{tag}[^>]*>(.*?)</{tag}>")).unwrap();
            region
                .captures(&stripped)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
        .unwrap_or(stripped);

    let tag = Regex::new(r"<[^>]+>").unwrap();
    let text = tag.replace_all(&body, " ");

    let text = decode_entities(&text);

    // Collapse whitespace and drop non-text-bearing characters.
    let cleaned: String = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control())
        .collect();

    truncate_chars(&cleaned, max_chars)
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

pub fn extract_title(html: &str) -> Option<String> {
    let title = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap();
    title
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scripts_styles_and_chrome() {
        let html = r#"<html><head><style>body{color:red}</style></head>
            <body><nav>Home | About</nav>
            <script>alert("hi")</script>
            <p>Actual documentation text.</p>
            <footer>Copyright</footer></body></html>"#;
        let text = html_to_text(html, 8000);
        assert!(text.contains("Actual documentation text."));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color:red"));
        assert!(!text.contains("Home | About"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_prefers_main_region() {
        let html = "<body><div>sidebar junk</div><main><p>The real content.</p></main></body>";
        let text = html_to_text(html, 8000);
        assert_eq!(text, "The real content.");
    }

    #[test]
    fn test_whole_document_when_no_main_region() {
        let html = "<body><p>First.</p><p>Second.</p></body>";
        let text = html_to_text(html, 8000);
        assert_eq!(text, "First. Second.");
    }

    #[test]
    fn test_entity_decoding_and_truncation() {
        let html = "<p>Q&amp;A &lt;guide&gt;</p>";
        assert_eq!(html_to_text(html, 8000), "Q&A <guide>");

        let long = format!("<p>{}</p>", "x".repeat(100));
        assert_eq!(html_to_text(&long, 10).chars().count(), 10);
    }

    #[test]
    fn test_title_extraction() {
        assert_eq!(
            extract_title("<title> SDK Guide </title>"),
            Some("SDK Guide".to_string())
        );
        assert_eq!(extract_title("<title></title>"), None);
        assert_eq!(extract_title("<p>no title</p>"), None);
    }

    #[test]
    fn test_placeholder_mentions_url() {
        let p = placeholder("https://example.org/guide");
        assert!(p.contains("https://example.org/guide"));
    }
}
