//! Tiered summarization.
//!
//! Three tiers, each tried only when the previous one fails:
//!
//! 1. Remote inference over an ordered list of candidate models.
//! 2. A coherence gate validating any remote result; a rejected result is
//!    discarded outright (no retry against another model).
//! 3. A deterministic local renderer ([`local`]) that always succeeds.
//!
//! Because tier 3 cannot fail, summarization never surfaces an error:
//! once content extraction has succeeded the job can always complete.

pub mod local;

use regex::Regex;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SummarizerConfig;

/// Ordered locations searched for generated text in an inference reply.
const GENERATED_TEXT_POINTERS: [&str; 4] = [
    "/choices/0/message/content",
    "/generated_text",
    "/0/generated_text",
    "/text",
];

pub struct Summarizer {
    client: reqwest::Client,
    endpoint: String,
    models: Vec<String>,
    api_key: Option<String>,
    prompt_budget_chars: usize,
    min_chars: usize,
    temperature: f64,
    max_tokens: u32,
}

impl Summarizer {
    pub fn new(config: &SummarizerConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            models: config.models.clone(),
            api_key,
            prompt_budget_chars: config.prompt_budget_chars,
            min_chars: config.min_chars,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Produces a Markdown summary of `text`. Infallible by construction:
    /// remote failures and incoherent replies degrade to the local tier.
    pub async fn summarize(&self, text: &str, url: &str) -> String {
        for model in &self.models {
            match self.try_model(model, text, url).await {
                Ok(candidate) => {
                    if is_coherent(&candidate) {
                        info!(model, chars = candidate.len(), "remote summary accepted");
                        return candidate;
                    }
                    // A rejected result drops straight to the local tier;
                    // it is not retried against the remaining models.
                    warn!(model, "remote summary rejected by coherence gate");
                    break;
                }
                Err(e) => {
                    warn!(model, error = %e, "model attempt failed, trying next");
                }
            }
        }

        debug!(url, "falling back to deterministic local summary");
        local::render_summary(text, url)
    }

    async fn try_model(&self, model: &str, text: &str, url: &str) -> anyhow::Result<String> {
        let prompt = build_prompt(text, url, self.prompt_budget_chars);
        let endpoint = self.endpoint.replace("{model}", model);

        let body = json!({
            "model": model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a technical documentation expert specializing in Web3 technologies."
                },
                { "role": "user", "content": prompt }
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let mut request = self.client.post(&endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            anyhow::bail!("inference endpoint returned {}: {}", status, body_text);
        }

        let reply: Value = response.json().await?;
        let generated = generated_text(&reply)
            .ok_or_else(|| anyhow::anyhow!("no generated-text field in inference reply"))?;

        if generated.len() < self.min_chars {
            anyhow::bail!(
                "generated text too short to be useful ({} < {} chars)",
                generated.len(),
                self.min_chars
            );
        }

        Ok(generated)
    }
}

/// Searches the fixed pointer list for the reply's generated text.
fn generated_text(reply: &Value) -> Option<String> {
    for pointer in GENERATED_TEXT_POINTERS {
        if let Some(text) = reply.pointer(pointer).and_then(Value::as_str) {
            let text = text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

fn build_prompt(text: &str, url: &str, budget_chars: usize) -> String {
    let truncated: String = if text.chars().count() > budget_chars {
        let mut t: String = text.chars().take(budget_chars).collect();
        t.push_str("\n\n[Content truncated due to length]");
        t
    } else {
        text.to_string()
    };

    format!(
        "Analyze and summarize the following Web3 documentation from {url}.\n\n\
         Provide a structured summary with:\n\
         1. **Overview** - What is this project/feature?\n\
         2. **Key Features** - Main capabilities and features\n\
         3. **Setup & Integration** - How to get started\n\
         4. **Technical Details** - Important technical information\n\
         5. **API/SDK Information** - Available interfaces\n\
         6. **Best Practices** - Recommendations for developers\n\n\
         Content:\n{truncated}\n\n\
         Provide a comprehensive but concise summary formatted in Markdown."
    )
}

// ---- Coherence gate ----
//
// Heuristic predicates over candidate summaries. Thresholds here are part
// of the contract; keep them in sync with the tests below.

/// Accepts a candidate summary only when no nonsense pattern matches and
/// the text holds at least three sentences longer than ten characters.
pub fn is_coherent(text: &str) -> bool {
    !has_repeated_short_tokens(text)
        && !has_punctuation_runs(text)
        && !has_duplicated_words(text)
        && has_enough_sentences(text)
}

/// Four or more consecutive identical short tokens ("na na na na").
fn has_repeated_short_tokens(text: &str) -> bool {
    let mut run = 1usize;
    let mut previous: Option<String> = None;

    for raw in text.split_whitespace() {
        let word: String = raw
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.is_empty() || word.len() > 3 {
            previous = None;
            run = 1;
            continue;
        }
        if previous.as_deref() == Some(word.as_str()) {
            run += 1;
            if run >= 4 {
                return true;
            }
        } else {
            run = 1;
        }
        previous = Some(word);
    }
    false
}

/// Four or more punctuation characters in a row.
fn has_punctuation_runs(text: &str) -> bool {
    Regex::new(r"[.,!?;:]{4,}").unwrap().is_match(text)
}

/// Two or more adjacent duplicated words anywhere in the text
/// ("the the ... is is"). A single doubled word is tolerated as a typo.
fn has_duplicated_words(text: &str) -> bool {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|raw| {
            raw.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();

    let mut pairs = 0usize;
    for window in words.windows(2) {
        if window[0] == window[1] {
            pairs += 1;
            if pairs >= 2 {
                return true;
            }
        }
    }
    false
}

/// At least three sentences longer than ten characters.
fn has_enough_sentences(text: &str) -> bool {
    text.split(['.', '!', '?'])
        .filter(|s| s.trim().len() > 10)
        .count()
        >= 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_degenerate_repetition_rejected() {
        assert!(!is_coherent("the the the. the the the. the the the."));
    }

    #[test]
    fn test_reasonable_summary_accepted() {
        let summary = "This library provides wallet integration. \
                       It supports several signing schemes out of the box. \
                       Configuration happens through a single builder type. \
                       Errors are reported through a typed result.";
        assert!(is_coherent(summary));
    }

    #[test]
    fn test_punctuation_runs_rejected() {
        assert!(has_punctuation_runs("What is this????"));
        assert!(!has_punctuation_runs("Normal text. With sentences."));
    }

    #[test]
    fn test_duplicated_words() {
        assert!(has_duplicated_words("the the quick brown is is here"));
        // One doubled word alone is tolerated.
        assert!(!has_duplicated_words("the the quick brown fox"));
    }

    #[test]
    fn test_too_few_sentences_rejected() {
        assert!(!is_coherent("Short one. Tiny."));
    }

    #[test]
    fn test_generated_text_field_order() {
        // Chat-completion shape wins over a bare generated_text field.
        let reply = json!({
            "choices": [{"message": {"content": "from chat"}}],
            "generated_text": "from bare field"
        });
        assert_eq!(generated_text(&reply), Some("from chat".to_string()));

        let reply = json!([{"generated_text": "from array"}]);
        assert_eq!(generated_text(&reply), Some("from array".to_string()));

        let reply = json!({"text": "plain"});
        assert_eq!(generated_text(&reply), Some("plain".to_string()));

        assert_eq!(generated_text(&json!({"other": 1})), None);
    }

    #[test]
    fn test_prompt_truncation_marker() {
        let text = "x".repeat(50);
        let prompt = build_prompt(&text, "https://example.org", 10);
        assert!(prompt.contains("[Content truncated due to length]"));

        let prompt = build_prompt("short", "https://example.org", 100);
        assert!(!prompt.contains("truncated"));
    }
}
