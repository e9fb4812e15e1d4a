//! Deterministic local summary tier.
//!
//! Derives a structured Markdown document from the text itself: fixed
//! vocabulary membership for technologies, keyword co-occurrence for
//! feature sentences, and a capitalization pattern for protocol-like
//! tokens. Pure and deterministic — identical input yields byte-identical
//! output — and it cannot fail, which is what lets the summarizer promise
//! a result unconditionally.

use regex::Regex;

/// Fixed technology/concept vocabulary checked by substring membership.
const TECH_VOCABULARY: [&str; 36] = [
    "blockchain",
    "ethereum",
    "solana",
    "bitcoin",
    "polygon",
    "smart contract",
    "solidity",
    "rust",
    "javascript",
    "typescript",
    "python",
    "api",
    "sdk",
    "cli",
    "rpc",
    "graphql",
    "rest",
    "websocket",
    "oauth",
    "wallet",
    "token",
    "defi",
    "nft",
    "consensus",
    "validator",
    "node",
    "testnet",
    "mainnet",
    "staking",
    "oracle",
    "bridge",
    "rollup",
    "cryptography",
    "signature",
    "docker",
    "kubernetes",
];

/// Markers whose co-occurrence with a vocabulary hit marks a sentence as
/// describing a feature.
const FEATURE_MARKERS: [&str; 9] = [
    "allows",
    "enables",
    "supports",
    "provides",
    "lets you",
    "can be used",
    "helps",
    "offers",
    "features",
];

const ARCHITECTURE_MARKERS: [&str; 6] = [
    "architecture",
    "component",
    "layer",
    "protocol",
    "network",
    "infrastructure",
];

const SETUP_MARKERS: [&str; 7] = [
    "install",
    "setup",
    "set up",
    "configure",
    "quickstart",
    "getting started",
    "npm",
];

/// Sentences outside this length band are discarded as noise.
const MIN_SENTENCE_LEN: usize = 20;
const MAX_SENTENCE_LEN: usize = 300;

/// Renders the fixed-section Markdown summary.
pub fn render_summary(text: &str, url: &str) -> String {
    let cleaned = clean_text(text);
    let sentences = split_sentences(&cleaned);

    let technologies = find_technologies(&cleaned);
    let features = find_feature_sentences(&sentences);
    let protocols = find_protocol_tokens(&cleaned);
    let architecture = find_marked_sentences(&sentences, &ARCHITECTURE_MARKERS, 3);
    let setup = find_marked_sentences(&sentences, &SETUP_MARKERS, 3);

    let mut doc = String::from("# Documentation Summary\n\n");

    doc.push_str("## Overview\n\n");
    if sentences.is_empty() {
        doc.push_str(&format!(
            "This document summarizes the content published at {}.\n\n",
            url
        ));
    } else {
        for sentence in sentences.iter().take(3) {
            doc.push_str(sentence);
            doc.push(' ');
        }
        doc.push_str("\n\n");
    }

    doc.push_str("## Key Technologies\n\n");
    if technologies.is_empty() {
        doc.push_str("No specific technologies were identified in the source material.\n\n");
    } else {
        for tech in &technologies {
            doc.push_str(&format!("- {}\n", title_case(tech)));
        }
        doc.push('\n');
    }

    doc.push_str("## Main Features\n\n");
    if features.is_empty() {
        doc.push_str("The source material does not call out discrete features.\n\n");
    } else {
        for feature in features.iter().take(5) {
            doc.push_str(&format!("- {}\n", feature));
        }
        doc.push('\n');
    }

    doc.push_str("## Technical Architecture\n\n");
    if architecture.is_empty() && protocols.is_empty() {
        doc.push_str("No architectural details were identified in the source material.\n\n");
    } else {
        for sentence in &architecture {
            doc.push_str(sentence);
            doc.push(' ');
        }
        if !architecture.is_empty() {
            doc.push_str("\n\n");
        }
        if !protocols.is_empty() {
            doc.push_str(&format!("Referenced identifiers: {}.\n\n", protocols.join(", ")));
        }
    }

    doc.push_str("## Getting Started\n\n");
    if setup.is_empty() {
        doc.push_str(&format!(
            "Consult the original documentation at {} for setup instructions.\n\n",
            url
        ));
    } else {
        for sentence in &setup {
            doc.push_str(sentence);
            doc.push(' ');
        }
        doc.push_str("\n\n");
    }

    doc.push_str("## Additional Information\n\n");
    doc.push_str(&format!(
        "Source: {}\n\nThis summary was derived directly from the page text.\n",
        url
    ));

    doc
}

/// Strips comment/entity/template noise and collapses whitespace.
fn clean_text(text: &str) -> String {
    let comments = Regex::new(r"(?s)<!--.*?-->").unwrap();
    let entities = Regex::new(r"&[a-zA-Z#0-9]+;").unwrap();
    let template_vars = Regex::new(r"\{\{[^}]*\}\}").unwrap();

    let text = comments.replace_all(text, " ");
    let text = entities.replace_all(&text, " ");
    let text = template_vars.replace_all(&text, " ");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits on sentence terminators and keeps sentences within the length
/// band, re-appending a period for rendering.
fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.len() >= MIN_SENTENCE_LEN && s.len() <= MAX_SENTENCE_LEN)
        .map(|s| format!("{}.", s))
        .collect()
}

/// Vocabulary membership over the lowercased text, in vocabulary order.
fn find_technologies(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    TECH_VOCABULARY
        .iter()
        .filter(|term| lower.contains(*term))
        .copied()
        .collect()
}

/// Sentences where a vocabulary hit co-occurs with a feature marker.
fn find_feature_sentences(sentences: &[String]) -> Vec<String> {
    sentences
        .iter()
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            let has_tech = TECH_VOCABULARY.iter().any(|term| lower.contains(term));
            let has_marker = FEATURE_MARKERS.iter().any(|marker| lower.contains(marker));
            has_tech && has_marker
        })
        .cloned()
        .collect()
}

fn find_marked_sentences(sentences: &[String], markers: &[&str], limit: usize) -> Vec<String> {
    sentences
        .iter()
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            markers.iter().any(|marker| lower.contains(marker))
        })
        .take(limit)
        .cloned()
        .collect()
}

/// Protocol-like tokens: all-caps runs (HTTP, ERC20) and CamelCase words
/// (MetaMask), deduplicated in first-seen order.
fn find_protocol_tokens(text: &str) -> Vec<String> {
    let all_caps = Regex::new(r"^[A-Z][A-Z0-9]{1,11}$").unwrap();
    let camel_case = Regex::new(r"^[A-Z][a-z]+[A-Z][A-Za-z]*$").unwrap();

    let mut seen = Vec::new();
    for raw in text.split_whitespace() {
        let token = raw.trim_matches(|c: char| !c.is_alphanumeric());
        if token.len() < 2 {
            continue;
        }
        if (all_caps.is_match(token) || camel_case.is_match(token))
            && !seen.iter().any(|s: &String| s == token)
        {
            seen.push(token.to_string());
            if seen.len() >= 12 {
                break;
            }
        }
    }
    seen
}

fn title_case(term: &str) -> String {
    term.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
