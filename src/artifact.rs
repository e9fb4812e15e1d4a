//! Markdown artifact writing.
//!
//! Each successful job produces exactly one artifact file, named from the
//! write timestamp and never updated afterwards. Rendering is split from
//! I/O so the document layout is testable with a fixed timestamp.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

const PREVIEW_CHARS: usize = 500;

pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create artifact directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Writes the artifact and returns its path (relative to the artifact
    /// directory's parent, matching what the store records).
    pub fn write(&self, title: &str, url: &str, summary: &str, content: &str) -> Result<String> {
        let now = Utc::now();
        let filename = format!("summary_{}.md", now.format("%Y%m%d_%H%M%S"));
        let path = self.dir.join(&filename);

        let document = render_document(title, url, summary, content, now);
        std::fs::write(&path, document)
            .with_context(|| format!("failed to write artifact {}", path.display()))?;

        Ok(path.display().to_string())
    }
}

/// Renders the artifact document. Pure — the timestamp is an argument.
pub fn render_document(
    title: &str,
    url: &str,
    summary: &str,
    content: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let preview: String = content.chars().take(PREVIEW_CHARS).collect();
    let ellipsis = if content.chars().count() > PREVIEW_CHARS {
        "..."
    } else {
        ""
    };

    format!(
        "# {title}\n\n\
         **Source:** {url}\n\
         **Generated:** {}\n\n\
         ---\n\n\
         {summary}\n\n\
         ---\n\n\
         ## Original Content Preview\n\
         {preview}{ellipsis}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_document_layout() {
        let doc = render_document(
            "Guide",
            "https://example.org/guide",
            "A summary.",
            "Original text.",
            fixed_time(),
        );
        assert!(doc.starts_with("# Guide\n"));
        assert!(doc.contains("**Source:** https://example.org/guide"));
        assert!(doc.contains("**Generated:** 2024-05-01 12:30:00"));
        assert!(doc.contains("A summary."));
        assert!(doc.contains("## Original Content Preview\nOriginal text.\n"));
        // Short content gets no ellipsis.
        assert!(!doc.contains("..."));
    }

    #[test]
    fn test_long_content_preview_truncated() {
        let content = "y".repeat(1200);
        let doc = render_document("T", "u", "s", &content, fixed_time());
        assert!(doc.contains(&format!("{}...", "y".repeat(500))));
        assert!(!doc.contains(&"y".repeat(501)));
    }

    #[test]
    fn test_writer_creates_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let writer = ArtifactWriter::new(tmp.path()).unwrap();
        let path = writer
            .write("Guide", "https://example.org", "Summary body", "Content")
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Summary body"));
        assert!(path.contains("summary_"));
        assert!(path.ends_with(".md"));
    }
}
