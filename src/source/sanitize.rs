//! Markup sanitizer producing plain text from wiki storage-format HTML.
//!
//! This is deliberately conservative: strip anything that executes or
//! styles, drop the remaining tags, decode entities, and normalize
//! whitespace. It never fails; in the worst case the input comes back
//! unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

use super::Sanitizer;

/// `<script>`/`<style>` blocks including their content
static BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>")
        .expect("Invalid block pattern regex")
});

/// Any remaining tag, opening or closing
static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)</?[a-zA-Z][^>]*>")
        .expect("Invalid tag pattern regex")
});

/// Runs of blank lines and trailing spaces
static BLANK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n{3,}").expect("Invalid blank-line regex")
});

/// Tags that imply a line break when dropped
static BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<(br|/p|/div|/li|/tr|/h[1-6])\s*/?>")
        .expect("Invalid break pattern regex")
});

/// Default sanitizer for Confluence-style storage format markup.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkupSanitizer;

impl Sanitizer for MarkupSanitizer {
    fn sanitize(&self, raw_markup: &str) -> String {
        if raw_markup.is_empty() {
            return String::new();
        }

        let without_blocks = BLOCK_RE.replace_all(raw_markup, "");
        let with_breaks = BREAK_RE.replace_all(&without_blocks, "\n");
        let without_tags = TAG_RE.replace_all(&with_breaks, " ");
        let decoded = html_escape::decode_html_entities(without_tags.as_ref());

        // Collapse horizontal whitespace per line, then squeeze blank runs
        let mut out = String::with_capacity(decoded.len());
        for (i, line) in decoded.lines().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let mut last_was_space = false;
            for ch in line.trim().chars() {
                if ch == ' ' || ch == '\t' {
                    if !last_was_space {
                        out.push(' ');
                    }
                    last_was_space = true;
                } else {
                    out.push(ch);
                    last_was_space = false;
                }
            }
        }
        BLANK_RE.replace_all(&out, "\n\n").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(raw: &str) -> String {
        MarkupSanitizer.sanitize(raw)
    }

    #[test]
    fn strips_tags_and_decodes_entities() {
        let out = sanitize("<p>Hello &amp; <b>world</b></p>");
        assert_eq!(out, "Hello & world");
    }

    #[test]
    fn drops_script_and_style_bodies() {
        let out = sanitize("<script>alert('x')</script>safe<style>p{}</style>");
        assert_eq!(out, "safe");
        assert!(!out.contains("alert"));
    }

    #[test]
    fn block_close_tags_become_line_breaks() {
        let out = sanitize("<p>first</p><p>second</p>");
        assert_eq!(out, "first\nsecond");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(sanitize("already plain"), "already plain");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn collapses_whitespace_runs() {
        let out = sanitize("a    b\n\n\n\n\nc");
        assert_eq!(out, "a b\n\nc");
    }
}
