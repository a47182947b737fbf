//! Candidate link extraction from free-form text.
//!
//! Extraction is a pure scan: match URL-shaped substrings restricted to
//! the configured host, trim trailing sentence punctuation, and keep the
//! first occurrence of each distinct link. It never fails; text with no
//! candidates yields an empty result.

use std::collections::HashSet;

use anyhow::Result;
use regex::Regex;

use crate::config::ResolverConfig;
use crate::config::builder::compile_link_pattern;
use crate::resolver::{MARKER_CLOSE, MARKER_OPEN};

/// Punctuation plausibly belonging to the sentence rather than the URL
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '>'];

/// Extracts wiki links matching one configured base URL pattern.
pub struct LinkExtractor {
    link_re: Regex,
}

impl LinkExtractor {
    /// Compile an extractor from the configured base URL pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile (the config
    /// builder already validated it, so this only fails for configs
    /// constructed by hand).
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        Ok(Self {
            link_re: compile_link_pattern(config.base_url_pattern())?,
        })
    }

    /// Scan `text` for candidate links in order of first appearance.
    ///
    /// Duplicates collapse to their first occurrence. Matches inside a
    /// content marker span are skipped so already-inlined content is
    /// never re-extracted.
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let marker_spans = marker_spans(text);

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for m in self.link_re.find_iter(text) {
            if inside_any(&marker_spans, m.start()) {
                continue;
            }
            let trimmed = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            if trimmed.is_empty() {
                continue;
            }
            if seen.insert(trimmed.to_string()) {
                links.push(trimmed.to_string());
            }
        }
        links
    }
}

/// Byte ranges covered by content markers, including the delimiters.
fn marker_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut search_from = 0;
    while let Some(open_rel) = text[search_from..].find(MARKER_OPEN) {
        let open = search_from + open_rel;
        let body_start = open + MARKER_OPEN.len();
        match text[body_start..].find(MARKER_CLOSE) {
            Some(close_rel) => {
                let end = body_start + close_rel + MARKER_CLOSE.len();
                spans.push((open, end));
                search_from = end;
            }
            // Unterminated marker: treat the rest of the text as covered
            None => {
                spans.push((open, text.len()));
                break;
            }
        }
    }
    spans
}

fn inside_any(spans: &[(usize, usize)], pos: usize) -> bool {
    spans.iter().any(|&(start, end)| pos >= start && pos < end)
}
