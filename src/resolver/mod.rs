//! Reference resolution: orchestrates cache, dedup registry, gate, and
//! the remote content source, and rewrites text by substituting links
//! with their resolved content.
//!
//! Per-link failures never escape: they are logged with the link and
//! classified kind, negative-cached, and degraded to "leave the
//! original link in place". Only structurally invalid configuration can
//! surface an error to callers.

pub mod pipeline;

pub use pipeline::ReferencePipeline;

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use url::Url;

use crate::cache::{CacheLimits, ContentCache};
use crate::config::ResolverConfig;
use crate::gate::FetchGate;
use crate::inflight::InflightRegistry;
use crate::source::{Clock, FetchError, PageSource, Sanitizer};

/// Opening delimiter of inlined page content.
pub const MARKER_OPEN: &str = "[wiki-content]";

/// Closing delimiter of inlined page content.
pub const MARKER_CLOSE: &str = "[/wiki-content]";

/// Wrap sanitized content so later processing can tell it apart from
/// ordinary document text.
#[must_use]
pub fn wrap_content(content: &str) -> String {
    format!("{MARKER_OPEN}\n{content}\n{MARKER_CLOSE}")
}

/// Outcome of resolving one link.
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    pub link: String,
    /// Marker-wrapped content on success; the original link on failure
    pub replacement: String,
    pub succeeded: bool,
}

impl ResolutionResult {
    fn unresolved(link: String) -> Self {
        Self {
            replacement: link.clone(),
            link,
            succeeded: false,
        }
    }
}

/// Derive the numeric page id from a wiki link.
///
/// Expects a `/pages/{id}/...` path segment, the layout Confluence
/// uses for page URLs.
pub(crate) fn page_id_from_link(link: &str) -> Result<String, FetchError> {
    let url =
        Url::parse(link).map_err(|e| FetchError::MalformedLink(format!("{link}: {e}")))?;

    let mut segments = url
        .path_segments()
        .ok_or_else(|| FetchError::MalformedLink(format!("{link}: no path")))?;

    while let Some(segment) = segments.next() {
        if segment == "pages" {
            return match segments.next() {
                Some(id) if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) => {
                    Ok(id.to_string())
                }
                _ => Err(FetchError::MalformedLink(format!(
                    "{link}: no numeric id after /pages/"
                ))),
            };
        }
    }
    Err(FetchError::MalformedLink(format!(
        "{link}: no /pages/ segment"
    )))
}

/// Orchestrates resolution of a batch of links.
///
/// Owns the cache, the in-flight registry, and the gate; one instance
/// serves one application session and is never shared across sessions.
pub struct ReferenceResolver {
    cache: Arc<ContentCache>,
    registry: Arc<InflightRegistry<ResolutionResult>>,
    gate: Arc<FetchGate>,
    source: Arc<dyn PageSource>,
    sanitizer: Arc<dyn Sanitizer>,
    caching: bool,
    batching: bool,
}

impl ReferenceResolver {
    #[must_use]
    pub fn new(
        config: &ResolverConfig,
        source: Arc<dyn PageSource>,
        sanitizer: Arc<dyn Sanitizer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache: Arc::new(ContentCache::new(CacheLimits::from_config(config), clock)),
            registry: InflightRegistry::new(),
            gate: Arc::new(FetchGate::new(config.max_concurrent_fetches())),
            source,
            sanitizer,
            caching: config.caching_enabled(),
            batching: config.batching_enabled(),
        }
    }

    /// Resolve a batch of links into replacement text.
    ///
    /// The output mapping is total: every input link has an entry,
    /// resolved or not. Failures are isolated per link.
    pub async fn resolve(&self, links: &[String]) -> HashMap<String, String> {
        let mut resolved = HashMap::with_capacity(links.len());
        if self.batching {
            let results = join_all(links.iter().map(|link| self.resolve_one(link))).await;
            for result in results {
                resolved.insert(result.link, result.replacement);
            }
        } else {
            for link in links {
                let result = self.resolve_one(link).await;
                resolved.insert(result.link, result.replacement);
            }
        }
        resolved
    }

    async fn resolve_one(&self, link: &str) -> ResolutionResult {
        if self.caching {
            if let Some(entry) = self.cache.get(link).await {
                return ResolutionResult {
                    link: link.to_string(),
                    replacement: entry.content,
                    succeeded: entry.valid,
                };
            }
        }

        let fetch = Self::fetch_uncached(
            Arc::clone(&self.gate),
            Arc::clone(&self.source),
            Arc::clone(&self.sanitizer),
            if self.caching {
                Some(Arc::clone(&self.cache))
            } else {
                None
            },
            link.to_string(),
        );

        let cache = Arc::clone(&self.cache);
        let caching = self.caching;
        let commit = move |result: ResolutionResult| {
            async move {
                if caching {
                    cache
                        .put(&result.link, result.replacement.clone(), result.succeeded)
                        .await;
                }
                result
            }
            .boxed()
        };

        let fallback_link = link.to_string();
        self.registry
            .get_or_create(link, fetch, commit, move || {
                ResolutionResult::unresolved(fallback_link)
            })
            .await
    }

    /// The remote leg: page-id parse, gated fetch, sanitize, wrap.
    ///
    /// The gate slot is held for the remote call only; sanitizing and
    /// wrapping happen after release.
    async fn fetch_uncached(
        gate: Arc<FetchGate>,
        source: Arc<dyn PageSource>,
        sanitizer: Arc<dyn Sanitizer>,
        cache: Option<Arc<ContentCache>>,
        link: String,
    ) -> ResolutionResult {
        // Re-check the cache now that we hold the registry slot: a
        // fetch that settled between the caller's lookup and its
        // registration would otherwise run again
        if let Some(cache) = &cache {
            if let Some(entry) = cache.get(&link).await {
                return ResolutionResult {
                    link,
                    replacement: entry.content,
                    succeeded: entry.valid,
                };
            }
        }

        let fetched = async {
            let page_id = page_id_from_link(&link)?;
            let permit = gate.acquire().await;
            let raw = source.fetch_page(&page_id).await;
            drop(permit);
            raw
        }
        .await;

        match fetched {
            Ok(raw) => {
                let clean = sanitizer.sanitize(&raw);
                ResolutionResult {
                    replacement: wrap_content(&clean),
                    link,
                    succeeded: true,
                }
            }
            Err(err) => {
                log::warn!("failed to resolve {link} ({}): {err}", err.kind());
                ResolutionResult::unresolved(link)
            }
        }
    }

    pub(crate) fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    pub(crate) fn registry(&self) -> &Arc<InflightRegistry<ResolutionResult>> {
        &self.registry
    }

    pub(crate) fn gate(&self) -> &Arc<FetchGate> {
        &self.gate
    }
}

/// Substitute each link's replacement into `text`.
///
/// Applied from the completed map in a single pass over the source
/// text: every occurrence of a link in `text` is replaced, and the
/// replacement content itself is never rescanned, so a page body that
/// happens to mention another input link keeps it verbatim. Spans are
/// claimed longest link first so no link that is a prefix of another
/// clobbers it.
#[must_use]
pub fn substitute(text: &str, replacements: &HashMap<String, String>) -> String {
    let mut links: Vec<&String> = replacements.keys().collect();
    links.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut spans: Vec<(usize, usize, &str)> = Vec::new();
    for link in links {
        let Some(replacement) = replacements.get(link.as_str()) else {
            continue;
        };
        if replacement.as_str() == link.as_str() {
            continue;
        }
        for (start, matched) in text.match_indices(link.as_str()) {
            let end = start + matched.len();
            if spans.iter().all(|&(s, e, _)| end <= s || e <= start) {
                spans.push((start, end, replacement.as_str()));
            }
        }
    }
    spans.sort_unstable_by_key(|&(start, _, _)| start);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end, replacement) in spans {
        out.push_str(&text[cursor..start]);
        out.push_str(replacement);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_id_parses_canonical_links() {
        let id = page_id_from_link("https://co.atlassian.net/wiki/spaces/X/pages/123/Title")
            .expect("id should parse");
        assert_eq!(id, "123");
    }

    #[test]
    fn page_id_rejects_missing_or_non_numeric_ids() {
        assert!(page_id_from_link("https://co.atlassian.net/wiki/spaces/X").is_err());
        assert!(page_id_from_link("https://co.atlassian.net/wiki/pages/abc/Title").is_err());
        assert!(page_id_from_link("not a url").is_err());
    }

    #[test]
    fn substitution_replaces_all_occurrences() {
        let mut map = HashMap::new();
        map.insert("https://w/pages/1/A".to_string(), "CONTENT".to_string());
        let out = substitute(
            "x https://w/pages/1/A y https://w/pages/1/A z",
            &map,
        );
        assert_eq!(out, "x CONTENT y CONTENT z");
    }

    #[test]
    fn substitution_prefers_longer_links() {
        let mut map = HashMap::new();
        map.insert("https://w/pages/1/A".to_string(), "SHORT".to_string());
        map.insert("https://w/pages/1/AB".to_string(), "LONG".to_string());
        let out = substitute("see https://w/pages/1/AB here", &map);
        assert_eq!(out, "see LONG here");
    }

    #[test]
    fn replacement_content_is_never_rescanned() {
        let mut map = HashMap::new();
        map.insert(
            "https://w/pages/1/A".to_string(),
            "body mentioning https://w/pages/2/B".to_string(),
        );
        map.insert("https://w/pages/2/B".to_string(), "B-CONTENT".to_string());

        let out = substitute("x https://w/pages/1/A y https://w/pages/2/B", &map);
        assert_eq!(
            out,
            "x body mentioning https://w/pages/2/B y B-CONTENT",
            "a link inside inlined content must stay verbatim"
        );
    }

    #[test]
    fn failed_links_pass_through_unchanged() {
        let mut map = HashMap::new();
        map.insert(
            "https://w/pages/1/A".to_string(),
            "https://w/pages/1/A".to_string(),
        );
        let text = "keep https://w/pages/1/A as-is";
        assert_eq!(substitute(text, &map), text);
    }

    #[test]
    fn marker_wrapping_round_trips() {
        let wrapped = wrap_content("body text");
        assert!(wrapped.starts_with(MARKER_OPEN));
        assert!(wrapped.ends_with(MARKER_CLOSE));
        assert!(wrapped.contains("body text"));
    }
}
