//! Collaborator interfaces consumed by the resolution pipeline.
//!
//! The pipeline itself never talks to the network or parses markup
//! directly; it goes through the traits defined here. Production code
//! uses [`HttpPageSource`] and [`MarkupSanitizer`]; tests substitute
//! in-memory implementations.

pub mod clock;
pub mod http;
pub mod sanitize;

pub use clock::{Clock, SystemClock};
pub use http::HttpPageSource;
pub use sanitize::MarkupSanitizer;

use async_trait::async_trait;

/// Classified failure from a remote page fetch.
///
/// Retry and backoff are internal to the [`PageSource`] implementation;
/// by the time one of these surfaces, the source has given up.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Credentials rejected by the remote wiki
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Remote wiki is rate limiting us
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// Page does not exist (or is not visible to us)
    #[error("page not found: {0}")]
    NotFound(String),

    /// Connection-level failure (DNS, timeout, reset)
    #[error("network failure: {0}")]
    Network(String),

    /// Remote wiki returned a server error
    #[error("server error: {0}")]
    Server(String),

    /// A page id could not be derived from the link
    #[error("malformed page link: {0}")]
    MalformedLink(String),
}

impl FetchError {
    /// Short stable label for log lines and statistics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::RateLimit(_) => "rate-limit",
            Self::NotFound(_) => "not-found",
            Self::Network(_) => "network",
            Self::Server(_) => "server",
            Self::MalformedLink(_) => "malformed-link",
        }
    }

    /// Whether the source considers this kind transient enough to retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Server(_) | Self::RateLimit(_) => true,
            Self::Auth(_) | Self::NotFound(_) | Self::MalformedLink(_) => false,
        }
    }
}

/// Remote source of raw page content, keyed by page id.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the raw markup for one page.
    async fn fetch_page(&self, page_id: &str) -> Result<String, FetchError>;
}

/// Converts raw page markup into safe plain text.
///
/// Implementations must be total: when the input cannot be improved,
/// return it unchanged rather than failing.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, raw_markup: &str) -> String;
}
