use chrono::{DateTime, Utc};
use reqwest::header::{ETAG, HeaderMap, LAST_MODIFIED};
use sha2::{Digest, Sha256};

/// SHA-256 digest of a raw feed body.
pub type ContentHash = [u8; 32];

/// Hash a raw response body.
pub fn content_hash(body: &[u8]) -> ContentHash {
    Sha256::digest(body).into()
}

/// Cache validators returned with a feed body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    /// `ETag` response header
    pub etag: Option<String>,
    /// `Last-Modified` response header
    pub last_modified: Option<DateTime<Utc>>,
}

impl Validators {
    /// Read `ETag` and `Last-Modified` from response headers, skipping unusable values.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let etag = headers.get(ETAG).and_then(|v| v.to_str().ok()).map(str::to_owned);
        let last_modified = headers
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Self { etag, last_modified }
    }
}

/// Conditional-request and change-detection state of one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchState {
    /// Sent back as `If-None-Match`
    pub etag: Option<String>,
    /// Sent back as `If-Modified-Since`
    pub last_modified: Option<DateTime<Utc>>,
    /// Digest of the last body that was parsed
    pub content_hash: Option<ContentHash>,
    /// Failed cycles since the last success
    pub consecutive_failures: u32,
}

impl FetchState {
    /// Whether `hash` matches the last processed body.
    pub fn is_unchanged(&self, hash: &ContentHash) -> bool {
        self.content_hash.as_ref() == Some(hash)
    }

    /// Record a processed body and the validators that came with it.
    pub fn commit(&mut self, hash: ContentHash, validators: Validators) {
        self.content_hash = Some(hash);
        self.etag = validators.etag;
        self.last_modified = validators.last_modified;
    }

    /// Short hex prefix of the current content hash, for logs.
    pub fn hash_prefix(&self) -> Option<String> {
        self.content_hash.map(|h| hex::encode(&h[..8]))
    }
}

/// Format a timestamp as an HTTP date (IMF-fixdate).
pub fn http_date(ts: DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
