// Endpoint eligibility: URL pattern matching for the known API surface.

use std::sync::LazyLock;

use regex::Regex;

/// API host followed by one of the versioned path prefixes. The host is
/// anchored at the authority so lookalikes such as `dropbox.com` never match.
static API_ENDPOINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://([a-z0-9-]+\.)*(twitter|x)\.com/(i/api/)?(2|graphql|1\.1)/")
        .expect("valid regex")
});

/// API host alone. The future-returning idiom only checks the host.
static API_HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://([a-z0-9-]+\.)*(twitter|x)\.com([:/?#]|$)").expect("valid regex")
});

/// Path fragments of endpoints that return an ordered feed of entries.
pub const LISTING_ENDPOINTS: &[&str] = &[
    "/HomeTimeline",
    "/UserTweets",
    "/TweetDetail",
    "/SearchTimeline",
    "/ListLatestTweetsTimeline",
];

/// How an intercepted request is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    /// Not the known API; passed through untouched.
    Foreign,
    /// Known API; responses are read for facts.
    Api,
    /// Known API listing endpoint; responses are read and rewritten.
    Listing,
}

pub fn is_api_endpoint(url: &str) -> bool {
    API_ENDPOINT_RE.is_match(url)
}

pub fn is_api_host(url: &str) -> bool {
    API_HOST_RE.is_match(url)
}

pub fn is_listing_endpoint(url: &str) -> bool {
    LISTING_ENDPOINTS.iter().any(|fragment| url.contains(fragment))
}

pub fn classify_endpoint(url: &str) -> EndpointClass {
    if !is_api_endpoint(url) {
        EndpointClass::Foreign
    } else if is_listing_endpoint(url) {
        EndpointClass::Listing
    } else {
        EndpointClass::Api
    }
}
