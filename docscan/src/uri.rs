//! Connection string helpers.

use once_cell::sync::Lazy;
use regex::Regex;

/// Cluster name reported when none can be derived from the connection string.
pub const UNKNOWN_CLUSTER: &str = "unknown";

static HOST_PART: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"@([^/?@]+)(?:[/?]|$)").expect("Hard-coded regex pattern should be valid")
});

/// Extracts the host part following the credentials of a connection string.
///
/// The host starts after the last `@` before the path, matching
/// [`mask_uri`], so an unescaped `@` in a password never leaks into it.
///
/// ```rust
/// use docscan::uri::extract_cluster_name;
///
/// assert_eq!(
///     extract_cluster_name("mongodb+srv://u:p@cluster0.ab12c.mongodb.net/?retryWrites=true"),
///     Some("cluster0.ab12c.mongodb.net".to_string())
/// );
/// assert_eq!(extract_cluster_name("mongodb://localhost:27017"), None);
/// ```
pub fn extract_cluster_name(uri: &str) -> Option<String> {
    HOST_PART
        .captures(uri)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Replaces the credentials of a connection string with `****:****`.
///
/// Strings without credentials are returned unchanged.
pub fn mask_uri(uri: &str) -> String {
    let (Some(scheme_end), Some(at)) = (uri.find("://"), uri.rfind('@')) else {
        return uri.to_string();
    };

    let prefix_end = scheme_end + 3;
    if at < prefix_end {
        return uri.to_string();
    }

    format!("{}****:****{}", &uri[..prefix_end], &uri[at..])
}
