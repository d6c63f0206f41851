use url::Url;

use crate::error::ErrorKind;

/// Check a submitted URL before any network activity.
///
/// Checks run in a fixed order: URL syntax, emptiness, then registration.
/// A blank input is not subject to the syntax check, so it reports `Empty`.
pub fn validate_url(url: &str, is_registered: impl FnOnce(&str) -> bool) -> Result<(), ErrorKind> {
    let url = url.trim();

    if !url.is_empty() && !is_feed_url(url) {
        return Err(ErrorKind::InvalidUrl);
    }

    if url.is_empty() {
        return Err(ErrorKind::Empty);
    }

    if is_registered(url) {
        return Err(ErrorKind::Duplicate);
    }

    Ok(())
}

/// Absolute http(s) URL with a host
fn is_feed_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}
