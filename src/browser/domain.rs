use std::sync::Arc;

use url::Url;

/// Extracts the hostname of a tab address. Returns [None] for addresses that can't be parsed or
/// don't carry a host, such as `about:blank` or `data:` urls.
pub fn extract_domain(address: &str) -> Option<Arc<str>> {
    let url = Url::parse(address).ok()?;
    url.host_str().filter(|host| !host.is_empty()).map(Arc::from)
}
