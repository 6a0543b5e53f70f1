//! Derived identifiers handed back to clients.

use url::form_urlencoded;

/// Path-and-query under which a hash can be retrieved.
pub fn retrieval_uri(hash: &str) -> String {
    format!("/retrieve?hash={hash}")
}

/// Absolute retrieval URI under `base_url` (no trailing slash).
pub fn share_uri(base_url: &str, hash: &str) -> String {
    format!("{base_url}{}", retrieval_uri(hash))
}

/// `magnet:?xt=urn:sha256:<hash>&dn=<name>[&xl=<size>]`, with the name
/// form-urlencoded (space becomes `+`).
pub fn magnet_uri(hash: &str, name: &str, size: Option<u64>) -> String {
    let dn: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();
    let mut uri = format!("magnet:?xt=urn:sha256:{hash}&dn={dn}");
    if let Some(size) = size {
        uri.push_str(&format!("&xl={size}"));
    }
    uri
}
