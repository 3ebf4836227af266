//! IPFS image-pointer resolution.
//!
//! Upstream producers hand us image references in several shapes: bare CIDs,
//! `ipfs://` URIs, already-resolved HTTP URLs, or pointer objects with the
//! reference tucked under one of several field names. Everything resolves to
//! a public gateway URL or `None`.

use serde_json::Value;

/// Public gateway used to resolve bare CIDs and `ipfs://` URIs.
pub const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Pointer-object fields tried in priority order.
const POINTER_FIELDS: [&str; 7] = ["gatewayUrl", "url", "ipfsUrl", "cid", "hash", "src", "href"];

/// Resolve an image pointer to an absolute URL.
///
/// Total: never panics, any unresolvable input yields `None`. Idempotent on
/// already-resolved HTTP URLs.
pub fn resolve_image_pointer(pointer: &Value) -> Option<String> {
    match pointer {
        Value::String(s) => resolve_image_str(s),
        Value::Object(obj) => POINTER_FIELDS
            .iter()
            .find_map(|field| obj.get(*field).filter(|v| !v.is_null()))
            .and_then(resolve_image_pointer),
        _ => None,
    }
}

/// Resolve a string-form image pointer.
pub fn resolve_image_str(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(cid) = trimmed.strip_prefix("ipfs://") {
        return Some(format!("{IPFS_GATEWAY}{cid}"));
    }
    if trimmed.starts_with("http") {
        return Some(trimmed.to_string());
    }
    // Anything else is treated as a bare CID
    Some(format!("{IPFS_GATEWAY}{trimmed}"))
}
