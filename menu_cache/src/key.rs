//! Cache key derivation
//!
//! A cache key is a pure, order-independent encoding of a resource path
//! and its query parameters, so that two logically identical requests
//! always hit the same entry regardless of parameter ordering.

/// Derive the cache key for a resource path and its query parameters.
///
/// Parameters are sorted by name (then value) before encoding. Reserved
/// characters in names and values are percent-encoded so the key stays
/// unambiguous for any input.
pub fn cache_key(path: &str, params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<(&str, &str)> = params.to_vec();
    sorted.sort_unstable();

    let query = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", path, query)
}

fn encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
