//! Cache key construction.
//!
//! [`build_key`] turns a request into the [`CacheKey`] it is stored under.
//! Typed keys are made of the result type and resource only. Raw HTTP keys
//! also carry one `name:value` pair for every value of every vary-by header
//! present on the request.
//!
//! Header values are normalized so cosmetic differences never split one
//! entry in two: leading and trailing whitespace is dropped and internal
//! whitespace runs collapse to one space. Case is preserved, but two values
//! equal up to ASCII case count as one pair.
//!
//! Normalization works on the raw bytes. Bytes outside printable ASCII are
//! written as `\xNN` and a backslash as `\\`, so distinct values never
//! normalize to the same text.

use http::HeaderMap;

use cachet_core::{CacheKey, ResourceUri, ResultType, VaryPair};

use crate::vary::VaryByResolver;

/// Everything [`build_key`] reads from a request.
#[derive(Debug, Clone, Copy)]
pub struct KeyContext<'a> {
    /// Type of the value the caller expects.
    pub result_type: ResultType,
    /// Normalized target URI.
    pub uri: &'a ResourceUri,
    /// Outgoing request headers.
    pub headers: &'a HeaderMap,
}

impl<'a> KeyContext<'a> {
    /// Creates a context.
    pub fn new(result_type: ResultType, uri: &'a ResourceUri, headers: &'a HeaderMap) -> Self {
        KeyContext {
            result_type,
            uri,
            headers,
        }
    }
}

/// Builds the cache key of a request.
pub fn build_key(resolver: &VaryByResolver, cx: &KeyContext<'_>) -> CacheKey {
    if !cx.result_type.is_raw() {
        return CacheKey::typed(cx.result_type.name(), cx.uri.clone());
    }

    let vary = resolver.resolve(cx.uri);
    let mut pairs = Vec::new();
    for name in vary.iter() {
        for value in cx.headers.get_all(name) {
            pairs.push(VaryPair::new(
                name.as_str(),
                normalize_header_value(value.as_bytes()),
            ));
        }
    }
    CacheKey::raw(cx.uri.clone(), pairs)
}

/// Normalizes one header value: whitespace is trimmed and collapsed, and
/// bytes outside printable ASCII are escaped.
pub fn normalize_header_value(value: &[u8]) -> String {
    let mut out = String::with_capacity(value.len());
    let words = value
        .split(|b| *b == b' ' || *b == b'\t')
        .filter(|word| !word.is_empty());
    for (i, word) in words.enumerate() {
        if i > 0 {
            out.push(' ');
        }
        for &b in word {
            match b {
                b'\\' => out.push_str("\\\\"),
                0x21..=0x7e => out.push(char::from(b)),
                _ => out.push_str(&format!("\\x{b:02x}")),
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachet_core::{KeyKind, RawResponse};
    use http::HeaderValue;

    fn uri() -> ResourceUri {
        ResourceUri::parse("http://api/books").unwrap()
    }

    fn resolver() -> VaryByResolver {
        VaryByResolver::builder()
            .default_headers(["accept", "accept-language"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_header_value(b"  en-US,\t en  "), "en-US, en");
        assert_eq!(normalize_header_value(b"a\\b"), "a\\\\b");
        assert_eq!(normalize_header_value(b"caf\xe9"), "caf\\xe9");
    }

    #[test]
    fn test_opaque_bytes_keep_keys_distinct() {
        let uri = uri();
        let resolver = VaryByResolver::builder()
            .default_header("x-tenant")
            .build()
            .unwrap();
        let key_for = |bytes: &[u8]| {
            let mut headers = HeaderMap::new();
            headers.insert("x-tenant", HeaderValue::from_bytes(bytes).unwrap());
            build_key(
                &resolver,
                &KeyContext::new(ResultType::of::<RawResponse>(), &uri, &headers),
            )
        };
        assert_ne!(key_for(b"\xe9"), key_for(b"\xe8"));
        assert_ne!(key_for(b"\xe9"), key_for(b"\\xe9"));
        assert_eq!(key_for(b"\xe9"), key_for(b"\xe9"));
    }

    #[test]
    fn test_value_case_is_ignored_across_requests() {
        let uri = uri();
        let key_for = |accept: &'static str| {
            let mut headers = HeaderMap::new();
            headers.insert("accept", HeaderValue::from_static(accept));
            build_key(
                &resolver(),
                &KeyContext::new(ResultType::of::<RawResponse>(), &uri, &headers),
            )
        };
        assert_eq!(key_for("TEXT/HTML"), key_for("text/html"));
        assert_ne!(key_for("text/html"), key_for("text/plain"));
    }

    #[test]
    fn test_raw_key_collects_varied_headers() {
        let uri = uri();
        let mut headers = HeaderMap::new();
        headers.append("accept-language", HeaderValue::from_static("en"));
        headers.append("Accept", HeaderValue::from_static(" text/html "));
        headers.append("accept", HeaderValue::from_static("TEXT/HTML"));
        headers.append("x-trace", HeaderValue::from_static("abc"));

        let key = build_key(
            &resolver(),
            &KeyContext::new(ResultType::of::<RawResponse>(), &uri, &headers),
        );
        assert_eq!(key.kind(), KeyKind::RawHttp);
        let pairs: Vec<_> = key.vary().map(ToString::to_string).collect();
        assert_eq!(pairs, vec!["accept:text/html", "accept-language:en"]);
    }

    #[test]
    fn test_typed_key_ignores_headers() {
        let uri = uri();
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("text/html"));
        let key = build_key(
            &resolver(),
            &KeyContext::new(ResultType::of::<String>(), &uri, &headers),
        );
        assert_eq!(key.kind(), KeyKind::Typed);
        assert_eq!(key.vary().count(), 0);
        assert_eq!(key.result_type(), Some(std::any::type_name::<String>()));
    }

    #[test]
    fn test_empty_vary_set_is_uri_only() {
        let uri = uri();
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("text/html"));
        let key = build_key(
            &VaryByResolver::default(),
            &KeyContext::new(ResultType::of::<RawResponse>(), &uri, &headers),
        );
        assert_eq!(key, CacheKey::raw(uri, Vec::new()));
    }
}
