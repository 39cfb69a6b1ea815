//! Request method classification.

use http::Method;

/// Returns `true` for methods whose responses may be read from the cache.
pub fn is_cacheable_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}

/// Returns `true` if a successful request with `method` changes server state.
///
/// `POST`, `PUT`, `PATCH` and `DELETE` mutate, and so does any extension
/// method, since nothing is known about it. `GET`, `HEAD`, `OPTIONS` and
/// `TRACE` are safe.
pub fn is_mutating(method: &Method) -> bool {
    !matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            assert!(is_mutating(&method), "{method}");
            assert!(!is_cacheable_method(&method));
        }
        assert!(!is_mutating(&Method::GET));
        assert!(!is_mutating(&Method::OPTIONS));
        assert!(is_mutating(&Method::from_bytes(b"PURGE").unwrap()));
        assert!(is_cacheable_method(&Method::HEAD));
    }
}
