mod common;

use cachet::{
    CacheConfig, CacheEngine, CacheError, CacheStatus, DeclaresCaching, Fetched, Items, Lookup,
    RawResponse, RequestOptions, RequestSnapshot, ResponseSnapshot, ResultType, SkipReason,
    StoreOutcome,
};
use chrono::TimeDelta;
use http::StatusCode;
use pretty_assertions::assert_eq;

use common::{Author, Book, Origin, headers, ok_response, raw, uri};

fn engine() -> CacheEngine {
    CacheEngine::new(CacheConfig::default()).unwrap()
}

fn book_origin(cache_control: &'static str) -> Origin<Book> {
    Origin::new(move |_, n| {
        Fetched::new(
            ok_response(&[("cache-control", cache_control)]),
            Book::new(&format!("edition {n}")),
        )
    })
}

#[tokio::test]
async fn test_round_trip_serves_second_request_from_cache() {
    let engine = engine();
    let mut origin = book_origin("max-age=60");
    let request = RequestSnapshot::get(uri("http://api/books/1"));
    let options = RequestOptions::default();

    let first = engine
        .execute::<Book, _>(request.clone(), &options, &mut origin)
        .await
        .unwrap();
    let second = engine
        .execute::<Book, _>(request, &options, &mut origin)
        .await
        .unwrap();

    assert_eq!(first.status, CacheStatus::Miss);
    assert_eq!(second.status, CacheStatus::Hit);
    assert_eq!(second.value.unwrap().title, "edition 0");
    assert_eq!(origin.calls(), 1);
    assert_eq!(engine.len(), 1);
}

#[tokio::test]
async fn test_raw_entries_vary_by_configured_header() {
    let engine =
        CacheEngine::new(CacheConfig::builder().vary_by("accept").build().unwrap()).unwrap();
    let mut origin = Origin::new(|request, _| {
        let accept = request
            .request
            .headers
            .get("accept")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_owned();
        let body = if accept.contains("json") { "{}" } else { "<p/>" };
        Fetched::raw(raw(&[("cache-control", "max-age=60")], body))
    });
    let options = RequestOptions::default();
    let json = RequestSnapshot::get(uri("http://api/books"))
        .with_headers(headers(&[("accept", "application/json")]));
    let html = RequestSnapshot::get(uri("http://api/books"))
        .with_headers(headers(&[("accept", "text/html")]));

    for request in [&json, &html, &json, &html] {
        engine
            .execute::<RawResponse, _>(request.clone(), &options, &mut origin)
            .await
            .unwrap();
    }
    assert_eq!(origin.calls(), 2);
    assert_eq!(engine.len(), 2);

    let served = engine
        .execute::<RawResponse, _>(html, &options, &mut origin)
        .await
        .unwrap();
    assert_eq!(served.status, CacheStatus::Hit);
    assert_eq!(&served.value.unwrap().body[..], b"<p/>");
}

#[tokio::test]
async fn test_response_vary_mismatch_is_a_miss() {
    let engine = engine();
    let mut origin = Origin::new(|_, _| {
        Fetched::raw(raw(
            &[("cache-control", "max-age=60"), ("vary", "Accept-Language")],
            "hello",
        ))
    });
    let options = RequestOptions::default();
    let english = RequestSnapshot::get(uri("http://api/greeting"))
        .with_headers(headers(&[("accept-language", "en")]));
    let german = RequestSnapshot::get(uri("http://api/greeting"))
        .with_headers(headers(&[("accept-language", "de")]));

    engine
        .execute::<RawResponse, _>(english.clone(), &options, &mut origin)
        .await
        .unwrap();
    let hit = engine
        .execute::<RawResponse, _>(english, &options, &mut origin)
        .await
        .unwrap();
    let miss = engine
        .execute::<RawResponse, _>(german, &options, &mut origin)
        .await
        .unwrap();

    assert_eq!(hit.status, CacheStatus::Hit);
    assert_eq!(miss.status, CacheStatus::Miss);
    assert_eq!(origin.calls(), 2);
}

#[tokio::test]
async fn test_no_cache_option_bypasses_read_and_write() {
    let engine = engine();
    let mut origin = book_origin("max-age=60");
    let request = RequestSnapshot::get(uri("http://api/books/1"));
    let options = RequestOptions::new().no_cache();

    for _ in 0..2 {
        let outcome = engine
            .execute::<Book, _>(request.clone(), &options, &mut origin)
            .await
            .unwrap();
        assert_eq!(outcome.status, CacheStatus::Bypass);
    }
    assert_eq!(origin.calls(), 2);
    assert!(engine.is_empty());
}

#[tokio::test]
async fn test_request_no_cache_refetches_but_stores() {
    let engine = engine();
    let mut origin = book_origin("max-age=60");
    let options = RequestOptions::default();
    let plain = RequestSnapshot::get(uri("http://api/books/1"));
    let refresh = plain
        .clone()
        .with_headers(headers(&[("cache-control", "no-cache")]));

    engine
        .execute::<Book, _>(plain.clone(), &options, &mut origin)
        .await
        .unwrap();
    let refreshed = engine
        .execute::<Book, _>(refresh, &options, &mut origin)
        .await
        .unwrap();
    assert_eq!(refreshed.status, CacheStatus::Miss);
    assert_eq!(refreshed.value.unwrap().title, "edition 1");

    let served = engine
        .execute::<Book, _>(plain, &options, &mut origin)
        .await
        .unwrap();
    assert_eq!(served.status, CacheStatus::Hit);
    assert_eq!(served.value.unwrap().title, "edition 1");
    assert_eq!(origin.calls(), 2);
}

#[tokio::test]
async fn test_response_no_cache_is_never_served_from_cache() {
    let engine = engine();
    let mut origin = book_origin("no-cache, max-age=600");
    let request = RequestSnapshot::get(uri("http://api/books/1"));
    let options = RequestOptions::default();

    let mut titles = Vec::new();
    for _ in 0..3 {
        let outcome = engine
            .execute::<Book, _>(request.clone(), &options, &mut origin)
            .await
            .unwrap();
        assert_eq!(outcome.status, CacheStatus::Miss);
        titles.push(outcome.value.unwrap().title.clone());
    }
    assert_eq!(titles, vec!["edition 0", "edition 1", "edition 2"]);
    assert_eq!(origin.calls(), 3);
}

#[tokio::test]
async fn test_uncacheable_responses_are_not_stored() {
    let engine = engine();
    let options = RequestOptions::default();
    let request = RequestSnapshot::get(uri("http://api/books/1"));

    // `private` alone carries no lifetime.
    for cache_control in ["no-store", "private", ""] {
        engine
            .execute::<Book, _>(request.clone(), &options, &mut book_origin(cache_control))
            .await
            .unwrap();
    }
    assert!(engine.is_empty());

    let mut items = Items::new();
    let outcome = engine
        .store(
            &request,
            Fetched::new(
                http_response(StatusCode::CREATED, "max-age=60"),
                Book::new("x"),
            ),
            &options,
            &mut items,
        )
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        StoreOutcome::Skipped(SkipReason::NotCacheable)
    ));
}

fn http_response(status: StatusCode, cache_control: &'static str) -> ResponseSnapshot {
    ResponseSnapshot::new(status, headers(&[("cache-control", cache_control)]), true)
}

struct Quote(&'static str);

impl DeclaresCaching for Quote {
    fn cache_duration(&self) -> Option<TimeDelta> {
        Some(TimeDelta::zero())
    }
}

#[tokio::test]
async fn test_zero_declared_duration_fetches_every_time() {
    let engine = engine();
    let mut origin = Origin::new(|_, _| {
        Fetched::declared(ok_response(&[("cache-control", "max-age=3600")]), Quote("now"))
    });
    let request = RequestSnapshot::get(uri("http://api/quote"));
    let options = RequestOptions::default();

    let first = engine
        .execute::<Quote, _>(request.clone(), &options, &mut origin)
        .await
        .unwrap();
    let second = engine
        .execute::<Quote, _>(request, &options, &mut origin)
        .await
        .unwrap();

    assert_eq!(first.status, CacheStatus::Miss);
    assert_eq!(second.status, CacheStatus::Miss);
    assert_eq!(second.value.unwrap().0, "now");
    assert_eq!(origin.calls(), 2);
    assert!(engine.is_empty());
}

#[tokio::test]
async fn test_explicit_duration_makes_headerless_response_cacheable() {
    let engine = engine();
    let mut origin = book_origin("");
    let request = RequestSnapshot::get(uri("http://api/books/1"));
    let options = RequestOptions::new().duration(TimeDelta::minutes(5));

    engine
        .execute::<Book, _>(request.clone(), &options, &mut origin)
        .await
        .unwrap();
    let second = engine
        .execute::<Book, _>(request, &options, &mut origin)
        .await
        .unwrap();
    assert_eq!(second.status, CacheStatus::Hit);
    assert_eq!(origin.calls(), 1);
}

struct Edition(u32);

impl DeclaresCaching for Edition {}

fn engine_with_default_minute() -> CacheEngine {
    let config = CacheConfig::builder()
        .default_duration(std::time::Duration::from_secs(60))
        .build()
        .unwrap();
    CacheEngine::new(config).unwrap()
}

#[tokio::test]
async fn test_default_duration_applies_to_declaring_values_only() {
    let engine = engine_with_default_minute();
    let options = RequestOptions::default();

    let mut plain = Origin::new(|_, n| Fetched::new(ok_response(&[]), Book::new(&n.to_string())));
    let request = RequestSnapshot::get(uri("http://api/books/1"));
    for _ in 0..2 {
        let outcome = engine
            .execute::<Book, _>(request.clone(), &options, &mut plain)
            .await
            .unwrap();
        assert_eq!(outcome.status, CacheStatus::Miss);
    }
    assert_eq!(plain.calls(), 2);

    let mut declaring = Origin::new(|_, n| Fetched::declared(ok_response(&[]), Edition(n as u32)));
    let request = RequestSnapshot::get(uri("http://api/editions/1"));
    engine
        .execute::<Edition, _>(request.clone(), &options, &mut declaring)
        .await
        .unwrap();
    let second = engine
        .execute::<Edition, _>(request, &options, &mut declaring)
        .await
        .unwrap();
    assert_eq!(second.status, CacheStatus::Hit);
    assert_eq!(second.value.unwrap().0, 0);
    assert_eq!(declaring.calls(), 1);
}

#[tokio::test]
async fn test_default_duration_keeps_response_max_age() {
    let engine = engine_with_default_minute();
    let mut origin = book_origin("max-age=3600");
    let request = RequestSnapshot::get(uri("http://api/books/1"));
    engine
        .execute::<Book, _>(request.clone(), &RequestOptions::default(), &mut origin)
        .await
        .unwrap();

    let key = engine.key_for(&request, ResultType::of::<Book>());
    let entry = engine.entry(&key).unwrap();
    let lifetime = entry.metadata.expiration.unwrap() - entry.metadata.date;
    assert_eq!(lifetime, TimeDelta::hours(1));
}

#[tokio::test]
async fn test_same_uri_different_types_are_independent() {
    let engine = engine();
    let books = book_origin("max-age=60");
    let authors = Origin::new(|_, _| {
        Fetched::new(
            ok_response(&[("cache-control", "max-age=60")]),
            Author {
                name: "Lem".into(),
            },
        )
    });
    let request = RequestSnapshot::get(uri("http://api/things/1"));
    let options = RequestOptions::default();

    for _ in 0..2 {
        engine
            .execute::<Book, _>(request.clone(), &options, &mut books.clone())
            .await
            .unwrap();
        engine
            .execute::<Author, _>(request.clone(), &options, &mut authors.clone())
            .await
            .unwrap();
    }

    assert_eq!(books.calls(), 1);
    assert_eq!(authors.calls(), 1);
    assert_eq!(engine.len(), 2);

    let book_key = engine.key_for(&request, ResultType::of::<Book>());
    let author_key = engine.key_for(&request, ResultType::of::<Author>());
    assert_ne!(book_key, author_key);
    assert_eq!(engine.get::<Author>(&author_key).unwrap().unwrap().name, "Lem");
}

#[tokio::test]
async fn test_type_mismatch_error_or_suppressed() {
    let request = RequestSnapshot::get(uri("http://api/books/1"));
    let options = RequestOptions::default();

    let strict = engine();
    strict
        .execute::<Book, _>(request.clone(), &options, &mut book_origin("max-age=60"))
        .await
        .unwrap();
    let key = strict.key_for(&request, ResultType::of::<Book>());
    let err = strict.get::<Author>(&key).unwrap_err();
    match err {
        CacheError::TypeMismatch(mismatch) => {
            assert!(mismatch.expected.ends_with("Author"));
            assert!(mismatch.actual.ends_with("Book"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let lenient = CacheEngine::new(
        CacheConfig::builder()
            .suppress_type_mismatch(true)
            .build()
            .unwrap(),
    )
    .unwrap();
    lenient
        .execute::<Book, _>(request.clone(), &options, &mut book_origin("max-age=60"))
        .await
        .unwrap();
    assert!(lenient.get::<Author>(&key).unwrap().is_none());
    assert!(lenient.get::<Book>(&key).unwrap().is_some());
}

#[tokio::test]
async fn test_stale_entry_served_only_when_request_allows() {
    let engine = engine();
    let request = RequestSnapshot::get(uri("http://api/books/1"));
    let options = RequestOptions::default();
    let mut items = Items::new();

    // Already expired on arrival.
    engine
        .store(
            &request,
            Fetched::new(
                ok_response(&[("expires", "Thu, 01 Jan 1998 00:00:00 GMT")]),
                Book::new("old"),
            ),
            &options,
            &mut items,
        )
        .await
        .unwrap();

    let strict = engine
        .lookup(&request, ResultType::of::<Book>(), &options, &mut items)
        .await
        .unwrap();
    assert!(matches!(strict, Lookup::Revalidate(_)));

    let tolerant = request
        .clone()
        .with_headers(headers(&[("cache-control", "max-stale")]));
    let mut origin = book_origin("max-age=60");
    let outcome = engine
        .execute::<Book, _>(tolerant, &options, &mut origin)
        .await
        .unwrap();
    assert_eq!(outcome.status, CacheStatus::Stale);
    assert_eq!(outcome.value.unwrap().title, "old");
    assert_eq!(origin.calls(), 0);
}

#[tokio::test]
async fn test_min_fresh_forces_refetch() {
    let engine = engine();
    let mut origin = book_origin("max-age=30");
    let options = RequestOptions::default();
    let request = RequestSnapshot::get(uri("http://api/books/1"));

    engine
        .execute::<Book, _>(request.clone(), &options, &mut origin)
        .await
        .unwrap();
    let demanding = request.with_headers(headers(&[("cache-control", "min-fresh=600")]));
    let outcome = engine
        .execute::<Book, _>(demanding, &options, &mut origin)
        .await
        .unwrap();
    assert_eq!(outcome.status, CacheStatus::Miss);
    assert_eq!(origin.calls(), 2);
}

#[tokio::test]
async fn test_only_if_cached_without_entry_is_gateway_timeout() {
    let engine = engine();
    let mut origin = book_origin("max-age=60");
    let request = RequestSnapshot::get(uri("http://api/books/1"))
        .with_headers(headers(&[("cache-control", "only-if-cached")]));

    let outcome = engine
        .execute::<Book, _>(request, &RequestOptions::default(), &mut origin)
        .await
        .unwrap();
    assert_eq!(outcome.response.status, StatusCode::GATEWAY_TIMEOUT);
    assert!(outcome.value.is_none());
    assert_eq!(origin.calls(), 0);
}

#[tokio::test]
async fn test_not_modified_keeps_value_and_extends_freshness() {
    let engine = engine();
    let request = RequestSnapshot::get(uri("http://api/books/1"));
    let options = RequestOptions::default();
    let mut items = Items::new();

    engine
        .store(
            &request,
            Fetched::new(
                ok_response(&[
                    ("cache-control", "max-age=60, must-revalidate"),
                    ("date", "Thu, 01 Jan 1998 00:00:00 GMT"),
                    ("etag", "\"v1\""),
                ]),
                Book::new("original"),
            ),
            &options,
            &mut items,
        )
        .await
        .unwrap();

    let mut origin = Origin::new(|upstream, _| {
        let stored = upstream.revalidating.as_ref().expect("entry to revalidate");
        assert_eq!(stored.metadata.etag().as_deref(), Some("\"v1\""));
        Fetched::not_modified(headers(&[("cache-control", "max-age=120"), ("etag", "\"v1\"")]))
    });
    let outcome = engine
        .execute::<Book, _>(request.clone(), &options, &mut origin)
        .await
        .unwrap();

    assert_eq!(outcome.status, CacheStatus::Revalidated);
    assert_eq!(outcome.value.unwrap().title, "original");
    assert_eq!(origin.calls(), 1);

    let key = engine.key_for(&request, ResultType::of::<Book>());
    let entry = engine.entry(&key).unwrap();
    assert_eq!(entry.metadata.status, StatusCode::OK);
    assert_eq!(entry.metadata.etags.len(), 1);

    let again = engine
        .execute::<Book, _>(request, &options, &mut origin)
        .await
        .unwrap();
    assert_eq!(again.status, CacheStatus::Hit);
    assert_eq!(origin.calls(), 1);
}

#[tokio::test]
async fn test_disabled_engine_bypasses() {
    let engine =
        CacheEngine::new(CacheConfig::builder().enabled(false).build().unwrap()).unwrap();
    let mut origin = book_origin("max-age=60");
    let request = RequestSnapshot::get(uri("http://api/books/1"));
    for _ in 0..2 {
        engine
            .execute::<Book, _>(request.clone(), &RequestOptions::default(), &mut origin)
            .await
            .unwrap();
    }
    assert_eq!(origin.calls(), 2);
    assert!(engine.is_empty());
}

#[tokio::test]
async fn test_upstream_error_is_reported() {
    let engine = engine();
    let mut failing = |_request: cachet::UpstreamRequest| async {
        Err::<Fetched<Book>, _>(std::io::Error::other("connection reset"))
    };
    let err = engine
        .execute::<Book, _>(
            RequestSnapshot::get(uri("http://api/books/1")),
            &RequestOptions::default(),
            &mut failing,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::Upstream(_)));
    assert!(err.to_string().contains("connection reset"));
}
