//! Shared fixtures for engine integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cachet::{
    BoxError, CacheEvent, Fetched, HandlerRegistryBuilder, Priority, RawResponse, ResourceUri,
    ResponseSnapshot, TypeConstraint, Upstream, UpstreamRequest,
};
use futures::future::{Ready, ready};
use http::{HeaderMap, HeaderValue, StatusCode};

pub fn uri(s: &str) -> ResourceUri {
    ResourceUri::parse(s).unwrap()
}

pub fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.append(*name, HeaderValue::from_static(value));
    }
    map
}

pub fn ok_response(pairs: &[(&'static str, &'static str)]) -> ResponseSnapshot {
    ResponseSnapshot::new(StatusCode::OK, headers(pairs), true)
}

pub fn raw(pairs: &[(&'static str, &'static str)], body: &'static str) -> RawResponse {
    RawResponse::new(StatusCode::OK, headers(pairs), body)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub title: String,
}

impl Book {
    pub fn new(title: &str) -> Self {
        Book {
            title: title.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub name: String,
}

type Respond<T> = dyn Fn(&UpstreamRequest, usize) -> Fetched<T> + Send + Sync;

/// Upstream that counts its calls and answers through a closure.
pub struct Origin<T> {
    calls: Arc<AtomicUsize>,
    respond: Arc<Respond<T>>,
}

impl<T> Clone for Origin<T> {
    fn clone(&self) -> Self {
        Origin {
            calls: Arc::clone(&self.calls),
            respond: Arc::clone(&self.respond),
        }
    }
}

impl<T> Origin<T> {
    /// `respond` receives the request and the zero-based call number.
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&UpstreamRequest, usize) -> Fetched<T> + Send + Sync + 'static,
    {
        Origin {
            calls: Arc::new(AtomicUsize::new(0)),
            respond: Arc::new(respond),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<T: Send> Upstream<T> for Origin<T> {
    type Error = BoxError;
    type Future = Ready<Result<Fetched<T>, BoxError>>;

    fn call(&mut self, request: UpstreamRequest) -> Self::Future {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        ready(Ok((self.respond)(&request, n)))
    }
}

/// Shared log of `(event, uri)` pairs.
pub type EventLog = Arc<Mutex<Vec<(CacheEvent, String)>>>;

/// Registers a handler on every event that appends to `log`.
pub fn record_events(builder: HandlerRegistryBuilder, log: &EventLog) -> HandlerRegistryBuilder {
    let mut builder = builder;
    for event in CacheEvent::ALL {
        let log = Arc::clone(log);
        builder = builder.on_fn(event, Priority::Default, TypeConstraint::Any, move |cx| {
            log.lock()
                .unwrap()
                .push((cx.event(), cx.key().uri().to_string()));
            Ok(())
        });
    }
    builder
}

pub fn count(log: &EventLog, event: CacheEvent) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|(e, _)| *e == event)
        .count()
}

pub fn count_for(log: &EventLog, event: CacheEvent, uri: &str) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|(e, u)| *e == event && u == uri)
        .count()
}
