//! DNS-over-HTTPS resolver cache
//!
//! Resolves hostnames to IPv4 addresses by querying a dns-json endpoint
//! instead of the operating system resolver, and memoizes results for the
//! lifetime of the resolver. Concurrent lookups for the same hostname share
//! a single in-flight query: the first caller inserts a shared future into
//! the cache before awaiting it, so no hostname ever has more than one
//! upstream query pending.
//!
//! The resolver plugs into reqwest through the [`Resolve`] trait, which lets
//! every outbound connection of a client be pinned to the address it
//! returns. The resolver's own HTTP client deliberately uses system DNS --
//! resolving the resolution endpoint through itself would recurse.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use hyper::client::connect::dns::Name;
use reqwest::dns::{Addrs, Resolve, Resolving};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::constants::{doh, http};
use crate::errors::{ResolveError, ResolveResult};

type SharedLookup = Shared<BoxFuture<'static, ResolveResult<Ipv4Addr>>>;

/// dns-json response body (unknown fields ignored)
#[derive(Debug, Deserialize)]
struct DnsResponse {
    #[serde(rename = "Answer", default)]
    answer: Vec<DnsAnswer>,
}

#[derive(Debug, Deserialize)]
struct DnsAnswer {
    data: String,
}

/// Memoizing DNS-over-HTTPS resolver
///
/// Cheap to clone; all clones share the same cache. Scoped to one pipeline
/// run rather than being process-global state.
#[derive(Clone)]
pub struct DohResolver {
    http: Client,
    endpoint: String,
    cache: Arc<Mutex<HashMap<String, SharedLookup>>>,
}

impl DohResolver {
    /// Creates a resolver querying the given dns-json endpoint
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the internal HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> reqwest::Result<Self> {
        let http = Client::builder()
            .user_agent(http::USER_AGENT)
            .timeout(doh::QUERY_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            cache: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Resolves a hostname to an IPv4 address, memoizing the result
    ///
    /// Concurrent callers for the same hostname await the same upstream
    /// query and all receive its outcome. On failure the cache entry is
    /// evicted so a later call can retry with a fresh query.
    pub async fn lookup(&self, host: &str) -> ResolveResult<Ipv4Addr> {
        let lookup = {
            let mut cache = self.cache.lock().await;
            match cache.get(host) {
                Some(pending) => pending.clone(),
                None => {
                    let query = Self::query(
                        self.http.clone(),
                        self.endpoint.clone(),
                        host.to_string(),
                    )
                    .boxed()
                    .shared();
                    cache.insert(host.to_string(), query.clone());
                    query
                }
            }
        };

        // Await a clone; the original is kept for the eviction identity check
        let result = lookup.clone().await;

        if result.is_err() {
            // Evict only our own entry; a retry may already have replaced it
            let mut cache = self.cache.lock().await;
            let stale = cache
                .get(host)
                .map_or(false, |current| current.ptr_eq(&lookup));
            if stale {
                cache.remove(host);
            }
        }

        result
    }

    /// Performs one A-record query against the dns-json endpoint
    async fn query(http: Client, endpoint: String, host: String) -> ResolveResult<Ipv4Addr> {
        let url = format!("{endpoint}?type=A&name={host}");
        debug!("resolving {host} via {endpoint}");

        let response = http
            .get(&url)
            .header(ACCEPT, doh::ACCEPT)
            .send()
            .await
            .map_err(|e| ResolveError::Transport {
                host: host.clone(),
                message: e.to_string(),
            })?;

        if response.status() != StatusCode::OK {
            return Err(ResolveError::Status {
                host,
                status: response.status().as_u16(),
            });
        }

        let body: DnsResponse = response.json().await.map_err(|e| ResolveError::Json {
            host: host.clone(),
            message: e.to_string(),
        })?;

        let answer = body
            .answer
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NoAnswer { host: host.clone() })?;

        let address = answer
            .data
            .parse::<Ipv4Addr>()
            .map_err(|_| ResolveError::BadAddress {
                host: host.clone(),
                data: answer.data,
            })?;

        debug!("resolved {host} -> {address}");
        Ok(address)
    }
}

impl Resolve for DohResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.clone();
        Box::pin(async move {
            let address = resolver.lookup(name.as_str()).await?;
            // Port 0 is a placeholder; the connector substitutes the URL port
            let addrs: Addrs = Box::new(std::iter::once(SocketAddr::new(
                IpAddr::V4(address),
                0,
            )));
            Ok(addrs)
        })
    }
}
