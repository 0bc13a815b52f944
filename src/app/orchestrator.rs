//! Request handling: key gate, two cache tiers, dispatch and envelope.
//!
//! Every inbound request is identified by its raw target (path plus query).
//! The flow is:
//!
//! 1. reject a missing or wrong `apikey` when one is configured, touching
//!    nothing else;
//! 2. answer from the edge tier, keyed by a digest of the target;
//! 3. turn the query into an [`Operation`] (or a domain error);
//! 4. answer from the persistent tier, keyed by `info-{site}-{sid}` or
//!    `search-{source}-{query}`;
//! 5. run the adapter and write back: successes to both tiers, domain
//!    errors to the edge tier only. Internal errors are never cached.

use std::time::Duration;

use sha2::{Digest, Sha256};
use url::form_urlencoded;

use crate::app::{AppContext, GenError, Result};
use crate::domain::{Body, Diagnostic, Envelope, Site};
use crate::resolver;
use crate::store::CacheStore;

pub const APIKEY_ERROR: &str = "apikey required.";
pub const MISSING_KEY_ERROR: &str =
    "Miss key of `site` or `sid` , or input unsupported resource link";
pub const UNKNOWN_SITE_ERROR: &str = "Unknown value of key `site`.";
pub const UNKNOWN_SOURCE_ERROR: &str = "Unknown value of key `source`.";

/// Query parameters understood by the endpoint. Empty values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenRequest {
    pub url: Option<String>,
    pub site: Option<String>,
    pub sid: Option<String>,
    pub search: Option<String>,
    pub source: Option<String>,
    pub apikey: Option<String>,
    pub debug: bool,
}

impl GenRequest {
    /// Parse a request target such as `/?site=douban&sid=1292052`.
    pub fn from_target(target: &str) -> Self {
        let query = target.split_once('?').map(|(_, q)| q).unwrap_or_default();
        let mut request = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match &*key {
                "url" => &mut request.url,
                "site" => &mut request.site,
                "sid" => &mut request.sid,
                "search" => &mut request.search,
                "source" => &mut request.source,
                "apikey" => &mut request.apikey,
                "debug" => {
                    request.debug = value == "1";
                    continue;
                }
                _ => continue,
            };
            slot.get_or_insert_with(|| value.to_string());
        }

        request
    }

    /// Build the target this request would arrive as.
    pub fn to_target(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        let pairs = [
            ("url", &self.url),
            ("site", &self.site),
            ("sid", &self.sid),
            ("search", &self.search),
            ("source", &self.source),
            ("apikey", &self.apikey),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                query.append_pair(key, value);
            }
        }
        if self.debug {
            query.append_pair("debug", "1");
        }
        format!("/?{}", query.finish())
    }

    /// Decide what to run. A search takes precedence over a lookup, and a
    /// `url` over an explicit `site`/`sid` pair.
    pub fn operation(&self) -> std::result::Result<Operation, &'static str> {
        if let Some(query) = &self.search {
            let source = match self.source.as_deref() {
                None => Site::Douban,
                Some(name) => name.parse().map_err(|_| UNKNOWN_SOURCE_ERROR)?,
            };
            return Ok(Operation::Search {
                source,
                query: query.clone(),
            });
        }

        if let Some(url) = &self.url {
            return resolver::resolve(url)
                .map(|target| Operation::Generate {
                    site: target.site,
                    sid: target.sid,
                })
                .ok_or(MISSING_KEY_ERROR);
        }

        match (&self.site, &self.sid) {
            (Some(site), Some(sid)) => Ok(Operation::Generate {
                site: site.parse().map_err(|_| UNKNOWN_SITE_ERROR)?,
                sid: sid.clone(),
            }),
            _ => Err(MISSING_KEY_ERROR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Generate { site: Site, sid: String },
    Search { source: Site, query: String },
}

impl Operation {
    pub fn cache_key(&self) -> String {
        match self {
            Operation::Generate { site, sid } => format!("info-{}-{}", site, sid),
            Operation::Search { source, query } => format!("search-{}-{}", source, query),
        }
    }
}

/// Serialized envelope plus the status it should be served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    fn ok(body: String) -> Self {
        Self { status: 200, body }
    }
}

/// Answer one request target.
pub async fn handle(ctx: &AppContext, target: &str) -> Reply {
    let request = GenRequest::from_target(target);
    let maintainer = ctx.config.server.maintainer.as_str();

    if let Some(expected) = ctx.config.server.apikey.as_deref() {
        if request.apikey.as_deref() != Some(expected) {
            return Reply {
                status: 403,
                body: serialize(&Envelope::new(Body::failure(APIKEY_ERROR), maintainer)),
            };
        }
    }

    let edge_key = hex::encode(Sha256::digest(target.as_bytes()));
    if let Some(body) = cache_get(ctx.edge.as_deref(), &edge_key) {
        tracing::debug!("Edge cache hit for {}", target);
        return Reply::ok(body);
    }

    match respond(ctx, &request).await {
        Ok(body) => {
            cache_put(ctx.edge.as_deref(), &edge_key, &body, ctx.edge_ttl());
            Reply::ok(body)
        }
        Err(err) => {
            tracing::error!("Request {} failed: {}", target, err);
            let message = format!(
                "Internal Error, contact {}. Exception: {}",
                maintainer, err
            );
            let body = if request.debug {
                Body::failure_with_debug(message, Diagnostic::from_error(&err, target))
            } else {
                Body::failure(message)
            };
            Reply::ok(serialize(&Envelope::new(body, maintainer)))
        }
    }
}

async fn respond(ctx: &AppContext, request: &GenRequest) -> Result<String> {
    let maintainer = ctx.config.server.maintainer.as_str();

    let operation = match request.operation() {
        Ok(operation) => operation,
        Err(message) => {
            return Envelope::new(Body::failure(message), maintainer).to_json();
        }
    };

    let key = operation.cache_key();
    if let Some(body) = cache_get(ctx.persistent.as_deref(), &key) {
        tracing::debug!("Persistent cache hit for {}", key);
        return Ok(body);
    }

    let body = run(ctx, &operation).await?;
    let success = body.is_success();
    let json = Envelope::new(body, maintainer).to_json()?;

    if success {
        cache_put(ctx.persistent.as_deref(), &key, &json, ctx.persistent_ttl());
        tracing::info!("Cached {}", key);
    }
    Ok(json)
}

async fn run(ctx: &AppContext, operation: &Operation) -> Result<Body> {
    match operation {
        Operation::Generate { site, sid } => {
            let adapter = ctx
                .registry
                .adapter(*site)
                .ok_or_else(|| GenError::Other(format!("no adapter for {}", site)))?;
            Ok(Body::Record(adapter.generate(sid).await?))
        }
        Operation::Search { source, query } => match ctx.registry.searcher(*source) {
            Some(searcher) => Ok(Body::search(searcher.search(query).await?)),
            None => Ok(Body::failure(UNKNOWN_SOURCE_ERROR)),
        },
    }
}

fn cache_get(store: Option<&dyn CacheStore>, key: &str) -> Option<String> {
    match store?.get(key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Cache read for {} failed: {}", key, e);
            None
        }
    }
}

fn cache_put(
    store: Option<&dyn CacheStore>,
    key: &str,
    value: &str,
    ttl: Duration,
) {
    if let Some(store) = store {
        if let Err(e) = store.put(key, value, ttl) {
            tracing::warn!("Cache write for {} failed: {}", key, e);
        }
    }
}

fn serialize(envelope: &Envelope) -> String {
    envelope.to_json().unwrap_or_else(|e| {
        tracing::error!("Failed to serialize envelope: {}", e);
        r#"{"success": false, "error": "serialization failed", "format": ""}"#.to_string()
    })
}
