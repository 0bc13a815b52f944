//! Per-source extraction adapters.
//!
//! Every adapter validates its identifier, fetches the upstream page(s),
//! extracts a source-specific record and renders its description. Known
//! failure modes ("does not exist", "temporarily blocked") come back as a
//! failed [`Record`]; anything else is a [`GenError`](crate::app::GenError)
//! for the caller to translate.
//!
//! Pages are parsed by synchronous functions that return owned values, so no
//! parsed document lives across an await point.

pub mod bangumi;
pub mod douban;
pub mod epic;
pub mod imdb;
pub mod indienova;
pub mod steam;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::app::Result;
use crate::config::Config;
use crate::domain::{Person, Record, SearchResult, Site};
use crate::fetcher::Fetcher;
use crate::parser::as_text;

pub use bangumi::Bangumi;
pub use douban::Douban;
pub use epic::Epic;
pub use imdb::Imdb;
pub use indienova::Indienova;
pub use steam::Steam;

pub const NONE_EXIST_ERROR: &str = "The corresponding resource does not exist.";

#[async_trait]
pub trait Adapter: Send + Sync {
    fn site(&self) -> Site;

    async fn generate(&self, sid: &str) -> Result<Record>;
}

#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

/// All adapters and searchers, wired to one fetcher.
pub struct Registry {
    adapters: Vec<Arc<dyn Adapter>>,
    searchers: Vec<(Site, Arc<dyn Searcher>)>,
}

impl Registry {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &Config) -> Self {
        let douban = Arc::new(Douban::new(
            fetcher.clone(),
            config.douban.cookie.clone(),
            config.douban.apikeys.clone(),
        ));
        let imdb = Arc::new(Imdb::new(fetcher.clone()));
        let bangumi = Arc::new(Bangumi::new(fetcher.clone()));

        let adapters: Vec<Arc<dyn Adapter>> = vec![
            douban.clone() as Arc<dyn Adapter>,
            imdb.clone() as Arc<dyn Adapter>,
            bangumi.clone() as Arc<dyn Adapter>,
            Arc::new(Steam::new(fetcher.clone())),
            Arc::new(Indienova::new(
                fetcher.clone(),
                config.indienova.cookie.clone(),
            )),
            Arc::new(Epic::new(fetcher)),
        ];
        let searchers: Vec<(Site, Arc<dyn Searcher>)> = vec![
            (Site::Douban, douban as Arc<dyn Searcher>),
            (Site::Imdb, imdb as Arc<dyn Searcher>),
            (Site::Bangumi, bangumi as Arc<dyn Searcher>),
        ];

        Self {
            adapters,
            searchers,
        }
    }

    pub fn adapter(&self, site: Site) -> Option<&dyn Adapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.site() == site)
            .map(|adapter| adapter.as_ref())
    }

    pub fn searcher(&self, site: Site) -> Option<&dyn Searcher> {
        self.searchers
            .iter()
            .find(|(s, _)| *s == site)
            .map(|(_, searcher)| searcher.as_ref())
    }
}

/// Credited people from structured data: a single object or an array,
/// keeping only entries typed `Person` (or untyped) that carry a name.
pub(crate) fn people(value: &Value) -> Vec<Person> {
    let entries = match value {
        Value::Array(items) => items.iter().collect::<Vec<_>>(),
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .filter(|entry| {
            entry
                .get("@type")
                .and_then(Value::as_str)
                .is_none_or(|kind| kind == "Person")
        })
        .map(|entry| Person {
            name: entry.get("name").map(as_text).unwrap_or_default(),
            url: entry.get("url").map(as_text).unwrap_or_default(),
        })
        .filter(|person| !person.name.is_empty())
        .collect()
}

/// Counters published as empty or missing read as zero.
pub(crate) fn or_zero(value: String) -> String {
    if value.is_empty() {
        "0".to_string()
    } else {
        value
    }
}

/// Split on `sep`, trimming pieces and dropping empty ones.
pub(crate) fn split_list(value: &str, sep: &str) -> Vec<String> {
    value
        .split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
