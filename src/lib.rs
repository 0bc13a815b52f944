//! # ptgen
//!
//! Turns a media or game link into a BBCode description plus a JSON record,
//! scraped from douban, IMDb, Bangumi, Steam, indienova or the Epic store.
//!
//! ## Architecture
//!
//! ```text
//! request → resolver → edge cache → persistent cache → adapter → envelope
//! ```
//!
//! - [`resolver`]: maps a link onto a `(site, sid)` pair
//! - [`sources`]: one adapter per site, plus searchers for the movie sites
//! - [`store`]: the two cache tiers
//! - [`server`]: axum front end
//!
//! ## Quick Start
//!
//! ```bash
//! # Print a description
//! ptgen gen https://movie.douban.com/subject/1292052/
//!
//! # Look something up
//! ptgen search 肖申克 --source douban
//!
//! # Run the HTTP endpoint
//! ptgen serve --bind 127.0.0.1:8080
//! ```

/// Application context, request orchestration and error types.
///
/// [`handle`](app::handle) is the single entry point shared by the HTTP
/// server and the CLI.
pub mod app;

/// Command-line interface using clap.
///
/// - `serve [--bind ADDR]` - Run the HTTP endpoint
/// - `gen <url> | --site S --sid ID` - Print a description
/// - `search <query> [--source S]` - List candidates
/// - `purge` - Drop expired cache rows
pub mod cli;

/// Configuration loaded from `~/.config/ptgen/config.toml`, with
/// environment overrides for secrets.
pub mod config;

/// Core domain models.
///
/// - [`Site`](domain::Site): supported sources
/// - [`Record`](domain::Record): one adapter result, with per-site [`Details`](domain::Details)
/// - [`Envelope`](domain::Envelope): the JSON wrapper every response shares
pub mod domain;

/// Upstream HTTP behind the [`Fetcher`](fetcher::Fetcher) trait.
pub mod fetcher;

/// HTML, JSONP and BBCode helpers shared by the adapters.
pub mod parser;

pub mod resolver;

/// HTTP endpoint built on axum.
pub mod server;

/// Per-site adapters and searchers.
pub mod sources;

/// Cache tiers behind the [`CacheStore`](store::CacheStore) trait.
///
/// - [`SqliteStore`](store::SqliteStore): persistent, keyed by resource
/// - [`MemoryStore`](store::MemoryStore): in-process, keyed by request
pub mod store;

/// Declarative BBCode line templates.
pub mod template;
