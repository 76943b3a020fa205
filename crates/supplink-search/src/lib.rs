//! Product-link discovery against an external shopping search API.
//!
//! The pipeline is: build query variants per brand ([`query`]), run them
//! through a [`SearchProvider`] with bounded retry ([`client`], [`retry`]),
//! keep results on approved domains ([`domain`]) that mention the item
//! ([`relevance`]), pull price and rating out of each record ([`extract`]),
//! and assemble a deduplicated, capped set of links ([`collector`]).

pub mod client;
pub mod collector;
pub mod domain;
pub mod error;
pub mod extract;
pub mod query;
pub mod relevance;
pub mod retry;
pub mod types;

pub use client::{ClientSettings, SearchProvider, SerpApiClient};
pub use collector::{CollectSettings, LinkCollector};
pub use domain::{DomainFilter, UNKNOWN_BRAND};
pub use error::{CollectError, SearchError};
pub use extract::{extract_price, extract_rating};
pub use query::{build_queries, QueryBuilder};
pub use relevance::is_relevant;
pub use retry::RetryPolicy;
pub use types::RawSearchResult;
