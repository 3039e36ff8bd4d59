//! Search engine and service facade for the fastfind system.
//!
//! The crate splits into the matching layer and the assembly:
//!
//! - [`Matcher`] - exact / fuzzy / wildcard / regex scoring over candidate
//!   records, with [`fuzzy`] metrics, [`wildcard_match`], and a compiled
//!   [`RegexCache`]
//! - [`Ranker`](ranking::Ranker) - the weighted relevance mix
//! - [`SearchEngine`] - narrowing, matching, ranking, result caching
//! - [`IndexService`] - the facade front-ends drive: crawl, watch,
//!   search, stats, shutdown

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod fuzzy;
pub mod highlight;
pub mod matcher;
pub mod ranking;
pub mod service;
pub mod wildcard;

pub use engine::{EngineStats, SearchEngine};
pub use error::QueryError;
pub use fuzzy::{combined_similarity, SimilarityCache};
pub use highlight::{highlights_for, Highlights};
pub use matcher::{Matcher, RegexCache};
pub use ranking::{size_score, sort_results, Ranker};
pub use service::{IndexService, ServiceError, ServiceStats};
pub use wildcard::{has_wildcards, wildcard_match};
