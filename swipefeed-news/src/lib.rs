//! Feed ingestion for swipefeed
//!
//! This crate turns configured feed URLs into canonical articles:
//! - `fetcher`: HTTP(S) fetching with manual redirects, timeouts and byte budgets
//! - `parser`: RSS/Atom parsing into a dialect-neutral raw entry
//! - `normalizer`: raw entry -> `Article`, including image resolution
//! - `rules`: ordered category/region inference tables
//! - `source`: article sources consumed by the aggregation cache
//! - `summarizer`: optional external summarization client

pub mod error;
pub mod fetcher;
pub mod html;
pub mod normalizer;
pub mod parser;
pub mod rules;
pub mod source;
pub mod summarizer;

pub use error::NewsError;
pub use fetcher::{FetchResponse, HttpFetcher, MAX_REDIRECTS};
pub use normalizer::{Normalizer, NormalizerConfig};
pub use parser::{parse_feed, MediaThumbnail, ParsedFeed, RawEntry};
pub use rules::{CategoryInput, ClassificationRules, RuleTables};
pub use source::{ArticleSource, RssFeedSource, SecondarySource};
pub use summarizer::SummarizerClient;
