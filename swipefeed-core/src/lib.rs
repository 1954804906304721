//! Core types for the swipefeed news pipeline
//!
//! This crate defines the shared data structures used across the workspace:
//! the canonical article model, classification labels, per-user preference
//! state and the application configuration.

pub mod article;
pub mod config;
pub mod error;
pub mod labels;
pub mod preferences;

pub use article::{canonicalize_url, Article, Enrichment};
pub use config::{AppConfig, FeedConfig, SecondarySourceConfig, SummarizerConfig};
pub use error::{CoreError, CoreResult};
pub use labels::{Category, Region};
pub use preferences::{
    ActivityAction, ActivityEvent, ActivityRecord, ArticleMetadata, UserPreferenceState,
    DEFAULT_CUSTOMIZATION_LEVEL, MAX_ACTIVITIES,
};
