//! Configuration for feed crawling runs.

pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

pub use builder::CrawlConfigBuilder;
pub use types::{CrawlConfig, CrawlMode};
