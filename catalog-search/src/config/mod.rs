//! Settings read from the environment.

mod dependencies;

pub use dependencies::{Collaborators, Dependencies};

use std::env;
use std::str::FromStr;

use crate::AppError;
use catalog_search_browsing::BrowsingConfig;
use catalog_search_pipeline::operations::PriceLookupConfig;
use catalog_search_pipeline::{IndexingConfig, PublisherConfig, RetryPolicy};

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default index scope.
const DEFAULT_SEARCH_SCOPE: &str = "default";

const DEFAULT_INDEX_PARTITION_SIZE: usize = 500;
const DEFAULT_FULL_REBUILD_PARALLELISM: usize = 5;
const DEFAULT_PRICE_LOOKUP_PAGE_SIZE: usize = 1000;
const DEFAULT_PRICE_LOOKUP_PARALLELISM: usize = 10;
const DEFAULT_HYDRATION_PARALLELISM: usize = 5;
const DEFAULT_HYDRATION_BATCH_SIZE: usize = 50;
const DEFAULT_RECONCILIATION_MAX_RETRIES: usize = 3;
const DEFAULT_USE_FULL_OBJECT_INDEX_STORING: bool = false;
const DEFAULT_USE_INDEX_SEARCH: bool = true;
const DEFAULT_INDEX_MAX_RETRIES: u32 = 3;
const DEFAULT_INDEX_INITIAL_RETRY_DELAY_MS: u64 = 100;
const DEFAULT_INDEX_MAX_RETRY_DELAY_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub opensearch_url: String,
    pub scope: String,
    pub partition_size: usize,
    pub full_rebuild_parallelism: usize,
    pub price_lookup_page_size: usize,
    pub price_lookup_parallelism: usize,
    pub hydration_parallelism: usize,
    pub hydration_batch_size: usize,
    pub reconciliation_max_retries: usize,
    /// Store the serialized entity in the index and hydrate from it.
    pub use_full_object_index_storing: bool,
    /// Serve searches from the index rather than the entity store.
    pub use_index_search: bool,
    pub index_max_retries: u32,
    pub index_initial_retry_delay_ms: u64,
    pub index_max_retry_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            opensearch_url: DEFAULT_OPENSEARCH_URL.to_string(),
            scope: DEFAULT_SEARCH_SCOPE.to_string(),
            partition_size: DEFAULT_INDEX_PARTITION_SIZE,
            full_rebuild_parallelism: DEFAULT_FULL_REBUILD_PARALLELISM,
            price_lookup_page_size: DEFAULT_PRICE_LOOKUP_PAGE_SIZE,
            price_lookup_parallelism: DEFAULT_PRICE_LOOKUP_PARALLELISM,
            hydration_parallelism: DEFAULT_HYDRATION_PARALLELISM,
            hydration_batch_size: DEFAULT_HYDRATION_BATCH_SIZE,
            reconciliation_max_retries: DEFAULT_RECONCILIATION_MAX_RETRIES,
            use_full_object_index_storing: DEFAULT_USE_FULL_OBJECT_INDEX_STORING,
            use_index_search: DEFAULT_USE_INDEX_SEARCH,
            index_max_retries: DEFAULT_INDEX_MAX_RETRIES,
            index_initial_retry_delay_ms: DEFAULT_INDEX_INITIAL_RETRY_DELAY_MS,
            index_max_retry_delay_ms: DEFAULT_INDEX_MAX_RETRY_DELAY_MS,
        }
    }
}

impl Settings {
    /// Load settings from environment variables, after reading `.env` if
    /// present.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `SEARCH_SCOPE`: Index scope (default: default)
    /// - `INDEX_PARTITION_SIZE`: Object ids per partition (default: 500)
    /// - `FULL_REBUILD_PARALLELISM`: Store pages fetched at once during a rebuild (default: 5)
    /// - `PRICE_LOOKUP_PAGE_SIZE`: Price ids per lookup (default: 1000)
    /// - `PRICE_LOOKUP_PARALLELISM`: Price lookups in flight (default: 10)
    /// - `HYDRATION_PARALLELISM`: Hydration fetches in flight (default: 5)
    /// - `HYDRATION_BATCH_SIZE`: Entity ids per hydration fetch (default: 50)
    /// - `RECONCILIATION_MAX_RETRIES`: Additional searches for stale hits (default: 3)
    /// - `USE_FULL_OBJECT_INDEX_STORING`: Store and read entity snapshots (default: false)
    /// - `USE_INDEX_SEARCH`: Search the index; when false the store serves pages (default: true)
    /// - `INDEX_MAX_RETRIES`: Retries of transient backend failures (default: 3)
    /// - `INDEX_INITIAL_RETRY_DELAY_MS`: First backoff delay (default: 100)
    /// - `INDEX_MAX_RETRY_DELAY_MS`: Backoff cap (default: 5000)
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - The loaded settings
    /// * `Err(AppError)` - If a variable holds an invalid value
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through `lookup`, which returns the raw value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            opensearch_url: text("OPENSEARCH_URL", DEFAULT_OPENSEARCH_URL),
            scope: text("SEARCH_SCOPE", DEFAULT_SEARCH_SCOPE),
            partition_size: parse(&lookup, "INDEX_PARTITION_SIZE", DEFAULT_INDEX_PARTITION_SIZE)?,
            full_rebuild_parallelism: parse(
                &lookup,
                "FULL_REBUILD_PARALLELISM",
                DEFAULT_FULL_REBUILD_PARALLELISM,
            )?,
            price_lookup_page_size: parse(
                &lookup,
                "PRICE_LOOKUP_PAGE_SIZE",
                DEFAULT_PRICE_LOOKUP_PAGE_SIZE,
            )?,
            price_lookup_parallelism: parse(
                &lookup,
                "PRICE_LOOKUP_PARALLELISM",
                DEFAULT_PRICE_LOOKUP_PARALLELISM,
            )?,
            hydration_parallelism: parse(
                &lookup,
                "HYDRATION_PARALLELISM",
                DEFAULT_HYDRATION_PARALLELISM,
            )?,
            hydration_batch_size: parse(
                &lookup,
                "HYDRATION_BATCH_SIZE",
                DEFAULT_HYDRATION_BATCH_SIZE,
            )?,
            reconciliation_max_retries: parse(
                &lookup,
                "RECONCILIATION_MAX_RETRIES",
                DEFAULT_RECONCILIATION_MAX_RETRIES,
            )?,
            use_full_object_index_storing: parse_flag(
                &lookup,
                "USE_FULL_OBJECT_INDEX_STORING",
                DEFAULT_USE_FULL_OBJECT_INDEX_STORING,
            )?,
            use_index_search: parse_flag(&lookup, "USE_INDEX_SEARCH", DEFAULT_USE_INDEX_SEARCH)?,
            index_max_retries: parse(&lookup, "INDEX_MAX_RETRIES", DEFAULT_INDEX_MAX_RETRIES)?,
            index_initial_retry_delay_ms: parse(
                &lookup,
                "INDEX_INITIAL_RETRY_DELAY_MS",
                DEFAULT_INDEX_INITIAL_RETRY_DELAY_MS,
            )?,
            index_max_retry_delay_ms: parse(
                &lookup,
                "INDEX_MAX_RETRY_DELAY_MS",
                DEFAULT_INDEX_MAX_RETRY_DELAY_MS,
            )?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.index_max_retries,
            initial_retry_delay_ms: self.index_initial_retry_delay_ms,
            max_retry_delay_ms: self.index_max_retry_delay_ms,
        }
    }

    pub fn indexing_config(&self) -> IndexingConfig {
        IndexingConfig {
            partition_size: self.partition_size,
            full_rebuild_parallelism: self.full_rebuild_parallelism,
            retry: self.retry_policy(),
            price_lookup: PriceLookupConfig {
                page_size: self.price_lookup_page_size,
                parallelism: self.price_lookup_parallelism,
            },
            store_snapshots: self.use_full_object_index_storing,
            ..Default::default()
        }
    }

    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            retry: self.retry_policy(),
        }
    }

    pub fn browsing_config(&self) -> BrowsingConfig {
        BrowsingConfig {
            hydration_parallelism: self.hydration_parallelism,
            hydration_batch_size: self.hydration_batch_size,
            max_retries: self.reconciliation_max_retries,
            use_snapshots: self.use_full_object_index_storing,
            use_index_search: self.use_index_search,
        }
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::config(format!("{} has an invalid value '{}'", key, raw))),
    }
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|raw| raw.trim().to_lowercase()) {
        None => Ok(default),
        Some(raw) => match raw.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(AppError::config(format!("{} has an invalid value '{}'", key, raw))),
        },
    }
}
