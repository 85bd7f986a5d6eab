/// Configuration for the browsing service.
#[derive(Debug, Clone)]
pub struct BrowsingConfig {
    /// Maximum number of snapshot decodes or store fetches in flight.
    pub hydration_parallelism: usize,
    /// Entity ids per store fetch.
    pub hydration_batch_size: usize,
    /// Additional searches allowed when index references do not resolve.
    pub max_retries: usize,
    /// Hydrate from the `__object` snapshot when a reference carries one.
    pub use_snapshots: bool,
    /// Serve searches from the index. When off, pages come straight from the
    /// entity store and carry no aggregations.
    pub use_index_search: bool,
}

impl Default for BrowsingConfig {
    fn default() -> Self {
        Self {
            hydration_parallelism: 5,
            hydration_batch_size: 50,
            max_retries: 3,
            use_snapshots: false,
            use_index_search: true,
        }
    }
}
