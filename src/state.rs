//! Shared state handed to every handler and middleware.

use std::sync::Arc;

use crate::application::services::{MappingService, RateLimiter};
use crate::domain::expiry_sweeper::SweepStats;
use crate::domain::repositories::MappingRepository;
use crate::infrastructure::cache::CacheService;

#[derive(Clone)]
pub struct AppState {
    pub mapping_service: Arc<MappingService<dyn MappingRepository>>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Same store the mapping service writes to; used for health checks.
    pub repository: Arc<dyn MappingRepository>,
    pub cache: Arc<dyn CacheService>,
    pub sweep_stats: Arc<SweepStats>,
    /// Prefix of returned short URLs, without a trailing slash.
    pub base_url: String,
    /// Take client IPs from proxy headers.
    pub behind_proxy: bool,
}

impl AppState {
    /// Full short URL for `code`.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), code)
    }
}
