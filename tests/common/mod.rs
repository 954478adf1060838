#![allow(dead_code)]

use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use expiring_shortener::api::routes::{read_routes, write_routes};
use expiring_shortener::application::services::{
    FailurePolicy, MappingService, MappingSettings, RateLimiter,
};
use expiring_shortener::domain::clock::{Clock, ManualClock, SystemClock};
use expiring_shortener::domain::entities::Mapping;
use expiring_shortener::domain::expiry_sweeper::SweepStats;
use expiring_shortener::domain::repositories::MappingRepository;
use expiring_shortener::infrastructure::cache::{CacheService, MemoryCache, NullCache};
use expiring_shortener::infrastructure::persistence::{
    InMemoryMappingRepository, PgMappingRepository,
};
use expiring_shortener::infrastructure::rate_limit::{Bandwidth, MemoryBucketStore};
use expiring_shortener::state::AppState;
use expiring_shortener::utils::CodeGenerator;

pub const BASE_URL: &str = "https://sho.rt";

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// Limits generous enough that tests not about rate limiting never hit them.
pub fn relaxed_limits() -> Vec<Bandwidth> {
    RateLimiter::sustained_and_burst(
        1_000,
        Duration::from_secs(60),
        1_000,
        Duration::from_secs(1),
    )
}

/// Application state over in-process backends with a controllable clock.
pub struct TestApp {
    pub state: AppState,
    pub clock: ManualClock,
    pub repository: Arc<InMemoryMappingRepository>,
    pub cache: Arc<MemoryCache>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Stores a mapping directly, bypassing the service.
    pub async fn insert(&self, code: &str, long_url: &str, expires_at: Option<DateTime<Utc>>) {
        let mapping = Mapping::new(
            code.to_string(),
            long_url.to_string(),
            self.clock.now(),
            expires_at,
        );
        self.repository.save(mapping).await.unwrap();
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with_limits(relaxed_limits(), false)
}

pub fn create_test_app_with_limits(limits: Vec<Bandwidth>, behind_proxy: bool) -> TestApp {
    let clock = ManualClock::new(base_time());
    let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());

    let repository = Arc::new(InMemoryMappingRepository::new());
    let cache = Arc::new(MemoryCache::new());

    let store: Arc<dyn MappingRepository> = repository.clone();
    let cache_service: Arc<dyn CacheService> = cache.clone();

    let state = build_state(
        store,
        cache_service,
        Arc::clone(&shared_clock),
        Arc::new(RateLimiter::new(
            Arc::new(MemoryBucketStore::new(shared_clock)),
            limits,
            FailurePolicy::Closed,
            Duration::from_millis(500),
        )),
        behind_proxy,
    );

    TestApp {
        state,
        clock,
        repository,
        cache,
    }
}

/// Application state over PostgreSQL, without a cache.
pub fn create_pg_state(pool: PgPool) -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn MappingRepository> = Arc::new(PgMappingRepository::new(Arc::new(pool)));

    build_state(
        store,
        Arc::new(NullCache::new()),
        Arc::clone(&clock),
        Arc::new(RateLimiter::new(
            Arc::new(MemoryBucketStore::new(clock)),
            relaxed_limits(),
            FailurePolicy::Closed,
            Duration::from_secs(1),
        )),
        false,
    )
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(write_routes(state.clone()))
        .merge(read_routes())
        .with_state(state)
}

fn build_state(
    repository: Arc<dyn MappingRepository>,
    cache: Arc<dyn CacheService>,
    clock: Arc<dyn Clock>,
    rate_limiter: Arc<RateLimiter>,
    behind_proxy: bool,
) -> AppState {
    let settings = MappingSettings {
        dependency_timeout: Duration::from_secs(1),
        ..MappingSettings::default()
    };

    let mapping_service = Arc::new(MappingService::new(
        Arc::clone(&repository),
        Arc::clone(&cache),
        CodeGenerator::new(0, 16),
        clock,
        settings,
    ));

    AppState {
        mapping_service,
        rate_limiter,
        repository,
        cache,
        sweep_stats: Arc::new(SweepStats::default()),
        base_url: BASE_URL.to_string(),
        behind_proxy,
    }
}
