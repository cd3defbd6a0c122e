#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration as Days, NaiveDate};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use smartpos_forecast::{
    build_router,
    config::{AppConfig, ForecastingConfig},
    errors::FeedError,
    ml::LookbackWindow,
    models::SalesRecord,
    services::{ForecastingService, ItemCatalog, SalesFeed},
    AppState,
};
use tower::ServiceExt;

/// Sunday 2024-06-30; every test treats this as "today".
pub fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).expect("valid date")
}

/// One record per day for the `quantities.len()` days ending at `end`.
pub fn daily_history(item: &str, end: NaiveDate, quantities: &[u32]) -> Vec<SalesRecord> {
    let n = quantities.len() as i64;
    quantities
        .iter()
        .enumerate()
        .map(|(i, &qty)| {
            let date = end - Days::days(n - 1 - i as i64);
            SalesRecord::new(item, date, qty, Decimal::from(qty) * Decimal::from(10))
        })
        .collect()
}

/// `count` records spaced `every` days apart, most recent on `end`.
pub fn spaced_history(
    item: &str,
    end: NaiveDate,
    count: usize,
    every: i64,
    quantity: impl Fn(usize) -> u32,
) -> Vec<SalesRecord> {
    (0..count)
        .rev()
        .map(|i| {
            let date = end - Days::days(i as i64 * every);
            let qty = quantity(count - 1 - i);
            SalesRecord::new(item, date, qty, Decimal::from(qty))
        })
        .collect()
}

/// Scriptable feed: fixed records per item, injectable failures and delays.
#[derive(Default)]
pub struct FixtureFeed {
    records: HashMap<String, Vec<SalesRecord>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    active: Vec<String>,
    catalog_down: bool,
    fetches: Mutex<Vec<(String, u32)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FixtureFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, records: Vec<SalesRecord>) -> Self {
        for record in records {
            self.records
                .entry(record.item_id().to_string())
                .or_default()
                .push(record);
        }
        self
    }

    pub fn failing_for(mut self, item: &str) -> Self {
        self.failing.insert(item.to_string());
        self
    }

    pub fn slow_for(mut self, item: &str, delay: Duration) -> Self {
        self.delays.insert(item.to_string(), delay);
        self
    }

    pub fn slow_everywhere(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn with_active_items(mut self, items: &[&str]) -> Self {
        self.active = items.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_catalog_down(mut self) -> Self {
        self.catalog_down = true;
        self
    }

    /// `(item, lookback days)` for every fetch, in call order.
    pub fn fetches(&self) -> Vec<(String, u32)> {
        self.fetches.lock().expect("fetch log poisoned").clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SalesFeed for FixtureFeed {
    async fn fetch(
        &self,
        item: Option<&str>,
        window: LookbackWindow,
    ) -> Result<Vec<SalesRecord>, FeedError> {
        let name = item.unwrap_or("*").to_string();
        self.fetches
            .lock()
            .expect("fetch log poisoned")
            .push((name.clone(), window.days));

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&name).copied().or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&name) {
            return Err(FeedError::Unavailable(format!("no route to history for {name}")));
        }

        let mut rows: Vec<SalesRecord> = self
            .records
            .iter()
            .filter(|(key, _)| item.map_or(true, |wanted| wanted == key.as_str()))
            .flat_map(|(_, rows)| rows.iter())
            .filter(|r| window.contains(r.date()))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.date());
        Ok(rows)
    }
}

#[async_trait]
impl ItemCatalog for FixtureFeed {
    async fn active_items(&self) -> Result<Vec<String>, FeedError> {
        if self.catalog_down {
            return Err(FeedError::Unavailable("menu service down".into()));
        }
        Ok(self.active.clone())
    }
}

pub fn forecasting_config() -> ForecastingConfig {
    ForecastingConfig {
        feed_timeout_ms: 500,
        ..ForecastingConfig::default()
    }
}

pub fn service(feed: Arc<FixtureFeed>) -> ForecastingService {
    service_with(feed, forecasting_config())
}

pub fn service_with(feed: Arc<FixtureFeed>, config: ForecastingConfig) -> ForecastingService {
    ForecastingService::new(feed.clone(), feed, config).with_reference_date(reference_date())
}

/// Router over a fixture feed, for request-level tests.
pub struct TestApp {
    router: Router,
    pub feed: Arc<FixtureFeed>,
}

impl TestApp {
    pub fn new(feed: FixtureFeed) -> Self {
        let feed = Arc::new(feed);
        let config = AppConfig {
            forecasting: forecasting_config(),
            ..AppConfig::default()
        };
        let state = AppState::new(config, feed.clone(), feed.clone())
            .with_reference_date(reference_date());
        Self {
            router: build_router(state),
            feed,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("valid request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("readable body")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}
