//! SmartPOS Forecast Library
//!
//! Demand forecasting and sales analytics for a point-of-sale backend.
//! History comes from a [`services::SalesFeed`]; forecasts are fitted per
//! request and never persisted.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod errors;
pub mod handlers;
pub mod ml;
pub mod models;
pub mod services;

use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use services::{ForecastingService, InsightsService, ItemCatalog, SalesFeed};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub forecasting: ForecastingService,
    pub insights: InsightsService,
    pub catalog: Arc<dyn ItemCatalog>,
}

impl AppState {
    pub fn new(
        config: config::AppConfig,
        feed: Arc<dyn SalesFeed>,
        catalog: Arc<dyn ItemCatalog>,
    ) -> Self {
        let forecasting =
            ForecastingService::new(feed.clone(), catalog.clone(), config.forecasting.clone());
        let insights = InsightsService::new(feed);
        Self {
            config,
            forecasting,
            insights,
            catalog,
        }
    }

    /// Pins "today" for every service.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.forecasting = self.forecasting.with_reference_date(date);
        self.insights = self.insights.with_reference_date(date);
        self
    }
}

// Common response wrappers
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// HTTP surface: forecasting routes under `/api/v1/analytics/ml` plus a
/// top-level `/health`.
pub fn build_router(state: AppState) -> Router {
    let ml = handlers::analytics::ml_routes().merge(handlers::health::health_routes());

    Router::new()
        .nest("/api/v1/analytics/ml", ml)
        .merge(handlers::health::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
