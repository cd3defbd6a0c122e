use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::{
    errors::ServiceError,
    models::SalesRecord,
    services::{
        insights::{HourlyBreakdown, PeakPeriod, WasteReport, WeekdayTrend},
        Forecast, ForecastOutcome,
    },
    ApiResponse, AppState,
};

const DEFAULT_SALES_DAYS: i64 = 30;
const MAX_SALES_DAYS: i64 = 365;
const DEFAULT_PEAK_DAYS: u32 = 7;

/// Build the forecasting Router scoped under `/api/v1/analytics/ml`.
pub fn ml_routes() -> Router<AppState> {
    Router::new()
        .route("/predict-demand", get(predict_demand))
        .route("/advanced-prediction", get(advanced_prediction))
        .route("/peak-hours", get(peak_hours))
        .route("/peak-hours/items", get(item_peak_hours))
        .route("/waste-reduction", get(waste_reduction))
        .route("/sales-data", get(sales_data))
        .route("/daily-trends", get(daily_trends))
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
    pub item_name: Option<String>,
}

impl ItemQuery {
    fn item(&self) -> Option<&str> {
        self.item_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Query parameters for raw sales data
#[derive(Debug, Deserialize)]
pub struct SalesDataQuery {
    /// Number of days to look back (default: 30)
    pub days_back: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PeakHoursQuery {
    pub item_name: Option<String>,
    pub days_back: Option<u32>,
}

/// Demand forecast for one item, or every active item when `item_name` is absent.
///
/// A feed failure for a requested item is a 503; in a batch it stays a
/// per-item `feed_error` entry.
pub async fn predict_demand(
    State(state): State<AppState>,
    Query(params): Query<ItemQuery>,
) -> Result<Json<ApiResponse<Forecast>>, ServiceError> {
    let forecast = state.forecasting.predict(params.item()).await?;
    if let Forecast::Single(outcome) = &forecast {
        if let Some(error) = outcome.feed_error() {
            return Err(ServiceError::Feed(error.clone()));
        }
    }
    Ok(Json(ApiResponse::success(forecast)))
}

/// Random-forest forecast for one item
pub async fn advanced_prediction(
    State(state): State<AppState>,
    Query(params): Query<ItemQuery>,
) -> Result<Json<ApiResponse<ForecastOutcome>>, ServiceError> {
    let item = params
        .item()
        .ok_or_else(|| ServiceError::ValidationError("item_name is required".to_string()))?;

    let outcome = state.forecasting.predict_advanced(item).await;
    if let Some(error) = outcome.feed_error() {
        return Err(ServiceError::Feed(error.clone()));
    }
    Ok(Json(ApiResponse::success(outcome)))
}

/// Morning, lunch and evening rush intensity
pub async fn peak_hours(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PeakPeriod>>>, ServiceError> {
    let periods = state.insights.peak_hours_analysis().await?;
    Ok(Json(ApiResponse::success(periods)))
}

/// Busiest selling hours per item
pub async fn item_peak_hours(
    State(state): State<AppState>,
    Query(params): Query<PeakHoursQuery>,
) -> Result<Json<ApiResponse<BTreeMap<String, Vec<HourlyBreakdown>>>>, ServiceError> {
    let days = params.days_back.unwrap_or(DEFAULT_PEAK_DAYS);
    if days == 0 || i64::from(days) > MAX_SALES_DAYS {
        return Err(ServiceError::ValidationError(
            "days_back must be between 1 and 365".to_string(),
        ));
    }
    let item = params.item_name.as_deref().filter(|name| !name.is_empty());
    let peaks = state.insights.peak_hours(item, days).await?;
    Ok(Json(ApiResponse::success(peaks)))
}

pub async fn waste_reduction(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<WasteReport>>, ServiceError> {
    let report = state.insights.waste_reduction_tips().await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Daily sales records for every item
pub async fn sales_data(
    State(state): State<AppState>,
    Query(params): Query<SalesDataQuery>,
) -> Result<Json<ApiResponse<Vec<SalesRecord>>>, ServiceError> {
    let days = params.days_back.unwrap_or(DEFAULT_SALES_DAYS);

    if days <= 0 || days > MAX_SALES_DAYS {
        return Err(ServiceError::ValidationError(
            "days_back must be between 1 and 365".to_string(),
        ));
    }

    let records = state.insights.sales_data(days as u32).await?;
    Ok(Json(ApiResponse::success(records)))
}

/// Weekday sales pattern per item
pub async fn daily_trends(
    State(state): State<AppState>,
    Query(params): Query<ItemQuery>,
) -> Result<Json<ApiResponse<BTreeMap<String, Vec<WeekdayTrend>>>>, ServiceError> {
    let trends = state.insights.daily_trends(params.item()).await?;
    Ok(Json(ApiResponse::success(trends)))
}
