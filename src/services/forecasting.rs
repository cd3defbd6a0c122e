use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use futures::{stream, StreamExt};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::ForecastingConfig,
    errors::FeedError,
    ml::{
        confidence_for, fit_and_predict, BaselineTable, FeatureBuilder, LookbackWindow,
        PredictionResult, Tier,
    },
    models::SalesRecord,
    services::feed::{ItemCatalog, SalesFeed},
};

/// Why a baseline was returned instead of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    /// The item has no sales in the lookback window
    NoHistory,
    /// Fewer rows than the simple tier's minimum
    InsufficientHistory { samples: usize },
    /// The regression could not be fitted on the rows available
    ModelFitFailure { detail: String },
}

/// Result of forecasting one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastOutcome {
    Predicted {
        #[serde(flatten)]
        prediction: PredictionResult,
    },
    Fallback {
        #[serde(flatten)]
        prediction: PredictionResult,
        reason: FallbackReason,
    },
    FeedError {
        item: String,
        error: FeedError,
    },
}

impl ForecastOutcome {
    pub fn item(&self) -> &str {
        match self {
            Self::Predicted { prediction } | Self::Fallback { prediction, .. } => &prediction.item,
            Self::FeedError { item, .. } => item,
        }
    }

    /// The prediction, unless the feed failed.
    pub fn prediction(&self) -> Option<&PredictionResult> {
        match self {
            Self::Predicted { prediction } | Self::Fallback { prediction, .. } => Some(prediction),
            Self::FeedError { .. } => None,
        }
    }

    pub fn feed_error(&self) -> Option<&FeedError> {
        match self {
            Self::FeedError { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Either one item's outcome or the whole active menu's.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Forecast {
    Single(ForecastOutcome),
    Batch(Vec<ForecastOutcome>),
}

enum TierAttempt {
    Fitted(PredictionResult),
    Unfit(FallbackReason),
}

/// Entry point for demand forecasting.
///
/// Stateless between calls: each prediction pulls fresh history from the
/// injected feed and refits.
#[derive(Clone)]
pub struct ForecastingService {
    feed: Arc<dyn SalesFeed>,
    catalog: Arc<dyn ItemCatalog>,
    config: ForecastingConfig,
    baselines: Arc<BaselineTable>,
    builder: FeatureBuilder,
    reference_date: Option<NaiveDate>,
}

impl ForecastingService {
    pub fn new(
        feed: Arc<dyn SalesFeed>,
        catalog: Arc<dyn ItemCatalog>,
        config: ForecastingConfig,
    ) -> Self {
        let baselines = Arc::new(BaselineTable::with_overrides(&config.baseline_overrides));
        Self {
            feed,
            catalog,
            config,
            baselines,
            builder: FeatureBuilder::new(),
            reference_date: None,
        }
    }

    /// Pins "today"; history windows end here and horizons count from here.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn config(&self) -> &ForecastingConfig {
        &self.config
    }

    /// Forecast for `item_id`, or for every active item when `None`.
    pub async fn predict(&self, item_id: Option<&str>) -> Result<Forecast, FeedError> {
        match item_id {
            Some(item) => Ok(Forecast::Single(
                self.predict_one(item, self.config.default_horizon_days, false)
                    .await,
            )),
            None => {
                let items = self.active_items().await?;
                Ok(Forecast::Batch(self.predict_all(&items).await))
            }
        }
    }

    /// Advanced-tier forecast, degrading to the simple tier when history is short.
    pub async fn predict_advanced(&self, item_id: &str) -> ForecastOutcome {
        self.predict_one(item_id, self.config.default_horizon_days, true)
            .await
    }

    /// Forecast `horizon_days` ahead for one item. Never fails on missing
    /// data; only an unreachable feed yields [`ForecastOutcome::FeedError`].
    #[instrument(skip(self))]
    pub async fn predict_one(
        &self,
        item_id: &str,
        horizon_days: u32,
        advanced: bool,
    ) -> ForecastOutcome {
        match self.try_predict(item_id, horizon_days, advanced).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(item = item_id, %error, "Sales feed failed during forecast");
                ForecastOutcome::FeedError {
                    item: item_id.to_string(),
                    error,
                }
            }
        }
    }

    /// Simple-tier forecasts for `items`, in the same order. Items are
    /// independent; one item's feed failure only affects its own entry.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn predict_all(&self, items: &[String]) -> Vec<ForecastOutcome> {
        let horizon = self.config.default_horizon_days;
        // Futures are lazy, so only `buffered` decides how many run at once.
        let pending: Vec<_> = items
            .iter()
            .map(|item| self.predict_one(item, horizon, false))
            .collect();
        let outcomes: Vec<ForecastOutcome> = stream::iter(pending)
            .buffered(self.config.max_concurrent_predictions.max(1))
            .collect()
            .await;

        let failed = outcomes.iter().filter(|o| o.feed_error().is_some()).count();
        info!(total = outcomes.len(), failed, "Batch forecast complete");
        outcomes
    }

    async fn try_predict(
        &self,
        item_id: &str,
        horizon_days: u32,
        advanced: bool,
    ) -> Result<ForecastOutcome, FeedError> {
        if advanced {
            match self.attempt(item_id, horizon_days, Tier::Advanced).await? {
                TierAttempt::Fitted(prediction) => {
                    return Ok(ForecastOutcome::Predicted { prediction })
                }
                TierAttempt::Unfit(reason) => {
                    debug!(item = item_id, ?reason, "Advanced tier unavailable, using simple tier");
                }
            }
        }

        Ok(match self.attempt(item_id, horizon_days, Tier::Simple).await? {
            TierAttempt::Fitted(prediction) => ForecastOutcome::Predicted { prediction },
            TierAttempt::Unfit(reason) => {
                debug!(item = item_id, ?reason, "Falling back to baseline");
                ForecastOutcome::Fallback {
                    prediction: self.baselines.prediction(item_id),
                    reason,
                }
            }
        })
    }

    async fn attempt(
        &self,
        item_id: &str,
        horizon_days: u32,
        tier: Tier,
    ) -> Result<TierAttempt, FeedError> {
        let window = LookbackWindow::new(self.reference_date(), self.lookback_days(tier));
        let history = self.fetch_history(item_id, window).await?;

        let Some(training) = self.builder.build(item_id, &history, window) else {
            return Ok(TierAttempt::Unfit(FallbackReason::NoHistory));
        };
        let samples = training.len();
        if samples < tier.min_rows() {
            return Ok(TierAttempt::Unfit(FallbackReason::InsufficientHistory {
                samples,
            }));
        }

        let target_date = self.reference_date() + Duration::days(i64::from(horizon_days));
        match fit_and_predict(&training, target_date, tier) {
            Ok(quantity) => {
                info!(
                    item = item_id,
                    samples,
                    model = ?tier.model_kind(),
                    predicted = quantity,
                    "Demand forecast fitted"
                );
                Ok(TierAttempt::Fitted(PredictionResult {
                    item: item_id.to_string(),
                    predicted_quantity: quantity,
                    confidence: confidence_for(samples, tier.is_advanced()),
                    model_used: tier.model_kind(),
                    training_samples: samples,
                }))
            }
            Err(err) => {
                warn!(item = item_id, samples, error = %err, "Model fit failed");
                Ok(TierAttempt::Unfit(FallbackReason::ModelFitFailure {
                    detail: err.to_string(),
                }))
            }
        }
    }

    fn lookback_days(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Simple => self.config.simple_lookback_days,
            Tier::Advanced => self.config.advanced_lookback_days,
        }
    }

    async fn fetch_history(
        &self,
        item_id: &str,
        window: LookbackWindow,
    ) -> Result<Vec<SalesRecord>, FeedError> {
        let timeout = self.config.feed_timeout();
        match tokio::time::timeout(timeout, self.feed.fetch(Some(item_id), window)).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout {
                after_ms: self.config.feed_timeout_ms,
            }),
        }
    }

    async fn active_items(&self) -> Result<Vec<String>, FeedError> {
        let timeout = self.config.feed_timeout();
        match tokio::time::timeout(timeout, self.catalog.active_items()).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout {
                after_ms: self.config.feed_timeout_ms,
            }),
        }
    }
}
