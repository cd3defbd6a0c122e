use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    confidence::ModelKind,
    features::TrainingSet,
    linear_regression::LinearRegression,
    random_forest::{RandomForestConfig, RandomForestRegressor},
    ModelError, Regressor,
};

/// Forecasting mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// OLS on `[day_of_week, is_weekend]`
    Simple,
    /// Bagged trees on the rolling-average augmented features
    Advanced,
}

impl Tier {
    /// Fewest training rows the tier will fit on.
    pub fn min_rows(self) -> usize {
        match self {
            Tier::Simple => 7,
            Tier::Advanced => 14,
        }
    }

    /// History pulled for the tier when the caller does not configure one.
    pub fn default_lookback_days(self) -> u32 {
        match self {
            Tier::Simple => 60,
            Tier::Advanced => 90,
        }
    }

    pub fn model_kind(self) -> ModelKind {
        match self {
            Tier::Simple => ModelKind::LinearRegression,
            Tier::Advanced => ModelKind::RandomForest,
        }
    }

    pub fn is_advanced(self) -> bool {
        matches!(self, Tier::Advanced)
    }
}

/// Fits the tier's model on `training` and predicts the quantity sold on
/// `target_date`.
///
/// Returns `InsufficientRows` when the tier's minimum is not met; the caller
/// decides whether to downgrade or fall back to a baseline.
pub fn fit_and_predict(
    training: &TrainingSet,
    target_date: NaiveDate,
    tier: Tier,
) -> Result<u32, ModelError> {
    if training.len() < tier.min_rows() {
        return Err(ModelError::InsufficientRows {
            required: tier.min_rows(),
            available: training.len(),
        });
    }

    let raw = match tier {
        Tier::Simple => {
            let mut model = LinearRegression::new();
            model.fit(&training.base_matrix(), training.targets())?;
            let row = super::features::base_features(target_date);
            model.predict(&row)?
        }
        Tier::Advanced => {
            let mut model = RandomForestRegressor::new(RandomForestConfig::default());
            model.fit(&training.enhanced_matrix(), training.targets())?;
            model.predict(&training.prediction_row(target_date))?
        }
    };

    clamp_quantity(raw)
}

/// `max(0, round(value))` as a unit count.
pub fn clamp_quantity(value: f64) -> Result<u32, ModelError> {
    if !value.is_finite() {
        return Err(ModelError::NonFinite);
    }
    Ok(value.round().clamp(0.0, f64::from(u32::MAX)) as u32)
}
