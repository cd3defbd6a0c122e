/*!
 * # Machine Learning Module
 *
 * Demand forecasting for the point-of-sale menu. Every prediction retrains
 * from freshly pulled history; nothing here keeps state between calls.
 *
 * Layering, leaves first: `features` builds the training matrix,
 * `linear_regression` and `random_forest` are the two regressors,
 * `forecasting` picks a tier and produces a quantity, `confidence` labels
 * the result and supplies baselines when no model can be fitted.
 */

use serde::Serialize;
use thiserror::Error;

/// Per-day feature engineering for a single item
pub mod features;

/// Ordinary least squares regression
pub mod linear_regression;

/// Bagged regression trees
pub mod random_forest;

/// Confidence labels and static baselines
pub mod confidence;

/// Tier selection and next-period prediction
pub mod forecasting;

pub use confidence::{confidence_for, BaselineTable, Confidence, ModelKind};
pub use features::{FeatureBuilder, LookbackWindow, TrainingSet};
pub use forecasting::{fit_and_predict, Tier};

/// Numeric failures while fitting or evaluating a model.
///
/// Callers never surface these directly: the forecasting service turns them
/// into a tier downgrade or a baseline prediction.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("insufficient training rows: need {required}, have {available}")]
    InsufficientRows { required: usize, available: usize },

    #[error("training data is empty")]
    EmptyInput,

    #[error("expected {expected} features, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("training data contains non-finite values")]
    NonFinite,

    #[error("model has not been fitted")]
    NotFitted,
}

/// Common interface for the regressors used by the forecasting tiers
pub trait Regressor {
    /// Fit the model to a feature matrix and target vector
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<(), ModelError>;

    /// Predict the target for a single feature row
    fn predict(&self, row: &[f64]) -> Result<f64, ModelError>;
}

/// Forecast for one menu item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub item: String,
    pub predicted_quantity: u32,
    pub confidence: Confidence,
    #[serde(rename = "model")]
    pub model_used: ModelKind,
    pub training_samples: usize,
}

/// Shape checks shared by both regressors.
pub(crate) fn validate_training_data(
    features: &[Vec<f64>],
    targets: &[f64],
) -> Result<usize, ModelError> {
    let width = match features.first() {
        Some(row) if !row.is_empty() => row.len(),
        _ => return Err(ModelError::EmptyInput),
    };
    if features.len() != targets.len() {
        return Err(ModelError::DimensionMismatch {
            expected: features.len(),
            found: targets.len(),
        });
    }
    for row in features {
        if row.len() != width {
            return Err(ModelError::DimensionMismatch {
                expected: width,
                found: row.len(),
            });
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite);
        }
    }
    if targets.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::NonFinite);
    }
    Ok(width)
}
