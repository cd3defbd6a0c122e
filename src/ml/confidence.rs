use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::PredictionResult;

/// Sample size at which a prediction stops being `low` confidence.
pub const MEDIUM_CONFIDENCE_SAMPLES: usize = 7;

/// Sample size at which an advanced prediction becomes `high` confidence.
pub const HIGH_CONFIDENCE_SAMPLES: usize = 30;

/// Quantity predicted for items missing from the baseline table.
pub const GENERIC_BASELINE_QUANTITY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Baseline,
    LinearRegression,
    RandomForest,
}

/// Confidence label for a model fitted on `sample_size` rows.
pub fn confidence_for(sample_size: usize, advanced: bool) -> Confidence {
    if sample_size < MEDIUM_CONFIDENCE_SAMPLES {
        Confidence::Low
    } else if sample_size < HIGH_CONFIDENCE_SAMPLES || !advanced {
        Confidence::Medium
    } else {
        Confidence::High
    }
}

/// Static per-item quantities used when no model can be fitted.
///
/// Item names match case-insensitively, so an override for "vada pav"
/// also covers "Vada Pav".
#[derive(Debug, Clone)]
pub struct BaselineTable {
    quantities: HashMap<String, u32>,
    default_quantity: u32,
}

impl Default for BaselineTable {
    fn default() -> Self {
        let quantities = [
            ("Tea", 20),
            ("Coffee", 15),
            ("Samosa", 10),
            ("Biscuit", 8),
            ("Snack", 12),
        ]
        .into_iter()
        .map(|(name, qty)| (name.to_lowercase(), qty))
        .collect();
        Self {
            quantities,
            default_quantity: GENERIC_BASELINE_QUANTITY,
        }
    }
}

impl BaselineTable {
    /// Default table with `overrides` layered on top.
    pub fn with_overrides(overrides: &HashMap<String, u32>) -> Self {
        let mut table = Self::default();
        table
            .quantities
            .extend(overrides.iter().map(|(k, v)| (k.to_lowercase(), *v)));
        table
    }

    pub fn quantity(&self, item: &str) -> u32 {
        self.quantities
            .get(&item.to_lowercase())
            .copied()
            .unwrap_or(self.default_quantity)
    }

    pub fn prediction(&self, item: &str) -> PredictionResult {
        PredictionResult {
            item: item.to_string(),
            predicted_quantity: self.quantity(item),
            confidence: Confidence::Low,
            model_used: ModelKind::Baseline,
            training_samples: 0,
        }
    }
}
