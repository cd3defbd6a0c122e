use chrono::{Duration, NaiveDate};

use crate::models::sales_record::{is_weekend_day, iso_day_of_week, SalesRecord};

/// Rows needed before the rolling-average column is added.
pub const ROLLING_AVERAGE_MIN_ROWS: usize = 8;

/// Width of the trailing rolling-average window, in rows.
pub const ROLLING_WINDOW: usize = 7;

/// The `days` calendar days ending at (and including) `end`: `(end - days, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    pub end: NaiveDate,
    pub days: u32,
}

impl LookbackWindow {
    pub fn new(end: NaiveDate, days: u32) -> Self {
        Self { end, days }
    }

    /// First day inside the window.
    pub fn start(&self) -> NaiveDate {
        self.end - Duration::days(i64::from(self.days)) + Duration::days(1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date <= self.end
    }
}

/// `[day_of_week, is_weekend]` for a calendar date.
pub fn base_features(date: NaiveDate) -> [f64; 2] {
    let day_of_week = iso_day_of_week(date);
    [
        f64::from(day_of_week),
        if is_weekend_day(day_of_week) { 1.0 } else { 0.0 },
    ]
}

/// Feature matrix and targets for one item, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    item_id: String,
    base: Vec<[f64; 2]>,
    rolling_average: Option<Vec<f64>>,
    targets: Vec<f64>,
}

impl TrainingSet {
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    pub fn rolling_average(&self) -> Option<&[f64]> {
        self.rolling_average.as_deref()
    }

    /// Two-column `[day_of_week, is_weekend]` matrix.
    pub fn base_matrix(&self) -> Vec<Vec<f64>> {
        self.base.iter().map(|row| row.to_vec()).collect()
    }

    /// Base matrix with the rolling-average column appended when present.
    pub fn enhanced_matrix(&self) -> Vec<Vec<f64>> {
        match &self.rolling_average {
            Some(rolling) => self
                .base
                .iter()
                .zip(rolling)
                .map(|(row, avg)| vec![row[0], row[1], *avg])
                .collect(),
            None => self.base_matrix(),
        }
    }

    /// Mean of the last seven targets, or of all of them when fewer exist.
    pub fn recent_average(&self) -> f64 {
        let tail = &self.targets[self.targets.len().saturating_sub(ROLLING_WINDOW)..];
        mean(tail)
    }

    /// Prediction row for `date` shaped like [`Self::enhanced_matrix`].
    pub fn prediction_row(&self, date: NaiveDate) -> Vec<f64> {
        let mut row = base_features(date).to_vec();
        if self.rolling_average.is_some() {
            row.push(self.recent_average());
        }
        row
    }
}

/// Turns raw sales history into a [`TrainingSet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds the training set for `item_id` from the records that fall in
    /// `window`. Returns `None` when no record matches.
    pub fn build(
        &self,
        item_id: &str,
        records: &[SalesRecord],
        window: LookbackWindow,
    ) -> Option<TrainingSet> {
        let mut matching: Vec<&SalesRecord> = records
            .iter()
            .filter(|r| r.item_id() == item_id && window.contains(r.date()))
            .collect();
        if matching.is_empty() {
            return None;
        }
        matching.sort_by_key(|r| r.date());

        // Derived from the date, exactly as the prediction row is.
        let base: Vec<[f64; 2]> = matching.iter().map(|r| base_features(r.date())).collect();
        let targets: Vec<f64> = matching.iter().map(|r| f64::from(r.quantity())).collect();
        let rolling_average = (targets.len() >= ROLLING_AVERAGE_MIN_ROWS)
            .then(|| trailing_mean(&targets, ROLLING_WINDOW));

        Some(TrainingSet {
            item_id: item_id.to_string(),
            base,
            rolling_average,
            targets,
        })
    }
}

/// Mean over each value and up to `window - 1` values before it.
/// Later values never contribute to an earlier position.
pub fn trailing_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| mean(&values[(i + 1).saturating_sub(window)..=i]))
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
