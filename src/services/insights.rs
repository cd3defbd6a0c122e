use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::{
    errors::ServiceError,
    ml::LookbackWindow,
    models::{sales_record::weekday_name, SalesRecord},
    services::feed::SalesFeed,
};

/// History used for the day-part analysis.
pub const PEAK_ANALYSIS_DAYS: u32 = 30;

/// History used for weekday trends.
pub const TRENDS_LOOKBACK_DAYS: u32 = 365;

/// Window inspected for slow movers.
pub const WASTE_LOOKBACK_DAYS: u32 = 7;

/// Weekly units below which an item is flagged as a slow mover.
pub const SLOW_MOVER_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    /// Relative to the busiest day part.
    fn from_share(share: f64) -> Self {
        if share >= 0.75 {
            Intensity::High
        } else if share >= 0.4 {
            Intensity::Medium
        } else {
            Intensity::Low
        }
    }
}

struct DayPart {
    period: &'static str,
    hours: &'static str,
    /// `[start, end)` in hours
    span: (u32, u32),
    reason: &'static str,
    typical: Intensity,
}

const DAY_PARTS: [DayPart; 3] = [
    DayPart {
        period: "Morning",
        hours: "6-9 AM",
        span: (6, 9),
        reason: "Breakfast rush",
        typical: Intensity::High,
    },
    DayPart {
        period: "Lunch",
        hours: "12-2 PM",
        span: (12, 14),
        reason: "Office lunch breaks",
        typical: Intensity::Medium,
    },
    DayPart {
        period: "Evening",
        hours: "5-8 PM",
        span: (17, 20),
        reason: "Evening snacks time",
        typical: Intensity::High,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakPeriod {
    pub period: String,
    pub hours: String,
    pub intensity: Intensity,
    /// `None` for the static profile used before any sales are recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units_sold: Option<u32>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyBreakdown {
    pub hour: u32,
    pub quantity: u32,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayTrend {
    pub day: &'static str,
    pub quantity: u32,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WasteAlert {
    pub item: String,
    pub weekly_sales: u32,
    pub suggestion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WasteReport {
    pub tips: Vec<String>,
    pub alerts: Vec<WasteAlert>,
}

/// Descriptive sales analytics over the same feed the forecaster reads.
#[derive(Clone)]
pub struct InsightsService {
    feed: Arc<dyn SalesFeed>,
    reference_date: Option<NaiveDate>,
}

impl InsightsService {
    pub fn new(feed: Arc<dyn SalesFeed>) -> Self {
        Self {
            feed,
            reference_date: None,
        }
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn window(&self, days: u32) -> LookbackWindow {
        let end = self
            .reference_date
            .unwrap_or_else(|| Utc::now().date_naive());
        LookbackWindow::new(end, days)
    }

    /// Daily records for every item over the last `days_back` days.
    pub async fn sales_data(&self, days_back: u32) -> Result<Vec<SalesRecord>, ServiceError> {
        let records = self.feed.fetch(None, self.window(days_back)).await?;
        info!(days_back, records = records.len(), "Fetched sales data");
        Ok(records)
    }

    /// Units and revenue per weekday, Monday first, for each item.
    #[instrument(skip(self))]
    pub async fn daily_trends(
        &self,
        item: Option<&str>,
    ) -> Result<BTreeMap<String, Vec<WeekdayTrend>>, ServiceError> {
        let records = self
            .feed
            .fetch(item, self.window(TRENDS_LOOKBACK_DAYS))
            .await?;

        let mut totals: BTreeMap<String, [(u32, Decimal); 7]> = BTreeMap::new();
        for record in &records {
            let days = totals
                .entry(record.item_id().to_string())
                .or_insert([(0, Decimal::ZERO); 7]);
            let Some(slot) = usize::from(record.day_of_week())
                .checked_sub(1)
                .and_then(|index| days.get_mut(index))
            else {
                continue;
            };
            slot.0 = slot.0.saturating_add(record.quantity());
            slot.1 += record.revenue();
        }

        Ok(totals
            .into_iter()
            .map(|(name, days)| {
                let trends = (1..=7u8)
                    .zip(days)
                    .filter(|(_, (quantity, _))| *quantity > 0)
                    .map(|(dow, (quantity, revenue))| WeekdayTrend {
                        day: weekday_name(dow),
                        quantity,
                        revenue,
                    })
                    .collect();
                (name, trends)
            })
            .collect())
    }

    /// Selling hours per item, busiest first.
    #[instrument(skip(self))]
    pub async fn peak_hours(
        &self,
        item: Option<&str>,
        days_back: u32,
    ) -> Result<BTreeMap<String, Vec<HourlyBreakdown>>, ServiceError> {
        let hourly = self.feed.fetch_hourly(self.window(days_back)).await?;

        let mut by_item: BTreeMap<String, Vec<HourlyBreakdown>> = BTreeMap::new();
        for row in hourly {
            if item.map_or(false, |wanted| wanted != row.item_id) {
                continue;
            }
            by_item.entry(row.item_id).or_default().push(HourlyBreakdown {
                hour: row.hour,
                quantity: row.quantity,
                revenue: row.revenue,
            });
        }
        for hours in by_item.values_mut() {
            // Stable, so equal quantities stay in hour order.
            hours.sort_by(|a, b| b.quantity.cmp(&a.quantity));
        }
        Ok(by_item)
    }

    /// Morning, lunch and evening rush intensity over the last 30 days.
    pub async fn peak_hours_analysis(&self) -> Result<Vec<PeakPeriod>, ServiceError> {
        let hourly = self
            .feed
            .fetch_hourly(self.window(PEAK_ANALYSIS_DAYS))
            .await?;

        let units: Vec<u32> = DAY_PARTS
            .iter()
            .map(|part| {
                hourly
                    .iter()
                    .filter(|row| row.hour >= part.span.0 && row.hour < part.span.1)
                    .fold(0u32, |acc, row| acc.saturating_add(row.quantity))
            })
            .collect();

        let busiest = units.iter().copied().max().unwrap_or(0);
        if busiest == 0 {
            debug!("No hourly sales recorded, using typical day-part profile");
            return Ok(default_peak_hours());
        }

        Ok(DAY_PARTS
            .iter()
            .zip(units)
            .map(|(part, sold)| PeakPeriod {
                period: part.period.to_string(),
                hours: part.hours.to_string(),
                intensity: Intensity::from_share(f64::from(sold) / f64::from(busiest)),
                units_sold: Some(sold),
                reason: part.reason.to_string(),
            })
            .collect())
    }

    /// Slow movers from the last week, plus general preparation advice.
    pub async fn waste_reduction_tips(&self) -> Result<WasteReport, ServiceError> {
        let records = self
            .feed
            .fetch(None, self.window(WASTE_LOOKBACK_DAYS))
            .await?;

        if records.is_empty() {
            return Ok(WasteReport {
                tips: vec![
                    "Start tracking sales data to get personalized recommendations".into(),
                    "Typical advice: Prepare 20% less on Mondays and Tuesdays".into(),
                ],
                alerts: Vec::new(),
            });
        }

        let mut weekly: BTreeMap<&str, u32> = BTreeMap::new();
        for record in &records {
            let total = weekly.entry(record.item_id()).or_insert(0);
            *total = total.saturating_add(record.quantity());
        }

        let alerts: Vec<WasteAlert> = weekly
            .into_iter()
            .filter(|(_, sold)| *sold < SLOW_MOVER_THRESHOLD)
            .map(|(item, sold)| WasteAlert {
                item: item.to_string(),
                weekly_sales: sold,
                suggestion: format!("Consider reducing {item} preparation or promoting it more"),
            })
            .collect();
        info!(alerts = alerts.len(), "Built waste reduction report");

        Ok(WasteReport {
            tips: vec![
                "Analyze daily patterns to adjust preparation quantities".into(),
                "Monitor weather forecasts - rainy days increase tea sales".into(),
                "Keep track of local events that might affect demand".into(),
            ],
            alerts,
        })
    }
}

fn default_peak_hours() -> Vec<PeakPeriod> {
    DAY_PARTS
        .iter()
        .map(|part| PeakPeriod {
            period: part.period.to_string(),
            hours: part.hours.to_string(),
            intensity: part.typical,
            units_sold: None,
            reason: part.reason.to_string(),
        })
        .collect()
}
