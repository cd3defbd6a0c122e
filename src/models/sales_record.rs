use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::FeedError;

/// ISO day-of-week number for `date`: Monday = 1 ... Sunday = 7.
///
/// This is the only weekday numbering used in the crate. The sales feed,
/// the feature builder and the prediction-time target row all go through it.
pub fn iso_day_of_week(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

/// Saturday (6) and Sunday (7).
pub fn is_weekend_day(day_of_week: u8) -> bool {
    day_of_week == 6 || day_of_week == 7
}

/// English name for an ISO day-of-week number.
pub fn weekday_name(day_of_week: u8) -> &'static str {
    match day_of_week {
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        7 => "Sunday",
        _ => "Unknown",
    }
}

/// One item's aggregated sales for one calendar day.
///
/// Fields are only set through [`SalesRecord::new`] or `TryFrom<RawSalesRecord>`,
/// so the weekday columns always agree with `date`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    item_id: String,
    date: NaiveDate,
    day_of_week: u8,
    is_weekend: bool,
    quantity: u32,
    revenue: Decimal,
}

impl SalesRecord {
    /// Builds a record, deriving the weekday fields from `date`.
    pub fn new(item_id: impl Into<String>, date: NaiveDate, quantity: u32, revenue: Decimal) -> Self {
        let day_of_week = iso_day_of_week(date);
        Self {
            item_id: item_id.into(),
            date,
            day_of_week,
            is_weekend: is_weekend_day(day_of_week),
            quantity,
            revenue,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// ISO weekday, 1..=7.
    pub fn day_of_week(&self) -> u8 {
        self.day_of_week
    }

    pub fn is_weekend(&self) -> bool {
        self.is_weekend
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn revenue(&self) -> Decimal {
        self.revenue
    }
}

/// Untrusted record shape as delivered by an external feed.
///
/// Converted into [`SalesRecord`] with `TryFrom`, which rejects negative
/// amounts and weekday numbers that disagree with the date.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSalesRecord {
    pub item_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub day_of_week: Option<u8>,
    pub quantity: i64,
    #[serde(default)]
    pub revenue: Decimal,
}

impl TryFrom<RawSalesRecord> for SalesRecord {
    type Error = FeedError;

    fn try_from(raw: RawSalesRecord) -> Result<Self, Self::Error> {
        if raw.item_id.trim().is_empty() {
            return Err(FeedError::InvalidRecord(format!(
                "record dated {} has an empty item id",
                raw.date
            )));
        }
        let quantity = u32::try_from(raw.quantity).map_err(|_| {
            FeedError::InvalidRecord(format!(
                "{} on {}: quantity {} out of range",
                raw.item_id, raw.date, raw.quantity
            ))
        })?;
        if raw.revenue < Decimal::ZERO {
            return Err(FeedError::InvalidRecord(format!(
                "{} on {}: negative revenue {}",
                raw.item_id, raw.date, raw.revenue
            )));
        }
        let record = SalesRecord::new(raw.item_id, raw.date, quantity, raw.revenue);
        if let Some(supplied) = raw.day_of_week {
            if supplied != record.day_of_week {
                return Err(FeedError::InvalidRecord(format!(
                    "{} on {}: day_of_week {} does not match ISO weekday {}",
                    record.item_id, record.date, supplied, record.day_of_week
                )));
            }
        }
        Ok(record)
    }
}
