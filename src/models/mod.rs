// Sales history as seen by the forecasting core
pub mod sales_record;

// Till-side records the in-memory feed aggregates from
pub mod transaction;

pub use sales_record::{RawSalesRecord, SalesRecord};
pub use transaction::{HourlySales, LineItem, MenuItem, Transaction};
