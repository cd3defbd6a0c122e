// Sales history source and the in-memory implementation
pub mod feed;

// Demand forecasting orchestration
pub mod forecasting;

// Descriptive sales analytics
pub mod insights;

pub use feed::{InMemorySalesFeed, ItemCatalog, SalesFeed, SeedData};
pub use forecasting::{FallbackReason, Forecast, ForecastOutcome, ForecastingService};
pub use insights::InsightsService;
