use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    errors::FeedError,
    ml::LookbackWindow,
    models::{HourlySales, LineItem, MenuItem, RawSalesRecord, SalesRecord, Transaction},
};

/// Source of per-day sales history.
///
/// Implementations return one record per `(item_id, date)`, sorted by date
/// ascending, covering `window`. `item = None` means every item.
#[async_trait]
pub trait SalesFeed: Send + Sync {
    async fn fetch(
        &self,
        item: Option<&str>,
        window: LookbackWindow,
    ) -> Result<Vec<SalesRecord>, FeedError>;

    /// Hour-of-day totals per item over `window`. Feeds without
    /// intra-day resolution report nothing.
    async fn fetch_hourly(&self, _window: LookbackWindow) -> Result<Vec<HourlySales>, FeedError> {
        Ok(Vec::new())
    }
}

/// Lists the menu items currently on sale.
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    async fn active_items(&self) -> Result<Vec<String>, FeedError>;
}

/// Seed file layout accepted by [`InMemorySalesFeed::from_seed_file`].
///
/// `daily_sales` holds pre-aggregated days; each is stored as a single
/// midday transaction.
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub items: Vec<MenuItem>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub daily_sales: Vec<RawSalesRecord>,
}

/// Transaction log held in memory, aggregated on every read.
#[derive(Debug, Clone, Default)]
pub struct InMemorySalesFeed {
    transactions: Arc<RwLock<Vec<Transaction>>>,
    menu: Arc<RwLock<Vec<MenuItem>>>,
}

impl InMemorySalesFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedData) -> Result<Self, FeedError> {
        let SeedData {
            items,
            mut transactions,
            daily_sales,
        } = seed;
        for tx in &transactions {
            validate_transaction(tx)?;
        }
        for raw in daily_sales {
            let record = SalesRecord::try_from(raw)?;
            transactions.push(Transaction::new(
                record.date().and_time(NaiveTime::MIN + chrono::Duration::hours(12)).and_utc(),
                vec![LineItem::new(record.item_id(), record.quantity(), record.revenue())],
            ));
        }
        Ok(Self {
            transactions: Arc::new(RwLock::new(transactions)),
            menu: Arc::new(RwLock::new(items)),
        })
    }

    pub fn from_seed_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        let seed: SeedData = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse seed file {}", path.display()))?;
        info!(
            items = seed.items.len(),
            transactions = seed.transactions.len(),
            "Loaded sales seed data"
        );
        Ok(Self::from_seed(seed)?)
    }

    pub async fn record_transaction(&self, tx: Transaction) -> Result<(), FeedError> {
        validate_transaction(&tx)?;
        self.transactions.write().await.push(tx);
        Ok(())
    }

    pub async fn add_menu_item(&self, item: MenuItem) {
        let mut menu = self.menu.write().await;
        match menu.iter_mut().find(|existing| existing.name == item.name) {
            Some(existing) => existing.is_active = item.is_active,
            None => menu.push(item),
        }
    }

    pub async fn transaction_count(&self) -> usize {
        self.transactions.read().await.len()
    }
}

fn validate_transaction(tx: &Transaction) -> Result<(), FeedError> {
    for line in &tx.items {
        if line.item_name.trim().is_empty() {
            return Err(FeedError::InvalidRecord(format!(
                "transaction at {} has a line with no item name",
                tx.timestamp
            )));
        }
        if line.total < Decimal::ZERO {
            return Err(FeedError::InvalidRecord(format!(
                "{} at {}: negative line total {}",
                line.item_name, tx.timestamp, line.total
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl SalesFeed for InMemorySalesFeed {
    async fn fetch(
        &self,
        item: Option<&str>,
        window: LookbackWindow,
    ) -> Result<Vec<SalesRecord>, FeedError> {
        let transactions = self.transactions.read().await;

        // Keyed by date first so iteration order is chronological.
        let mut daily: BTreeMap<(NaiveDate, &str), (u32, Decimal)> = BTreeMap::new();
        for tx in transactions.iter() {
            let date = tx.timestamp.date_naive();
            if !window.contains(date) {
                continue;
            }
            for line in &tx.items {
                if item.map_or(false, |wanted| wanted != line.item_name) {
                    continue;
                }
                let entry = daily
                    .entry((date, line.item_name.as_str()))
                    .or_insert((0, Decimal::ZERO));
                entry.0 = entry.0.saturating_add(line.quantity);
                entry.1 += line.total;
            }
        }

        let records: Vec<SalesRecord> = daily
            .into_iter()
            .map(|((date, name), (quantity, revenue))| {
                SalesRecord::new(name, date, quantity, revenue)
            })
            .collect();
        debug!(
            item = item.unwrap_or("*"),
            records = records.len(),
            "Aggregated daily sales"
        );
        Ok(records)
    }

    async fn fetch_hourly(&self, window: LookbackWindow) -> Result<Vec<HourlySales>, FeedError> {
        let transactions = self.transactions.read().await;

        let mut hourly: BTreeMap<(u32, &str), (u32, Decimal)> = BTreeMap::new();
        for tx in transactions.iter() {
            if !window.contains(tx.timestamp.date_naive()) {
                continue;
            }
            let hour = tx.timestamp.hour();
            for line in &tx.items {
                let entry = hourly
                    .entry((hour, line.item_name.as_str()))
                    .or_insert((0, Decimal::ZERO));
                entry.0 = entry.0.saturating_add(line.quantity);
                entry.1 += line.total;
            }
        }

        let mut rows: Vec<HourlySales> = hourly
            .into_iter()
            .map(|((hour, name), (quantity, revenue))| HourlySales {
                item_id: name.to_string(),
                hour,
                quantity,
                revenue,
            })
            .collect();
        rows.sort_by(|a, b| a.hour.cmp(&b.hour).then(b.quantity.cmp(&a.quantity)));
        Ok(rows)
    }
}

#[async_trait]
impl ItemCatalog for InMemorySalesFeed {
    async fn active_items(&self) -> Result<Vec<String>, FeedError> {
        Ok(self
            .menu
            .read()
            .await
            .iter()
            .filter(|item| item.is_active)
            .map(|item| item.name.clone())
            .collect())
    }
}
