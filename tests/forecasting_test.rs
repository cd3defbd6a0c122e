mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Duration as Days;
use smartpos_forecast::{
    errors::FeedError,
    ml::{Confidence, ModelKind},
    services::{FallbackReason, Forecast, ForecastOutcome},
};

use common::{
    daily_history, forecasting_config, reference_date, service, service_with, spaced_history,
    FixtureFeed,
};

fn predicted(outcome: &ForecastOutcome) -> &smartpos_forecast::ml::PredictionResult {
    match outcome {
        ForecastOutcome::Predicted { prediction } => prediction,
        other => panic!("expected a fitted prediction, got {other:?}"),
    }
}

#[tokio::test]
async fn five_tea_records_fall_back_to_baseline() {
    let feed = Arc::new(
        FixtureFeed::new().with_records(daily_history("Tea", reference_date(), &[10, 12, 9, 11, 14])),
    );
    let outcome = service(feed).predict_one("Tea", 1, false).await;

    assert_matches!(
        &outcome,
        ForecastOutcome::Fallback {
            reason: FallbackReason::InsufficientHistory { samples: 5 },
            ..
        }
    );
    let prediction = outcome.prediction().unwrap();
    assert_eq!(prediction.model_used, ModelKind::Baseline);
    assert_eq!(prediction.confidence, Confidence::Low);
    assert_eq!(prediction.predicted_quantity, 20);
    assert_eq!(prediction.training_samples, 0);
}

#[tokio::test]
async fn ten_coffee_records_fit_linear_regression() {
    let feed = Arc::new(FixtureFeed::new().with_records(daily_history(
        "Coffee",
        reference_date(),
        &[14, 15, 16, 13, 15, 18, 19, 14, 15, 16],
    )));
    let outcome = service(feed).predict_one("Coffee", 1, false).await;

    let prediction = predicted(&outcome);
    assert_eq!(prediction.model_used, ModelKind::LinearRegression);
    assert_eq!(prediction.confidence, Confidence::Medium);
    assert_eq!(prediction.training_samples, 10);
    assert!(
        (10..=22).contains(&prediction.predicted_quantity),
        "predicted {}",
        prediction.predicted_quantity
    );
}

#[tokio::test]
async fn forty_samosa_records_fit_random_forest() {
    let feed = Arc::new(FixtureFeed::new().with_records(spaced_history(
        "Samosa",
        reference_date(),
        40,
        2,
        |i| 8 + (i % 5) as u32,
    )));
    let outcome = service(feed).predict_one("Samosa", 1, true).await;

    let prediction = predicted(&outcome);
    assert_eq!(prediction.model_used, ModelKind::RandomForest);
    assert_eq!(prediction.confidence, Confidence::High);
    assert_eq!(prediction.training_samples, 40);
    assert!((8..=12).contains(&prediction.predicted_quantity));
}

#[tokio::test]
async fn batch_marks_unreachable_item_without_failing_others() {
    let feed = Arc::new(
        FixtureFeed::new()
            .with_records(daily_history("Tea", reference_date(), &[20; 10]))
            .failing_for("Mojito"),
    );
    let items = vec!["Tea".to_string(), "Mojito".to_string()];
    let outcomes = service(feed).predict_all(&items).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].item(), "Tea");
    assert_eq!(predicted(&outcomes[0]).predicted_quantity, 20);
    assert_matches!(
        &outcomes[1],
        ForecastOutcome::FeedError { item, error: FeedError::Unavailable(_) } if item == "Mojito"
    );
}

#[tokio::test]
async fn unknown_item_without_history_gets_generic_baseline() {
    let feed = Arc::new(FixtureFeed::new());
    let outcome = service(feed).predict_one("Mango Lassi", 1, false).await;

    assert_matches!(
        &outcome,
        ForecastOutcome::Fallback {
            reason: FallbackReason::NoHistory,
            ..
        }
    );
    assert_eq!(outcome.prediction().unwrap().predicted_quantity, 10);
}

#[tokio::test]
async fn baseline_is_deterministic_for_empty_history() {
    let feed = Arc::new(FixtureFeed::new());
    let svc = service(feed);
    let first = svc.predict_one("Biscuit", 1, false).await;
    let second = svc.predict_one("Biscuit", 3, true).await;

    assert_eq!(first.prediction(), second.prediction());
    let prediction = first.prediction().unwrap();
    assert_eq!(prediction.predicted_quantity, 8);
    assert_eq!(prediction.confidence, Confidence::Low);
    assert_eq!(prediction.model_used, ModelKind::Baseline);
    assert_eq!(prediction.training_samples, 0);
}

#[tokio::test]
async fn advanced_request_with_short_history_degrades_to_simple_tier() {
    let history = daily_history("Tea", reference_date(), &[18, 20, 22, 19, 21, 25, 27, 18, 20]);
    let feed = Arc::new(FixtureFeed::new().with_records(history));
    let svc = service(feed.clone());

    let advanced = svc.predict_one("Tea", 1, true).await;
    let simple = svc.predict_one("Tea", 1, false).await;

    assert_eq!(advanced, simple);
    let prediction = predicted(&advanced);
    assert_eq!(prediction.model_used, ModelKind::LinearRegression);
    assert_eq!(prediction.confidence, Confidence::Medium);
    assert_eq!(prediction.training_samples, 9);

    // Advanced pull, then the simple-tier re-fetch, then the plain simple call.
    assert_eq!(
        feed.fetches(),
        vec![
            ("Tea".to_string(), 90),
            ("Tea".to_string(), 60),
            ("Tea".to_string(), 60)
        ]
    );
}

#[tokio::test]
async fn advanced_request_between_fourteen_and_thirty_rows_is_medium_confidence() {
    let feed = Arc::new(FixtureFeed::new().with_records(daily_history(
        "Snack",
        reference_date(),
        &[12, 11, 13, 12, 15, 18, 17, 12, 11, 13, 12, 15, 18, 17, 12, 11],
    )));
    let outcome = service(feed).predict_advanced("Snack").await;
    let prediction = predicted(&outcome);
    assert_eq!(prediction.model_used, ModelKind::RandomForest);
    assert_eq!(prediction.confidence, Confidence::Medium);
    assert_eq!(prediction.training_samples, 16);
}

#[tokio::test]
async fn advanced_forecast_is_reproducible() {
    let feed = Arc::new(FixtureFeed::new().with_records(spaced_history(
        "Samosa",
        reference_date(),
        35,
        1,
        |i| 5 + (i * 7 % 11) as u32,
    )));
    let svc = service(feed);
    let first = svc.predict_advanced("Samosa").await;
    let second = svc.predict_advanced("Samosa").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn collapsing_sales_never_forecast_below_zero() {
    // Monday through Sunday of the week ending on the reference date.
    let feed = Arc::new(FixtureFeed::new().with_records(daily_history(
        "Snack",
        reference_date(),
        &[60, 45, 30, 15, 0, 0, 0],
    )));
    let outcome = service(feed).predict_one("Snack", 7, false).await;
    let prediction = predicted(&outcome);
    assert_eq!(prediction.model_used, ModelKind::LinearRegression);
    assert_eq!(prediction.predicted_quantity, 0);
}

#[tokio::test]
async fn history_older_than_lookback_is_ignored() {
    let old_end = reference_date() - Days::days(100);
    let feed = Arc::new(FixtureFeed::new().with_records(daily_history("Tea", old_end, &[30; 20])));
    let outcome = service(feed).predict_one("Tea", 1, false).await;
    assert_matches!(
        outcome,
        ForecastOutcome::Fallback {
            reason: FallbackReason::NoHistory,
            ..
        }
    );
}

#[tokio::test]
async fn simple_lookback_covers_exactly_sixty_days() {
    let feed = Arc::new(FixtureFeed::new().with_records(daily_history("Tea", reference_date(), &[20; 70])));
    let outcome = service(feed).predict_one("Tea", 1, false).await;
    assert_eq!(predicted(&outcome).training_samples, 60);

    // A record exactly sixty days back sits just outside the window.
    let boundary = reference_date() - Days::days(60);
    let mut history = daily_history("Coffee", boundary, &[15]);
    history.extend(daily_history("Coffee", reference_date(), &[15; 6]));
    let feed = Arc::new(FixtureFeed::new().with_records(history));
    let outcome = service(feed).predict_one("Coffee", 1, false).await;
    assert_matches!(
        outcome,
        ForecastOutcome::Fallback {
            reason: FallbackReason::InsufficientHistory { samples: 6 },
            ..
        }
    );
}

#[tokio::test]
async fn slow_feed_times_out_without_blocking_other_items() {
    let feed = Arc::new(
        FixtureFeed::new()
            .with_records(daily_history("Tea", reference_date(), &[20; 10]))
            .slow_for("Coffee", Duration::from_secs(5)),
    );
    let config = smartpos_forecast::config::ForecastingConfig {
        feed_timeout_ms: 50,
        ..forecasting_config()
    };
    let items = vec!["Coffee".to_string(), "Tea".to_string()];
    let outcomes = service_with(feed, config).predict_all(&items).await;

    assert_matches!(
        outcomes[0].feed_error(),
        Some(FeedError::Timeout { after_ms: 50 })
    );
    assert_eq!(predicted(&outcomes[1]).model_used, ModelKind::LinearRegression);
}

#[tokio::test]
async fn batch_respects_concurrency_limit_and_order() {
    let names = ["Tea", "Coffee", "Samosa", "Biscuit", "Snack", "Vada Pav"];
    let feed = Arc::new(FixtureFeed::new().slow_everywhere(Duration::from_millis(20)));
    let config = smartpos_forecast::config::ForecastingConfig {
        max_concurrent_predictions: 2,
        ..forecasting_config()
    };
    let items: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    let outcomes = service_with(feed.clone(), config).predict_all(&items).await;

    let returned: Vec<&str> = outcomes.iter().map(|o| o.item()).collect();
    assert_eq!(returned, names);
    assert!(feed.max_in_flight() <= 2, "in flight: {}", feed.max_in_flight());
    assert!(feed.max_in_flight() >= 1);
}

#[tokio::test]
async fn predict_without_item_covers_active_menu() {
    let feed = Arc::new(
        FixtureFeed::new()
            .with_records(daily_history("Tea", reference_date(), &[20; 10]))
            .with_active_items(&["Tea", "Coffee"]),
    );
    let forecast = service(feed).predict(None).await.unwrap();
    let Forecast::Batch(outcomes) = forecast else {
        panic!("expected a batch forecast");
    };
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[1].prediction().unwrap().model_used, ModelKind::Baseline);
}

#[tokio::test]
async fn predict_without_item_reports_catalog_failure() {
    let feed = Arc::new(FixtureFeed::new().with_catalog_down());
    let result = service(feed).predict(None).await;
    assert_matches!(result, Err(FeedError::Unavailable(_)));
}

#[tokio::test]
async fn single_item_predict_wraps_one_outcome() {
    let feed = Arc::new(FixtureFeed::new());
    let forecast = service(feed).predict(Some("Coffee")).await.unwrap();
    assert_matches!(forecast, Forecast::Single(outcome) if outcome.item() == "Coffee");
}

#[tokio::test]
async fn baseline_overrides_from_config_are_used() {
    let feed = Arc::new(FixtureFeed::new());
    let mut config = forecasting_config();
    config.baseline_overrides.insert("Vada Pav".into(), 30);
    let outcome = service_with(feed, config).predict_one("Vada Pav", 1, false).await;
    assert_eq!(outcome.prediction().unwrap().predicted_quantity, 30);
}
