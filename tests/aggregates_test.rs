// ABOUTME: Integration tests for the rolling aggregate and enhanced ACWR engines
// ABOUTME: Covers window arithmetic, ratio invariants, idempotence, and enhanced fallback

mod common;

use chrono::{Duration, NaiveDate};
use common::{create_test_database, create_test_user};
use std::sync::Arc;
use stride::intelligence::aggregates::AcwrEngine;
use stride::models::{ActivityRecord, SportType};
use uuid::Uuid;

fn run(user_id: Uuid, activity_id: i64, date: NaiveDate, load: f64, trimp: f64) -> ActivityRecord {
    let mut record = ActivityRecord::rest_day(user_id, date);
    record.activity_id = activity_id;
    record.name = "Run".to_owned();
    record.sport_type = SportType::Running;
    record.distance_miles = load;
    record.total_load_miles = load;
    record.trimp = trimp;
    record.duration_minutes = 50.0;
    record.notes = None;
    record
}

/// Seed one row per day over `[end - days + 1, end]`; `load_for` returns the
/// day's load (0 inserts a rest day)
async fn seed_days(
    db: &common::TestDatabase,
    user_id: Uuid,
    end: NaiveDate,
    days: i64,
    load_for: impl Fn(i64) -> f64,
) {
    for offset in 0..days {
        let date = end - Duration::days(offset);
        let load = load_for(offset);
        let record = if load > 0.0 {
            run(user_id, 10_000 + offset, date, load, load * 10.0)
        } else {
            ActivityRecord::rest_day(user_id, date)
        };
        db.database.insert_activity(&record).await.unwrap();
    }
}

#[tokio::test]
async fn uniform_month_yields_unit_ratio() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let end = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();

    seed_days(&db, user.id, end, 28, |_| 5.0).await;

    let engine = AcwrEngine::new(Arc::clone(&db.database));
    let aggregates = engine.update_for_date(&user, end).await.unwrap();

    assert!((aggregates.seven_day_avg_load - 5.0).abs() < 1e-9);
    assert!((aggregates.twentyeight_day_avg_load - 5.0).abs() < 1e-9);
    assert!((aggregates.acute_chronic_ratio - 1.0).abs() < 1e-9);
    assert!((aggregates.trimp_acute_chronic_ratio - 1.0).abs() < 1e-9);
    assert!(aggregates.normalized_divergence.abs() < 1e-9);
}

#[tokio::test]
async fn ratio_equals_acute_over_chronic_when_chronic_positive() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let end = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();

    // One run in the acute window only
    seed_days(&db, user.id, end, 28, |offset| if offset == 0 { 7.0 } else { 0.0 }).await;

    let engine = AcwrEngine::new(Arc::clone(&db.database));
    let aggregates = engine.update_for_date(&user, end).await.unwrap();

    // 7/7 = 1.0 acute; 7/28 = 0.25 chronic; ratio = 4.0
    assert!((aggregates.seven_day_avg_load - 1.0).abs() < 1e-9);
    assert!((aggregates.twentyeight_day_avg_load - 0.25).abs() < 1e-9);
    assert!(
        (aggregates.acute_chronic_ratio
            - aggregates.seven_day_avg_load / aggregates.twentyeight_day_avg_load)
            .abs()
            < 1e-9
    );
}

#[tokio::test]
async fn zero_chronic_load_yields_zero_ratio() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let end = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();

    seed_days(&db, user.id, end, 28, |_| 0.0).await;

    let engine = AcwrEngine::new(Arc::clone(&db.database));
    let aggregates = engine.update_for_date(&user, end).await.unwrap();

    assert_eq!(aggregates.acute_chronic_ratio, 0.0);
    assert_eq!(aggregates.normalized_divergence, 0.0);
}

#[tokio::test]
async fn updating_twice_is_idempotent() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let end = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();

    seed_days(&db, user.id, end, 28, |offset| if offset % 2 == 0 { 6.0 } else { 0.0 }).await;

    let engine = AcwrEngine::new(Arc::clone(&db.database));
    let first = engine.update_for_date(&user, end).await.unwrap();
    let second = engine.update_for_date(&user, end).await.unwrap();

    assert!((first.seven_day_avg_load - second.seven_day_avg_load).abs() < 1e-9);
    assert!((first.acute_chronic_ratio - second.acute_chronic_ratio).abs() < 1e-9);
    assert!((first.normalized_divergence - second.normalized_divergence).abs() < 1e-9);

    let rows = db.database.activities_for_date(user.id, end).await.unwrap();
    let agg = rows[0].aggregates.expect("aggregates written");
    assert!((agg.seven_day_avg_load - first.seven_day_avg_load).abs() < 1e-9);
}

#[tokio::test]
async fn window_update_processes_dates_in_ascending_order() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let end = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
    let start = end - Duration::days(6);

    seed_days(&db, user.id, end, 28, |_| 4.0).await;

    let engine = AcwrEngine::new(Arc::clone(&db.database));
    engine.update_window(&user, start, end).await.unwrap();

    // Every date in the window carries aggregates after the pass
    let mut date = start;
    while date <= end {
        let rows = db.database.activities_for_date(user.id, date).await.unwrap();
        assert!(rows[0].aggregates.is_some(), "missing aggregates for {date}");
        date += Duration::days(1);
    }
}

#[tokio::test]
async fn enhanced_engine_matches_standard_on_uniform_data() {
    let db = create_test_database().await;

    let mut user = common::test_user();
    user.acwr.enhanced_enabled = true;
    db.database.create_user(&user).await.unwrap();

    let end = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
    seed_days(&db, user.id, end, 28, |_| 5.0).await;

    let engine = AcwrEngine::new(Arc::clone(&db.database));
    let aggregates = engine.update_for_date(&user, end).await.unwrap();

    // Uniform history: weighting is invisible and the ratio is unity
    assert!((aggregates.acute_chronic_ratio - 1.0).abs() < 1e-6);
    assert!((aggregates.twentyeight_day_avg_load - 5.0).abs() < 0.01);
}

#[tokio::test]
async fn enhanced_engine_weights_recent_load_higher() {
    let db = create_test_database().await;

    let mut user = common::test_user();
    user.acwr.enhanced_enabled = true;
    user.acwr.decay_rate = 0.1;
    db.database.create_user(&user).await.unwrap();

    let end = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
    // Heavy recent week over a light month
    seed_days(&db, user.id, end, 28, |offset| if offset < 7 { 10.0 } else { 2.0 }).await;

    let engine = AcwrEngine::new(Arc::clone(&db.database));
    let enhanced = engine.update_for_date(&user, end).await.unwrap();

    let mut standard_user = user.clone();
    standard_user.acwr.enhanced_enabled = false;
    let standard = engine.update_for_date(&standard_user, end).await.unwrap();

    // Recency weighting pulls the chronic average toward the heavy week,
    // lowering the ratio relative to the uniform-window standard form
    assert!(enhanced.twentyeight_day_avg_load > standard.twentyeight_day_avg_load);
    assert!(enhanced.acute_chronic_ratio < standard.acute_chronic_ratio);
}

#[tokio::test]
async fn enhanced_engine_falls_back_on_sparse_history() {
    let db = create_test_database().await;

    let mut user = common::test_user();
    user.acwr.enhanced_enabled = true;
    db.database.create_user(&user).await.unwrap();

    let end = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
    // Only three days of history: the enhanced engine reports
    // insufficient_chronic_data and the standard form takes over
    seed_days(&db, user.id, end, 3, |_| 5.0).await;

    let engine = AcwrEngine::new(Arc::clone(&db.database));
    let aggregates = engine.update_for_date(&user, end).await.unwrap();

    // Standard form: 15 miles over 7 and 28 day windows
    assert!((aggregates.seven_day_avg_load - 2.14).abs() < 0.01);
    assert!((aggregates.twentyeight_day_avg_load - 0.54).abs() < 0.01);
}
