// ABOUTME: Integration tests for the database layer
// ABOUTME: Covers migrations, idempotent inserts, token storage, and aggregate writes

mod common;

use chrono::{Duration, NaiveDate, Utc};
use common::{create_test_database, create_test_user, test_user};
use stride::models::{
    ActivityRecord, Autopsy, DailyAggregates, HrStream, JournalEntry, Recommendation, SportType,
};
use uuid::Uuid;

fn real_activity(user_id: Uuid, activity_id: i64, date: NaiveDate) -> ActivityRecord {
    let mut record = ActivityRecord::rest_day(user_id, date);
    record.activity_id = activity_id;
    record.name = "Morning Run".to_owned();
    record.sport_type = SportType::Running;
    record.distance_miles = 6.0;
    record.total_load_miles = 6.5;
    record.elevation_load_miles = 0.5;
    record.elevation_gain_feet = 375.0;
    record.trimp = 80.0;
    record.duration_minutes = 55.0;
    record.notes = None;
    record
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = create_test_database().await;
    // A second (and third) run must not fail on existing tables or columns
    db.database.migrate().await.expect("second migrate");
    db.database.migrate().await.expect("third migrate");
}

#[tokio::test]
async fn user_roundtrip_preserves_settings_and_token() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;

    let loaded = db
        .database
        .get_user(user.id)
        .await
        .expect("get user")
        .expect("user exists");

    assert_eq!(loaded.email, user.email);
    assert_eq!(loaded.resting_hr, 50);
    assert_eq!(loaded.max_hr, 190);
    assert_eq!(loaded.strava_athlete_id, Some(42));
    let token = loaded.strava_token.expect("token stored");
    assert_eq!(token.access_token, "test-access");
}

#[tokio::test]
async fn token_update_is_atomic_and_clearable() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;

    let new_expiry = Utc::now() + Duration::hours(8);
    db.database
        .update_strava_token(user.id, "new-access", "new-refresh", new_expiry, Some(77))
        .await
        .expect("update token");

    let loaded = db.database.get_user(user.id).await.unwrap().unwrap();
    let token = loaded.strava_token.expect("token present");
    assert_eq!(token.access_token, "new-access");
    assert_eq!(token.refresh_token, "new-refresh");
    assert_eq!(loaded.strava_athlete_id, Some(77));

    db.database.clear_strava_token(user.id).await.expect("clear");
    let cleared = db.database.get_user(user.id).await.unwrap().unwrap();
    assert!(cleared.strava_token.is_none());
}

#[tokio::test]
async fn list_users_with_tokens_excludes_disconnected_athletes() {
    let db = create_test_database().await;
    let connected = create_test_user(&db.database).await;

    let mut disconnected = test_user();
    disconnected.strava_token = None;
    db.database.create_user(&disconnected).await.unwrap();

    let users = db
        .database
        .list_users_with_strava_tokens()
        .await
        .expect("list users");

    assert!(users.iter().any(|u| u.id == connected.id));
    assert!(!users.iter().any(|u| u.id == disconnected.id));
}

#[tokio::test]
async fn duplicate_activity_insert_is_an_idempotent_skip() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let date = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();

    let activity = real_activity(user.id, 1001, date);
    assert!(db.database.insert_activity(&activity).await.unwrap());
    // Second insert of the same (athlete, activity) key is a skip, not an error
    assert!(!db.database.insert_activity(&activity).await.unwrap());

    assert_eq!(db.database.count_activities(user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn rest_day_is_replaced_by_real_activity() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let date = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();

    let rest = ActivityRecord::rest_day(user.id, date);
    assert!(db.database.insert_activity(&rest).await.unwrap());
    assert!(db.database.has_row_for_date(user.id, date).await.unwrap());
    assert!(!db
        .database
        .has_real_activity_for_date(user.id, date)
        .await
        .unwrap());

    assert!(db.database.delete_rest_day(user.id, date).await.unwrap());
    let activity = real_activity(user.id, 1002, date);
    assert!(db.database.insert_activity(&activity).await.unwrap());

    let rows = db.database.activities_for_date(user.id, date).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].is_rest_day());
}

#[tokio::test]
async fn aggregates_are_written_to_every_row_of_the_date() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let date = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();

    db.database
        .insert_activity(&real_activity(user.id, 2001, date))
        .await
        .unwrap();
    db.database
        .insert_activity(&real_activity(user.id, 2002, date))
        .await
        .unwrap();

    let aggregates = DailyAggregates {
        seven_day_avg_load: 3.5,
        twentyeight_day_avg_load: 3.0,
        seven_day_avg_trimp: 40.0,
        twentyeight_day_avg_trimp: 38.0,
        acute_chronic_ratio: 1.17,
        trimp_acute_chronic_ratio: 1.05,
        normalized_divergence: 0.108,
    };
    db.database
        .update_daily_aggregates(user.id, date, &aggregates)
        .await
        .unwrap();

    let rows = db.database.activities_for_date(user.id, date).await.unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        let agg = row.aggregates.expect("aggregates written");
        assert!((agg.acute_chronic_ratio - 1.17).abs() < 1e-9);
        assert!((agg.normalized_divergence - 0.108).abs() < 1e-9);
    }
}

#[tokio::test]
async fn window_sums_treat_missing_days_as_zero() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let end = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();

    db.database
        .insert_activity(&real_activity(user.id, 3001, end))
        .await
        .unwrap();

    let (load, trimp) = db
        .database
        .sum_load_between(user.id, end - Duration::days(6), end)
        .await
        .unwrap();

    assert!((load - 6.5).abs() < 1e-9);
    assert!((trimp - 80.0).abs() < 1e-9);
}

#[tokio::test]
async fn hr_stream_roundtrips_after_activity_commit() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let date = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();

    db.database
        .insert_activity(&real_activity(user.id, 4001, date))
        .await
        .unwrap();

    let stream = HrStream {
        activity_id: 4001,
        user_id: user.id,
        samples: vec![120.0, 135.0, 150.0, 148.0],
        sample_rate: 1.0,
    };
    db.database.save_hr_stream(&stream).await.unwrap();

    let loaded = db
        .database
        .get_hr_stream(user.id, 4001)
        .await
        .unwrap()
        .expect("stream stored");
    assert_eq!(loaded.samples, vec![120.0, 135.0, 150.0, 148.0]);

    assert!(db.database.get_hr_stream(user.id, 9999).await.unwrap().is_none());
}

#[tokio::test]
async fn recommendations_are_unique_per_target_date() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let target = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();

    let mut rec = Recommendation {
        user_id: user.id,
        generation_date: target,
        generated_at: Utc::now(),
        target_date: target,
        daily_recommendation: "first".to_owned(),
        weekly_recommendation: "weekly".to_owned(),
        pattern_insights: "insights".to_owned(),
        raw_response: "raw".to_owned(),
        is_autopsy_informed: false,
        autopsy_count: 0,
        avg_alignment_score: None,
        metrics_snapshot: serde_json::json!({}),
    };
    db.database.save_recommendation(&rec).await.unwrap();

    rec.daily_recommendation = "second".to_owned();
    rec.is_autopsy_informed = true;
    rec.avg_alignment_score = Some(4.0);
    db.database.save_recommendation(&rec).await.unwrap();

    let loaded = db
        .database
        .get_recommendation_for_date(user.id, target)
        .await
        .unwrap()
        .expect("row exists");
    assert_eq!(loaded.daily_recommendation, "second");
    assert!(loaded.is_autopsy_informed);

    // Still exactly one row for the target date
    let latest = db.database.latest_recommendation(user.id).await.unwrap().unwrap();
    assert_eq!(latest.target_date, target);
}

#[tokio::test]
async fn old_recommendations_are_pruned() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();

    for offset in [0_i64, 10, 20] {
        let target = today - Duration::days(offset);
        let rec = Recommendation {
            user_id: user.id,
            generation_date: target,
            generated_at: Utc::now(),
            target_date: target,
            daily_recommendation: "text".to_owned(),
            weekly_recommendation: "text".to_owned(),
            pattern_insights: "text".to_owned(),
            raw_response: "raw".to_owned(),
            is_autopsy_informed: false,
            autopsy_count: 0,
            avg_alignment_score: None,
            metrics_snapshot: serde_json::json!({}),
        };
        db.database.save_recommendation(&rec).await.unwrap();
    }

    let pruned = db
        .database
        .prune_recommendations_before(user.id, today - Duration::days(14))
        .await
        .unwrap();
    assert_eq!(pruned, 1);
}

#[tokio::test]
async fn autopsies_and_journal_entries_upsert_per_date() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let date = NaiveDate::from_ymd_opt(2025, 5, 9).unwrap();

    let mut autopsy = Autopsy {
        user_id: user.id,
        date,
        prescribed_action: "easy run".to_owned(),
        actual_activities: "hard intervals".to_owned(),
        autopsy_analysis: "analysis".to_owned(),
        alignment_score: 3,
        generated_at: Utc::now(),
    };
    db.database.upsert_autopsy(&autopsy).await.unwrap();

    autopsy.alignment_score = 4;
    db.database.upsert_autopsy(&autopsy).await.unwrap();

    let loaded = db
        .database
        .get_autopsy(user.id, date)
        .await
        .unwrap()
        .expect("autopsy exists");
    assert_eq!(loaded.alignment_score, 4);

    let recent = db
        .database
        .recent_autopsies(user.id, date - Duration::days(3))
        .await
        .unwrap();
    assert_eq!(recent.len(), 1);

    let entry = JournalEntry {
        user_id: user.id,
        date,
        energy_level: Some(3),
        rpe_score: Some(8),
        pain_percentage: Some(20),
        notes: Some("tired legs".to_owned()),
        updated_at: Utc::now(),
    };
    db.database.upsert_journal_entry(&entry).await.unwrap();

    let loaded = db
        .database
        .get_journal_entry(user.id, date)
        .await
        .unwrap()
        .expect("entry exists");
    assert_eq!(loaded.rpe_score, Some(8));
    assert_eq!(loaded.notes.as_deref(), Some("tired legs"));
}
