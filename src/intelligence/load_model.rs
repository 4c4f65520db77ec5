// ABOUTME: Multi-sport external load model producing running-equivalent miles
// ABOUTME: Classifies provider labels into sports and applies per-sport conversion factors

//! # External Load Model
//!
//! Normalizes every supported sport into running-equivalent miles so the
//! rolling aggregates compare like with like. Classification works on the
//! provider's activity label through ordered keyword sets; load computation
//! pattern-matches on the resulting [`SportType`] variant.

use crate::constants::load_model;
use crate::models::{round2, SportType};
use crate::providers::ActivitySummary;

/// Result of an external-load computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExternalLoad {
    /// Running-equivalent distance before elevation
    pub equivalent_miles: f64,
    /// Elevation component in equivalent miles
    pub elevation_load_miles: f64,
    /// Total external load
    pub total_load_miles: f64,
    /// Elevation divisor applied, cycling only
    pub cycling_elevation_factor: Option<f64>,
}

/// Map a raw provider label onto the readable specific label used for
/// classification and display ("TrailRun" -> "Trail Run").
#[must_use]
pub fn specific_label(summary: &ActivitySummary) -> String {
    let raw = summary
        .sport_type
        .as_deref()
        .or(summary.activity_type.as_deref())
        .unwrap_or("Unknown");

    let mapped = match raw {
        "TrailRun" => "Trail Run",
        "Run" | "RoadRun" => "Road Run",
        "VirtualRun" | "Treadmill" | "IndoorRunning" | "IndoorRun" => "Treadmill Run",
        "Track" => "Track Run",
        "Ride" => "Road Bike",
        "MountainBikeRide" => "Mountain Bike",
        "GravelRide" => "Gravel Bike",
        "VirtualRide" | "IndoorCycling" | "IndoorRide" => "Indoor Bike",
        "EBikeRide" => "E-Bike",
        "Walk" => "Walk",
        "Hike" => "Hike",
        "WeightTraining" => "Weight Training",
        "Crossfit" => "Crossfit",
        "Yoga" => "Yoga",
        "Workout" => "Workout",
        "Swim" | "Swimming" => "Swimming",
        "OpenWaterSwim" => "Open Water Swim",
        other => other,
    };

    // A road run recorded on a trainer or flagged indoor is a treadmill run
    if mapped == "Road Run" && summary.trainer {
        return "Treadmill Run".to_owned();
    }

    mapped.to_owned()
}

/// Whether the engine processes this activity label at all
#[must_use]
pub fn is_supported_label(label: &str) -> bool {
    let lower = label.to_lowercase();

    const SUPPORTED_KEYWORDS: &[&str] = &[
        "run", "ride", "bike", "cycling", "swim", "walk", "hike", "weight", "strength",
        "crossfit", "workout", "yoga", "training",
    ];

    SUPPORTED_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

/// Classify an activity label into a sport.
///
/// Strength keywords are tested before running keywords so "Weight
/// Training" never matches "Train". Ambiguous labels default to running.
#[must_use]
pub fn classify_sport(label: &str) -> SportType {
    let lower = label.to_lowercase();

    const STRENGTH_KEYWORDS: &[&str] = &[
        "weight", "strength", "crossfit", "workout", "yoga", "training", "gym", "lifting",
        "weighttraining",
    ];
    const CYCLING_KEYWORDS: &[&str] = &[
        "bike", "cycling", "ride", "mountain bike", "road bike", "indoor bike",
        "mountainbikeride", "roadbike", "virtualride", "ebike",
    ];
    const SWIMMING_KEYWORDS: &[&str] = &[
        "swim", "swimming", "pool", "open water", "openwater", "lap swimming",
    ];
    const RUNNING_KEYWORDS: &[&str] = &[
        "run", "jog", "trail", "track", "treadmill", "virtualrun",
    ];

    let matches = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if matches(STRENGTH_KEYWORDS) {
        SportType::Strength
    } else if matches(CYCLING_KEYWORDS) {
        SportType::Cycling
    } else if matches(SWIMMING_KEYWORDS) {
        SportType::Swimming
    } else if lower.contains("hike") {
        SportType::Hiking
    } else if lower.contains("walk") {
        SportType::Walking
    } else if matches(RUNNING_KEYWORDS) {
        SportType::Running
    } else {
        // Default to running for safety with existing data
        SportType::Running
    }
}

/// Compute the external load for an activity.
///
/// `label` feeds the open-water detection for swims; `rpe` applies to
/// strength work only and defaults when absent.
#[must_use]
pub fn external_load(
    sport: &SportType,
    distance_miles: f64,
    elevation_gain_feet: f64,
    duration_minutes: f64,
    average_speed_mph: Option<f64>,
    label: &str,
    rpe: Option<f64>,
) -> ExternalLoad {
    match sport {
        SportType::Cycling => cycling_load(distance_miles, average_speed_mph, elevation_gain_feet),
        SportType::Swimming => swimming_load(distance_miles, label),
        SportType::Strength => strength_load(duration_minutes, rpe),
        SportType::Rest => ExternalLoad {
            equivalent_miles: 0.0,
            elevation_load_miles: 0.0,
            total_load_miles: 0.0,
            cycling_elevation_factor: None,
        },
        // Running, walking, and hiking share the running formulation
        SportType::Running | SportType::Walking | SportType::Hiking | SportType::Other(_) => {
            running_load(distance_miles, elevation_gain_feet)
        }
    }
}

fn running_load(distance_miles: f64, elevation_gain_feet: f64) -> ExternalLoad {
    let elevation_load_miles = elevation_gain_feet / load_model::RUNNING_ELEVATION_DIVISOR;
    ExternalLoad {
        equivalent_miles: round2(distance_miles),
        elevation_load_miles: round2(elevation_load_miles),
        total_load_miles: round2(distance_miles + elevation_load_miles),
        cycling_elevation_factor: None,
    }
}

fn cycling_load(
    distance_miles: f64,
    average_speed_mph: Option<f64>,
    elevation_gain_feet: f64,
) -> ExternalLoad {
    // Speed-based distance conversion accounting for cycling efficiency
    // relative to running energy expenditure
    let conversion_factor = match average_speed_mph {
        None => load_model::CYCLING_LEISURE_FACTOR,
        Some(mph) if mph <= load_model::CYCLING_LEISURE_MAX_MPH => {
            load_model::CYCLING_LEISURE_FACTOR
        }
        Some(mph) if mph <= load_model::CYCLING_MODERATE_MAX_MPH => {
            load_model::CYCLING_MODERATE_FACTOR
        }
        Some(mph) if mph <= load_model::CYCLING_VIGOROUS_MAX_MPH => {
            load_model::CYCLING_VIGOROUS_FACTOR
        }
        Some(_) => load_model::CYCLING_RACING_FACTOR,
    };

    let equivalent = distance_miles / conversion_factor;
    let elevation_load = elevation_gain_feet / load_model::CYCLING_ELEVATION_DIVISOR;

    ExternalLoad {
        equivalent_miles: round2(equivalent),
        elevation_load_miles: round2(elevation_load),
        total_load_miles: round2(equivalent + elevation_load),
        cycling_elevation_factor: Some(load_model::CYCLING_ELEVATION_DIVISOR),
    }
}

fn swimming_load(distance_miles: f64, label: &str) -> ExternalLoad {
    let lower = label.to_lowercase();
    let factor = if lower.contains("open water") || lower.contains("openwater") {
        load_model::SWIM_OPEN_WATER_FACTOR
    } else {
        load_model::SWIM_POOL_FACTOR
    };

    let equivalent = distance_miles * factor;

    ExternalLoad {
        equivalent_miles: round2(equivalent),
        elevation_load_miles: 0.0,
        total_load_miles: round2(equivalent),
        cycling_elevation_factor: None,
    }
}

fn strength_load(duration_minutes: f64, rpe: Option<f64>) -> ExternalLoad {
    let rpe = match rpe {
        Some(value) if (1.0..=10.0).contains(&value) => value,
        _ => load_model::STRENGTH_DEFAULT_RPE,
    };

    let equivalent =
        (duration_minutes / 60.0) * rpe * load_model::STRENGTH_CONVERSION_FACTOR;

    ExternalLoad {
        equivalent_miles: round2(equivalent),
        elevation_load_miles: 0.0,
        total_load_miles: round2(equivalent),
        cycling_elevation_factor: None,
    }
}
