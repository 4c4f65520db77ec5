// ABOUTME: Banister TRIMP computation from average heart rate or full HR streams
// ABOUTME: Stream form distributes duration per sample and falls back to the average form

//! # Banister TRIMP
//!
//! Internal-load estimation using the Banister exponential formulation:
//! `TRIMP = duration x HRR x 0.64 x e^(k.HRR)` with the gender-specific
//! exponent coefficient. When a heart-rate stream is available and the
//! athlete is enrolled for enhanced TRIMP, the formula is evaluated per
//! sample; streams with too many invalid samples fall back to the average
//! form.

use crate::constants::trimp as coefficients;
use crate::models::{round2, Gender, TrimpMethod};
use tracing::{debug, warn};

/// TRIMP computation outcome, recording the method actually used
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimpResult {
    /// TRIMP value rounded to 2 decimals
    pub value: f64,
    /// Method that produced the value
    pub method: TrimpMethod,
    /// Stream sample count when the stream form was used
    pub sample_count: usize,
}

/// Gender-specific exponent coefficient
#[must_use]
pub const fn gender_coefficient(gender: Gender) -> f64 {
    match gender {
        Gender::Male => coefficients::K_MALE,
        Gender::Female => coefficients::K_FEMALE,
    }
}

/// Heart-rate reserve fraction, clamped to [0, 1]
#[must_use]
pub fn heart_rate_reserve(hr: f64, resting_hr: f64, max_hr: f64) -> f64 {
    if max_hr <= resting_hr {
        return 0.0;
    }
    ((hr - resting_hr) / (max_hr - resting_hr)).clamp(0.0, 1.0)
}

/// Compute TRIMP from the average heart rate
#[must_use]
pub fn from_average(
    duration_minutes: f64,
    avg_hr: f64,
    resting_hr: f64,
    max_hr: f64,
    gender: Gender,
) -> f64 {
    if duration_minutes <= 0.0 || avg_hr <= 0.0 || resting_hr <= 0.0 || max_hr <= resting_hr {
        return 0.0;
    }

    let k = gender_coefficient(gender);
    let hrr = heart_rate_reserve(avg_hr, resting_hr, max_hr);
    let value = duration_minutes * hrr * coefficients::BASE_COEFFICIENT * (k * hrr).exp();

    sanitize(value)
}

/// Compute TRIMP from a heart-rate stream, distributing the total duration
/// evenly across samples. Falls back to the average form when fewer than
/// half the samples are usable.
#[must_use]
pub fn from_stream(
    duration_minutes: f64,
    samples: &[f64],
    resting_hr: f64,
    max_hr: f64,
    gender: Gender,
) -> TrimpResult {
    if duration_minutes <= 0.0
        || samples.is_empty()
        || resting_hr <= 0.0
        || max_hr <= resting_hr
    {
        return TrimpResult {
            value: 0.0,
            method: TrimpMethod::Average,
            sample_count: 0,
        };
    }

    let k = gender_coefficient(gender);
    let duration_per_sample = duration_minutes / samples.len() as f64;

    let mut total = 0.0;
    let mut valid = 0_usize;
    let mut hr_sum = 0.0;

    for &hr in samples {
        // Physiologically implausible samples are dropped, not clamped
        if hr <= 0.0 || !(30.0..=250.0).contains(&hr) {
            continue;
        }

        let hrr = heart_rate_reserve(hr, resting_hr, max_hr);
        total += duration_per_sample * hrr * coefficients::BASE_COEFFICIENT * (k * hrr).exp();
        valid += 1;
        hr_sum += hr;
    }

    if valid == 0 {
        warn!("No valid heart rate samples in stream; TRIMP is zero");
        return TrimpResult {
            value: 0.0,
            method: TrimpMethod::Average,
            sample_count: 0,
        };
    }

    let valid_fraction = valid as f64 / samples.len() as f64;
    if valid_fraction < coefficients::MIN_VALID_SAMPLE_FRACTION {
        let avg_hr = hr_sum / valid as f64;
        warn!(
            "Only {valid}/{} stream samples usable; falling back to average form",
            samples.len()
        );
        return TrimpResult {
            value: from_average(duration_minutes, avg_hr, resting_hr, max_hr, gender),
            method: TrimpMethod::Average,
            sample_count: 0,
        };
    }

    debug!(
        "Stream TRIMP: {valid}/{} samples, {duration_per_sample:.4} min/sample",
        samples.len()
    );

    TrimpResult {
        value: sanitize(total),
        method: TrimpMethod::Stream,
        sample_count: samples.len(),
    }
}

/// Guard against NaN/negative/infinite accumulations before persistence
fn sanitize(value: f64) -> f64 {
    if !value.is_finite() || value < 0.0 {
        return 0.0;
    }
    round2(value)
}
