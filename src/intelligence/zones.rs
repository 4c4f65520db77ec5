// ABOUTME: Heart-rate zone time computation from streams or average-HR estimation
// ABOUTME: Zones are defined by heart-rate reserve bands at 50-100% in 10% steps

//! # Heart-Rate Zones
//!
//! Five zones defined over heart-rate reserve: 50-60%, 60-70%, 70-80%,
//! 80-90%, 90-100%. With a stream, each sample is bucketed directly; without
//! one, the distribution is estimated from the average heart rate (60% of
//! the time in the containing zone, 20% in each neighbor, clamped at the
//! band edges).

/// Seconds spent in each of the five HR zones
pub type ZoneTimes = [i64; 5];

/// Zone boundaries as (lower, upper) bpm pairs
fn zone_bounds(resting_hr: f64, max_hr: f64) -> [(f64, f64); 5] {
    let reserve = max_hr - resting_hr;
    [
        (resting_hr + 0.5 * reserve, resting_hr + 0.6 * reserve),
        (resting_hr + 0.6 * reserve, resting_hr + 0.7 * reserve),
        (resting_hr + 0.7 * reserve, resting_hr + 0.8 * reserve),
        (resting_hr + 0.8 * reserve, resting_hr + 0.9 * reserve),
        (resting_hr + 0.9 * reserve, max_hr),
    ]
}

/// Index of the zone containing `hr`, or `None` below zone 1
fn zone_index(hr: f64, bounds: &[(f64, f64); 5]) -> Option<usize> {
    if hr >= bounds[4].1 {
        return Some(4);
    }
    bounds
        .iter()
        .position(|&(lower, upper)| hr >= lower && hr < upper)
}

/// Bucket each stream sample into its zone. Samples are one second apart.
#[must_use]
pub fn from_stream(samples: &[f64], resting_hr: f64, max_hr: f64) -> ZoneTimes {
    let mut times = [0_i64; 5];
    if max_hr <= resting_hr {
        return times;
    }

    let bounds = zone_bounds(resting_hr, max_hr);
    for &hr in samples {
        if hr <= 0.0 {
            continue;
        }
        if let Some(index) = zone_index(hr, &bounds) {
            times[index] += 1;
        }
    }

    times
}

/// Estimate the zone distribution from the average heart rate: 60% of total
/// time in the containing zone and 20% in each adjacent zone, shifting to
/// 80/20 when the containing zone sits at an edge.
#[must_use]
pub fn estimate_from_average(
    avg_hr: f64,
    duration_minutes: f64,
    resting_hr: f64,
    max_hr: f64,
) -> ZoneTimes {
    let mut times = [0_i64; 5];
    if avg_hr <= 0.0 || duration_minutes <= 0.0 || max_hr <= resting_hr {
        return times;
    }

    let bounds = zone_bounds(resting_hr, max_hr);
    let primary = zone_index(avg_hr, &bounds).unwrap_or(0);
    let total_seconds = (duration_minutes * 60.0) as i64;

    let share = |fraction: f64| (total_seconds as f64 * fraction) as i64;

    match primary {
        0 => {
            times[0] = share(0.8);
            times[1] = share(0.2);
        }
        4 => {
            times[3] = share(0.2);
            times[4] = share(0.8);
        }
        zone => {
            times[zone - 1] = share(0.2);
            times[zone] = share(0.6);
            times[zone + 1] = share(0.2);
        }
    }

    times
}
