// ABOUTME: Global speed statistics and outlier filtering
// ABOUTME: Retains points strictly within one standard deviation of the mean speed
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outlier filtering.
//!
//! One global pass over all runs combined: points whose instantaneous speed
//! lies strictly inside `(mean - std, mean + std)` are "plausible running
//! speed"; everything else is GPS noise or a stationary pause. The threshold
//! is global by design; runs at systematically different paces are not
//! normalized separately.

use crate::models::EnrichedPoint;
use tracing::info;

/// Mean and sample standard deviation of instantaneous speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedStats {
    /// Mean speed in m/s
    pub mean: f64,
    /// Sample standard deviation (n-1 divisor) in m/s
    pub std: f64,
}

/// Compute speed statistics over the full enriched set.
///
/// Non-finite speeds (an upstream undefined value) are excluded from the
/// computation rather than counted as zero. Returns `None` when fewer than
/// two finite speeds remain, since the deviation is undefined there.
#[must_use]
pub fn speed_stats(points: &[EnrichedPoint]) -> Option<SpeedStats> {
    let speeds: Vec<f64> = points
        .iter()
        .map(|p| p.speed_m_per_s)
        .filter(|s| s.is_finite())
        .collect();
    if speeds.len() < 2 {
        return None;
    }

    let n = speeds.len() as f64;
    let mean = speeds.iter().sum::<f64>() / n;
    let variance = speeds.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(SpeedStats {
        mean,
        std: variance.sqrt(),
    })
}

/// Retain points strictly within one standard deviation of the mean speed.
///
/// Bounds come from the pre-filter full set, never recomputed per run.
#[must_use]
pub fn filter_outliers(points: Vec<EnrichedPoint>) -> Vec<EnrichedPoint> {
    let Some(stats) = speed_stats(&points) else {
        info!(total = points.len(), "too few points for outlier statistics");
        return Vec::new();
    };

    let (lower, upper) = (stats.mean - stats.std, stats.mean + stats.std);
    let total = points.len();
    let retained: Vec<EnrichedPoint> = points
        .into_iter()
        .filter(|p| p.speed_m_per_s.is_finite())
        .filter(|p| p.speed_m_per_s > lower && p.speed_m_per_s < upper)
        .collect();

    info!(
        total,
        retained = retained.len(),
        mean = stats.mean,
        std = stats.std,
        "speed outliers filtered"
    );
    retained
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_with_speed(speed: f64) -> EnrichedPoint {
        EnrichedPoint {
            latitude: 42.36,
            longitude: -71.05,
            elevation: 10.0,
            local_time: "2019-01-05 09:00:00".into(),
            start_location: "Boston, MA".into(),
            speed_m_per_s: speed,
            run_avg_pace: 9.6,
            run_distance: 3.11,
            run_duration_min: 30.2,
            hour_of_day: 9,
            day_of_week: 5,
        }
    }

    #[test]
    fn test_stats_mean_and_sample_std() {
        let points: Vec<_> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .into_iter()
            .map(point_with_speed)
            .collect();
        let stats = speed_stats(&points).unwrap();
        assert!((stats.mean - 5.0).abs() < 1e-12);
        // Sample variance of this set is 32/7.
        assert!((stats.std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_retained_points_respect_prefilter_bounds() {
        let speeds = [0.0, 2.5, 2.6, 2.7, 2.8, 3.0, 3.1, 25.0];
        let points: Vec<_> = speeds.into_iter().map(point_with_speed).collect();
        let stats = speed_stats(&points).unwrap();

        let retained = filter_outliers(points);
        assert!(!retained.is_empty());
        for p in &retained {
            assert!(p.speed_m_per_s > stats.mean - stats.std);
            assert!(p.speed_m_per_s < stats.mean + stats.std);
        }
        // The GPS spike is gone.
        assert!(retained.iter().all(|p| p.speed_m_per_s != 25.0));
    }

    #[test]
    fn test_bounds_are_strict() {
        // All speeds equal: std is 0 and the open interval is empty.
        let points: Vec<_> = std::iter::repeat(3.0).take(5).map(point_with_speed).collect();
        assert!(filter_outliers(points).is_empty());
    }

    #[test]
    fn test_non_finite_speeds_dropped_before_stats() {
        let mut points: Vec<_> = [2.9, 3.0, 3.1].into_iter().map(point_with_speed).collect();
        points.push(point_with_speed(f64::NAN));
        let stats = speed_stats(&points).unwrap();
        assert!((stats.mean - 3.0).abs() < 1e-12);
        let retained = filter_outliers(points);
        assert!(retained.iter().all(|p| p.speed_m_per_s.is_finite()));
    }

    #[test]
    fn test_single_point_yields_nothing() {
        assert!(filter_outliers(vec![point_with_speed(3.0)]).is_empty());
        assert!(speed_stats(&[point_with_speed(3.0)]).is_none());
    }
}
