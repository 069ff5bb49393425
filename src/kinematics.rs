// ABOUTME: Kinematics engine deriving instantaneous speed from consecutive GPS fixes
// ABOUTME: WGS84 geodesic distances, per-run start-location resolution, and local-time features
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kinematic enrichment.
//!
//! Walks each run's point sequence in order. The first point gets speed 0 and
//! triggers the run's single reverse-geocoding lookup; every later point gets
//! geodesic distance over elapsed seconds against the previously *emitted*
//! point. A zero-elapsed pair is a duplicate-timestamp GPS artifact and drops
//! the later point. Speed is never computed across a run boundary.

use crate::errors::{AppError, AppResult};
use crate::geocoding::{ReverseGeocoder, UNKNOWN_LOCATION};
use crate::models::{EnrichedPoint, RawTrackPoint, RunSummary};
use chrono::{Datelike, Timelike};
use chrono_tz::Tz;
use geographiclib_rs::{Geodesic, InverseGeodesic};
use tracing::{debug, warn};

/// Output timestamp format for the local-time field
const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Enriches raw track points with speed, location, and time features.
///
/// Holds the shared WGS84 ellipsoid model; it is immutable and has no
/// lifecycle beyond the pipeline run.
pub struct KinematicsEngine<'a> {
    geocoder: &'a dyn ReverseGeocoder,
    geod: Geodesic,
    timezone: Tz,
}

impl<'a> KinematicsEngine<'a> {
    /// Create an engine resolving start locations through `geocoder` and
    /// rendering timestamps in `timezone`.
    #[must_use]
    pub fn new(geocoder: &'a dyn ReverseGeocoder, timezone: Tz) -> Self {
        Self {
            geocoder,
            geod: Geodesic::wgs84(),
            timezone,
        }
    }

    /// Geodesic surface distance in meters between two fixes on the WGS84
    /// ellipsoid.
    ///
    /// # Errors
    ///
    /// Returns an error when either coordinate is non-finite or out of
    /// range; that signals corrupt track data, not expected GPS noise.
    pub fn geodesic_distance(&self, from: &RawTrackPoint, to: &RawTrackPoint) -> AppResult<f64> {
        validate_coordinate(from.latitude, from.longitude)?;
        validate_coordinate(to.latitude, to.longitude)?;
        let distance: f64 =
            self.geod
                .inverse(from.latitude, from.longitude, to.latitude, to.longitude);
        Ok(distance)
    }

    /// Enrich one run's ordered point sequence.
    ///
    /// # Errors
    ///
    /// Returns an error only for invalid coordinates; geocoding failures
    /// degrade to [`UNKNOWN_LOCATION`].
    pub async fn enrich_run(
        &self,
        run: &RunSummary,
        points: &[RawTrackPoint],
    ) -> AppResult<Vec<EnrichedPoint>> {
        let mut enriched = Vec::with_capacity(points.len());
        let mut previous: Option<&RawTrackPoint> = None;
        let mut start_location = String::new();
        let mut dropped_duplicates = 0usize;

        for point in points {
            let speed = match previous {
                None => {
                    start_location = self.resolve_start_location(point).await;
                    0.0
                }
                Some(prev) => {
                    let elapsed = (point.timestamp - prev.timestamp).num_seconds() as f64;
                    if elapsed == 0.0 {
                        // Duplicate-timestamp artifact: speed is undefined here.
                        dropped_duplicates += 1;
                        continue;
                    }
                    self.geodesic_distance(prev, point)? / elapsed
                }
            };

            let local = point.timestamp.with_timezone(&self.timezone);
            enriched.push(EnrichedPoint {
                latitude: point.latitude,
                longitude: point.longitude,
                elevation: point.elevation,
                local_time: local.format(LOCAL_TIME_FORMAT).to_string(),
                start_location: start_location.clone(),
                speed_m_per_s: speed,
                run_avg_pace: run.average_pace_minutes(),
                run_distance: run.distance,
                run_duration_min: run.duration_minutes(),
                hour_of_day: local.hour() as u8,
                day_of_week: local.weekday().num_days_from_monday() as u8,
            });
            previous = Some(point);
        }

        if dropped_duplicates > 0 {
            debug!(
                run_id = %run.id,
                dropped_duplicates, "dropped zero-elapsed track points"
            );
        }
        Ok(enriched)
    }

    async fn resolve_start_location(&self, point: &RawTrackPoint) -> String {
        match self
            .geocoder
            .reverse_geocode(point.latitude, point.longitude)
            .await
        {
            Ok(place) => place.label(),
            Err(e) => {
                warn!(error = %e, "start-location lookup failed");
                UNKNOWN_LOCATION.into()
            }
        }
    }
}

fn validate_coordinate(latitude: f64, longitude: f64) -> AppResult<()> {
    let in_range = latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude);
    if in_range {
        Ok(())
    } else {
        Err(AppError::invalid_input(format!(
            "invalid coordinate pair ({latitude}, {longitude})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoding::Place;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct StubGeocoder {
        place: Option<Place>,
        fail: bool,
    }

    #[async_trait]
    impl ReverseGeocoder for StubGeocoder {
        async fn reverse_geocode(&self, _lat: f64, _lon: f64) -> AppResult<Place> {
            if self.fail {
                return Err(AppError::external_service("stub", "down"));
            }
            Ok(self.place.clone().unwrap_or_default())
        }
    }

    fn boston_geocoder() -> StubGeocoder {
        StubGeocoder {
            place: Some(Place {
                locality: Some("Boston".into()),
                region: Some("MA".into()),
            }),
            fail: false,
        }
    }

    fn run() -> RunSummary {
        RunSummary {
            id: "r1".into(),
            start_date: chrono::NaiveDate::from_ymd_opt(2019, 1, 5)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            average_pace_seconds: 580.0,
            duration_seconds: 1810.0,
            distance: 3.11,
            track_file: "run1.gpx".into(),
        }
    }

    fn point(lat: f64, lon: f64, second: u32) -> RawTrackPoint {
        RawTrackPoint {
            latitude: lat,
            longitude: lon,
            elevation: 10.0,
            timestamp: Utc
                .with_ymd_and_hms(2019, 1, 5, 14, 0, second)
                .unwrap(),
        }
    }

    #[test]
    fn test_equatorial_degree_is_wgs84_arc() {
        let geocoder = boston_geocoder();
        let engine = KinematicsEngine::new(&geocoder, chrono_tz::UTC);
        let d = engine
            .geodesic_distance(&point(0.0, 0.0, 0), &point(0.0, 1.0, 0))
            .unwrap();
        // One degree along the equator on the WGS84 ellipsoid; a spherical
        // approximation would come out ~125 m short.
        assert!((d - 111_319.49).abs() < 0.1, "distance was {d}");
    }

    #[test]
    fn test_out_of_range_latitude_is_fatal() {
        let geocoder = boston_geocoder();
        let engine = KinematicsEngine::new(&geocoder, chrono_tz::UTC);
        let result = engine.geodesic_distance(&point(95.0, 0.0, 0), &point(0.0, 0.0, 0));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_first_point_speed_zero_and_location_reused() {
        let geocoder = boston_geocoder();
        let engine = KinematicsEngine::new(&geocoder, chrono_tz::America::New_York);
        let points = [point(42.36, -71.05, 0), point(42.361, -71.05, 10)];
        let enriched = engine.enrich_run(&run(), &points).await.unwrap();

        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].speed_m_per_s, 0.0);
        assert!(enriched[1].speed_m_per_s > 0.0);
        assert!(enriched.iter().all(|p| p.start_location == "Boston, MA"));
    }

    #[tokio::test]
    async fn test_hundred_meters_in_ten_seconds_is_ten_m_per_s() {
        let geocoder = boston_geocoder();
        let engine = KinematicsEngine::new(&geocoder, chrono_tz::UTC);
        // ~100 m due north along the equatorial meridian.
        let delta = 100.0 / 110_574.0;
        let points = [point(0.0, 0.0, 0), point(delta, 0.0, 10)];
        let enriched = engine.enrich_run(&run(), &points).await.unwrap();
        assert!(
            (enriched[1].speed_m_per_s - 10.0).abs() < 0.01,
            "speed was {}",
            enriched[1].speed_m_per_s
        );
    }

    #[tokio::test]
    async fn test_zero_elapsed_point_is_dropped() {
        let geocoder = boston_geocoder();
        let engine = KinematicsEngine::new(&geocoder, chrono_tz::UTC);
        let points = [
            point(42.36, -71.05, 0),
            point(42.3605, -71.05, 0), // duplicate timestamp
            point(42.361, -71.05, 10),
        ];
        let enriched = engine.enrich_run(&run(), &points).await.unwrap();
        assert_eq!(enriched.len(), 2);
        // The survivor's speed is measured against the first emitted point.
        assert_eq!(enriched[1].latitude, 42.361);
    }

    #[tokio::test]
    async fn test_geocoding_failure_degrades_to_unknown() {
        let geocoder = StubGeocoder {
            place: None,
            fail: true,
        };
        let engine = KinematicsEngine::new(&geocoder, chrono_tz::UTC);
        let enriched = engine
            .enrich_run(&run(), &[point(42.36, -71.05, 0)])
            .await
            .unwrap();
        assert_eq!(enriched[0].start_location, UNKNOWN_LOCATION);
    }

    #[tokio::test]
    async fn test_local_time_features() {
        let geocoder = boston_geocoder();
        let engine = KinematicsEngine::new(&geocoder, chrono_tz::America::New_York);
        let enriched = engine
            .enrich_run(&run(), &[point(42.36, -71.05, 0)])
            .await
            .unwrap();
        // 2019-01-05 14:00:00 UTC is 09:00 in New York, a Saturday (dow 5).
        assert_eq!(enriched[0].local_time, "2019-01-05 09:00:00");
        assert_eq!(enriched[0].hour_of_day, 9);
        assert_eq!(enriched[0].day_of_week, 5);
    }

    #[tokio::test]
    async fn test_run_aggregates_attached_to_every_point() {
        let geocoder = boston_geocoder();
        let engine = KinematicsEngine::new(&geocoder, chrono_tz::UTC);
        let points = [point(42.36, -71.05, 0), point(42.361, -71.05, 10)];
        let enriched = engine.enrich_run(&run(), &points).await.unwrap();
        for p in &enriched {
            assert!((p.run_avg_pace - 580.0 / 60.0).abs() < 1e-9);
            assert_eq!(p.run_distance, 3.11);
            assert!((p.run_duration_min - 1810.0 / 60.0).abs() < 1e-9);
        }
    }
}
