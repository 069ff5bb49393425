// ABOUTME: Feature binner converting continuous fields to presentation buckets
// ABOUTME: 13-color speed gradient plus fixed-width half-open interval buckets for run aggregates
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feature binning.
//!
//! Continuous fields make poor map-layer legends, so speed becomes one of 13
//! gradient colors and the run aggregates become fixed-width half-open
//! intervals. Bin boundaries are computed from the post-filter retained set,
//! never per run.

use crate::models::{BinnedPoint, EnrichedPoint};
use std::fmt;
use std::sync::OnceLock;
use tracing::info;

/// Number of color stops in the speed gradient
pub const PALETTE_LEN: usize = 13;

/// Margin added to pace/duration extents before rounding to a multiple of 5
const INTERVAL_MARGIN: f64 = 5.0;

/// HSL color used to build the gradient ramps
#[derive(Debug, Clone, Copy)]
struct Hsl {
    hue: f64,
    saturation: f64,
    lightness: f64,
}

const BLUE: Hsl = Hsl { hue: 240.0, saturation: 1.0, lightness: 0.5 };
// W3C "green" is #008000, half the lightness of the pure primaries.
const GREEN: Hsl = Hsl { hue: 120.0, saturation: 1.0, lightness: 128.0 / 255.0 / 2.0 };
const YELLOW: Hsl = Hsl { hue: 60.0, saturation: 1.0, lightness: 0.5 };
const RED: Hsl = Hsl { hue: 0.0, saturation: 1.0, lightness: 0.5 };

impl Hsl {
    fn lerp(self, other: Self, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self {
            hue: mix(self.hue, other.hue),
            saturation: mix(self.saturation, other.saturation),
            lightness: mix(self.lightness, other.lightness),
        }
    }

    fn to_hex(self) -> String {
        let c = (1.0 - (2.0 * self.lightness - 1.0).abs()) * self.saturation;
        let h = self.hue.rem_euclid(360.0) / 60.0;
        let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
        let (r, g, b) = match h {
            h if h < 1.0 => (c, x, 0.0),
            h if h < 2.0 => (x, c, 0.0),
            h if h < 3.0 => (0.0, c, x),
            h if h < 4.0 => (0.0, x, c),
            h if h < 5.0 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = self.lightness - c / 2.0;
        let channel = |v: f64| ((v + m) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
    }
}

/// Inclusive linear ramp between two colors with `stops` stops.
fn ramp(from: Hsl, to: Hsl, stops: usize) -> Vec<Hsl> {
    (0..stops)
        .map(|i| from.lerp(to, i as f64 / (stops - 1) as f64))
        .collect()
}

/// The fixed low-to-high speed palette: blue→green→yellow→red, 13 stops.
///
/// Built once at first use; the joint color of each consecutive ramp pair is
/// dropped so no stop repeats.
#[must_use]
pub fn palette() -> &'static [String] {
    static PALETTE: OnceLock<Vec<String>> = OnceLock::new();
    PALETTE.get_or_init(|| {
        let mut stops = ramp(BLUE, GREEN, 5);
        stops.extend(ramp(GREEN, YELLOW, 5).into_iter().skip(1));
        stops.extend(ramp(YELLOW, RED, 5).into_iter().skip(1));
        stops.into_iter().map(Hsl::to_hex).collect()
    })
}

/// Equal-width partition of the retained speed range into palette bins.
///
/// Half-open bins, except the final bin which includes the upper edge so the
/// maximum speed still gets a color.
#[derive(Debug, Clone, Copy)]
pub struct SpeedScale {
    min: f64,
    max: f64,
}

impl SpeedScale {
    /// Build from the retained set's extremes.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Palette index for a speed; monotonic in speed.
    #[must_use]
    pub fn index(&self, speed: f64) -> usize {
        if self.max <= self.min {
            return 0;
        }
        let t = (speed - self.min) / (self.max - self.min);
        ((t * PALETTE_LEN as f64) as usize).min(PALETTE_LEN - 1)
    }

    /// Palette color for a speed.
    #[must_use]
    pub fn color(&self, speed: f64) -> &'static str {
        &palette()[self.index(speed)]
    }
}

/// A half-open numeric interval `[lower, upper)`.
///
/// Carried as bounds rather than free-form text so downstream consumers
/// never re-parse labels; `Display` renders the legend string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    /// Inclusive lower bound
    pub lower: f64,
    /// Exclusive upper bound
    pub upper: f64,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lower, self.upper)
    }
}

/// Fixed-width interval partition of one run-aggregate field.
#[derive(Debug, Clone, Copy)]
pub struct IntervalScale {
    start: f64,
    width: f64,
    count: usize,
}

impl IntervalScale {
    /// Partition `[round5(min - 5), round5(max + 5)]` into `width`-wide bins.
    ///
    /// The margins guarantee every observed value falls strictly inside the
    /// partition.
    #[must_use]
    pub fn with_margin(min: f64, max: f64, width: f64) -> Self {
        let start = round_base(min - INTERVAL_MARGIN, 5.0);
        let end = round_base(max + INTERVAL_MARGIN, 5.0);
        Self::spanning(start, end, width)
    }

    /// Partition `[floor(min), ceil(max)]` into unit-wide bins, no margin.
    #[must_use]
    pub fn integer_span(min: f64, max: f64) -> Self {
        Self::spanning(min.floor(), max.ceil(), 1.0)
    }

    fn spanning(start: f64, end: f64, width: f64) -> Self {
        let count = (((end - start) / width).round() as usize).max(1);
        Self { start, width, count }
    }

    /// Number of intervals in the partition
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Whether the partition is degenerate (never true by construction)
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The interval containing `value`, clamped to the partition's ends.
    #[must_use]
    pub fn bucket(&self, value: f64) -> Interval {
        let raw = ((value - self.start) / self.width).floor();
        let index = if raw < 0.0 {
            0
        } else {
            (raw as usize).min(self.count - 1)
        };
        Interval {
            lower: self.start + index as f64 * self.width,
            upper: self.start + (index + 1) as f64 * self.width,
        }
    }

    /// All intervals of the partition, in order.
    #[must_use]
    pub fn intervals(&self) -> Vec<Interval> {
        (0..self.count)
            .map(|i| Interval {
                lower: self.start + i as f64 * self.width,
                upper: self.start + (i + 1) as f64 * self.width,
            })
            .collect()
    }
}

/// Round to the nearest multiple of `base`.
fn round_base(value: f64, base: f64) -> f64 {
    base * (value / base).round()
}

/// Extremes of one field over the retained set
fn extent(points: &[EnrichedPoint], field: impl Fn(&EnrichedPoint) -> f64) -> (f64, f64) {
    points.iter().map(&field).fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(min, max), v| (min.min(v), max.max(v)),
    )
}

/// Bin the retained point set into output rows.
///
/// Speed becomes a palette color over the retained range; pace, distance,
/// and duration become interval labels with widths 0.5, 1, and 5.
#[must_use]
pub fn bin_points(points: &[EnrichedPoint]) -> Vec<BinnedPoint> {
    if points.is_empty() {
        return Vec::new();
    }

    let (min_speed, max_speed) = extent(points, |p| p.speed_m_per_s);
    let speed_scale = SpeedScale::new(min_speed, max_speed);

    let (pace_min, pace_max) = extent(points, |p| p.run_avg_pace);
    let pace_scale = IntervalScale::with_margin(pace_min, pace_max, 0.5);
    let (dist_min, dist_max) = extent(points, |p| p.run_distance);
    let distance_scale = IntervalScale::integer_span(dist_min, dist_max);
    let (dur_min, dur_max) = extent(points, |p| p.run_duration_min);
    let duration_scale = IntervalScale::with_margin(dur_min, dur_max, 5.0);

    info!(
        min_speed,
        max_speed,
        pace_bins = pace_scale.len(),
        distance_bins = distance_scale.len(),
        duration_bins = duration_scale.len(),
        "binning retained points"
    );

    points
        .iter()
        .map(|p| BinnedPoint {
            lat: p.latitude,
            lon: p.longitude,
            ele: p.elevation,
            timestamp: p.local_time.clone(),
            location: p.start_location.clone(),
            color: speed_scale.color(p.speed_m_per_s).to_owned(),
            run_avg_pace: pace_scale.bucket(p.run_avg_pace).to_string(),
            run_distance: distance_scale.bucket(p.run_distance).to_string(),
            run_duration: duration_scale.bucket(p.run_duration_min).to_string(),
            hour: p.hour_of_day,
            dow: p.day_of_week,
        })
        .collect()
}
