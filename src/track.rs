// ABOUTME: GPX track file parser producing ordered raw track points
// ABOUTME: Flattens all track segments in document order, validating required point fields
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GPX track parsing.
//!
//! One GPX file per run: `<trk>` → `<trkseg>` → `<trkpt lat=".." lon="..">`
//! with nested `<ele>` and `<time>` children, timestamps in UTC
//! `YYYY-MM-DDTHH:MM:SSZ`. All segments are concatenated in document order.
//! A missing file, malformed XML, or a point without its required fields is
//! a parse error; the caller treats that as fatal for the run, not for the
//! batch.

use crate::errors::{AppError, AppResult};
use crate::models::RawTrackPoint;
use chrono::NaiveDateTime;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;
use tracing::debug;

/// GPX timestamp format (UTC)
const GPX_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Default)]
struct PendingPoint {
    latitude: Option<f64>,
    longitude: Option<f64>,
    elevation: Option<f64>,
    timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointChild {
    None,
    Elevation,
    Time,
}

/// Parse one GPX file into a flat, ordered point sequence.
///
/// # Errors
///
/// Returns an error when the file is absent, the XML is malformed, or a
/// track point lacks lat/lon attributes or ele/time children.
pub fn parse_track_file(path: &Path) -> AppResult<Vec<RawTrackPoint>> {
    let xml = std::fs::read_to_string(path).map_err(|e| {
        AppError::not_found(format!("track file '{}'", path.display())).with_source(e)
    })?;
    let points = parse_track(&xml)
        .map_err(|e| AppError::invalid_format(format!("{}: {}", path.display(), e.message)))?;
    debug!(path = %path.display(), points = points.len(), "track file parsed");
    Ok(points)
}

/// Parse GPX document text into a flat, ordered point sequence.
///
/// # Errors
///
/// Returns an error for malformed XML or incomplete track points.
pub fn parse_track(xml: &str) -> AppResult<Vec<RawTrackPoint>> {
    let mut reader = Reader::from_str(xml);

    let mut points = Vec::new();
    let mut pending: Option<PendingPoint> = None;
    let mut child = PointChild::None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkpt" => {
                    let mut point = PendingPoint::default();
                    for attr in e.attributes() {
                        let attr = attr
                            .map_err(|e| AppError::invalid_format(format!("bad attribute: {e}")))?;
                        let value = attr.unescape_value().map_err(|e| {
                            AppError::invalid_format(format!("bad attribute value: {e}"))
                        })?;
                        match attr.key.as_ref() {
                            b"lat" => point.latitude = Some(parse_coordinate(&value, "lat")?),
                            b"lon" => point.longitude = Some(parse_coordinate(&value, "lon")?),
                            _ => {}
                        }
                    }
                    pending = Some(point);
                }
                b"ele" if pending.is_some() => child = PointChild::Elevation,
                b"time" if pending.is_some() => child = PointChild::Time,
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Some(point) = pending.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| AppError::invalid_format(format!("bad text node: {e}")))?;
                    match child {
                        PointChild::Elevation => {
                            point.elevation = Some(text.trim().parse().map_err(|_| {
                                AppError::invalid_format(format!("bad elevation '{text}'"))
                            })?);
                        }
                        PointChild::Time => {
                            let parsed = NaiveDateTime::parse_from_str(text.trim(), GPX_TIME_FORMAT)
                                .map_err(|e| {
                                    AppError::invalid_format(format!("bad timestamp '{text}': {e}"))
                                })?;
                            point.timestamp = Some(parsed);
                        }
                        PointChild::None => {}
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"trkpt" => {
                    let point = pending.take().ok_or_else(|| {
                        AppError::invalid_format("unmatched </trkpt>".to_owned())
                    })?;
                    points.push(finish_point(point)?);
                    child = PointChild::None;
                }
                b"ele" | b"time" => child = PointChild::None,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"trkpt" => {
                return Err(AppError::invalid_format(
                    "track point has no elevation/timestamp children",
                ));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(AppError::invalid_format(format!("malformed GPX: {e}")));
            }
        }
    }

    Ok(points)
}

fn parse_coordinate(value: &str, name: &str) -> AppResult<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::invalid_format(format!("bad {name} attribute '{value}'")))
}

fn finish_point(point: PendingPoint) -> AppResult<RawTrackPoint> {
    let missing = |field: &str| AppError::invalid_format(format!("track point missing {field}"));
    Ok(RawTrackPoint {
        latitude: point.latitude.ok_or_else(|| missing("lat"))?,
        longitude: point.longitude.ok_or_else(|| missing("lon"))?,
        elevation: point.elevation.ok_or_else(|| missing("ele"))?,
        timestamp: point.timestamp.ok_or_else(|| missing("time"))?.and_utc(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn gpx(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <gpx xmlns=\"http://www.topografix.com/GPX/1/1\" version=\"1.1\">\n\
             <trk><name>Running</name>{body}</trk></gpx>"
        )
    }

    const POINT_A: &str = "<trkpt lat=\"42.3601\" lon=\"-71.0589\">\
                           <ele>12.5</ele><time>2019-01-05T14:02:32Z</time></trkpt>";
    const POINT_B: &str = "<trkpt lat=\"42.3611\" lon=\"-71.0599\">\
                           <ele>13.0</ele><time>2019-01-05T14:02:42Z</time></trkpt>";

    #[test]
    fn test_single_segment() {
        let xml = gpx(&format!("<trkseg>{POINT_A}{POINT_B}</trkseg>"));
        let points = parse_track(&xml).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].latitude, 42.3601);
        assert_eq!(points[0].longitude, -71.0589);
        assert_eq!(points[0].elevation, 12.5);
        assert_eq!(
            points[0].timestamp,
            Utc.with_ymd_and_hms(2019, 1, 5, 14, 2, 32).unwrap()
        );
    }

    #[test]
    fn test_segments_concatenate_in_document_order() {
        let xml = gpx(&format!(
            "<trkseg>{POINT_B}</trkseg><trkseg>{POINT_A}</trkseg>"
        ));
        let points = parse_track(&xml).unwrap();
        assert_eq!(points.len(), 2);
        // Document order, not timestamp order.
        assert!(points[0].timestamp > points[1].timestamp);
    }

    #[test]
    fn test_missing_time_is_parse_error() {
        let xml = gpx("<trkseg><trkpt lat=\"1.0\" lon=\"2.0\"><ele>3.0</ele></trkpt></trkseg>");
        assert!(parse_track(&xml).is_err());
    }

    #[test]
    fn test_missing_lat_is_parse_error() {
        let xml = gpx(
            "<trkseg><trkpt lon=\"2.0\"><ele>3.0</ele>\
             <time>2019-01-05T14:02:32Z</time></trkpt></trkseg>",
        );
        assert!(parse_track(&xml).is_err());
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        // Unterminated start tag at EOF.
        assert!(parse_track("<gpx attr=").is_err());
        // Non-numeric latitude attribute.
        assert!(parse_track(&gpx("<trkseg><trkpt lat=\"x\" lon=\"2.0\"/></trkseg>")).is_err());
    }

    #[test]
    fn test_bad_timestamp_format_is_parse_error() {
        let xml = gpx(
            "<trkseg><trkpt lat=\"1.0\" lon=\"2.0\"><ele>3.0</ele>\
             <time>2019-01-05 14:02:32</time></trkpt></trkseg>",
        );
        assert!(parse_track(&xml).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = parse_track_file(Path::new("/nonexistent/run.gpx"));
        assert!(result.is_err());
    }
}
