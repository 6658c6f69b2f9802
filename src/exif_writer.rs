//! # GPS EXIF Writer
//!
//! Scrive un blocco GPS EXIF dentro un file JPEG, in place.
//!
//! ## Responsabilità:
//! - Scansione dei segmenti JPEG fino allo Start Of Scan
//! - Merge dei tag EXIF esistenti con i nuovi tag GPS
//! - Codifica TIFF tramite `exif::experimental::Writer`
//! - Sostituzione del segmento APP1 e scrittura atomica del file
//!
//! ## Layout del segmento:
//! ```text
//! FF D8 | [APP0...] | FF E1 len "Exif\0\0" <TIFF> | altri segmenti | FF DA ... FF D9
//! ```
//! Il nuovo APP1 viene inserito subito dopo gli eventuali APP0 (JFIF), i
//! vecchi APP1 EXIF vengono rimossi. Gli APP1 non-EXIF (XMP) restano dove sono.

use crate::error::{Result, WaoError};
use chrono::{DateTime, Datelike, Timelike, Utc};
use exif::experimental::Writer;
use exif::{Context, Field, In, Rational, Tag, Value};
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::{debug, warn};

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const MARKER_SOI: u8 = 0xD8;
const MARKER_EOI: u8 = 0xD9;
const MARKER_SOS: u8 = 0xDA;
const MARKER_APP0: u8 = 0xE0;
const MARKER_APP1: u8 = 0xE1;

/// Tags whose values are offsets into the old TIFF block
const OFFSET_TAGS: &[Tag] = &[
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::TileOffsets,
    Tag::TileByteCounts,
];

/// One marker segment located in a JPEG byte stream
#[derive(Debug, Clone, Copy)]
struct Segment {
    marker: u8,
    start: usize,
    payload_start: usize,
    end: usize,
}

/// Header segments of a JPEG, up to (excluding) the scan data
#[derive(Debug)]
pub struct JpegLayout {
    segments: Vec<Segment>,
    tail_start: usize,
}

impl JpegLayout {
    /// Scans marker segments from SOI up to SOS or EOI
    pub fn scan(data: &[u8]) -> Result<Self> {
        if data.len() < 4 || data[0] != 0xFF || data[1] != MARKER_SOI {
            return Err(WaoError::UnsupportedFormat("missing JPEG SOI marker".to_string()));
        }

        let truncated = || WaoError::Validation("truncated JPEG header".to_string());
        let mut segments = Vec::new();
        let mut pos = 2;

        loop {
            if pos >= data.len() {
                return Err(truncated());
            }
            if data[pos] != 0xFF {
                return Err(WaoError::Validation(format!("expected JPEG marker at offset {}", pos)));
            }

            // fill bytes
            let mut marker_pos = pos;
            while marker_pos + 1 < data.len() && data[marker_pos + 1] == 0xFF {
                marker_pos += 1;
            }
            if marker_pos + 1 >= data.len() {
                return Err(truncated());
            }

            let marker = data[marker_pos + 1];
            let after_marker = marker_pos + 2;

            match marker {
                MARKER_SOS | MARKER_EOI => {
                    return Ok(Self { segments, tail_start: pos });
                }
                0x01 | 0xD0..=0xD7 => {
                    segments.push(Segment {
                        marker,
                        start: pos,
                        payload_start: after_marker,
                        end: after_marker,
                    });
                    pos = after_marker;
                }
                _ => {
                    if after_marker + 2 > data.len() {
                        return Err(truncated());
                    }
                    let length = u16::from_be_bytes([data[after_marker], data[after_marker + 1]]) as usize;
                    let end = after_marker + length;
                    if length < 2 || end > data.len() {
                        return Err(truncated());
                    }
                    segments.push(Segment {
                        marker,
                        start: pos,
                        payload_start: after_marker + 2,
                        end,
                    });
                    pos = end;
                }
            }
        }
    }

    fn is_exif(segment: &Segment, data: &[u8]) -> bool {
        segment.marker == MARKER_APP1 && data[segment.payload_start..segment.end].starts_with(EXIF_HEADER)
    }

    /// TIFF bytes of the first EXIF APP1 segment, if any
    pub fn exif_payload<'a>(&self, data: &'a [u8]) -> Option<&'a [u8]> {
        self.segments
            .iter()
            .find(|segment| Self::is_exif(segment, data))
            .map(|segment| &data[segment.payload_start + EXIF_HEADER.len()..segment.end])
    }

    /// Rebuilds the JPEG with `tiff` as its only EXIF segment
    pub fn splice(&self, data: &[u8], tiff: &[u8]) -> Result<Vec<u8>> {
        let segment_length = 2 + EXIF_HEADER.len() + tiff.len();
        if segment_length > u16::MAX as usize {
            return Err(WaoError::Validation(format!(
                "EXIF block of {} bytes does not fit in one APP1 segment",
                tiff.len()
            )));
        }

        let mut app1 = Vec::with_capacity(segment_length + 2);
        app1.extend_from_slice(&[0xFF, MARKER_APP1]);
        app1.extend_from_slice(&(segment_length as u16).to_be_bytes());
        app1.extend_from_slice(EXIF_HEADER);
        app1.extend_from_slice(tiff);

        let mut out = Vec::with_capacity(data.len() + app1.len());
        out.extend_from_slice(&data[..2]);

        let mut inserted = false;
        for segment in &self.segments {
            if Self::is_exif(segment, data) {
                continue;
            }
            if !inserted && segment.marker != MARKER_APP0 {
                out.extend_from_slice(&app1);
                inserted = true;
            }
            out.extend_from_slice(&data[segment.start..segment.end]);
        }
        if !inserted {
            out.extend_from_slice(&app1);
        }

        out.extend_from_slice(&data[self.tail_start..]);
        Ok(out)
    }
}

fn rational(num: u32, denom: u32) -> Rational {
    Rational { num, denom }
}

/// Degrees as `[deg/1, min/1, sec/10000]`
fn dms(value: f64) -> Vec<Rational> {
    let value = value.abs();
    let mut degrees = value.trunc() as u32;
    let minutes_f = (value - value.trunc()) * 60.0;
    let mut minutes = minutes_f.trunc() as u32;
    let mut seconds = ((minutes_f - minutes_f.trunc()) * 60.0 * 10_000.0).round() as u32;

    if seconds >= 60 * 10_000 {
        seconds -= 60 * 10_000;
        minutes += 1;
    }
    if minutes >= 60 {
        minutes -= 60;
        degrees += 1;
    }

    vec![rational(degrees, 1), rational(minutes, 1), rational(seconds, 10_000)]
}

fn gps_field(tag: Tag, value: Value) -> Field {
    Field { tag, ifd_num: In::PRIMARY, value }
}

fn ascii(text: &str) -> Value {
    Value::Ascii(vec![text.as_bytes().to_vec()])
}

/// GPS fields for a position, an altitude in meters and a UTC timestamp
pub fn gps_fields(latitude: f64, longitude: f64, altitude: f64, timestamp: DateTime<Utc>) -> Vec<Field> {
    vec![
        gps_field(Tag::GPSVersionID, Value::Byte(vec![2, 3, 0, 0])),
        gps_field(Tag::GPSLatitudeRef, ascii(if latitude < 0.0 { "S" } else { "N" })),
        gps_field(Tag::GPSLatitude, Value::Rational(dms(latitude))),
        gps_field(Tag::GPSLongitudeRef, ascii(if longitude < 0.0 { "W" } else { "E" })),
        gps_field(Tag::GPSLongitude, Value::Rational(dms(longitude))),
        gps_field(Tag::GPSAltitudeRef, Value::Byte(vec![if altitude < 0.0 { 1 } else { 0 }])),
        gps_field(
            Tag::GPSAltitude,
            Value::Rational(vec![rational((altitude.abs() * 100.0).round() as u32, 100)]),
        ),
        gps_field(
            Tag::GPSTimeStamp,
            Value::Rational(vec![
                rational(timestamp.hour(), 1),
                rational(timestamp.minute(), 1),
                rational(timestamp.second(), 1),
            ]),
        ),
        gps_field(
            Tag::GPSDateStamp,
            ascii(&format!("{:04}:{:02}:{:02}", timestamp.year(), timestamp.month(), timestamp.day())),
        ),
    ]
}

/// Existing primary-image fields worth carrying over
fn carried_fields(tiff: &[u8]) -> Vec<Field> {
    match exif::Reader::new().read_raw(tiff.to_vec()) {
        Ok(existing) => existing
            .fields()
            .filter(|field| field.ifd_num == In::PRIMARY)
            .filter(|field| field.tag.context() != Context::Gps)
            .filter(|field| !OFFSET_TAGS.contains(&field.tag))
            .filter(|field| !matches!(field.value, Value::Unknown(..)))
            .cloned()
            .collect(),
        Err(e) => {
            warn!("Ignoring unreadable EXIF block: {}", e);
            Vec::new()
        }
    }
}

fn encode<'a>(fields: impl Iterator<Item = &'a Field>) -> Result<Vec<u8>> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut buffer = Cursor::new(Vec::new());
    writer.write(&mut buffer, false)?;
    Ok(buffer.into_inner())
}

/// Adds `gps` to a JPEG byte stream, keeping the other EXIF tags it already carries
pub fn embed_gps(jpeg: &[u8], gps: &[Field]) -> Result<Vec<u8>> {
    let layout = JpegLayout::scan(jpeg)?;
    let carried = layout.exif_payload(jpeg).map(carried_fields).unwrap_or_default();

    let tiff = match encode(carried.iter().chain(gps.iter())) {
        Ok(tiff) => tiff,
        Err(e) if !carried.is_empty() => {
            warn!("Existing EXIF tags could not be re-encoded ({}), writing GPS block only", e);
            encode(gps.iter())?
        }
        Err(e) => return Err(e),
    };

    debug!("Encoded {} carried + {} GPS fields ({} bytes)", carried.len(), gps.len(), tiff.len());
    layout.splice(jpeg, &tiff)
}

/// Writes GPS data into the JPEG at `path`, replacing the file atomically
pub fn write_gps(path: &Path, latitude: f64, longitude: f64, altitude: f64, timestamp: DateTime<Utc>) -> Result<()> {
    let jpeg = std::fs::read(path).map_err(|e| WaoError::from_io(e, path))?;
    let updated = embed_gps(&jpeg, &gps_fields(latitude, longitude, altitude, timestamp))?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(&updated)?;
    staged.persist(path).map_err(|e| WaoError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use tempfile::TempDir;

    fn sample_jpeg() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 100, 50])));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Jpeg).unwrap();
        bytes.into_inner()
    }

    fn read_back(jpeg: &[u8]) -> exif::Exif {
        exif::Reader::new()
            .read_from_container(&mut Cursor::new(jpeg.to_vec()))
            .unwrap()
    }

    fn ascii_value(exif: &exif::Exif, tag: Tag) -> String {
        match &exif.get_field(tag, In::PRIMARY).unwrap().value {
            Value::Ascii(parts) => String::from_utf8_lossy(&parts[0]).into_owned(),
            other => panic!("{} is not ASCII: {:?}", tag, other),
        }
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    #[test]
    fn test_scan_rejects_non_jpeg() {
        assert!(matches!(
            JpegLayout::scan(b"\x89PNG\r\n\x1a\n"),
            Err(WaoError::UnsupportedFormat(_))
        ));
        assert!(JpegLayout::scan(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]).is_err());
    }

    #[test]
    fn test_dms_conversion() {
        let parts: Vec<(u32, u32)> = dms(-117.5).iter().map(|r| (r.num, r.denom)).collect();
        assert_eq!(parts, vec![(117, 1), (30, 1), (0, 10_000)]);

        // rounding carries into minutes and degrees
        let carry: Vec<(u32, u32)> = dms(10.999_999_999).iter().map(|r| (r.num, r.denom)).collect();
        assert_eq!(carry, vec![(11, 1), (0, 1), (0, 10_000)]);
    }

    #[test]
    fn test_embed_gps_round_trip() {
        let jpeg = sample_jpeg();
        let gps = gps_fields(-33.5, 151.25, 1.0, timestamp());
        let tagged = embed_gps(&jpeg, &gps).unwrap();

        let exif = read_back(&tagged);
        assert_eq!(ascii_value(&exif, Tag::GPSLatitudeRef), "S");
        assert_eq!(ascii_value(&exif, Tag::GPSLongitudeRef), "E");

        match &exif.get_field(Tag::GPSLatitude, In::PRIMARY).unwrap().value {
            Value::Rational(parts) => {
                assert_eq!(parts[0].to_f64(), 33.0);
                assert_eq!(parts[1].to_f64(), 30.0);
            }
            other => panic!("unexpected latitude value {:?}", other),
        }

        assert_eq!(ascii_value(&exif, Tag::GPSDateStamp), "2024:05:06");

        // still a decodable image
        image::load_from_memory_with_format(&tagged, ImageFormat::Jpeg).unwrap();
    }

    #[test]
    fn test_retagging_replaces_gps_and_keeps_other_tags() {
        let jpeg = sample_jpeg();
        let mut first = gps_fields(10.0, 20.0, 1.0, timestamp());
        first.push(Field {
            tag: Tag::Artist,
            ifd_num: In::PRIMARY,
            value: ascii("someone"),
        });
        let once = embed_gps(&jpeg, &first).unwrap();
        let twice = embed_gps(&once, &gps_fields(-10.0, 20.0, 1.0, timestamp())).unwrap();

        let layout = JpegLayout::scan(&twice).unwrap();
        let exif_segments = layout
            .segments
            .iter()
            .filter(|segment| JpegLayout::is_exif(segment, &twice))
            .count();
        assert_eq!(exif_segments, 1);

        let exif = read_back(&twice);
        assert_eq!(ascii_value(&exif, Tag::GPSLatitudeRef), "S");
        assert_eq!(ascii_value(&exif, Tag::Artist), "someone");
    }

    #[test]
    fn test_write_gps_in_place() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("photo_web_geo.jpg");
        std::fs::write(&path, sample_jpeg()).unwrap();

        write_gps(&path, 33.788, -117.843, 1.0, timestamp()).unwrap();

        let exif = read_back(&std::fs::read(&path).unwrap());
        assert_eq!(ascii_value(&exif, Tag::GPSLongitudeRef), "W");
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_gps_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = write_gps(&temp.path().join("gone.jpg"), 0.0, 0.0, 1.0, timestamp());
        assert!(matches!(result, Err(WaoError::NotFound(_))));
    }
}
