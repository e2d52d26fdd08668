//! ODM GCP text format
//!
//! ```text
//! EPSG:32612                      optional projection line
//! # comment
//! geo_x geo_y geo_z im_x im_y filename [gcp_name]
//! ```
//!
//! Reading accepts any whitespace between fields; writing uses tabs.

use anyhow::{Context, Result};
use std::path::Path;

use super::{GcpList, GcpPoint, DEFAULT_PROJECTION};

const NUMERIC_FIELDS: [&str; 5] = ["geo_x", "geo_y", "geo_z", "im_x", "im_y"];

const HEADER_COMMENTS: [&str; 4] = [
    "# GCP file generated by odm-frontend",
    "# Compatible with OpenDroneMap/WebODM",
    "# Format: geo_x geo_y geo_z im_x im_y filename [gcp_name]",
    "# Fields separated by tabs",
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GcpErrorKind {
    #[error("invalid number {value:?} for {field}")]
    InvalidNumber { field: &'static str, value: String },

    #[error(
        "incomplete GCP data: missing pixel coordinates (im_x im_y) and image filename; \
         expected geo_x geo_y geo_z im_x im_y filename [gcp_name], \
         e.g. 544256.7 5320919.9 5 3044 2622 IMG_0525.jpg GCP01"
    )]
    Incomplete,

    #[error("expected 6+ fields (geo_x geo_y geo_z im_x im_y filename), got {0}")]
    FieldCount(usize),

    #[error("{field} {value:?} is empty or contains whitespace, which separates fields")]
    Whitespace { field: &'static str, value: String },
}

/// A rejected line; parsing continues past it
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("line {line}: {kind} (found: {text})")]
pub struct GcpLineError {
    /// 1-based line number in the file
    pub line: usize,
    pub text: String,
    pub kind: GcpErrorKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedGcp {
    pub list: GcpList,
    pub errors: Vec<GcpLineError>,
}

pub fn is_projection_line(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("+proj=") || line.starts_with("EPSG:") || line.to_uppercase().contains("UTM")
}

pub fn parse(content: &str) -> ParsedGcp {
    let lines: Vec<&str> = content.lines().collect();

    let (projection, first_data) = match lines.first() {
        Some(first) if is_projection_line(first) => (first.trim().to_string(), 1),
        _ => (DEFAULT_PROJECTION.to_string(), 0),
    };

    let mut parsed = ParsedGcp {
        list: GcpList::with_projection(&projection),
        errors: Vec::new(),
    };

    for (index, raw) in lines.iter().enumerate().skip(first_data) {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_record(line) {
            Ok(point) => {
                parsed.list.push(point);
            }
            Err(kind) => {
                let error = GcpLineError {
                    line: index + 1,
                    text: line.to_string(),
                    kind,
                };
                tracing::debug!("Skipping GCP {}", error);
                parsed.errors.push(error);
            }
        }
    }

    parsed
}

fn parse_record(line: &str) -> Result<GcpPoint, GcpErrorKind> {
    let fields: Vec<&str> = line.split_whitespace().collect();

    if fields.len() >= 6 {
        let mut numbers = [0.0f64; 5];
        for (i, field) in NUMERIC_FIELDS.into_iter().enumerate() {
            numbers[i] = fields[i].parse().map_err(|_| GcpErrorKind::InvalidNumber {
                field,
                value: fields[i].to_string(),
            })?;
        }
        let label = fields.get(6).copied();
        return Ok(GcpPoint::new(
            [numbers[0], numbers[1], numbers[2]],
            [numbers[3], numbers[4]],
            fields[5],
            label,
        ));
    }

    // Legacy "name x y z" lines carry no pixel coordinates
    if fields.len() == 4 && fields[1..].iter().all(|f| f.parse::<f64>().is_ok()) {
        return Err(GcpErrorKind::Incomplete);
    }

    Err(GcpErrorKind::FieldCount(fields.len()))
}

pub fn serialize(list: &GcpList) -> String {
    let mut out = String::new();
    out.push_str(list.projection_or_default());
    out.push('\n');

    for comment in HEADER_COMMENTS {
        out.push_str(comment);
        out.push('\n');
    }

    for point in list.points() {
        let mut fields = vec![
            point.world_x.to_string(),
            point.world_y.to_string(),
            point.world_z.to_string(),
            point.image_x.to_string(),
            point.image_y.to_string(),
            point.filename.clone(),
        ];
        if let Some(label) = point.label.as_ref().filter(|l| !l.is_empty()) {
            fields.push(label.clone());
        }
        out.push_str(&fields.join("\t"));
        out.push('\n');
    }

    out
}

pub fn load(path: &Path) -> Result<ParsedGcp> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read GCP file {}", path.display()))?;
    Ok(parse(&content))
}

/// Refuses points that would not read back as written
pub fn save(list: &GcpList, path: &Path) -> Result<()> {
    for point in list.points() {
        point
            .validate()
            .with_context(|| format!("GCP {} cannot be saved", point.id))?;
    }
    std::fs::write(path, serialize(list))
        .with_context(|| format!("Failed to write GCP file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_record_with_label() {
        let parsed = parse("EPSG:32612\n544256.7 5320919.9 5 3044 2622 IMG_0525.jpg GCP01\n");

        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.list.projection.as_deref(), Some("EPSG:32612"));
        assert_eq!(parsed.list.len(), 1);

        let point = parsed.list.get(1).unwrap();
        assert_eq!(point.id, 1);
        assert_eq!((point.world_x, point.world_y, point.world_z), (544256.7, 5320919.9, 5.0));
        assert_eq!((point.image_x, point.image_y), (3044.0, 2622.0));
        assert_eq!(point.filename, "IMG_0525.jpg");
        assert_eq!(point.label.as_deref(), Some("GCP01"));
    }

    #[test]
    fn test_five_fields_rejected() {
        let parsed = parse("EPSG:32612\n544256.7\t5320919.9\t5\tIMG_0525.jpg\n");
        assert!(parsed.list.is_empty());
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].line, 2);
        assert_eq!(parsed.errors[0].kind, GcpErrorKind::FieldCount(4));
    }

    #[test]
    fn test_four_numeric_fields_are_incomplete() {
        let parsed = parse("GCP01 544256.7 5320919.9 5\n");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].kind, GcpErrorKind::Incomplete);
        assert_eq!(parsed.errors[0].line, 1);
        assert!(parsed.errors[0].to_string().contains("missing pixel coordinates"));
    }

    #[test]
    fn test_short_lines_are_field_count_errors() {
        let parsed = parse("EPSG:4326\n1\n1 2\n1 2 3\nGCP01 x y z\n1 2 3 4 5\n");
        let kinds: Vec<GcpErrorKind> = parsed.errors.iter().map(|e| e.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                GcpErrorKind::FieldCount(1),
                GcpErrorKind::FieldCount(2),
                GcpErrorKind::FieldCount(3),
                GcpErrorKind::FieldCount(4),
                GcpErrorKind::FieldCount(5),
            ]
        );
    }

    #[test]
    fn test_bad_number_skips_line_and_continues() {
        let parsed = parse("EPSG:4326\n1 2 3 abc 5 a.jpg\n1 2 3 4 5 b.jpg\n");
        assert_eq!(parsed.list.len(), 1);
        assert_eq!(parsed.list.get(1).unwrap().filename, "b.jpg");
        assert_eq!(
            parsed.errors[0].kind,
            GcpErrorKind::InvalidNumber {
                field: "im_x",
                value: "abc".to_string()
            }
        );
        assert_eq!(parsed.errors[0].line, 2);
    }

    #[test]
    fn test_no_projection_line_defaults() {
        let parsed = parse("# header\n\n1 2 3 4 5 a.jpg\n");
        assert_eq!(parsed.list.projection.as_deref(), Some("EPSG:4326"));
        assert_eq!(parsed.list.len(), 1);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_projection_heuristic() {
        assert!(is_projection_line("+proj=utm +zone=12 +datum=WGS84"));
        assert!(is_projection_line("EPSG:32612"));
        assert!(is_projection_line("WGS84 utm zone 12N"));
        assert!(!is_projection_line("1 2 3 4 5 a.jpg"));
        assert!(!is_projection_line("epsg:4326"));
    }

    #[test]
    fn test_empty_file() {
        let parsed = parse("");
        assert!(parsed.list.is_empty());
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.list.projection_or_default(), "EPSG:4326");
    }

    #[test]
    fn test_extra_fields_ignored() {
        let parsed = parse("1 2 3 4 5 a.jpg name extra more\n");
        assert_eq!(parsed.list.get(1).unwrap().label.as_deref(), Some("name"));
    }

    #[test]
    fn test_serialize_format() {
        let mut list = GcpList::new();
        list.push(GcpPoint::new([544256.7, 5320919.9, 5.0], [3044.0, 2622.5], "IMG_0525.jpg", Some("GCP01")));
        list.push(GcpPoint::new([1.5, 2.0, 3.0], [4.0, 5.0], "IMG_0526.jpg", None));

        let text = serialize(&list);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "EPSG:4326");
        assert!(lines[1..5].iter().all(|l| l.starts_with('#')));
        assert_eq!(lines[5], "544256.7\t5320919.9\t5\t3044\t2622.5\tIMG_0525.jpg\tGCP01");
        assert_eq!(lines[6], "1.5\t2\t3\t4\t5\tIMG_0526.jpg");
    }

    #[test]
    fn test_round_trip() {
        let mut list = GcpList::with_projection("+proj=utm +zone=12 +datum=WGS84 +units=m +no_defs");
        list.push(GcpPoint::new([544256.7, 5320919.9, 5.0], [3044.0, 2622.0], "IMG_0525.jpg", Some("GCP01")));
        list.push(GcpPoint::new([-0.000123, 1e7, -12.25], [0.5, 4000.0], "DJI_0001.JPG", None));
        list.push(GcpPoint::new([544300.1, 5320950.3, 7.75], [10.0, 20.0], "IMG_0530.jpg", Some("cp-3")));
        list.remove(1);
        list.push(GcpPoint::new([0.1, 0.2, 0.3], [1.0, 2.0], "IMG_0600.jpg", Some("last")));

        let parsed = parse(&serialize(&list));
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.list.projection, list.projection);
        assert_eq!(parsed.list.len(), list.len());
        for (a, b) in parsed.list.points().iter().zip(list.points()) {
            assert!(a.same_as(b), "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gcp_list.txt");

        let mut list = GcpList::with_projection("EPSG:32612");
        list.push(GcpPoint::new([1.0, 2.0, 3.0], [4.0, 5.0], "a.jpg", None));
        save(&list, &path).unwrap();

        let parsed = load(&path).unwrap();
        assert_eq!(parsed.list, list);
        assert!(load(&dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn test_save_rejects_whitespace_in_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gcp_list.txt");

        let mut list = GcpList::new();
        list.push(GcpPoint::new([1.0, 2.0, 3.0], [4.0, 5.0], "IMG 0525.jpg", Some("North corner")));
        assert!(save(&list, &path).is_err());
        assert!(!path.exists());
    }
}
