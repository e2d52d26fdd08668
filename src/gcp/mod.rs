//! Ground control points
//!
//! `GcpList` is the in-memory editing model; `parser` reads and writes the
//! ODM `gcp_list.txt` format.

pub mod parser;

use std::fmt;

pub use parser::{load, save, GcpErrorKind};

pub const DEFAULT_PROJECTION: &str = "EPSG:4326";

#[derive(Debug, Clone, PartialEq)]
pub struct GcpPoint {
    /// Position in the list, 1-based
    pub id: usize,
    pub world_x: f64,
    pub world_y: f64,
    pub world_z: f64,
    pub image_x: f64,
    pub image_y: f64,
    pub filename: String,
    pub label: Option<String>,
}

impl GcpPoint {
    pub fn new(world: [f64; 3], image: [f64; 2], filename: &str, label: Option<&str>) -> Self {
        Self {
            id: 0,
            world_x: world[0],
            world_y: world[1],
            world_z: world[2],
            image_x: image[0],
            image_y: image[1],
            filename: filename.trim().to_string(),
            label: label
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        }
    }

    /// Like `new`, but rejects a filename or label the text format cannot hold
    pub fn checked(world: [f64; 3], image: [f64; 2], filename: &str, label: Option<&str>) -> Result<Self, GcpErrorKind> {
        let point = Self::new(world, image, filename, label);
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<(), GcpErrorKind> {
        if self.filename.is_empty() || self.filename.contains(char::is_whitespace) {
            return Err(GcpErrorKind::Whitespace {
                field: "filename",
                value: self.filename.clone(),
            });
        }
        match &self.label {
            Some(label) if label.contains(char::is_whitespace) => Err(GcpErrorKind::Whitespace {
                field: "gcp_name",
                value: label.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// True when both points describe the same measurement, ignoring IDs
    #[cfg(test)]
    pub fn same_as(&self, other: &GcpPoint) -> bool {
        GcpPoint { id: 0, ..self.clone() } == GcpPoint { id: 0, ..other.clone() }
    }
}

impl fmt::Display for GcpPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GCP {}", self.id)?;
        if let Some(label) = &self.label {
            write!(f, " ({})", label)?;
        }
        write!(
            f,
            ": ({:.2}, {:.2}, {:.2}) → {}",
            self.world_x, self.world_y, self.world_z, self.filename
        )
    }
}

/// Ordered GCP points with IDs kept dense (1..=N in list order)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GcpList {
    pub projection: Option<String>,
    points: Vec<GcpPoint>,
}

impl GcpList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projection(projection: &str) -> Self {
        Self {
            projection: Some(projection.to_string()),
            points: Vec::new(),
        }
    }

    /// Projection written on save
    pub fn projection_or_default(&self) -> &str {
        self.projection.as_deref().unwrap_or(DEFAULT_PROJECTION)
    }

    pub fn points(&self) -> &[GcpPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&GcpPoint> {
        id.checked_sub(1).and_then(|i| self.points.get(i))
    }

    /// Append a point and return its assigned ID
    pub fn push(&mut self, mut point: GcpPoint) -> usize {
        point.id = self.points.len() + 1;
        self.points.push(point);
        self.points.len()
    }

    /// Replace the values of point `id`, keeping its ID
    pub fn update(&mut self, id: usize, point: GcpPoint) -> bool {
        match id.checked_sub(1).and_then(|i| self.points.get_mut(i)) {
            Some(slot) => {
                *slot = GcpPoint { id, ..point };
                true
            }
            None => false,
        }
    }

    /// Remove point `id` and renumber the rest
    pub fn remove(&mut self, id: usize) -> Option<GcpPoint> {
        let index = id.checked_sub(1).filter(|i| *i < self.points.len())?;
        let removed = self.points.remove(index);
        self.renumber();
        Some(removed)
    }

    fn renumber(&mut self) {
        for (i, point) in self.points.iter_mut().enumerate() {
            point.id = i + 1;
        }
    }
}
