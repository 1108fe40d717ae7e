use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use super::dates::DateMode;
use super::fonts::FontSizes;
use super::template::Dimensions;

/// Width of a string as it will be drawn.
pub trait TextMeasure {
    fn text_width(&self, text: &str) -> f32;
}

/// Template pixel coordinates: origin top-left, `x` is the left edge of the
/// text and `y` its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Positions {
    pub name: Point,
    pub start_date: Point,
    pub end_date: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LayoutMode {
    /// Name drawn at a calibrated point, whatever its length.
    Fixed { name: Point },
    /// Name centered between `left` and `right` by its measured width.
    Centered { left: f32, right: f32, name_y: f32 },
}

/// Placement and typography for one template. Recalibrating for new artwork
/// means editing this data, usually through a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(flatten)]
    pub mode: LayoutMode,
    pub start_date: Point,
    pub end_date: Point,
    #[serde(default)]
    pub font_sizes: FontSizes,
    #[serde(default)]
    pub date_mode: DateMode,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::centered_default()
    }
}

impl LayoutConfig {
    /// Name centered on the underline of the 1056x816 artwork, dates on
    /// their blanks, long date format.
    pub fn centered_default() -> Self {
        Self {
            mode: LayoutMode::Centered {
                left: 150.0,
                right: 950.0,
                name_y: 416.0,
            },
            start_date: Point::new(345.0, 539.0),
            end_date: Point::new(625.0, 539.0),
            font_sizes: FontSizes {
                name: 36.0,
                date: 22.0,
            },
            date_mode: DateMode::Long,
        }
    }

    /// Absolute coordinates hand-tuned against the 1056x816 artwork.
    pub fn fixed_calibrated() -> Self {
        Self {
            mode: LayoutMode::Fixed {
                name: Point::new(405.0, 416.0),
            },
            start_date: Point::new(345.0, 539.0),
            end_date: Point::new(625.0, 539.0),
            font_sizes: FontSizes {
                name: 28.0,
                date: 18.0,
            },
            date_mode: DateMode::NumericDmy,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read layout {}: {}", path.display(), e))?;
        let config = serde_json::from_str(&raw)
            .map_err(|e| format!("invalid layout {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Places the name (already in its drawn form) and both dates.
    pub fn compute(&self, template: Dimensions, name: &str, measure: &dyn TextMeasure) -> Positions {
        let name_point = match self.mode {
            LayoutMode::Fixed { name } => name,
            LayoutMode::Centered { left, right, name_y } => {
                Point::new(centered_x(left, right, measure.text_width(name)), name_y)
            }
        };

        let positions = Positions {
            name: name_point,
            start_date: self.start_date,
            end_date: self.end_date,
        };

        for (label, point) in [
            ("name", positions.name),
            ("start date", positions.start_date),
            ("end date", positions.end_date),
        ] {
            if !inside(template, point) {
                warn!(
                    "{} position ({}, {}) falls outside the {}x{} template",
                    label, point.x, point.y, template.width, template.height
                );
            }
        }

        positions
    }
}

/// Left edge that centers `width` between the bounds. Text wider than the
/// span starts at `left`.
pub fn centered_x(left: f32, right: f32, width: f32) -> f32 {
    let span = right - left;
    if width > span {
        return left;
    }
    left + (span - width) / 2.0
}

fn inside(template: Dimensions, point: Point) -> bool {
    point.x >= 0.0
        && point.y >= 0.0
        && point.x <= template.width as f32
        && point.y <= template.height as f32
}
