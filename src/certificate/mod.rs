// Certificate rendering: template lookup, font fallback, layout, PNG and PDF output.
pub mod bitmap_font;
pub mod dates;
pub mod fonts;
pub mod layout;
pub mod raster;
pub mod template;
pub mod vector;

pub use dates::{format_date, DateMode, DateValue};
pub use fonts::{FontCandidate, FontHandle, FontOrigin, FontSizes, ResolvedFonts};
pub use layout::{LayoutConfig, LayoutMode, Point, Positions, TextMeasure};
pub use template::{locate, Dimensions, TemplateAsset};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::downloads::{DownloadLog, DownloadLogEntry};
use crate::roster::StudentRecord;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("certificate template not found (tried: {})", display_paths(.0))]
    TemplateNotFound(Vec<PathBuf>),
    #[error("student record is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("failed to encode certificate: {0}")]
    Encoding(String),
    #[error("failed to write certificate: {0}")]
    Io(#[from] std::io::Error),
}

impl CertificateError {
    /// Stable failure kind for logs and API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            CertificateError::TemplateNotFound(_) => "TemplateNotFound",
            CertificateError::MissingField(_) => "MissingField",
            CertificateError::Encoding(_) | CertificateError::Io(_) => "EncodingError",
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pdf,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Png => "png",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "png" => Ok(OutputFormat::Png),
            other => Err(format!("unknown certificate format: {}", other)),
        }
    }
}

/// RGB ink, written as `#rrggbb` in layout files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ink(pub [u8; 3]);

impl Ink {
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim().trim_start_matches('#');
        if s.len() != 6 || !s.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
        Some(Ink([channel(0)?, channel(2)?, channel(4)?]))
    }

    pub fn unit_rgb(self) -> (f32, f32, f32) {
        let [r, g, b] = self.0;
        (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }
}

impl Serialize for Ink {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let [r, g, b] = self.0;
        serializer.serialize_str(&format!("#{:02x}{:02x}{:02x}", r, g, b))
    }
}

impl<'de> Deserialize<'de> for Ink {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ink::from_hex(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color: {}", raw)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateStyle {
    pub name_color: Ink,
    pub date_color: Ink,
    pub footer_color: Ink,
    /// Resolution recorded in PNG metadata.
    pub dpi: u32,
}

impl Default for CertificateStyle {
    fn default() -> Self {
        Self {
            name_color: Ink([0x1a, 0x36, 0x5d]),
            date_color: Ink([0x2d, 0x37, 0x48]),
            footer_color: Ink([0, 0, 0]),
            dpi: 300,
        }
    }
}

/// Everything needed to build a generator.
#[derive(Debug, Clone)]
pub struct CertificateConfig {
    pub template_candidates: Vec<PathBuf>,
    pub font_candidates: Vec<FontCandidate>,
    pub layout: LayoutConfig,
    pub style: CertificateStyle,
    pub output_dir: PathBuf,
    pub default_format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCertificate {
    pub path: PathBuf,
    pub filename: String,
    pub format: OutputFormat,
}

/// `certificate_{id}_{name}` plus `_HQ.png` or `.pdf`. Both parts keep only
/// ASCII alphanumerics, `-` and `_`; spaces become `_`.
pub fn certificate_filename(record: &StudentRecord, format: OutputFormat) -> String {
    let id = sanitize(&record.sixerclass_id);
    let name = sanitize(&record.student_name);
    match format {
        OutputFormat::Png => format!("certificate_{}_{}_HQ.png", id, name),
        OutputFormat::Pdf => format!("certificate_{}_{}.pdf", id, name),
    }
}

fn sanitize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Rejects records that cannot produce a meaningful certificate.
pub fn validate(record: &StudentRecord) -> Result<(), CertificateError> {
    let fields = [
        ("sixerclass_id", record.sixerclass_id.trim().is_empty()),
        ("student_name", record.student_name.trim().is_empty()),
        ("batch_number", record.batch_number.trim().is_empty()),
        ("batch_start_date", record.batch_start_date.is_blank()),
        ("batch_end_date", record.batch_end_date.is_blank()),
    ];
    match fields.iter().find(|(_, missing)| *missing) {
        Some((field, _)) => Err(CertificateError::MissingField(*field)),
        None => Ok(()),
    }
}

pub struct CertificateGenerator {
    template: TemplateAsset,
    fonts: ResolvedFonts,
    layout: LayoutConfig,
    style: CertificateStyle,
    output_dir: PathBuf,
    downloads: Option<Arc<DownloadLog>>,
}

impl CertificateGenerator {
    pub fn new(
        template: TemplateAsset,
        fonts: ResolvedFonts,
        layout: LayoutConfig,
        style: CertificateStyle,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            template,
            fonts,
            layout,
            style,
            output_dir,
            downloads: None,
        }
    }

    /// Locates the template and resolves fonts once. Fails when no template
    /// candidate exists.
    pub fn from_config(config: &CertificateConfig) -> Result<Self, CertificateError> {
        let template = TemplateAsset::locate_and_load(&config.template_candidates)?;
        let fonts = fonts::resolve(&config.font_candidates, config.layout.font_sizes);
        Ok(Self::new(
            template,
            fonts,
            config.layout.clone(),
            config.style.clone(),
            config.output_dir.clone(),
        ))
    }

    pub fn with_download_log(mut self, log: Arc<DownloadLog>) -> Self {
        self.downloads = Some(log);
        self
    }

    pub fn template(&self) -> &TemplateAsset {
        &self.template
    }

    pub fn fonts(&self) -> &ResolvedFonts {
        &self.fonts
    }

    /// Renders to bytes without touching the filesystem.
    pub fn render(&self, record: &StudentRecord, format: OutputFormat) -> Result<Vec<u8>, CertificateError> {
        validate(record)?;
        let name = record.student_name.trim().to_uppercase();
        let dims = self.template.dimensions();

        match format {
            OutputFormat::Png => {
                let positions = self.layout.compute(dims, &name, &self.fonts.name);
                raster::render_raster(
                    &self.template,
                    record,
                    &positions,
                    &self.fonts,
                    &self.layout,
                    &self.style,
                )
            }
            OutputFormat::Pdf => {
                let measure = vector::PdfTextMeasure::bold(&self.fonts.name);
                let positions = self.layout.compute(dims, &name, &measure);
                vector::render_vector(
                    &self.template,
                    record,
                    &positions,
                    &self.fonts,
                    &self.layout,
                    &self.style,
                    Local::now().date_naive(),
                )
            }
        }
    }

    /// Renders, moves the finished file into the output directory and
    /// records the download. Nothing is left behind on failure.
    pub fn issue(&self, record: &StudentRecord, format: OutputFormat) -> Result<IssuedCertificate, CertificateError> {
        let bytes = self.render(record, format)?;
        let filename = certificate_filename(record, format);
        let path = crate::storage::write_atomically(&self.output_dir, &filename, &bytes)?;

        tracing::info!(
            "Issued {} certificate {} for {}",
            format.extension(),
            filename,
            record.sixerclass_id
        );

        if let Some(log) = &self.downloads {
            log.record(DownloadLogEntry {
                student_name: record.student_name.clone(),
                sixerclass_id: record.sixerclass_id.clone(),
                batch_number: record.batch_number.clone(),
                download_time: Local::now().naive_local(),
                filename: filename.clone(),
            });
        }

        Ok(IssuedCertificate {
            path,
            filename,
            format,
        })
    }
}

/// Issue date printed in the PDF footer, e.g. "May 01, 2024".
pub fn issued_label(date: NaiveDate) -> String {
    format_date(&DateValue::Date(date), DateMode::Long)
}
