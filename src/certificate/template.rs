use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::CertificateError;

/// Default template search order, relative to the working directory.
pub const DEFAULT_TEMPLATE_CANDIDATES: &[&str] = &[
    "data/templates/certificate-template.png",
    "../data/templates/certificate-template.png",
    "certificate-templates/raw/certificate-template.png",
    "data/certificate-templates/raw/certificate-template.png",
];

/// Returns the first candidate that exists on disk. List order is priority.
pub fn locate<P: AsRef<Path>>(candidates: &[P]) -> Result<PathBuf, CertificateError> {
    for candidate in candidates {
        let path: &Path = candidate.as_ref();
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
    }

    Err(CertificateError::TemplateNotFound(
        candidates
            .iter()
            .map(|p| AsRef::<Path>::as_ref(p).to_path_buf())
            .collect(),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Background artwork, decoded once and shared read-only between renders.
#[derive(Debug, Clone)]
pub struct TemplateAsset {
    path: PathBuf,
    image: Arc<RgbImage>,
}

impl TemplateAsset {
    pub fn load(path: &Path) -> Result<Self, CertificateError> {
        let decoded = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                CertificateError::TemplateNotFound(vec![path.to_path_buf()])
            }
            other => CertificateError::Encoding(format!(
                "failed to decode template {}: {}",
                path.display(),
                other
            )),
        })?;

        // Palette and RGBA artwork is flattened to true color up front.
        let image = decoded.to_rgb8();
        tracing::info!(
            "Using template {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );

        Ok(Self {
            path: path.to_path_buf(),
            image: Arc::new(image),
        })
    }

    pub fn locate_and_load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self, CertificateError> {
        let path = locate(candidates)?;
        Self::load(&path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}
