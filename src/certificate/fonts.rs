use rusttype::{point, Font, Scale};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::bitmap_font;
use super::layout::TextMeasure;

/// Font files tried before falling back to family-name lookup.
const DEFAULT_FONT_FILES: &[&str] = &[
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/ubuntu/Ubuntu-R.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:/Windows/Fonts/arial.ttf",
];

const DEFAULT_FONT_FAMILIES: &[&str] = &["Liberation Sans", "DejaVu Sans", "Ubuntu", "Helvetica", "Arial"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontCandidate {
    File(PathBuf),
    Family(String),
}

impl FontCandidate {
    /// Anything that looks like a path or a font file name is a file, the
    /// rest is a family name.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let lower = raw.to_ascii_lowercase();
        let is_file = raw.contains('/')
            || raw.contains('\\')
            || [".ttf", ".ttc", ".otf"].iter().any(|ext| lower.ends_with(ext));
        if is_file {
            FontCandidate::File(PathBuf::from(raw))
        } else {
            FontCandidate::Family(raw.to_string())
        }
    }
}

impl fmt::Display for FontCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontCandidate::File(path) => write!(f, "{}", path.display()),
            FontCandidate::Family(name) => f.write_str(name),
        }
    }
}

pub fn default_candidates() -> Vec<FontCandidate> {
    DEFAULT_FONT_FILES
        .iter()
        .map(|p| FontCandidate::File(PathBuf::from(p)))
        .chain(
            DEFAULT_FONT_FAMILIES
                .iter()
                .map(|name| FontCandidate::Family(name.to_string())),
        )
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontSizes {
    pub name: f32,
    pub date: f32,
}

impl Default for FontSizes {
    fn default() -> Self {
        Self {
            name: 36.0,
            date: 22.0,
        }
    }
}

/// A parsed TrueType face plus the raw bytes, which the PDF writer embeds.
pub struct TrueTypeFace {
    data: Vec<u8>,
    index: u32,
    font: Font<'static>,
}

impl TrueTypeFace {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let font = Font::try_from_vec_and_index(data.clone(), index)?;
        Some(Self { data, index, font })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Index of the face inside a collection file; 0 for plain .ttf files.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn font(&self) -> &Font<'static> {
        &self.font
    }
}

impl fmt::Debug for TrueTypeFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrueTypeFace")
            .field("bytes", &self.data.len())
            .field("index", &self.index)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum FontFace {
    TrueType(Arc<TrueTypeFace>),
    Builtin,
}

/// One face at one size.
#[derive(Debug, Clone)]
pub struct FontHandle {
    face: FontFace,
    size: f32,
    bold: bool,
}

impl FontHandle {
    pub fn builtin(size: f32) -> Self {
        Self {
            face: FontFace::Builtin,
            size,
            bold: false,
        }
    }

    fn truetype(face: Arc<TrueTypeFace>, size: f32, bold: bool) -> Self {
        Self {
            face: FontFace::TrueType(face),
            size,
            bold,
        }
    }

    pub fn face(&self) -> &FontFace {
        &self.face
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.face, FontFace::Builtin)
    }

    /// True when the face is a bold weight of the resolved family.
    pub fn is_bold(&self) -> bool {
        self.bold
    }
}

impl TextMeasure for FontHandle {
    fn text_width(&self, text: &str) -> f32 {
        match &self.face {
            FontFace::TrueType(face) => truetype_advance(face.font(), self.size, text),
            FontFace::Builtin => bitmap_font::text_width(text, self.size),
        }
    }
}

/// Advance width of a laid-out run, kerning included.
pub fn truetype_advance(font: &Font<'static>, px: f32, text: &str) -> f32 {
    let scale = Scale::uniform(px);
    font.layout(text, scale, point(0.0, 0.0))
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontOrigin {
    Candidate(String),
    Builtin,
}

#[derive(Debug, Clone)]
pub struct ResolvedFonts {
    pub name: FontHandle,
    pub date: FontHandle,
    pub origin: FontOrigin,
}

impl ResolvedFonts {
    pub fn builtin(sizes: FontSizes) -> Self {
        Self {
            name: FontHandle::builtin(sizes.name),
            date: FontHandle::builtin(sizes.date),
            origin: FontOrigin::Builtin,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.origin == FontOrigin::Builtin
    }
}

/// Walks the candidates in order and keeps the first face that parses. Dates
/// use that face; the name uses its bold companion when one can be found,
/// otherwise the same face. When nothing loads, both handles use the built-in
/// bitmap font.
pub fn resolve(candidates: &[FontCandidate], sizes: FontSizes) -> ResolvedFonts {
    let mut system_fonts: Option<fontdb::Database> = None;

    for candidate in candidates {
        let face = match candidate {
            FontCandidate::File(path) => std::fs::read(path)
                .map_err(|e| debug!("Font file {} unavailable: {}", path.display(), e))
                .ok()
                .and_then(|data| TrueTypeFace::parse(data, 0)),
            FontCandidate::Family(name) => {
                let db = system_fonts.get_or_insert_with(|| {
                    let mut db = fontdb::Database::new();
                    db.load_system_fonts();
                    db
                });
                load_family(db, name)
            }
        };

        match face {
            Some(face) => {
                info!("Loaded certificate font: {}", candidate);
                let bold = match candidate {
                    FontCandidate::File(path) => load_bold_sibling(path),
                    FontCandidate::Family(name) => system_fonts
                        .as_ref()
                        .and_then(|db| load_family_bold(db, name)),
                };
                let regular = Arc::new(face);
                let name = match bold {
                    Some(bold) => {
                        info!("Using bold companion for names: {}", candidate);
                        FontHandle::truetype(Arc::new(bold), sizes.name, true)
                    }
                    None => {
                        warn!("No bold face next to {}, names use the regular weight", candidate);
                        FontHandle::truetype(regular.clone(), sizes.name, false)
                    }
                };
                return ResolvedFonts {
                    name,
                    date: FontHandle::truetype(regular, sizes.date, false),
                    origin: FontOrigin::Candidate(candidate.to_string()),
                };
            }
            None => debug!("Font candidate {} could not be loaded", candidate),
        }
    }

    warn!(
        "No usable font among {} candidates, using the built-in bitmap font",
        candidates.len()
    );
    ResolvedFonts::builtin(sizes)
}

fn load_family(db: &fontdb::Database, family: &str) -> Option<TrueTypeFace> {
    let families = [fontdb::Family::Name(family)];
    let id = db.query(&fontdb::Query {
        families: &families,
        ..fontdb::Query::default()
    })?;
    db.with_face_data(id, |data, index| TrueTypeFace::parse(data.to_vec(), index))
        .flatten()
}

fn load_family_bold(db: &fontdb::Database, family: &str) -> Option<TrueTypeFace> {
    let families = [fontdb::Family::Name(family)];
    let id = db.query(&fontdb::Query {
        families: &families,
        weight: fontdb::Weight::BOLD,
        ..fontdb::Query::default()
    })?;
    // The query falls back to the nearest weight; only a real bold will do.
    if db.face(id)?.weight.0 < fontdb::Weight::SEMIBOLD.0 {
        return None;
    }
    db.with_face_data(id, |data, index| TrueTypeFace::parse(data.to_vec(), index))
        .flatten()
}

fn load_bold_sibling(path: &Path) -> Option<TrueTypeFace> {
    bold_sibling_paths(path).into_iter().find_map(|sibling| {
        let data = std::fs::read(&sibling).ok()?;
        let face = TrueTypeFace::parse(data, 0)?;
        debug!("Bold companion found at {}", sibling.display());
        Some(face)
    })
}

/// File names font packages use for the bold member of a family, e.g.
/// `LiberationSans-Bold.ttf`, `DejaVuSans-Bold.ttf`, `Ubuntu-B.ttf`,
/// `arialbd.ttf`.
pub fn bold_sibling_paths(path: &Path) -> Vec<PathBuf> {
    let (Some(dir), Some(stem), Some(ext)) = (
        path.parent(),
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|e| e.to_str()),
    ) else {
        return Vec::new();
    };

    let mut stems: Vec<String> = [("-Regular", "-Bold"), ("-R", "-B"), ("Regular", "Bold")]
        .iter()
        .filter_map(|(regular, bold)| stem.strip_suffix(regular).map(|base| format!("{}{}", base, bold)))
        .collect();
    stems.push(format!("{}-Bold", stem));
    stems.push(format!("{}bd", stem));
    stems.push(format!("{} Bold", stem));

    stems
        .into_iter()
        .map(|s| dir.join(format!("{}.{}", s, ext)))
        .collect()
}
