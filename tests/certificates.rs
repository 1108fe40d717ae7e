mod common;

use certifier::certificate::fonts::{self, FontFace};
use certifier::certificate::{
    CertificateError, CertificateGenerator, DateValue, LayoutConfig, OutputFormat,
};
use certifier::downloads::DownloadLog;
use certifier::roster::StudentRecord;
use std::path::PathBuf;
use std::sync::Arc;

fn rahul() -> StudentRecord {
    StudentRecord {
        student_name: "Rahul Sharma".to_string(),
        batch_number: "AWS-2024-001".to_string(),
        batch_start_date: DateValue::parse("2024-01-15"),
        batch_end_date: DateValue::parse("2024-04-15"),
        sixerclass_id: "SIX001".to_string(),
    }
}

fn output_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn issues_both_formats_for_a_landscape_template() {
    let dir = tempfile::tempdir().unwrap();
    let template = common::write_template(dir.path(), 1056, 816);
    let config = common::certificate_config(dir.path(), template);
    let log = Arc::new(DownloadLog::in_memory());
    let generator = CertificateGenerator::from_config(&config)
        .unwrap()
        .with_download_log(log.clone());
    assert!(generator.fonts().is_degraded());

    let pdf = generator.issue(&rahul(), OutputFormat::Pdf).unwrap();
    assert!(pdf.filename.contains("SIX001"));
    assert!(pdf.filename.contains("Rahul_Sharma"));
    assert!(std::fs::read(&pdf.path).unwrap().starts_with(b"%PDF"));

    let png = generator.issue(&rahul(), OutputFormat::Png).unwrap();
    assert_eq!(png.filename, "certificate_SIX001_Rahul_Sharma_HQ.png");
    let bytes = std::fs::read(&png.path).unwrap();
    let reader = png::Decoder::new(&bytes[..]).read_info().unwrap();
    assert_eq!((reader.info().width, reader.info().height), (1056, 816));
    assert_eq!(reader.info().pixel_dims.unwrap().xppu, 11811);

    assert_eq!(log.total(), 2);
    assert_eq!(log.summary()[0].count, 2);
}

#[test]
fn fixed_layout_renders_the_same_record() {
    let dir = tempfile::tempdir().unwrap();
    let template = common::write_template(dir.path(), 1056, 816);
    let mut config = common::certificate_config(dir.path(), template);
    config.layout = LayoutConfig::fixed_calibrated();
    let generator = CertificateGenerator::from_config(&config).unwrap();

    let bytes = generator.render(&rahul(), OutputFormat::Png).unwrap();
    let image = image::load_from_memory(&bytes).unwrap().to_rgb8();
    let touched = image.pixels().any(|p| p.0 != [250, 248, 240]);
    assert!(touched, "nothing was drawn");
}

#[test]
fn missing_name_fails_without_writing_anything() {
    let dir = tempfile::tempdir().unwrap();
    let template = common::write_template(dir.path(), 1056, 816);
    let config = common::certificate_config(dir.path(), template);
    let log = Arc::new(DownloadLog::in_memory());
    let generator = CertificateGenerator::from_config(&config)
        .unwrap()
        .with_download_log(log.clone());

    let mut record = rahul();
    record.student_name = "   ".to_string();
    for format in [OutputFormat::Pdf, OutputFormat::Png] {
        match generator.issue(&record, format) {
            Err(CertificateError::MissingField(field)) => assert_eq!(field, "student_name"),
            other => panic!("unexpected {:?}", other),
        }
    }

    assert!(output_files(&config.output_dir).is_empty());
    assert_eq!(log.total(), 0);
}

#[test]
fn unresolvable_template_reports_every_path_tried() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::certificate_config(dir.path(), PathBuf::new());
    config.template_candidates = ["a.png", "b/c.png", "d.jpg"]
        .iter()
        .map(|p| dir.path().join(p))
        .collect();

    match CertificateGenerator::from_config(&config) {
        Err(CertificateError::TemplateNotFound(tried)) => {
            assert_eq!(tried, config.template_candidates)
        }
        Err(other) => panic!("unexpected {:?}", other),
        Ok(_) => panic!("generator built without a template"),
    }
    assert!(output_files(&config.output_dir).is_empty());
}

#[test]
fn reissuing_replaces_the_previous_file() {
    let dir = tempfile::tempdir().unwrap();
    let template = common::write_template(dir.path(), 600, 400);
    let config = common::certificate_config(dir.path(), template);
    let generator = CertificateGenerator::from_config(&config).unwrap();

    generator.issue(&rahul(), OutputFormat::Png).unwrap();
    generator.issue(&rahul(), OutputFormat::Png).unwrap();
    assert_eq!(
        output_files(&config.output_dir),
        vec!["certificate_SIX001_Rahul_Sharma_HQ.png".to_string()]
    );
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Renders with whatever system fonts the default search finds. Hosts with
/// none of them only exercise the built-in face, which other tests cover.
#[test]
fn system_fonts_render_both_formats() {
    let dir = tempfile::tempdir().unwrap();
    let template = common::write_template(dir.path(), 1056, 816);
    let mut config = common::certificate_config(dir.path(), template);
    config.font_candidates = fonts::default_candidates();
    let generator = CertificateGenerator::from_config(&config).unwrap();
    let resolved = generator.fonts();
    if resolved.is_degraded() {
        eprintln!("no system font found, skipping TrueType render");
        return;
    }
    assert!(!resolved.name.is_builtin());

    let png = generator.render(&rahul(), OutputFormat::Png).unwrap();
    let image = image::load_from_memory(&png).unwrap().to_rgb8();
    let inked = image.pixels().filter(|p| p.0.iter().any(|c| *c < 160)).count();
    assert!(inked > 500, "only {} inked pixels", inked);

    let pdf = generator.render(&rahul(), OutputFormat::Pdf).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    let standalone = |handle: &certifier::certificate::FontHandle| {
        matches!(handle.face(), FontFace::TrueType(face) if face.index() == 0)
    };
    let embedded = [
        resolved.name.is_bold() && standalone(&resolved.name),
        standalone(&resolved.date),
    ];
    assert_eq!(
        count(&pdf, b"/FontFile2"),
        embedded.iter().filter(|e| **e).count()
    );
    // The name is bold either way: an embedded bold face or Helvetica-Bold.
    assert_eq!(count(&pdf, b"Helvetica-Bold") > 0, !embedded[0]);
}
