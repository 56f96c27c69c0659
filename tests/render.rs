// tests/render.rs
mod common;

use company_intel::model::{AnalysisResult, Query, Reference};
use company_intel::render::{ReportFormat, ReportRenderer};
use company_intel::PipelineError;

use common::*;

fn analysis() -> AnalysisResult {
    AnalysisResult {
        overview: "Acme Co builds anvils.\nFounded in 1949.".into(),
        findings: vec!["Revenue up 12%".into(), "New plant in Ohio".into()],
        sentiment: Some("Positive".into()),
        recommendations: vec!["Offer QA automation".into()],
        pitch: None,
        references: vec![Reference {
            title: "Acme plant".into(),
            link: "https://news.test/acme".into(),
        }],
    }
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

#[test]
fn text_report_has_sections_in_order() {
    let q = Query::parse("Acme Co").unwrap();
    let art = renderer().render(&q, &analysis(), ReportFormat::Text).unwrap();
    let text = String::from_utf8(art.bytes).unwrap();

    let expected = "Company Intelligence Report: Acme Co\n\
                    Generated: 2024-05-17\n\
                    \n\
                    Overview\n--------\nAcme Co builds anvils.\nFounded in 1949.\n\
                    \n\
                    Findings\n--------\n- Revenue up 12%\n- New plant in Ohio\n\
                    \n\
                    Sentiment\n---------\nPositive\n\
                    \n\
                    Recommendations\n---------------\n- Offer QA automation\n\
                    \n\
                    Sources\n-------\n- Acme plant - https://news.test/acme\n";
    assert_eq!(text, expected);
    assert_eq!(art.filename, "Acme_Co_2024-05-17.txt");
}

#[test]
fn pdf_output_is_deterministic_for_a_fixed_date() {
    let q = Query::parse("Acme Co").unwrap();
    let a = renderer().render(&q, &analysis(), ReportFormat::Pdf).unwrap();
    let b = renderer().render(&q, &analysis(), ReportFormat::Pdf).unwrap();

    assert_eq!(a.bytes, b.bytes);
    assert!(a.bytes.starts_with(b"%PDF-"));
    assert_eq!(a.filename, "Acme_Co_2024-05-17.pdf");
    assert_eq!(count(&a.bytes, b"(Page 1 of 1)"), 1);
    assert!(count(&a.bytes, b"(Overview)") == 1);
}

#[test]
fn non_latin_query_still_renders_pdf() {
    let q = Query::parse("日本株式会社").unwrap();
    let analysis = AnalysisResult {
        overview: "日本株式会社 is a holding company \u{2014} est. 1920.".into(),
        ..AnalysisResult::default()
    };
    let art = renderer().render(&q, &analysis, ReportFormat::Pdf).unwrap();

    assert!(art.bytes.starts_with(b"%PDF-"));
    assert!(art.bytes.ends_with(b"%%EOF") || art.bytes.ends_with(b"%%EOF\n"));
    assert_eq!(art.filename, "日本株式会社_2024-05-17.pdf");
    assert_eq!(count(&art.bytes, b"(is a holding company - est. 1920.)"), 1);
}

#[test]
fn long_reports_paginate() {
    let q = Query::parse("Acme Co").unwrap();
    let analysis = AnalysisResult {
        overview: "Overview text.".into(),
        findings: (0..150).map(|i| format!("Finding {i}")).collect(),
        ..AnalysisResult::default()
    };
    let art = renderer().render(&q, &analysis, ReportFormat::Pdf).unwrap();
    assert!(count(&art.bytes, b"(Page 1 of ") == 1);
    assert!(count(&art.bytes, b"(Page 3 of ") == 1);
}

#[test]
fn artifact_write_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("reports");
    let q = Query::parse("Acme Co").unwrap();
    let art = ReportRenderer::on(fixed_date())
        .render(&q, &analysis(), ReportFormat::Text)
        .unwrap();

    let path = art.write_to(&out).unwrap();
    assert_eq!(path, out.join("Acme_Co_2024-05-17.txt"));
    assert_eq!(std::fs::read(&path).unwrap(), art.bytes);
}

#[test]
fn artifact_write_into_a_file_path_is_render_failed() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();
    let q = Query::parse("Acme Co").unwrap();
    let art = renderer().render(&q, &analysis(), ReportFormat::Text).unwrap();

    let err = art.write_to(&blocker).unwrap_err();
    assert!(matches!(err, PipelineError::RenderFailed(_)));
}
