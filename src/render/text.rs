// src/render/text.rs
use chrono::NaiveDate;

use super::{Section, SectionBody, REPORT_TITLE};
use crate::model::Query;

/// Line-based report: title, generation date, then each section as
/// header, underline, content. Output ends with a single newline.
pub fn render_text(query: &Query, date: NaiveDate, sections: &[Section]) -> String {
    let mut lines: Vec<String> = vec![
        format!("{REPORT_TITLE}: {query}"),
        format!("Generated: {}", date.format("%Y-%m-%d")),
    ];

    for section in sections {
        lines.push(String::new());
        lines.push(section.title.to_string());
        lines.push("-".repeat(section.title.chars().count()));
        match &section.body {
            SectionBody::Paragraph(text) => lines.extend(text.lines().map(str::to_string)),
            SectionBody::List(items) => lines.extend(items.iter().map(|i| format!("- {i}"))),
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
