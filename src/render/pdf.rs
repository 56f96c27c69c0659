// src/render/pdf.rs
//! Paginated A4 PDF using the built-in Helvetica faces.
//!
//! All text goes through [`pdf_safe`] first, so every byte handed to the
//! content stream is printable ASCII. No creation timestamp is embedded.

use chrono::NaiveDate;
use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};

use super::sanitize::pdf_safe;
use super::{Section, SectionBody, REPORT_TITLE};
use crate::model::Query;

const PAGE_W: f32 = 595.0;
const PAGE_H: f32 = 842.0;
const MARGIN: f32 = 56.0;
const FOOTER_Y: f32 = 30.0;
const LIST_INDENT: f32 = 14.0;

// Helvetica averages a bit over half an em per glyph; wrap conservatively.
const AVG_GLYPH_EM: f32 = 0.55;

const REGULAR: Name<'static> = Name(b"F1");
const BOLD: Name<'static> = Name(b"F2");

#[derive(Debug, Clone, Copy, PartialEq)]
enum Style {
    Title,
    Meta,
    Heading,
    Body,
}

impl Style {
    fn font(self) -> Name<'static> {
        match self {
            Style::Title | Style::Heading => BOLD,
            Style::Meta | Style::Body => REGULAR,
        }
    }

    fn size(self) -> f32 {
        match self {
            Style::Title => 16.0,
            Style::Heading => 13.0,
            Style::Meta => 9.0,
            Style::Body => 11.0,
        }
    }

    fn leading(self) -> f32 {
        self.size() * 1.4
    }
}

#[derive(Debug, Clone)]
struct Line {
    style: Style,
    indent: f32,
    text: String,
}

#[derive(Debug, Clone)]
struct Placed {
    line: Line,
    y: f32,
}

fn max_chars(style: Style, indent: f32) -> usize {
    let width = PAGE_W - 2.0 * MARGIN - indent;
    ((width / (style.size() * AVG_GLYPH_EM)) as usize).max(10)
}

/// Greedy word wrap; words longer than a line are hard-split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let mut word = word;
        while word.len() > width {
            if !cur.is_empty() {
                lines.push(std::mem::take(&mut cur));
            }
            let (head, tail) = word.split_at(width);
            lines.push(head.to_string());
            word = tail;
        }
        if cur.is_empty() {
            cur.push_str(word);
        } else if cur.len() + 1 + word.len() <= width {
            cur.push(' ');
            cur.push_str(word);
        } else {
            lines.push(std::mem::replace(&mut cur, word.to_string()));
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

fn push_wrapped(out: &mut Vec<Line>, style: Style, indent: f32, text: &str) {
    for t in wrap(text, max_chars(style, indent)) {
        out.push(Line {
            style,
            indent,
            text: t,
        });
    }
}

fn layout(query: &Query, date: NaiveDate, sections: &[Section]) -> Vec<Line> {
    let mut lines = Vec::new();
    let title = pdf_safe(&format!("{REPORT_TITLE}: {query}"));
    push_wrapped(&mut lines, Style::Title, 0.0, &title);
    push_wrapped(
        &mut lines,
        Style::Meta,
        0.0,
        &format!("Generated: {}", date.format("%Y-%m-%d")),
    );

    for section in sections {
        lines.push(blank());
        push_wrapped(&mut lines, Style::Heading, 0.0, section.title);
        match &section.body {
            SectionBody::Paragraph(text) => {
                for para in text.lines() {
                    let safe = pdf_safe(para);
                    if !safe.is_empty() {
                        push_wrapped(&mut lines, Style::Body, 0.0, &safe);
                    }
                }
            }
            SectionBody::List(items) => {
                for item in items {
                    let safe = pdf_safe(item);
                    if safe.is_empty() {
                        continue;
                    }
                    let wrapped = wrap(&safe, max_chars(Style::Body, LIST_INDENT));
                    for (i, t) in wrapped.into_iter().enumerate() {
                        let (indent, text) = if i == 0 {
                            (0.0, format!("-  {t}"))
                        } else {
                            (LIST_INDENT, t)
                        };
                        lines.push(Line {
                            style: Style::Body,
                            indent,
                            text,
                        });
                    }
                }
            }
        }
    }
    lines
}

fn blank() -> Line {
    Line {
        style: Style::Body,
        indent: 0.0,
        text: String::new(),
    }
}

/// Assigns baselines and breaks pages. A heading never ends up as the last
/// line of a page.
fn paginate(lines: Vec<Line>) -> Vec<Vec<Placed>> {
    let top = PAGE_H - MARGIN;
    let bottom = MARGIN;
    let mut pages: Vec<Vec<Placed>> = vec![Vec::new()];
    let mut y = top;

    for line in lines {
        let needed = if line.style == Style::Heading {
            line.style.leading() + 2.0 * Style::Body.leading()
        } else {
            line.style.leading()
        };
        if y - needed < bottom {
            pages.push(Vec::new());
            y = top;
            if line.text.is_empty() {
                continue;
            }
        }
        y -= line.style.leading();
        if let Some(page) = pages.last_mut() {
            page.push(Placed { line, y });
        }
    }
    pages
}

pub fn render_pdf(query: &Query, date: NaiveDate, sections: &[Section]) -> Vec<u8> {
    let pages = paginate(layout(query, date, sections));
    let total = pages.len();

    let mut pdf = Pdf::new();
    let catalog_id = Ref::new(1);
    let tree_id = Ref::new(2);
    let regular_id = Ref::new(3);
    let bold_id = Ref::new(4);
    let page_ids: Vec<Ref> = (0..total).map(|i| Ref::new(5 + 2 * i as i32)).collect();

    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().copied())
        .count(total as i32);
    pdf.type1_font(regular_id).base_font(Name(b"Helvetica"));
    pdf.type1_font(bold_id).base_font(Name(b"Helvetica-Bold"));

    for (i, placed) in pages.iter().enumerate() {
        let content_id = Ref::new(6 + 2 * i as i32);
        {
            let mut page = pdf.page(page_ids[i]);
            page.media_box(Rect::new(0.0, 0.0, PAGE_W, PAGE_H));
            page.parent(tree_id);
            page.contents(content_id);
            let mut resources = page.resources();
            let mut fonts = resources.fonts();
            fonts.pair(REGULAR, regular_id);
            fonts.pair(BOLD, bold_id);
        }

        let mut content = Content::new();
        for p in placed.iter().filter(|p| !p.line.text.is_empty()) {
            draw(&mut content, p.line.style, MARGIN + p.line.indent, p.y, &p.line.text);
        }
        let footer = format!("Page {} of {}", i + 1, total);
        draw(&mut content, Style::Meta, MARGIN, FOOTER_Y, &footer);
        pdf.stream(content_id, &content.finish());
    }

    pdf.finish()
}

fn draw(content: &mut Content, style: Style, x: f32, y: f32, text: &str) {
    content.begin_text();
    content.set_font(style.font(), style.size());
    content.next_line(x, y);
    content.show(Str(text.as_bytes()));
    content.end_text();
}
