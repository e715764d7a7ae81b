//! PDF report assembly with lopdf: title and filter summary, a preview
//! table, then one page per chart (raster image plus optional comment).
//!
//! Page content streams are assembled by hand; chart images are rendered to
//! temporary PNG files at 2x scale and embedded, and the temp files are
//! removed best-effort once the document is built.

use color_eyre::Result;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;

use super::TablePreview;
use crate::charts::Chart;
use crate::figure;

const A4_WIDTH: f64 = 595.28;
const A4_HEIGHT: f64 = 841.89;
const MARGIN: f64 = 56.7; // 2 cm
const IMAGE_WIDTH: f64 = 453.5; // 16 cm
const IMAGE_HEIGHT: f64 = 255.1; // 9 cm
const TABLE_ROW_HEIGHT: f64 = 14.0;
const LINE_STEP: f64 = 16.0;

/// Raster scale for chart images (print quality).
const IMAGE_SCALE: u32 = 2;

/// Writes the report to `path`.
pub fn write_report(
    path: &Path,
    preview: &TablePreview,
    filter_lines: &[String],
    charts: &[Chart],
) -> Result<()> {
    let bytes = render_report(preview, filter_lines, charts)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Builds the report in memory.
pub fn render_report(
    preview: &TablePreview,
    filter_lines: &[String],
    charts: &[Chart],
) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let font_bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let font_italic = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Oblique",
    });
    let fonts = dictionary! {
        "F1" => font_regular,
        "F2" => font_bold,
        "F3" => font_italic,
    };

    let mut kids: Vec<Object> = Vec::new();

    // Title and filter summary.
    let mut ops = Vec::new();
    let title = "Raport danych po filtrach";
    push_text(
        &mut ops,
        "F2",
        18.0,
        centered_x(title, 18.0),
        A4_HEIGHT - MARGIN - 18.0,
        title,
    );
    let mut y = A4_HEIGHT - MARGIN - 60.0;
    push_text(&mut ops, "F2", 12.0, MARGIN, y, "Zastosowane filtry:");
    y -= LINE_STEP + 4.0;
    for line in filter_lines {
        push_text(&mut ops, "F1", 10.0, MARGIN, y, line);
        y -= LINE_STEP;
        if y < MARGIN {
            break;
        }
    }
    kids.push(add_page(&mut doc, pages_id, &fonts, ops)?.into());

    // Preview table.
    let ops = table_ops(preview);
    kids.push(add_page(&mut doc, pages_id, &fonts, ops)?.into());

    // One page per chart. Temp images stay alive until the document bytes
    // exist; cleanup happens on every exit path via drop.
    let mut temp_images = Vec::with_capacity(charts.len());
    let mut chart_pages = Vec::with_capacity(charts.len());
    for chart in charts {
        let tmp = tempfile::Builder::new().suffix(".png").tempfile()?;
        figure::render_png(chart, tmp.path(), IMAGE_SCALE)?;

        let mut ops = Vec::new();
        let image_y = A4_HEIGHT - MARGIN - IMAGE_HEIGHT;
        if let Some(comment) = &chart.comment {
            let mut y = image_y - 24.0;
            for line in wrap_text(&format!("Komentarz: {}", comment), 92) {
                push_text(&mut ops, "F3", 10.0, MARGIN, y, &line);
                y -= LINE_STEP;
                if y < MARGIN {
                    break;
                }
            }
        }
        let page_id = add_page(&mut doc, pages_id, &fonts, ops)?;
        kids.push(page_id.into());
        chart_pages.push((page_id, tmp.path().to_path_buf(), image_y));
        temp_images.push(tmp);
    }

    for (page_id, image_path, image_y) in chart_pages {
        let image = lopdf::xobject::image_from(std::fs::read(&image_path)?)?;
        let image_x = (A4_WIDTH - IMAGE_WIDTH) / 2.0;
        doc.insert_image(
            page_id,
            image,
            (image_x as f32, image_y as f32),
            (IMAGE_WIDTH as f32, IMAGE_HEIGHT as f32),
        )?;
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "MediaBox" => vec![0.into(), 0.into(), A4_WIDTH.into(), A4_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;

    for tmp in temp_images {
        let _ = tmp.close();
    }
    Ok(bytes)
}

fn add_page(
    doc: &mut Document,
    pages_id: lopdf::ObjectId,
    fonts: &lopdf::Dictionary,
    ops: Vec<Operation>,
) -> Result<lopdf::ObjectId> {
    let content = Content { operations: ops };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    // Each page carries its own resources so image insertion never touches a
    // shared dictionary.
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => fonts.clone(),
        },
    });
    Ok(page_id)
}

fn table_ops(preview: &TablePreview) -> Vec<Operation> {
    let mut ops = Vec::new();
    let n_cols = preview.headers.len().max(1);
    let usable = A4_WIDTH - 2.0 * MARGIN;
    let col_width = usable / n_cols as f64;
    let top = A4_HEIGHT - MARGIN;
    let n_rows = preview.rows.len() + 1;
    let max_chars = ((col_width / 4.2) as usize).saturating_sub(1).max(3);

    // Header background.
    ops.push(Operation::new(
        "rg",
        vec![0.5.into(), 0.5.into(), 0.5.into()],
    ));
    ops.push(Operation::new(
        "re",
        vec![
            MARGIN.into(),
            (top - TABLE_ROW_HEIGHT).into(),
            usable.into(),
            TABLE_ROW_HEIGHT.into(),
        ],
    ));
    ops.push(Operation::new("f", vec![]));

    // Header text in white, body in black.
    ops.push(Operation::new("rg", vec![1.into(), 1.into(), 1.into()]));
    for (c, header) in preview.headers.iter().enumerate() {
        push_text(
            &mut ops,
            "F2",
            8.0,
            MARGIN + c as f64 * col_width + 2.0,
            top - TABLE_ROW_HEIGHT + 4.0,
            &truncate(header, max_chars),
        );
    }
    ops.push(Operation::new("rg", vec![0.into(), 0.into(), 0.into()]));
    for (r, row) in preview.rows.iter().enumerate() {
        let y = top - (r + 2) as f64 * TABLE_ROW_HEIGHT + 4.0;
        for (c, cell) in row.iter().enumerate() {
            push_text(
                &mut ops,
                "F1",
                8.0,
                MARGIN + c as f64 * col_width + 2.0,
                y,
                &truncate(cell, max_chars),
            );
        }
    }

    // Grid.
    ops.push(Operation::new("w", vec![0.5.into()]));
    for r in 0..=n_rows {
        let y = top - r as f64 * TABLE_ROW_HEIGHT;
        ops.push(Operation::new("m", vec![MARGIN.into(), y.into()]));
        ops.push(Operation::new("l", vec![(MARGIN + usable).into(), y.into()]));
    }
    for c in 0..=n_cols {
        let x = MARGIN + c as f64 * col_width;
        ops.push(Operation::new("m", vec![x.into(), top.into()]));
        ops.push(Operation::new(
            "l",
            vec![x.into(), (top - n_rows as f64 * TABLE_ROW_HEIGHT).into()],
        ));
    }
    ops.push(Operation::new("S", vec![]));
    ops
}

fn push_text(ops: &mut Vec<Operation>, font: &str, size: f64, x: f64, y: f64, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::string_literal(fold_to_winansi(text))],
    ));
    ops.push(Operation::new("ET", vec![]));
}

/// Approximate centering for the title (core fonts, no metrics loaded).
fn centered_x(text: &str, size: f64) -> f64 {
    let width = text.chars().count() as f64 * size * 0.5;
    ((A4_WIDTH - width) / 2.0).max(MARGIN)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// The core PDF fonts are WinAnsi-only; Polish diacritics are folded to
/// their base letters so report text stays readable.
fn fold_to_winansi(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ą' => 'a',
            'ć' => 'c',
            'ę' => 'e',
            'ł' => 'l',
            'ń' => 'n',
            'ó' => 'o',
            'ś' => 's',
            'ż' | 'ź' => 'z',
            'Ą' => 'A',
            'Ć' => 'C',
            'Ę' => 'E',
            'Ł' => 'L',
            'Ń' => 'N',
            'Ó' => 'O',
            'Ś' => 'S',
            'Ż' | 'Ź' => 'Z',
            '–' | '—' => '-',
            '…' => '.',
            other => other,
        })
        .collect()
}
