//! The document renderer: turns an ordered record list plus the static document
//! metadata into a paginated PDF replicating the fixed layout of the paper form
//! described by a `FormTemplate`.
//!
//! The renderer is a pure transformation with no retained state: the page
//! partition is computed up front from the record count (see `layout`), so every
//! header is emitted in a single pass already knowing the total page count, and
//! the whole document is serialized in memory before anything touches the disk.

use std::io::Write as _;
use std::path::Path;

use crate::error::ContextError;
use crate::fonts::BuiltInFont;
use crate::layout::{paginate, wrap_text, PageSlice};
use crate::pdf::PdfDocument;
use crate::record::{DocumentMetadata, FieldValue, FormRecord};
use crate::template::{ColumnKind, FormTemplate, PAGE_MARGIN};

const TITLE_FONT_SIZE: f32 = 12.0;
const HEADER_FONT_SIZE: f32 = 8.0;
const BODY_FONT_SIZE: f32 = 8.0;
const FOOTER_FONT_SIZE: f32 = 7.0;

/// The distance from the top margin to the top of the body table, occupied by the
/// title and the metadata header block.
const HEADER_BLOCK_HEIGHT: f32 = 18.0;
/// The height of the repeated column header row.
const COLUMN_HEADER_HEIGHT: f32 = 7.0;
/// The vertical space reserved for the signature footer when the form has one.
const FOOTER_BLOCK_HEIGHT: f32 = 18.0;
/// The side of the checkbox glyph drawn in checkbox cells.
const CHECKBOX_SIDE: f32 = 3.5;
/// Horizontal padding between a cell border and its text.
const CELL_PADDING: f32 = 1.5;
/// Baseline-to-baseline distance of wrapped lines inside one cell.
const LINE_ADVANCE: f32 = 3.2;

const BLACK: [f32; 3] = [0.0, 0.0, 0.0];

/// Renders the record list to an in-memory PDF. The records are laid out strictly
/// in input order; nothing is reordered, filtered or sorted. Fails without
/// producing any output when the metadata is incomplete, the template is invalid
/// or a record value contradicts its column kind.
pub fn render(
    records: &[FormRecord],
    metadata: &DocumentMetadata,
    template: &FormTemplate,
) -> Result<Vec<u8>, ContextError> {
    metadata.validate()?;
    template.validate()?;
    check_records_against_columns(records, template)?;

    let (page_width, page_height) = template.orientation.page_size();
    let body_space = page_height
        - 2.0 * PAGE_MARGIN
        - HEADER_BLOCK_HEIGHT
        - COLUMN_HEADER_HEIGHT
        - footer_height(template);
    let table_height = template.rows_per_page as f32 * template.row_height;
    if table_height > body_space {
        return Err(ContextError::with_context(format!(
            "The form template {:?} lays out {} rows of {:.1} mm on a page with only \
             {:.1} mm of body space",
            template.form_type, template.rows_per_page, template.row_height, body_space
        )));
    }

    let pages = paginate(
        records.len(),
        template.rows_per_page,
        template.pad_to_minimum_rows,
    );
    let total_pages = pages.len();
    log::debug!(
        "Rendering {:?}: {} records over {} pages",
        template.form_type,
        records.len(),
        total_pages
    );

    let mut document = PdfDocument::new(format!(
        "{}-{}",
        metadata.document_number, metadata.study_code
    ));
    for page_slice in &pages {
        let page_index = document.add_page(page_width, page_height);
        render_page(
            &mut document,
            page_index,
            page_slice,
            total_pages,
            records,
            metadata,
            template,
        )?;
    }

    document.save_to_bytes(&instance_identifier(metadata))
}

/// Renders the document and writes it to `output_path`. The bytes are produced
/// fully in memory first, so a failed render never leaves a partial file behind.
pub fn render_to_file(
    records: &[FormRecord],
    metadata: &DocumentMetadata,
    template: &FormTemplate,
    output_path: &Path,
) -> Result<(), ContextError> {
    let document_bytes = render(records, metadata, template)?;

    let mut output_file = std::fs::File::create(output_path).map_err(|error| {
        ContextError::with_error(
            format!("Failed to create the output file {:?}", output_path),
            &error,
        )
    })?;
    output_file.write_all(&document_bytes).map_err(|error| {
        ContextError::with_error(
            format!("Failed to write the output file {:?}", output_path),
            &error,
        )
    })?;

    Ok(())
}

/// The deterministic name of the exported file: the official document number of
/// the paper form plus the PDF extension.
pub fn output_file_name(template: &FormTemplate) -> String {
    format!("{}.pdf", template.document_number)
}

fn footer_height(template: &FormTemplate) -> f32 {
    if template.signature_labels.is_empty() {
        0.0
    } else {
        FOOTER_BLOCK_HEIGHT
    }
}

/// Rejects records whose values contradict the column kinds of the template:
/// a text value in a checkbox column or a flag in a text column means the record
/// list and the template disagree about the form, and a silently coerced cell
/// would corrupt the printed document.
fn check_records_against_columns(
    records: &[FormRecord],
    template: &FormTemplate,
) -> Result<(), ContextError> {
    for (record_index, record) in records.iter().enumerate() {
        for column in &template.columns {
            match (column.kind, record.field(&column.key)) {
                (ColumnKind::Checkbox, Some(FieldValue::Text(text))) if !text.trim().is_empty() => {
                    return Err(ContextError::with_context(format!(
                        "Record {} holds text in the checkbox column {:?}",
                        record_index, column.key
                    )));
                }
                (ColumnKind::Text, Some(FieldValue::Flag(_))) => {
                    return Err(ContextError::with_context(format!(
                        "Record {} holds a flag in the text column {:?}",
                        record_index, column.key
                    )));
                }
                _ => {}
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn render_page(
    document: &mut PdfDocument,
    page_index: usize,
    page_slice: &PageSlice,
    total_pages: usize,
    records: &[FormRecord],
    metadata: &DocumentMetadata,
    template: &FormTemplate,
) -> Result<(), ContextError> {
    let (page_width, page_height) = template.orientation.page_size();
    let top = page_height - PAGE_MARGIN;
    let table_width = template.table_width();

    // Header block: title, study metadata and the running page indicator, repeated
    // identically on every page apart from the page number itself.
    document.write_text(
        page_index,
        [PAGE_MARGIN, top - 6.0],
        BuiltInFont::HelveticaBold,
        TITLE_FONT_SIZE,
        BLACK,
        &template.title,
    )?;
    let metadata_line = format!(
        "Estudo: {}   Documento: {}   Versão: {}   Data: {}",
        metadata.study_code, metadata.document_number, metadata.version, metadata.date
    );
    document.write_text(
        page_index,
        [PAGE_MARGIN, top - 13.0],
        BuiltInFont::Helvetica,
        HEADER_FONT_SIZE,
        BLACK,
        &metadata_line,
    )?;
    let page_indicator = format!("Página {} de {}", page_slice.index + 1, total_pages);
    let indicator_width =
        BuiltInFont::Helvetica.text_width(&page_indicator, HEADER_FONT_SIZE);
    document.write_text(
        page_index,
        [page_width - PAGE_MARGIN - indicator_width, top - 13.0],
        BuiltInFont::Helvetica,
        HEADER_FONT_SIZE,
        BLACK,
        &page_indicator,
    )?;
    document.draw_line(
        page_index,
        [PAGE_MARGIN, top - 16.0],
        [page_width - PAGE_MARGIN, top - 16.0],
        0.75,
    )?;

    // Column header row, repeated on every page of the table.
    let table_top = top - HEADER_BLOCK_HEIGHT;
    document.draw_rectangle(
        page_index,
        [PAGE_MARGIN, table_top - COLUMN_HEADER_HEIGHT],
        [table_width, COLUMN_HEADER_HEIGHT],
        0.75,
    )?;
    let mut column_x = PAGE_MARGIN;
    for column in &template.columns {
        document.write_text(
            page_index,
            [column_x + CELL_PADDING, table_top - COLUMN_HEADER_HEIGHT + 2.0],
            BuiltInFont::HelveticaBold,
            HEADER_FONT_SIZE,
            BLACK,
            &column.label,
        )?;
        column_x += column.width;
        if column_x < PAGE_MARGIN + table_width - 0.01 {
            document.draw_line(
                page_index,
                [column_x, table_top - COLUMN_HEADER_HEIGHT],
                [column_x, table_top],
                0.75,
            )?;
        }
    }

    // Body rows: the data rows of this page's slice in input order, then the blank
    // filler rows some forms print for fidelity with the paper original.
    let rows_top = table_top - COLUMN_HEADER_HEIGHT;
    let row_count = page_slice.records.len() + page_slice.blank_rows;
    for row_on_page in 0..row_count {
        let row_top = rows_top - row_on_page as f32 * template.row_height;
        let record = records.get(page_slice.records.start + row_on_page);
        render_row(document, page_index, record, row_top, template)?;
    }

    // Footer with the signature lines, identical on every page.
    if !template.signature_labels.is_empty() {
        render_footer(document, page_index, template)?;
    }

    Ok(())
}

fn render_row(
    document: &mut PdfDocument,
    page_index: usize,
    record: Option<&FormRecord>,
    row_top: f32,
    template: &FormTemplate,
) -> Result<(), ContextError> {
    let row_bottom = row_top - template.row_height;
    let table_width = template.table_width();

    document.draw_rectangle(
        page_index,
        [PAGE_MARGIN, row_bottom],
        [table_width, template.row_height],
        0.5,
    )?;

    let mut column_x = PAGE_MARGIN;
    for column in &template.columns {
        if let Some(record) = record {
            match column.kind {
                ColumnKind::Text => {
                    let text = record.text(&column.key);
                    if !text.is_empty() {
                        let available_width = column.width - 2.0 * CELL_PADDING;
                        let lines = wrap_text(
                            text,
                            available_width,
                            BODY_FONT_SIZE,
                            &BuiltInFont::Helvetica,
                        );
                        // A cell never overflows its ruled box: lines beyond the
                        // row height are dropped.
                        let maximum_lines =
                            usize::max(1, ((template.row_height - 1.5) / LINE_ADVANCE) as usize);
                        for (line_index, line) in lines.iter().take(maximum_lines).enumerate() {
                            document.write_text(
                                page_index,
                                [
                                    column_x + CELL_PADDING,
                                    row_top - 3.0 - line_index as f32 * LINE_ADVANCE,
                                ],
                                BuiltInFont::Helvetica,
                                BODY_FONT_SIZE,
                                BLACK,
                                line,
                            )?;
                        }
                    }
                }
                ColumnKind::Checkbox => {
                    document.draw_checkbox(
                        page_index,
                        [
                            column_x + (column.width - CHECKBOX_SIDE) / 2.0,
                            row_top - (template.row_height + CHECKBOX_SIDE) / 2.0,
                        ],
                        CHECKBOX_SIDE,
                        record.flag(&column.key),
                    )?;
                }
            }
        }

        column_x += column.width;
        if column_x < PAGE_MARGIN + table_width - 0.01 {
            document.draw_line(page_index, [column_x, row_bottom], [column_x, row_top], 0.5)?;
        }
    }

    Ok(())
}

fn render_footer(
    document: &mut PdfDocument,
    page_index: usize,
    template: &FormTemplate,
) -> Result<(), ContextError> {
    let table_width = template.table_width();
    let label_count = template.signature_labels.len();
    let slot_width = table_width / label_count as f32;
    let line_y = PAGE_MARGIN + 8.0;

    for (label_index, label) in template.signature_labels.iter().enumerate() {
        let slot_start = PAGE_MARGIN + label_index as f32 * slot_width;
        document.draw_line(
            page_index,
            [slot_start + 5.0, line_y],
            [slot_start + slot_width - 5.0, line_y],
            0.5,
        )?;
        let label_width = BuiltInFont::Helvetica.text_width(label, FOOTER_FONT_SIZE);
        document.write_text(
            page_index,
            [slot_start + (slot_width - label_width) / 2.0, line_y - 4.0],
            BuiltInFont::Helvetica,
            FOOTER_FONT_SIZE,
            BLACK,
            label,
        )?;
    }

    Ok(())
}

/// The instance identifier written to the trailer `ID` tag, derived from the
/// metadata so that repeated renders of the same form agree. The PDF specification
/// expects a 32 characters-long string.
fn instance_identifier(metadata: &DocumentMetadata) -> String {
    let mut identifier = format!("{}{}", metadata.document_number, metadata.version)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>();
    while identifier.len() < 32 {
        identifier.push('0');
    }
    identifier.truncate(32);
    identifier
}
