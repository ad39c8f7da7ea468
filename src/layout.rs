//! The pure layouting arithmetic of the document renderer: partitioning the
//! record list into pages and wrapping cell text. Everything here is computed
//! before any PDF operation is emitted, so the total page count is known when
//! the first header is drawn and no patch-after-render pass is ever needed.

use std::ops::Range;

/// One page of the computed partition: which slice of the record list it shows
/// and how many blank filler rows follow the data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSlice {
    /// The zero-based page index.
    pub index: usize,
    /// The range of record indices laid out on this page, in input order.
    pub records: Range<usize>,
    /// Blank rows appended after the data rows, used by forms that print a
    /// fixed minimum of ruled rows for fidelity with the paper original.
    pub blank_rows: usize,
}

/// Partitions `record_count` records into pages of at most `rows_per_page` rows.
///
/// The partition always contains at least one page, so an empty record list still
/// produces a document with a header and an empty ruled body. When
/// `pad_to_minimum_rows` is given, blank rows are appended after the last data row
/// until the whole document shows at least that many rows (never splitting a page
/// beyond `rows_per_page`).
pub fn paginate(
    record_count: usize,
    rows_per_page: usize,
    pad_to_minimum_rows: Option<usize>,
) -> Vec<PageSlice> {
    assert!(rows_per_page > 0, "rows_per_page must be positive");

    // The total number of printed rows, data plus filler.
    let total_rows = match pad_to_minimum_rows {
        Some(minimum) => record_count.max(minimum),
        None => record_count,
    };
    let page_count = usize::max(1, total_rows.div_ceil(rows_per_page));

    let mut pages = Vec::with_capacity(page_count);
    for index in 0..page_count {
        let row_start = index * rows_per_page;
        let row_end = usize::min(row_start + rows_per_page, total_rows);
        let record_start = usize::min(row_start, record_count);
        let record_end = usize::min(row_end, record_count);
        pages.push(PageSlice {
            index,
            records: record_start..record_end,
            blank_rows: row_end - row_start - (record_end - record_start),
        });
    }

    pages
}

/// The measuring seam between the layouting arithmetic and the font data: the
/// renderer measures with the actual font width tables, while the layouting
/// tests measure with a fixed advance.
pub trait TextMeasure {
    /// The printed width of `text` in millimeters at the given font size in points.
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

/// Word-wraps `text` to lines no wider than `maximum_width` millimeters.
///
/// Explicit line breaks are honored. A single word wider than the cell is broken
/// character by character rather than overflowing the cell, because the printed
/// form must never draw outside its ruled box. Always returns at least one line.
pub fn wrap_text(text: &str, maximum_width: f32, font_size: f32, measure: &dyn TextMeasure) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{current_line} {word}")
            };
            if measure.text_width(&candidate, font_size) <= maximum_width {
                current_line = candidate;
                continue;
            }
            if !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
            }
            // The word alone does not fit an empty line: hard-break it.
            if measure.text_width(word, font_size) > maximum_width {
                for character in word.chars() {
                    let mut candidate = current_line.clone();
                    candidate.push(character);
                    if measure.text_width(&candidate, font_size) <= maximum_width
                        || current_line.is_empty()
                    {
                        current_line = candidate;
                    } else {
                        lines.push(std::mem::take(&mut current_line));
                        current_line.push(character);
                    }
                }
            } else {
                current_line = word.to_string();
            }
        }
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_partition_has_ceil_n_over_r_pages() {
        assert_eq!(paginate(0, 10, None).len(), 1);
        assert_eq!(paginate(1, 10, None).len(), 1);
        assert_eq!(paginate(10, 10, None).len(), 1);
        assert_eq!(paginate(11, 10, None).len(), 2);
        assert_eq!(paginate(25, 10, None).len(), 3);
    }

    #[test]
    fn pages_cover_the_record_list_in_order_without_overlap() {
        let pages = paginate(25, 10, None);
        let mut next_record = 0;
        for (index, page) in pages.iter().enumerate() {
            assert_eq!(page.index, index);
            assert_eq!(page.records.start, next_record);
            assert!(page.records.len() <= 10);
            next_record = page.records.end;
        }
        assert_eq!(next_record, 25);
    }

    #[test]
    fn an_empty_record_list_still_produces_one_page() {
        let pages = paginate(0, 10, None);
        assert_eq!(
            pages,
            vec![PageSlice {
                index: 0,
                records: 0..0,
                blank_rows: 0,
            }]
        );
    }

    #[test]
    fn padding_appends_blank_rows_up_to_the_minimum() {
        let pages = paginate(2, 10, Some(5));
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].records, 0..2);
        assert_eq!(pages[0].blank_rows, 3);
    }

    #[test]
    fn padding_never_shrinks_a_full_record_list() {
        let pages = paginate(8, 10, Some(5));
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].records, 0..8);
        assert_eq!(pages[0].blank_rows, 0);
    }

    #[test]
    fn padding_spills_onto_further_pages_when_the_minimum_exceeds_one_page() {
        let pages = paginate(2, 10, Some(25));
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].records, 0..2);
        assert_eq!(pages[0].blank_rows, 8);
        assert_eq!(pages[1].records, 2..2);
        assert_eq!(pages[1].blank_rows, 10);
        assert_eq!(pages[2].blank_rows, 5);
    }

    /// Measures every character as one millimeter, so widths read as character counts.
    struct FixedAdvance;

    impl TextMeasure for FixedAdvance {
        fn text_width(&self, text: &str, _font_size: f32) -> f32 {
            text.chars().count() as f32
        }
    }

    #[test]
    fn short_text_stays_on_one_line() {
        let lines = wrap_text("peso estável", 20.0, 8.0, &FixedAdvance);
        assert_eq!(lines, vec!["peso estável"]);
    }

    #[test]
    fn text_wraps_at_word_boundaries() {
        let lines = wrap_text("animal sem alterações no exame", 10.0, 8.0, &FixedAdvance);
        assert_eq!(lines, vec!["animal sem", "alterações", "no exame"]);
    }

    #[test]
    fn an_overlong_word_is_hard_broken() {
        let lines = wrap_text("pneumoultramicroscopico", 10.0, 8.0, &FixedAdvance);
        assert_eq!(lines, vec!["pneumoultr", "amicroscop", "ico"]);
    }

    #[test]
    fn explicit_line_breaks_are_honored() {
        let lines = wrap_text("linha um\nlinha dois", 20.0, 8.0, &FixedAdvance);
        assert_eq!(lines, vec!["linha um", "linha dois"]);
    }

    #[test]
    fn empty_text_yields_a_single_empty_line() {
        assert_eq!(wrap_text("", 20.0, 8.0, &FixedAdvance), vec![String::new()]);
    }
}
