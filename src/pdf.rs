use std::{io::BufWriter, mem};

use lopdf::content::Operation;
use lopdf::Object;
use time::OffsetDateTime;
use unicode_normalization::UnicodeNormalization as _;

use crate::error::ContextError;
use crate::fonts::BuiltInFont;

/// The representation of one PDF page: its size in points and the content stream
/// operations accumulated by the drawing functions of `PdfDocument`.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// The index of the page in the document, starting from one.
    pub(crate) number: usize,
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    /// The content stream operations of the page, in emission order.
    pub(crate) operations: Vec<Operation>,
}

/// Converts millimeters to points. This function is used in order to present the data
/// in the format required by the PDF specification, while the end user works in
/// millimeters which are easier to reason about against the paper original.
pub fn millimeters_to_points(millimeters: f32) -> f32 {
    millimeters * 2.834646
}

/// This struct represents the actual PDF document on a high-level. It is an interface
/// to the underlying `lopdf::Document` with the addition of the pages and the document
/// identifier. The drawing functions work in millimeters from the bottom-left corner
/// of the page, mirroring how the paper forms are measured.
///
/// The document only uses the standard built-in Type1 fonts (see `BuiltInFont`), so no
/// font program is ever embedded and the serialized bytes depend on nothing but the
/// emitted operations and the identifiers, which keeps repeated renders byte-identical.
pub struct PdfDocument {
    /// The underlying PDF document: this is a low-level interface and shouldn't be
    /// directly interacted with unless strictly necessary, anyway this is why it is
    /// exposed to the user.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, it is used in order to set the PDF `ID` tag.
    pub identifier: String,
    pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Create a new `PdfDocument` by defaulting the underlying PDF document to version 1.5
    /// of the PDF specification and customly specifying the PDF identifier.
    pub fn new<S: Into<String>>(identifier: S) -> Self {
        PdfDocument {
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: identifier.into(),
            pages: Vec::new(),
        }
    }

    /// Adds a page of the given width and height in millimeters and returns its index,
    /// which is to be passed to the drawing functions.
    pub fn add_page(&mut self, page_width: f32, page_height: f32) -> usize {
        self.pages.push(PdfPage {
            number: self.pages.len() + 1,
            width: millimeters_to_points(page_width),
            height: millimeters_to_points(page_height),
            operations: Vec::new(),
        });

        self.pages.len() - 1
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Writes the text in the specified built-in font, size and fill color with the
    /// baseline starting at `position` (millimeters from the bottom-left corner).
    ///
    /// The text is NFC-normalized and encoded to WinAnsi, which is the encoding
    /// declared for the built-in fonts; characters outside WinAnsi are replaced by
    /// a question mark and logged, they never abort the render.
    pub fn write_text(
        &mut self,
        page_index: usize,
        position: [f32; 2],
        font: BuiltInFont,
        font_size: f32,
        color: [f32; 3],
        text: &str,
    ) -> Result<(), ContextError> {
        let encoded_text = encode_win_ansi(text);
        let [x, y] = position;
        let [red, green, blue] = color;
        let page = self.get_mut_page(page_index)?;

        page.operations.extend(vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![font.resource_name().into(), font_size.into()],
            ),
            Operation::new(
                "Td",
                vec![
                    millimeters_to_points(x).into(),
                    millimeters_to_points(y).into(),
                ],
            ),
            Operation::new(
                "rg",
                vec![red, green, blue]
                    .into_iter()
                    .map(Object::Real)
                    .collect(),
            ),
            Operation::new(
                "Tj",
                vec![Object::String(
                    encoded_text,
                    lopdf::StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
        ]);

        Ok(())
    }

    /// Strokes a straight line between the two points given in millimeters.
    pub fn draw_line(
        &mut self,
        page_index: usize,
        from: [f32; 2],
        to: [f32; 2],
        line_width: f32,
    ) -> Result<(), ContextError> {
        let page = self.get_mut_page(page_index)?;
        page.operations.extend(vec![
            Operation::new("q", vec![]),
            Operation::new("w", vec![line_width.into()]),
            Operation::new(
                "m",
                vec![
                    millimeters_to_points(from[0]).into(),
                    millimeters_to_points(from[1]).into(),
                ],
            ),
            Operation::new(
                "l",
                vec![
                    millimeters_to_points(to[0]).into(),
                    millimeters_to_points(to[1]).into(),
                ],
            ),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    /// Strokes the outline of a rectangle whose lower-left corner sits at `origin`,
    /// with `size` given as width and height, everything in millimeters.
    pub fn draw_rectangle(
        &mut self,
        page_index: usize,
        origin: [f32; 2],
        size: [f32; 2],
        line_width: f32,
    ) -> Result<(), ContextError> {
        let page = self.get_mut_page(page_index)?;
        page.operations.extend(vec![
            Operation::new("q", vec![]),
            Operation::new("w", vec![line_width.into()]),
            Operation::new(
                "re",
                vec![
                    millimeters_to_points(origin[0]).into(),
                    millimeters_to_points(origin[1]).into(),
                    millimeters_to_points(size[0]).into(),
                    millimeters_to_points(size[1]).into(),
                ],
            ),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    /// Draws a checkbox glyph: a small square whose lower-left corner sits at `origin`
    /// with the given side length, crossed by its two diagonals when `checked`. The
    /// paper forms mark their checkboxes with a handwritten cross, which this
    /// reproduces; every boolean maps to exactly one of the two glyph states.
    pub fn draw_checkbox(
        &mut self,
        page_index: usize,
        origin: [f32; 2],
        side: f32,
        checked: bool,
    ) -> Result<(), ContextError> {
        self.draw_rectangle(page_index, origin, [side, side], 0.75)?;
        if checked {
            let [x, y] = origin;
            self.draw_line(page_index, [x, y], [x + side, y + side], 0.75)?;
            self.draw_line(page_index, [x, y + side], [x + side, y], 0.75)?;
        }

        Ok(())
    }

    /// Serializes the document to bytes, finalizing the catalog, the page tree, the
    /// font resources and the document information. The creation and modification
    /// dates are pinned to the epoch so that the output depends on nothing but the
    /// drawn content and the two identifiers.
    ///
    /// One mandatory argument needed by the PDF specification is the instance ID,
    /// which together with the document identifier fills the `ID` tag of the trailer.
    pub fn save_to_bytes(&mut self, instance_id: &str) -> Result<Vec<u8>, ContextError> {
        self.write_all(instance_id)?;

        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error("Error while saving the PDF document to bytes", &error)
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    /// Write the operations so far specified to the underlying PDF document and
    /// finalize it.
    fn write_all(&mut self, instance_id: &str) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::Literal;

        // Construct all the general info that the PDF document needs in order to be
        // parsed correctly and insert it into the PDF document itself. The timestamps
        // are fixed: the date shown on the form is part of the metadata, not of the
        // file properties, and a render must not depend on the wall clock.
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Trapped", "False".into()),
            (
                "CreationDate",
                String(
                    to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH).into_bytes(),
                    Literal,
                ),
            ),
            (
                "ModDate",
                String(
                    to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH).into_bytes(),
                    Literal,
                ),
            ),
            (
                "Producer",
                String("fichario".to_string().into_bytes(), Literal),
            ),
            (
                "Identifier",
                String(self.identifier.clone().into_bytes(), Literal),
            ),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        // Construct the catalog, required by the PDF specification.
        let pages_id = self.inner_document.new_object_id();
        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("PageMode", "UseNone".into()),
            ("Pages", Reference(pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        self.inner_document
            .trailer
            .set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(instance_id.as_bytes().to_vec(), Literal),
            ]),
        );

        // The built-in fonts share one font dictionary referenced by every page.
        let fonts_dictionary = built_in_fonts_dictionary(&mut self.inner_document);
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);

        let mut pages = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(self.pages.len() as i64)),
        ]);

        let mut page_ids = Vec::<lopdf::Object>::new();
        for page in &self.pages {
            let mut page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Rotate", Integer(0)),
                (
                    "MediaBox",
                    vec![0.into(), 0.into(), page.width.into(), page.height.into()].into(),
                ),
                (
                    "TrimBox",
                    vec![0.into(), 0.into(), page.width.into(), page.height.into()].into(),
                ),
                (
                    "CropBox",
                    vec![0.into(), 0.into(), page.width.into(), page.height.into()].into(),
                ),
                ("Parent", Reference(pages_id)),
            ]);

            let resources = lopdf::Dictionary::from_iter(vec![(
                "Font",
                Reference(fonts_dictionary_id),
            )]);
            let resources_id = self.inner_document.add_object(Dictionary(resources));
            page_dictionary.set("Resources", Reference(resources_id));

            // Encode the accumulated operations of the page into its content stream.
            let content = lopdf::content::Content {
                operations: page.operations.clone(),
            };
            let content_bytes = content.encode().map_err(|error| {
                ContextError::with_error(
                    format!("Failed to encode the content of page {}", page.number),
                    &error,
                )
            })?;
            let content_stream = lopdf::Stream::new(lopdf::Dictionary::new(), content_bytes)
                .with_compression(false); // Page contents should not be compressed
            let page_content_id = self.inner_document.add_object(content_stream);
            page_dictionary.set("Contents", Reference(page_content_id));

            let page_id = self.inner_document.add_object(page_dictionary);
            page_ids.push(Reference(page_id));
        }

        // Use all the collected page references in order to set the "Kids" field of the
        // pages dictionary and then insert it into the document itself as a last operation.
        pages.set::<_, lopdf::Object>("Kids".to_string(), page_ids.into());
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        Ok(())
    }

    // Retrieve the page at the given page index.
    fn get_mut_page(&mut self, page_index: usize) -> Result<&mut PdfPage, ContextError> {
        self.pages
            .get_mut(page_index)
            .ok_or(ContextError::with_context(format!(
                "Failed to find the page with index {}",
                page_index
            )))
    }
}

/// Builds the shared font dictionary mapping each built-in font resource name to its
/// Type1 font dictionary. No font program is embedded: the standard fonts are
/// provided by the reader, only their name and encoding are declared.
fn built_in_fonts_dictionary(inner_document: &mut lopdf::Document) -> lopdf::Dictionary {
    use lopdf::Object::*;

    let mut fonts_dictionary = lopdf::Dictionary::new();
    for font in BuiltInFont::all() {
        let font_dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("Type1".into())),
            ("BaseFont", Name(font.postscript_name().into())),
            ("Encoding", Name("WinAnsiEncoding".into())),
        ]);
        let font_id = inner_document.add_object(Dictionary(font_dictionary));
        fonts_dictionary.set(font.resource_name(), Reference(font_id));
    }

    fonts_dictionary
}

/// Encodes a string to the WinAnsi (CP1252) bytes expected by the built-in fonts,
/// normalizing to NFC first so that decomposed accents collapse onto the precomposed
/// Latin-1 codepoints the encoding does cover.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.nfc()
        .map(|character| match character as u32 {
            // ASCII and the Latin-1 supplement map onto themselves.
            0x20..=0x7e | 0xa0..=0xff => character as u8,
            _ => match character {
                '€' => 0x80,
                '‚' => 0x82,
                '„' => 0x84,
                '…' => 0x85,
                '‘' => 0x91,
                '’' => 0x92,
                '“' => 0x93,
                '”' => 0x94,
                '•' => 0x95,
                '–' => 0x96,
                '—' => 0x97,
                '™' => 0x99,
                _ => {
                    log::warn!(
                        "The character {:?} cannot be encoded in WinAnsi, replacing it",
                        character
                    );
                    b'?'
                }
            },
        })
        .collect()
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_and_latin1_text_encode_onto_their_own_bytes() {
        assert_eq!(encode_win_ansi("Boi1"), b"Boi1".to_vec());
        assert_eq!(encode_win_ansi("pesagem à tarde"), {
            let mut expected = b"pesagem ".to_vec();
            expected.push(0xe0);
            expected.extend_from_slice(b" tarde");
            expected
        });
    }

    #[test]
    fn characters_outside_win_ansi_are_replaced() {
        assert_eq!(encode_win_ansi("体重"), b"??".to_vec());
    }

    #[test]
    fn decomposed_accents_are_recomposed_before_encoding() {
        // "a" followed by a combining tilde normalizes to the precomposed letter.
        assert_eq!(encode_win_ansi("a\u{0303}"), vec![0xe3]);
    }

    #[test]
    fn an_unchecked_checkbox_emits_only_the_square() {
        let mut document = PdfDocument::new("test");
        let page = document.add_page(210.0, 297.0);
        document.draw_checkbox(page, [10.0, 10.0], 3.5, false).unwrap();
        let strokes = count_operations(&document, page, "re");
        let lines = count_operations(&document, page, "l");
        assert_eq!(strokes, 1);
        assert_eq!(lines, 0);
    }

    #[test]
    fn a_checked_checkbox_emits_the_square_and_both_diagonals() {
        let mut document = PdfDocument::new("test");
        let page = document.add_page(210.0, 297.0);
        document.draw_checkbox(page, [10.0, 10.0], 3.5, true).unwrap();
        let strokes = count_operations(&document, page, "re");
        let lines = count_operations(&document, page, "l");
        assert_eq!(strokes, 1);
        assert_eq!(lines, 2);
    }

    #[test]
    fn drawing_on_a_missing_page_is_an_error() {
        let mut document = PdfDocument::new("test");
        assert!(document.draw_line(3, [0.0, 0.0], [1.0, 1.0], 0.5).is_err());
    }

    #[test]
    fn the_epoch_timestamp_matches_the_pdf_format() {
        assert_eq!(
            to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH),
            "D:19700101000000+00'00'"
        );
    }

    fn count_operations(document: &PdfDocument, page_index: usize, operator: &str) -> usize {
        document.pages[page_index]
            .operations
            .iter()
            .filter(|operation| operation.operator == operator)
            .count()
    }
}
