//! The built-in Type1 fonts used by the exported documents, together with their
//! width tables. The paper forms are typeset in plain Helvetica, so the renderer
//! relies on the fourteen standard PDF fonts instead of embedding a TTF: every
//! conforming reader ships them, the output stays small and the byte stream stays
//! fully deterministic.

use crate::layout::TextMeasure;

/// The subset of the standard PDF fonts the form renderer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuiltInFont {
    Helvetica,
    HelveticaBold,
    Courier,
}

impl BuiltInFont {
    /// The PostScript name used for the `BaseFont` entry of the font dictionary.
    pub fn postscript_name(&self) -> &'static str {
        match self {
            BuiltInFont::Helvetica => "Helvetica",
            BuiltInFont::HelveticaBold => "Helvetica-Bold",
            BuiltInFont::Courier => "Courier",
        }
    }

    /// The resource identifier of the font inside the PDF page resources.
    pub fn resource_name(&self) -> &'static str {
        match self {
            BuiltInFont::Helvetica => "F0",
            BuiltInFont::HelveticaBold => "F1",
            BuiltInFont::Courier => "F2",
        }
    }

    pub fn all() -> [BuiltInFont; 3] {
        [
            BuiltInFont::Helvetica,
            BuiltInFont::HelveticaBold,
            BuiltInFont::Courier,
        ]
    }

    /// The advance width of one character in font units (1000 per em), taken from
    /// the AFM metrics of the standard fonts. Characters outside the table fall
    /// back to the width of a lowercase letter, which only affects wrapping.
    fn glyph_width(&self, character: char) -> u32 {
        match self {
            BuiltInFont::Courier => 600,
            BuiltInFont::Helvetica => {
                let index = character as usize;
                if (0x20..=0x7e).contains(&index) {
                    HELVETICA_WIDTHS[index - 0x20]
                } else {
                    556
                }
            }
            BuiltInFont::HelveticaBold => {
                let index = character as usize;
                if (0x20..=0x7e).contains(&index) {
                    HELVETICA_BOLD_WIDTHS[index - 0x20]
                } else {
                    611
                }
            }
        }
    }

    /// The printed width of a string in millimeters at the given font size in points.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text.chars().map(|character| self.glyph_width(character)).sum();
        // Font units are thousandths of the font size; the result is in points,
        // converted to millimeters to match the page coordinate space.
        (units as f32 / 1000.0) * font_size / 2.834646
    }
}

impl TextMeasure for BuiltInFont {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        BuiltInFont::text_width(self, text, font_size)
    }
}

/// Helvetica AFM advance widths for the printable ASCII range (0x20 through 0x7e).
const HELVETICA_WIDTHS: [u32; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, // 'a'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Helvetica-Bold AFM advance widths for the printable ASCII range.
const HELVETICA_BOLD_WIDTHS: [u32; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389,
    556, 333, 611, 556, 778, 556, 556, 500, // 'a'..'z'
    389, 280, 389, 584, // '{'..'~'
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn courier_measures_monospaced() {
        let narrow = BuiltInFont::Courier.text_width("iiii", 10.0);
        let wide = BuiltInFont::Courier.text_width("MMMM", 10.0);
        assert_eq!(narrow, wide);
    }

    #[test]
    fn helvetica_is_proportional() {
        let narrow = BuiltInFont::Helvetica.text_width("iiii", 10.0);
        let wide = BuiltInFont::Helvetica.text_width("MMMM", 10.0);
        assert!(narrow < wide);
    }

    #[test]
    fn width_scales_linearly_with_the_font_size() {
        let at_eight = BuiltInFont::Helvetica.text_width("Boi1", 8.0);
        let at_sixteen = BuiltInFont::Helvetica.text_width("Boi1", 16.0);
        assert!((at_sixteen - 2.0 * at_eight).abs() < 1e-4);
    }
}
