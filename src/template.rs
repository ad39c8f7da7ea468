use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// The two page geometries used by the paper forms. All forms are A4, only the
/// orientation varies per form type.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// The page size in millimeters (width, height).
    pub fn page_size(&self) -> (f32, f32) {
        match self {
            Orientation::Portrait => (210.0, 297.0),
            Orientation::Landscape => (297.0, 210.0),
        }
    }
}

/// How the cell content of one column is drawn.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    /// Free text, word-wrapped to the cell width.
    Text,
    /// A small square glyph, crossed when the field is true.
    Checkbox,
}

/// One column of the tabular body: which record field it shows, the label
/// repeated in the column header on every page, and its printed width.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    /// The record field key this column reads.
    pub key: String,
    /// The header label, reproduced verbatim from the paper form.
    pub label: String,
    /// The printed column width in millimeters.
    pub width: f32,
    pub kind: ColumnKind,
}

/// The static layout description of one form type: everything needed to replicate
/// the paper original apart from the record data itself. The ~30 concrete forms of
/// the study all instantiate this one shape with different field sets, so they are
/// described as JSON documents rather than as code.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplate {
    /// The form type key, also used for the cache and backend content keys.
    pub form_type: String,
    /// The title printed at the top of every page.
    pub title: String,
    /// The official document number of the paper form; the exported file is named after it.
    pub document_number: String,
    pub orientation: Orientation,
    pub columns: Vec<ColumnSpec>,
    /// How many body rows fit on one page.
    pub rows_per_page: usize,
    /// The printed height of one body row in millimeters.
    pub row_height: f32,
    /// Some forms append blank rows up to this count for visual fidelity with the
    /// paper original, others print only the filled rows.
    #[serde(default)]
    pub pad_to_minimum_rows: Option<usize>,
    /// The record field whose blankness makes a row meaningless (for example the
    /// animal name); the session refuses to append records where it is blank.
    pub identifying_field: String,
    /// The labels under the signature lines of the page footer.
    #[serde(default)]
    pub signature_labels: Vec<String>,
}

/// The fixed page margin in millimeters, shared by all form types.
pub const PAGE_MARGIN: f32 = 12.0;

impl FormTemplate {
    /// Reads and validates a form template from a JSON file.
    pub fn from_path(template_path: &Path) -> Result<FormTemplate, ContextError> {
        let template_content = std::fs::read_to_string(template_path).map_err(|error| {
            ContextError::with_error(
                format!("Unable to read the form template {:?}", template_path),
                &error,
            )
        })?;
        let template: FormTemplate =
            serde_json::from_str(&template_content).map_err(|error| {
                ContextError::with_error(
                    format!("Unable to parse the form template {:?}", template_path),
                    &error,
                )
            })?;
        template.validate()?;

        Ok(template)
    }

    /// Checks the template invariants which the layouting arithmetic relies upon.
    pub fn validate(&self) -> Result<(), ContextError> {
        if self.columns.is_empty() {
            return Err(ContextError::with_context(format!(
                "The form template {:?} has no columns",
                self.form_type
            )));
        }
        if self.rows_per_page == 0 {
            return Err(ContextError::with_context(format!(
                "The form template {:?} must fit at least one row per page",
                self.form_type
            )));
        }
        if self.row_height <= 0.0 {
            return Err(ContextError::with_context(format!(
                "The form template {:?} has a non-positive row height",
                self.form_type
            )));
        }
        let table_width: f32 = self.columns.iter().map(|column| column.width).sum();
        let printable_width = self.orientation.page_size().0 - 2.0 * PAGE_MARGIN;
        if table_width > printable_width {
            return Err(ContextError::with_context(format!(
                "The columns of the form template {:?} are {table_width:.1} mm wide, \
                 which exceeds the printable width of {printable_width:.1} mm",
                self.form_type
            )));
        }
        Ok(())
    }

    /// The total printed width of the body table in millimeters.
    pub fn table_width(&self) -> f32 {
        self.columns.iter().map(|column| column.width).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_with_columns(columns: Vec<ColumnSpec>) -> FormTemplate {
        FormTemplate {
            form_type: "pesagem".into(),
            title: "Registro de pesagem".into(),
            document_number: "DOC-042".into(),
            orientation: Orientation::Portrait,
            columns,
            rows_per_page: 20,
            row_height: 8.0,
            pad_to_minimum_rows: None,
            identifying_field: "animal".into(),
            signature_labels: vec!["Responsável".into()],
        }
    }

    fn text_column(key: &str, width: f32) -> ColumnSpec {
        ColumnSpec {
            key: key.into(),
            label: key.to_uppercase(),
            width,
            kind: ColumnKind::Text,
        }
    }

    #[test]
    fn a_template_without_columns_is_rejected() {
        assert!(template_with_columns(vec![]).validate().is_err());
    }

    #[test]
    fn a_template_wider_than_the_page_is_rejected() {
        let template =
            template_with_columns(vec![text_column("animal", 150.0), text_column("peso", 80.0)]);
        assert!(template.validate().is_err());
    }

    #[test]
    fn a_template_that_fits_the_page_passes_validation() {
        let template =
            template_with_columns(vec![text_column("animal", 100.0), text_column("peso", 80.0)]);
        assert!(template.validate().is_ok());
    }

    #[test]
    fn zero_rows_per_page_is_rejected() {
        let mut template = template_with_columns(vec![text_column("animal", 100.0)]);
        template.rows_per_page = 0;
        assert!(template.validate().is_err());
    }
}
