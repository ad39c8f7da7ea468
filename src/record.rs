use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// A single scalar value held by one field of a form row. Forms only ever collect
/// plain scalars: free text, a checkbox state or one label out of an enumerated set.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldValue {
    /// A checkbox-style boolean field.
    Flag(bool),
    /// Free text, possibly multi-line (wrapped at render time, never at storage time).
    Text(String),
}

impl FieldValue {
    /// Whether the value would show up as an empty cell on paper.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Flag(_) => false,
            FieldValue::Text(text) => text.trim().is_empty(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(flag: bool) -> Self {
        FieldValue::Flag(flag)
    }
}

/// One row of structured data entered for a form's table: an ordered mapping from
/// the field key to its value. Records have no identity beyond their position in
/// the record list, which is authoritative for rendering order.
///
/// `FormRecord` is an immutable value type: editing a field goes through
/// `with_field`, which returns an updated copy and leaves the original untouched.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct FormRecord {
    #[serde(flatten)]
    fields: BTreeMap<String, FieldValue>,
}

impl FormRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this record with the given field set to the given value.
    pub fn with_field<K: Into<String>, V: Into<FieldValue>>(&self, key: K, value: V) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(key.into(), value.into());
        FormRecord { fields }
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// The text content of a field, or the empty string when the field is absent.
    /// Flags read as their paper representation, which is handled by the renderer,
    /// so they answer with an empty string here.
    pub fn text(&self, key: &str) -> &str {
        match self.fields.get(key) {
            Some(FieldValue::Text(text)) => text,
            _ => "",
        }
    }

    /// The boolean content of a field, defaulting to unchecked when absent or textual.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.fields.get(key), Some(FieldValue::Flag(true)))
    }

    /// Whether the given field is missing or visually empty.
    pub fn is_blank(&self, key: &str) -> bool {
        self.fields.get(key).map_or(true, FieldValue::is_blank)
    }
}

/// The static header fields stamped on every page of an exported document.
/// Immutable once a form session starts; the date is explicitly supplied by the
/// caller and never sampled at render time, so renders stay deterministic.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// The study protocol code, for example "EST-2024-017".
    pub study_code: String,
    /// The official document number of the paper form being replicated.
    pub document_number: String,
    /// The active protocol version label.
    pub version: String,
    /// The date stamped in the header, already formatted for display.
    pub date: String,
}

impl DocumentMetadata {
    /// Rejects metadata that would leave mandatory header fields blank.
    /// The renderer refuses to produce a document from incomplete metadata.
    pub fn validate(&self) -> Result<(), ContextError> {
        if self.study_code.trim().is_empty() {
            return Err(ContextError::with_context(
                "The document metadata is missing the study code",
            ));
        }
        if self.document_number.trim().is_empty() {
            return Err(ContextError::with_context(
                "The document metadata is missing the document number",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updating_a_field_returns_a_new_record_and_keeps_the_original() {
        let record = FormRecord::new()
            .with_field("animal", "Boi1")
            .with_field("peso", "120");
        let updated = record.with_field("peso", "135");

        assert_eq!(record.text("peso"), "120");
        assert_eq!(updated.text("peso"), "135");
        assert_eq!(updated.text("animal"), "Boi1");
    }

    #[test]
    fn flags_and_missing_fields_read_back_with_defaults() {
        let record = FormRecord::new().with_field("vacinado", true);

        assert!(record.flag("vacinado"));
        assert!(!record.flag("pesado"));
        assert_eq!(record.text("vacinado"), "");
        assert!(record.is_blank("observacoes"));
        assert!(!record.is_blank("vacinado"));
    }

    #[test]
    fn metadata_validation_rejects_blank_mandatory_fields() {
        let metadata = DocumentMetadata {
            study_code: "  ".into(),
            document_number: "DOC-042".into(),
            version: "3".into(),
            date: "12/03/2024".into(),
        };
        assert!(metadata.validate().is_err());

        let metadata = DocumentMetadata {
            study_code: "EST-2024-017".into(),
            document_number: "DOC-042".into(),
            version: "3".into(),
            date: "12/03/2024".into(),
        };
        assert!(metadata.validate().is_ok());
    }
}
