//! The form session: the in-memory state and operations for one form-type's
//! current editing instance. It owns the ordered record list and the document
//! metadata, and keeps two external stores in sync: the remote backend, which is
//! authoritative, and the local cache, which holds the last-known draft as an
//! offline fallback so that no entered data is ever lost to a network failure.

use crate::cache::LocalCache;
use crate::error::ContextError;
use crate::record::{DocumentMetadata, FieldValue, FormRecord};
use crate::remote::RemoteStore;
use crate::template::FormTemplate;

/// Where the loaded state of a session came from, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadedFrom {
    Remote,
    Cache,
    Default,
}

pub struct FormSession<R: RemoteStore> {
    template: FormTemplate,
    session_id: String,
    metadata: DocumentMetadata,
    records: Vec<FormRecord>,
    /// The numeric version identifier obtained from the backend on load; saving
    /// is only possible once it is known.
    version: Option<u64>,
    remote: R,
    cache: LocalCache,
}

impl<R: RemoteStore> FormSession<R> {
    pub fn new(
        template: FormTemplate,
        session_id: String,
        metadata: DocumentMetadata,
        remote: R,
        cache: LocalCache,
    ) -> Self {
        FormSession {
            template,
            session_id,
            metadata,
            records: Vec::new(),
            version: None,
            remote,
            cache,
        }
    }

    pub fn records(&self) -> &[FormRecord] {
        &self.records
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub fn template(&self) -> &FormTemplate {
        &self.template
    }

    fn cache_key(&self) -> String {
        LocalCache::key(&self.template.form_type, &self.session_id)
    }

    /// Appends a record to the end of the list. A record whose identifying field
    /// is blank is meaningless on the printed form and is rejected; the session
    /// state is left untouched and the caller gets `false` back.
    pub fn add_record(&mut self, record: FormRecord) -> Result<bool, ContextError> {
        if record.is_blank(&self.template.identifying_field) {
            log::debug!(
                "Rejecting a record with a blank {:?} field",
                self.template.identifying_field
            );
            return Ok(false);
        }
        self.records.push(record);
        self.persist_draft()?;

        Ok(true)
    }

    /// Removes the record at the given position. There is no undo.
    pub fn remove_record(&mut self, index: usize) -> Result<(), ContextError> {
        if index >= self.records.len() {
            return Err(ContextError::with_context(format!(
                "There is no record at position {} to remove",
                index
            )));
        }
        self.records.remove(index);
        self.persist_draft()?;

        Ok(())
    }

    /// Replaces one field of the record at the given position. The record itself
    /// is an immutable value, so the stored entry is swapped for its updated copy.
    pub fn update_field<V: Into<FieldValue>>(
        &mut self,
        index: usize,
        key: &str,
        value: V,
    ) -> Result<(), ContextError> {
        let record = self
            .records
            .get(index)
            .ok_or(ContextError::with_context(format!(
                "There is no record at position {} to update",
                index
            )))?;
        self.records[index] = record.with_field(key, value);
        self.persist_draft()?;

        Ok(())
    }

    /// Loads the session state, trying the sources in their fallback order: the
    /// remote backend is authoritative; on any remote failure the last locally
    /// cached draft is used; with neither available the session starts empty.
    /// Returns which source won, so the caller can tell the user about stale data.
    pub fn load(&mut self) -> Result<LoadedFrom, ContextError> {
        match self.load_from_remote() {
            Ok(loaded_from) => Ok(loaded_from),
            Err(error) => {
                log::warn!(
                    "Unable to load the form {:?} from the backend, falling back to the local \
                     cache: {}",
                    self.template.form_type,
                    error
                );
                self.load_from_cache()
            }
        }
    }

    fn load_from_remote(&mut self) -> Result<LoadedFrom, ContextError> {
        let version = self.remote.activate_version(&self.metadata.study_code)?;
        self.version = Some(version);
        match self.remote.fetch_content(&self.template.form_type, version)? {
            Some(records) => {
                self.records = records;
                // The fetched state becomes the new last-known draft.
                self.persist_draft()?;
                Ok(LoadedFrom::Remote)
            }
            None => {
                self.records = Vec::new();
                Ok(LoadedFrom::Default)
            }
        }
    }

    fn load_from_cache(&mut self) -> Result<LoadedFrom, ContextError> {
        match self.cache.get(&self.cache_key())? {
            Some(serialized_records) => {
                self.records =
                    serde_json::from_str(&serialized_records).map_err(|error| {
                        ContextError::with_error(
                            format!(
                                "Unable to parse the cached draft of the form {:?}",
                                self.template.form_type
                            ),
                            &error,
                        )
                    })?;
                Ok(LoadedFrom::Cache)
            }
            None => {
                self.records = Vec::new();
                Ok(LoadedFrom::Default)
            }
        }
    }

    /// Sends the full current state to the backend under the version identifier
    /// obtained on load. A failure is recoverable: the in-memory records and the
    /// cached draft are left exactly as they were and the caller may retry.
    /// Taking `&mut self` also means a second save cannot start before this one
    /// returned, so two saves from the same session never race at the backend.
    pub fn save(&mut self) -> Result<(), ContextError> {
        let version = self.version.ok_or(ContextError::with_context(
            "The session has no active version yet, load it before saving",
        ))?;
        self.remote
            .save_content(&self.template.form_type, version, &self.records)?;
        log::info!(
            "Saved {} records of the form {:?} under version {}",
            self.records.len(),
            self.template.form_type,
            version
        );

        Ok(())
    }

    /// Writes the serialized record list to the local cache. Called on every
    /// meaningful change, so a crash or an expired login never loses entered data.
    fn persist_draft(&self) -> Result<(), ContextError> {
        let serialized_records = serde_json::to_string(&self.records).map_err(|error| {
            ContextError::with_error(
                format!(
                    "Unable to serialize the draft of the form {:?}",
                    self.template.form_type
                ),
                &error,
            )
        })?;
        self.cache.put(&self.cache_key(), &serialized_records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{ColumnKind, ColumnSpec, Orientation};
    use std::cell::RefCell;

    /// A scripted backend: every operation either answers from the script or fails,
    /// and saves are recorded for inspection.
    struct ScriptedRemote {
        reachable: bool,
        content: Option<Vec<FormRecord>>,
        saved: RefCell<Vec<Vec<FormRecord>>>,
        save_fails: bool,
    }

    impl ScriptedRemote {
        fn unreachable() -> Self {
            ScriptedRemote {
                reachable: false,
                content: None,
                saved: RefCell::new(Vec::new()),
                save_fails: false,
            }
        }

        fn with_content(content: Option<Vec<FormRecord>>) -> Self {
            ScriptedRemote {
                reachable: true,
                content,
                saved: RefCell::new(Vec::new()),
                save_fails: false,
            }
        }
    }

    impl RemoteStore for ScriptedRemote {
        fn activate_version(&self, _study_code: &str) -> Result<u64, ContextError> {
            if self.reachable {
                Ok(7)
            } else {
                Err(ContextError::with_context("The backend is unreachable"))
            }
        }

        fn fetch_content(
            &self,
            _form_type: &str,
            _version: u64,
        ) -> Result<Option<Vec<FormRecord>>, ContextError> {
            if self.reachable {
                Ok(self.content.clone())
            } else {
                Err(ContextError::with_context("The backend is unreachable"))
            }
        }

        fn save_content(
            &self,
            _form_type: &str,
            _version: u64,
            records: &[FormRecord],
        ) -> Result<(), ContextError> {
            if self.save_fails {
                return Err(ContextError::with_context("The backend rejected the save"));
            }
            self.saved.borrow_mut().push(records.to_vec());
            Ok(())
        }

        fn create_protocol(&self, _study_code: &str) -> Result<u64, ContextError> {
            Ok(1)
        }
    }

    fn template() -> FormTemplate {
        FormTemplate {
            form_type: "pesagem".into(),
            title: "Registro de pesagem".into(),
            document_number: "DOC-042".into(),
            orientation: Orientation::Portrait,
            columns: vec![ColumnSpec {
                key: "animal".into(),
                label: "Animal".into(),
                width: 60.0,
                kind: ColumnKind::Text,
            }],
            rows_per_page: 20,
            row_height: 8.0,
            pad_to_minimum_rows: None,
            identifying_field: "animal".into(),
            signature_labels: vec![],
        }
    }

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            study_code: "EST-2024-017".into(),
            document_number: "DOC-042".into(),
            version: "3".into(),
            date: "12/03/2024".into(),
        }
    }

    fn session_with(
        remote: ScriptedRemote,
        cache_directory: &std::path::Path,
    ) -> FormSession<ScriptedRemote> {
        FormSession::new(
            template(),
            "42".into(),
            metadata(),
            remote,
            LocalCache::open(cache_directory).unwrap(),
        )
    }

    #[test]
    fn a_record_with_a_blank_identifying_field_is_rejected() {
        let scratch = tempfile::tempdir().unwrap();
        let mut session = session_with(ScriptedRemote::unreachable(), scratch.path());

        let accepted = session
            .add_record(FormRecord::new().with_field("animal", "  "))
            .unwrap();
        assert!(!accepted);
        assert!(session.records().is_empty());

        let accepted = session
            .add_record(FormRecord::new().with_field("animal", "Boi1"))
            .unwrap();
        assert!(accepted);
        assert_eq!(session.records().len(), 1);
    }

    #[test]
    fn removing_a_record_out_of_range_is_an_error() {
        let scratch = tempfile::tempdir().unwrap();
        let mut session = session_with(ScriptedRemote::unreachable(), scratch.path());
        assert!(session.remove_record(0).is_err());
    }

    #[test]
    fn updating_a_field_swaps_the_record_for_its_updated_copy() {
        let scratch = tempfile::tempdir().unwrap();
        let mut session = session_with(ScriptedRemote::unreachable(), scratch.path());
        session
            .add_record(FormRecord::new().with_field("animal", "Boi1"))
            .unwrap();
        session.update_field(0, "peso", "120").unwrap();

        assert_eq!(session.records()[0].text("peso"), "120");
        assert_eq!(session.records()[0].text("animal"), "Boi1");
    }

    #[test]
    fn loading_prefers_the_remote_state() {
        let scratch = tempfile::tempdir().unwrap();
        let remote_records = vec![FormRecord::new().with_field("animal", "Boi2")];
        let mut session = session_with(
            ScriptedRemote::with_content(Some(remote_records.clone())),
            scratch.path(),
        );
        // A stale local draft that must lose against the backend.
        session
            .add_record(FormRecord::new().with_field("animal", "Boi1"))
            .unwrap();

        assert_eq!(session.load().unwrap(), LoadedFrom::Remote);
        assert_eq!(session.records(), remote_records.as_slice());
    }

    #[test]
    fn loading_falls_back_to_the_cached_draft_when_the_backend_is_unreachable() {
        let scratch = tempfile::tempdir().unwrap();
        {
            let mut session = session_with(ScriptedRemote::unreachable(), scratch.path());
            session
                .add_record(FormRecord::new().with_field("animal", "Boi1"))
                .unwrap();
        }

        let mut session = session_with(ScriptedRemote::unreachable(), scratch.path());
        assert_eq!(session.load().unwrap(), LoadedFrom::Cache);
        assert_eq!(session.records().len(), 1);
        assert_eq!(session.records()[0].text("animal"), "Boi1");
    }

    #[test]
    fn loading_defaults_to_empty_with_neither_source_available() {
        let scratch = tempfile::tempdir().unwrap();
        let mut session = session_with(ScriptedRemote::unreachable(), scratch.path());
        assert_eq!(session.load().unwrap(), LoadedFrom::Default);
        assert!(session.records().is_empty());
    }

    #[test]
    fn saving_before_loading_is_an_error() {
        let scratch = tempfile::tempdir().unwrap();
        let mut session = session_with(ScriptedRemote::with_content(None), scratch.path());
        session
            .add_record(FormRecord::new().with_field("animal", "Boi1"))
            .unwrap();
        assert!(session.save().is_err());
    }

    #[test]
    fn saving_sends_the_full_current_state() {
        let scratch = tempfile::tempdir().unwrap();
        let mut session = session_with(ScriptedRemote::with_content(None), scratch.path());
        session.load().unwrap();
        session
            .add_record(FormRecord::new().with_field("animal", "Boi1"))
            .unwrap();
        session
            .add_record(FormRecord::new().with_field("animal", "Boi2"))
            .unwrap();
        session.save().unwrap();

        let saved = session.remote.saved.borrow();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].len(), 2);
    }

    #[test]
    fn a_failed_save_leaves_the_in_memory_state_untouched() {
        let scratch = tempfile::tempdir().unwrap();
        let mut remote = ScriptedRemote::with_content(None);
        remote.save_fails = true;
        let mut session = session_with(remote, scratch.path());
        session.load().unwrap();
        session
            .add_record(FormRecord::new().with_field("animal", "Boi1"))
            .unwrap();

        assert!(session.save().is_err());
        assert_eq!(session.records().len(), 1);
        assert_eq!(session.records()[0].text("animal"), "Boi1");
    }
}
