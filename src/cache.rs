//! The local cache collaborator: a file-backed key-value store holding the
//! last-known serialized record list of each form session, used as the offline
//! fallback data source when the remote backend cannot be reached. It mirrors
//! the browser storage of the original data-entry screens: one string value per
//! `"<form-type>_<session-id>"` key.

use std::path::{Path, PathBuf};

use crate::error::ContextError;

pub struct LocalCache {
    cache_directory: PathBuf,
}

impl LocalCache {
    /// Opens a cache rooted at the given directory, creating it when absent.
    pub fn open(cache_directory: &Path) -> Result<LocalCache, ContextError> {
        std::fs::create_dir_all(cache_directory).map_err(|error| {
            ContextError::with_error(
                format!("Unable to create the cache directory {:?}", cache_directory),
                &error,
            )
        })?;

        Ok(LocalCache {
            cache_directory: cache_directory.to_path_buf(),
        })
    }

    /// The cache key of one form session.
    pub fn key(form_type: &str, session_id: &str) -> String {
        format!("{form_type}_{session_id}")
    }

    /// Stores the serialized value under the given key, replacing any previous value.
    pub fn put(&self, key: &str, value: &str) -> Result<(), ContextError> {
        std::fs::write(self.entry_path(key), value).map_err(|error| {
            ContextError::with_error(
                format!("Unable to write the cache entry {:?}", key),
                &error,
            )
        })
    }

    /// Reads the value stored under the given key. A missing entry is a regular
    /// outcome, not an error: the fallback chain treats it as "nothing cached yet".
    pub fn get(&self, key: &str) -> Result<Option<String>, ContextError> {
        let entry_path = self.entry_path(key);
        match std::fs::read_to_string(&entry_path) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(ContextError::with_error(
                format!("Unable to read the cache entry {:?}", key),
                &error,
            )),
        }
    }

    /// Removes the entry stored under the given key, if any.
    pub fn remove(&self, key: &str) -> Result<(), ContextError> {
        let entry_path = self.entry_path(key);
        match std::fs::remove_file(&entry_path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(ContextError::with_error(
                format!("Unable to remove the cache entry {:?}", key),
                &error,
            )),
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_directory.join(format!("{key}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_missing_entry_reads_back_as_none() {
        let scratch = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(scratch.path()).unwrap();
        assert_eq!(cache.get("pesagem_42").unwrap(), None);
    }

    #[test]
    fn a_stored_entry_reads_back_verbatim() {
        let scratch = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(scratch.path()).unwrap();
        cache.put("pesagem_42", r#"[{"animal":"Boi1"}]"#).unwrap();
        assert_eq!(
            cache.get("pesagem_42").unwrap().as_deref(),
            Some(r#"[{"animal":"Boi1"}]"#)
        );
    }

    #[test]
    fn putting_twice_replaces_the_value() {
        let scratch = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(scratch.path()).unwrap();
        cache.put("pesagem_42", "first").unwrap();
        cache.put("pesagem_42", "second").unwrap();
        assert_eq!(cache.get("pesagem_42").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn removing_a_missing_entry_is_not_an_error() {
        let scratch = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(scratch.path()).unwrap();
        assert!(cache.remove("pesagem_42").is_ok());
    }

    #[test]
    fn keys_combine_the_form_type_and_the_session_id() {
        assert_eq!(LocalCache::key("pesagem", "42"), "pesagem_42");
    }
}
