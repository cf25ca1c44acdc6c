//! Library store.

use crate::access::{encode, load};
use crate::context::StoreContext;
use crate::error::{StoreError, StoreResult};
use crate::model::{Directory, Library};
use listenup_codec::{decode_record, keys, RecordKind};
use listenup_core::retry::CancelToken;
use listenup_core::ReadOps;
use tracing::{debug, info};

const ENTITY: &str = "library";

/// Store for libraries and their directory lists.
///
/// Directories are only ever appended.
#[derive(Debug, Clone, Copy)]
pub struct LibraryStore<'a> {
    ctx: &'a StoreContext,
}

impl<'a> LibraryStore<'a> {
    pub(crate) fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    /// Creates a library.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if a library with the same id exists
    /// - `Invalid` if the id is empty
    pub fn create_library(&self, cancel: &CancelToken, library: &Library) -> StoreResult<()> {
        if library.id.is_empty() {
            return Err(StoreError::invalid("library id must not be empty"));
        }
        let key = keys::library(&library.id);
        let value = encode(RecordKind::Library, library, ENTITY)?;

        self.ctx.mutate(cancel, "create_library", |txn| {
            if txn.contains(&key)? {
                return Err(StoreError::already_exists(ENTITY, library.id.clone()));
            }
            txn.put(key.clone(), value.clone());
            Ok(())
        })?;

        info!(library_id = %library.id, name = %library.name, "library created");
        Ok(())
    }

    /// Returns the library with `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such library.
    pub fn get_library_by_id(&self, id: &str) -> StoreResult<Library> {
        self.ctx
            .database()
            .view(|txn| load::<Library, _>(txn, &keys::library(id), RecordKind::Library, ENTITY))?
            .ok_or_else(|| StoreError::not_found(ENTITY, id))
    }

    /// Appends `directory` to a library and returns the updated library.
    ///
    /// Concurrent appends to the same library conflict at commit; the
    /// loser re-reads and appends to the winner's list, so no directory is
    /// lost.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the library does not exist.
    pub fn add_directory(
        &self,
        cancel: &CancelToken,
        library_id: &str,
        directory: &Directory,
    ) -> StoreResult<Library> {
        let key = keys::library(library_id);

        let library = self.ctx.mutate(cancel, "add_directory", |txn| {
            let mut library: Library = load(txn, &key, RecordKind::Library, ENTITY)?
                .ok_or_else(|| StoreError::not_found(ENTITY, library_id))?;
            library.directories.push(directory.clone());
            txn.put(key.clone(), encode(RecordKind::Library, &library, ENTITY)?);
            Ok(library)
        })?;

        debug!(
            library_id,
            directory = %directory.path,
            directories = library.directories.len(),
            "directory added"
        );
        Ok(library)
    }

    /// Returns every library, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if any stored library cannot be decoded.
    pub fn get_all_libraries(&self) -> StoreResult<Vec<Library>> {
        self.ctx.database().view(|txn| {
            txn.scan_prefix(keys::LIBRARY_PREFIX)?
                .into_iter()
                .map(|(_, bytes)| {
                    decode_record(RecordKind::Library, &bytes)
                        .map_err(|e| StoreError::malformed(ENTITY, e))
                })
                .collect()
        })
    }

    /// Returns the libraries among `ids` that exist, in the order given.
    ///
    /// Missing ids are skipped; they are not an error.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if a stored library cannot be decoded.
    pub fn get_libraries_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> StoreResult<Vec<Library>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        self.ctx.database().view(|txn| {
            let mut found = Vec::with_capacity(ids.len());
            for id in ids {
                let key = keys::library(id.as_ref());
                if let Some(library) = load::<Library, _>(txn, &key, RecordKind::Library, ENTITY)? {
                    found.push(library);
                }
            }
            Ok(found)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StoreConfig;
    use crate::error::ErrorKind;
    use listenup_core::retry::RetryPolicy;
    use std::error::Error as _;

    fn ctx() -> StoreContext {
        StoreContext::in_memory(StoreConfig::default()).unwrap()
    }

    #[test]
    fn create_and_get() {
        let ctx = ctx();
        let library = Library::new("Audiobooks");
        ctx.libraries().create_library(&CancelToken::new(), &library).unwrap();
        assert_eq!(ctx.libraries().get_library_by_id(&library.id).unwrap(), library);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let ctx = ctx();
        let cancel = CancelToken::new();
        let library = Library::new("A");
        ctx.libraries().create_library(&cancel, &library).unwrap();

        let mut clash = Library::new("B");
        clash.id = library.id.clone();
        let err = ctx.libraries().create_library(&cancel, &clash).unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(ctx.libraries().get_library_by_id(&library.id).unwrap().name, "A");
    }

    #[test]
    fn add_directory_appends_in_order() {
        let ctx = ctx();
        let cancel = CancelToken::new();
        let library = Library::new("L");
        ctx.libraries().create_library(&cancel, &library).unwrap();

        let first = Directory::new("Books", "/books");
        let second = Directory::new("More", "/more");
        ctx.libraries().add_directory(&cancel, &library.id, &first).unwrap();
        let updated = ctx.libraries().add_directory(&cancel, &library.id, &second).unwrap();

        assert_eq!(updated.directories, vec![first, second]);
        assert_eq!(ctx.libraries().get_library_by_id(&library.id).unwrap(), updated);
    }

    #[test]
    fn add_directory_to_missing_library() {
        let ctx = ctx();
        let err = ctx
            .libraries()
            .add_directory(&CancelToken::new(), "nope", &Directory::new("x", "/x"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn conflict_without_retries_is_exhausted() {
        let config = StoreConfig::default().retry(RetryPolicy::no_retry());
        let ctx = StoreContext::in_memory(config).unwrap();
        let cancel = CancelToken::new();
        let library = Library::new("L");
        ctx.libraries().create_library(&cancel, &library).unwrap();
        let key = keys::library(&library.id);
        let theirs = Directory::new("Theirs", "/theirs");

        let err = ctx
            .mutate(&cancel, "add_directory", |txn| {
                let mut current: Library = load(txn, &key, RecordKind::Library, ENTITY)?
                    .ok_or_else(|| StoreError::not_found(ENTITY, library.id.clone()))?;
                // A second writer commits between this read and our commit.
                ctx.libraries()
                    .add_directory(&CancelToken::new(), &library.id, &theirs)?;
                current.directories.push(Directory::new("Mine", "/mine"));
                txn.put(key.clone(), encode(RecordKind::Library, &current, ENTITY)?);
                Ok(())
            })
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RetryExhausted);
        assert!(err.source().is_some());
        match &err {
            StoreError::RetryExhausted { attempts, source } => {
                assert_eq!(*attempts, 1);
                assert_eq!(source.kind(), ErrorKind::Conflict);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let stored = ctx.libraries().get_library_by_id(&library.id).unwrap();
        assert_eq!(stored.directories, vec![theirs]);
    }

    #[test]
    fn batch_lookup_skips_missing() {
        let ctx = ctx();
        let cancel = CancelToken::new();
        let a = Library::new("A");
        let b = Library::new("B");
        ctx.libraries().create_library(&cancel, &a).unwrap();
        ctx.libraries().create_library(&cancel, &b).unwrap();

        let ids = [b.id.clone(), "missing".to_string(), a.id.clone()];
        let found = ctx.libraries().get_libraries_by_ids(&ids).unwrap();
        assert_eq!(found, vec![b.clone(), a.clone()]);

        let none: [&str; 0] = [];
        assert!(ctx.libraries().get_libraries_by_ids(&none).unwrap().is_empty());
        assert_eq!(ctx.libraries().get_all_libraries().unwrap().len(), 2);
    }
}
