use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{check_deadline, validate_storage_key, BlobBackend, BlobError, BlobLocation, BlobResult, WritePolicy};
use crate::Deadline;

/// In-process blob backend.
///
/// Useful for tests and for embedding the vault where persistence is handled
/// elsewhere. Objects live only as long as the backend.
#[derive(Debug, Default)]
pub struct MemoryBlobBackend {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    policy: WritePolicy,
}

impl MemoryBlobBackend {
    /// Creates an empty backend that rejects writes to existing keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty backend with the given write policy.
    #[must_use]
    pub fn with_policy(policy: WritePolicy) -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            policy,
        }
    }

    /// Number of stored objects.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Backend`] if the internal lock is poisoned.
    pub fn len(&self) -> BlobResult<usize> {
        Ok(self.lock()?.len())
    }

    /// Returns `true` if no objects are stored.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Backend`] if the internal lock is poisoned.
    pub fn is_empty(&self) -> BlobResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Sorted list of stored keys.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Backend`] if the internal lock is poisoned.
    pub fn keys(&self) -> BlobResult<Vec<String>> {
        let mut keys: Vec<String> = self.lock()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Overwrites the stored bytes of `key` in place, bypassing the write policy.
    ///
    /// Simulates tampering or bit rot at the storage layer.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::NotFound`] if nothing is stored under `key`.
    pub fn replace_raw(&self, key: &str, data: Vec<u8>) -> BlobResult<()> {
        let mut guard = self.lock()?;
        let slot = guard.get_mut(key).ok_or_else(|| BlobError::NotFound {
            key: key.to_string(),
        })?;
        *slot = data;
        Ok(())
    }

    fn lock(&self) -> BlobResult<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs
            .lock()
            .map_err(|_| BlobError::Backend("mutex poisoned".to_string()))
    }
}

impl BlobBackend for MemoryBlobBackend {
    fn put(
        &self,
        key: &str,
        data: &[u8],
        _content_type: &str,
        deadline: Deadline,
    ) -> BlobResult<BlobLocation> {
        validate_storage_key(key)?;
        check_deadline(key, deadline)?;
        let mut guard = self.lock()?;
        if self.policy == WritePolicy::RejectExisting && guard.contains_key(key) {
            return Err(BlobError::AlreadyExists {
                key: key.to_string(),
            });
        }
        guard.insert(key.to_string(), data.to_vec());
        Ok(BlobLocation {
            key: key.to_string(),
            url: format!("memory://{key}"),
        })
    }

    fn get(&self, key: &str, deadline: Deadline) -> BlobResult<Vec<u8>> {
        validate_storage_key(key)?;
        check_deadline(key, deadline)?;
        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::NotFound {
                key: key.to_string(),
            })
    }

    fn delete(&self, key: &str, deadline: Deadline) -> BlobResult<()> {
        validate_storage_key(key)?;
        check_deadline(key, deadline)?;
        self.lock()?.remove(key);
        Ok(())
    }

    fn write_policy(&self) -> WritePolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn test_put_get_delete() {
        let backend = MemoryBlobBackend::new();
        let location = backend
            .put("documents/1-aa", b"cipher", "application/pdf", Deadline::unbounded())
            .expect("put");
        assert_eq!(location.url, "memory://documents/1-aa");
        assert_eq!(
            backend.get("documents/1-aa", Deadline::unbounded()).expect("get"),
            b"cipher"
        );

        backend.delete("documents/1-aa", Deadline::unbounded()).expect("delete");
        backend
            .delete("documents/1-aa", Deadline::unbounded())
            .expect("second delete is a no-op");
        match backend.get("documents/1-aa", Deadline::unbounded()) {
            Err(BlobError::NotFound { key }) => assert_eq!(key, "documents/1-aa"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_write_policy() {
        let strict = MemoryBlobBackend::new();
        strict.put("k", b"one", "text/plain", Deadline::unbounded()).expect("put");
        match strict.put("k", b"two", "text/plain", Deadline::unbounded()) {
            Err(BlobError::AlreadyExists { .. }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(strict.get("k", Deadline::unbounded()).expect("get"), b"one");
        assert_eq!(strict.write_policy(), WritePolicy::RejectExisting);

        let lenient = MemoryBlobBackend::with_policy(WritePolicy::Overwrite);
        lenient.put("k", b"one", "text/plain", Deadline::unbounded()).expect("put");
        lenient.put("k", b"two", "text/plain", Deadline::unbounded()).expect("overwrite");
        assert_eq!(lenient.get("k", Deadline::unbounded()).expect("get"), b"two");
        assert_eq!(lenient.write_policy(), WritePolicy::Overwrite);
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let backend = MemoryBlobBackend::new();
        match backend.put("k", b"x", "text/plain", Deadline::at(Instant::now())) {
            Err(BlobError::Timeout { .. }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(backend.is_empty().expect("len"));
    }

    #[test]
    fn test_replace_raw() {
        let backend = MemoryBlobBackend::new();
        backend.put("k", b"abc", "text/plain", Deadline::unbounded()).expect("put");
        backend.replace_raw("k", b"abd".to_vec()).expect("replace");
        assert_eq!(backend.get("k", Deadline::unbounded()).expect("get"), b"abd");
        assert!(backend.replace_raw("missing", Vec::new()).is_err());
        assert_eq!(backend.keys().expect("keys"), vec!["k".to_string()]);
    }
}
