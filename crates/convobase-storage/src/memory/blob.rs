use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::blob::BlobStore;
use crate::errors::StorageError;

#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    inner: Arc<RwLock<HashMap<String, StoredBlob>>>,
}

#[derive(Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    #[allow(dead_code)]
    content_type: String,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.inner.write().insert(
            key.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.inner
            .read()
            .get(key)
            .map(|blob| blob.bytes.clone())
            .ok_or_else(|| StorageError::not_found(&format!("blob {key}")))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blob_cycle() {
        let store = MemoryBlobStore::new();
        store
            .put("a/b", b"hello".to_vec(), "text/plain")
            .await
            .unwrap();
        assert_eq!(store.get("a/b").await.unwrap(), b"hello");
        store.delete("a/b").await.unwrap();
        assert!(store.get("a/b").await.unwrap_err().is_not_found());
    }
}
