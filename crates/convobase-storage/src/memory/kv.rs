use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::errors::StorageError;
use crate::kv::{KvItem, KvKey, KvQuery, KvStore, KvUpdate};

/// Hermetic backend for tests and local runs. Emulates the composite-key
/// table plus both projections over a single ordered map.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    inner: Arc<RwLock<BTreeMap<(String, String), KvItem>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

fn add_values(current: Option<&Value>, delta: &Value) -> Result<Value, StorageError> {
    let current = current.cloned().unwrap_or(Value::from(0));
    match (current.as_i64(), delta.as_i64()) {
        (Some(a), Some(b)) => Ok(Value::from(a + b)),
        _ => {
            let a = current
                .as_f64()
                .ok_or_else(|| StorageError::codec("add target is not numeric"))?;
            let b = delta
                .as_f64()
                .ok_or_else(|| StorageError::codec("add delta is not numeric"))?;
            serde_json::Number::from_f64(a + b)
                .map(Value::Number)
                .ok_or_else(|| StorageError::codec("add produced a non-finite number"))
        }
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn put(&self, item: KvItem) -> Result<(), StorageError> {
        let key = (item.pk().to_string(), item.sk().to_string());
        if key.0.is_empty() || key.1.is_empty() {
            return Err(StorageError::codec("kv item missing PK/SK"));
        }
        self.inner.write().insert(key, item);
        Ok(())
    }

    async fn get(&self, pk: &str, sk: &str) -> Result<Option<KvItem>, StorageError> {
        Ok(self
            .inner
            .read()
            .get(&(pk.to_string(), sk.to_string()))
            .cloned())
    }

    async fn query(&self, query: &KvQuery) -> Result<Vec<KvItem>, StorageError> {
        let guard = self.inner.read();
        let mut matches: Vec<&KvItem> = guard
            .values()
            .filter(|item| item.partition_for(query.index) == Some(query.partition.as_str()))
            .filter(|item| match (&query.sort_prefix, item.sort_for(query.index)) {
                (None, Some(_)) => true,
                (Some(prefix), Some(sort)) => sort.starts_with(prefix.as_str()),
                (_, None) => false,
            })
            .collect();
        matches.sort_by(|a, b| a.sort_for(query.index).cmp(&b.sort_for(query.index)));
        if !query.scan_forward {
            matches.reverse();
        }
        if let Some(limit) = query.limit {
            matches.truncate(limit as usize);
        }
        Ok(matches.into_iter().cloned().collect())
    }

    async fn update(&self, pk: &str, sk: &str, patch: &KvUpdate) -> Result<(), StorageError> {
        let mut guard = self.inner.write();
        let item = guard
            .get_mut(&(pk.to_string(), sk.to_string()))
            .ok_or_else(|| StorageError::not_found(&format!("kv item {pk}/{sk}")))?;
        for (attr, value) in &patch.set {
            item.set(attr, value.clone());
        }
        for (attr, delta) in &patch.add {
            let next = add_values(item.0.get(attr.as_str()), delta)?;
            item.set(attr, next);
        }
        for attr in &patch.remove {
            item.0.remove(attr.as_str());
        }
        Ok(())
    }

    async fn batch_delete(&self, keys: &[KvKey]) -> Result<(), StorageError> {
        let mut guard = self.inner.write();
        for key in keys {
            guard.remove(&(key.pk.clone(), key.sk.clone()));
        }
        Ok(())
    }
}
