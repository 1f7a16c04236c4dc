use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::StorageError;

pub const ATTR_PK: &str = "PK";
pub const ATTR_SK: &str = "SK";
pub const ATTR_GSI1PK: &str = "GSI1PK";
pub const ATTR_GSI1SK: &str = "GSI1SK";
pub const ATTR_GSI2PK: &str = "GSI2PK";
pub const ATTR_GSI2SK: &str = "GSI2SK";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexName {
    Gsi1,
    Gsi2,
}

impl IndexName {
    pub fn table_name(&self) -> &'static str {
        match self {
            IndexName::Gsi1 => "GSI1",
            IndexName::Gsi2 => "GSI2",
        }
    }

    pub fn partition_attr(&self) -> &'static str {
        match self {
            IndexName::Gsi1 => ATTR_GSI1PK,
            IndexName::Gsi2 => ATTR_GSI2PK,
        }
    }

    pub fn sort_attr(&self) -> &'static str {
        match self {
            IndexName::Gsi1 => ATTR_GSI1SK,
            IndexName::Gsi2 => ATTR_GSI2SK,
        }
    }
}

/// One row of the wide table: key attributes plus the record payload, all in
/// a single flat attribute map.
#[derive(Clone, Debug, PartialEq)]
pub struct KvItem(pub Map<String, Value>);

impl KvItem {
    pub fn from_value(value: Value) -> Result<Self, StorageError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StorageError::codec(&format!(
                "kv item must be an object, got {other}"
            ))),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn str_attr(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.0.insert(name.to_string(), value);
    }

    pub fn set_str(&mut self, name: &str, value: impl Into<String>) {
        self.set(name, Value::String(value.into()));
    }

    pub fn pk(&self) -> &str {
        self.str_attr(ATTR_PK).unwrap_or_default()
    }

    pub fn sk(&self) -> &str {
        self.str_attr(ATTR_SK).unwrap_or_default()
    }

    pub fn partition_for(&self, index: Option<IndexName>) -> Option<&str> {
        match index {
            None => self.str_attr(ATTR_PK),
            Some(idx) => self.str_attr(idx.partition_attr()),
        }
    }

    pub fn sort_for(&self, index: Option<IndexName>) -> Option<&str> {
        match index {
            None => self.str_attr(ATTR_SK),
            Some(idx) => self.str_attr(idx.sort_attr()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KvKey {
    pub pk: String,
    pub sk: String,
}

impl KvKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }
}

/// A single-partition scan, on the base table or one of the projections.
#[derive(Clone, Debug)]
pub struct KvQuery {
    pub index: Option<IndexName>,
    pub partition: String,
    pub sort_prefix: Option<String>,
    pub scan_forward: bool,
    pub limit: Option<u32>,
}

impl KvQuery {
    pub fn base(partition: impl Into<String>) -> Self {
        Self {
            index: None,
            partition: partition.into(),
            sort_prefix: None,
            scan_forward: true,
            limit: None,
        }
    }

    pub fn index(index: IndexName, partition: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            partition: partition.into(),
            sort_prefix: None,
            scan_forward: true,
            limit: None,
        }
    }

    pub fn with_sort_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sort_prefix = Some(prefix.into());
        self
    }

    pub fn descending(mut self) -> Self {
        self.scan_forward = false;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A typed single-item patch. Backends render it to their native update
/// syntax; `add` is numeric and unconditional so concurrent counters
/// interleave but converge.
#[derive(Clone, Debug, Default)]
pub struct KvUpdate {
    pub set: Vec<(String, Value)>,
    pub add: Vec<(String, Value)>,
    pub remove: Vec<String>,
}

impl KvUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, attr: impl Into<String>, value: Value) -> Self {
        self.set.push((attr.into(), value));
        self
    }

    pub fn add(mut self, attr: impl Into<String>, value: Value) -> Self {
        self.add.push((attr.into(), value));
        self
    }

    pub fn remove(mut self, attr: impl Into<String>) -> Self {
        self.remove.push(attr.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.add.is_empty() && self.remove.is_empty()
    }
}

/// The key-value capability every persistent record goes through. Adapters
/// perform no access control; callers filter with the access predicate.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn put(&self, item: KvItem) -> Result<(), StorageError>;
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<KvItem>, StorageError>;
    async fn query(&self, query: &KvQuery) -> Result<Vec<KvItem>, StorageError>;
    async fn update(&self, pk: &str, sk: &str, patch: &KvUpdate) -> Result<(), StorageError>;
    async fn batch_delete(&self, keys: &[KvKey]) -> Result<(), StorageError>;
}
