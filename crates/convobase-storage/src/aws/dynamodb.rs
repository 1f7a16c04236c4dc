use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, WriteRequest};
use aws_sdk_dynamodb::Client;
use serde_json::{Map, Number, Value};

use crate::errors::StorageError;
use crate::kv::{KvItem, KvKey, KvQuery, KvStore, KvUpdate, ATTR_PK, ATTR_SK};

const BATCH_WRITE_CHUNK: usize = 25;
const BATCH_WRITE_ATTEMPTS: usize = 5;

#[derive(Clone, Debug)]
pub struct DynamoDbConfig {
    pub table_name: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

/// Wide-table adapter: one DynamoDB table, composite `PK`/`SK` primary key,
/// `GSI1`/`GSI2` projections keyed by the item's `GSI*PK`/`GSI*SK`
/// attributes.
#[derive(Clone)]
pub struct DynamoDbKvStore {
    client: Client,
    table_name: String,
}

impl DynamoDbKvStore {
    pub async fn new(
        sdk_config: &aws_config::SdkConfig,
        config: DynamoDbConfig,
    ) -> Result<Self, StorageError> {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);
        if let Some(region) = config.region {
            builder = builder.region(aws_sdk_dynamodb::config::Region::new(region));
        }
        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        Ok(Self {
            client: Client::from_conf(builder.build()),
            table_name: config.table_name,
        })
    }

    pub fn from_client(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

fn to_attr(value: &Value) -> Result<AttributeValue, StorageError> {
    Ok(match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => {
            AttributeValue::L(items.iter().map(to_attr).collect::<Result<Vec<_>, _>>()?)
        }
        Value::Object(map) => AttributeValue::M(to_attr_map(map)?),
    })
}

fn to_attr_map(map: &Map<String, Value>) -> Result<HashMap<String, AttributeValue>, StorageError> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), to_attr(v)?)))
        .collect()
}

fn from_attr(attr: &AttributeValue) -> Result<Value, StorageError> {
    Ok(match attr {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => {
            if let Ok(int) = n.parse::<i64>() {
                Value::from(int)
            } else {
                let float = n
                    .parse::<f64>()
                    .map_err(|e| StorageError::codec(&format!("bad number attribute: {e}")))?;
                Number::from_f64(float)
                    .map(Value::Number)
                    .ok_or_else(|| StorageError::codec("non-finite number attribute"))?
            }
        }
        AttributeValue::L(items) => {
            Value::Array(items.iter().map(from_attr).collect::<Result<Vec<_>, _>>()?)
        }
        AttributeValue::M(map) => Value::Object(from_attr_map(map)?),
        AttributeValue::Ss(items) => {
            Value::Array(items.iter().map(|s| Value::String(s.clone())).collect())
        }
        other => {
            return Err(StorageError::codec(&format!(
                "unsupported attribute value: {other:?}"
            )))
        }
    })
}

fn from_attr_map(map: &HashMap<String, AttributeValue>) -> Result<Map<String, Value>, StorageError> {
    let mut out = Map::new();
    for (k, v) in map {
        out.insert(k.clone(), from_attr(v)?);
    }
    Ok(out)
}

#[async_trait]
impl KvStore for DynamoDbKvStore {
    async fn put(&self, item: KvItem) -> Result<(), StorageError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_attr_map(&item.0)?))
            .send()
            .await
            .map_err(|e| StorageError::internal(&format!("dynamodb PutItem failed: {e}")))?;
        Ok(())
    }

    async fn get(&self, pk: &str, sk: &str) -> Result<Option<KvItem>, StorageError> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ATTR_PK, AttributeValue::S(pk.to_string()))
            .key(ATTR_SK, AttributeValue::S(sk.to_string()))
            .send()
            .await
            .map_err(|e| StorageError::internal(&format!("dynamodb GetItem failed: {e}")))?;
        response
            .item()
            .map(|item| Ok(KvItem(from_attr_map(item)?)))
            .transpose()
    }

    async fn query(&self, query: &KvQuery) -> Result<Vec<KvItem>, StorageError> {
        let (partition_attr, sort_attr) = match query.index {
            None => (ATTR_PK, ATTR_SK),
            Some(index) => (index.partition_attr(), index.sort_attr()),
        };

        let mut condition = "#p = :p".to_string();
        if query.sort_prefix.is_some() {
            condition.push_str(" AND begins_with(#s, :s)");
        }

        let mut items = Vec::new();
        let mut exclusive_start_key: Option<HashMap<String, AttributeValue>> = None;
        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression(&condition)
                .expression_attribute_names("#p", partition_attr)
                .expression_attribute_values(":p", AttributeValue::S(query.partition.clone()))
                .scan_index_forward(query.scan_forward);
            if let Some(index) = query.index {
                request = request.index_name(index.table_name());
            }
            if let Some(prefix) = &query.sort_prefix {
                request = request
                    .expression_attribute_names("#s", sort_attr)
                    .expression_attribute_values(":s", AttributeValue::S(prefix.clone()));
            }
            if let Some(limit) = query.limit {
                let remaining = limit as usize - items.len();
                request = request.limit(remaining as i32);
            }
            if let Some(start) = exclusive_start_key.take() {
                request = request.set_exclusive_start_key(Some(start));
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::internal(&format!("dynamodb Query failed: {e}")))?;
            for item in response.items() {
                items.push(KvItem(from_attr_map(item)?));
            }

            if let Some(limit) = query.limit {
                if items.len() >= limit as usize {
                    items.truncate(limit as usize);
                    break;
                }
            }
            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key.clone()),
                _ => break,
            }
        }
        Ok(items)
    }

    async fn update(&self, pk: &str, sk: &str, patch: &KvUpdate) -> Result<(), StorageError> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut names: HashMap<String, String> = HashMap::new();
        let mut values: HashMap<String, AttributeValue> = HashMap::new();
        let mut clauses: Vec<String> = Vec::new();

        if !patch.set.is_empty() {
            let mut parts = Vec::new();
            for (i, (attr, value)) in patch.set.iter().enumerate() {
                names.insert(format!("#set{i}"), attr.clone());
                values.insert(format!(":set{i}"), to_attr(value)?);
                parts.push(format!("#set{i} = :set{i}"));
            }
            clauses.push(format!("SET {}", parts.join(", ")));
        }
        if !patch.add.is_empty() {
            let mut parts = Vec::new();
            for (i, (attr, value)) in patch.add.iter().enumerate() {
                names.insert(format!("#add{i}"), attr.clone());
                values.insert(format!(":add{i}"), to_attr(value)?);
                parts.push(format!("#add{i} :add{i}"));
            }
            clauses.push(format!("ADD {}", parts.join(", ")));
        }
        if !patch.remove.is_empty() {
            let mut parts = Vec::new();
            for (i, attr) in patch.remove.iter().enumerate() {
                names.insert(format!("#rm{i}"), attr.clone());
                parts.push(format!("#rm{i}"));
            }
            clauses.push(format!("REMOVE {}", parts.join(", ")));
        }

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(ATTR_PK, AttributeValue::S(pk.to_string()))
            .key(ATTR_SK, AttributeValue::S(sk.to_string()))
            .update_expression(clauses.join(" "))
            .condition_expression("attribute_exists(PK)")
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(if values.is_empty() {
                None
            } else {
                Some(values)
            })
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(err))
                if matches!(
                    err.err(),
                    UpdateItemError::ConditionalCheckFailedException(_)
                ) =>
            {
                Err(StorageError::not_found(&format!("kv item {pk}/{sk}")))
            }
            Err(e) => Err(StorageError::internal(&format!(
                "dynamodb UpdateItem failed: {e}"
            ))),
        }
    }

    async fn batch_delete(&self, keys: &[KvKey]) -> Result<(), StorageError> {
        for chunk in keys.chunks(BATCH_WRITE_CHUNK) {
            let mut requests: Vec<WriteRequest> = chunk
                .iter()
                .map(|key| {
                    let delete = DeleteRequest::builder()
                        .key(ATTR_PK, AttributeValue::S(key.pk.clone()))
                        .key(ATTR_SK, AttributeValue::S(key.sk.clone()))
                        .build()
                        .map_err(|e| {
                            StorageError::internal(&format!("delete request build: {e}"))
                        })?;
                    Ok(WriteRequest::builder().delete_request(delete).build())
                })
                .collect::<Result<_, StorageError>>()?;

            let mut attempts = 0;
            while !requests.is_empty() {
                attempts += 1;
                if attempts > BATCH_WRITE_ATTEMPTS {
                    return Err(StorageError::internal(
                        "dynamodb BatchWriteItem left unprocessed keys",
                    ));
                }
                let response = self
                    .client
                    .batch_write_item()
                    .request_items(&self.table_name, requests.clone())
                    .send()
                    .await
                    .map_err(|e| {
                        StorageError::internal(&format!("dynamodb BatchWriteItem failed: {e}"))
                    })?;
                requests = response
                    .unprocessed_items()
                    .and_then(|items| items.get(&self.table_name))
                    .cloned()
                    .unwrap_or_default();
            }
        }
        Ok(())
    }
}
