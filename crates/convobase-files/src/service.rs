use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::future::try_join_all;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use convobase_auth::policy::{can_access_file, visibility_allowed};
use convobase_storage::blob::BlobStore;
use convobase_storage::kv::{
    IndexName, KvKey, KvQuery, KvStore, KvUpdate, ATTR_GSI2PK, ATTR_GSI2SK,
};
use convobase_storage::model::keys;
use convobase_storage::model::FileRecord;
use convobase_types::prelude::{
    Actor, FileCategory, FileStatus, FileType, Role, Timestamp, Visibility,
};

use crate::errors::FileError;
use crate::extract;

#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub file_name: String,
    pub file_type: FileType,
    pub mime_type: String,
    pub file_data_base64: String,
    pub actor: Actor,
    pub visibility: Option<Visibility>,
    pub category: Option<FileCategory>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub file_id: String,
    pub file_name: String,
    pub status: FileStatus,
    pub uploaded_at: Timestamp,
}

/// A file's text as handed to RAG assembly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileContext {
    pub file_name: String,
    pub text: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnswer {
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_data: Option<Value>,
}

pub struct FileService {
    kv: Arc<dyn KvStore>,
    blobs: Arc<dyn BlobStore>,
}

impl FileService {
    pub fn new(kv: Arc<dyn KvStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { kv, blobs }
    }

    pub async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt, FileError> {
        let visibility = request.visibility.unwrap_or(Visibility::Private);
        if !visibility_allowed(request.actor.role, visibility) {
            return Err(FileError::forbidden_visibility(&format!(
                "{} may not publish at {}",
                request.actor.role.as_str(),
                visibility.as_str()
            )));
        }
        if request.file_name.trim().is_empty() {
            return Err(FileError::validation("fileName is required."));
        }

        let bytes = BASE64
            .decode(request.file_data_base64.as_bytes())
            .map_err(|_| FileError::validation("fileData is not valid base64."))?;

        let file_id = uuid::Uuid::new_v4().to_string();
        let scopes = request.actor.scopes.clone();
        let part = |value: &Option<String>| -> String {
            value.clone().unwrap_or_else(|| "default".to_string())
        };
        let blob_key = format!(
            "{}/{}/{}/{}/{}",
            part(&scopes.organization_id),
            part(&scopes.company_id),
            request.actor.user_id,
            file_id,
            request.file_name
        );

        // Indexable types keep their text inline so RAG assembly never
        // re-reads the blob.
        let extracted_text = if request.file_type.is_indexable() {
            Some(extract::decode_utf8(&bytes)?)
        } else {
            None
        };

        let file_size = bytes.len() as u64;
        self.blobs
            .put(&blob_key, bytes, &request.mime_type)
            .await?;

        let uploaded_at = Timestamp::now();
        let record = FileRecord {
            file_id: file_id.clone(),
            file_name: request.file_name.clone(),
            file_type: request.file_type,
            mime_type: request.mime_type,
            blob_key,
            user_id: request.actor.user_id.clone(),
            created_by_role: request.actor.role,
            scopes,
            uploaded_at,
            file_size,
            status: FileStatus::Ready,
            visibility,
            category: request.category.unwrap_or(FileCategory::RagSource),
            extracted_text,
            text_blob_key: None,
            description: request.description,
            error_message: None,
        };
        self.kv.put(record.into_item()?).await?;

        Ok(UploadReceipt {
            file_id,
            file_name: request.file_name,
            status: FileStatus::Ready,
            uploaded_at,
        })
    }

    /// Union of the four single-partition scans, deduplicated and run
    /// through the access predicate. The predicate is applied even to
    /// index hits so stale projections never leak.
    pub async fn list(
        &self,
        actor: &Actor,
        category: Option<FileCategory>,
    ) -> Result<Vec<FileRecord>, FileError> {
        let mut queries = Vec::with_capacity(4);
        if !actor.user_id.is_empty() {
            queries.push(
                KvQuery::index(IndexName::Gsi1, keys::owner_partition(&actor.user_id))
                    .with_sort_prefix(keys::FILE_PREFIX)
                    .descending(),
            );
        }
        queries.push(
            KvQuery::index(IndexName::Gsi2, keys::VISIBILITY_SYSTEM_PARTITION)
                .with_sort_prefix(keys::FILE_PREFIX)
                .descending(),
        );
        if let Some(org) = actor.scopes.organization_id.as_deref() {
            queries.push(
                KvQuery::index(IndexName::Gsi2, keys::org_partition(org))
                    .with_sort_prefix(keys::FILE_PREFIX)
                    .descending(),
            );
        }
        if let Some(company) = actor.scopes.company_id.as_deref() {
            queries.push(
                KvQuery::index(IndexName::Gsi2, keys::company_partition(company))
                    .with_sort_prefix(keys::FILE_PREFIX)
                    .descending(),
            );
        }

        let pages = try_join_all(queries.iter().map(|query| self.kv.query(query))).await?;

        let mut seen: HashMap<String, FileRecord> = HashMap::new();
        for item in pages.into_iter().flatten() {
            let record = FileRecord::from_item(&item)?;
            seen.entry(record.file_id.clone()).or_insert(record);
        }

        let mut files: Vec<FileRecord> = seen
            .into_values()
            .filter(|file| can_access_file(file, actor))
            .filter(|file| category.map_or(true, |wanted| file.category == wanted))
            .collect();
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(files)
    }

    pub async fn get(&self, actor: &Actor, file_id: &str) -> Result<FileRecord, FileError> {
        let record = self.fetch(file_id).await?;
        // Inaccessible ids read as absent so private files stay private
        // even when their ids are guessed.
        if !can_access_file(&record, actor) {
            return Err(FileError::not_found(file_id));
        }
        Ok(record)
    }

    pub async fn update_visibility(
        &self,
        actor: &Actor,
        file_id: &str,
        visibility: Visibility,
    ) -> Result<(), FileError> {
        let record = self.fetch(file_id).await?;
        if record.user_id != actor.user_id && actor.role != Role::SystemAdmin {
            return Err(FileError::forbidden(
                "only the owner or a system administrator may relabel a file",
            ));
        }
        if !visibility_allowed(actor.role, visibility) {
            return Err(FileError::forbidden_visibility(&format!(
                "{} may not relabel to {}",
                actor.role.as_str(),
                visibility.as_str()
            )));
        }

        let mut patch = KvUpdate::new().set("visibility", json!(visibility));
        match keys::file_gsi2_partition(visibility, &record.scopes) {
            Some(partition) => {
                patch = patch
                    .set(ATTR_GSI2PK, json!(partition))
                    .set(ATTR_GSI2SK, json!(keys::file_gsi1_sk(&record.uploaded_at)));
            }
            // Narrow visibilities fall out of the org/company listings.
            None => {
                patch = patch.remove(ATTR_GSI2PK).remove(ATTR_GSI2SK);
            }
        }
        self.kv
            .update(&keys::file_pk(file_id), keys::SK_META, &patch)
            .await?;
        Ok(())
    }

    /// Blob first, then the record. A blob failure aborts with the record
    /// intact; a record failure after blob success orphans the blob, which
    /// is logged for reconciliation.
    pub async fn delete(&self, actor: &Actor, file_id: &str) -> Result<(), FileError> {
        let record = self.fetch(file_id).await?;
        if record.user_id != actor.user_id && actor.role != Role::SystemAdmin {
            return Err(FileError::forbidden(
                "only the owner or a system administrator may delete a file",
            ));
        }
        self.blobs.delete(&record.blob_key).await?;
        if let Err(err) = self
            .kv
            .batch_delete(&[KvKey::new(keys::file_pk(file_id), keys::SK_META)])
            .await
        {
            error!(
                file_id,
                blob_key = %record.blob_key,
                error = %err,
                "file record delete failed after blob delete; blob orphaned"
            );
            return Err(err.into());
        }
        Ok(())
    }

    /// Text for RAG assembly. Missing files and files the actor cannot
    /// access both read as `None`; the chat path skips them silently.
    pub async fn accessible_text(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<Option<FileContext>, FileError> {
        let item = self
            .kv
            .get(&keys::file_pk(file_id), keys::SK_META)
            .await?;
        let Some(item) = item else {
            return Ok(None);
        };
        let record = FileRecord::from_item(&item)?;
        if !can_access_file(&record, actor) {
            return Ok(None);
        }
        match self.text_of(&record).await? {
            Some(text) => Ok(Some(FileContext {
                file_name: record.file_name,
                text,
            })),
            None => Ok(None),
        }
    }

    /// Schema summary for CSV, head-of-file preview for text. The LLM is
    /// never invoked from this path.
    pub async fn query_file(
        &self,
        file_id: &str,
        _question: &str,
    ) -> Result<QueryAnswer, FileError> {
        let record = self.fetch(file_id).await?;
        let text = self.text_of(&record).await?;
        let answer = match (record.file_type, text) {
            (FileType::Csv, Some(text)) => {
                let summary = extract::summarize_csv(&text);
                return Ok(QueryAnswer {
                    answer: format!(
                        "{} は {} 行 × {} 列の CSV ファイルです。列: {}",
                        record.file_name,
                        summary.row_count,
                        summary.headers.len(),
                        summary.headers.join(", ")
                    ),
                    source_data: Some(json!({
                        "headers": summary.headers,
                        "rowCount": summary.row_count,
                    })),
                });
            }
            (_, Some(text)) => extract::text_preview(&text),
            (_, None) => format!(
                "{} はバイナリファイルのため内容を表示できません。",
                record.file_name
            ),
        };
        Ok(QueryAnswer {
            answer,
            source_data: None,
        })
    }

    async fn fetch(&self, file_id: &str) -> Result<FileRecord, FileError> {
        let item = self
            .kv
            .get(&keys::file_pk(file_id), keys::SK_META)
            .await?
            .ok_or_else(|| FileError::not_found(file_id))?;
        Ok(FileRecord::from_item(&item)?)
    }

    async fn text_of(&self, record: &FileRecord) -> Result<Option<String>, FileError> {
        if let Some(text) = &record.extracted_text {
            return Ok(Some(text.clone()));
        }
        if let Some(text_key) = &record.text_blob_key {
            match self.blobs.get(text_key).await {
                Ok(bytes) => return Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
                Err(err) if err.is_not_found() => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        }
        if !record.file_type.is_indexable() {
            return Ok(None);
        }
        match self.blobs.get(&record.blob_key).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convobase_storage::memory::{MemoryBlobStore, MemoryKvStore};
    use convobase_types::prelude::ScopeIds;

    fn service() -> (FileService, MemoryBlobStore) {
        let blobs = MemoryBlobStore::new();
        (
            FileService::new(
                Arc::new(MemoryKvStore::new()),
                Arc::new(blobs.clone()),
            ),
            blobs,
        )
    }

    fn actor(user_id: &str, role: Role, company: Option<&str>) -> Actor {
        Actor::new(
            user_id,
            role,
            ScopeIds::new(Some("org-1".into()), company.map(str::to_string), None),
        )
    }

    fn upload_request(actor: &Actor, visibility: Option<Visibility>) -> UploadRequest {
        UploadRequest {
            file_name: "note.txt".into(),
            file_type: FileType::Txt,
            mime_type: "text/plain".into(),
            file_data_base64: BASE64.encode("hello world"),
            actor: actor.clone(),
            visibility,
            category: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn upload_round_trips_extracted_text() {
        let (service, blobs) = service();
        let owner = actor("u-1", Role::User, Some("c-1"));
        let receipt = service.upload(upload_request(&owner, None)).await.unwrap();
        assert_eq!(receipt.status, FileStatus::Ready);

        let record = service.get(&owner, &receipt.file_id).await.unwrap();
        assert_eq!(record.extracted_text.as_deref(), Some("hello world"));
        assert_eq!(record.file_size, 11);
        assert!(blobs.contains(&record.blob_key));
        assert!(record.blob_key.starts_with("org-1/c-1/u-1/"));
    }

    #[tokio::test]
    async fn plain_users_cannot_publish_company_wide() {
        let (service, _) = service();
        let user = actor("u-1", Role::User, Some("c-1"));
        let err = service
            .upload(upload_request(&user, Some(Visibility::Company)))
            .await
            .unwrap_err();
        assert_eq!(err.0.code.0, "POLICY.FORBIDDEN_VISIBILITY");
    }

    #[tokio::test]
    async fn company_visibility_reaches_colleagues_not_strangers() {
        let (service, _) = service();
        let admin = actor("admin-1", Role::CompanyAdmin, Some("c-1"));
        let receipt = service
            .upload(upload_request(&admin, Some(Visibility::Company)))
            .await
            .unwrap();

        let colleague = actor("u-2", Role::User, Some("c-1"));
        let visible = service.list(&colleague, None).await.unwrap();
        assert!(visible.iter().any(|f| f.file_id == receipt.file_id));

        let stranger = actor("u-3", Role::User, Some("c-2"));
        let hidden = service.list(&stranger, None).await.unwrap();
        assert!(hidden.iter().all(|f| f.file_id != receipt.file_id));
        assert!(service.get(&stranger, &receipt.file_id).await.is_err());
    }

    #[tokio::test]
    async fn listing_filters_by_category_and_dedupes_owner_hits() {
        let (service, _) = service();
        let admin = actor("admin-1", Role::CompanyAdmin, Some("c-1"));
        // Company-visible file owned by the lister: reachable through both
        // the owner and the company queries.
        let receipt = service
            .upload(upload_request(&admin, Some(Visibility::Company)))
            .await
            .unwrap();

        let all = service.list(&admin, None).await.unwrap();
        assert_eq!(
            all.iter().filter(|f| f.file_id == receipt.file_id).count(),
            1
        );

        let none = service
            .list(&admin, Some(FileCategory::KnowledgeBase))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn relabeling_rewrites_the_gsi2_projection() {
        let (service, _) = service();
        let admin = actor("admin-1", Role::CompanyAdmin, Some("c-1"));
        let receipt = service
            .upload(upload_request(&admin, Some(Visibility::Company)))
            .await
            .unwrap();

        let colleague = actor("u-2", Role::User, Some("c-1"));
        assert_eq!(service.list(&colleague, None).await.unwrap().len(), 1);

        service
            .update_visibility(&admin, &receipt.file_id, Visibility::Private)
            .await
            .unwrap();
        assert!(service.list(&colleague, None).await.unwrap().is_empty());

        let record = service.get(&admin, &receipt.file_id).await.unwrap();
        assert_eq!(record.visibility, Visibility::Private);
    }

    #[tokio::test]
    async fn only_owner_or_system_admin_mutates() {
        let (service, _) = service();
        let owner = actor("u-1", Role::CompanyAdmin, Some("c-1"));
        let receipt = service.upload(upload_request(&owner, None)).await.unwrap();

        let other = actor("u-2", Role::CompanyAdmin, Some("c-1"));
        let err = service
            .update_visibility(&other, &receipt.file_id, Visibility::Private)
            .await
            .unwrap_err();
        assert_eq!(err.0.code.0, "POLICY.FORBIDDEN_SCOPE");
        assert!(service.delete(&other, &receipt.file_id).await.is_err());

        let root = actor("root", Role::SystemAdmin, None);
        service.delete(&root, &receipt.file_id).await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_blob_then_record_and_second_delete_is_404() {
        let (service, blobs) = service();
        let owner = actor("u-1", Role::User, Some("c-1"));
        let receipt = service.upload(upload_request(&owner, None)).await.unwrap();
        let record = service.get(&owner, &receipt.file_id).await.unwrap();

        service.delete(&owner, &receipt.file_id).await.unwrap();
        assert!(!blobs.contains(&record.blob_key));
        let err = service.delete(&owner, &receipt.file_id).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(service.get(&owner, &receipt.file_id).await.is_err());
    }

    #[tokio::test]
    async fn inaccessible_text_reads_as_absent() {
        let (service, _) = service();
        let owner = actor("u-1", Role::User, Some("c-1"));
        let receipt = service.upload(upload_request(&owner, None)).await.unwrap();

        let text = service
            .accessible_text(&owner, &receipt.file_id)
            .await
            .unwrap()
            .expect("owner reads text");
        assert_eq!(text.text, "hello world");

        let stranger = actor("u-9", Role::User, Some("c-9"));
        assert!(service
            .accessible_text(&stranger, &receipt.file_id)
            .await
            .unwrap()
            .is_none());
        assert!(service
            .accessible_text(&owner, "no-such-id")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn csv_query_summarizes_schema() {
        let (service, _) = service();
        let owner = actor("u-1", Role::User, Some("c-1"));
        let receipt = service
            .upload(UploadRequest {
                file_name: "facts.csv".into(),
                file_type: FileType::Csv,
                mime_type: "text/csv".into(),
                file_data_base64: BASE64.encode("name,age\nAlice,30\nBob,40"),
                actor: owner.clone(),
                visibility: None,
                category: None,
                description: None,
            })
            .await
            .unwrap();

        let answer = service
            .query_file(&receipt.file_id, "what columns?")
            .await
            .unwrap();
        let source = answer.source_data.expect("csv source data");
        assert_eq!(source["rowCount"], 2);
        assert_eq!(source["headers"][0], "name");
        assert!(answer.answer.contains("facts.csv"));
    }
}
