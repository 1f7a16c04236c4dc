use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Department,
    Company,
    Organization,
    System,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Department => "department",
            Visibility::Company => "company",
            Visibility::Organization => "organization",
            Visibility::System => "system",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "private" => Some(Visibility::Private),
            "department" => Some(Visibility::Department),
            "company" => Some(Visibility::Company),
            "organization" => Some(Visibility::Organization),
            "system" => Some(Visibility::System),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Txt,
    Csv,
    Xlsx,
}

impl FileType {
    /// Only plain-text shapes are indexed inline; everything else is stored
    /// verbatim and surfaced as an opaque blob.
    pub fn is_indexable(&self) -> bool {
        matches!(self, FileType::Txt | FileType::Csv)
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "pdf" => Some(FileType::Pdf),
            "docx" => Some(FileType::Docx),
            "txt" => Some(FileType::Txt),
            "csv" => Some(FileType::Csv),
            "xlsx" => Some(FileType::Xlsx),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Uploading,
    Processing,
    Ready,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    ChatAttachment,
    RagSource,
    KnowledgeBase,
}

impl FileCategory {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "chat_attachment" => Some(FileCategory::ChatAttachment),
            "rag_source" => Some(FileCategory::RagSource),
            "knowledge_base" => Some(FileCategory::KnowledgeBase),
            _ => None,
        }
    }
}
