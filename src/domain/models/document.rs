#[cfg(test)]
#[path = "document_test.rs"]
mod tests;

use std::fmt;

use serde_derive::Deserialize;
use serde_derive::Serialize;
use serde_json::Value;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;

/// Opaque identifier assigned by the remote store. Never changes once a
/// document has been persisted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> DocumentId {
        return DocumentId(id.into());
    }

    pub fn as_str(&self) -> &str {
        return &self.0;
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return write!(f, "{}", self.0);
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    EnumVariantNames,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Published,
}

impl DocumentStatus {
    pub fn parse(text: &str) -> Option<DocumentStatus> {
        return DocumentStatus::iter().find(|e| return e.to_string() == text);
    }
}

fn empty_object() -> Value {
    return Value::Object(serde_json::Map::new());
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    #[serde(default)]
    pub title: String,
    /// Snapshot produced by the editor surface. Opaque to the engine.
    #[serde(default = "empty_object")]
    pub content: Value,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Document {
    /// A draft record with the given title and content. Id and timestamps
    /// are left for the store that persists it to fill in.
    pub fn new(title: &str, content: Value) -> Document {
        return Document {
            id: None,
            title: title.to_string(),
            content,
            status: DocumentStatus::Draft,
            created_at: None,
            updated_at: None,
        };
    }

    pub fn has_id(&self, id: &DocumentId) -> bool {
        return self.id.as_ref() == Some(id);
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            return "Untitled";
        }

        return &self.title;
    }
}

/// Partial set of document fields. Used both for local merges and as the body
/// of a remote partial update, where absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DocumentStatus>,
}

impl DocumentPatch {
    pub fn title(title: &str) -> DocumentPatch {
        return DocumentPatch {
            title: Some(title.to_string()),
            ..DocumentPatch::default()
        };
    }

    pub fn content(content: Value) -> DocumentPatch {
        return DocumentPatch {
            content: Some(content),
            ..DocumentPatch::default()
        };
    }

    pub fn status(status: DocumentStatus) -> DocumentPatch {
        return DocumentPatch {
            status: Some(status),
            ..DocumentPatch::default()
        };
    }

    /// Every persisted field of the document. Flushes always send this, never
    /// a diff.
    pub fn full(document: &Document) -> DocumentPatch {
        return DocumentPatch {
            title: Some(document.title.to_string()),
            content: Some(document.content.clone()),
            status: Some(document.status),
        };
    }

    pub fn with_title(mut self, title: &str) -> DocumentPatch {
        self.title = Some(title.to_string());
        return self;
    }

    pub fn with_content(mut self, content: Value) -> DocumentPatch {
        self.content = Some(content);
        return self;
    }

    pub fn with_status(mut self, status: DocumentStatus) -> DocumentPatch {
        self.status = Some(status);
        return self;
    }

    pub fn is_empty(&self) -> bool {
        return self.title.is_none() && self.content.is_none() && self.status.is_none();
    }

    pub fn apply_to(&self, document: &mut Document) {
        if let Some(title) = &self.title {
            document.title = title.to_string();
        }
        if let Some(content) = &self.content {
            document.content = content.clone();
        }
        if let Some(status) = self.status {
            document.status = status;
        }
    }
}
