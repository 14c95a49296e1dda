use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ActorId;

/// Evidence file attached to a criterion submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub original_name: String,
    pub mime_type: Option<String>,
    pub size: i64,
    /// Key in the file store
    pub path: String,
    pub uploaded_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
}

/// An upload as received from the transport layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// File name with path separators and control characters replaced.
    pub fn safe_name(&self) -> String {
        let cleaned: String = self
            .original_name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        let trimmed = cleaned.trim_matches(|c| c == '.' || c == ' ');
        if trimmed.is_empty() {
            "upload".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_name_strips_traversal() {
        let file = UploadedFile {
            original_name: "../../etc/passwd".to_string(),
            mime_type: None,
            bytes: vec![],
        };
        assert_eq!(file.safe_name(), "_.._etc_passwd");
    }

    #[test]
    fn blank_name_falls_back() {
        let file = UploadedFile {
            original_name: " . ".to_string(),
            mime_type: None,
            bytes: vec![],
        };
        assert_eq!(file.safe_name(), "upload");
    }
}
