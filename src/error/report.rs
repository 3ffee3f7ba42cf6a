use serde::{Deserialize, Serialize};

use super::kinds::BackupError;

/// Structured description of a failed run.
///
/// Serialized to JSON and written by the binary so the invoking scheduler can
/// pick the failure up from its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    #[serde(rename = "type")]
    pub(crate) error_type: String,
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) status: Option<u16>,
}

impl ErrorReport {
    /// Build a report from a backup error.
    pub fn from_error(error: &BackupError) -> Self {
        let status = match error {
            BackupError::Search(super::SearchError::ServiceError { status, .. }) => Some(*status),
            _ => None,
        };

        Self {
            error_type: error.kind().as_str().to_string(),
            message: error.to_string(),
            status,
        }
    }

    /// Convert the report to pretty-printed JSON wrapped in an `error` field.
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&serde_json::json!({ "error": self }))
    }

    /// Convert the report to compact JSON (single line).
    pub fn to_json_compact(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(&serde_json::json!({ "error": self }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BufferError, SearchError};

    #[test]
    fn test_report_service_error() {
        let err = BackupError::Search(SearchError::ServiceError {
            status: 403,
            message: "forbidden".to_string(),
        });
        let report = ErrorReport::from_error(&err);
        assert_eq!(report.error_type, "transient_service");
        assert_eq!(report.status, Some(403));

        let json: serde_json::Value =
            serde_json::from_str(&report.to_json_compact().unwrap()).unwrap();
        assert_eq!(json["error"]["status"], 403);
    }

    #[test]
    fn test_report_omits_status() {
        let err = BackupError::Buffer(BufferError::WriteFailed("disk full".to_string()));
        let json = ErrorReport::from_error(&err).to_json_compact().unwrap();
        assert!(json.contains("local_resource"));
        assert!(!json.contains("status"));
    }
}
