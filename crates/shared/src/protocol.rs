use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::{AttachmentId, RequestId, StateCode};

/// One exemption-certificate request as the employee API serves it. The wire
/// format keeps the upstream service's Spanish camelCase names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSummary {
    pub id: RequestId,
    #[serde(rename = "numeroSolicitud", default)]
    pub tracking_number: String,
    #[serde(rename = "nombre", default)]
    pub applicant_name: String,
    #[serde(rename = "cedula", default)]
    pub national_id: String,
    #[serde(rename = "correo", default)]
    pub email: String,
    #[serde(rename = "estado")]
    pub state: StateCode,
    #[serde(rename = "fechaCreacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "archivosActuales", default)]
    pub stored_files: Vec<StoredAttachment>,
}

/// A document already on file for a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAttachment {
    pub id: AttachmentId,
    #[serde(rename = "nombreOriginal", default)]
    pub original_name: String,
}

/// A local file picked for a certification upload. Only name, size, and path
/// are carried; bytes are read from `path` at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub size_bytes: u64,
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_upstream_wire_names() {
        let raw = r#"{
            "id": 41,
            "numeroSolicitud": "SOL-2026-0041",
            "nombre": "Ana Pérez",
            "cedula": "001-1234567-8",
            "correo": "ana@example.com",
            "estado": 6,
            "fechaCreacion": "2026-03-02T14:30:00Z",
            "archivosActuales": [{ "id": 9, "nombreOriginal": "cedula.pdf" }]
        }"#;

        let request: RequestSummary = serde_json::from_str(raw).expect("parse");
        assert_eq!(request.id, RequestId(41));
        assert_eq!(request.tracking_number, "SOL-2026-0041");
        assert_eq!(request.state, StateCode(6));
        assert_eq!(request.stored_files.len(), 1);
        assert_eq!(request.stored_files[0].original_name, "cedula.pdf");
    }

    #[test]
    fn missing_identity_fields_default_to_empty_strings() {
        let raw = r#"{ "id": 2, "estado": 12, "fechaCreacion": "2026-01-01T00:00:00Z" }"#;

        let request: RequestSummary = serde_json::from_str(raw).expect("parse");
        assert!(request.tracking_number.is_empty());
        assert!(request.applicant_name.is_empty());
        assert!(request.national_id.is_empty());
        assert_eq!(request.state, StateCode(12));
        assert!(request.stored_files.is_empty());
    }
}
