//! Management API request and response types

use serde::{Deserialize, Serialize};
use umig_pipeline::{ImportSummary, Job, JobStatus};

/// Client-credentials token request
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest<'a> {
    pub grant_type: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub audience: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// One entry of an export field projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportField {
    pub name: String,
}

/// Body of `POST /api/v2/jobs/users-exports`
#[derive(Debug, Clone, Serialize)]
pub struct UsersExportRequest<'a> {
    pub connection_id: &'a str,
    pub format: &'a str,
    pub limit: u32,
    pub fields: Vec<ExportField>,
}

/// Job representation shared by the job endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct JobResponse {
    pub id: String,
    pub status: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub summary: Option<ImportSummary>,
}

impl From<JobResponse> for Job {
    fn from(response: JobResponse) -> Self {
        let mut job = Job::new(response.id, JobStatus::from(response.status.as_str()));
        if let Some(location) = response.location {
            job = job.with_location(location);
        }
        if let Some(summary) = response.summary {
            job = job.with_summary(summary);
        }
        job
    }
}

/// Error body returned by the Management API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, rename = "statusCode")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "errorCode")]
    pub error_code: Option<String>,
}

impl ApiErrorBody {
    /// Most specific human-readable description in the body
    pub fn describe(&self) -> Option<String> {
        match (&self.message, &self.error_code) {
            (Some(message), Some(code)) => Some(format!("{} ({})", message, code)),
            (Some(message), None) => Some(message.clone()),
            (None, _) => self.error.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_job_response_into_job() {
        let response: JobResponse = serde_json::from_value(serde_json::json!({
            "type": "users_import",
            "status": "completed",
            "id": "job_abc",
            "connection_id": "con_dest",
            "summary": { "failed": 1, "updated": 2, "inserted": 3, "total": 6 }
        }))
        .unwrap();

        let job = Job::from(response);
        assert_eq!(job.id, "job_abc");
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.summary.unwrap().total, 6);
        assert!(job.location.is_none());
    }

    #[test]
    fn test_unknown_status_is_pending() {
        let response: JobResponse =
            serde_json::from_value(serde_json::json!({ "id": "job_1", "status": "processing" }))
                .unwrap();
        assert_eq!(Job::from(response).status, JobStatus::Pending);
    }

    #[test]
    fn test_export_request_shape() {
        let request = UsersExportRequest {
            connection_id: "con_src",
            format: "json",
            limit: 50_000,
            fields: vec![ExportField { name: "email".to_string() }],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "connection_id": "con_src",
                "format": "json",
                "limit": 50000,
                "fields": [{ "name": "email" }]
            })
        );
    }

    #[test]
    fn test_error_body_description() {
        let body: ApiErrorBody = serde_json::from_value(serde_json::json!({
            "statusCode": 400,
            "error": "Bad Request",
            "message": "Payload validation error",
            "errorCode": "invalid_body"
        }))
        .unwrap();
        assert_eq!(body.describe().unwrap(), "Payload validation error (invalid_body)");
    }
}
