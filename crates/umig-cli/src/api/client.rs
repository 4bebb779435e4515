//! HTTP client for the Auth0 Management API
//!
//! Authenticates with the client-credentials grant and caches the access
//! token until shortly before it expires.

use crate::api::{endpoints, types::*};
use crate::config::TenantConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use umig_common::MigrateError;
use umig_pipeline::{ExportRequest, ImportRequest, Job, TenantClient};

// ============================================================================
// API Client Constants
// ============================================================================

/// Default timeout for a single HTTP request in seconds.
/// Can be overridden with --http-timeout-secs / UMIG_HTTP_TIMEOUT_SECS.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;

/// Tokens are refreshed this long before their reported expiry
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Export archive format requested from the tenant
pub const EXPORT_FORMAT: &str = "json";

struct CachedToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Management API client bound to one tenant
pub struct ManagementClient {
    http: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl ManagementClient {
    /// Create a client for `tenant`
    pub fn new(tenant: &TenantConfig, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: endpoints::base_url(&tenant.domain),
            client_id: tenant.client_id.clone(),
            client_secret: tenant.client_secret.clone(),
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current access token, exchanging credentials when none is cached
    async fn access_token(&self) -> umig_common::Result<String> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();

        if let Some(ref token) = *cached {
            if token.is_fresh(now) {
                return Ok(token.value.clone());
            }
        }

        let audience = endpoints::audience(&self.base_url);
        let request = TokenRequest {
            grant_type: "client_credentials",
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            audience: &audience,
        };

        let what = "POST /oauth/token";
        let response = self
            .http
            .post(endpoints::token_url(&self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| request_failed(what, e))?;
        let token: TokenResponse = check(response, what)
            .await?
            .json()
            .await
            .map_err(|e| request_failed(what, e))?;

        debug!(base_url = %self.base_url, expires_in = ?token.expires_in, "Obtained Management API token");

        let expires_at = token_expiry(now, token.expires_in);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at,
        });

        Ok(token.access_token)
    }

    /// Send an authenticated request that answers with a job
    async fn send_for_job(&self, request: RequestBuilder, what: &str) -> umig_common::Result<Job> {
        let token = self.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| request_failed(what, e))?;

        let job: JobResponse = check(response, what)
            .await?
            .json()
            .await
            .map_err(|e| request_failed(what, e))?;

        Ok(job.into())
    }
}

#[async_trait]
impl TenantClient for ManagementClient {
    async fn start_export(&self, request: &ExportRequest) -> umig_common::Result<Job> {
        let body = UsersExportRequest {
            connection_id: &request.connection_id,
            format: EXPORT_FORMAT,
            limit: request.limit,
            fields: request
                .fields
                .iter()
                .map(|name| ExportField { name: name.clone() })
                .collect(),
        };

        let builder = self
            .http
            .post(endpoints::users_exports_url(&self.base_url))
            .json(&body);
        let job = self
            .send_for_job(builder, "POST /api/v2/jobs/users-exports")
            .await?;

        info!(job_id = %job.id, connection_id = %request.connection_id, "Export job created");
        Ok(job)
    }

    async fn start_import(&self, request: &ImportRequest<'_>) -> umig_common::Result<Job> {
        let what = "POST /api/v2/jobs/users-imports";
        let users = serde_json::to_vec(request.records)?;
        let size = users.len();

        let part = Part::bytes(users)
            .file_name("users.json")
            .mime_str("application/json")
            .map_err(|e| request_failed(what, e))?;
        let form = Form::new()
            .part("users", part)
            .text("connection_id", request.connection_id.to_string())
            .text("upsert", request.upsert.to_string())
            .text("send_completion_email", "false");

        let builder = self
            .http
            .post(endpoints::users_imports_url(&self.base_url))
            .multipart(form);
        let job = self.send_for_job(builder, what).await?;

        info!(job_id = %job.id, records = request.records.len(), bytes = size, "Import job created");
        Ok(job)
    }

    async fn read_job(&self, job_id: &str) -> umig_common::Result<Job> {
        let builder = self.http.get(endpoints::job_url(&self.base_url, job_id));
        let job = self.send_for_job(builder, "GET /api/v2/jobs/{id}").await?;
        debug!(job_id = %job.id, status = %job.status, "Read job status");
        Ok(job)
    }
}

/// Refresh deadline for a token issued at `now`
///
/// A lifetime too large to represent is treated as no expiry.
fn token_expiry(now: DateTime<Utc>, expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    let lifetime = TimeDelta::try_seconds(expires_in?.saturating_sub(TOKEN_REFRESH_MARGIN_SECS))?;
    now.checked_add_signed(lifetime)
}

fn request_failed(what: &str, err: reqwest::Error) -> MigrateError {
    MigrateError::transport(format!("{} failed: {}", what, err))
}

/// Turn a non-success response into a transport error carrying the API's message
async fn check(response: Response, what: &str) -> umig_common::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.describe())
        .unwrap_or(body);

    Err(MigrateError::transport(format!("{} returned {}: {}", what, status, detail)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_token_expiry_keeps_refresh_margin() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let expires_at = token_expiry(now, Some(86_400)).unwrap();
        assert_eq!(expires_at - now, TimeDelta::seconds(86_400 - TOKEN_REFRESH_MARGIN_SECS));
    }

    #[test]
    fn test_unrepresentable_lifetime_means_no_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(token_expiry(now, None), None);
        assert_eq!(token_expiry(now, Some(i64::MAX)), None);
        assert_eq!(token_expiry(now, Some(i64::MIN)), None);
        assert_eq!(token_expiry(DateTime::<Utc>::MAX_UTC, Some(3_600)), None);
    }
}
