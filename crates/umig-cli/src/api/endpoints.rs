//! API endpoint URL builders

/// Base URL for a tenant domain
///
/// Bare hosts get an `https://` scheme; full URLs are kept as given.
pub fn base_url(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

/// Management API audience for client-credentials grants
pub fn audience(base_url: &str) -> String {
    format!("{}/api/v2/", base_url)
}

pub fn token_url(base_url: &str) -> String {
    format!("{}/oauth/token", base_url)
}

pub fn users_exports_url(base_url: &str) -> String {
    format!("{}/api/v2/jobs/users-exports", base_url)
}

pub fn users_imports_url(base_url: &str) -> String {
    format!("{}/api/v2/jobs/users-imports", base_url)
}

/// Status URL for a job; the id is percent-encoded as a single path segment
pub fn job_url(base_url: &str, job_id: &str) -> String {
    format!("{}/api/v2/jobs/{}", base_url, urlencoding::encode(job_id))
}
