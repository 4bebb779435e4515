//! Tenant configuration
//!
//! Both tenants are configured from the environment, optionally seeded from a
//! `.env` file in the working directory. All eight variables are validated at
//! once so a misconfigured run reports every missing name in one go.

use crate::error::{CliError, Result};
use std::path::PathBuf;

/// Source tenant variable prefix
pub const SOURCE_PREFIX: &str = "SOURCE";

/// Destination tenant variable prefix
pub const DESTINATION_PREFIX: &str = "DESTINATION";

const FIELDS: [&str; 4] = ["DOMAIN", "CLIENT_ID", "CLIENT_SECRET", "CONNECTION_ID"];

/// Credentials and target connection of one tenant
#[derive(Clone, PartialEq, Eq)]
pub struct TenantConfig {
    /// Bare host (`tenant.eu.auth0.com`) or full base URL
    pub domain: String,
    pub client_id: String,
    pub client_secret: String,
    /// Connection (user store) that is exported from or imported into
    pub connection_id: String,
}

impl std::fmt::Debug for TenantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantConfig")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("connection_id", &self.connection_id)
            .finish()
    }
}

/// Configuration of both ends of a migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    pub source: TenantConfig,
    pub destination: TenantConfig,
}

impl MigrationConfig {
    /// Load from the process environment
    ///
    /// # Errors
    /// [`CliError::Config`] listing every variable that is unset or blank.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let source = read_tenant(SOURCE_PREFIX, &lookup, &mut missing);
        let destination = read_tenant(DESTINATION_PREFIX, &lookup, &mut missing);

        if !missing.is_empty() {
            return Err(CliError::config(format!(
                "missing environment variables: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { source, destination })
    }
}

fn read_tenant<F>(prefix: &str, lookup: &F, missing: &mut Vec<String>) -> TenantConfig
where
    F: Fn(&str) -> Option<String>,
{
    let [domain, client_id, client_secret, connection_id] = FIELDS.map(|field| {
        let name = format!("{}_{}", prefix, field);
        match lookup(&name).map(|v| v.trim().to_string()) {
            Some(value) if !value.is_empty() => value,
            _ => {
                missing.push(name);
                String::new()
            },
        }
    });

    TenantConfig {
        domain,
        client_id,
        client_secret,
        connection_id,
    }
}

/// Seed the environment from `.env` if one exists
///
/// Returns the path of the loaded file, or `None` when there is none. A
/// malformed file is an error.
pub fn load_dotenv() -> Result<Option<PathBuf>> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(CliError::config(format!("failed to read .env file: {}", e))),
    }
}
