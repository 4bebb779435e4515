//! Auth0 Management API client
//!
//! Implements [`umig_pipeline::TenantClient`] over the bulk user jobs of the
//! Management API v2.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::ManagementClient;
pub use types::*;
