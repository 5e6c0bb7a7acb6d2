//! Tenant directory: exact-match lookup from access id to tenant record.
//!
//! Loaded once at startup from configuration and immutable afterwards.
//! Unknown ids are simply absent; the caller decides how to reject them.

use crate::models::tenant::Tenant;
use portal_core::error::AppError;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct TenantDirectory {
    tenants: HashMap<String, Tenant>,
}

impl TenantDirectory {
    /// Parse the tenant database blob:
    /// `{"<access_id>": {"folder_id": "...", "class": "demo"|"standard"}, ...}`.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let tenants: HashMap<String, Tenant> = serde_json::from_str(raw).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("invalid tenant database: {}", e))
        })?;
        Ok(Self { tenants })
    }

    pub fn resolve(&self, access_id: &str) -> Option<&Tenant> {
        self.tenants.get(access_id)
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}
