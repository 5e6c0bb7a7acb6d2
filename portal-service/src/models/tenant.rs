//! Tenant model: a static record mapping an access id to a Drive folder
//! and a quota class.

use portal_core::quota::{Period, QuotaPolicy};
use serde::{Deserialize, Serialize};

/// Process-wide cap for demo-class tenants.
pub const DEMO_HOURLY_LIMIT: u32 = 30;

/// Process-wide cap for everyone else.
pub const STANDARD_DAILY_LIMIT: u32 = 300;

/// Extra per-session cap applied to demo-class sessions, separate from
/// the process-wide counter.
pub const DEMO_SESSION_CAP: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TenantClass {
    Demo,
    #[default]
    Standard,
}

impl TenantClass {
    /// Static policy rule: demo accounts get a small hourly allowance,
    /// everyone else a daily one.
    pub fn quota_policy(&self) -> QuotaPolicy {
        match self {
            TenantClass::Demo => QuotaPolicy {
                limit: DEMO_HOURLY_LIMIT,
                period: Period::Hour,
            },
            TenantClass::Standard => QuotaPolicy {
                limit: STANDARD_DAILY_LIMIT,
                period: Period::Day,
            },
        }
    }
}

/// One tenant record from the tenant database.
#[derive(Debug, Clone, Deserialize)]
pub struct Tenant {
    /// Drive folder holding this tenant's research documents.
    pub folder_id: String,
    #[serde(default)]
    pub class: TenantClass,
}
