//! Client-related types shared between the auth service and dashboard clients
//!
//! The authenticated staff member and the tenant (restaurant) they belong to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Restaurant account scoping a subset of orders to one merchant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
}

/// Staff role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Customer,
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Roles allowed into the operations dashboard
    pub fn can_use_dashboard(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }

    /// Only admins may look across tenants
    pub fn can_select_tenant(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Manager => write!(f, "manager"),
            Role::Customer => write!(f, "customer"),
            Role::Unknown => write!(f, "unknown"),
        }
    }
}

/// User information returned by `auth/self`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Tenant>,
}

impl User {
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant.as_ref().map(|t| t.id.as_str())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}
