//! Application session
//!
//! Holds the signed-in staff member and owns the order cache for the lifetime
//! of the session. Logging out tears the cache down with it.

use parking_lot::RwLock;
use shared::client::{Role, User};
use shared::order::QueryKey;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::OrderQueryCache;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Role {0} may not use the dashboard")]
    RoleNotAllowed(Role),

    #[error("User {0} has no tenant")]
    NoTenant(String),
}

#[derive(Debug, Clone, Default)]
pub struct AppSession {
    user: Arc<RwLock<Option<User>>>,
    cache: OrderQueryCache,
}

impl AppSession {
    pub fn new(cache: OrderQueryCache) -> Self {
        Self {
            user: Arc::new(RwLock::new(None)),
            cache,
        }
    }

    pub fn cache(&self) -> &OrderQueryCache {
        &self.cache
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.read().clone()
    }

    /// Start a session. Only dashboard roles are accepted.
    pub fn login(&self, user: User) -> Result<(), SessionError> {
        if !user.role.can_use_dashboard() {
            tracing::warn!(user_id = %user.id, role = %user.role, "Dashboard login refused");
            return Err(SessionError::RoleNotAllowed(user.role));
        }
        tracing::info!(user_id = %user.id, role = %user.role, tenant = ?user.tenant_id(), "Session started");
        let previous = self.user.write().replace(user);
        if previous.is_some() {
            self.cache.clear();
        }
        Ok(())
    }

    /// End the session and drop every cached order
    pub fn logout(&self) {
        if let Some(user) = self.user.write().take() {
            tracing::info!(user_id = %user.id, "Session ended");
        }
        self.cache.clear();
    }

    pub fn is_allowed(&self) -> bool {
        self.user
            .read()
            .as_ref()
            .is_some_and(|u| u.role.can_use_dashboard())
    }

    /// Apply tenant scoping to a list query.
    ///
    /// Admins may query any tenant (or all of them); everyone else is pinned to
    /// their own tenant whatever the query asked for.
    pub fn scope_query(&self, key: QueryKey) -> Result<QueryKey, SessionError> {
        let guard = self.user.read();
        let user = guard.as_ref().ok_or(SessionError::NotLoggedIn)?;
        if user.role.can_select_tenant() {
            return Ok(key);
        }
        let tenant_id = user
            .tenant_id()
            .ok_or_else(|| SessionError::NoTenant(user.id.clone()))?;
        Ok(key.with_tenant(tenant_id))
    }

    /// Tenant whose realtime room the feed should join.
    ///
    /// `selected` is the admin's tenant filter, ignored for other roles.
    pub fn live_tenant(&self, selected: Option<&str>) -> Result<String, SessionError> {
        let guard = self.user.read();
        let user = guard.as_ref().ok_or(SessionError::NotLoggedIn)?;
        let tenant = match selected {
            Some(selected) if user.role.can_select_tenant() => Some(selected),
            _ => user.tenant_id(),
        };
        tenant
            .map(str::to_string)
            .ok_or_else(|| SessionError::NoTenant(user.id.clone()))
    }
}
